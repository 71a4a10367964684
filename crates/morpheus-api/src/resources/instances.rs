//! Instances: CRUD plus power actions.

use std::ops::Deref;

use serde_json::Value;

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::Result;
use crate::options::CallOptions;
use crate::resource::ResourceInterface;
use crate::resources::INSTANCES;

/// Instance interface.
#[derive(Debug, Clone)]
pub struct InstancesInterface<'a> {
    inner: ResourceInterface<'a>,
}

impl<'a> InstancesInterface<'a> {
    /// Interface on `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            inner: ResourceInterface::new(dispatcher, INSTANCES),
        }
    }

    /// Call options applied to every request from this interface.
    #[must_use]
    pub fn with_options(self, options: CallOptions) -> Self {
        Self {
            inner: self.inner.with_options(options),
        }
    }

    /// Power on.
    pub async fn start(&self, id: &str) -> Result<Dispatch<Value>> {
        self.inner.action(id, "start").await
    }

    /// Power off.
    pub async fn stop(&self, id: &str) -> Result<Dispatch<Value>> {
        self.inner.action(id, "stop").await
    }

    /// Restart.
    pub async fn restart(&self, id: &str) -> Result<Dispatch<Value>> {
        self.inner.action(id, "restart").await
    }
}

impl<'a> Deref for InstancesInterface<'a> {
    type Target = ResourceInterface<'a>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
