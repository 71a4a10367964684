//! Endpoints about the current session rather than a resource.

use serde_json::Value;

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::Result;
use crate::options::CallOptions;
use crate::request::RequestSpec;

/// Whoami and ping.
#[derive(Debug, Clone)]
pub struct AccountInterface<'a> {
    dispatcher: &'a Dispatcher,
    options: CallOptions,
}

impl<'a> AccountInterface<'a> {
    /// Interface on `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self {
            dispatcher,
            options: CallOptions::default(),
        }
    }

    /// Call options applied to every request from this interface.
    #[must_use]
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// The authenticated user, account and permissions.
    pub async fn whoami(&self) -> Result<Dispatch<Value>> {
        self.dispatcher
            .execute_json(RequestSpec::get("/api/whoami"), &self.options)
            .await
    }

    /// Appliance health and build information.
    pub async fn ping(&self) -> Result<Dispatch<Value>> {
        self.dispatcher
            .execute_json(RequestSpec::get("/api/ping"), &self.options)
            .await
    }
}
