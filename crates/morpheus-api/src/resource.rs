//! Generic list/get/create/update/destroy interface over one REST resource.

use serde_json::{Map, Value};
use tracing::debug;

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::{Error, Result, require};
use crate::options::CallOptions;
use crate::request::{Params, RequestSpec};

/// Where a resource lives and how its JSON envelopes are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    /// Collection path, e.g. `/api/groups`.
    pub path: &'static str,
    /// Envelope key for a single object, e.g. `group`.
    pub singular: &'static str,
    /// Envelope key for a list, e.g. `groups`.
    pub plural: &'static str,
}

/// Filter for list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Page size.
    pub max: Option<u32>,
    /// Page offset.
    pub offset: Option<u32>,
    /// Free-text search.
    pub phrase: Option<String>,
    /// Exact name match.
    pub name: Option<String>,
    /// Any other query parameters.
    pub extra: Params,
}

impl ListFilter {
    /// Filter matching `name` exactly.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Query parameters for this filter.
    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut params = self.extra.clone();
        if let Some(max) = self.max {
            params.insert("max".into(), max.to_string());
        }
        if let Some(offset) = self.offset {
            params.insert("offset".into(), offset.to_string());
        }
        if let Some(phrase) = &self.phrase {
            params.insert("phrase".into(), phrase.clone());
        }
        if let Some(name) = &self.name {
            params.insert("name".into(), name.clone());
        }
        params
    }
}

/// CRUD operations for one resource, routed through a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct ResourceInterface<'a> {
    dispatcher: &'a Dispatcher,
    kind: ResourceKind,
    options: CallOptions,
}

impl<'a> ResourceInterface<'a> {
    /// Interface for `kind`.
    #[must_use]
    pub fn new(dispatcher: &'a Dispatcher, kind: ResourceKind) -> Self {
        Self {
            dispatcher,
            kind,
            options: CallOptions::default(),
        }
    }

    /// Call options applied to every request from this interface.
    #[must_use]
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// The resource this interface targets.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// List objects matching `filter`.
    pub async fn list(&self, filter: &ListFilter) -> Result<Dispatch<Value>> {
        let spec = RequestSpec::get(self.kind.path).query_map(filter.to_params());
        self.dispatcher.execute_json(spec, &self.options).await
    }

    /// Fetch one object by id.
    pub async fn get_by_id(&self, id: &str) -> Result<Dispatch<Value>> {
        let spec = RequestSpec::get(self.member_path(id)?);
        self.dispatcher.execute_json(spec, &self.options).await
    }

    /// Fetch the single object whose name is exactly `name`.
    ///
    /// The result has the same `{"<singular>": {...}}` shape as
    /// [`ResourceInterface::get_by_id`].
    pub async fn get_by_name(&self, name: &str) -> Result<Dispatch<Value>> {
        let name = require("name", name)?;
        self.list(&ListFilter::by_name(name))
            .await?
            .and_then(|listing| self.pick_by_name(&listing, name))
    }

    /// Create an object from `payload`.
    pub async fn create(&self, payload: Value) -> Result<Dispatch<Value>> {
        let spec = RequestSpec::post(self.kind.path).json(self.envelope(payload));
        self.dispatcher.execute_json(spec, &self.options).await
    }

    /// Update object `id` with `payload`.
    pub async fn update(&self, id: &str, payload: Value) -> Result<Dispatch<Value>> {
        let spec = RequestSpec::put(self.member_path(id)?).json(self.envelope(payload));
        self.dispatcher.execute_json(spec, &self.options).await
    }

    /// Delete object `id`.
    pub async fn destroy(&self, id: &str, params: &Params) -> Result<Dispatch<Value>> {
        let spec = RequestSpec::delete(self.member_path(id)?).query_map(params.clone());
        self.dispatcher.execute_json(spec, &self.options).await
    }

    /// Trigger `action` on object `id`, e.g. `start`.
    pub async fn action(&self, id: &str, action: &str) -> Result<Dispatch<Value>> {
        let action = require("action", action)?;
        let path = format!("{}/{action}", self.member_path(id)?);
        self.dispatcher
            .execute_json(RequestSpec::put(path), &self.options)
            .await
    }

    fn member_path(&self, id: &str) -> Result<String> {
        let id = require("id", id)?;
        Ok(format!("{}/{id}", self.kind.path))
    }

    fn envelope(&self, payload: Value) -> Value {
        let mut wrapped = Map::new();
        wrapped.insert(self.kind.singular.to_string(), payload);
        Value::Object(wrapped)
    }

    fn pick_by_name(&self, listing: &Value, name: &str) -> Result<Value> {
        let objects = listing
            .get(self.kind.plural)
            .and_then(Value::as_array)
            .ok_or_else(|| Error::UnexpectedResponse {
                reason: format!("missing '{}' array", self.kind.plural),
            })?;

        let matches: Vec<&Value> = objects
            .iter()
            .filter(|o| o.get("name").and_then(Value::as_str) == Some(name))
            .collect();
        debug!(kind = self.kind.singular, name, matches = matches.len(), "lookup by name");

        match matches.as_slice() {
            [] => Err(Error::NotFound {
                kind: self.kind.singular,
                name: name.to_string(),
            }),
            [one] => Ok(self.envelope((*one).clone())),
            many => Err(Error::Ambiguous {
                kind: self.kind.singular,
                name: name.to_string(),
                count: many.len(),
            }),
        }
    }
}
