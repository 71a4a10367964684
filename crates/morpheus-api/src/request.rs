//! Request intentions and the descriptors assembled from them.
//!
//! A [`RequestSpec`] is what a resource interface wants to send: a URL, maybe
//! a method, headers, query parameters and a payload. The dispatcher turns it
//! into a [`RequestDescriptor`], which is the exact request that goes out on
//! the wire (or gets printed, in dry-run mode).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

/// Query parameters, ordered for stable output.
pub type Params = BTreeMap<String, String>;

/// Header name for credentials.
pub const AUTHORIZATION: &str = "authorization";

/// Header name for the body media type.
pub const CONTENT_TYPE: &str = "content-type";

/// HTTP method in canonical lower-case form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl Method {
    /// Canonical lower-case token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            "head" => Ok(Self::Head),
            "options" => Ok(Self::Options),
            _ => Err(Error::UnsupportedMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
            Method::Head => Self::HEAD,
            Method::Options => Self::OPTIONS,
        }
    }
}

/// Header bag with case-insensitive names.
///
/// Names are stored lower-cased, so `Authorization` and `authorization` are
/// the same entry. Query parameters ride along in the nested `params` slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headers {
    #[serde(flatten)]
    entries: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Params>,
}

impl Headers {
    /// Create an empty header bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a header value by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether a header with this name is present, ignoring case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Set a header, replacing any existing value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Set a header only if it is not already present.
    pub fn insert_if_absent(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .entry(name.as_ref().to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers, not counting the params slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The nested query-parameter slot.
    #[must_use]
    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Fill the nested query-parameter slot.
    pub fn set_params(&mut self, params: Params) {
        self.params = Some(params);
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// JSON document.
    Json(Value),
    /// URL-encoded form fields.
    Form(Params),
    /// Plain text.
    Text(String),
    /// Local file streamed as the raw body.
    File {
        /// Path of the file to stream.
        path: PathBuf,
    },
}

impl Payload {
    /// Media type implied by the payload kind.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "application/json",
            Self::Form(_) => "application/x-www-form-urlencoded",
            Self::Text(_) => "text/plain",
            Self::File { .. } => "application/octet-stream",
        }
    }
}

/// What a resource interface wants to send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSpec {
    /// HTTP method as written by the caller, any casing.
    pub method: Option<String>,
    /// Absolute URL, or a path relative to the dispatcher's base URL.
    pub url: String,
    /// Caller-supplied headers.
    pub headers: Option<Headers>,
    /// Query parameters.
    pub query: Option<Params>,
    /// Request body.
    pub payload: Option<Payload>,
    /// Request-level timeout.
    pub timeout: Option<Duration>,
    /// Return the raw response instead of parsing JSON.
    pub skip_json_parsing: bool,
}

impl RequestSpec {
    /// Request for `url` with no method set.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// `GET url`
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method("get")
    }

    /// `POST url`
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method("post")
    }

    /// `PUT url`
    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(url).method("put")
    }

    /// `DELETE url`
    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url).method("delete")
    }

    /// Set the method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name, value);
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(Params::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add every entry of `params` as a query parameter.
    #[must_use]
    pub fn query_map(mut self, params: Params) -> Self {
        self.query.get_or_insert_with(Params::new).extend(params);
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.payload = Some(Payload::Json(body));
        self
    }

    /// Attach a URL-encoded form body.
    #[must_use]
    pub fn form(mut self, fields: Params) -> Self {
        self.payload = Some(Payload::Form(fields));
        self
    }

    /// Stream a local file as the body.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.payload = Some(Payload::File { path: path.into() });
        self
    }

    /// Set the request-level timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Return the raw response body instead of parsed JSON.
    #[must_use]
    pub const fn raw(mut self) -> Self {
        self.skip_json_parsing = true;
        self
    }
}

/// A fully assembled request, exactly as it will be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDescriptor {
    /// Canonical method; `None` if the caller never set one.
    pub method: Option<Method>,
    /// Absolute URL.
    pub url: String,
    /// Final headers, including injected credentials.
    pub headers: Headers,
    /// Request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    /// Effective timeout.
    #[serde(serialize_with = "serialize_secs")]
    pub timeout: Option<Duration>,
    /// Whether the response body is parsed as JSON.
    pub parse_json: bool,
    /// Whether TLS certificates are verified.
    pub verify_ssl: bool,
}

impl RequestDescriptor {
    /// Copy with credentials masked, for printing.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(value) = copy.headers.get(AUTHORIZATION) {
            let masked = match value.split_once(' ') {
                Some((scheme, _)) => format!("{scheme} {REDACTED}"),
                None => REDACTED.to_string(),
            };
            copy.headers.insert(AUTHORIZATION, masked);
        }
        if let Some(Payload::Form(fields)) = &mut copy.payload {
            for key in ["password", "refresh_token"] {
                if let Some(value) = fields.get_mut(key) {
                    *value = REDACTED.to_string();
                }
            }
        }
        copy
    }
}

const REDACTED: &str = "************";

fn serialize_secs<S: Serializer>(timeout: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match timeout {
        Some(t) => s.serialize_f64(t.as_secs_f64()),
        None => s.serialize_none(),
    }
}
