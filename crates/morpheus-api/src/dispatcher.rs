//! The shared request dispatcher.
//!
//! Every resource interface funnels through [`Dispatcher::execute`]. The
//! dispatcher merges call options over its instance defaults, injects the
//! bearer token and content type, then either hands back the assembled
//! [`RequestDescriptor`] (dry run) or performs the call and parses the
//! response.
//!
//! # Example
//!
//! ```rust,no_run
//! use morpheus_api::{CallOptions, Dispatch, Dispatcher, RequestSpec};
//!
//! # async fn example() -> morpheus_api::Result<()> {
//! let dispatcher = Dispatcher::new("https://morpheus.example.com")?
//!     .with_access_token("a1b2c3");
//! let spec = RequestSpec::get("/api/whoami");
//! match dispatcher.execute(spec, &CallOptions::new()).await? {
//!     Dispatch::Dispatched(response) => println!("{:?}", response.into_json()),
//!     Dispatch::WouldDispatch(request) => println!("would send {}", request.url),
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::options::CallOptions;
use crate::request::{
    AUTHORIZATION, CONTENT_TYPE, Method, Payload, RequestDescriptor, RequestSpec,
};

/// Timeout applied by the transport when neither the request nor the call
/// options set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a dispatch: either the call happened, or dry-run mode stopped
/// it and the assembled request is returned instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<T> {
    /// The request was sent and produced `T`.
    Dispatched(T),
    /// Dry run: nothing was sent.
    WouldDispatch(RequestDescriptor),
}

impl<T> Dispatch<T> {
    /// Transform the dispatched value, leaving a dry-run descriptor as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Dispatch<U> {
        match self {
            Self::Dispatched(value) => Dispatch::Dispatched(f(value)),
            Self::WouldDispatch(request) => Dispatch::WouldDispatch(request),
        }
    }

    /// Fallible [`Dispatch::map`].
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<Dispatch<U>> {
        match self {
            Self::Dispatched(value) => f(value).map(Dispatch::Dispatched),
            Self::WouldDispatch(request) => Ok(Dispatch::WouldDispatch(request)),
        }
    }

    /// The dispatched value, if the request was sent.
    pub fn dispatched(self) -> Option<T> {
        match self {
            Self::Dispatched(value) => Some(value),
            Self::WouldDispatch(_) => None,
        }
    }

    /// The assembled request, if this was a dry run.
    pub const fn descriptor(&self) -> Option<&RequestDescriptor> {
        match self {
            Self::Dispatched(_) => None,
            Self::WouldDispatch(request) => Some(request),
        }
    }

    /// Whether this was a dry run.
    pub const fn is_dry_run(&self) -> bool {
        matches!(self, Self::WouldDispatch(_))
    }
}

/// Response returned without JSON parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lower-case names.
    pub headers: BTreeMap<String, String>,
    /// Body as text.
    pub body: String,
}

/// Response from a dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Parsed JSON body. An empty body parses as `null`.
    Json(Value),
    /// Unparsed response.
    Raw(RawResponse),
}

impl ApiResponse {
    /// The body as JSON; a raw body becomes a JSON string.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Raw(raw) => Value::String(raw.body),
        }
    }
}

/// Assembles and executes API requests.
#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
    defaults: CallOptions,
    default_content_type: Option<String>,
    dry_run: bool,
    verify_ssl: bool,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.access_token.is_some())
            .field("dry_run", &self.dry_run)
            .field("verify_ssl", &self.verify_ssl)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher for the appliance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute `http` or `https` URL,
    /// or if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url.trim()).map_err(|source| Error::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::InvalidArgument {
                reason: format!("appliance url must be http or https: {base_url}"),
            });
        }

        Ok(Self {
            http: build_client(true)?,
            base_url: parsed,
            access_token: None,
            defaults: CallOptions::default(),
            default_content_type: None,
            dry_run: false,
            verify_ssl: true,
        })
    }

    /// Use `token` for `Authorization: Bearer` injection.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Instance-level default options, overridden by call options.
    #[must_use]
    pub fn with_defaults(mut self, defaults: CallOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Content type applied when a request sets none.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.default_content_type = Some(content_type.into());
        self
    }

    /// A copy of this dispatcher that injects no credentials.
    #[must_use]
    pub fn without_token(&self) -> Self {
        Self {
            access_token: None,
            ..self.clone()
        }
    }

    /// Toggle dry-run mode.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Toggle TLS certificate verification.
    pub fn set_verify_ssl(&mut self, verify_ssl: bool) {
        self.verify_ssl = verify_ssl;
    }

    /// Base URL of the appliance.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a bearer token is configured.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Whether dry-run mode is on.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether TLS certificates are verified.
    #[must_use]
    pub const fn verifies_ssl(&self) -> bool {
        self.verify_ssl
    }

    /// Assemble the request that [`Dispatcher::execute`] would send.
    ///
    /// Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown method or an unresolvable URL.
    pub fn assemble(&self, spec: RequestSpec, options: &CallOptions) -> Result<RequestDescriptor> {
        let merged = options.layered_over(&self.defaults);
        self.build(spec, &merged)
    }

    /// Assemble and, unless in dry-run mode, send the request.
    ///
    /// # Errors
    ///
    /// Returns usage errors before any I/O; transport, status and JSON
    /// errors are propagated as they occur. There are no retries.
    pub async fn execute(
        &self,
        spec: RequestSpec,
        options: &CallOptions,
    ) -> Result<Dispatch<ApiResponse>> {
        let merged = options.layered_over(&self.defaults);
        let descriptor = self.build(spec, &merged)?;

        if self.dry_run_for(&merged) {
            debug!(url = %descriptor.url, "dry run, request not sent");
            return Ok(Dispatch::WouldDispatch(descriptor));
        }

        let response = self.send(&descriptor).await?;

        if !descriptor.parse_json {
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| {
                    v.to_str()
                        .ok()
                        .map(|v| (k.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.text().await?;
            return Ok(Dispatch::Dispatched(ApiResponse::Raw(RawResponse {
                status,
                headers,
                body,
            })));
        }

        let text = response.text().await?;
        trace!(bytes = text.len(), "received response body");
        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok(Dispatch::Dispatched(ApiResponse::Json(value)))
    }

    /// Like [`Dispatcher::execute`], but always yields a JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::execute`].
    pub async fn execute_json(
        &self,
        spec: RequestSpec,
        options: &CallOptions,
    ) -> Result<Dispatch<Value>> {
        Ok(self.execute(spec, options).await?.map(ApiResponse::into_json))
    }

    /// Send the request and stream the response body into `dest`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the file cannot be written.
    pub async fn download(
        &self,
        spec: RequestSpec,
        options: &CallOptions,
        dest: &Path,
    ) -> Result<Dispatch<u64>> {
        let merged = options.layered_over(&self.defaults);
        let descriptor = self.build(spec.raw(), &merged)?;

        if self.dry_run_for(&merged) {
            debug!(url = %descriptor.url, dest = %dest.display(), "dry run, download skipped");
            return Ok(Dispatch::WouldDispatch(descriptor));
        }

        let response = self.send(&descriptor).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(bytes = written, dest = %dest.display(), "download complete");
        Ok(Dispatch::Dispatched(written))
    }

    fn dry_run_for(&self, merged: &CallOptions) -> bool {
        self.dry_run || merged.dry_run.unwrap_or(false)
    }

    fn build(&self, spec: RequestSpec, merged: &CallOptions) -> Result<RequestDescriptor> {
        let RequestSpec {
            method,
            url,
            headers,
            query,
            payload,
            timeout,
            skip_json_parsing,
        } = spec;

        let method = method.as_deref().map(str::parse::<Method>).transpose()?;
        let url = self.resolve_url(&url)?;

        let mut headers = headers.unwrap_or_default();
        if !headers.contains(AUTHORIZATION) {
            if let Some(token) = &self.access_token {
                headers.insert(AUTHORIZATION, format!("Bearer {token}"));
            }
        }

        if let Some(payload) = &payload {
            headers.insert_if_absent(CONTENT_TYPE, payload.content_type());
        }
        if let Some(content_type) = &self.default_content_type {
            headers.insert_if_absent(CONTENT_TYPE, content_type.as_str());
        }

        let timeout = merged.timeout.or(timeout);

        for (name, value) in &merged.headers {
            headers.insert(name, value.as_str());
        }

        if let Some(query) = query {
            if headers.params().is_none() {
                headers.set_params(query);
            }
        }

        let verify_ssl = self.verify_ssl && merged.verify_ssl.unwrap_or(true);
        let parse_json = !skip_json_parsing && merged.parse_json.unwrap_or(true);

        debug!(
            method = method.map_or("-", Method::as_str),
            url = %url,
            verify_ssl,
            "assembled request"
        );

        Ok(RequestDescriptor {
            method,
            url: url.to_string(),
            headers,
            payload,
            timeout,
            parse_json,
            verify_ssl,
        })
    }

    fn resolve_url(&self, url: &str) -> Result<Url> {
        let url = url.trim();
        let parse = |candidate: &str| {
            Url::parse(candidate).map_err(|source| Error::InvalidUrl {
                url: url.to_string(),
                source,
            })
        };

        let absolute = url.split_once("://").is_some_and(|(scheme, _)| {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        });
        if absolute {
            return parse(url);
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let path = url.trim_start_matches('/');
        parse(&format!("{base}/{path}"))
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<reqwest::Response> {
        let method = descriptor.method.ok_or_else(|| Error::MissingMethod {
            url: descriptor.url.clone(),
        })?;

        let client = if descriptor.verify_ssl {
            self.http.clone()
        } else {
            build_client(false)?
        };

        let mut request = client
            .request(method.into(), descriptor.url.as_str())
            .timeout(descriptor.timeout.unwrap_or(DEFAULT_TIMEOUT));

        if let Some(params) = descriptor.headers.params() {
            request = request.query(params);
        }
        for (name, value) in descriptor.headers.iter() {
            request = request.header(name, value);
        }

        request = match &descriptor.payload {
            None => request,
            Some(Payload::Json(body)) => request.body(serde_json::to_vec(body)?),
            Some(Payload::Form(fields)) => request.form(fields),
            Some(Payload::Text(body)) => request.body(body.clone()),
            Some(Payload::File { path }) => {
                let file = tokio::fs::File::open(path).await?;
                let len = file.metadata().await?.len();
                request
                    .header(reqwest::header::CONTENT_LENGTH, len)
                    .body(reqwest::Body::wrap_stream(ReaderStream::new(file)))
            }
        };

        debug!(method = %method, url = %descriptor.url, "sending request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "request failed");
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn build_client(verify_ssl: bool) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("morpheus-cli/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(!verify_ssl)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Headers, Params};
    use serde_json::json;
    use test_case::test_case;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new("https://h")
            .expect("valid url")
            .with_access_token("TKN")
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(Dispatcher::new("ftp://h").is_err());
        assert!(Dispatcher::new("not a url").is_err());
    }

    #[test]
    fn injects_exactly_one_bearer_header() {
        let descriptor = dispatcher()
            .assemble(RequestSpec::get("/api/groups"), &CallOptions::new())
            .expect("assemble");

        let auth: Vec<_> = descriptor
            .headers
            .iter()
            .filter(|(name, _)| *name == AUTHORIZATION)
            .collect();
        assert_eq!(auth, vec![("authorization", "Bearer TKN")]);
    }

    #[test]
    fn keeps_caller_authorization_in_any_casing() {
        for name in ["authorization", "Authorization", "AUTHORIZATION"] {
            let spec = RequestSpec::get("/api/x").header(name, "Bearer OTHER");
            let descriptor = dispatcher()
                .assemble(spec, &CallOptions::new())
                .expect("assemble");
            assert_eq!(descriptor.headers.get("authorization"), Some("Bearer OTHER"));
            assert_eq!(descriptor.headers.len(), 1);
        }
    }

    #[test]
    fn no_token_means_no_authorization() {
        let descriptor = dispatcher()
            .without_token()
            .assemble(RequestSpec::get("/api/ping"), &CallOptions::new())
            .expect("assemble");
        assert!(!descriptor.headers.contains(AUTHORIZATION));
    }

    #[test]
    fn method_is_normalized_or_left_unset() {
        let d = dispatcher();
        let upper = d
            .assemble(RequestSpec::new("/api/x").method("GET"), &CallOptions::new())
            .expect("assemble");
        assert_eq!(upper.method, Some(Method::Get));

        let absent = d
            .assemble(RequestSpec::new("/api/x"), &CallOptions::new())
            .expect("assemble");
        assert_eq!(absent.method, None);

        let bogus = d.assemble(RequestSpec::new("/api/x").method("FETCH"), &CallOptions::new());
        assert!(matches!(bogus, Err(Error::UnsupportedMethod { .. })));
    }

    #[test]
    fn default_content_type_applies_only_when_unset() {
        let d = dispatcher().with_content_type("application/json");
        let plain = d
            .assemble(RequestSpec::get("/api/x"), &CallOptions::new())
            .expect("assemble");
        assert_eq!(plain.headers.get(CONTENT_TYPE), Some("application/json"));

        let custom = d
            .assemble(
                RequestSpec::get("/api/x").header("Content-Type", "text/csv"),
                &CallOptions::new(),
            )
            .expect("assemble");
        assert_eq!(custom.headers.get(CONTENT_TYPE), Some("text/csv"));

        let form = d
            .assemble(RequestSpec::post("/api/x").form(Params::new()), &CallOptions::new())
            .expect("assemble");
        assert_eq!(
            form.headers.get(CONTENT_TYPE),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn call_timeout_overrides_request_timeout() {
        let spec = RequestSpec::get("/api/x").timeout(Duration::from_secs(60));
        let options = CallOptions::new().timeout(Duration::from_secs(5));
        let descriptor = dispatcher().assemble(spec, &options).expect("assemble");
        assert_eq!(descriptor.timeout, Some(Duration::from_secs(5)));

        let unset = dispatcher()
            .assemble(RequestSpec::get("/api/x"), &options)
            .expect("assemble");
        assert_eq!(unset.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn instance_timeout_applies_when_call_sets_none() {
        let d = dispatcher().with_defaults(CallOptions::new().timeout(Duration::from_secs(90)));
        let descriptor = d
            .assemble(RequestSpec::get("/api/x"), &CallOptions::new())
            .expect("assemble");
        assert_eq!(descriptor.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn extra_headers_win_over_request_headers() {
        let spec = RequestSpec::get("/api/x").header("X-Scope", "request");
        let options = CallOptions::new()
            .header("x-scope", "call")
            .header("Authorization", "Basic abc");
        let descriptor = dispatcher().assemble(spec, &options).expect("assemble");
        assert_eq!(descriptor.headers.get("x-scope"), Some("call"));
        assert_eq!(descriptor.headers.get("authorization"), Some("Basic abc"));
    }

    #[test]
    fn query_is_copied_into_params_slot() {
        let spec = RequestSpec::get("/api/groups")
            .query("max", "25")
            .query("phrase", "prod");
        let descriptor = dispatcher()
            .assemble(spec, &CallOptions::new())
            .expect("assemble");
        let expected = Params::from([
            ("max".to_string(), "25".to_string()),
            ("phrase".to_string(), "prod".to_string()),
        ]);
        assert_eq!(descriptor.headers.params(), Some(&expected));
    }

    #[test]
    fn existing_params_slot_is_kept() {
        let mut headers = Headers::new();
        headers.set_params(Params::from([("keep".to_string(), "1".to_string())]));
        let spec = RequestSpec {
            headers: Some(headers),
            ..RequestSpec::get("/api/x").query("drop", "1")
        };
        let descriptor = dispatcher()
            .assemble(spec, &CallOptions::new())
            .expect("assemble");
        let params = descriptor.headers.params().expect("params");
        assert!(params.contains_key("keep"));
        assert!(!params.contains_key("drop"));
    }

    #[test]
    fn ssl_toggle_is_sticky() {
        let mut d = dispatcher();
        d.set_verify_ssl(false);
        let descriptor = d
            .assemble(
                RequestSpec::get("/api/x"),
                &CallOptions {
                    verify_ssl: Some(true),
                    ..CallOptions::default()
                },
            )
            .expect("assemble");
        assert!(!descriptor.verify_ssl);

        let per_call = dispatcher()
            .assemble(RequestSpec::get("/api/x"), &CallOptions::new().insecure())
            .expect("assemble");
        assert!(!per_call.verify_ssl);
    }

    #[test]
    fn relative_and_absolute_urls_resolve() {
        let d = Dispatcher::new("https://h/morpheus/").expect("valid url");
        let rel = d
            .assemble(RequestSpec::get("/api/x"), &CallOptions::new())
            .expect("assemble");
        assert_eq!(rel.url, "https://h/morpheus/api/x");

        let abs = d
            .assemble(RequestSpec::get("https://other/api/y"), &CallOptions::new())
            .expect("assemble");
        assert_eq!(abs.url, "https://other/api/y");

        let upper = d
            .assemble(RequestSpec::get("HTTPS://Other/api/z"), &CallOptions::new())
            .expect("assemble");
        assert_eq!(upper.url, "https://other/api/z");
    }

    #[tokio::test]
    async fn dry_run_returns_descriptor_without_io() {
        // Nothing listens on h; a real send would fail.
        let spec = RequestSpec::new("https://h/api/x")
            .method("post")
            .json(json!({"a": 1}));
        let result = dispatcher()
            .execute(spec, &CallOptions::new().dry_run(true))
            .await
            .expect("dry run");

        let descriptor = result.descriptor().expect("descriptor");
        assert_eq!(descriptor.method, Some(Method::Post));
        assert_eq!(descriptor.headers.get("authorization"), Some("Bearer TKN"));
        assert_eq!(descriptor.payload, Some(Payload::Json(json!({"a": 1}))));
    }

    #[tokio::test]
    async fn dispatcher_dry_run_toggle_applies_to_every_call() {
        let mut d = dispatcher();
        d.set_dry_run(true);
        let result = d
            .execute(RequestSpec::delete("/api/groups/1"), &CallOptions::new().dry_run(false))
            .await
            .expect("dry run");
        assert!(result.is_dry_run());
    }

    #[tokio::test]
    async fn parses_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/groups"))
            .and(header("authorization", "Bearer TKN"))
            .and(query_param("max", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "groups": [{"id": 1, "name": "dev"}],
                "meta": {"total": 1}
            })))
            .mount(&server)
            .await;

        let d = Dispatcher::new(&server.uri())
            .expect("valid url")
            .with_access_token("TKN");
        let response = d
            .execute_json(RequestSpec::get("/api/groups").query("max", "5"), &CallOptions::new())
            .await
            .expect("request")
            .dispatched()
            .expect("dispatched");
        assert_eq!(response["groups"][0]["name"], "dev");
        assert_eq!(response["meta"]["total"], 1);
    }

    #[test_case("[1, 2]" ; "array")]
    #[test_case("42" ; "number")]
    #[test_case("\"ok\"" ; "string")]
    #[tokio::test]
    async fn parses_non_object_json_bodies(body: &str) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let response = d
            .execute_json(RequestSpec::get("/api/ping"), &CallOptions::new())
            .await
            .expect("request")
            .dispatched()
            .expect("dispatched");
        let expected: Value = serde_json::from_str(body).expect("valid json");
        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn sends_json_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/groups"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"group": {"name": "dev"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let response = d
            .execute(
                RequestSpec::post("/api/groups").json(json!({"group": {"name": "dev"}})),
                &CallOptions::new(),
            )
            .await
            .expect("request");
        assert_eq!(
            response,
            Dispatch::Dispatched(ApiResponse::Json(json!({"success": true})))
        );
    }

    #[tokio::test]
    async fn skip_json_returns_raw_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/report.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
            .mount(&server)
            .await;

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let response = d
            .execute(RequestSpec::get("/api/report.csv"), &CallOptions::new().skip_json())
            .await
            .expect("request")
            .dispatched()
            .expect("dispatched");
        match response {
            ApiResponse::Raw(raw) => {
                assert_eq!(raw.status, 200);
                assert_eq!(raw.body, "a,b\n1,2\n");
            }
            ApiResponse::Json(other) => panic!("expected raw response, got {other}"),
        }
    }

    #[tokio::test]
    async fn empty_body_parses_as_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/groups/7"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let value = d
            .execute_json(RequestSpec::delete("/api/groups/7"), &CallOptions::new())
            .await
            .expect("request")
            .dispatched();
        assert_eq!(value, Some(Value::Null));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/groups/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{\"msg\":\"not found\"}"))
            .mount(&server)
            .await;

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let err = d
            .execute(RequestSpec::get("/api/groups/404"), &CallOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let err = d
            .execute(RequestSpec::get("/api/broken"), &CallOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn missing_method_fails_at_transport() {
        let server = MockServer::start().await;
        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let err = d
            .execute(RequestSpec::new("/api/x"), &CallOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingMethod { .. }));
    }

    #[tokio::test]
    async fn download_streams_to_file() {
        let server = MockServer::start().await;
        let body = vec![7_u8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/api/archives/download/b/f.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("f.bin");
        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let written = d
            .download(
                RequestSpec::get("/api/archives/download/b/f.bin"),
                &CallOptions::new(),
                &dest,
            )
            .await
            .expect("download")
            .dispatched();
        assert_eq!(written, Some(body.len() as u64));
        assert_eq!(std::fs::read(&dest).expect("read"), body);
    }

    #[tokio::test]
    async fn uploads_file_as_octet_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/archives/buckets/b/files/"))
            .and(header("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("app.tar");
        std::fs::write(&src, b"payload").expect("write");

        let d = Dispatcher::new(&server.uri()).expect("valid url");
        let response = d
            .execute_json(
                RequestSpec::post("/api/archives/buckets/b/files/").file(&src),
                &CallOptions::new(),
            )
            .await
            .expect("upload")
            .dispatched();
        assert_eq!(response, Some(json!({"success": true})));

        let requests = server.received_requests().await.expect("recording on");
        assert_eq!(requests[0].body, b"payload");
    }
}
