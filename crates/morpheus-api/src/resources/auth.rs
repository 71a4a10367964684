//! Token endpoint.
//!
//! Login is an ordinary dispatched call: a form post to `/oauth/token` sent
//! without a bearer header.

use serde::{Deserialize, Serialize};

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::{Error, Result, require};
use crate::options::CallOptions;
use crate::request::{Params, RequestSpec};

/// OAuth client id the appliance issues CLI tokens to.
pub const CLIENT_ID: &str = "morph-cli";

const TOKEN_PATH: &str = "/oauth/token";

/// Access token issued by the appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to obtain a new access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Usually `bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Token endpoint interface.
#[derive(Debug, Clone)]
pub struct AuthInterface {
    dispatcher: Dispatcher,
    options: CallOptions,
}

impl AuthInterface {
    /// Interface on `dispatcher`; any configured token is dropped.
    #[must_use]
    pub fn new(dispatcher: &Dispatcher) -> Self {
        Self {
            dispatcher: dispatcher.without_token(),
            options: CallOptions::default(),
        }
    }

    /// Call options applied to every request from this interface.
    #[must_use]
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Exchange a username and password for a token.
    pub async fn login(&self, username: &str, password: &str) -> Result<Dispatch<TokenGrant>> {
        let username = require("username", username)?;
        if password.is_empty() {
            return Err(Error::MissingArgument { name: "password" });
        }

        let form = Params::from([
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ]);
        self.token_request("password", form).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Dispatch<TokenGrant>> {
        let refresh_token = require("refresh token", refresh_token)?;
        let form = Params::from([("refresh_token".to_string(), refresh_token.to_string())]);
        self.token_request("refresh_token", form).await
    }

    async fn token_request(&self, grant_type: &str, form: Params) -> Result<Dispatch<TokenGrant>> {
        let spec = RequestSpec::post(TOKEN_PATH)
            .query("grant_type", grant_type)
            .query("scope", "write")
            .query("client_id", CLIENT_ID)
            .form(form);

        self.dispatcher
            .execute_json(spec, &self.options)
            .await?
            .and_then(|body| Ok(serde_json::from_value(body)?))
    }
}
