//! Per-invocation state: which remote, which token, and the dispatcher
//! configured from the global flags.

use std::time::Duration;

use chrono::Utc;
use morpheus_api::{CallOptions, Dispatcher};
use tracing::{debug, warn};

use crate::cli::GlobalArgs;
use crate::config::{ACCESS_TOKEN_ENV, ConfigDir, REMOTE_URL_ENV, Remote, StoredToken};
use crate::error::CliError;

/// Remote name used when the URL comes from the environment.
const ENV_REMOTE: &str = "env";

/// Environment overrides that bypass the on-disk registry and credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Appliance URL.
    pub remote_url: Option<String>,
    /// Access token.
    pub access_token: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            remote_url: read(REMOTE_URL_ENV),
            access_token: read(ACCESS_TOKEN_ENV),
        }
    }
}

/// Resolved remote, credentials and dispatcher for one command.
#[derive(Debug)]
pub struct Context {
    config: ConfigDir,
    remote_name: String,
    remote: Remote,
    token: Option<StoredToken>,
    dispatcher: Dispatcher,
}

impl Context {
    /// Resolve the remote and credentials and build the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if no remote can be selected or state files are
    /// unreadable.
    pub fn resolve(
        global: &GlobalArgs,
        config: ConfigDir,
        overrides: &EnvOverrides,
    ) -> Result<Self, CliError> {
        let (remote_name, remote) = match &overrides.remote_url {
            Some(url) => {
                debug!(url, "using remote from environment");
                let remote = Remote {
                    url: url.clone(),
                    insecure: false,
                };
                remote.validate()?;
                (
                    global.remote.clone().unwrap_or_else(|| ENV_REMOTE.to_string()),
                    remote,
                )
            }
            None => {
                let registry = config.load_remotes()?;
                let (name, remote) = registry.select(global.remote.as_deref())?;
                (name.to_string(), remote.clone())
            }
        };

        let token = match &overrides.access_token {
            Some(token) => Some(StoredToken {
                access_token: token.clone(),
                refresh_token: None,
                username: None,
                expires_at: None,
            }),
            None => config.load_credentials()?.get(&remote_name).cloned(),
        };

        let dispatcher = build_dispatcher(global, &remote, token.as_ref())?;
        debug!(
            remote = %remote_name,
            url = %remote.url,
            logged_in = token.is_some(),
            "resolved context"
        );

        Ok(Self {
            config,
            remote_name,
            remote,
            token,
            dispatcher,
        })
    }

    /// CLI home directory.
    #[must_use]
    pub const fn config(&self) -> &ConfigDir {
        &self.config
    }

    /// Name of the selected remote.
    #[must_use]
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// The selected remote.
    #[must_use]
    pub const fn remote(&self) -> &Remote {
        &self.remote
    }

    /// Stored token, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&StoredToken> {
        self.token.as_ref()
    }

    /// Whether the dispatcher is in dry-run mode.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dispatcher.is_dry_run()
    }

    /// Dispatcher without a login check, for login itself.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Dispatcher for authenticated calls.
    ///
    /// Dry runs pass without a token so the request can still be shown.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NotLoggedIn`] if there is no token.
    pub fn require_login(&self) -> Result<&Dispatcher, CliError> {
        match &self.token {
            Some(token) => {
                if token.is_expired(Utc::now()) {
                    warn!(
                        remote = %self.remote_name,
                        "access token has expired, run `morpheus login --refresh`"
                    );
                }
                Ok(&self.dispatcher)
            }
            None if self.is_dry_run() => Ok(&self.dispatcher),
            None => Err(CliError::NotLoggedIn(self.remote_name.clone())),
        }
    }
}

fn build_dispatcher(
    global: &GlobalArgs,
    remote: &Remote,
    token: Option<&StoredToken>,
) -> Result<Dispatcher, CliError> {
    let mut defaults = CallOptions::new();
    if let Some(secs) = global.timeout {
        defaults = defaults.timeout(Duration::from_secs(secs));
    }
    for (name, value) in &global.headers {
        defaults = defaults.header(name, value.clone());
    }

    let mut dispatcher = Dispatcher::new(&remote.url)?.with_defaults(defaults);
    if let Some(token) = token {
        dispatcher = dispatcher.with_access_token(token.access_token.clone());
    }
    dispatcher.set_dry_run(global.dry_run);
    dispatcher.set_verify_ssl(!(global.insecure || remote.insecure));
    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use chrono::Duration as ChronoDuration;
    use morpheus_api::RequestSpec;

    fn home_with_remote(insecure: bool) -> (tempfile::TempDir, ConfigDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ConfigDir::new(dir.path());
        let mut registry = crate::config::RemoteRegistry::default();
        registry
            .add(
                "prod",
                Remote {
                    url: "https://prod.example.com".into(),
                    insecure,
                },
            )
            .expect("add");
        config.save_remotes(&registry).expect("save");
        (dir, config)
    }

    #[test]
    fn resolves_active_remote_and_stored_token() {
        let (_dir, config) = home_with_remote(false);
        let mut credentials = Credentials::default();
        credentials.set(
            "prod",
            StoredToken {
                access_token: "stored".into(),
                refresh_token: None,
                username: Some("admin".into()),
                expires_at: None,
            },
        );
        config.save_credentials(&credentials).expect("save");

        let ctx = Context::resolve(&GlobalArgs::default(), config, &EnvOverrides::default())
            .expect("resolve");
        assert_eq!(ctx.remote_name(), "prod");
        let dispatcher = ctx.require_login().expect("logged in");
        let request = dispatcher
            .assemble(RequestSpec::get("/api/whoami"), &CallOptions::default())
            .expect("assemble");
        assert_eq!(request.headers.get("authorization"), Some("Bearer stored"));
        assert!(request.verify_ssl);
    }

    #[test]
    fn missing_token_is_not_logged_in() {
        let (_dir, config) = home_with_remote(false);
        let ctx = Context::resolve(&GlobalArgs::default(), config, &EnvOverrides::default())
            .expect("resolve");
        assert!(matches!(ctx.require_login(), Err(CliError::NotLoggedIn(name)) if name == "prod"));
    }

    #[test]
    fn dry_run_does_not_need_a_token() {
        let (_dir, config) = home_with_remote(false);
        let global = GlobalArgs {
            dry_run: true,
            ..GlobalArgs::default()
        };
        let ctx = Context::resolve(&global, config, &EnvOverrides::default()).expect("resolve");
        assert!(ctx.require_login().is_ok());
    }

    #[test]
    fn expired_token_still_dispatches() {
        let (_dir, config) = home_with_remote(false);
        let mut credentials = Credentials::default();
        credentials.set(
            "prod",
            StoredToken {
                access_token: "old".into(),
                refresh_token: Some("r".into()),
                username: None,
                expires_at: Some(Utc::now() - ChronoDuration::hours(1)),
            },
        );
        config.save_credentials(&credentials).expect("save");
        let ctx = Context::resolve(&GlobalArgs::default(), config, &EnvOverrides::default())
            .expect("resolve");
        assert!(ctx.require_login().is_ok());
    }

    #[test]
    fn environment_overrides_bypass_registry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let overrides = EnvOverrides {
            remote_url: Some("http://127.0.0.1:8080".into()),
            access_token: Some("env-token".into()),
        };
        let ctx = Context::resolve(&GlobalArgs::default(), ConfigDir::new(dir.path()), &overrides)
            .expect("resolve");
        assert_eq!(ctx.remote_name(), "env");
        assert_eq!(
            ctx.token().map(|t| t.access_token.as_str()),
            Some("env-token")
        );
    }

    #[test]
    fn global_flags_become_dispatcher_defaults() {
        let (_dir, config) = home_with_remote(true);
        let global = GlobalArgs {
            timeout: Some(5),
            headers: vec![("X-Tenant".into(), "acme".into())],
            dry_run: true,
            ..GlobalArgs::default()
        };
        let ctx = Context::resolve(&global, config, &EnvOverrides::default()).expect("resolve");
        let request = ctx
            .dispatcher()
            .assemble(RequestSpec::get("/api/groups"), &CallOptions::default())
            .expect("assemble");
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.headers.get("x-tenant"), Some("acme"));
        assert!(!request.verify_ssl);
        assert!(ctx.is_dry_run());
    }

    #[test]
    fn no_remote_configured() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Context::resolve(
            &GlobalArgs::default(),
            ConfigDir::new(dir.path()),
            &EnvOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::NoRemote));
    }
}
