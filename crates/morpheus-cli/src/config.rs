//! On-disk CLI state: the remote registry and stored credentials.
//!
//! Both live under the CLI home directory:
//! - `remotes.toml`: named appliances and which one is active
//! - `credentials.toml`: access tokens per remote

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CliError;

/// Overrides the CLI home directory.
pub const HOME_ENV: &str = "MORPHEUS_CLI_HOME";

/// Test-harness override for the appliance URL; bypasses the registry.
pub const REMOTE_URL_ENV: &str = "MORPHEUS_REMOTE_URL";

/// Test-harness override for the access token; bypasses stored credentials.
pub const ACCESS_TOKEN_ENV: &str = "MORPHEUS_ACCESS_TOKEN";

const REMOTES_FILE: &str = "remotes.toml";
const CREDENTIALS_FILE: &str = "credentials.toml";

/// The CLI home directory and the files inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// Use `root` as the home directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$MORPHEUS_CLI_HOME`, else `~/.morpheus`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither is available.
    pub fn discover() -> Result<Self, CliError> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        dirs::home_dir()
            .map(|home| Self::new(home.join(".morpheus")))
            .ok_or_else(|| {
                CliError::Config(format!("cannot determine home directory, set {HOME_ENV}"))
            })
    }

    /// Home directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the remote registry.
    #[must_use]
    pub fn remotes_path(&self) -> PathBuf {
        self.root.join(REMOTES_FILE)
    }

    /// Path of the credentials file.
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    /// Load the remote registry, empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_remotes(&self) -> Result<RemoteRegistry, CliError> {
        load_toml(&self.remotes_path())
    }

    /// Write the remote registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_remotes(&self, registry: &RemoteRegistry) -> Result<(), CliError> {
        save_toml(&self.remotes_path(), registry, false)
    }

    /// Load stored credentials, empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_credentials(&self) -> Result<Credentials, CliError> {
        load_toml(&self.credentials_path())
    }

    /// Write stored credentials, readable only by the owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_credentials(&self, credentials: &Credentials) -> Result<(), CliError> {
        save_toml(&self.credentials_path(), credentials, true)
    }
}

fn load_toml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, CliError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file, using defaults");
            return Ok(T::default());
        }
        Err(e) => {
            return Err(CliError::Config(format!(
                "failed to read '{}': {e}",
                path.display()
            )));
        }
    };
    toml::from_str(&content)
        .map_err(|e| CliError::Config(format!("invalid TOML in '{}': {e}", path.display())))
}

fn save_toml<T: Serialize>(path: &Path, value: &T, private: bool) -> Result<(), CliError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let content = toml::to_string_pretty(value)
        .map_err(|e| CliError::Config(format!("failed to serialize '{}': {e}", path.display())))?;

    // Written beside the target and renamed over it, so readers never see a
    // partial file and a token file is never world-readable.
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if private { 0o600 } else { 0o644 };
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = private;

    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), "saved state file");
    Ok(())
}

/// A configured appliance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Remote {
    /// Appliance base URL.
    pub url: String,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,
}

impl Remote {
    /// Validate the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not `http://` or `https://`.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.url.trim().is_empty() {
            return Err(CliError::InvalidArgument("remote url cannot be empty".into()));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(CliError::InvalidArgument(format!(
                "remote url must start with http:// or https://: {}",
                self.url
            )));
        }
        Ok(())
    }
}

/// Named remotes plus the active selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteRegistry {
    /// Name of the active remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    /// Remotes by name.
    #[serde(default)]
    pub remotes: BTreeMap<String, Remote>,
}

impl RemoteRegistry {
    /// Add or replace a remote. The first remote added becomes active.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or URL is invalid.
    pub fn add(&mut self, name: &str, remote: Remote) -> Result<(), CliError> {
        validate_name(name)?;
        remote.validate()?;
        if self.remotes.insert(name.to_string(), remote).is_some() {
            warn!(remote = name, "replacing existing remote");
        }
        if self.active.is_none() {
            self.active = Some(name.to_string());
        }
        Ok(())
    }

    /// Remove a remote, clearing the active selection if it pointed there.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote does not exist.
    pub fn remove(&mut self, name: &str) -> Result<Remote, CliError> {
        let removed = self
            .remotes
            .remove(name)
            .ok_or_else(|| CliError::RemoteNotFound(name.to_string()))?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        Ok(removed)
    }

    /// Make `name` the active remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote does not exist.
    pub fn set_active(&mut self, name: &str) -> Result<(), CliError> {
        if !self.remotes.contains_key(name) {
            return Err(CliError::RemoteNotFound(name.to_string()));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Look up a remote by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Remote> {
        self.remotes.get(name)
    }

    /// `name` if given, else the active remote.
    ///
    /// # Errors
    ///
    /// Returns an error if the named remote is unknown or nothing is active.
    pub fn select<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Remote), CliError> {
        let name = name.or(self.active.as_deref()).ok_or(CliError::NoRemote)?;
        let remote = self
            .get(name)
            .ok_or_else(|| CliError::RemoteNotFound(name.to_string()))?;
        Ok((name, remote))
    }
}

fn validate_name(name: &str) -> Result<(), CliError> {
    if name.is_empty() {
        return Err(CliError::InvalidArgument("remote name cannot be empty".into()));
    }
    if name.len() > 64 {
        return Err(CliError::InvalidArgument(
            "remote name cannot exceed 64 characters".into(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CliError::InvalidArgument(
            "remote name must contain only alphanumeric characters, '.', '-' and '_'".into(),
        ));
    }
    Ok(())
}

/// A token stored for one remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredToken {
    /// Bearer token.
    pub access_token: String,
    /// Refresh token, if the appliance issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// User the token belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// When the access token stops working.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Token from a grant issued at `now`.
    #[must_use]
    pub fn from_grant(
        grant: morpheus_api::resources::TokenGrant,
        username: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let expires_at = grant
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| now + Duration::seconds(secs));
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            username,
            expires_at,
        }
    }

    /// Whether the token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Stored tokens by remote name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Tokens by remote name.
    #[serde(default)]
    pub tokens: BTreeMap<String, StoredToken>,
}

impl Credentials {
    /// Token for `remote`.
    #[must_use]
    pub fn get(&self, remote: &str) -> Option<&StoredToken> {
        self.tokens.get(remote)
    }

    /// Store the token for `remote`.
    pub fn set(&mut self, remote: &str, token: StoredToken) {
        self.tokens.insert(remote.to_string(), token);
    }

    /// Forget the token for `remote`.
    pub fn remove(&mut self, remote: &str) -> Option<StoredToken> {
        self.tokens.remove(remote)
    }
}
