//! Layered per-call options.
//!
//! Precedence is call-site, then instance-level defaults, then the built-in
//! default that applies when a field is left unset at both levels.

use std::collections::BTreeMap;
use std::time::Duration;

/// Cross-call settings applied while assembling a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Return the assembled request instead of sending it.
    pub dry_run: Option<bool>,
    /// Timeout override.
    pub timeout: Option<Duration>,
    /// Extra headers merged over the request's own headers.
    pub headers: BTreeMap<String, String>,
    /// `Some(false)` returns the raw response instead of parsed JSON.
    pub parse_json: Option<bool>,
    /// `Some(false)` skips TLS certificate verification.
    pub verify_ssl: Option<bool>,
}

impl CallOptions {
    /// Options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dry-run flag.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    /// Set a timeout override.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an extra header.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Return raw responses instead of parsed JSON.
    #[must_use]
    pub const fn skip_json(mut self) -> Self {
        self.parse_json = Some(false);
        self
    }

    /// Skip TLS certificate verification.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.verify_ssl = Some(false);
        self
    }

    /// Resolve `self` over `defaults`.
    ///
    /// Scalar fields take the call-site value when set. Headers merge
    /// key-wise, case-insensitively, with call-site values winning.
    #[must_use]
    pub fn layered_over(&self, defaults: &Self) -> Self {
        let mut headers: BTreeMap<String, String> = defaults
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        for (name, value) in &self.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        Self {
            dry_run: self.dry_run.or(defaults.dry_run),
            timeout: self.timeout.or(defaults.timeout),
            headers,
            parse_json: self.parse_json.or(defaults.parse_json),
            verify_ssl: self.verify_ssl.or(defaults.verify_ssl),
        }
    }
}
