//! Error types for the Morpheus API client.

use thiserror::Error;

/// Errors that can occur while assembling or dispatching an API request.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was missing or blank.
    #[error("{name} is required")]
    MissingArgument {
        /// Name of the missing argument.
        name: &'static str,
    },

    /// An argument was present but unusable.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// The HTTP method is not one the transport understands.
    #[error("unsupported http method: {method}")]
    UnsupportedMethod {
        /// The method as supplied by the caller.
        method: String,
    },

    /// The request reached the transport without a method.
    #[error("request to {url} has no http method")]
    MissingMethod {
        /// Target URL of the request.
        url: String,
    },

    /// The request URL could not be resolved against the base URL.
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// Connection, TLS or protocol failure in the transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("http {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("invalid json response: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file I/O failed during upload or download.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A lookup by name found nothing.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Resource kind, e.g. `group`.
        kind: &'static str,
        /// The name or id that was looked up.
        name: String,
    },

    /// A lookup by name matched more than one object.
    #[error("{count} {kind}s match name '{name}', use an id instead")]
    Ambiguous {
        /// Resource kind, e.g. `group`.
        kind: &'static str,
        /// The name that was looked up.
        name: String,
        /// Number of matches.
        count: usize,
    },

    /// The response did not have the expected shape.
    #[error("unexpected response: {reason}")]
    UnexpectedResponse {
        /// What was wrong with it.
        reason: String,
    },
}

impl Error {
    /// HTTP status carried by this error, if the server produced one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the error was raised before any network call was attempted.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. }
                | Self::InvalidArgument { .. }
                | Self::UnsupportedMethod { .. }
                | Self::InvalidUrl { .. }
        )
    }
}

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fails with [`Error::MissingArgument`] when `value` is empty or whitespace.
pub(crate) fn require<'a>(name: &'static str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingArgument { name });
    }
    Ok(trimmed)
}
