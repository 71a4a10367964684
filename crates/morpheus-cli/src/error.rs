//! CLI error types and exit codes.

use thiserror::Error;

/// Exit code for a declined confirmation prompt.
pub const EXIT_ABORTED: u8 = 9;

/// Exit code for bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Exit code when credentials are missing or rejected.
pub const EXIT_UNAUTHORIZED: u8 = 3;

/// Exit code for everything else.
pub const EXIT_FAILURE: u8 = 1;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// API call failed.
    #[error(transparent)]
    Api(#[from] morpheus_api::Error),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No remote selected and none active.
    #[error("no remote appliance configured, see `morpheus remote add`")]
    NoRemote,

    /// Named remote is not in the registry.
    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    /// No stored credentials for the remote.
    #[error("not logged in to {0}, see `morpheus login`")]
    NotLoggedIn(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The appliance answered with `success: false`.
    #[error("request was rejected: {0}")]
    Rejected(String),

    /// The user declined a confirmation prompt.
    #[error("aborted")]
    Aborted,
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Aborted => EXIT_ABORTED,
            Self::InvalidArgument(_) | Self::RemoteNotFound(_) | Self::NoRemote => EXIT_USAGE,
            Self::NotLoggedIn(_) => EXIT_UNAUTHORIZED,
            Self::Api(e) if e.is_usage() => EXIT_USAGE,
            Self::Api(e) if e.status() == Some(401) => EXIT_UNAUTHORIZED,
            _ => EXIT_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_action_is_a_plain_failure() {
        let err = CliError::Rejected("instance is locked".into());
        assert_eq!(err.to_string(), "request was rejected: instance is locked");
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn cli_error_display_not_logged_in() {
        let err = CliError::NotLoggedIn("prod".into());
        assert_eq!(err.to_string(), "not logged in to prod, see `morpheus login`");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }

    #[test]
    fn api_errors_display_transparently() {
        let err = CliError::from(morpheus_api::Error::MissingArgument { name: "id" });
        assert_eq!(err.to_string(), "id is required");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(CliError::Aborted.exit_code(), 9);
        assert_eq!(CliError::InvalidArgument("x".into()).exit_code(), EXIT_USAGE);
        assert_eq!(CliError::NotLoggedIn("prod".into()).exit_code(), EXIT_UNAUTHORIZED);
        assert_eq!(
            CliError::from(morpheus_api::Error::MissingArgument { name: "id" }).exit_code(),
            EXIT_USAGE
        );
        assert_eq!(
            CliError::from(morpheus_api::Error::Status {
                status: 401,
                body: String::new()
            })
            .exit_code(),
            EXIT_UNAUTHORIZED
        );
        assert_eq!(
            CliError::from(morpheus_api::Error::Status {
                status: 500,
                body: String::new()
            })
            .exit_code(),
            EXIT_FAILURE
        );
        assert_eq!(CliError::Config("bad".into()).exit_code(), EXIT_FAILURE);
    }
}
