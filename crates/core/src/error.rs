//! Error types for sh3-core
//!
//! Every command handler returns this error type. The dispatcher renders it
//! as a single `Error: ...` line and keeps the session running.

use thiserror::Error;

/// Result type alias for sh3-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sh3-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong argument count or shape; carries the command usage line
    #[error("usage: {0}")]
    Usage(String),

    /// First word of the line names no command
    #[error("unknown command")]
    UnknownCommand(String),

    /// Host or credentials are missing
    #[error("Not yet connected; set host, user, and pass to continue")]
    NotConnected,

    /// The command needs an active bucket
    #[error("bucket is not set")]
    BucketNotSet,

    /// Unknown access-policy level
    #[error("invalid ACL type: {0}")]
    InvalidAcl(String),

    /// Known level without a policy template
    #[error("{0} not supported at this time.")]
    UnsupportedAcl(String),

    /// Malformed argument value
    #[error("{0}")]
    InvalidArgument(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service answered with a non-success status
    #[error("{message} ({status})")]
    Remote { status: u16, message: String },

    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the process exit code for this error when it reaches the process boundary
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_)
            | Error::UnknownCommand(_)
            | Error::InvalidArgument(_)
            | Error::InvalidAcl(_)
            | Error::Config(_)
            | Error::TomlParse(_)
            | Error::InvalidUrl(_) => 2, // UsageError
            Error::Network(_) => 3,  // NetworkError
            Error::NotFound(_) => 5, // NotFound
            _ => 1,                  // GeneralError
        }
    }

    /// Whether this error was raised before any request reached the service
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Usage(_)
                | Error::UnknownCommand(_)
                | Error::NotConnected
                | Error::BucketNotSet
                | Error::InvalidAcl(_)
                | Error::InvalidArgument(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::Usage("get <id>".into()).exit_code(), 2);
        assert_eq!(Error::Config("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::BucketNotSet.exit_code(), 1);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_error_display() {
        let err = Error::Usage("delete <id>".into());
        assert_eq!(err.to_string(), "usage: delete <id>");

        let err = Error::UnsupportedAcl("authenticated-read".into());
        assert_eq!(
            err.to_string(),
            "authenticated-read not supported at this time."
        );

        let err = Error::Remote {
            status: 403,
            message: "Forbidden".into(),
        };
        assert_eq!(err.to_string(), "Forbidden (403)");
    }

    #[test]
    fn test_local_errors() {
        assert!(Error::NotConnected.is_local());
        assert!(Error::BucketNotSet.is_local());
        assert!(!Error::Network("reset".into()).is_local());
    }
}
