/// Error types for configuration handling
use relaycast_core::{Placeholder, RelayError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// A rejected field value or a broken entity invariant.
///
/// The `Display` output is the short reason that ends up in log lines such
/// as `config.xml[12]: server (main): port: out of range`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty")]
    Empty,

    #[error("too long")]
    TooLong,

    #[error("invalid")]
    InvalidValue,

    #[error("not a number")]
    NotANumber,

    #[error("out of range")]
    OutOfRange,

    #[error("unsupported")]
    Unsupported,

    #[error("already exists")]
    AlreadyExists,

    #[error("prohibited placeholder {0}")]
    ProhibitedPlaceholder(Placeholder),

    #[error("duplicate placeholder {0}")]
    DuplicatePlaceholder(Placeholder),

    #[error("missing placeholder {0}")]
    MissingPlaceholder(Placeholder),

    #[error("{0} missing")]
    Missing(&'static str),

    #[error("{0} not set")]
    NotSet(&'static str),

    #[error("no file extensions registered")]
    NoExtensions,

    #[error("{kind} {name} does not exist")]
    UnknownReference { kind: &'static str, name: String },
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file permissions expose credentials to other users
    #[error("{}: group and/or world writeable", .0.display())]
    InsecureFile(PathBuf),

    /// Document is not well-formed XML
    #[error("{origin}: not well-formed XML: {reason}")]
    Malformed { origin: String, reason: String },

    /// Document root is not `relaycast`
    #[error("{0}: not a relaycast configuration")]
    WrongRoot(String),

    /// First entity or setting that failed validation, with location
    #[error("{0}")]
    Invalid(String),

    /// Document could not be rendered
    #[error("cannot write configuration: {0}")]
    Write(String),
}

impl From<ConfigError> for RelayError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, source } => RelayError::Io { path, source },
            other => RelayError::ConfigInvalid(other.to_string()),
        }
    }
}

impl From<ValidationError> for RelayError {
    fn from(err: ValidationError) -> Self {
        RelayError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_errors_name_the_marker() {
        assert_eq!(
            ValidationError::DuplicatePlaceholder(Placeholder::Track).to_string(),
            "duplicate placeholder @T@"
        );
        assert_eq!(
            ValidationError::ProhibitedPlaceholder(Placeholder::String).to_string(),
            "prohibited placeholder @s@"
        );
    }

    #[test]
    fn config_errors_map_into_relay_taxonomy() {
        let err: RelayError = ConfigError::Invalid("bad".into()).into();
        assert!(matches!(err, RelayError::ConfigInvalid(msg) if msg == "bad"));

        let err: RelayError = ValidationError::Missing("hostname").into();
        assert!(matches!(err, RelayError::Validation(msg) if msg == "hostname missing"));
    }
}
