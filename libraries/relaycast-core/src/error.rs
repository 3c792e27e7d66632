/// Core error types for relaycast
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using `RelayError`
pub type Result<T> = std::result::Result<T, RelayError>;

/// Core error type for relaycast
///
/// Every library error converts into one of these categories so the
/// application can decide how to react: validation and configuration errors
/// abort start-up, protocol errors trigger a reconnect, and contract
/// violations end the process.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Field-level validation failure
    #[error("{0}")]
    Validation(String),

    /// Configuration could not be loaded or reloaded
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    /// File or stream could not be opened or read
    #[error("{}: {source}", .path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying system error
        #[source]
        source: std::io::Error,
    },

    /// External program failed to run or exited unsuccessfully
    #[error("{program}: {reason}")]
    Process {
        /// Program name or path
        program: String,
        /// What went wrong
        reason: String,
    },

    /// Path is not a regular file with execute permission
    #[error("{}: not an executable program", .0.display())]
    NotExecutable(PathBuf),

    /// Path is writable by everybody
    #[error("{}: world writeable", .0.display())]
    WorldWritable(PathBuf),

    /// Transport reported a failure
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An external collaborator broke its output contract
    #[error("{context}: {reason}")]
    ContractViolation {
        /// Which collaborator misbehaved
        context: String,
        /// What it did wrong
        reason: String,
    },
}

impl RelayError {
    /// Create an I/O error tagged with the offending path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a process error
    pub fn process(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Process {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a contract violation error
    pub fn contract(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContractViolation {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Whether continuing after this error would operate on undefined state
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContractViolation { .. })
    }
}
