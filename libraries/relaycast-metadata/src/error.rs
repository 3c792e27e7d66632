//! Error types for metadata handling

use relaycast_core::RelayError;
use std::path::PathBuf;
use thiserror::Error;

/// Metadata errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Media file cannot be opened for reading
    #[error("{}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `strformat` was called without a template
    #[error("no metadata format template")]
    NoTemplate,

    /// `refresh` on a record that was never filled
    #[error("metadata has no source to refresh from")]
    NoSource,

    /// Metadata program is unusable or failed
    #[error(transparent)]
    Program(#[from] RelayError),
}

impl From<MetadataError> for RelayError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Unreadable { path, source } => RelayError::Io { path, source },
            MetadataError::Program(e) => e,
            other => RelayError::Validation(other.to_string()),
        }
    }
}

/// Result type for metadata operations
pub type Result<T> = std::result::Result<T, MetadataError>;
