//! Error types for playlist handling

use relaycast_core::RelayError;
use thiserror::Error;

/// Playlist errors
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// Playlist source could not be opened or read
    #[error("{origin}: {source}")]
    CannotOpen {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// Generator program is unusable or misbehaved
    #[error(transparent)]
    Program(#[from] RelayError),
}

impl PlaylistError {
    /// Whether the playlist state can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Program(e) if e.is_fatal())
    }
}

impl From<PlaylistError> for RelayError {
    fn from(err: PlaylistError) -> Self {
        match err {
            PlaylistError::CannotOpen { origin, source } => RelayError::Io {
                path: origin.into(),
                source,
            },
            PlaylistError::Program(e) => e,
        }
    }
}

/// Result type for playlist operations
pub type Result<T> = std::result::Result<T, PlaylistError>;
