//! Error types for streaming

use relaycast_core::RelayError;
use thiserror::Error;

/// Errors reported by a [`StreamSink`](crate::StreamSink)
#[derive(Debug, Error)]
pub enum SinkError {
    /// A parameter value the transport cannot use
    #[error("{0}")]
    Rejected(String),

    /// Connection could not be established
    #[error("{0}")]
    Connect(String),

    /// Operation needs an open connection
    #[error("not connected")]
    NotConnected,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Streaming errors
#[derive(Debug, Error)]
pub enum StreamError {
    /// Applying a configuration field to the transport failed
    #[error("{field}: {source}")]
    Setup {
        field: &'static str,
        #[source]
        source: SinkError,
    },

    /// A connection attempt failed
    #[error("connect: {0}")]
    Protocol(#[source] SinkError),

    /// Relaying a chunk failed; the connection has been dropped
    #[error("send: {0}")]
    Send(#[source] SinkError),

    /// The server did not accept a metadata update
    #[error("metadata update: {0}")]
    MetadataPush(#[source] SinkError),

    /// Every allowed reconnect attempt failed
    #[error("giving up after {attempts} connection attempts")]
    ReconnectExhausted { attempts: u32 },

    /// A track needs transcoding but no decoder handles it
    #[error("{track}: no decoder for this file type")]
    NoDecoder { track: String },

    /// Missing or inconsistent configuration
    #[error("{0}")]
    Config(String),

    /// Shutdown was requested while waiting
    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl StreamError {
    /// Whether streaming has to stop, as opposed to skipping one track
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::NoDecoder { .. } | Self::MetadataPush(_) => false,
            Self::Relay(e) => e.is_fatal(),
            _ => true,
        }
    }
}

impl From<relaycast_playlist::PlaylistError> for StreamError {
    fn from(err: relaycast_playlist::PlaylistError) -> Self {
        Self::Relay(err.into())
    }
}

impl From<relaycast_metadata::MetadataError> for StreamError {
    fn from(err: relaycast_metadata::MetadataError) -> Self {
        Self::Relay(err.into())
    }
}

impl From<StreamError> for RelayError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Relay(e) => e,
            StreamError::Config(msg) => RelayError::ConfigInvalid(msg),
            other => RelayError::Protocol(other.to_string()),
        }
    }
}

/// Result type for streaming operations
pub type Result<T> = std::result::Result<T, StreamError>;
