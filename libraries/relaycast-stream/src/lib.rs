//! relaycast streaming
//!
//! Everything between a configured intake and the server: the
//! [`StreamSession`] that owns the transport, the decoder/encoder pipeline
//! that produces each track's bytes, and the [`Runner`] control loop that
//! ties them together with reconnects, skips and playlist rereads.
//!
//! # Example
//!
//! ```rust,no_run
//! use relaycast_config::{Config, XmlFile};
//! use relaycast_metadata::LoftyTagReader;
//! use relaycast_stream::{Control, DumpSink, DumpTarget, Runner};
//! use std::sync::Arc;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.load(&XmlFile::new("relaycast.xml"))?;
//!
//! let control = Arc::new(Control::new());
//! let mut runner = Runner::new(
//!     &config,
//!     Box::new(|| Box::new(DumpSink::new(DumpTarget::Stdout))),
//!     Box::new(LoftyTagReader::new()),
//!     Arc::clone(&control),
//! )?;
//! runner.run()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod pipeline;
pub mod runner;
pub mod session;
pub mod sink;
pub mod status;

pub use error::{Result, SinkError, StreamError};
pub use pipeline::{build_command, Substitutions, TrackInput, TrackSource};
pub use runner::{resolve_intake_type, Control, Runner, RunnerOptions, CHUNK_SIZE, RETRY_DELAY};
pub use session::{build_metadata_bundle, connection_params, SessionState, SinkFactory, StreamSession};
pub use sink::{AudioInfo, DumpSink, DumpTarget, MetadataBundle, SinkParam, StreamSink};
pub use status::StatusLine;
