//! relaycast Core
//!
//! Shared building blocks for the relaycast source client.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Error Handling**: the `RelayError` taxonomy and `Result` alias
//! - **Placeholders**: the `@X@` tokens used by command and metadata templates
//! - **Process Primitives**: executable checks and "run a program, read one line"
//! - **Core Traits**: `TagReader`, the seam to the tag-reading library
//!
//! # Example
//!
//! ```rust
//! use relaycast_core::placeholder::{expand, Placeholder};
//!
//! let cmd = expand(
//!     "decode --in @T@ --title @t@",
//!     &[(Placeholder::Track, "song.flac"), (Placeholder::Title, "Intro")],
//! );
//! assert_eq!(cmd, "decode --in song.flac --title Intro");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod placeholder;
pub mod process;
pub mod traits;

pub use error::{RelayError, Result};
pub use placeholder::Placeholder;
pub use traits::{TagReader, TrackTags};
