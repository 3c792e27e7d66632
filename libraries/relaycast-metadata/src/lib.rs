//! relaycast metadata
//!
//! Artist, album and title for the track on air, read from the media
//! file's tags or printed by an external program, plus template expansion
//! for custom metadata strings.
//!
//! # Example
//!
//! ```rust,no_run
//! use relaycast_metadata::{LoftyTagReader, TrackMetadata};
//! use std::path::Path;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut md = TrackMetadata::new();
//! md.set_normalize_strings(true);
//! md.parse_file(Path::new("/music/song.ogg"), &LoftyTagReader::new())?;
//! println!("{}", md.strformat(Some("@a@ / @t@"))?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod error;
mod reader;
mod record;

pub use error::{MetadataError, Result};
pub use reader::LoftyTagReader;
pub use record::{name_from_filename, normalize, Origin, TrackMetadata, METADATA_MAX, UNKNOWN_NAME};
