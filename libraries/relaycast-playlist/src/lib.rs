//! relaycast playlists
//!
//! Track lists read from a file or standard input, or produced one entry at
//! a time by an external program.
//!
//! # Example
//!
//! ```rust
//! use relaycast_playlist::Playlist;
//!
//! let mut list = Playlist::from_entries(vec!["a.ogg".into(), "b.ogg".into()]);
//! assert!(list.goto_entry("b.ogg"));
//! assert_eq!(list.get_next().unwrap().as_deref(), Some("b.ogg"));
//! assert_eq!(list.get_next().unwrap(), None);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod playlist;
pub mod shuffle;

pub use error::{PlaylistError, Result};
pub use playlist::{read_entries, Playlist, PATH_MAX};
