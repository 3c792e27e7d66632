/// Core traits for relaycast
use std::path::Path;
use std::time::Duration;

/// Descriptive tags read from a media file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    /// Artist name
    pub artist: Option<String>,
    /// Album title
    pub album: Option<String>,
    /// Track title
    pub title: Option<String>,
    /// Playing time, if the container reports one
    pub duration: Option<Duration>,
}

/// Tag reader trait
///
/// Implementers extract artist, album, title and duration from a media
/// file. Returning `None` means the format is unsupported or the file is
/// corrupt; callers then fall back to deriving a name from the path.
pub trait TagReader: Send + Sync {
    /// Read tags from the given path
    fn read_tags(&self, path: &Path) -> Option<TrackTags>;
}
