/// Tag reader implementation using lofty
use lofty::{Accessor, AudioFile, Probe, TaggedFileExt};
use relaycast_core::{TagReader, TrackTags};
use std::path::Path;

/// Tag reader using the lofty library
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    /// Create a new tag reader
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Option<TrackTags> {
        let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!("{}: {}", path.display(), e);
                return None;
            }
        };

        // Prefer the format's native tag, then whatever else is present
        let tag = tagged_file.primary_tag().or(tagged_file.first_tag());
        let duration = tagged_file.properties().duration();

        let mut tags = TrackTags {
            duration: (!duration.is_zero()).then_some(duration),
            ..TrackTags::default()
        };
        if let Some(tag) = tag {
            tags.artist = tag.artist().map(|s| s.to_string());
            tags.album = tag.album().map(|s| s.to_string());
            tags.title = tag.title().map(|s| s.to_string());
        }
        Some(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_has_no_tags() {
        let reader = LoftyTagReader::new();
        assert_eq!(reader.read_tags(Path::new("/nonexistent/song.mp3")), None);
    }

    #[test]
    fn garbage_is_not_audio() {
        let mut file = tempfile::Builder::new().suffix(".ogg").tempfile().unwrap();
        file.write_all(b"definitely not an ogg stream").unwrap();
        assert_eq!(LoftyTagReader.read_tags(file.path()), None);
    }
}
