//! Per-track metadata record

use crate::error::{MetadataError, Result};
use relaycast_core::placeholder::{expand, Placeholder};
use relaycast_core::process::{check_executable, run_line};
use relaycast_core::TagReader;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest line read from a metadata program, in bytes
pub const METADATA_MAX: usize = 1024;

/// Name used when nothing better can be derived
pub const UNKNOWN_NAME: &str = "[unknown]";

const SEPARATOR: &str = " - ";

/// Where the current contents of a [`TrackMetadata`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// Never filled
    #[default]
    None,
    /// Read from the media file's tags
    Tags,
    /// Printed by an external metadata program
    Program,
}

/// Descriptive metadata for the track being streamed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    filename: Option<PathBuf>,
    name: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    title: Option<String>,
    songinfo: Option<String>,
    duration: Option<Duration>,
    normalize: bool,
    quiet_stderr: bool,
    origin: Origin,
}

impl TrackMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that only knows its display name, derived from `path`.
    pub fn for_filename(path: &Path) -> Self {
        Self {
            filename: Some(path.to_path_buf()),
            name: Some(name_from_filename(path)),
            ..Self::default()
        }
    }

    /// Whether strings get whitespace-normalized when the record is filled
    pub fn set_normalize_strings(&mut self, normalize: bool) {
        self.normalize = normalize;
    }

    /// Whether a metadata program's stderr is discarded
    pub fn set_quiet_stderr(&mut self, quiet: bool) {
        self.quiet_stderr = quiet;
    }

    /// Fill the record from the tags of the media file at `path`.
    ///
    /// When `reader` cannot make sense of the file, the display name derived
    /// from the file name doubles as the song info.
    pub fn parse_file(&mut self, path: &Path, reader: &dyn TagReader) -> Result<()> {
        File::open(path).map_err(|source| MetadataError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        self.clear();
        self.filename = Some(path.to_path_buf());
        let name = name_from_filename(path);

        let Some(tags) = reader.read_tags(path) else {
            tracing::info!("{}: unable to extract metadata", path.display());
            self.songinfo = Some(name.clone());
            self.name = Some(name);
            self.origin = Origin::Tags;
            return Ok(());
        };

        self.artist = tags.artist.filter(|s| !s.is_empty());
        self.album = tags.album.filter(|s| !s.is_empty());
        self.title = tags.title.filter(|s| !s.is_empty());
        self.duration = tags.duration;

        if self.normalize {
            self.normalize_strings();
        }
        self.songinfo = Some(self.assemble_songinfo().unwrap_or_else(|| name.clone()));
        self.name = Some(name);
        self.origin = Origin::Tags;
        Ok(())
    }

    /// Fill the record by asking `program` for each field.
    ///
    /// The program runs with `artist`, `album` and `title` as its only
    /// argument and once with no argument for the full song info. If any of
    /// the four runs fails the record is left exactly as it was.
    pub fn run_program(&mut self, program: &Path, quiet_stderr: bool) -> Result<()> {
        check_executable(program)?;

        let artist = query(program, Some("artist"), quiet_stderr)?;
        let album = query(program, Some("album"), quiet_stderr)?;
        let title = query(program, Some("title"), quiet_stderr)?;
        let songinfo = query(program, None, quiet_stderr)?;

        self.clear();
        self.filename = Some(program.to_path_buf());
        self.name = Some(UNKNOWN_NAME.to_string());
        self.artist = artist;
        self.album = album;
        self.title = title;
        self.songinfo = songinfo;
        self.quiet_stderr = quiet_stderr;
        if self.normalize {
            self.normalize_strings();
        }
        self.origin = Origin::Program;
        Ok(())
    }

    /// Fill the record again from wherever it was filled last.
    pub fn refresh(&mut self, reader: &dyn TagReader) -> Result<()> {
        let filename = self.filename.clone().ok_or(MetadataError::NoSource)?;
        match self.origin {
            Origin::None => Err(MetadataError::NoSource),
            Origin::Tags => self.parse_file(&filename, reader),
            Origin::Program => self.run_program(&filename, self.quiet_stderr),
        }
    }

    /// Collapse runs of spaces in artist, album, title and song info.
    pub fn normalize_strings(&mut self) {
        for field in [
            &mut self.artist,
            &mut self.album,
            &mut self.title,
            &mut self.songinfo,
        ] {
            if let Some(s) = field {
                *s = normalize(s);
            }
        }
    }

    /// Expand `@a@`, `@b@`, `@t@`, `@T@` and `@s@` in `template`.
    ///
    /// Unset fields expand to nothing.
    pub fn strformat(&self, template: Option<&str>) -> Result<String> {
        let template = template.ok_or(MetadataError::NoTemplate)?;
        let filename = self
            .filename
            .as_deref()
            .map(|p| p.to_string_lossy())
            .unwrap_or_default();
        let values = [
            (Placeholder::Artist, self.artist().unwrap_or_default()),
            (Placeholder::Album, self.album().unwrap_or_default()),
            (Placeholder::Title, self.title().unwrap_or_default()),
            (Placeholder::Track, &*filename),
            (Placeholder::String, self.songinfo().unwrap_or_default()),
        ];
        Ok(expand(template, &values))
    }

    fn assemble_songinfo(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.artist, &self.title, &self.album]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(SEPARATOR))
        }
    }

    fn clear(&mut self) {
        *self = Self {
            normalize: self.normalize,
            quiet_stderr: self.quiet_stderr,
            ..Self::default()
        };
    }

    /// Media file or metadata program this record was filled from
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Display name, falling back to `[unknown]`
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// "artist - title - album", or whatever the program printed
    pub fn songinfo(&self) -> Option<&str> {
        self.songinfo.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Duration in whole seconds, `-1` if unknown
    pub fn length(&self) -> i64 {
        self.duration.map_or(-1, |d| d.as_secs() as i64)
    }

    pub fn normalizes_strings(&self) -> bool {
        self.normalize
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

fn query(program: &Path, arg: Option<&str>, quiet_stderr: bool) -> Result<Option<String>> {
    let args: Vec<&str> = arg.into_iter().collect();
    let output = run_line(program, &args, METADATA_MAX, quiet_stderr)?;
    if output.truncated {
        tracing::warn!("{}: metadata output truncated", program.display());
    }
    Ok(output.line.filter(|line| !line.is_empty()))
}

/// Display name for `path`: the file name without directory or extension.
pub fn name_from_filename(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = match base.rfind('.') {
        Some(dot) => &base[..dot],
        None => base.as_str(),
    };
    if stem.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        stem.to_string()
    }
}

/// Drop leading and trailing spaces and squeeze interior runs to one.
pub fn normalize(s: &str) -> String {
    s.split(' ')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycast_core::TrackTags;
    use tempfile::NamedTempFile;

    struct FixedTags(Option<TrackTags>);

    impl TagReader for FixedTags {
        fn read_tags(&self, _path: &Path) -> Option<TrackTags> {
            self.0.clone()
        }
    }

    fn tags(artist: Option<&str>, album: Option<&str>, title: Option<&str>) -> FixedTags {
        FixedTags(Some(TrackTags {
            artist: artist.map(String::from),
            album: album.map(String::from),
            title: title.map(String::from),
            duration: Some(Duration::from_secs(215)),
        }))
    }

    fn media_file() -> NamedTempFile {
        tempfile::Builder::new()
            .prefix("Some Song")
            .suffix(".ogg")
            .tempfile()
            .unwrap()
    }

    #[test]
    fn songinfo_skips_missing_parts() {
        let file = media_file();
        let mut md = TrackMetadata::new();
        md.parse_file(file.path(), &tags(Some("A"), None, Some("T")))
            .unwrap();
        assert_eq!(md.songinfo(), Some("A - T"));
        assert_eq!(md.length(), 215);
        assert_eq!(md.origin(), Origin::Tags);

        md.parse_file(file.path(), &tags(Some("A"), Some("B"), Some("T")))
            .unwrap();
        assert_eq!(md.songinfo(), Some("A - T - B"));

        md.parse_file(file.path(), &tags(None, Some("B"), None))
            .unwrap();
        assert_eq!(md.songinfo(), Some("B"));
    }

    #[test]
    fn empty_tags_fall_back_to_file_name() {
        let file = media_file();
        let stem = file
            .path()
            .file_stem()
            .unwrap()
            .to_string_lossy()
            .into_owned();

        let mut md = TrackMetadata::new();
        md.parse_file(file.path(), &tags(Some(""), Some(""), None))
            .unwrap();
        assert_eq!(md.artist(), None);
        assert_eq!(md.songinfo(), Some(stem.as_str()));

        md.parse_file(file.path(), &FixedTags(None)).unwrap();
        assert_eq!(md.songinfo(), Some(stem.as_str()));
        assert_eq!(md.name(), stem);
        assert_eq!(md.length(), -1);
    }

    #[test]
    fn unreadable_file_is_reported() {
        let mut md = TrackMetadata::new();
        let err = md
            .parse_file(Path::new("/nonexistent/track.ogg"), &FixedTags(None))
            .unwrap_err();
        assert!(matches!(err, MetadataError::Unreadable { .. }));
        assert_eq!(md, TrackMetadata::new());
    }

    #[test]
    fn normalization_applies_before_songinfo() {
        let file = media_file();
        let mut md = TrackMetadata::new();
        md.set_normalize_strings(true);
        md.parse_file(file.path(), &tags(Some("  The   Band "), None, Some("Song  ")))
            .unwrap();
        assert_eq!(md.artist(), Some("The Band"));
        assert_eq!(md.songinfo(), Some("The Band - Song"));
    }

    #[test]
    fn strformat_expands_known_markers() {
        let file = media_file();
        let mut md = TrackMetadata::new();
        md.parse_file(file.path(), &tags(Some("A"), None, Some("T")))
            .unwrap();

        assert_eq!(md.strformat(Some("@a@/@t@")).unwrap(), "A/T");
        assert_eq!(md.strformat(Some("[@b@]")).unwrap(), "[]");
        assert_eq!(md.strformat(Some("@s@")).unwrap(), "A - T");
        assert_eq!(
            md.strformat(Some("@T@")).unwrap(),
            file.path().to_string_lossy()
        );
        assert!(matches!(
            md.strformat(None),
            Err(MetadataError::NoTemplate)
        ));
    }

    #[test]
    fn refresh_needs_a_source() {
        let mut md = TrackMetadata::new();
        assert!(matches!(
            md.refresh(&FixedTags(None)),
            Err(MetadataError::NoSource)
        ));
    }

    #[test]
    fn refresh_rereads_tags() {
        let file = media_file();
        let mut md = TrackMetadata::new();
        md.parse_file(file.path(), &tags(Some("Old"), None, None))
            .unwrap();
        md.refresh(&tags(Some("New"), None, None)).unwrap();
        assert_eq!(md.artist(), Some("New"));
    }

    #[test]
    fn names_from_paths() {
        assert_eq!(name_from_filename(Path::new("/music/Song.mp3")), "Song");
        assert_eq!(name_from_filename(Path::new("a.b.ogg")), "a.b");
        assert_eq!(name_from_filename(Path::new("/music/.ogg")), UNKNOWN_NAME);
        assert_eq!(name_from_filename(Path::new("noext")), "noext");
        assert_eq!(name_from_filename(Path::new("/")), UNKNOWN_NAME);
    }

    #[test]
    fn normalize_squeezes_spaces() {
        assert_eq!(normalize("  a   b  "), "a b");
        assert_eq!(normalize("a\tb"), "a\tb");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn for_filename_only_names() {
        let md = TrackMetadata::for_filename(Path::new("/x/Track 1.flac"));
        assert_eq!(md.name(), "Track 1");
        assert_eq!(md.songinfo(), None);
        assert_eq!(md.origin(), Origin::None);
    }
}
