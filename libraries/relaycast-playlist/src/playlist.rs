//! Playlist engine

use crate::error::{PlaylistError, Result};
use crate::shuffle::fisher_yates;
use rand::RngCore;
use relaycast_core::process::{check_executable, run_line};
use relaycast_core::RelayError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Longest accepted track reference, in bytes
pub const PATH_MAX: usize = 4096;

const STDIN_NAME: &str = "stdin";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    /// A playlist file, or standard input when `None`
    List(Option<PathBuf>),
    /// An executable that prints the next track each time it runs
    Program(PathBuf),
}

/// Ordered track references with a cursor
///
/// A file-backed playlist is read once into memory. A program-backed one
/// has no stored entries: every [`Playlist::get_next`] runs the program and
/// the last value it printed is kept for [`Playlist::peek_next`].
#[derive(Debug, Clone)]
pub struct Playlist {
    source: Source,
    entries: Vec<String>,
    index: usize,
    shuffled: bool,
    program_output: Option<String>,
    quiet_stderr: bool,
}

impl Playlist {
    /// Read a playlist file, or standard input when `path` is `None`.
    ///
    /// Empty lines and lines starting with `#` are skipped. A line longer
    /// than [`PATH_MAX`] is reported and dropped without aborting the read.
    pub fn read(path: Option<&Path>) -> Result<Self> {
        let entries = match path {
            Some(p) => {
                let origin = p.display().to_string();
                let file = File::open(p).map_err(|source| PlaylistError::CannotOpen {
                    origin: origin.clone(),
                    source,
                })?;
                read_entries(BufReader::new(file), &origin)?
            }
            None => read_entries(std::io::stdin().lock(), STDIN_NAME)?,
        };

        tracing::debug!(
            "{}: {} playlist entries",
            path.map_or_else(|| STDIN_NAME.to_string(), |p| p.display().to_string()),
            entries.len()
        );

        Ok(Self::with_source(
            Source::List(path.map(Path::to_path_buf)),
            entries,
        ))
    }

    /// Build a playlist from already-parsed entries.
    pub fn from_entries(entries: Vec<String>) -> Self {
        Self::with_source(Source::List(None), entries)
    }

    /// Use an external program as a lazy track generator.
    ///
    /// The program must be an executable regular file that others cannot
    /// write to. It is not run until the first [`Playlist::get_next`].
    pub fn from_program(path: &Path, quiet_stderr: bool) -> Result<Self> {
        check_executable(path)?;
        let mut playlist = Self::with_source(Source::Program(path.to_path_buf()), Vec::new());
        playlist.quiet_stderr = quiet_stderr;
        Ok(playlist)
    }

    fn with_source(source: Source, entries: Vec<String>) -> Self {
        Self {
            source,
            entries,
            index: 0,
            shuffled: false,
            program_output: None,
            quiet_stderr: false,
        }
    }

    /// Return the next track and advance, or `None` at the end of the list.
    ///
    /// For a program-backed playlist an empty line or no output at all ends
    /// the list. Output longer than [`PATH_MAX`] cannot be a valid path and
    /// is reported as a contract violation.
    pub fn get_next(&mut self) -> Result<Option<String>> {
        let program = match &self.source {
            Source::Program(program) => program.clone(),
            Source::List(_) => {
                let entry = self.entries.get(self.index).cloned();
                if entry.is_some() {
                    self.index += 1;
                }
                return Ok(entry);
            }
        };

        let output = run_line(&program, &[], PATH_MAX, self.quiet_stderr)?;
        if output.truncated {
            return Err(RelayError::contract(
                program.display().to_string(),
                "output line too long",
            )
            .into());
        }

        self.program_output = output.line.filter(|line| !line.is_empty());
        if self.program_output.is_none() {
            tracing::debug!("{}: end of playlist", program.display());
        }
        Ok(self.program_output.clone())
    }

    /// The track the next `get_next` would return, without advancing.
    ///
    /// Program-backed playlists cannot look ahead; they return the value the
    /// program printed last.
    pub fn peek_next(&self) -> Option<&str> {
        match self.source {
            Source::Program(_) => self.program_output.as_deref(),
            Source::List(_) => self.entries.get(self.index).map(String::as_str),
        }
    }

    /// Advance past the next entry without returning it.
    pub fn skip_next(&mut self) {
        if self.index < self.entries.len() {
            self.index += 1;
        }
    }

    /// Shuffle the entries with the thread-local generator.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Shuffle the entries with `rng`. No-op for program-backed playlists.
    pub fn shuffle_with<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        if self.is_program() {
            return;
        }
        fisher_yates(&mut self.entries, rng);
        self.shuffled = true;
    }

    /// Position the cursor so the next `get_next` returns `name`.
    ///
    /// Returns `false` if there is no such entry or the list is program-backed.
    pub fn goto_entry(&mut self, name: &str) -> bool {
        if self.is_program() {
            return false;
        }
        match self.entries.iter().position(|entry| entry == name) {
            Some(pos) => {
                self.index = pos;
                true
            }
            None => false,
        }
    }

    /// Re-read the playlist file, restoring file order and rewinding.
    ///
    /// Returns `Ok(false)` when there is nothing to re-read (program-backed
    /// or standard input). On a read error the current entries are kept.
    pub fn reread(&mut self) -> Result<bool> {
        let Source::List(Some(path)) = &self.source else {
            return Ok(false);
        };
        let fresh = Self::read(Some(path.as_path()))?;
        self.entries = fresh.entries;
        self.index = 0;
        self.shuffled = false;
        tracing::info!("{}: playlist reread", path.display());
        Ok(true)
    }

    /// Move the cursor back to the first entry.
    pub fn rewind(&mut self) {
        self.index = 0;
    }

    /// Index of the entry the next `get_next` returns.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Move the cursor to `index`; fails if it is past the end.
    pub fn set_position(&mut self, index: usize) -> bool {
        if index > self.entries.len() {
            return false;
        }
        self.index = index;
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_program(&self) -> bool {
        matches!(self.source, Source::Program(_))
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    /// Last line the generator program printed
    pub fn program_output(&self) -> Option<&str> {
        self.program_output.as_deref()
    }

    /// Playlist file or program path; `None` for standard input.
    pub fn location(&self) -> Option<&Path> {
        match &self.source {
            Source::List(path) => path.as_deref(),
            Source::Program(path) => Some(path),
        }
    }
}

/// Parse playlist lines from `reader`.
pub fn read_entries<R: BufRead>(mut reader: R, origin: &str) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| PlaylistError::CannotOpen {
                origin: origin.to_string(),
                source,
            })?;
        if n == 0 {
            break;
        }
        line_no += 1;

        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if buf.len() >= PATH_MAX {
            tracing::warn!("{}[{}]: file or path name too long", origin, line_no);
            continue;
        }
        if buf.is_empty() || buf[0] == b'#' {
            continue;
        }
        entries.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn playlist(items: &[&str]) -> Playlist {
        Playlist::from_entries(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "track1.mp3\n\n# comment\ntrack2.mp3\n";
        let entries = read_entries(text.as_bytes(), "test").unwrap();
        assert_eq!(entries, vec!["track1.mp3", "track2.mp3"]);
    }

    #[test]
    fn crlf_and_missing_final_newline() {
        let entries = read_entries("a.ogg\r\nb.ogg".as_bytes(), "test").unwrap();
        assert_eq!(entries, vec!["a.ogg", "b.ogg"]);
    }

    #[test]
    fn overlong_line_is_dropped_and_reading_continues() {
        let text = format!("first.ogg\n{}\nlast.ogg\n", "x".repeat(PATH_MAX + 10));
        let entries = read_entries(text.as_bytes(), "test").unwrap();
        assert_eq!(entries, vec!["first.ogg", "last.ogg"]);
    }

    #[test]
    fn get_next_walks_then_ends() {
        let mut list = playlist(&["a", "b"]);
        assert_eq!(list.get_next().unwrap().as_deref(), Some("a"));
        assert_eq!(list.peek_next(), Some("b"));
        assert_eq!(list.get_next().unwrap().as_deref(), Some("b"));
        assert_eq!(list.get_next().unwrap(), None);
        assert_eq!(list.position(), 2);
    }

    #[test]
    fn skip_next_stops_at_end() {
        let mut list = playlist(&["a"]);
        list.skip_next();
        list.skip_next();
        assert_eq!(list.position(), 1);
        assert_eq!(list.get_next().unwrap(), None);
    }

    #[test]
    fn goto_entry_repositions_for_next_call() {
        let mut list = playlist(&["a", "b", "c"]);
        assert!(list.goto_entry("c"));
        assert_eq!(list.get_next().unwrap().as_deref(), Some("c"));
        assert!(!list.goto_entry("C"));
        assert!(!list.goto_entry("missing"));
    }

    #[test]
    fn rewind_and_set_position() {
        let mut list = playlist(&["a", "b"]);
        list.get_next().unwrap();
        list.rewind();
        assert_eq!(list.position(), 0);
        assert!(list.set_position(2));
        assert!(!list.set_position(3));
        assert_eq!(list.position(), 2);
    }

    #[test]
    fn shuffle_small_lists() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut single = playlist(&["only"]);
        single.shuffle_with(&mut rng);
        assert_eq!(single.entries(), ["only"]);
    }

    #[test]
    fn shuffle_keeps_every_entry() {
        let items: Vec<String> = (0..20).map(|i| format!("t{}.ogg", i)).collect();
        let mut list = Playlist::from_entries(items.clone());
        list.shuffle_with(&mut StdRng::seed_from_u64(3));
        assert!(list.is_shuffled());

        let mut sorted = list.entries().to_vec();
        sorted.sort();
        let mut expected = items;
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn stdin_playlist_cannot_be_reread() {
        let mut list = playlist(&["a"]);
        assert!(!list.reread().unwrap());
        assert_eq!(list.location(), None);
    }
}
