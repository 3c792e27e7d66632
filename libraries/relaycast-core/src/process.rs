//! External program primitives
//!
//! Playlist generators and metadata programs are plain executables that
//! print one line to stdout per invocation. These helpers check that such a
//! program is safe to run and capture that line.

use crate::error::{RelayError, Result};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, Stdio};

/// First line of a program's standard output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutput {
    /// The line without its terminator, `None` when the program printed nothing
    pub line: Option<String>,
    /// The line was longer than the caller's limit and has been cut
    pub truncated: bool,
}

/// Verify that `path` is a regular, executable file that is not world-writable.
pub fn check_executable(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|e| RelayError::io(path, e))?;
    if !meta.is_file() {
        return Err(RelayError::NotExecutable(path.to_path_buf()));
    }

    let mode = meta.permissions().mode();
    if mode & 0o002 != 0 {
        return Err(RelayError::WorldWritable(path.to_path_buf()));
    }
    if mode & 0o111 == 0 {
        return Err(RelayError::NotExecutable(path.to_path_buf()));
    }

    Ok(())
}

/// Run `program` with `args` and capture the first line of its stdout.
///
/// The line ends at the first `\n` or `\r`. Lines longer than `max_len`
/// bytes are cut at a character boundary and flagged as truncated; what to
/// do about that is up to the caller. A non-zero exit status or a signal
/// death is an error.
pub fn run_line(
    program: &Path,
    args: &[&str],
    max_len: usize,
    quiet_stderr: bool,
) -> Result<LineOutput> {
    let name = program.display().to_string();
    tracing::debug!("Running {} {:?}", name, args);

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(if quiet_stderr {
            Stdio::null()
        } else {
            Stdio::inherit()
        })
        .output()
        .map_err(|e| RelayError::process(&name, format!("cannot execute: {}", e)))?;

    if !output.status.success() {
        let reason = match (output.status.code(), output.status.signal()) {
            (Some(code), _) => format!("program exited with status {}", code),
            (None, Some(sig)) => format!("program terminated by signal {}", sig),
            (None, None) => "program terminated abnormally".to_string(),
        };
        return Err(RelayError::process(name, reason));
    }

    Ok(first_line(&output.stdout, max_len))
}

/// Extract the first line of `raw`, bounded to `max_len` bytes.
pub fn first_line(raw: &[u8], max_len: usize) -> LineOutput {
    if raw.is_empty() {
        return LineOutput {
            line: None,
            truncated: false,
        };
    }

    let end = raw
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .unwrap_or(raw.len());
    let mut line = String::from_utf8_lossy(&raw[..end]).into_owned();

    let truncated = line.len() > max_len;
    if truncated {
        let mut cut = max_len;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        line.truncate(cut);
    }

    LineOutput {
        line: Some(line),
        truncated,
    }
}

/// Quote `s` for safe interpolation into a `sh -c` command line.
pub fn shell_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_stops_at_either_terminator() {
        let out = first_line(b"Artist\r\nmore", 64);
        assert_eq!(out.line.as_deref(), Some("Artist"));
        assert!(!out.truncated);

        let out = first_line(b"one\ntwo\n", 64);
        assert_eq!(out.line.as_deref(), Some("one"));
    }

    #[test]
    fn first_line_of_nothing_is_none() {
        assert_eq!(first_line(b"", 8).line, None);
        // A bare newline is an empty line, not EOF
        assert_eq!(first_line(b"\n", 8).line.as_deref(), Some(""));
    }

    #[test]
    fn first_line_flags_truncation() {
        let out = first_line(b"abcdefgh\n", 4);
        assert_eq!(out.line.as_deref(), Some("abcd"));
        assert!(out.truncated);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let out = first_line("aé".as_bytes(), 2);
        assert_eq!(out.line.as_deref(), Some("a"));
        assert!(out.truncated);
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote("a b;rm"), "'a b;rm'");
    }
}
