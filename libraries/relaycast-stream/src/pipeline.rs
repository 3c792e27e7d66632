//! Decoder and encoder pipelines
//!
//! A track is either read as-is or fed through `decoder | encoder`, run by
//! `/bin/sh`. Every placeholder value is shell-quoted before substitution,
//! so templates should leave placeholders bare. Quotes written directly
//! around a placeholder, as in `"@T@"`, are dropped before expansion.

use crate::error::{Result, StreamError};
use chrono::{DateTime, Utc};
use relaycast_config::{Decoder, Encoder};
use relaycast_core::placeholder::{expand, Placeholder};
use relaycast_core::process::shell_quote;
use relaycast_core::RelayError;
use relaycast_metadata::TrackMetadata;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// How the bytes for a track are produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackInput {
    /// Read the file unchanged
    File(PathBuf),
    /// Read the standard output of a shell command
    Command(String),
    /// Read standard input unchanged
    Stdin,
}

/// Values substituted into decoder and encoder templates
pub struct Substitutions<'a> {
    pub metadata: &'a TrackMetadata,
    /// Expanded format template or song info, for `@M@`
    pub metadata_string: &'a str,
    pub started: DateTime<Utc>,
}

impl Substitutions<'_> {
    fn expand(&self, template: &str, track: &Path) -> String {
        let quote = |value: &str| shell_quote(value);
        let track = quote(&track.to_string_lossy());
        let metadata = quote(self.metadata_string);
        let artist = quote(self.metadata.artist().unwrap_or_default());
        let album = quote(self.metadata.album().unwrap_or_default());
        let title = quote(self.metadata.title().unwrap_or_default());
        let songinfo = quote(self.metadata.songinfo().unwrap_or_default());
        let started = quote(&self.started.to_rfc3339());

        expand(
            &unquote_placeholders(template),
            &[
                (Placeholder::Track, track.as_str()),
                (Placeholder::Metadata, metadata.as_str()),
                (Placeholder::Artist, artist.as_str()),
                (Placeholder::Album, album.as_str()),
                (Placeholder::Title, title.as_str()),
                (Placeholder::String, songinfo.as_str()),
                (Placeholder::Timestamp, started.as_str()),
            ],
        )
    }
}

/// Drop single or double quotes written directly around a placeholder.
fn unquote_placeholders(template: &str) -> String {
    let mut out = template.to_string();
    for marker in Placeholder::ALL {
        let token = marker.token();
        for quote in ['\'', '"'] {
            out = out.replace(&format!("{quote}{token}{quote}"), token);
        }
    }
    out
}

/// Decide how to read `track`.
///
/// Without an encoder the track's decoder, if any, runs on its own; with
/// neither the file is read directly. Transcoding needs both, so an encoder
/// without a decoder for the track is an error.
pub fn build_command(
    track: &Path,
    decoder: Option<&Decoder>,
    encoder: Option<&Encoder>,
    subs: &Substitutions<'_>,
) -> Result<TrackInput> {
    let decoder_cmd = decoder
        .and_then(Decoder::program)
        .map(|program| subs.expand(program, track));
    let encoder_cmd = encoder
        .and_then(Encoder::program)
        .map(|program| subs.expand(program, track));

    match (decoder_cmd, encoder_cmd) {
        (None, None) => Ok(TrackInput::File(track.to_path_buf())),
        (Some(dec), None) => {
            tracing::debug!("passing through decoder output for {}", track.display());
            Ok(TrackInput::Command(dec))
        }
        (Some(dec), Some(enc)) => Ok(TrackInput::Command(format!("{} | {}", dec, enc))),
        (None, Some(_)) => Err(StreamError::NoDecoder {
            track: track.display().to_string(),
        }),
    }
}

/// Open byte source for the track on air
pub struct TrackSource {
    reader: Box<dyn Read + Send>,
    child: Option<Child>,
    label: String,
}

impl TrackSource {
    pub fn open(input: &TrackInput, quiet_stderr: bool) -> Result<Self> {
        match input {
            TrackInput::File(path) => {
                let file = File::open(path).map_err(|e| RelayError::io(path, e))?;
                Ok(Self {
                    reader: Box::new(file),
                    child: None,
                    label: path.display().to_string(),
                })
            }
            TrackInput::Stdin => Ok(Self {
                reader: Box::new(io::stdin()),
                child: None,
                label: "stdin".to_string(),
            }),
            TrackInput::Command(cmd) => {
                tracing::debug!("running command: {}", cmd);
                // Own process group, so an early stop reaches every stage
                let mut child = Command::new("/bin/sh")
                    .arg("-c")
                    .arg(cmd)
                    .process_group(0)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(if quiet_stderr {
                        Stdio::null()
                    } else {
                        Stdio::inherit()
                    })
                    .spawn()
                    .map_err(|e| RelayError::process(cmd.as_str(), format!("cannot execute: {}", e)))?;
                let stdout = child.stdout.take().ok_or_else(|| {
                    RelayError::process(cmd.as_str(), "no standard output")
                })?;
                Ok(Self {
                    reader: Box::new(stdout),
                    child: Some(child),
                    label: cmd.clone(),
                })
            }
        }
    }

    /// What is being read, for log messages
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Close a source that reached end of input.
    ///
    /// A pipeline is waited for, and a non-zero exit is logged. Returns the
    /// pipeline's exit status, or `None` for plain files and stdin.
    pub fn finish(mut self) -> Option<ExitStatus> {
        // Close the read end first; a stage still writing then gets SIGPIPE
        self.reader = Box::new(io::empty());
        let mut child = self.child.take()?;
        match child.wait() {
            Ok(status) => {
                if !status.success() {
                    tracing::warn!("{}: {}", self.label, status);
                }
                Some(status)
            }
            Err(e) => {
                tracing::warn!("{}: {}", self.label, e);
                None
            }
        }
    }

    /// Stop a track before its end; a running pipeline is killed.
    pub fn abort(mut self) {
        self.kill();
    }

    fn kill(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            tracing::debug!("{}: kill: {}", self.label, e);
        }
        if let Err(e) = child.wait() {
            tracing::warn!("{}: {}", self.label, e);
        }
    }
}

impl Read for TrackSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Drop for TrackSource {
    fn drop(&mut self) {
        self.kill();
    }
}
