//! Transport seam
//!
//! The session talks to the server through [`StreamSink`]. The network
//! implementation lives outside this crate; [`DumpSink`] writes the paced
//! byte stream to a local file or standard output instead.

use crate::error::SinkError;
use relaycast_config::{Protocol, StreamFormat, TlsMode};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Audio info keys announced to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioInfo {
    Quality,
    Bitrate,
    Samplerate,
    Channels,
}

impl AudioInfo {
    pub fn key(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Bitrate => "bitrate",
            Self::Samplerate => "samplerate",
            Self::Channels => "channels",
        }
    }
}

/// One connection parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkParam {
    Protocol(Protocol),
    Host(String),
    Port(u16),
    User(String),
    Password(String),
    Tls(TlsMode),
    CaDir(String),
    CaFile(String),
    CipherSuite(String),
    ClientCert(String),
    Mount(String),
    Format(StreamFormat),
    Public(bool),
    Name(String),
    Url(String),
    Genre(String),
    Description(String),
    AudioInfo(AudioInfo, String),
}

impl SinkParam {
    /// Configuration field the parameter came from, for error messages
    pub fn field(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Host(_) => "hostname",
            Self::Port(_) => "port",
            Self::User(_) => "user",
            Self::Password(_) => "password",
            Self::Tls(_) => "tls",
            Self::CaDir(_) => "ca_dir",
            Self::CaFile(_) => "ca_file",
            Self::CipherSuite(_) => "tls_cipher_suite",
            Self::ClientCert(_) => "client_cert",
            Self::Mount(_) => "mountpoint",
            Self::Format(_) => "format",
            Self::Public(_) => "public",
            Self::Name(_) => "stream_name",
            Self::Url(_) => "stream_url",
            Self::Genre(_) => "stream_genre",
            Self::Description(_) => "stream_description",
            Self::AudioInfo(AudioInfo::Quality, _) => "stream_quality",
            Self::AudioInfo(AudioInfo::Bitrate, _) => "stream_bitrate",
            Self::AudioInfo(AudioInfo::Samplerate, _) => "stream_samplerate",
            Self::AudioInfo(AudioInfo::Channels, _) => "stream_channels",
        }
    }
}

/// Ordered key/value pairs for a metadata update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBundle {
    fields: Vec<(&'static str, String)>,
}

impl MetadataBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &'static str, value: impl Into<String>) {
        self.fields.push((key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for MetadataBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}=\"{}\"", key, value)?;
        }
        Ok(())
    }
}

/// Transport to a streaming server
///
/// Parameters are applied one at a time before [`StreamSink::open`]. The
/// sink owns pacing: [`StreamSink::sync`] blocks until the server is ready
/// for the next chunk at the stream's real-time rate.
#[cfg_attr(test, mockall::automock)]
pub trait StreamSink: Send {
    /// Apply one connection parameter
    fn apply(&mut self, param: SinkParam) -> Result<(), SinkError>;

    /// Connect using the applied parameters
    fn open(&mut self) -> Result<(), SinkError>;

    /// Drop the connection
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Relay a chunk of stream data
    fn send(&mut self, data: &[u8]) -> Result<(), SinkError>;

    /// Wait until the next chunk is due
    fn sync(&mut self);

    /// Push a metadata update
    fn set_metadata(&mut self, bundle: &MetadataBundle) -> Result<(), SinkError>;
}

/// Where a [`DumpSink`] writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpTarget {
    Stdout,
    File(PathBuf),
}

/// Sink that writes the stream locally, paced to the announced bitrate
///
/// A file target is opened for appending, so reconnects keep what was
/// already written. Truncating it is up to the caller.
pub struct DumpSink {
    target: DumpTarget,
    out: Option<Box<dyn Write + Send>>,
    mount: Option<String>,
    kbps: Option<u32>,
    sent: u64,
    started: Option<Instant>,
}

impl DumpSink {
    pub fn new(target: DumpTarget) -> Self {
        Self {
            target,
            out: None,
            mount: None,
            kbps: None,
            sent: 0,
            started: None,
        }
    }

    /// Bytes written since the last `open`
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// How long to wait so that `sent` bytes take `elapsed` at `kbps`
    fn pacing_delay(sent: u64, kbps: u32, elapsed: Duration) -> Duration {
        let due = Duration::from_secs_f64(sent as f64 * 8.0 / (f64::from(kbps) * 1000.0));
        due.saturating_sub(elapsed)
    }
}

impl StreamSink for DumpSink {
    fn apply(&mut self, param: SinkParam) -> Result<(), SinkError> {
        match param {
            SinkParam::Mount(mount) => {
                if !mount.starts_with('/') {
                    return Err(SinkError::Rejected(format!(
                        "{}: mountpoint must start with /",
                        mount
                    )));
                }
                self.mount = Some(mount);
            }
            SinkParam::AudioInfo(AudioInfo::Bitrate, value) => {
                let kbps = value
                    .parse::<u32>()
                    .ok()
                    .filter(|&k| k > 0)
                    .ok_or_else(|| SinkError::Rejected(format!("{}: invalid bitrate", value)))?;
                self.kbps = Some(kbps);
            }
            other => tracing::trace!("dump sink: ignoring {}", other.field()),
        }
        Ok(())
    }

    fn open(&mut self) -> Result<(), SinkError> {
        let out: Box<dyn Write + Send> = match &self.target {
            DumpTarget::Stdout => Box::new(io::stdout()),
            DumpTarget::File(path) => {
                Box::new(OpenOptions::new().create(true).append(true).open(path)?)
            }
        };
        self.out = Some(out);
        self.sent = 0;
        self.started = Some(Instant::now());
        tracing::debug!(
            "dump sink open for {}",
            self.mount.as_deref().unwrap_or("(no mountpoint)")
        );
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut out) = self.out.take() {
            if let Err(e) = out.flush() {
                tracing::warn!("dump sink: flush: {}", e);
            }
        }
        self.started = None;
    }

    fn is_open(&self) -> bool {
        self.out.is_some()
    }

    fn send(&mut self, data: &[u8]) -> Result<(), SinkError> {
        let out = self.out.as_mut().ok_or(SinkError::NotConnected)?;
        out.write_all(data)?;
        self.sent += data.len() as u64;
        Ok(())
    }

    fn sync(&mut self) {
        if let (Some(kbps), Some(started)) = (self.kbps, self.started) {
            let delay = Self::pacing_delay(self.sent, kbps, started.elapsed());
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
    }

    fn set_metadata(&mut self, bundle: &MetadataBundle) -> Result<(), SinkError> {
        if self.out.is_none() {
            return Err(SinkError::NotConnected);
        }
        tracing::info!("metadata update: {}", bundle);
        Ok(())
    }
}
