//! Streaming session
//!
//! A session binds one stream (mountpoint) to one server through a
//! [`StreamSink`]. It applies the configuration, connects, relays chunks and
//! pushes metadata. Retrying is left to the caller.

use crate::error::{Result, SinkError, StreamError};
use crate::sink::{AudioInfo, MetadataBundle, SinkParam, StreamSink};
use relaycast_config::{Entity, MetadataSettings, Server, Stream};
use relaycast_metadata::TrackMetadata;

/// Builds a fresh transport handle
pub type SinkFactory = Box<dyn Fn() -> Box<dyn StreamSink> + Send>;

/// Connection state of a [`StreamSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Sending,
    Disconnected,
}

pub struct StreamSession {
    name: String,
    host: String,
    sink: Box<dyn StreamSink>,
    factory: SinkFactory,
    state: SessionState,
    no_updates: bool,
}

impl StreamSession {
    pub fn new(name: impl Into<String>, factory: SinkFactory) -> Self {
        let sink = factory();
        Self {
            name: name.into(),
            host: String::new(),
            sink,
            factory,
            state: SessionState::Idle,
            no_updates: false,
        }
    }

    /// Suppress metadata updates regardless of configuration
    pub fn set_no_metadata_updates(&mut self, no_updates: bool) {
        self.no_updates = no_updates;
    }

    /// Apply `server` and `stream` to the transport.
    ///
    /// If any parameter is rejected the transport is replaced with a fresh
    /// one, so it is never left half configured.
    pub fn setup(&mut self, server: &Server, stream: &Stream) -> Result<()> {
        let params = match connection_params(server, stream) {
            Ok(params) => params,
            Err(err) => {
                self.reset();
                return Err(err);
            }
        };

        for param in params {
            let field = param.field();
            if let Err(source) = self.sink.apply(param) {
                tracing::error!("{}: {}: {}", self.name, field, source);
                self.reset();
                return Err(StreamError::Setup { field, source });
            }
        }

        self.host = server.hostname().unwrap_or_default().to_string();
        tracing::debug!(
            "{}: configured for server {} ({})",
            self.name,
            server.name(),
            self.host
        );
        Ok(())
    }

    /// One connection attempt.
    pub fn connect(&mut self) -> Result<()> {
        self.state = SessionState::Connecting;
        match self.sink.open() {
            Ok(()) => {
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{}: connect: {}: {}", self.name, self.host, e);
                self.state = SessionState::Idle;
                Err(StreamError::Protocol(e))
            }
        }
    }

    /// Push metadata for the current track.
    ///
    /// A rejected update is logged and returned, but leaves the connection
    /// alone.
    pub fn set_metadata(&mut self, md: &TrackMetadata, settings: &MetadataSettings) -> Result<()> {
        if self.no_updates || settings.no_updates() {
            return Ok(());
        }

        let bundle = build_metadata_bundle(md, settings)?;
        match self.sink.set_metadata(&bundle) {
            Ok(()) => {
                tracing::info!("{}: stream metadata: {}", self.name, bundle);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{}: metadata update: {}", self.name, e);
                Err(StreamError::MetadataPush(e))
            }
        }
    }

    /// Relay one chunk. On failure the connection is closed.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.state = SessionState::Sending;
        match self.sink.send(data) {
            Ok(()) => {
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{}: send: {}: {}", self.name, self.host, e);
                self.disconnect();
                Err(StreamError::Send(e))
            }
        }
    }

    pub fn sync(&mut self) {
        self.sink.sync();
    }

    pub fn disconnect(&mut self) {
        if self.sink.is_open() {
            self.sink.close();
        }
        self.state = SessionState::Disconnected;
    }

    fn reset(&mut self) {
        self.sink = (self.factory)();
        self.state = SessionState::Idle;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_open()
    }
}

/// Transport parameters for `server` and `stream`, in application order.
pub fn connection_params(server: &Server, stream: &Stream) -> Result<Vec<SinkParam>> {
    let missing = |field: &'static str| StreamError::Setup {
        field,
        source: SinkError::Rejected("not set".to_string()),
    };

    let mut params = vec![
        SinkParam::Protocol(server.protocol()),
        SinkParam::Host(server.hostname().ok_or_else(|| missing("hostname"))?.to_string()),
        SinkParam::Port(server.port()),
        SinkParam::User(server.user().to_string()),
        SinkParam::Password(server.password().ok_or_else(|| missing("password"))?.to_string()),
        SinkParam::Tls(server.tls()),
    ];
    let optional = [
        server.ca_dir().map(|v| SinkParam::CaDir(v.to_string())),
        server.ca_file().map(|v| SinkParam::CaFile(v.to_string())),
        server
            .tls_cipher_suite()
            .map(|v| SinkParam::CipherSuite(v.to_string())),
        server.client_cert().map(|v| SinkParam::ClientCert(v.to_string())),
    ];
    params.extend(optional.into_iter().flatten());

    params.push(SinkParam::Mount(
        stream.mountpoint().ok_or_else(|| missing("mountpoint"))?.to_string(),
    ));
    params.push(SinkParam::Format(
        stream.format().ok_or_else(|| missing("format"))?,
    ));
    params.push(SinkParam::Public(stream.public()));

    let descriptive = [
        stream.stream_name().map(|v| SinkParam::Name(v.to_string())),
        stream.stream_url().map(|v| SinkParam::Url(v.to_string())),
        stream.stream_genre().map(|v| SinkParam::Genre(v.to_string())),
        stream
            .stream_description()
            .map(|v| SinkParam::Description(v.to_string())),
        stream
            .stream_quality()
            .map(|v| SinkParam::AudioInfo(AudioInfo::Quality, v.to_string())),
        stream
            .stream_bitrate()
            .map(|v| SinkParam::AudioInfo(AudioInfo::Bitrate, v.to_string())),
        stream
            .stream_samplerate()
            .map(|v| SinkParam::AudioInfo(AudioInfo::Samplerate, v.to_string())),
        stream
            .stream_channels()
            .map(|v| SinkParam::AudioInfo(AudioInfo::Channels, v.to_string())),
    ];
    params.extend(descriptive.into_iter().flatten());

    Ok(params)
}

/// Metadata update for `md`.
///
/// A configured format template is sent verbatim as `song`. Otherwise
/// artist and title go out as separate fields when both are known, and the
/// song info (or display name) as `song` when they are not.
pub fn build_metadata_bundle(
    md: &TrackMetadata,
    settings: &MetadataSettings,
) -> std::result::Result<MetadataBundle, relaycast_metadata::MetadataError> {
    let mut bundle = MetadataBundle::new();
    bundle.add("charset", "UTF-8");

    if let Some(template) = settings.format_str() {
        bundle.add("song", md.strformat(Some(template))?);
    } else if let (Some(artist), Some(title)) = (md.artist(), md.title()) {
        bundle.add("artist", artist);
        bundle.add("title", title);
    } else {
        bundle.add("song", md.songinfo().unwrap_or_else(|| md.name()));
    }
    Ok(bundle)
}
