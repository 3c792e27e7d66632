//! Streaming control loop
//!
//! One [`Runner`] drives one stream: it pulls tracks from the intake,
//! starts the transcode pipeline, relays its output chunk by chunk and keeps
//! the server's metadata current. Signal handlers talk to it only through
//! the pending flags in [`Control`], which are checked between chunks and
//! between tracks.

use crate::error::{Result, StreamError};
use crate::pipeline::{build_command, Substitutions, TrackInput, TrackSource};
use crate::session::{SinkFactory, StreamSession};
use crate::status::StatusLine;
use chrono::{DateTime, Utc};
use relaycast_config::{
    Config, ConfigSet, Encoder, Entity, Intake, IntakeType, ProgramSettings, Server, Stream,
    DEFAULT_NAME,
};
use relaycast_core::TagReader;
use relaycast_metadata::TrackMetadata;
use relaycast_playlist::Playlist;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bytes relayed per send
pub const CHUNK_SIZE: usize = 4096;

/// Pause between failed connection attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Pending requests from signal handlers
#[derive(Debug, Default)]
pub struct Control {
    skip: AtomicBool,
    reread: AtomicBool,
    quit: AtomicBool,
}

impl Control {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the rest of the current track
    pub fn request_skip(&self) {
        self.skip.store(true, Ordering::SeqCst);
    }

    /// Re-read the playlist after the current track
    pub fn request_reread(&self) {
        self.reread.store(true, Ordering::SeqCst);
    }

    /// Stop streaming as soon as possible
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn take_skip(&self) -> bool {
        self.skip.swap(false, Ordering::SeqCst)
    }

    pub fn take_reread(&self) -> bool {
        self.reread.swap(false, Ordering::SeqCst)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

/// Timing knobs
#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    pub chunk_size: usize,
    pub retry_delay: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            retry_delay: RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackEnd {
    Done,
    Skipped,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Again,
    Stop,
}

pub struct Runner {
    set: ConfigSet,
    program: ProgramSettings,
    stream: Stream,
    server: Server,
    intake: Intake,
    encoder: Option<Encoder>,
    session: StreamSession,
    tags: Box<dyn TagReader>,
    control: Arc<Control>,
    options: RunnerOptions,
    playlist: Option<Playlist>,
    metadata: TrackMetadata,
    started: DateTime<Utc>,
}

impl Runner {
    /// Bind the first configured stream (`default` if present) to its
    /// server, intake and encoder.
    pub fn new(
        config: &Config,
        factory: SinkFactory,
        tags: Box<dyn TagReader>,
        control: Arc<Control>,
    ) -> Result<Self> {
        let set = config.active().clone();
        let stream = set
            .streams()
            .find(DEFAULT_NAME)
            .or_else(|| set.streams().iter().next())
            .cloned()
            .ok_or_else(|| StreamError::Config("no stream configured".to_string()))?;

        let server_name = stream.server().unwrap_or(DEFAULT_NAME);
        let server = set.servers().find(server_name).cloned().ok_or_else(|| {
            StreamError::Config(format!(
                "stream ({}): server {} does not exist",
                stream.name(),
                server_name
            ))
        })?;

        let intake_name = stream.intake().unwrap_or(DEFAULT_NAME);
        let intake = set.intakes().find(intake_name).cloned().ok_or_else(|| {
            StreamError::Config(format!(
                "stream ({}): intake {} does not exist",
                stream.name(),
                intake_name
            ))
        })?;

        let encoder = match stream.encoder() {
            Some(name) => Some(set.encoders().find(name).cloned().ok_or_else(|| {
                StreamError::Config(format!(
                    "stream ({}): encoder {} does not exist",
                    stream.name(),
                    name
                ))
            })?),
            None => None,
        };

        let program = config.program().clone();
        let mut session = StreamSession::new(stream.name(), factory);
        session.set_no_metadata_updates(program.no_metadata_updates);

        let mut metadata = TrackMetadata::new();
        metadata.set_quiet_stderr(program.quiet_stderr);

        Ok(Self {
            set,
            program,
            stream,
            server,
            intake,
            encoder,
            session,
            tags,
            control,
            options: RunnerOptions::default(),
            playlist: None,
            metadata,
            started: Utc::now(),
        })
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Stream until the intake runs dry, `stream_once` is satisfied, a
    /// quit is requested or a fatal error occurs.
    pub fn run(&mut self) -> Result<()> {
        self.session.setup(&self.server, &self.stream)?;
        match self.connect_with_retry() {
            Err(StreamError::Interrupted) => return Ok(()),
            other => other?,
        }
        self.started = Utc::now();

        let kind = resolve_intake_type(&self.intake);
        tracing::debug!(
            "{}: intake {} ({})",
            self.stream.name(),
            self.intake.name(),
            kind
        );

        let outcome = loop {
            let pass = match kind {
                IntakeType::Stdin => self.stream_stdin(),
                IntakeType::Playlist | IntakeType::Program => self.stream_playlist(kind),
                IntakeType::File | IntakeType::Autodetect => self.stream_file(),
            };
            match pass {
                Ok(Pass::Again) if !self.intake.stream_once() && !self.control.quit_requested() => {}
                Ok(_) | Err(StreamError::Interrupted) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.session.disconnect();
        tracing::info!("{}: disconnected", self.stream.name());
        outcome
    }

    fn stream_file(&mut self) -> Result<Pass> {
        let filename = self.intake_filename()?;
        match self.stream_track(&filename, None)? {
            TrackEnd::Quit => Ok(Pass::Stop),
            TrackEnd::Done | TrackEnd::Skipped => Ok(Pass::Again),
        }
    }

    fn stream_stdin(&mut self) -> Result<Pass> {
        if let Some(program) = self.set.metadata().program().map(str::to_string) {
            match self.metadata.run_program(Path::new(&program), self.program.quiet_stderr) {
                Ok(()) => self.push_metadata(),
                Err(e) => tracing::warn!("{}", e),
            }
        }
        let mut source = TrackSource::open(&TrackInput::Stdin, self.program.quiet_stderr)?;
        self.relay(&mut source, None)?;
        Ok(Pass::Stop)
    }

    fn stream_playlist(&mut self, kind: IntakeType) -> Result<Pass> {
        let mut playlist = match self.playlist.take() {
            Some(mut playlist) => {
                playlist.rewind();
                playlist
            }
            None => self.open_playlist(kind)?,
        };
        if self.intake.shuffle() {
            playlist.shuffle();
        }

        let outcome = self.walk_playlist(&mut playlist);
        self.playlist = Some(playlist);
        outcome
    }

    fn open_playlist(&self, kind: IntakeType) -> Result<Playlist> {
        let filename = self.intake_filename()?;
        let path = Path::new(&filename);
        let playlist = if kind == IntakeType::Program {
            Playlist::from_program(path, self.program.quiet_stderr)?
        } else {
            Playlist::read(Some(path))?
        };
        Ok(playlist)
    }

    fn walk_playlist(&mut self, playlist: &mut Playlist) -> Result<Pass> {
        let mut streamed = 0usize;
        loop {
            if self.control.quit_requested() {
                return Ok(Pass::Stop);
            }

            let track = match playlist.get_next() {
                Ok(Some(track)) => track,
                Ok(None) if streamed > 0 => return Ok(Pass::Again),
                Ok(None) => {
                    tracing::info!("{}: nothing to stream", self.intake.name());
                    return Ok(Pass::Stop);
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::error!("{}", e);
                    return Ok(Pass::Stop);
                }
            };

            let position = (!playlist.is_program()).then(|| (playlist.position(), playlist.len()));
            match self.stream_track(&track, position) {
                Ok(TrackEnd::Quit) => return Ok(Pass::Stop),
                Ok(_) => streamed += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::error!("{}: {}", track, e),
            }

            if self.control.take_reread() {
                self.reread_playlist(playlist, &track);
            }
        }
    }

    fn reread_playlist(&self, playlist: &mut Playlist, last: &str) {
        tracing::info!("{}: rereading playlist", self.intake.name());
        match playlist.reread() {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::error!("{}", e);
                return;
            }
        }
        if self.intake.shuffle() {
            playlist.shuffle();
        } else if playlist.goto_entry(last) {
            playlist.skip_next();
        }
    }

    fn stream_track(&mut self, track: &str, position: Option<(usize, usize)>) -> Result<TrackEnd> {
        let path = Path::new(track);
        self.load_metadata(path)?;

        let metadata_string = self.metadata_string();
        let input = build_command(
            path,
            self.set.decoders().find_for_path(path),
            self.encoder.as_ref(),
            &Substitutions {
                metadata: &self.metadata,
                metadata_string: &metadata_string,
                started: self.started,
            },
        )?;
        let mut source = TrackSource::open(&input, self.program.quiet_stderr)?;

        self.push_metadata();
        tracing::info!(
            "{}: streaming \"{}\"",
            self.stream.name(),
            self.metadata.songinfo().unwrap_or_else(|| self.metadata.name())
        );
        tracing::debug!("{}: reading {}", self.stream.name(), source.label());

        let end = self.relay(&mut source, position);
        match end {
            Ok(TrackEnd::Done) => {
                source.finish();
            }
            _ => source.abort(),
        }
        end
    }

    fn load_metadata(&mut self, path: &Path) -> Result<()> {
        let settings = self.set.metadata();
        self.metadata
            .set_normalize_strings(settings.normalize_strings() || self.program.normalize_strings);

        match settings.program() {
            Some(program) => {
                if let Err(e) = self
                    .metadata
                    .run_program(Path::new(program), self.program.quiet_stderr)
                {
                    let e = StreamError::from(e);
                    if e.is_fatal() {
                        return Err(e);
                    }
                    tracing::warn!("{}", e);
                    self.metadata = TrackMetadata::for_filename(path);
                }
            }
            None => self.metadata.parse_file(path, self.tags.as_ref())?,
        }
        Ok(())
    }

    /// Value for `@M@`: the expanded format template, else the song info.
    fn metadata_string(&self) -> String {
        match self.set.metadata().format_str() {
            Some(template) => self
                .metadata
                .strformat(Some(template))
                .unwrap_or_default(),
            None => self
                .metadata
                .songinfo()
                .unwrap_or_else(|| self.metadata.name())
                .to_string(),
        }
    }

    fn push_metadata(&mut self) {
        if let Err(e) = self.session.set_metadata(&self.metadata, self.set.metadata()) {
            tracing::debug!("{}: {}", self.stream.name(), e);
        }
    }

    fn refresh_metadata(&mut self) {
        match self.metadata.refresh(self.tags.as_ref()) {
            Ok(()) => self.push_metadata(),
            Err(e) => tracing::warn!("metadata refresh: {}", e),
        }
    }

    fn relay(&mut self, source: &mut TrackSource, position: Option<(usize, usize)>) -> Result<TrackEnd> {
        let mut buf = vec![0u8; self.options.chunk_size];
        let mut status = StatusLine::new();
        let refresh = u64::try_from(self.set.metadata().refresh_interval())
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);
        let mut last_refresh = Instant::now();

        loop {
            if self.control.quit_requested() {
                return Ok(TrackEnd::Quit);
            }
            if self.control.take_skip() {
                tracing::info!("{}: skipping current track", self.stream.name());
                return Ok(TrackEnd::Skipped);
            }

            let n = match source.read(&mut buf) {
                Ok(0) => return Ok(TrackEnd::Done),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("{}: read error: {}", source.label(), e);
                    return Ok(TrackEnd::Done);
                }
            };

            self.send_chunk(&buf[..n])?;
            self.session.sync();

            if let Some(interval) = refresh {
                if last_refresh.elapsed() >= interval {
                    self.refresh_metadata();
                    last_refresh = Instant::now();
                }
            }

            if self.program.rtstatus_output {
                status.record(n);
                eprint!("{}", status.render(position));
            }
        }
    }

    /// Send `data`, reconnecting as often as the retry budget allows.
    fn send_chunk(&mut self, data: &[u8]) -> Result<()> {
        loop {
            match self.session.send(data) {
                Ok(()) => return Ok(()),
                Err(_) => {
                    tracing::warn!(
                        "{}: disconnected from {}, reconnecting",
                        self.stream.name(),
                        self.session.host()
                    );
                    self.connect_with_retry()?;
                }
            }
        }
    }

    fn connect_with_retry(&mut self) -> Result<()> {
        let budget = self.server.reconnect_attempts();
        let mut attempt = 0u32;
        loop {
            if self.control.quit_requested() {
                return Err(StreamError::Interrupted);
            }
            attempt += 1;
            match self.session.connect() {
                Ok(()) => {
                    tracing::info!(
                        "{}: connected to {}:{}{}",
                        self.stream.name(),
                        self.session.host(),
                        self.server.port(),
                        self.stream.mountpoint().unwrap_or_default()
                    );
                    return Ok(());
                }
                Err(_) if budget > 0 && attempt >= budget => {
                    tracing::error!(
                        "{}: giving up after {} connection attempts",
                        self.stream.name(),
                        attempt
                    );
                    return Err(StreamError::ReconnectExhausted { attempts: attempt });
                }
                Err(_) => {
                    tracing::info!(
                        "{}: connection attempt {} failed, retrying in {}s",
                        self.stream.name(),
                        attempt,
                        self.options.retry_delay.as_secs()
                    );
                    self.wait(self.options.retry_delay)?;
                }
            }
        }
    }

    fn wait(&self, delay: Duration) -> Result<()> {
        let deadline = Instant::now() + delay;
        loop {
            if self.control.quit_requested() {
                return Err(StreamError::Interrupted);
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(());
            }
            std::thread::sleep(left.min(WAIT_SLICE));
        }
    }

    fn intake_filename(&self) -> Result<String> {
        self.intake.filename().map(str::to_string).ok_or_else(|| {
            StreamError::Config(format!("intake ({}): intake filename missing", self.intake.name()))
        })
    }
}

/// Effective intake type; `autodetect` treats `.m3u` and `.txt` as playlists.
pub fn resolve_intake_type(intake: &Intake) -> IntakeType {
    match intake.kind() {
        IntakeType::Autodetect => {
            let is_playlist = intake.filename().is_some_and(|name| {
                let lower = name.to_ascii_lowercase();
                lower.ends_with(".m3u") || lower.ends_with(".txt")
            });
            if is_playlist {
                IntakeType::Playlist
            } else {
                IntakeType::File
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake(kind: &str, filename: &str) -> Intake {
        let mut intake = Intake::new("default");
        intake.set_type(kind).unwrap();
        intake.set_filename(filename).unwrap();
        intake
    }

    #[test]
    fn autodetect_by_extension() {
        assert_eq!(
            resolve_intake_type(&intake("autodetect", "/srv/list.M3U")),
            IntakeType::Playlist
        );
        assert_eq!(
            resolve_intake_type(&intake("autodetect", "tracks.txt")),
            IntakeType::Playlist
        );
        assert_eq!(
            resolve_intake_type(&intake("autodetect", "song.ogg")),
            IntakeType::File
        );
        assert_eq!(
            resolve_intake_type(&intake("program", "next.sh")),
            IntakeType::Program
        );
    }

    #[test]
    fn control_flags_are_consumed_once() {
        let control = Control::new();
        control.request_skip();
        assert!(control.take_skip());
        assert!(!control.take_skip());

        control.request_reread();
        assert!(control.take_reread());
        assert!(!control.take_reread());

        control.request_quit();
        assert!(control.quit_requested());
        assert!(control.quit_requested());
    }
}
