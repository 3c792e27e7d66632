//! Control loop tests against an in-memory sink

use relaycast_config::{Config, XmlStr};
use relaycast_core::{TagReader, TrackTags};
use relaycast_stream::{
    Control, MetadataBundle, Runner, RunnerOptions, SinkError, SinkFactory, SinkParam,
    StreamError, StreamSink,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default)]
struct Recorded {
    params: Vec<SinkParam>,
    chunks: Vec<Vec<u8>>,
    bundles: Vec<MetadataBundle>,
    opens: usize,
    failed_opens: usize,
    open_failures_left: usize,
    send_failures_left: usize,
    open: bool,
}

impl Recorded {
    fn bytes(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    fn songs(&self) -> Vec<String> {
        self.bundles
            .iter()
            .filter_map(|b| b.get("song").map(str::to_string))
            .collect()
    }
}

/// Records everything the session does; failures are scripted up front
struct RecordingSink(Arc<Mutex<Recorded>>);

impl StreamSink for RecordingSink {
    fn apply(&mut self, param: SinkParam) -> Result<(), SinkError> {
        self.0.lock().unwrap().params.push(param);
        Ok(())
    }

    fn open(&mut self) -> Result<(), SinkError> {
        let mut rec = self.0.lock().unwrap();
        if rec.open_failures_left > 0 {
            rec.open_failures_left -= 1;
            rec.failed_opens += 1;
            return Err(SinkError::Connect("connection refused".to_string()));
        }
        rec.opens += 1;
        rec.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.0.lock().unwrap().open = false;
    }

    fn is_open(&self) -> bool {
        self.0.lock().unwrap().open
    }

    fn send(&mut self, data: &[u8]) -> Result<(), SinkError> {
        let mut rec = self.0.lock().unwrap();
        if rec.send_failures_left > 0 {
            rec.send_failures_left -= 1;
            return Err(SinkError::Io(std::io::ErrorKind::BrokenPipe.into()));
        }
        rec.chunks.push(data.to_vec());
        Ok(())
    }

    fn sync(&mut self) {}

    fn set_metadata(&mut self, bundle: &MetadataBundle) -> Result<(), SinkError> {
        self.0.lock().unwrap().bundles.push(bundle.clone());
        Ok(())
    }
}

struct NoTags;

impl TagReader for NoTags {
    fn read_tags(&self, _path: &Path) -> Option<TrackTags> {
        None
    }
}

struct Harness {
    dir: TempDir,
    recorded: Arc<Mutex<Recorded>>,
    control: Arc<Control>,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            recorded: Arc::new(Mutex::new(Recorded::default())),
            control: Arc::new(Control::new()),
        }
    }

    fn file(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    fn playlist(&self, tracks: &[&Path]) -> PathBuf {
        let text: String = tracks
            .iter()
            .map(|t| format!("{}\n", t.display()))
            .collect();
        self.file("list.m3u", text.as_bytes())
    }

    fn factory(&self) -> SinkFactory {
        let recorded = Arc::clone(&self.recorded);
        Box::new(move || Box::new(RecordingSink(Arc::clone(&recorded))) as Box<dyn StreamSink>)
    }

    fn runner(&self, body: &str) -> Runner {
        self.runner_with_server("", body)
    }

    fn runner_with_server(&self, server_extra: &str, body: &str) -> Runner {
        let doc = format!(
            r#"<relaycast>
  <servers><server>
    <hostname>127.0.0.1</hostname>
    <password>hackme</password>
    {}
  </server></servers>
  <streams><stream>
    <mountpoint>/live.ogg</mountpoint>
    <format>ogg</format>
  </stream></streams>
  {}
</relaycast>"#,
            server_extra, body
        );
        let mut config = Config::default();
        config.load(&XmlStr::new("test.xml", &doc)).unwrap();
        Runner::new(
            &config,
            self.factory(),
            Box::new(NoTags),
            Arc::clone(&self.control),
        )
        .unwrap()
        .with_options(RunnerOptions {
            retry_delay: Duration::ZERO,
            ..RunnerOptions::default()
        })
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }
}

fn intake(kind: &str, filename: &Path) -> String {
    format!(
        "<intakes><intake><type>{}</type><filename>{}</filename><stream_once>yes</stream_once></intake></intakes>",
        kind,
        filename.display()
    )
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
}

#[test]
fn single_file_is_relayed_in_chunks() {
    let h = Harness::new();
    let data = pattern(10_000, 1);
    let track = h.file("song.ogg", &data);

    let mut runner = h.runner(&intake("file", &track));
    runner.run().unwrap();

    let rec = h.recorded();
    assert_eq!(rec.opens, 1);
    assert_eq!(
        rec.chunks.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![4096, 4096, 1808]
    );
    assert_eq!(rec.bytes(), data);
    assert_eq!(rec.songs(), vec!["song".to_string()]);
    assert_eq!(rec.bundles[0].get("charset"), Some("UTF-8"));
    assert!(rec.params.contains(&SinkParam::Mount("/live.ogg".to_string())));
    assert!(!rec.open);
}

#[test]
fn playlist_tracks_play_in_order() {
    let h = Harness::new();
    let a = h.file("a.ogg", b"aaaa");
    let b = h.file("b.ogg", b"bbbb");
    let c = h.file("c.ogg", b"cccc");
    let list = h.playlist(&[&a, &b, &c]);

    let mut runner = h.runner(&intake("playlist", &list));
    runner.run().unwrap();

    let rec = h.recorded();
    assert_eq!(rec.bytes(), b"aaaabbbbcccc");
    assert_eq!(rec.songs(), vec!["a", "b", "c"]);
}

#[test]
fn autodetect_treats_m3u_as_playlist() {
    let h = Harness::new();
    let a = h.file("a.ogg", b"one");
    let list = h.playlist(&[&a]);

    let mut runner = h.runner(&intake("autodetect", &list));
    runner.run().unwrap();

    assert_eq!(h.recorded().bytes(), b"one");
}

#[test]
fn unreadable_track_is_skipped() {
    let h = Harness::new();
    let a = h.file("a.ogg", b"aa");
    let missing = h.dir.path().join("gone.ogg");
    let c = h.file("c.ogg", b"cc");
    let list = h.playlist(&[&a, &missing, &c]);

    let mut runner = h.runner(&intake("playlist", &list));
    runner.run().unwrap();

    assert_eq!(h.recorded().bytes(), b"aacc");
}

#[test]
fn connect_is_retried_until_it_succeeds() {
    let h = Harness::new();
    let track = h.file("song.ogg", b"payload");
    h.recorded().open_failures_left = 2;

    let mut runner = h.runner(&intake("file", &track));
    runner.run().unwrap();

    let rec = h.recorded();
    assert_eq!(rec.failed_opens, 2);
    assert_eq!(rec.opens, 1);
    assert_eq!(rec.bytes(), b"payload");
}

#[test]
fn reconnect_budget_is_enforced() {
    let h = Harness::new();
    let track = h.file("song.ogg", b"payload");
    h.recorded().open_failures_left = usize::MAX;

    let mut runner = h.runner_with_server(
        "<reconnect_attempts>2</reconnect_attempts>",
        &intake("file", &track),
    );
    let err = runner.run().unwrap_err();

    assert!(matches!(err, StreamError::ReconnectExhausted { attempts: 2 }));
    assert!(err.is_fatal());
    let rec = h.recorded();
    assert_eq!(rec.failed_opens, 2);
    assert!(rec.chunks.is_empty());
}

#[test]
fn send_failure_reconnects_and_resends() {
    let h = Harness::new();
    let data = pattern(5_000, 9);
    let track = h.file("song.ogg", &data);
    h.recorded().send_failures_left = 1;

    let mut runner = h.runner(&intake("file", &track));
    runner.run().unwrap();

    let rec = h.recorded();
    assert_eq!(rec.opens, 2);
    assert_eq!(rec.bytes(), data);
}

#[test]
fn pending_skip_drops_the_current_track() {
    let h = Harness::new();
    let a = h.file("a.ogg", b"aaaa");
    let b = h.file("b.ogg", b"bbbb");
    let list = h.playlist(&[&a, &b]);
    h.control.request_skip();

    let mut runner = h.runner(&intake("playlist", &list));
    runner.run().unwrap();

    assert_eq!(h.recorded().bytes(), b"bbbb");
}

#[test]
fn pending_quit_stops_before_connecting() {
    let h = Harness::new();
    let track = h.file("song.ogg", b"payload");
    h.control.request_quit();

    let mut runner = h.runner(&intake("file", &track));
    runner.run().unwrap();

    let rec = h.recorded();
    assert_eq!(rec.opens, 0);
    assert!(rec.chunks.is_empty());
}

#[test]
fn reread_resumes_after_the_last_track() {
    let h = Harness::new();
    let a = h.file("a.ogg", b"a");
    let b = h.file("b.ogg", b"b");
    let c = h.file("c.ogg", b"c");
    let list = h.playlist(&[&a, &b, &c]);
    h.control.request_reread();

    let mut runner = h.runner(&intake("playlist", &list));
    runner.run().unwrap();

    assert_eq!(h.recorded().bytes(), b"abc");
}

#[test]
fn decoder_output_is_relayed() {
    let h = Harness::new();
    let track = h.file("tone.raw", b"raw bytes");

    let body = format!(
        "{}<decoders><decoder><name>raw</name><program>cat @T@</program>\
         <file_ext>.raw</file_ext></decoder></decoders>",
        intake("file", &track)
    );
    let mut runner = h.runner(&body);
    runner.run().unwrap();

    assert_eq!(h.recorded().bytes(), b"raw bytes");
}

#[test]
fn format_template_is_sent_as_song() {
    let h = Harness::new();
    let track = h.file("song.ogg", b"x");

    let body = format!(
        "{}<metadata><format_str>now playing: @s@</format_str></metadata>",
        intake("file", &track)
    );
    let mut runner = h.runner(&body);
    runner.run().unwrap();

    assert_eq!(h.recorded().songs(), vec!["now playing: song"]);
}

#[test]
fn metadata_updates_can_be_disabled() {
    let h = Harness::new();
    let track = h.file("song.ogg", b"x");

    let body = format!(
        "{}<metadata><no_updates>yes</no_updates></metadata>",
        intake("file", &track)
    );
    let mut runner = h.runner(&body);
    runner.run().unwrap();

    let rec = h.recorded();
    assert!(rec.bundles.is_empty());
    assert_eq!(rec.bytes(), b"x");
}
