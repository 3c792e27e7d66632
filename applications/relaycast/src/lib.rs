//! relaycast application
//!
//! Command line parsing, logging setup, signal wiring and the two modes of
//! operation: streaming from a configuration file, and the `-s` utility that
//! prints a shuffled playlist. The `relaycast-cfgmigrate` binary converts
//! legacy configurations through [`migrate`].
//!
//! This library exposes the pieces of the binary for testing purposes.

pub mod cli;
pub mod logging;
pub mod migrate;
pub mod signals;

pub use cli::{Cli, Mode};

use anyhow::Context;
use relaycast_config::{Config, XmlFile};
use relaycast_metadata::LoftyTagReader;
use relaycast_playlist::Playlist;
use relaycast_stream::{Control, DumpSink, DumpTarget, Runner, SinkFactory, StreamSink};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read a playlist and return its entries in shuffled order.
pub fn shuffled_entries(file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut playlist = Playlist::read(file).with_context(|| {
        format!(
            "{}: cannot read playlist",
            file.map_or_else(|| "stdin".to_string(), |p| p.display().to_string())
        )
    })?;
    playlist.shuffle();

    let mut entries = Vec::with_capacity(playlist.len());
    while let Some(entry) = playlist.get_next()? {
        entries.push(entry);
    }
    Ok(entries)
}

/// Load `config_file` and stream until the intake is exhausted or a quit
/// signal arrives.
pub async fn stream(cli: &Cli, config_file: &Path) -> anyhow::Result<()> {
    let mut config = Config::new(cli.program_settings());
    config
        .load(&XmlFile::new(config_file))
        .with_context(|| format!("{}: cannot load configuration", config_file.display()))?;
    config.check()?;

    let control = Arc::new(Control::new());
    let signals = signals::install(Arc::clone(&control)).context("cannot install signal handlers")?;

    let runner = Runner::new(
        &config,
        dump_factory(cli.dump.clone())?,
        Box::new(LoftyTagReader::new()),
        Arc::clone(&control),
    )?;

    let outcome = tokio::task::spawn_blocking(move || {
        let mut runner = runner;
        runner.run()
    })
    .await
    .context("streaming task failed")?;

    signals.abort();
    outcome?;
    Ok(())
}

/// Sinks for the dump target. A dump file is truncated once here; every
/// sink built later appends to it.
fn dump_factory(dump: Option<PathBuf>) -> anyhow::Result<SinkFactory> {
    if let Some(path) = &dump {
        File::create(path).with_context(|| format!("{}: cannot create dump file", path.display()))?;
    }
    let target = dump.map_or(DumpTarget::Stdout, DumpTarget::File);
    Ok(Box::new(move || {
        Box::new(DumpSink::new(target.clone())) as Box<dyn StreamSink>
    }))
}

/// Whether the process runs with root privileges
pub fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}
