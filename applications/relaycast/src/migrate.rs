/// Legacy configuration migration
use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use relaycast_config::{xml, ConfigSet, ConfigSource, LegacyFile};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "relaycast-cfgmigrate", version)]
#[command(about = "Convert a legacy single-stream configuration to the relaycast XML format", long_about = None)]
pub struct MigrateCli {
    /// Migrate the legacy configuration in FILE
    #[arg(short = '0', long = "legacy", value_name = "FILE")]
    pub legacy: PathBuf,

    /// Increase logging verbosity
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

/// Read `file` in the legacy format and render it as a relaycast document.
pub fn migrate(file: &Path) -> anyhow::Result<String> {
    let mut set = ConfigSet::new();
    LegacyFile::new(file)
        .populate(&mut set)
        .with_context(|| format!("{}: cannot migrate configuration", file.display()))?;

    let source = file
        .file_name()
        .map_or_else(|| file.display().to_string(), |name| name.to_string_lossy().into_owned());
    let comment = format!(
        "  This relaycast configuration file was generated by\n  {}.\n\n  Source (legacy format):\n    {}\n",
        MigrateCli::command().get_name(),
        source
    );
    Ok(xml::print_with_comment(&set, &comment)?)
}
