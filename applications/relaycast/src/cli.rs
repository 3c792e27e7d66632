/// Command line surface
use clap::{ArgAction, CommandFactory, Parser};
use relaycast_config::ProgramSettings;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "relaycast", version)]
#[command(about = "Stream media files, playlists or program output to an Icecast-style server", long_about = None)]
pub struct Cli {
    /// Use the XML configuration in FILE
    #[arg(short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Read lines from FILE ("-" for standard input), shuffle, print them, then exit
    #[arg(short = 's', value_name = "FILE", conflicts_with = "config")]
    pub shuffle: Option<PathBuf>,

    /// Never send metadata updates to the server
    #[arg(short = 'm')]
    pub no_metadata_updates: bool,

    /// Squeeze runs of spaces in metadata strings
    #[arg(short = 'n')]
    pub normalize_strings: bool,

    /// Suppress standard error of external decoders, encoders and programs
    #[arg(short = 'q')]
    pub quiet_stderr: bool,

    /// Show real-time stream information (implies -q)
    #[arg(short = 'r')]
    pub rtstatus: bool,

    /// Increase logging verbosity
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Write the stream to FILE instead of standard output
    #[arg(long, value_name = "FILE", env = "RELAYCAST_DUMP")]
    pub dump: Option<PathBuf>,
}

/// What the invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Stream(PathBuf),
    /// `None` reads standard input
    Shuffle(Option<PathBuf>),
}

impl Cli {
    pub fn mode(&self) -> Result<Mode, clap::Error> {
        if let Some(file) = &self.shuffle {
            let file = (file.as_os_str() != "-").then(|| file.clone());
            return Ok(Mode::Shuffle(file));
        }
        match &self.config {
            Some(file) => Ok(Mode::Stream(file.clone())),
            None => Err(Self::command().error(
                clap::error::ErrorKind::MissingRequiredArgument,
                "either -c or -s must be provided",
            )),
        }
    }

    pub fn program_settings(&self) -> ProgramSettings {
        ProgramSettings {
            name: Self::command().get_name().to_string(),
            config_file: self.config.clone(),
            pid_file: None,
            quiet_stderr: self.quiet_stderr || self.rtstatus,
            rtstatus_output: self.rtstatus,
            verbosity: self.verbose,
            no_metadata_updates: self.no_metadata_updates,
            normalize_strings: self.normalize_strings,
            shuffle_file: self.shuffle.clone(),
        }
    }
}
