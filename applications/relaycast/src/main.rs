/// relaycast - source client for Icecast-style streaming servers
use clap::Parser;
use relaycast::{Cli, Mode};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    relaycast::logging::init(cli.verbose);

    if relaycast::running_as_root() {
        tracing::warn!(
            "you should not run relaycast as root; it can run other programs, which may cause serious security problems"
        );
    }

    let mode = match cli.mode() {
        Ok(mode) => mode,
        Err(e) => e.exit(),
    };

    let outcome = match mode {
        Mode::Shuffle(file) => relaycast::shuffled_entries(file.as_deref()).map(|entries| {
            for entry in entries {
                println!("{}", entry);
            }
        }),
        Mode::Stream(config_file) => relaycast::stream(&cli, &config_file).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
