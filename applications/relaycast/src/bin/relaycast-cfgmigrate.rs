/// relaycast-cfgmigrate - convert legacy configurations
use clap::Parser;
use relaycast::migrate::{migrate, MigrateCli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = MigrateCli::parse();
    relaycast::logging::init(cli.verbose);

    match migrate(&cli.legacy) {
        Ok(document) => {
            print!("{}", document);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
