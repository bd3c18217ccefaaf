//! Agency LeadGen CLI: find marketing agencies, enrich them, pick a
//! decision-maker contact, draft outreach, and export scored leads.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    tokio::select! {
        result = commands::run(cli) => result.map(|()| ExitCode::SUCCESS),
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("\n  Interrupted.");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
    }
}
