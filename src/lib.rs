pub mod config;
pub mod downloader;

mod cli;
mod logging;

use std::process::ExitCode;

use clap::Parser;

/// Parse arguments, set up logging and run the selected command
pub async fn run() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::init_tracing(cli.verbose);
    cli::execute(cli).await
}
