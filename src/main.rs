//! Monoforge CLI - monorepo build orchestrator
//!
//! Entry point for the monoforge command-line application.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use monoforge::cli::output::display_error;
use monoforge::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Unknown subcommands show usage like a bare invocation does
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => {
            Cli::print_usage()?;
            return Ok(());
        }
        Err(e) => e.exit(),
    };

    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Run the command and handle errors
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
