//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use commands::Commands;

/// Monoforge - monorepo build orchestrator
///
/// Builds workspace packages in dependency order, skips unchanged packages and
/// live-reloads the browser while developing.
#[derive(Parser, Debug)]
#[command(name = "monoforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Workspace directory holding the packages (default: ./packages)
    #[arg(long, global = true, env = "MONOFORGE_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Log level used when `RUST_LOG` is not set
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 if matches!(self.command, Some(Commands::Dev { .. })) => "info",
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Print usage to stdout
    pub fn print_usage() -> Result<()> {
        Self::command().print_help()?;
        Ok(())
    }

    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        if let Some(cmd) = self.command {
            let current_dir = std::env::current_dir()?;
            cmd.run(&current_dir, self.root, self.quiet).await
        } else {
            // No subcommand provided, show help
            Self::print_usage()
        }
    }
}
