//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod analyze;
pub mod build;
pub mod cache;
pub mod dev;
pub mod workspace;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Subcommand;

use workspace::WorkspaceContext;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the workspace build order and check peer dependencies
    Analyze,

    /// Build a package and every package that depends on it
    Build {
        /// Package to build
        package: Option<String>,

        /// Maximum concurrent builds within a level (default: CPU count)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Ignore cached digests and rebuild everything affected
        #[arg(short, long)]
        force: bool,
    },

    /// Run a package's dev server and rebuild on changes
    Dev {
        /// Entry package to develop
        package: Option<String>,

        /// Leave reloads to the dev server's module replacement
        #[arg(long, conflicts_with = "dist")]
        alias: bool,

        /// Send a full page reload after each rebuild (default)
        #[arg(long)]
        dist: bool,

        /// Live reload WebSocket port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage the build cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cached packages
    Info,

    /// Forget cached digests
    Clean {
        /// Only forget this package
        package: Option<String>,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, project_dir: &Path, root: Option<PathBuf>, quiet: bool) -> Result<()> {
        let context = WorkspaceContext::load(project_dir, root.as_deref())?;
        match self {
            Self::Analyze => analyze::execute(&context).await,
            Self::Build {
                package,
                jobs,
                force,
            } => {
                let options = build::BuildOptions {
                    package,
                    jobs,
                    force,
                    quiet,
                };
                build::execute(&context, options).await
            }
            Self::Dev {
                package,
                alias,
                dist: _,
                port,
            } => {
                let options = dev::DevArgs {
                    package,
                    alias,
                    port,
                };
                dev::execute(&context, options).await
            }
            Self::Cache { command } => match command {
                CacheCommands::Info => cache::execute_info(&context).await,
                CacheCommands::Clean { package } => {
                    cache::execute_clean(&context, package.as_deref()).await
                }
            },
        }
    }
}
