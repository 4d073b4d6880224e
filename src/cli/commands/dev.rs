//! Dev command implementation

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cli::commands::workspace::WorkspaceContext;
use crate::core::builder::BuildOrchestrator;
use crate::core::dev::{DevOptions, DevSession, ReloadMode};
use crate::infra::process::ShellRunner;

/// Dev command arguments
#[derive(Debug, Default)]
pub struct DevArgs {
    /// Entry package
    pub package: Option<String>,
    /// Leave reloads to module replacement
    pub alias: bool,
    /// Live reload port override
    pub port: Option<u16>,
}

/// Execute the dev command
///
/// Runs until Ctrl-C, SIGTERM, or the dev process exits.
pub async fn execute(context: &WorkspaceContext, args: DevArgs) -> Result<()> {
    let Some(package) = args.package else {
        bail!("Please specify a package to develop: monoforge dev <package>");
    };

    let graph = context.graph()?;
    let runner = Arc::new(ShellRunner::new(context.config.build_command()));
    let orchestrator = Arc::new(
        BuildOrchestrator::new(runner)
            .with_cache(context.load_cache()?)
            .with_jobs(context.config.build_jobs()),
    );

    let mode = if args.alias {
        ReloadMode::Alias
    } else {
        ReloadMode::Dist
    };
    let options = DevOptions {
        command: context.config.dev_command().to_string(),
        host: context.config.dev_host().to_string(),
        port: args.port.unwrap_or_else(|| context.config.dev_port()),
        debounce: context.config.debounce(),
        mode,
        ..DevOptions::default()
    };

    let result = DevSession::new(graph, Arc::clone(&orchestrator), options)
        .start(&package)
        .await;

    context.save_cache(orchestrator.cache())?;
    result.with_context(|| format!("Dev session for '{package}' failed"))
}
