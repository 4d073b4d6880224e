//! Build command implementation
//!
//! Builds a package and its dependents through the orchestrator, reusing the
//! persisted cache between invocations.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;

use crate::cli::commands::workspace::WorkspaceContext;
use crate::cli::output::{report_build_progress, status};
use crate::core::builder::BuildOrchestrator;
use crate::infra::process::ShellRunner;

/// Build options
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Package to build
    pub package: Option<String>,
    /// Maximum concurrent builds within a level
    pub jobs: Option<usize>,
    /// Start from an empty cache
    pub force: bool,
    /// Suppress per-package output
    pub quiet: bool,
}

/// Execute the build command
pub async fn execute(context: &WorkspaceContext, options: BuildOptions) -> Result<()> {
    let Some(package) = options.package else {
        bail!("Please specify a package to build: monoforge build <package>");
    };
    if options.jobs == Some(0) {
        bail!("--jobs must be at least 1");
    }

    let graph = context.graph()?;
    let cache = context.load_cache()?;
    if options.force {
        // Unknown targets are reported by the orchestrator below
        if let Ok(affected) = graph.affected(&package) {
            for name in &affected {
                cache.invalidate(name);
            }
            tracing::info!("Ignoring cached digests for {} package(s)", affected.len());
        }
    }
    let jobs = options.jobs.unwrap_or_else(|| context.config.build_jobs());

    let (events, receiver) = mpsc::unbounded_channel();
    let progress = tokio::spawn(report_build_progress(receiver, options.quiet));

    let runner = Arc::new(ShellRunner::new(context.config.build_command()));
    let orchestrator = BuildOrchestrator::new(runner)
        .with_cache(cache)
        .with_jobs(jobs)
        .with_events(events);

    let start = Instant::now();
    let result = orchestrator.run(&graph, &package).await;

    // Successful packages stay recorded even when a later one failed
    let saved = context.save_cache(orchestrator.cache());
    drop(orchestrator);
    if let Err(e) = progress.await {
        tracing::debug!("Progress reporter stopped: {e}");
    }
    saved?;

    let report = result.with_context(|| format!("Build of '{package}' failed"))?;
    if !options.quiet {
        println!(
            "{} Built {} package(s), {} unchanged in {:.1}s",
            status::SUCCESS,
            report.built.len(),
            report.skipped.len(),
            start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
