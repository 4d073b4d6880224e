//! Analyze command implementation
//!
//! Prints the workspace build order and reports peer dependency conflicts.

use anyhow::{Context, Result};

use crate::cli::commands::workspace::WorkspaceContext;
use crate::cli::output::status;
use crate::core::peer::check_peer_dependencies;

/// Execute the analyze command
pub async fn execute(context: &WorkspaceContext) -> Result<()> {
    let graph = context.graph()?;
    tracing::info!("Analyzing {} package(s)", graph.len());

    let order = graph
        .topological_sort()
        .context("Workspace cannot be built")?;
    println!("{}", order.join(" → "));

    // Conflicts are warnings, never a failed analysis
    let conflicts = check_peer_dependencies(&graph);
    for conflict in &conflicts {
        eprintln!("{} {conflict}", status::WARNING);
    }
    if !conflicts.is_empty() {
        tracing::warn!("{} peer dependency conflict(s)", conflicts.len());
    }

    Ok(())
}
