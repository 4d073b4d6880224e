//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars and
//! formatted messages to the user.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::core::builder::BuildEvent;

/// Create a progress bar for build steps
pub fn create_build_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} packages ({msg})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");
    pb.set_style(style);
    pb
}

/// Drive a progress bar from orchestrator events until the sender is dropped
///
/// Per-package results are printed to stderr above the bar unless `quiet`.
pub async fn report_build_progress(mut events: UnboundedReceiver<BuildEvent>, quiet: bool) {
    let mut bar: Option<ProgressBar> = None;
    let print = |bar: &Option<ProgressBar>, line: String| {
        if quiet {
            return;
        }
        match bar {
            Some(bar) => bar.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }
    };

    while let Some(event) = events.recv().await {
        match event {
            BuildEvent::Planned { target, total } => {
                let pb = if quiet {
                    ProgressBar::hidden()
                } else {
                    create_build_bar(total as u64)
                };
                pb.set_message(format!("target {target}"));
                bar = Some(pb);
            }
            BuildEvent::LevelStarted { index, packages } => {
                if let Some(bar) = &bar {
                    bar.set_message(format!("level {index}: {}", packages.join(", ")));
                }
            }
            BuildEvent::Started { package } => {
                if let Some(bar) = &bar {
                    bar.set_message(format!("building {package}"));
                }
            }
            BuildEvent::Skipped { package } => {
                print(&bar, format!("{} {package} unchanged", status::INFO));
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
            }
            BuildEvent::Built { package, elapsed } => {
                print(
                    &bar,
                    format!("{} {package} ({:.1}s)", status::SUCCESS, elapsed.as_secs_f64()),
                );
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
            }
            BuildEvent::Failed { package, reason } => {
                print(&bar, format!("{} {package}: {reason}", status::ERROR));
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
            }
        }
    }

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
