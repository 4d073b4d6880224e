//! Build orchestration logic
//!
//! Builds a target package and everything downstream of it, one level at a
//! time. Packages within a level build concurrently (bounded by `jobs`); a
//! level must finish completely before the next one starts. Packages whose
//! digest matches the cache are skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;

use crate::core::cache::{digest_directory, ContentCache};
use crate::core::graph::DependencyGraph;
use crate::core::resolver::BuildLevel;
use crate::error::{BuildError, PackageFailure, ResolverError};
use crate::infra::process::BuildRunner;

/// Progress notification emitted during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// The plan is known
    Planned { target: String, total: usize },
    /// A level is about to build
    LevelStarted { index: usize, packages: Vec<String> },
    /// A package's build command started
    Started { package: String },
    /// A package was unchanged and not rebuilt
    Skipped { package: String },
    /// A package built successfully
    Built { package: String, elapsed: Duration },
    /// A package's build failed
    Failed { package: String, reason: String },
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Requested target
    pub target: String,
    /// Levels that were processed
    pub levels: Vec<BuildLevel>,
    /// Packages whose build command ran, in level order
    pub built: Vec<String>,
    /// Packages skipped as unchanged, in level order
    pub skipped: Vec<String>,
}

enum PackageOutcome {
    Built,
    Skipped,
}

/// Level-by-level build driver
pub struct BuildOrchestrator {
    runner: Arc<dyn BuildRunner>,
    cache: ContentCache,
    jobs: usize,
    events: Option<UnboundedSender<BuildEvent>>,
}

impl BuildOrchestrator {
    /// Create an orchestrator with an empty cache and one job per CPU
    pub fn new(runner: Arc<dyn BuildRunner>) -> Self {
        Self {
            runner,
            cache: ContentCache::new(),
            jobs: num_cpus::get().max(1),
            events: None,
        }
    }

    /// Use an existing cache
    #[must_use]
    pub fn with_cache(mut self, cache: ContentCache) -> Self {
        self.cache = cache;
        self
    }

    /// Limit concurrent builds within a level (at least 1)
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Send progress events to `events`
    #[must_use]
    pub fn with_events(mut self, events: UnboundedSender<BuildEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// The build cache
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Maximum concurrent builds within a level
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Build `target` and every package that depends on it
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Resolver` for an unknown target or a cycle, and
    /// `BuildError::Aborted` when a level has failures. Later levels are not
    /// started in that case.
    pub async fn run(
        &self,
        graph: &DependencyGraph,
        target: &str,
    ) -> Result<BuildReport, BuildError> {
        let plan = graph.plan(target)?;
        tracing::info!("Build order: {}", plan.order.join(" → "));
        self.emit(BuildEvent::Planned {
            target: plan.target.clone(),
            total: plan.order.len(),
        });

        let mut report = BuildReport {
            target: plan.target.clone(),
            levels: plan.levels.clone(),
            built: Vec::new(),
            skipped: Vec::new(),
        };

        for level in &plan.levels {
            tracing::debug!("Level {}: {}", level.index, level.packages.join(", "));
            self.emit(BuildEvent::LevelStarted {
                index: level.index,
                packages: level.packages.clone(),
            });

            // Boxed up front; the run future must stay Send
            let pending: Vec<BoxFuture<'_, (&str, Result<PackageOutcome, BuildError>)>> = level
                .packages
                .iter()
                .map(|name| {
                    Box::pin(async move { (name.as_str(), self.build_package(graph, name).await) })
                        as BoxFuture<'_, _>
                })
                .collect();
            let mut outcomes: Vec<(&str, Result<PackageOutcome, BuildError>)> =
                stream::iter(pending)
                    .buffer_unordered(self.jobs)
                    .collect()
                    .await;
            outcomes.sort_by(|a, b| a.0.cmp(b.0));

            let mut failures = Vec::new();
            for (name, outcome) in outcomes {
                match outcome {
                    Ok(PackageOutcome::Built) => report.built.push(name.to_string()),
                    Ok(PackageOutcome::Skipped) => report.skipped.push(name.to_string()),
                    Err(e) => failures.push(PackageFailure {
                        package: name.to_string(),
                        reason: failure_reason(&e),
                    }),
                }
            }

            if !failures.is_empty() {
                let not_attempted: Vec<String> = plan.levels[level.index + 1..]
                    .iter()
                    .flat_map(|l| l.packages.iter().cloned())
                    .collect();
                if !not_attempted.is_empty() {
                    tracing::warn!("Not attempted: {}", not_attempted.join(", "));
                }
                return Err(BuildError::Aborted {
                    level: level.index,
                    failures,
                    not_attempted,
                });
            }
        }

        tracing::info!(
            "Finished '{}': {} built, {} unchanged",
            report.target,
            report.built.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn build_package(
        &self,
        graph: &DependencyGraph,
        name: &str,
    ) -> Result<PackageOutcome, BuildError> {
        let node = graph.node(name).ok_or_else(|| ResolverError::UnknownPackage {
            name: name.to_string(),
        })?;

        let directory = node.directory.clone();
        let policy = self.cache.policy();
        let digest = tokio::task::spawn_blocking(move || digest_directory(&directory, &policy))
            .await
            .map_err(|e| BuildError::Digest {
                package: name.to_string(),
                error: e.to_string(),
            })?;

        if self.cache.is_unchanged(name, &digest) {
            tracing::info!("Skipping {name} (unchanged)");
            self.emit(BuildEvent::Skipped {
                package: name.to_string(),
            });
            return Ok(PackageOutcome::Skipped);
        }

        tracing::info!("Building: {name}");
        self.emit(BuildEvent::Started {
            package: name.to_string(),
        });
        let started = Instant::now();

        match self.runner.run(node).await {
            Ok(()) => {
                self.cache.record(name, &digest);
                self.emit(BuildEvent::Built {
                    package: name.to_string(),
                    elapsed: started.elapsed(),
                });
                Ok(PackageOutcome::Built)
            }
            Err(e) => {
                self.cache.invalidate(name);
                tracing::error!("{e}");
                self.emit(BuildEvent::Failed {
                    package: name.to_string(),
                    reason: failure_reason(&e),
                });
                Err(e)
            }
        }
    }

    fn emit(&self, event: BuildEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = events.send(event);
        }
    }
}

fn failure_reason(error: &BuildError) -> String {
    match error {
        BuildError::CommandFailed { reason, .. } => reason.clone(),
        BuildError::Spawn { error, .. } | BuildError::Digest { error, .. } => error.clone(),
        other => other.to_string(),
    }
}
