//! Development session
//!
//! Runs the entry package's dev server, watches the entry and everything it
//! depends on, rebuilds whatever a change affects and tells connected browsers
//! to reload. Resources are acquired in order (dev process, live-reload
//! server, file watches) and released by a single teardown.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config::defaults;
use crate::core::builder::BuildOrchestrator;
use crate::core::graph::DependencyGraph;
use crate::error::{DevError, ResolverError};
use crate::infra::process::DevProcess;
use crate::infra::reload::LiveReloadServer;
use crate::infra::signal::shutdown_signal;
use crate::infra::watch::WorkspaceWatcher;

/// How a successful rebuild reaches the browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReloadMode {
    /// The dev server resolves workspace sources directly; its HMR applies changes
    Alias,
    /// The dev server consumes built output; connected clients get a reload message
    #[default]
    Dist,
}

impl fmt::Display for ReloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alias => write!(f, "alias (HMR)"),
            Self::Dist => write!(f, "dist (full reload)"),
        }
    }
}

/// Development session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevOptions {
    /// Command started in the entry package directory
    pub command: String,
    /// Live-reload server host
    pub host: String,
    /// Live-reload server port (0 picks a free one)
    pub port: u16,
    /// Window in which change events are coalesced
    pub debounce: Duration,
    /// Reload delivery
    pub mode: ReloadMode,
    /// Time the dev process gets to exit before it is killed
    pub shutdown_grace: Duration,
}

impl Default for DevOptions {
    fn default() -> Self {
        Self {
            command: defaults::DEFAULT_DEV_COMMAND.to_string(),
            host: defaults::DEFAULT_RELOAD_HOST.to_string(),
            port: defaults::DEFAULT_RELOAD_PORT,
            debounce: Duration::from_millis(defaults::DEFAULT_DEBOUNCE_MS),
            mode: ReloadMode::default(),
            shutdown_grace: Duration::from_millis(defaults::DEV_SHUTDOWN_GRACE_MS),
        }
    }
}

/// A development session that has not acquired any resources yet
pub struct DevSession {
    graph: DependencyGraph,
    orchestrator: Arc<BuildOrchestrator>,
    options: DevOptions,
}

impl DevSession {
    /// Create a session over `graph`
    pub fn new(
        graph: DependencyGraph,
        orchestrator: Arc<BuildOrchestrator>,
        options: DevOptions,
    ) -> Self {
        Self {
            graph,
            orchestrator,
            options,
        }
    }

    /// Acquire the session's resources for `entry`
    ///
    /// Anything acquired before a failing step is released again.
    ///
    /// # Errors
    ///
    /// Returns `DevError::Resolver` for an unknown entry, and the error of the
    /// first step that fails otherwise.
    pub async fn launch(self, entry: &str) -> Result<RunningSession, DevError> {
        let node = self
            .graph
            .node(entry)
            .ok_or_else(|| ResolverError::UnknownPackage {
                name: entry.to_string(),
            })?;
        let watched: Vec<String> = self.graph.dependency_closure(entry)?;
        let roots: Vec<PathBuf> = watched
            .iter()
            .filter_map(|name| self.graph.node(name))
            .map(|node| node.directory.clone())
            .collect();

        tracing::info!("Starting dev mode for {entry} ({})", self.options.mode);
        let mut dev_process = DevProcess::spawn(node, &self.options.command)?;

        let bound = LiveReloadServer::bind(&self.options.host, self.options.port).await;
        let mut server = match bound {
            Ok(server) => server,
            Err(e) => {
                dev_process.terminate(self.options.shutdown_grace).await;
                return Err(e);
            }
        };

        let (changes_tx, changes) = mpsc::unbounded_channel();
        let policy = self.orchestrator.cache().policy();
        let watcher = match WorkspaceWatcher::start(&roots, policy, changes_tx) {
            Ok(watcher) => watcher,
            Err(e) => {
                dev_process.terminate(self.options.shutdown_grace).await;
                if let Err(close_error) = server.close().await {
                    tracing::warn!("{close_error}");
                }
                return Err(e);
            }
        };
        tracing::info!("Watching dependencies: {}", watched.join(", "));

        Ok(RunningSession {
            entry: entry.to_string(),
            graph: self.graph,
            orchestrator: self.orchestrator,
            options: self.options,
            dev_process,
            server,
            watcher,
            changes,
        })
    }

    /// Launch `entry` and serve until Ctrl-C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns any launch error.
    pub async fn start(self, entry: &str) -> Result<(), DevError> {
        self.launch(entry).await?.serve(shutdown_signal()).await
    }
}

/// A development session holding its dev process, server and watches
pub struct RunningSession {
    entry: String,
    graph: DependencyGraph,
    orchestrator: Arc<BuildOrchestrator>,
    options: DevOptions,
    dev_process: DevProcess,
    server: LiveReloadServer,
    watcher: WorkspaceWatcher,
    changes: UnboundedReceiver<PathBuf>,
}

impl fmt::Debug for RunningSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningSession")
            .field("entry", &self.entry)
            .field("mode", &self.options.mode)
            .field("reload_addr", &self.server.local_addr())
            .field("watched_roots", &self.watcher.roots())
            .finish_non_exhaustive()
    }
}

impl RunningSession {
    /// Entry package
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Address of the live-reload server
    pub fn reload_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Live-reload clients past their handshake
    pub fn connected_clients(&self) -> usize {
        self.server.connected_clients()
    }

    /// Watched package directories
    pub fn watched_roots(&self) -> &[PathBuf] {
        self.watcher.roots()
    }

    /// Rebuild on change until `shutdown` resolves or the dev process exits
    ///
    /// Build failures are logged and the session keeps watching. Teardown runs
    /// in every case.
    ///
    /// # Errors
    ///
    /// Returns `DevError::Server` if the live-reload server does not shut
    /// down cleanly.
    pub async fn serve<F>(mut self, shutdown: F) -> Result<(), DevError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        'session: loop {
            let mut batch: BTreeMap<String, BTreeSet<PathBuf>> = BTreeMap::new();

            tokio::select! {
                () = &mut shutdown => break 'session,
                status = self.dev_process.wait() => {
                    match status {
                        Ok(status) => {
                            tracing::warn!("Dev process for '{}' exited ({status})", self.entry);
                        }
                        Err(e) => {
                            tracing::warn!("Lost track of dev process for '{}': {e}", self.entry);
                        }
                    }
                    break 'session;
                }
                changed = self.changes.recv() => match changed {
                    Some(path) => self.attribute(&mut batch, path),
                    None => break 'session,
                },
            }

            // Coalesce everything that arrives within the window, including
            // events queued while the previous batch was rebuilding
            let window = tokio::time::sleep(self.options.debounce);
            tokio::pin!(window);
            loop {
                tokio::select! {
                    () = &mut shutdown => break 'session,
                    () = &mut window => break,
                    changed = self.changes.recv() => match changed {
                        Some(path) => self.attribute(&mut batch, path),
                        None => break,
                    },
                }
            }

            let mut covered: HashSet<String> = HashSet::new();
            for (target, paths) in batch {
                if covered.contains(&target) {
                    tracing::debug!("{target} was already rebuilt in this batch");
                    continue;
                }
                for path in &paths {
                    tracing::info!("[{target}] {} changed", path.display());
                }

                let result = tokio::select! {
                    () = &mut shutdown => {
                        tracing::info!("Shutdown requested while rebuilding {target}");
                        break 'session;
                    }
                    result = self.orchestrator.run(&self.graph, &target) => result,
                };

                match result {
                    Ok(report) => {
                        if report.built.is_empty() {
                            tracing::info!("[{target}] nothing to rebuild");
                        }
                        covered.extend(report.built);
                        covered.extend(report.skipped);
                        self.deliver_reload(&target);
                    }
                    Err(e) => tracing::error!("Rebuild after change in {target} failed: {e}"),
                }
            }
        }

        self.teardown().await
    }

    fn attribute(&self, batch: &mut BTreeMap<String, BTreeSet<PathBuf>>, path: PathBuf) {
        match self.graph.owner_of(&path) {
            Some(owner) => {
                batch.entry(owner.name.clone()).or_default().insert(path);
            }
            None => tracing::debug!("Ignoring change outside any package: {}", path.display()),
        }
    }

    fn deliver_reload(&self, target: &str) {
        match self.options.mode {
            ReloadMode::Dist => {
                let clients = self.server.broadcast_reload();
                tracing::info!("[{target}] reload sent to {clients} client(s)");
            }
            ReloadMode::Alias => {
                tracing::info!("[{target}] up to date, the dev server's HMR applies the change");
            }
        }
    }

    async fn teardown(&mut self) -> Result<(), DevError> {
        tracing::info!("Stopping dev mode for {}", self.entry);

        if let Err(e) = self.watcher.stop() {
            tracing::warn!("{e}");
        }
        self.dev_process.terminate(self.options.shutdown_grace).await;
        let closed = self.server.close().await;
        if let Err(e) = &closed {
            tracing::warn!("{e}");
        }
        closed
    }
}
