//! File system watching
//!
//! Watches package directories recursively and forwards changed paths to the
//! dev session. Paths under ignored directories and ignored file names never
//! reach the channel, nor do access-only events.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use crate::core::cache::DigestPolicy;
use crate::error::DevError;

/// Recursive watch over a set of package directories
pub struct WorkspaceWatcher {
    watcher: Option<RecommendedWatcher>,
    roots: Vec<PathBuf>,
}

impl std::fmt::Debug for WorkspaceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceWatcher")
            .field("roots", &self.roots)
            .field("active", &self.watcher.is_some())
            .finish()
    }
}

impl WorkspaceWatcher {
    /// Watch every directory in `roots`, sending relevant paths to `changes`
    ///
    /// # Errors
    ///
    /// Returns `DevError::Watch` if the watcher cannot be created or a root
    /// cannot be watched. Roots watched before the failure are released.
    pub fn start(
        roots: &[PathBuf],
        policy: Arc<DigestPolicy>,
        changes: UnboundedSender<PathBuf>,
    ) -> Result<Self, DevError> {
        let filter_roots = roots.to_vec();
        let handler = move |result: Result<Event, notify::Error>| match result {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                for path in event.paths {
                    if is_relevant(&path, &filter_roots, &policy) {
                        // Receiver gone means the session is shutting down
                        let _ = changes.send(path);
                    }
                }
            }
            Err(e) => tracing::warn!("File watcher error: {e}"),
        };

        let mut watcher = RecommendedWatcher::new(handler, NotifyConfig::default()).map_err(|e| {
            DevError::Watch {
                path: roots.first().cloned().unwrap_or_default(),
                error: e.to_string(),
            }
        })?;

        for root in roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| DevError::Watch {
                    path: root.clone(),
                    error: e.to_string(),
                })?;
            tracing::debug!("Watching {}", root.display());
        }

        Ok(Self {
            watcher: Some(watcher),
            roots: roots.to_vec(),
        })
    }

    /// Watched directories
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Release every watch
    ///
    /// All roots are unwatched even if one fails; the first failure is returned.
    pub fn stop(&mut self) -> Result<(), DevError> {
        let Some(mut watcher) = self.watcher.take() else {
            return Ok(());
        };

        let mut first_error = None;
        for root in &self.roots {
            if let Err(e) = watcher.unwatch(root) {
                tracing::debug!("Failed to unwatch {}: {e}", root.display());
                first_error.get_or_insert(DevError::Watch {
                    path: root.clone(),
                    error: e.to_string(),
                });
            }
        }
        drop(watcher);
        tracing::debug!("Stopped watching {} directories", self.roots.len());

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        if self.watcher.is_some() {
            let _ = self.stop();
        }
    }
}

fn is_relevant(path: &Path, roots: &[PathBuf], policy: &DigestPolicy) -> bool {
    roots
        .iter()
        .filter_map(|root| path.strip_prefix(root).ok())
        .min_by_key(|relative| relative.components().count())
        .is_some_and(|relative| !policy.is_ignored_path(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[test]
    fn test_is_relevant_filters_ignored_paths() {
        let policy = DigestPolicy::default();
        let roots = vec![PathBuf::from("/ws/app"), PathBuf::from("/ws/lib")];

        assert!(is_relevant(Path::new("/ws/app/src/index.ts"), &roots, &policy));
        assert!(is_relevant(Path::new("/ws/lib/package.json"), &roots, &policy));
        assert!(!is_relevant(Path::new("/ws/app/node_modules/x.js"), &roots, &policy));
        assert!(!is_relevant(Path::new("/ws/lib/dist/index.js"), &roots, &policy));
        assert!(!is_relevant(Path::new("/ws/lib/src/.DS_Store"), &roots, &policy));
        assert!(!is_relevant(Path::new("/elsewhere/index.ts"), &roots, &policy));
    }

    #[test]
    fn test_ignored_name_above_root_does_not_matter() {
        let policy = DigestPolicy::default();
        let roots = vec![PathBuf::from("/home/dist/ws/app")];
        assert!(is_relevant(Path::new("/home/dist/ws/app/src/a.ts"), &roots, &policy));
    }

    #[tokio::test]
    async fn test_watcher_forwards_changes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules")).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let policy = Arc::new(DigestPolicy::default());
        let mut watcher = WorkspaceWatcher::start(&[root.clone()], policy, tx).unwrap();
        assert_eq!(watcher.roots(), &[root.clone()]);

        std::fs::write(root.join("node_modules/ignored.js"), "x").unwrap();
        std::fs::write(root.join("src/index.ts"), "export {}").unwrap();

        let path = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no change event")
            .unwrap();
        assert!(path.starts_with(root.join("src")), "{}", path.display());

        watcher.stop().unwrap();
        watcher.stop().unwrap();
    }

    #[test]
    fn test_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = WorkspaceWatcher::start(
            &[dir.path().join("missing")],
            Arc::new(DigestPolicy::default()),
            tx,
        )
        .unwrap_err();
        assert!(matches!(err, DevError::Watch { .. }));
    }
}
