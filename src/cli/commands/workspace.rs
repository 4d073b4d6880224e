//! Shared loading for commands that operate on a workspace

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::cache::{ContentCache, DigestPolicy};
use crate::core::config::Config;
use crate::core::graph::{load_workspace, DependencyGraph};
use crate::infra::dirs::MonoforgeDirs;

/// Configuration and paths resolved for the current invocation
#[derive(Debug)]
pub struct WorkspaceContext {
    /// Directory the command was started from
    pub project_dir: PathBuf,
    /// Layered configuration
    pub config: Config,
    /// Directory whose subdirectories are the packages
    pub root: PathBuf,
}

impl WorkspaceContext {
    /// Load configuration for `project_dir`
    ///
    /// `root` overrides the configured packages directory.
    pub fn load(project_dir: &Path, root: Option<&Path>) -> Result<Self> {
        let config = Config::load_layered(project_dir, &MonoforgeDirs::new())
            .context("Failed to load configuration")?;
        let root = match root {
            Some(root) => project_dir.join(root),
            None => config.packages_dir(project_dir),
        };
        tracing::debug!("Workspace root: {}", root.display());

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config,
            root,
        })
    }

    /// Discover the workspace packages
    pub fn graph(&self) -> Result<DependencyGraph> {
        load_workspace(&self.root)
            .with_context(|| format!("Failed to load workspace at {}", self.root.display()))
    }

    /// Location of the persisted cache
    pub fn cache_path(&self) -> PathBuf {
        self.config.cache_path(&self.project_dir)
    }

    /// Load the persisted cache, or an empty one when persistence is off
    pub fn load_cache(&self) -> Result<ContentCache> {
        if !self.config.cache_persist() {
            return Ok(ContentCache::new());
        }
        let path = self.cache_path();
        ContentCache::load(&path, DigestPolicy::default())
            .with_context(|| format!("Failed to read cache {}", path.display()))
    }

    /// Persist `cache` if persistence is on
    pub fn save_cache(&self, cache: &ContentCache) -> Result<()> {
        if !self.config.cache_persist() {
            return Ok(());
        }
        let path = self.cache_path();
        cache
            .save(&path)
            .with_context(|| format!("Failed to write cache {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_root_override_is_relative_to_project() {
        let temp = TempDir::new().unwrap();
        let context = WorkspaceContext::load(temp.path(), Some(Path::new("libs"))).unwrap();
        assert_eq!(context.root, temp.path().join("libs"));
    }

    #[test]
    fn test_default_root_is_packages_dir() {
        let temp = TempDir::new().unwrap();
        let context = WorkspaceContext::load(temp.path(), None).unwrap();
        assert_eq!(context.root, temp.path().join("packages"));
    }

    #[test]
    fn test_cache_round_trips_through_project() {
        let temp = TempDir::new().unwrap();
        let context = WorkspaceContext::load(temp.path(), None).unwrap();

        let cache = context.load_cache().unwrap();
        cache.record("a", "digest");
        context.save_cache(&cache).unwrap();

        let reloaded = context.load_cache().unwrap();
        assert_eq!(reloaded.get("a").as_deref(), Some("digest"));
    }
}
