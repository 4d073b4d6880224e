//! Platform-specific directory management
//!
//! Locates the user-wide configuration directory. Follows the XDG Base
//! Directory Specification on Linux and standard locations on macOS and
//! Windows. `MONOFORGE_CONFIG_DIR` overrides the platform default.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::defaults;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "MONOFORGE_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "monoforge";

/// Platform-specific directory provider for monoforge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonoforgeDirs {
    config_dir: PathBuf,
}

impl MonoforgeDirs {
    /// Resolve directories from the environment, then platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Use an explicit config directory
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/monoforge` or `~/.config/monoforge`
    /// - macOS: `~/Library/Application Support/monoforge`
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join(defaults::GLOBAL_CONFIG_FILE)
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                // Fallback to home directory
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for MonoforgeDirs {
    fn default() -> Self {
        Self::new()
    }
}
