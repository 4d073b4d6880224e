//! Configuration management
//!
//! Settings come from two optional TOML files: the global `config.toml` in
//! the config directory and `monoforge.toml` in the project directory. Every
//! field is optional; project values override global ones, and command-line
//! flags override both.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::ConfigError;
use crate::infra::dirs::MonoforgeDirs;

/// Merged configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Workspace layout
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development session settings
    #[serde(default)]
    pub dev: DevConfig,

    /// Build cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Workspace layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory holding one subdirectory per package
    pub packages_dir: Option<PathBuf>,
}

/// Build settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Shell command run in each package directory
    pub command: Option<String>,

    /// Maximum concurrent builds within a level
    pub jobs: Option<usize>,
}

/// Development session settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevConfig {
    /// Shell command run in the entry package directory
    pub command: Option<String>,

    /// Live-reload server host
    pub host: Option<String>,

    /// Live-reload server port
    pub port: Option<u16>,

    /// Change coalescing window in milliseconds
    pub debounce_ms: Option<u64>,
}

/// Build cache settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Keep the cache between invocations
    pub persist: Option<bool>,

    /// Cache file, relative to the project directory
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific path
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse` if the file exists
    /// but cannot be read or is not valid TOML.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load the global file, then the project file on top of it
    ///
    /// # Errors
    ///
    /// Returns any load error from either file, or `ConfigError::Invalid` if
    /// the merged values are out of range.
    pub fn load_layered(project_dir: &Path, dirs: &MonoforgeDirs) -> Result<Self, ConfigError> {
        let global_path = dirs.global_config_path();
        let project_path = project_dir.join(defaults::CONFIG_FILE);
        tracing::debug!(
            "Loading configuration from {} and {}",
            global_path.display(),
            project_path.display()
        );

        let global = Self::load_from_path(&global_path)?;
        let config = global.merge(Self::load_from_path(&project_path)?);
        config.validate()?;
        Ok(config)
    }

    /// Overlay `other` on top of `self`; fields set in `other` win
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            workspace: WorkspaceConfig {
                packages_dir: other.workspace.packages_dir.or(self.workspace.packages_dir),
            },
            build: BuildConfig {
                command: other.build.command.or(self.build.command),
                jobs: other.build.jobs.or(self.build.jobs),
            },
            dev: DevConfig {
                command: other.dev.command.or(self.dev.command),
                host: other.dev.host.or(self.dev.host),
                port: other.dev.port.or(self.dev.port),
                debounce_ms: other.dev.debounce_ms.or(self.dev.debounce_ms),
            },
            cache: CacheConfig {
                persist: other.cache.persist.or(self.cache.persist),
                path: other.cache.path.or(self.cache.path),
            },
        }
    }

    /// Reject values no run could use
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.build.jobs == Some(0) {
            return Err(ConfigError::Invalid {
                message: "build.jobs must be at least 1".to_string(),
            });
        }

        let commands = [
            ("build.command", &self.build.command),
            ("dev.command", &self.dev.command),
        ];
        for (field, command) in commands {
            if command.as_deref().is_some_and(|c| c.trim().is_empty()) {
                return Err(ConfigError::Invalid {
                    message: format!("{field} must not be empty"),
                });
            }
        }

        if self.dev.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                message: "dev.host must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Effective workspace root, resolved against `project_dir`
    #[must_use]
    pub fn packages_dir(&self, project_dir: &Path) -> PathBuf {
        let dir = self
            .workspace
            .packages_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_PACKAGES_DIR));
        project_dir.join(dir)
    }

    /// Effective build command
    #[must_use]
    pub fn build_command(&self) -> &str {
        self.build
            .command
            .as_deref()
            .unwrap_or(defaults::DEFAULT_BUILD_COMMAND)
    }

    /// Effective number of build jobs (defaults to the CPU count)
    #[must_use]
    pub fn build_jobs(&self) -> usize {
        self.build.jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Effective dev command
    #[must_use]
    pub fn dev_command(&self) -> &str {
        self.dev
            .command
            .as_deref()
            .unwrap_or(defaults::DEFAULT_DEV_COMMAND)
    }

    /// Effective live-reload host
    #[must_use]
    pub fn dev_host(&self) -> &str {
        self.dev
            .host
            .as_deref()
            .unwrap_or(defaults::DEFAULT_RELOAD_HOST)
    }

    /// Effective live-reload port
    #[must_use]
    pub fn dev_port(&self) -> u16 {
        self.dev.port.unwrap_or(defaults::DEFAULT_RELOAD_PORT)
    }

    /// Effective change coalescing window
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.dev.debounce_ms.unwrap_or(defaults::DEFAULT_DEBOUNCE_MS))
    }

    /// Whether the cache is kept between invocations
    #[must_use]
    pub fn cache_persist(&self) -> bool {
        self.cache.persist.unwrap_or(true)
    }

    /// Effective cache file, resolved against `project_dir`
    #[must_use]
    pub fn cache_path(&self, project_dir: &Path) -> PathBuf {
        let path = self
            .cache
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_CACHE_PATH));
        project_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let project = Path::new("/project");

        assert_eq!(config.packages_dir(project), PathBuf::from("/project/packages"));
        assert_eq!(config.build_command(), "pnpm run build");
        assert!(config.build_jobs() >= 1);
        assert_eq!(config.dev_command(), "pnpm run dev");
        assert_eq!(config.dev_host(), "127.0.0.1");
        assert_eq!(config.dev_port(), 4000);
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert!(config.cache_persist());
        assert_eq!(
            config.cache_path(project),
            PathBuf::from("/project/.monoforge/cache.json")
        );
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from_path(&temp_dir.path().join("monoforge.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("monoforge.toml");
        fs::write(
            &path,
            r#"
[workspace]
packages_dir = "libs"

[build]
command = "npm run build"
jobs = 2

[dev]
port = 4100
debounce_ms = 250

[cache]
persist = false
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.packages_dir(Path::new("/p")), PathBuf::from("/p/libs"));
        assert_eq!(config.build_command(), "npm run build");
        assert_eq!(config.build_jobs(), 2);
        assert_eq!(config.dev_port(), 4100);
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert!(!config.cache_persist());
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("monoforge.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_project_overrides_global() {
        let global_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        fs::write(
            global_dir.path().join("config.toml"),
            "[build]\ncommand = \"make\"\njobs = 3\n\n[dev]\nhost = \"0.0.0.0\"\n",
        )
        .unwrap();
        fs::write(
            project_dir.path().join("monoforge.toml"),
            "[build]\ncommand = \"yarn build\"\n",
        )
        .unwrap();

        let dirs = MonoforgeDirs::with_config_dir(global_dir.path());
        let config = Config::load_layered(project_dir.path(), &dirs).unwrap();

        assert_eq!(config.build_command(), "yarn build");
        assert_eq!(config.build_jobs(), 3);
        assert_eq!(config.dev_host(), "0.0.0.0");
        assert_eq!(config.dev_port(), 4000);
    }

    #[test]
    fn test_zero_jobs_is_rejected() {
        let project_dir = TempDir::new().unwrap();
        let global_dir = TempDir::new().unwrap();
        fs::write(project_dir.path().join("monoforge.toml"), "[build]\njobs = 0\n").unwrap();

        let dirs = MonoforgeDirs::with_config_dir(global_dir.path());
        let err = Config::load_layered(project_dir.path(), &dirs).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("build.jobs"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let config = Config {
            dev: DevConfig {
                command: Some("  ".to_string()),
                ..DevConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_port_fails_to_parse() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("monoforge.toml");
        fs::write(&path, "[dev]\nport = 70000\n").unwrap();

        assert!(Config::load_from_path(&path).is_err());
    }
}
