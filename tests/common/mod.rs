//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Test workspace context
///
/// A temporary project directory with a `packages/` workspace and an isolated
/// global config directory.
pub struct TestWorkspace {
    /// Temporary directory for the project
    pub dir: TempDir,
    /// Global config directory handed to the binary
    pub config_dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        let workspace = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            config_dir: TempDir::new().expect("Failed to create config directory"),
        };
        std::fs::create_dir_all(workspace.packages_dir()).expect("Failed to create packages dir");
        workspace
    }

    /// Get the path to the project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Get the path to the packages directory
    pub fn packages_dir(&self) -> PathBuf {
        self.dir.path().join("packages")
    }

    /// Add a package with internal dependencies
    pub fn add_package(&self, name: &str, dependencies: &[&str]) {
        self.add_package_with_peers(name, dependencies, &[]);
    }

    /// Add a package with internal dependencies and peer ranges
    pub fn add_package_with_peers(&self, name: &str, dependencies: &[&str], peers: &[(&str, &str)]) {
        let deps: serde_json::Map<String, serde_json::Value> = dependencies
            .iter()
            .map(|d| ((*d).to_string(), serde_json::Value::from("workspace:*")))
            .collect();
        let peer_deps: serde_json::Map<String, serde_json::Value> = peers
            .iter()
            .map(|(d, r)| ((*d).to_string(), serde_json::Value::from(*r)))
            .collect();
        let descriptor = serde_json::json!({
            "name": name,
            "version": "1.0.0",
            "dependencies": deps,
            "peerDependencies": peer_deps,
        });

        let dir = self.packages_dir().join(name);
        std::fs::create_dir_all(dir.join("src")).expect("Failed to create package dir");
        std::fs::write(
            dir.join("package.json"),
            serde_json::to_string_pretty(&descriptor).expect("Failed to encode descriptor"),
        )
        .expect("Failed to write descriptor");
        std::fs::write(dir.join("src/index.ts"), format!("export const name = '{name}';\n"))
            .expect("Failed to write source");
    }

    /// Write `monoforge.toml`
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.dir.path().join("monoforge.toml"), content)
            .expect("Failed to write config");
    }

    /// Create a file relative to the project directory
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Read a file relative to the project directory, empty if missing
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).unwrap_or_default()
    }

    /// Check if a file exists relative to the project directory
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Run the monoforge binary in the project directory
    pub fn run(&self, args: &[&str]) -> Output {
        monoforge_command(self.dir.path(), self.config_dir.path())
            .args(args)
            .output()
            .expect("Failed to execute monoforge")
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// A monoforge command isolated from the caller's environment
pub fn monoforge_command(project_dir: &Path, config_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_monoforge"));
    cmd.current_dir(project_dir)
        .env("MONOFORGE_CONFIG_DIR", config_dir)
        .env_remove("MONOFORGE_ROOT")
        .env_remove("RUST_LOG");
    cmd
}

/// Stdout as a string
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr as a string
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
