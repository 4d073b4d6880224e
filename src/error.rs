//! Error types for monoforge
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Workspace scanning errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// Workspace root could not be resolved or listed
    #[error("Failed to read workspace root '{path}': {error}")]
    RootUnreadable { path: PathBuf, error: String },

    /// A package descriptor could not be read or parsed
    #[error("Failed to parse package descriptor '{path}': {error}")]
    DescriptorParse { path: PathBuf, error: String },
}

/// Dependency resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// The graph has no total order
    #[error(
        "Cyclic dependency detected: {}. Unbuildable packages: {}",
        cycle.join(" -> "),
        unresolved.join(", ")
    )]
    CyclicDependency {
        cycle: Vec<String>,
        unresolved: Vec<String>,
    },

    /// Target or entry package is not part of the workspace
    #[error("Package '{name}' not found in workspace")]
    UnknownPackage { name: String },
}

/// A package whose build did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFailure {
    /// Package name
    pub package: String,
    /// Human-readable cause
    pub reason: String,
}

/// Build errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build command exited unsuccessfully
    #[error("Build failed for package '{package}': {reason}")]
    CommandFailed { package: String, reason: String },

    /// Build command could not be started
    #[error("Failed to launch build command for package '{package}': {error}")]
    Spawn { package: String, error: String },

    /// Digest computation did not complete
    #[error("Failed to compute digest for package '{package}': {error}")]
    Digest { package: String, error: String },

    /// A level failed and the remaining levels were not scheduled
    #[error(
        "Build aborted at level {level}: {} failed, {} package(s) not attempted",
        failed_names(failures),
        not_attempted.len()
    )]
    Aborted {
        level: usize,
        failures: Vec<PackageFailure>,
        not_attempted: Vec<String>,
    },

    /// Planning error
    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

fn failed_names(failures: &[PackageFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("'{}'", f.package))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build cache persistence errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to read the cache file
    #[error("Failed to read cache file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Cache file is not valid JSON
    #[error("Failed to parse cache file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Failed to write the cache file
    #[error("Failed to write cache file '{path}': {error}")]
    Write { path: PathBuf, error: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// A value is out of range
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Development session errors
#[derive(Error, Debug)]
pub enum DevError {
    /// Dev process could not be started
    #[error("Failed to start dev process for '{package}': {error}")]
    DevProcess { package: String, error: String },

    /// Live-reload server could not bind
    #[error("Failed to bind live-reload server on {address}: {error}")]
    Bind { address: String, error: String },

    /// File watch could not be installed or removed
    #[error("Failed to watch '{path}': {error}")]
    Watch { path: PathBuf, error: String },

    /// Live-reload server task failed
    #[error("Live-reload server error: {error}")]
    Server { error: String },

    /// Entry package resolution
    #[error(transparent)]
    Resolver(#[from] ResolverError),
}
