//! Monoforge - monorepo build orchestrator
//!
//! This library discovers the packages of a workspace, orders them by their
//! internal dependencies, rebuilds only what changed and drives a live
//! development loop that notifies browser clients after each rebuild.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Graph, scheduling, caching and session logic
//! - [`infra`] - Infrastructure layer (processes, file watching, sockets)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
