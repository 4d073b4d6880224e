//! Core business logic module
//!
//! # Submodules
//!
//! - [`manifest`] - Package descriptor (package.json) parsing
//! - [`graph`] - Workspace discovery and the dependency graph
//! - [`resolver`] - Build ordering, impact propagation and level planning
//! - [`peer`] - Peer dependency range validation
//! - [`cache`] - Content digests and the build cache
//! - [`builder`] - Build orchestration
//! - [`dev`] - Watch, rebuild and live-reload sessions
//! - [`config`] - Layered configuration files

pub mod builder;
pub mod cache;
pub mod config;
pub mod dev;
pub mod graph;
pub mod manifest;
pub mod peer;
pub mod resolver;
