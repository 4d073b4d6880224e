//! Infrastructure layer
//!
//! Handles all side effects: external processes, file watching, sockets and
//! signals.

pub mod dirs;
pub mod process;
pub mod reload;
pub mod signal;
pub mod watch;
