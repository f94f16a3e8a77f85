//! # Ouro Utilities
//!
//! Shared utilities for the ouro workspace.
//!
//! This crate provides common functionality used across the workspace,
//! most importantly a logging setup built on `tracing` that keeps
//! diagnostics away from the host process's stdout.

pub mod logging;

// Re-export the logging entry points for convenience
pub use logging::{LogConfig, LogStyle, init_logging};
pub use tracing::{debug, error, info, trace, warn};
