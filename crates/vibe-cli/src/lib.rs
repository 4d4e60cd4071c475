//! Vibe CLI - the `vibe` binary
//!
//! Wires the workspace together for terminal use:
//! - [`config`]: `vibe.toml` loading and environment overrides
//! - [`logging`]: tracing subscriber setup
//! - [`cli`]: argument definitions
//! - [`commands`]: handlers driving an editing session and the store

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use cli::cli;
pub use commands::dispatch;
pub use config::AppConfig;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
