//! Backup-safe, profile-driven dotfiles deployment.
//!
//! Detects the host platform, resolves a set of components from flags, a
//! named profile or an interactive prompt, and places each component's
//! artifacts (symlinks or copies) under the target home.  Anything already
//! occupying a target is renamed to a timestamped backup first.
//!
//! - **[`platform`]**: normalized platform and package manager
//! - **[`config`]**: the component catalog and selection resolution
//! - **[`deploy`]**: planning, backup-safe placement and reset
//! - **[`verify`]**: read-only audit of a deployment
//! - **[`commands`]**: `install`, `verify` and `reset` orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod verify;

/// Build version: `DOTDEPLOY_VERSION` (or `git describe`) when available,
/// otherwise the package version.
pub const VERSION: &str = match option_env!("DOTDEPLOY_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
