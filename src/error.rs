//! Domain-specific error types for the deployment engine.
//!
//! Internal modules return typed errors while command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! PlatformError    detection degraded to `unknown` (never fatal)
//! ConfigError      catalog loading and lookups
//! ResolutionError  turning flags / prompts into a component set
//! DeployError      a single deployment task (captured, never propagated)
//! ```
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that arise from platform detection.
///
/// Detection never fails outright; this value is only logged when the
/// detector has to fall back to `unknown`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// No probe produced a confident match.
    #[error("platform detection ambiguous: {0}")]
    DetectionAmbiguous(String),
}

/// Errors that arise from loading or querying the component catalog.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested profile name is not defined in the catalog.
    #[error("unknown profile '{name}' (available: {})", .available.join(", "))]
    ProfileNotFound {
        /// The name that was looked up.
        name: String,
        /// Every profile name the catalog defines.
        available: Vec<String>,
    },

    /// A component id is not defined in the catalog.
    #[error("unknown component '{id}'{}", profile_suffix(.referenced_by))]
    ComponentNotFound {
        /// The unresolved component id.
        id: String,
        /// The profile that referenced it, when the lookup came from a profile.
        referenced_by: Option<String>,
    },

    /// Two components share the same id.
    #[error("duplicate component id '{0}'")]
    DuplicateComponent(String),

    /// Two profiles share the same name.
    #[error("duplicate profile name '{0}'")]
    DuplicateProfile(String),

    /// The catalog file is not valid TOML or does not match the schema.
    #[error("invalid catalog {origin}: {message}")]
    Parse {
        /// Where the catalog came from (a path or `<embedded>`).
        origin: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a catalog file.
    #[error("reading catalog {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

fn profile_suffix(profile: &Option<String>) -> String {
    profile
        .as_ref()
        .map_or_else(String::new, |p| format!(" (referenced by profile '{p}')"))
}

/// Errors that abort component resolution before any deployment begins.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// `--profile` named a profile the registry does not know.
    #[error("unknown profile '{name}' (valid profiles: {})", .valid.join(", "))]
    UnknownProfile {
        /// The rejected value.
        name: String,
        /// Every valid profile name, in registry order.
        valid: Vec<String>,
    },

    /// `--components` named one or more ids the catalog does not know.
    #[error("unknown component(s) {} (valid components: {})", .ids.join(", "), .valid.join(", "))]
    UnknownComponent {
        /// The rejected ids.
        ids: Vec<String>,
        /// Every valid component id, in catalog order.
        valid: Vec<String>,
    },

    /// Interactive custom selection declined every component.
    #[error("no components selected")]
    EmptySelection,

    /// The interactive prompt could not be read.
    #[error("reading interactive selection: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Errors raised while executing a single deployment task.
///
/// The engine captures these into a `failed` result; they never abort a run.
#[derive(Error, Debug)]
pub enum DeployError {
    /// The source artifact does not exist.
    #[error("source does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    /// A filesystem operation failed.
    #[error("{op} {}: {source}", .path.display())]
    Filesystem {
        /// Short verb describing the operation (e.g. `"rename"`).
        op: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Every candidate backup name for the target is already taken.
    #[error("no free backup name for {}", .0.display())]
    BackupCollision(PathBuf),
}

impl DeployError {
    /// Build a closure that wraps an [`std::io::Error`] for `path`.
    pub(crate) fn fs(op: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self + use<> {
        let path = path.to_path_buf();
        move |source| Self::Filesystem { op, path, source }
    }
}
