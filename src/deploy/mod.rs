//! Deployment engine.
//!
//! [`plan`] expands a selection into [`DeploymentTask`]s; a [`Deployer`]
//! places each one.  A target occupied by a regular file or directory is
//! always renamed to a backup first; a symlink is replaced without backup.
//! Failures are captured per task and never abort the run.
pub mod backup;
pub mod fs;
pub mod reset;

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::catalog::{Catalog, Mode};
use crate::config::selection::Selection;
use crate::error::{ConfigError, DeployError};
use crate::platform::PlatformId;
use fs::TargetState;

/// A single artifact placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTask {
    /// Component the artifact belongs to.
    pub component_id: String,
    /// Absolute path of the artifact in the source tree.
    pub source_path: PathBuf,
    /// Absolute path where the artifact is placed.
    pub target_path: PathBuf,
    /// Placement mode.
    pub mode: Mode,
}

impl DeploymentTask {
    /// Human-readable `target -> source` description.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "{} -> {}",
            self.target_path.display(),
            self.source_path.display()
        )
    }
}

/// What happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentOutcome {
    /// The target was absent or a replaceable symlink, and is now in place.
    Created,
    /// An existing file or directory was backed up and then replaced.
    BackedUpAndReplaced,
    /// A copy-mode target already matched its source.
    Unchanged,
    /// Strict mode left a symlink that points outside the source tree.
    SkippedNotOwned,
    /// The task was not attempted because the run was interrupted.
    Interrupted,
    /// The task failed; see [`DeploymentResult::error`].
    Failed,
}

/// The result of one [`DeploymentTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentResult {
    /// The task this result belongs to.
    pub task: DeploymentTask,
    /// What happened.
    pub outcome: DeploymentOutcome,
    /// Where the previous target was moved, when a backup was taken.  On a
    /// failure this is only set when the original could not be put back.
    pub backup_path: Option<PathBuf>,
    /// Failure message for [`DeploymentOutcome::Failed`].
    pub error: Option<String>,
}

/// Behaviour switches for a [`Deployer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Compute outcomes without writing to the filesystem.
    pub dry_run: bool,
    /// Leave symlinks that point outside the source root alone.
    pub strict: bool,
    /// Deploy tasks on the rayon thread pool.
    pub parallel: bool,
}

/// Places [`DeploymentTask`]s on the filesystem.
#[derive(Debug, Clone)]
pub struct Deployer {
    source_root: PathBuf,
    stamp: String,
    options: DeployOptions,
    interrupted: Arc<AtomicBool>,
}

impl Deployer {
    /// Create a deployer for artifacts under `source_root`.
    ///
    /// The backup timestamp is taken once, now, and shared by every task.
    #[must_use]
    pub fn new(source_root: impl Into<PathBuf>, options: DeployOptions) -> Self {
        Self {
            source_root: source_root.into(),
            stamp: backup::stamp(&chrono::Local::now()),
            options,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the backup timestamp.
    #[must_use]
    pub fn with_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.stamp = stamp.into();
        self
    }

    /// Flag that, once set, stops tasks that have not started yet.
    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    /// Deploy every task, returning results in input order.
    #[must_use]
    pub fn deploy_all(&self, tasks: &[DeploymentTask]) -> Vec<DeploymentResult> {
        if self.options.parallel {
            tasks.par_iter().map(|task| self.deploy(task)).collect()
        } else {
            tasks.iter().map(|task| self.deploy(task)).collect()
        }
    }

    /// Deploy a single task.  Errors are captured in the result.
    #[must_use]
    pub fn deploy(&self, task: &DeploymentTask) -> DeploymentResult {
        if self.interrupted.load(Ordering::SeqCst) {
            return DeploymentResult {
                task: task.clone(),
                outcome: DeploymentOutcome::Interrupted,
                backup_path: None,
                error: None,
            };
        }

        match self.try_deploy(task) {
            Ok((outcome, backup_path)) => {
                tracing::debug!("{}: {outcome:?}", task.description());
                DeploymentResult {
                    task: task.clone(),
                    outcome,
                    backup_path,
                    error: None,
                }
            }
            Err(failure) => {
                tracing::debug!("{}: failed: {}", task.description(), failure.error);
                DeploymentResult {
                    task: task.clone(),
                    outcome: DeploymentOutcome::Failed,
                    backup_path: failure.backup_path,
                    error: Some(failure.error.to_string()),
                }
            }
        }
    }

    fn try_deploy(
        &self,
        task: &DeploymentTask,
    ) -> Result<(DeploymentOutcome, Option<PathBuf>), TaskFailure> {
        let source = &task.source_path;
        let target = &task.target_path;

        if !source.exists() {
            return Err(DeployError::SourceMissing(source.clone()).into());
        }

        let state = fs::inspect(target)?;
        if let TargetState::Symlink(dest) = &state
            && self.options.strict
            && !self.owns(target, dest)
        {
            return Ok((DeploymentOutcome::SkippedNotOwned, None));
        }
        if state == TargetState::Occupied
            && task.mode == Mode::Copy
            && same_file_content(source, target)
        {
            return Ok((DeploymentOutcome::Unchanged, None));
        }

        let backup = match state {
            TargetState::Occupied => Some(backup::backup_path(target, &self.stamp)?),
            TargetState::Absent | TargetState::Symlink(_) => None,
        };
        let outcome = if backup.is_some() {
            DeploymentOutcome::BackedUpAndReplaced
        } else {
            DeploymentOutcome::Created
        };
        if self.options.dry_run {
            return Ok((outcome, backup));
        }

        fs::ensure_parent_dir(target)?;
        match (&state, &backup) {
            (TargetState::Occupied, Some(backup)) => {
                std::fs::rename(target, backup).map_err(DeployError::fs("back up", target))?;
            }
            (TargetState::Symlink(_), _) => fs::remove_symlink(target)?,
            _ => {}
        }

        let placed = match task.mode {
            Mode::Symlink => fs::create_symlink(source, target),
            Mode::Copy => fs::copy_into_place(source, target),
        };
        match placed {
            Ok(()) => Ok((outcome, backup)),
            Err(error) => Err(roll_back(target, &state, backup, error)),
        }
    }

    /// Whether the link at `target` pointing to `dest` lives in the source tree.
    fn owns(&self, target: &Path, dest: &Path) -> bool {
        fs::link_within(target, dest, &self.source_root)
    }
}

/// A failed task, carrying the backup path when the original could not be
/// put back.
#[derive(Debug)]
struct TaskFailure {
    error: DeployError,
    backup_path: Option<PathBuf>,
}

impl From<DeployError> for TaskFailure {
    fn from(error: DeployError) -> Self {
        Self {
            error,
            backup_path: None,
        }
    }
}

/// Put back what was displaced from `target` before a placement failed.
fn roll_back(
    target: &Path,
    previous: &TargetState,
    backup: Option<PathBuf>,
    error: DeployError,
) -> TaskFailure {
    let restored = match (previous, &backup) {
        (TargetState::Occupied, Some(backup)) => std::fs::rename(backup, target).is_ok(),
        (TargetState::Symlink(dest), _) => fs::create_symlink(dest, target).is_ok(),
        _ => true,
    };
    if !restored {
        tracing::warn!("could not restore {}", target.display());
    }
    TaskFailure {
        error,
        backup_path: backup.filter(|_| !restored),
    }
}

/// Whether two regular files have identical content.
fn same_file_content(a: &Path, b: &Path) -> bool {
    if !a.is_file() || !b.is_file() {
        return false;
    }
    match (std::fs::read(a), std::fs::read(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

/// Expand the selected components into deployment tasks.
///
/// Tasks follow selection order, then artifact order within each component.
/// Artifacts restricted to other platforms are skipped.
///
/// # Errors
///
/// Returns [`ConfigError::ComponentNotFound`] if the selection names a
/// component the catalog does not define.
pub fn plan(
    catalog: &Catalog,
    selection: &Selection,
    platform: PlatformId,
    source_root: &Path,
    home: &Path,
) -> Result<Vec<DeploymentTask>, ConfigError> {
    let mut tasks = Vec::new();
    for id in &selection.components {
        let component = catalog.get_component(id)?;
        tasks.extend(
            component
                .artifacts_for(platform)
                .map(|artifact| DeploymentTask {
                    component_id: component.id.clone(),
                    source_path: artifact.source_path(source_root, &component.id),
                    target_path: artifact.target_path(home),
                    mode: artifact.mode,
                }),
        );
    }
    Ok(tasks)
}
