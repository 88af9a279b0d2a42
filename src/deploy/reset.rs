//! Undo a deployment by re-deriving its targets from the catalog.
//!
//! Symlinks that point at the task's source are removed.  Copy-mode content
//! is left in place.  When the target is then absent, the newest backup is
//! renamed back.
use std::path::PathBuf;

use super::fs::{self, TargetState};
use super::{DeploymentTask, backup};
use crate::config::catalog::Mode;
use crate::error::DeployError;

/// What reset did to the existing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAction {
    /// Our symlink was removed.
    RemovedLink,
    /// A deployed copy was left in place.
    KeptCopy,
    /// The target is not ours (a foreign link or a user file) and was left alone.
    NotOwned,
    /// Nothing was at the target.
    Absent,
}

/// The result of resetting one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetResult {
    /// The task this result belongs to.
    pub task: DeploymentTask,
    /// What happened to the target.
    pub action: TargetAction,
    /// Backup renamed back into place.
    pub restored: Option<PathBuf>,
    /// Failure message, when a filesystem operation failed.
    pub error: Option<String>,
}

/// Reset every task in order.
#[must_use]
pub fn reset_all(tasks: &[DeploymentTask], dry_run: bool) -> Vec<ResetResult> {
    tasks.iter().map(|task| reset(task, dry_run)).collect()
}

/// Reset a single task.  Errors are captured in the result.
#[must_use]
pub fn reset(task: &DeploymentTask, dry_run: bool) -> ResetResult {
    let mut result = ResetResult {
        task: task.clone(),
        action: TargetAction::Absent,
        restored: None,
        error: None,
    };
    if let Err(e) = try_reset(task, dry_run, &mut result) {
        result.error = Some(e.to_string());
    }
    result
}

fn try_reset(
    task: &DeploymentTask,
    dry_run: bool,
    result: &mut ResetResult,
) -> Result<(), DeployError> {
    let target = &task.target_path;

    result.action = match fs::inspect(target)? {
        TargetState::Absent => TargetAction::Absent,
        TargetState::Symlink(dest) if fs::link_resolves_to(target, &dest, &task.source_path) => {
            if !dry_run {
                fs::remove_symlink(target)?;
            }
            TargetAction::RemovedLink
        }
        TargetState::Occupied if task.mode == Mode::Copy => TargetAction::KeptCopy,
        TargetState::Symlink(_) | TargetState::Occupied => TargetAction::NotOwned,
    };

    let now_absent = matches!(
        result.action,
        TargetAction::Absent | TargetAction::RemovedLink
    );
    if now_absent && let Some(newest) = backup::newest_backup(target) {
        if !dry_run {
            std::fs::rename(&newest, target).map_err(DeployError::fs("restore", &newest))?;
        }
        result.restored = Some(newest);
    }
    Ok(())
}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, DeploymentTask) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src/zsh/zshrc");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, "deployed").unwrap();
        let task = DeploymentTask {
            component_id: "zsh".to_string(),
            source_path: source,
            target_path: dir.path().join(".zshrc"),
            mode: Mode::Symlink,
        };
        (dir, task)
    }

    #[test]
    fn removes_own_link_and_restores_newest_backup() {
        let (dir, task) = setup();
        std::os::unix::fs::symlink(&task.source_path, &task.target_path).unwrap();
        std::fs::write(dir.path().join(".zshrc.backup.20240101000000"), "oldest").unwrap();
        std::fs::write(dir.path().join(".zshrc.backup.20240301000000"), "newest").unwrap();

        let result = reset(&task, false);

        assert_eq!(result.action, TargetAction::RemovedLink);
        assert_eq!(
            result.restored,
            Some(dir.path().join(".zshrc.backup.20240301000000"))
        );
        assert_eq!(std::fs::read_to_string(&task.target_path).unwrap(), "newest");
        assert!(dir.path().join(".zshrc.backup.20240101000000").exists());
    }

    #[test]
    fn foreign_link_is_left_alone() {
        let (dir, task) = setup();
        let other = dir.path().join("other");
        std::fs::write(&other, "theirs").unwrap();
        std::os::unix::fs::symlink(&other, &task.target_path).unwrap();
        std::fs::write(dir.path().join(".zshrc.backup.20240101000000"), "b").unwrap();

        let result = reset(&task, false);

        assert_eq!(result.action, TargetAction::NotOwned);
        assert!(result.restored.is_none());
        assert_eq!(std::fs::read_link(&task.target_path).unwrap(), other);
    }

    #[test]
    fn copy_mode_content_is_kept() {
        let (_dir, mut task) = setup();
        task.mode = Mode::Copy;
        std::fs::write(&task.target_path, "deployed").unwrap();

        let result = reset(&task, false);

        assert_eq!(result.action, TargetAction::KeptCopy);
        assert!(task.target_path.exists());
    }

    #[test]
    fn absent_target_restores_backup() {
        let (dir, task) = setup();
        std::fs::write(dir.path().join(".zshrc.backup.20240101000000"), "mine").unwrap();

        let result = reset(&task, false);

        assert_eq!(result.action, TargetAction::Absent);
        assert_eq!(std::fs::read_to_string(&task.target_path).unwrap(), "mine");
    }

    #[test]
    fn dry_run_changes_nothing() {
        let (dir, task) = setup();
        std::os::unix::fs::symlink(&task.source_path, &task.target_path).unwrap();
        let backup = dir.path().join(".zshrc.backup.20240101000000");
        std::fs::write(&backup, "mine").unwrap();

        let results = reset_all(std::slice::from_ref(&task), true);

        assert_eq!(results[0].action, TargetAction::RemovedLink);
        assert_eq!(results[0].restored, Some(backup.clone()));
        assert!(
            std::fs::symlink_metadata(&task.target_path)
                .unwrap()
                .file_type()
                .is_symlink()
        );
        assert!(backup.exists());
    }

    #[test]
    fn relative_link_to_source_is_recognized() {
        let (_dir, task) = setup();
        std::os::unix::fs::symlink("src/zsh/zshrc", &task.target_path).unwrap();

        let result = reset(&task, false);

        assert_eq!(result.action, TargetAction::RemovedLink);
        assert!(task.target_path.symlink_metadata().is_err());
    }

    #[test]
    fn parent_relative_link_is_removed() {
        let (dir, mut task) = setup();
        task.target_path = dir.path().join("home/.zshrc");
        std::fs::create_dir_all(dir.path().join("home")).unwrap();
        std::os::unix::fs::symlink("../src/zsh/zshrc", &task.target_path).unwrap();

        let result = reset(&task, false);

        assert_eq!(result.action, TargetAction::RemovedLink);
        assert!(result.error.is_none());
        assert!(task.target_path.symlink_metadata().is_err());
    }
}
