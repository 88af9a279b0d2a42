//! Read-only verification of a deployment.
//!
//! Artifacts must exist (a broken symlink fails), expected binaries must be
//! on `PATH`, and soft checks only ever warn.
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::catalog::{Catalog, expand_home};
use crate::config::selection::Selection;
use crate::deploy::DeploymentTask;
use crate::error::ConfigError;
use crate::exec::Executor;

/// A deployed path that must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCheck {
    /// Label used in the report.
    pub name: String,
    /// Path to check.
    pub path: PathBuf,
}

/// A file expected to contain some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCheck {
    /// Label used in the report.
    pub name: String,
    /// File to read.
    pub path: PathBuf,
    /// Text expected in the file.
    pub contains: String,
    /// Note reported when the text is missing.
    pub note: String,
}

/// Everything a verification run checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationPlan {
    /// Deployed artifacts.
    pub artifacts: Vec<ArtifactCheck>,
    /// Executables expected on `PATH`.
    pub binaries: Vec<String>,
    /// Warn-level content checks.
    pub soft: Vec<ContentCheck>,
}

impl VerificationPlan {
    /// Build the checks for the selected components.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection names an unknown component.
    pub fn build(
        catalog: &Catalog,
        selection: &Selection,
        tasks: &[DeploymentTask],
        home: &Path,
    ) -> Result<Self, ConfigError> {
        let mut plan = Self {
            artifacts: tasks
                .iter()
                .map(|t| ArtifactCheck {
                    name: format!("{}: {}", t.component_id, t.target_path.display()),
                    path: t.target_path.clone(),
                })
                .collect(),
            ..Self::default()
        };

        for id in &selection.components {
            let component = catalog.get_component(id)?;
            for binary in &component.binaries {
                if !plan.binaries.contains(binary) {
                    plan.binaries.push(binary.clone());
                }
            }
            plan.soft.extend(component.checks.iter().map(|check| ContentCheck {
                name: format!("{}: {} contains '{}'", component.id, check.path, check.contains),
                path: expand_home(&check.path, home),
                contains: check.contains.clone(),
                note: check.note.clone(),
            }));
        }
        Ok(plan)
    }
}

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// The check passed.
    Pass,
    /// The check failed.
    Fail,
    /// A soft check did not hold.
    Warn,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckDetail {
    /// What was checked.
    pub name: String,
    /// Outcome.
    pub status: CheckStatus,
    /// Extra context (link target, binary path, failure reason).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// Aggregate verification result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Number of passed checks.
    pub passed: usize,
    /// Number of failed checks.
    pub failed: usize,
    /// Number of warnings.
    pub warned: usize,
    /// Every check in evaluation order.
    pub details: Vec<CheckDetail>,
}

impl VerificationReport {
    /// Whether no check failed.  Warnings do not count.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, name: String, status: CheckStatus, note: impl Into<String>) {
        match status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Warn => self.warned += 1,
        }
        self.details.push(CheckDetail {
            name,
            status,
            note: note.into(),
        });
    }
}

/// Run every check in `plan`.  Never writes to the filesystem.
#[must_use]
pub fn verify(plan: &VerificationPlan, executor: &dyn Executor) -> VerificationReport {
    let mut report = VerificationReport::default();

    for artifact in &plan.artifacts {
        let (status, note) = check_artifact(&artifact.path);
        report.record(artifact.name.clone(), status, note);
    }

    for binary in &plan.binaries {
        match executor.which(binary) {
            Some(path) => report.record(
                format!("binary {binary}"),
                CheckStatus::Pass,
                path.display().to_string(),
            ),
            None => report.record(
                format!("binary {binary}"),
                CheckStatus::Fail,
                "not found on PATH",
            ),
        }
    }

    for check in &plan.soft {
        let status = match std::fs::read_to_string(&check.path) {
            Ok(content) if content.contains(&check.contains) => CheckStatus::Pass,
            _ => CheckStatus::Warn,
        };
        let note = if status == CheckStatus::Warn {
            check.note.clone()
        } else {
            String::new()
        };
        report.record(check.name.clone(), status, note);
    }

    report
}

fn check_artifact(path: &Path) -> (CheckStatus, String) {
    match std::fs::symlink_metadata(path) {
        Err(_) => (CheckStatus::Fail, "missing".to_string()),
        Ok(meta) if meta.file_type().is_symlink() => {
            let dest = std::fs::read_link(path)
                .map(|d| d.display().to_string())
                .unwrap_or_default();
            if path.exists() {
                (CheckStatus::Pass, format!("symlink -> {dest}"))
            } else {
                (CheckStatus::Fail, format!("broken symlink -> {dest}"))
            }
        }
        Ok(meta) if meta.is_dir() => (CheckStatus::Pass, "directory".to_string()),
        Ok(_) => (CheckStatus::Pass, "file".to_string()),
    }
}
