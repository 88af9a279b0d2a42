//! Install command implementation.
use anyhow::Result;
use std::sync::atomic::Ordering;

use super::CommandSetup;
use crate::cli::GlobalOpts;
use crate::deploy::{DeployOptions, Deployer, DeploymentOutcome, DeploymentResult};
use crate::logging::{Logger, TaskStatus};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if resolution fails (before anything is written) or if
/// one or more deployment tasks failed.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    log.info(&format!("dotdeploy {}", crate::VERSION));
    let setup = CommandSetup::init(global, log)?;

    let deployer = Deployer::new(
        &setup.root,
        DeployOptions {
            dry_run: global.dry_run,
            strict: global.strict,
            parallel: global.parallel,
        },
    );
    let flag = deployer.interrupt_flag();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        log.debug(&format!("interrupt handler not installed: {e}"));
    }

    log.stage("Deploying");
    if setup.tasks.is_empty() {
        log.warn("no artifacts apply to this platform");
    }
    for result in deployer.deploy_all(&setup.tasks) {
        record_result(&result, global.dry_run, log);
    }

    super::finish(log)
}

/// Log a deployment result and record it for the summary.
fn record_result(result: &DeploymentResult, dry_run: bool, log: &Logger) {
    let task = &result.task;
    let name = format!("{}: {}", task.component_id, task.target_path.display());
    let backup = result
        .backup_path
        .as_ref()
        .map_or_else(String::new, |p| p.display().to_string());

    match (result.outcome, dry_run) {
        (DeploymentOutcome::Created, false) => {
            log.info(&format!("{} ({})", task.description(), task.mode));
            log.record_task(&name, TaskStatus::Ok, None);
        }
        (DeploymentOutcome::Created, true) => {
            log.dry_run(&format!("would {} {}", task.mode, task.description()));
            log.record_task(&name, TaskStatus::DryRun, Some(&format!("would {}", task.mode)));
        }
        (DeploymentOutcome::BackedUpAndReplaced, false) => {
            log.info(&format!("{} (backup: {backup})", task.description()));
            log.record_task(&name, TaskStatus::BackedUp, Some(&format!("backup: {backup}")));
        }
        (DeploymentOutcome::BackedUpAndReplaced, true) => {
            log.dry_run(&format!("would back up {name} to {backup}"));
            log.record_task(
                &name,
                TaskStatus::DryRun,
                Some(&format!("would back up to {backup}")),
            );
        }
        (DeploymentOutcome::Unchanged, _) => {
            log.debug(&format!("{name} already up to date"));
            log.record_task(&name, TaskStatus::Skipped, Some("already up to date"));
        }
        (DeploymentOutcome::SkippedNotOwned, _) => {
            log.warn(&format!("{name} is a symlink not owned by dotdeploy; left alone"));
            log.record_task(&name, TaskStatus::Skipped, Some("not owned"));
        }
        (DeploymentOutcome::Interrupted, _) => {
            log.record_task(&name, TaskStatus::Skipped, Some("interrupted"));
        }
        (DeploymentOutcome::Failed, _) => {
            let message = result.error.as_deref().unwrap_or("failed");
            let error = if backup.is_empty() {
                message.to_string()
            } else {
                format!("{message}; original left at {backup}")
            };
            log.error(&format!("{name}: {error}"));
            log.record_task(&name, TaskStatus::Failed, Some(&error));
        }
    }
}
