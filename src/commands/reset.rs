//! Reset command implementation.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::deploy::reset::{self, ResetResult, TargetAction};
use crate::logging::{Logger, TaskStatus};

/// Run the reset command.
///
/// # Errors
///
/// Returns an error if resolution fails or any target could not be reset.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;

    log.stage("Resetting");
    for result in reset::reset_all(&setup.tasks, global.dry_run) {
        record_result(&result, global.dry_run, log);
    }

    super::finish(log)
}

fn record_result(result: &ResetResult, dry_run: bool, log: &Logger) {
    let task = &result.task;
    let name = format!("{}: {}", task.component_id, task.target_path.display());

    if let Some(error) = &result.error {
        log.error(&format!("{name}: {error}"));
        log.record_task(&name, TaskStatus::Failed, Some(error));
        return;
    }

    let mut done = Vec::new();
    match result.action {
        TargetAction::RemovedLink => done.push("remove link".to_string()),
        TargetAction::KeptCopy => log.debug(&format!("{name}: copy left in place")),
        TargetAction::NotOwned => log.warn(&format!("{name} is not owned by dotdeploy; left alone")),
        TargetAction::Absent => {}
    }
    if let Some(backup) = &result.restored {
        done.push(format!("restore {}", backup.display()));
    }

    if done.is_empty() {
        let reason = match result.action {
            TargetAction::KeptCopy => "copy kept",
            TargetAction::NotOwned => "not owned",
            TargetAction::RemovedLink | TargetAction::Absent => "nothing deployed",
        };
        log.record_task(&name, TaskStatus::Skipped, Some(reason));
        return;
    }

    let message = done.join(", ");
    if dry_run {
        log.dry_run(&format!("would {message} at {name}"));
        log.record_task(&name, TaskStatus::DryRun, Some(&format!("would {message}")));
    } else {
        log.info(&format!("{name}: {message}"));
        log.record_task(&name, TaskStatus::Ok, Some(&message));
    }
}
