//! Verify command implementation.
use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, VerifyOpts};
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::verify::{CheckStatus, VerificationPlan, VerificationReport, verify};

/// Run the verify command.
///
/// # Errors
///
/// Returns an error if resolution fails or if any check failed.  Warnings
/// never fail the command.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &VerifyOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let plan = VerificationPlan::build(&setup.catalog, &setup.selection, &setup.tasks, &setup.home)?;

    log.stage("Verifying");
    let report = verify(&plan, &SystemExecutor);

    if opts.json {
        let json = serde_json::to_string_pretty(&report).context("serializing report")?;
        println!("{json}");
    } else {
        print_report(&report, log);
    }

    if !report.is_success() {
        anyhow::bail!("{} check(s) failed", report.failed);
    }
    Ok(())
}

fn print_report(report: &VerificationReport, log: &Logger) {
    for detail in &report.details {
        let line = if detail.note.is_empty() {
            detail.name.clone()
        } else {
            format!("{} ({})", detail.name, detail.note)
        };
        match detail.status {
            CheckStatus::Pass => log.info(&format!("\x1b[32m✓\x1b[0m {line}")),
            CheckStatus::Fail => log.error(&line),
            CheckStatus::Warn => log.warn(&line),
        }
    }
    log.info(&format!(
        "{} passed, {} failed, {} warnings",
        report.passed, report.failed, report.warned
    ));
}
