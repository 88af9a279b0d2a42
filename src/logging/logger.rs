//! Structured logger with dry-run awareness and summary collection.
use std::path::Path;
use std::sync::Mutex;

use super::file::LogFile;
use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Summary, TaskEntry, TaskStatus};

/// Structured logger with dry-run awareness and summary collection.
///
/// Events go through [`tracing`]; the subscriber decides where they land.
/// The [`LogFile`], when there is one, is only named in the summary.
#[derive(Debug)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<LogFile>,
}

impl Logger {
    /// Create a logger that reports `log_file` in its summary.
    ///
    /// The file itself is opened by [`init_subscriber`](super::init_subscriber).
    #[must_use]
    pub const fn new(log_file: Option<LogFile>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Path of the log file, if there is one.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_ref().map(LogFile::path)
    }

    /// Return a clone of all recorded entries.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.tasks.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record an item result for the summary.
    pub fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.tasks.lock() {
            guard.push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed items.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.tasks.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == TaskStatus::Failed)
                .count()
        })
    }

    /// Tally the recorded items by status.
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.tasks
            .lock()
            .map_or_else(|_| Summary::default(), |g| Summary::from_entries(&g))
    }

    /// Print every recorded item, the counts, and each failure with its message.
    #[allow(clippy::print_stdout)]
    pub fn print_summary(&self) {
        let tasks = self.task_entries();
        if tasks.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");

        for task in &tasks {
            let (icon, color) = match task.status {
                TaskStatus::Ok => ("✓", "\x1b[32m"),
                TaskStatus::BackedUp => ("↺", "\x1b[36m"),
                TaskStatus::Skipped => ("○", "\x1b[33m"),
                TaskStatus::DryRun => ("~", "\x1b[37m"),
                TaskStatus::Failed => ("✗", "\x1b[31m"),
            };

            let suffix = task
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", task.name));
        }

        let s = Summary::from_entries(&tasks);
        println!();
        self.info(&format!(
            "{} items: \x1b[32m{} created\x1b[0m, \x1b[36m{} backed up\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[37m{} dry-run\x1b[0m, \x1b[31m{} failed\x1b[0m",
            s.total(),
            s.ok,
            s.backed_up,
            s.skipped,
            s.dry_run,
            s.failed
        ));

        for task in tasks.iter().filter(|t| t.status == TaskStatus::Failed) {
            self.error(&format!(
                "{}: {}",
                task.name,
                task.message.as_deref().unwrap_or("failed")
            ));
        }

        if let Some(path) = self.log_path() {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}
