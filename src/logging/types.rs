//! Core logging types: task entries, status and run summary counts.

/// Per-item result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Human-readable item name (usually `component: target`).
    pub name: String,
    /// Final status.
    pub status: TaskStatus,
    /// Optional detail message (backup path, skip reason or error).
    pub message: Option<String>,
}

/// Status of a completed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Placed, removed or restored without displacing anything.
    Ok,
    /// An existing file was backed up before being replaced.
    BackedUp,
    /// Left alone (not owned, interrupted, kept copy).
    Skipped,
    /// Dry run; no changes were applied.
    DryRun,
    /// Could not complete.
    Failed,
}

/// Counts of recorded entries by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// [`TaskStatus::Ok`] entries.
    pub ok: usize,
    /// [`TaskStatus::BackedUp`] entries.
    pub backed_up: usize,
    /// [`TaskStatus::Skipped`] entries.
    pub skipped: usize,
    /// [`TaskStatus::DryRun`] entries.
    pub dry_run: usize,
    /// [`TaskStatus::Failed`] entries.
    pub failed: usize,
}

impl Summary {
    /// Tally `entries` by status.
    #[must_use]
    pub fn from_entries(entries: &[TaskEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut acc, e| {
            match e.status {
                TaskStatus::Ok => acc.ok += 1,
                TaskStatus::BackedUp => acc.backed_up += 1,
                TaskStatus::Skipped => acc.skipped += 1,
                TaskStatus::DryRun => acc.dry_run += 1,
                TaskStatus::Failed => acc.failed += 1,
            }
            acc
        })
    }

    /// Total number of entries.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.backed_up + self.skipped + self.dry_run + self.failed
    }
}
