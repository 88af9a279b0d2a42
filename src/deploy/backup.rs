//! Backup naming and discovery.
//!
//! A displaced target is renamed to `<target>.backup.<YYYYmmddHHMMSS>`; when
//! that name is taken, `.1`, `.2`, ... are appended.  One timestamp is used
//! for every backup taken during a run.
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::error::DeployError;

/// Separator between the target name and the timestamp.
pub const BACKUP_MARKER: &str = ".backup.";

/// Highest numeric suffix tried before giving up.
const MAX_SUFFIX: u32 = 999;

/// Timestamp format used in backup names.
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Format the per-run backup timestamp.
#[must_use]
pub fn stamp(now: &DateTime<Local>) -> String {
    now.format(STAMP_FORMAT).to_string()
}

fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn with_suffix(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// First free backup path for `target` using `stamp`.
///
/// # Errors
///
/// Returns [`DeployError::BackupCollision`] if every candidate name exists.
pub fn backup_path(target: &Path, stamp: &str) -> Result<PathBuf, DeployError> {
    let base = with_suffix(target, &format!("{BACKUP_MARKER}{stamp}"));
    if !occupied(&base) {
        return Ok(base);
    }
    (1..=MAX_SUFFIX)
        .map(|n| with_suffix(&base, &format!(".{n}")))
        .find(|candidate| !occupied(candidate))
        .ok_or_else(|| DeployError::BackupCollision(target.to_path_buf()))
}

/// Sort key parsed from a backup file name: timestamp, then suffix.
fn parse_key(rest: &str) -> Option<(String, u32)> {
    let (stamp, suffix) = match rest.split_once('.') {
        Some((stamp, n)) => (stamp, n.parse().ok()?),
        None => (rest, 0),
    };
    (stamp.len() == 14 && stamp.bytes().all(|b| b.is_ascii_digit()))
        .then(|| (stamp.to_string(), suffix))
}

/// Every backup of `target`, oldest first.
#[must_use]
pub fn list_backups(target: &Path) -> Vec<PathBuf> {
    let (Some(parent), Some(name)) = (target.parent(), target.file_name()) else {
        return Vec::new();
    };
    let prefix = format!("{}{BACKUP_MARKER}", name.to_string_lossy());

    let Ok(entries) = std::fs::read_dir(parent) else {
        return Vec::new();
    };
    let mut found: Vec<((String, u32), PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let file_name = entry.file_name();
            let rest = file_name.to_str()?.strip_prefix(&prefix)?;
            let key = parse_key(rest)?;
            Some((key, entry.path()))
        })
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0));
    found.into_iter().map(|(_, path)| path).collect()
}

/// The most recent backup of `target`, if any.
#[must_use]
pub fn newest_backup(target: &Path) -> Option<PathBuf> {
    list_backups(target).pop()
}
