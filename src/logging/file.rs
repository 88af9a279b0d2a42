//! Per-command log file under the user cache directory.
use std::borrow::Cow;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

/// Directory under the cache root that holds dotdeploy's logs.
const LOG_DIR: &str = "dotdeploy";

/// Location of the log for one command run, e.g. `~/.cache/dotdeploy/install.log`.
///
/// Resolving a `LogFile` never touches the filesystem; the directory and the
/// file are created by [`LogFile::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    command: String,
    path: PathBuf,
}

impl LogFile {
    /// Log file for `command` under `$XDG_CACHE_HOME/dotdeploy/`, falling back
    /// to `$HOME/.cache` and then `%USERPROFILE%/.cache`.
    ///
    /// Returns `None` when none of those variables is set.
    #[must_use]
    pub fn for_command(command: &str) -> Option<Self> {
        let root = cache_root(
            std::env::var_os("XDG_CACHE_HOME"),
            std::env::var_os("HOME"),
            std::env::var_os("USERPROFILE"),
        )?;
        Some(Self::in_dir(&root.join(LOG_DIR), command))
    }

    /// Log file for `command` directly inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path, command: &str) -> Self {
        Self {
            command: command.to_string(),
            path: dir.join(format!("{command}.log")),
        }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate the log, write the run header and return an append handle.
    pub(super) fn open(&self) -> io::Result<fs::File> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = fs::File::create(&self.path)?;
        let rule = "=".repeat(42);
        writeln!(
            file,
            "{rule}\ndotdeploy {} {} {}\n{rule}",
            crate::VERSION,
            self.command,
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        )?;
        Ok(file)
    }
}

fn cache_root(
    xdg: Option<OsString>,
    home: Option<OsString>,
    profile: Option<OsString>,
) -> Option<PathBuf> {
    let non_empty = |v: &OsString| !v.is_empty();
    xdg.filter(non_empty).map(PathBuf::from).or_else(|| {
        home.filter(non_empty)
            .or_else(|| profile.filter(non_empty))
            .map(|h| PathBuf::from(h).join(".cache"))
    })
}

/// Remove CSI escape sequences (colors, cursor movement) from `line`.
///
/// Lines without an escape character are returned borrowed.
pub(super) fn without_ansi(line: &str) -> Cow<'_, str> {
    if !line.contains('\x1b') {
        return Cow::Borrowed(line);
    }
    let mut plain = String::with_capacity(line.len());
    let mut in_escape = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if in_escape {
            // A CSI sequence ends at the first byte in `@`..=`~`.
            in_escape = !('@'..='~').contains(&c);
        } else if c == '\x1b' {
            // Two-byte escapes (`ESC 7`, `ESC M`) are dropped whole.
            in_escape = chars.next_if_eq(&'[').is_some();
            if !in_escape {
                chars.next();
            }
        } else {
            plain.push(c);
        }
    }
    Cow::Owned(plain)
}
