//! Low-level filesystem helpers for the deployment engine.
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::DeployError;

/// What currently occupies a target path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetState {
    /// Nothing exists at the path.
    Absent,
    /// A symbolic link (possibly broken) pointing at the given path.
    Symlink(PathBuf),
    /// A regular file or a real directory.
    Occupied,
}

/// Inspect `path` without following symlinks.
///
/// # Errors
///
/// Returns an error if the metadata or link target cannot be read.
pub fn inspect(path: &Path) -> Result<TargetState, DeployError> {
    match std::fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(TargetState::Absent),
        Err(e) => Err(DeployError::fs("inspect", path)(e)),
        Ok(meta) if meta.file_type().is_symlink() => std::fs::read_link(path)
            .map(TargetState::Symlink)
            .map_err(DeployError::fs("read link", path)),
        Ok(_) => Ok(TargetState::Occupied),
    }
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<(), DeployError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(DeployError::fs("create parent", parent))?;
    }
    Ok(())
}

/// Create a symlink at `link` pointing to `source`.
///
/// # Errors
///
/// Returns an error if the link cannot be created.
pub fn create_symlink(source: &Path, link: &Path) -> Result<(), DeployError> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, link).map_err(DeployError::fs("symlink", link))?;
    }

    #[cfg(windows)]
    {
        let is_dir = source.is_dir();
        let result = if is_dir {
            std::os::windows::fs::symlink_dir(source, link)
        } else {
            std::os::windows::fs::symlink_file(source, link)
        };

        if result.is_err() {
            // Without developer mode or admin rights, fall back to mklink.
            // Directories become junctions.
            let link_str = link.to_string_lossy();
            let source_str = source.to_string_lossy();
            let mut args: Vec<&str> = vec!["/c", "mklink"];
            if is_dir {
                args.push("/J");
            }
            args.push(&link_str);
            args.push(&source_str);
            crate::exec::run("cmd", &args)
                .map_err(|e| DeployError::fs("symlink", link)(io::Error::other(e.to_string())))?;
        }
    }

    Ok(())
}

/// Remove a symlink, handling platform differences.
///
/// On Windows, directory symlinks and junctions must be removed with
/// `remove_dir`.
///
/// # Errors
///
/// Returns an error if the link cannot be removed.
pub fn remove_symlink(path: &Path) -> Result<(), DeployError> {
    let meta = std::fs::symlink_metadata(path).map_err(DeployError::fs("inspect", path))?;
    if is_dir_like(&meta) {
        std::fs::remove_dir(path).map_err(DeployError::fs("remove link", path))
    } else {
        std::fs::remove_file(path).map_err(DeployError::fs("remove link", path))
    }
}

/// Whether metadata represents a directory-like entry.
///
/// `symlink_metadata().is_dir()` is `false` for directory symlinks on
/// Windows, so the raw `FILE_ATTRIBUTE_DIRECTORY` bit is checked there.
fn is_dir_like(meta: &std::fs::Metadata) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        meta.file_attributes() & 0x10 != 0 // FILE_ATTRIBUTE_DIRECTORY
    }
    #[cfg(not(windows))]
    {
        meta.is_dir() && !meta.file_type().is_symlink()
    }
}

/// Recursively copy a directory tree.
///
/// Symlinks within the source tree are followed and their content copied.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or an entry cannot be
/// read or copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), DeployError> {
    std::fs::create_dir_all(dst).map_err(DeployError::fs("create directory", dst))?;
    for entry in std::fs::read_dir(src).map_err(DeployError::fs("read directory", src))? {
        let entry = entry.map_err(DeployError::fs("read directory", src))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path).map_err(DeployError::fs("copy", &src_path))?;
        }
    }
    Ok(())
}

/// Sibling staging path for `target`.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "target".to_string(), |n| n.to_string_lossy().to_string());
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{name}.dotdeploy-tmp"))
}

/// Copy `source` to the currently-absent `target`.
///
/// Content is staged to a sibling temp path and renamed into place so a
/// partially written copy is never visible at `target`.
///
/// # Errors
///
/// Returns an error if staging or the final rename fails; the staging path
/// is cleaned up in either case.
pub fn copy_into_place(source: &Path, target: &Path) -> Result<(), DeployError> {
    let tmp = staging_path(target);
    let is_dir = source.is_dir();
    let cleanup = || {
        let _ = if is_dir {
            std::fs::remove_dir_all(&tmp)
        } else {
            std::fs::remove_file(&tmp)
        };
    };

    // A stale staging path from an interrupted run would break the rename.
    if tmp.symlink_metadata().is_ok() {
        cleanup();
    }

    let staged = if is_dir {
        copy_dir_recursive(source, &tmp)
    } else {
        std::fs::copy(source, &tmp)
            .map(|_| ())
            .map_err(DeployError::fs("copy", source))
    };
    if let Err(e) = staged {
        cleanup();
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&tmp, target) {
        cleanup();
        return Err(DeployError::fs("rename", target)(e));
    }
    Ok(())
}

/// Absolute destination of the symlink at `link` whose content is `dest`.
///
/// Relative content is joined onto the link's directory, then `.` and `..`
/// are folded lexically.  Nothing is read from disk.
#[must_use]
pub fn link_destination(link: &Path, dest: &Path) -> PathBuf {
    let joined = match link.parent() {
        Some(dir) if dest.is_relative() => dir.join(dest),
        _ => dest.to_path_buf(),
    };

    let mut folded = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match folded.components().next_back() {
                Some(Component::Normal(_)) => {
                    folded.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => folded.push(".."),
            },
            other => folded.push(other),
        }
    }
    folded
}

/// Whether the symlink at `link` (content `dest`) ends up inside `dir`.
///
/// Falls back to canonical paths when the lexical check fails, so links
/// reached through a symlinked home directory are still recognized.
#[must_use]
pub fn link_within(link: &Path, dest: &Path, dir: &Path) -> bool {
    link_destination(link, dest).starts_with(dir)
        || matches!(
            (dunce::canonicalize(link), dunce::canonicalize(dir)),
            (Ok(real), Ok(dir)) if real.starts_with(&dir)
        )
}

/// Whether the symlink at `link` (content `dest`) resolves to `source`.
#[must_use]
pub fn link_resolves_to(link: &Path, dest: &Path, source: &Path) -> bool {
    paths_equal(&link_destination(link, dest), source)
        || matches!(
            (dunce::canonicalize(link), dunce::canonicalize(source)),
            (Ok(real), Ok(source)) if real == source
        )
}

/// Compare two paths for equality, handling UNC prefix normalization on Windows.
#[must_use]
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    let normalize = |p: &Path| -> PathBuf {
        #[cfg(windows)]
        {
            let s = p.to_string_lossy();
            if let Some(stripped) = s.strip_prefix(r"\\?\") {
                return PathBuf::from(stripped);
            }
        }
        p.to_path_buf()
    };

    normalize(a) == normalize(b)
}
