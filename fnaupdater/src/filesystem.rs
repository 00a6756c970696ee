//! Filesystem state management.
//!
//! Every component prepares its paths through this module before writing
//! into them:
//! - `ensure_directory` guarantees a path is usable as a directory
//! - `remove_entry` deletes a file or a subtree, idempotently
//! - `copy_tree` merges one directory tree into another

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{UpdaterError, UpdaterResult};

/// Name of the version-control metadata entry inside a checkout.
pub const VCS_METADATA_DIR: &str = ".git";

/// Ensure `path` is usable as a directory.
///
/// Returns `true` only when `path` already existed as a directory, in which
/// case nothing is touched regardless of the flags. A plain file at `path`
/// is never usable: it is removed when `delete_if_exists` is set and left
/// alone otherwise. A missing (or just removed) path is created when
/// `create_if_absent` is set.
///
/// Creating a directory over a file that was left in place surfaces as
/// `CreateDirFailed`.
pub fn ensure_directory(
    path: &Path,
    delete_if_exists: bool,
    create_if_absent: bool,
) -> UpdaterResult<bool> {
    if path.is_dir() {
        return Ok(true);
    }

    if path.exists() && delete_if_exists {
        debug!(path = %path.display(), "removing file in place of directory");
        remove_entry(path)?;
    }

    if create_if_absent {
        fs::create_dir_all(path).map_err(|e| UpdaterError::CreateDirFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    Ok(false)
}

/// Remove a file or an entire directory tree.
///
/// A missing path is not an error; callers rely on this being idempotent.
pub fn remove_entry(path: &Path) -> UpdaterResult<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(UpdaterError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UpdaterError::RemoveFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Check whether `path` holds a version-control checkout.
///
/// Only the metadata entry counts; any other content is ignored. `.git` may
/// be a directory or, for submodules and worktrees, a file.
pub fn is_checkout(path: &Path) -> bool {
    path.join(VCS_METADATA_DIR).exists()
}

/// Recursively copy `src` into `dest`, merging with existing content.
///
/// Missing directories are created and existing files are overwritten.
/// Symlinks are recreated rather than followed, so a link cycle in `src`
/// terminates.
///
/// # Returns
///
/// The number of files and symlinks copied.
pub fn copy_tree(src: &Path, dest: &Path) -> UpdaterResult<usize> {
    fs::create_dir_all(dest).map_err(|e| UpdaterError::CreateDirFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let entries = fs::read_dir(src).map_err(|e| UpdaterError::ReadFailed {
        path: src.to_path_buf(),
        source: e,
    })?;

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| UpdaterError::ReadFailed {
            path: src.to_path_buf(),
            source: e,
        })?;
        let file_type = entry.file_type().map_err(|e| UpdaterError::ReadFailed {
            path: entry.path(),
            source: e,
        })?;
        let from = entry.path();
        let to = dest.join(entry.file_name());

        if file_type.is_dir() {
            if !is_real_dir(&to) {
                remove_entry(&to)?;
            }
            count += copy_tree(&from, &to)?;
        } else {
            // Never write through an existing link or into a directory.
            if file_type.is_symlink() || !is_real_file(&to) {
                remove_entry(&to)?;
            }
            if file_type.is_symlink() {
                copy_symlink(&from, &to)?;
            } else {
                fs::copy(&from, &to).map_err(|e| UpdaterError::WriteFailed {
                    path: to.clone(),
                    source: e,
                })?;
            }
            count += 1;
        }
    }

    Ok(count)
}

fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}

fn is_real_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_file())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> UpdaterResult<()> {
    let target = fs::read_link(from).map_err(|e| UpdaterError::ReadFailed {
        path: from.to_path_buf(),
        source: e,
    })?;
    std::os::unix::fs::symlink(&target, to).map_err(|e| UpdaterError::WriteFailed {
        path: to.to_path_buf(),
        source: e,
    })
}

/// Creating symlinks needs extra privileges here: copy what a file link
/// points at and skip linked directories.
#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> UpdaterResult<()> {
    if from.is_file() {
        fs::copy(from, to).map_err(|e| UpdaterError::WriteFailed {
            path: to.to_path_buf(),
            source: e,
        })?;
    } else {
        debug!(path = %from.display(), "skipping linked directory");
    }
    Ok(())
}

/// Count files recursively in a directory. Symlinks count as files.
pub fn count_files(dir: &Path) -> UpdaterResult<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| UpdaterError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut count = 0;
    for entry in entries.flatten() {
        match entry.file_type() {
            Ok(t) if t.is_dir() => count += count_files(&entry.path())?,
            Ok(_) => count += 1,
            Err(_) => {}
        }
    }

    Ok(count)
}
