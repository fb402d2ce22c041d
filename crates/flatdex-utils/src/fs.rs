use std::{fs, io::Write, os::unix::fs::PermissionsExt, path::Path};

use tempfile::NamedTempFile;

use crate::{
    error::{FileSystemError, FileSystemResult},
    hash::{bytes_digest, file_digest},
};

/// Creates a directory structure if it doesn't exist.
///
/// If the path already exists but is not a directory, this function returns
/// an error.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| FileSystemError::Directory {
            path: path.to_path_buf(),
            action: "create",
            source: err,
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Atomically replaces `path` with `content`, unless the file already holds
/// exactly that content.
///
/// The content is staged in a temporary file in the target's directory so the
/// final rename stays on one filesystem. When the existing file's digest
/// matches the new content, the temporary file is discarded and the target is
/// left untouched, preserving its modification time. Returns `true` when the
/// target was written, `false` when it was unchanged.
///
/// On any error the previous file is left intact and the temporary file is
/// removed.
///
/// # Errors
///
/// * [`FileSystemError::NoParentDirectory`] if `path` has no parent.
/// * [`FileSystemError::File`] if staging or renaming fails.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> FileSystemResult<bool> {
    let path = path.as_ref();
    let dir = path.parent().ok_or_else(|| FileSystemError::NoParentDirectory {
        path: path.to_path_buf(),
    })?;

    let mut staged = NamedTempFile::new_in(dir).map_err(|err| FileSystemError::File {
        path: path.to_path_buf(),
        action: "stage",
        source: err,
    })?;
    staged
        .write_all(content)
        .map_err(|err| FileSystemError::File {
            path: path.to_path_buf(),
            action: "stage",
            source: err,
        })?;

    if path.exists() {
        if let Ok(existing) = file_digest(path) {
            if existing == bytes_digest(content) {
                return Ok(false);
            }
        }
    }

    staged
        .as_file()
        .set_permissions(fs::Permissions::from_mode(0o644))
        .map_err(|err| FileSystemError::File {
            path: path.to_path_buf(),
            action: "chmod",
            source: err,
        })?;

    staged.persist(path).map_err(|err| FileSystemError::File {
        path: path.to_path_buf(),
        action: "replace",
        source: err.error,
    })?;

    Ok(true)
}
