//! Filesystem helpers shared by the artifact writer and the manifest store
//!
//! Writes go to a temporary file in the destination directory and are then
//! renamed into place, so the shell never autoloads a half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically replace `path` with `content`, creating parent directories
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, or the
/// temporary file cannot be written or persisted.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a file, treating "not found" as success
///
/// Returns whether a file was actually removed.
///
/// # Errors
///
/// Returns any error other than `NotFound`.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
