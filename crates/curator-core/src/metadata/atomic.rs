//! Atomic file persistence.
//!
//! Companion records and the timeout registry are rewritten wholesale, so
//! every write goes through the same dance:
//! 1. Write to a temp file with a unique PID+TID suffix
//! 2. fsync so the data reaches disk
//! 3. Atomic rename over the target path
//!
//! JSON payloads are additionally validated by re-parsing before the rename.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{CuratorError, Result};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|e| CuratorError::io_with_path(e, path))?;
    let data: T = serde_json::from_str(&contents).map_err(|e| CuratorError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;
    Ok(Some(data))
}

/// Atomically replace `path` with `content`.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| CuratorError::io_with_path(e, parent))?;
        }
    }

    let temp_path = temp_sibling(path);
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| CuratorError::io_with_path(e, &temp_path))?;

        file.write_all(content.as_bytes())
            .map_err(|e| CuratorError::io_with_path(e, &temp_path))?;
        file.flush()
            .map_err(|e| CuratorError::io_with_path(e, &temp_path))?;
        sync_file(&file, &temp_path)?;
    }

    fs::rename(&temp_path, path).map_err(|e| CuratorError::Io {
        message: format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        ),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// Atomically write `data` as pretty-printed JSON with a trailing newline.
///
/// The serialized form is validated by re-parsing before it replaces the
/// target, so a broken serializer can never clobber a good file.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let mut serialized = serde_json::to_string_pretty(data).map_err(|e| CuratorError::Json {
        message: format!("Failed to serialize data: {}", e),
        source: Some(e),
    })?;

    serde_json::from_str::<serde_json::Value>(&serialized).map_err(|e| CuratorError::Json {
        message: format!("JSON validation failed: {}", e),
        source: Some(e),
    })?;

    serialized.push('\n');
    write_text(path, &serialized)
}

/// Unique temp path next to the target, so the final rename stays on one
/// filesystem.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "curator".to_string());
    path.with_file_name(format!("{}.{}.{}.tmp", name, process::id(), thread_token()))
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn sync_file(file: &File, _path: &Path) -> Result<()> {
    // SAFETY: fsync on an owned, open descriptor; the fd stays valid for
    // the duration of the call and no Rust invariants are touched.
    unsafe {
        libc::fsync(file.as_raw_fd());
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_file(file: &File, path: &Path) -> Result<()> {
    file.sync_all()
        .map_err(|e| CuratorError::io_with_path(e, path))
}

/// Numeric token for the current thread, used in temp file names.
fn thread_token() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    format!("{:?}", thread::current().id()).hash(&mut hasher);
    hasher.finish()
}
