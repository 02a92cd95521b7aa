//! Library root discovery and root-relative path rendering.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{CuratorError, Result};

/// Locates the library root as the enclosing git worktree toplevel.
///
/// Runs `git rev-parse --show-toplevel` in the current directory. Fails with
/// a configuration error when git is unavailable or the directory is not
/// inside a worktree, so callers can fall back to an explicit root flag.
pub fn discover_root() -> Result<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .map_err(|e| CuratorError::config(format!("failed to run git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CuratorError::config(format!(
            "not inside a git worktree: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let root = PathBuf::from(stdout.trim());
    debug!("Discovered library root at {}", root.display());
    Ok(root)
}

/// Resolves the effective library root.
///
/// An explicit root (e.g. from a CLI flag) wins and must be an existing
/// directory; otherwise the enclosing git worktree is used.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            if !path.is_dir() {
                return Err(CuratorError::config(format!(
                    "root is not a directory: {}",
                    path.display()
                )));
            }
            Ok(path.to_path_buf())
        }
        None => discover_root(),
    }
}

/// Renders `path` relative to `root` with forward slashes.
///
/// Paths outside the root are rendered as-is. Forward slashes keep reports
/// and aggregated documents byte-identical across platforms.
pub fn relative_unix_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}
