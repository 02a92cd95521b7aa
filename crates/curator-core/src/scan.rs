//! Library tree scanning.
//!
//! Walks the library root once and classifies every file that participates
//! in reconciliation: primary files (notebooks and synthesis models) and
//! metadata companions. Excluded directories are pruned from the walk.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::companion;
use crate::config::{ReconcileConfig, TimeoutDefaults};
use crate::error::{CuratorError, Result};

// ========================================
// File Kinds
// ========================================

/// The two kinds of primary file the library curates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    /// Jupyter notebook, `.ipynb`.
    Notebook,
    /// Synthesis model, `.qmod`.
    Model,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Notebook => "notebook",
            FileKind::Model => "model",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Notebook => "ipynb",
            FileKind::Model => "qmod",
        }
    }

    /// Registry timeout applied when a file of this kind has no entry yet.
    pub fn default_timeout_seconds(&self) -> u64 {
        match self {
            FileKind::Notebook => TimeoutDefaults::NOTEBOOK_SECONDS,
            FileKind::Model => TimeoutDefaults::MODEL_SECONDS,
        }
    }

    /// Classifies a path by extension. Returns `None` for anything that is
    /// not a primary file.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ipynb" => Some(FileKind::Notebook),
            "qmod" => Some(FileKind::Model),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ========================================
// Primary Files
// ========================================

/// One notebook or model discovered in the tree.
#[derive(Debug, Clone)]
pub struct PrimaryFile {
    /// Absolute path.
    pub path: PathBuf,
    pub kind: FileKind,
}

impl PrimaryFile {
    /// File name with extension, e.g. `grover.ipynb`.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// File name without extension, e.g. `grover`.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

// ========================================
// Scanning
// ========================================

fn walk(root: &Path, config: &ReconcileConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CuratorError::config(format!(
            "library root does not exist: {}",
            root.display()
        )));
    }

    let root_owned = root.to_path_buf();
    let config_owned = config.clone();
    let files = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            let rel = entry
                .path()
                .strip_prefix(&root_owned)
                .unwrap_or_else(|_| entry.path());
            !(entry.file_type().is_dir() && config_owned.excludes_path(rel))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    Ok(files)
}

/// Collects every notebook and model under `root`, in path order.
///
/// Excluded directories are pruned and ignored basenames skipped.
pub fn scan_primaries(root: &Path, config: &ReconcileConfig) -> Result<Vec<PrimaryFile>> {
    let primaries = walk(root, config)?
        .into_iter()
        .filter_map(|path| FileKind::from_path(&path).map(|kind| PrimaryFile { path, kind }))
        .filter(|primary| !config.ignores_basename(&primary.basename()))
        .collect();
    Ok(primaries)
}

/// Collects every metadata companion under `root`, in path order.
pub fn scan_companions(root: &Path, config: &ReconcileConfig) -> Result<Vec<PathBuf>> {
    let companions = walk(root, config)?
        .into_iter()
        .filter(|path| companion::is_companion(path))
        .collect();
    Ok(companions)
}
