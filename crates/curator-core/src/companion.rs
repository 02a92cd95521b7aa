//! Mapping between primary files and their metadata companions.
//!
//! Every notebook or model `<stem>.<ext>` owns exactly one companion
//! `<stem>.metadata.json` in the same directory. These helpers translate
//! between the two without touching the filesystem.

use std::path::{Path, PathBuf};

use crate::scan::FileKind;

/// Suffix identifying a metadata companion.
pub const METADATA_SUFFIX: &str = ".metadata.json";

/// True when the file name carries the companion suffix.
pub fn is_companion(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.ends_with(METADATA_SUFFIX))
}

/// Companion path for a primary file, e.g. `grover.ipynb` to
/// `grover.metadata.json`.
pub fn metadata_path(primary: &Path) -> PathBuf {
    primary.with_extension("metadata.json")
}

/// The stem a companion claims, e.g. `grover.metadata.json` to `grover`.
///
/// Returns `None` when the path is not a companion.
pub fn companion_stem(companion: &Path) -> Option<String> {
    let name = companion.file_name()?.to_str()?;
    name.strip_suffix(METADATA_SUFFIX).map(|s| s.to_string())
}

/// The primary files a companion could belong to, notebook first.
///
/// A companion is an orphan exactly when none of these paths exist.
pub fn primary_candidates(companion: &Path) -> Vec<PathBuf> {
    let Some(stem) = companion_stem(companion) else {
        return Vec::new();
    };
    [FileKind::Notebook, FileKind::Model]
        .iter()
        .map(|kind| companion.with_file_name(format!("{}.{}", stem, kind.extension())))
        .collect()
}

/// Path of the sibling of `primary` with the given kind and the same stem.
pub fn sibling_with_kind(primary: &Path, kind: FileKind) -> PathBuf {
    primary.with_extension(kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_path_swaps_extension() {
        assert_eq!(
            metadata_path(Path::new("algos/grover.ipynb")),
            PathBuf::from("algos/grover.metadata.json")
        );
        assert_eq!(
            metadata_path(Path::new("algos/grover.qmod")),
            PathBuf::from("algos/grover.metadata.json")
        );
    }

    #[test]
    fn test_is_companion() {
        assert!(is_companion(Path::new("a/grover.metadata.json")));
        assert!(!is_companion(Path::new("a/grover.synthesis_options.json")));
        assert!(!is_companion(Path::new("unified_metadata.json")));
    }

    #[test]
    fn test_companion_stem() {
        assert_eq!(
            companion_stem(Path::new("a/grover.metadata.json")),
            Some("grover".to_string())
        );
        assert_eq!(companion_stem(Path::new("a/grover.ipynb")), None);
    }

    #[test]
    fn test_primary_candidates_round_trip() {
        let primary = Path::new("algos/shor.qmod");
        let companion = metadata_path(primary);
        let candidates = primary_candidates(&companion);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.contains(&primary.to_path_buf()));
        assert_eq!(candidates[0], PathBuf::from("algos/shor.ipynb"));
    }

    #[test]
    fn test_sibling_with_kind() {
        assert_eq!(
            sibling_with_kind(Path::new("a/grover.ipynb"), FileKind::Model),
            PathBuf::from("a/grover.qmod")
        );
    }
}
