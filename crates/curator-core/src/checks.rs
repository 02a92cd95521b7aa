//! Tree-wide checks.
//!
//! These run once over the full scan, independently of per-file
//! reconciliation: basename uniqueness per kind, the notebook/model
//! same-name convention, and orphaned-companion cleanup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::companion;
use crate::config::ReconcileConfig;
use crate::error::{CuratorError, Result};
use crate::repo;
use crate::report::Report;
use crate::scan::{self, FileKind, PrimaryFile};

/// Flags basenames shared by more than one primary of the same kind.
///
/// Each duplicated basename is reported once, by name; callers wanting the
/// colliding paths re-derive them from a scan.
pub fn check_unique_basenames(primaries: &[PrimaryFile]) -> Report {
    let mut report = Report::new();
    for kind in [FileKind::Notebook, FileKind::Model] {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for primary in primaries.iter().filter(|p| p.kind == kind) {
            *counts.entry(primary.basename()).or_insert(0) += 1;
        }
        for (basename, count) in counts {
            if count > 1 {
                report.add_problem(
                    basename,
                    format!("{} {}s share this basename", count, kind),
                );
            }
        }
    }
    report
}

/// Enforces the same-name convention between a notebook and its model.
///
/// When the subtree under a notebook's directory holds exactly one model,
/// that model must be the notebook's path with only the extension swapped.
/// Zero or several models is ambiguous and not checked; exempt basenames
/// are skipped.
pub fn check_sibling_names(
    root: &Path,
    config: &ReconcileConfig,
    primaries: &[PrimaryFile],
) -> Report {
    let mut report = Report::new();
    for notebook in primaries.iter().filter(|p| p.kind == FileKind::Notebook) {
        if config.sibling_exempt.contains(&notebook.basename()) {
            continue;
        }
        let Some(dir) = notebook.path.parent() else {
            continue;
        };
        let models: Vec<&PrimaryFile> = primaries
            .iter()
            .filter(|p| p.kind == FileKind::Model && p.path.starts_with(dir))
            .collect();
        if models.len() != 1 {
            continue;
        }
        let expected = companion::sibling_with_kind(&notebook.path, FileKind::Model);
        if models[0].path != expected {
            report.add_problem(
                repo::relative_unix_path(root, &notebook.path),
                format!(
                    "model file is {}, expected {}",
                    repo::relative_unix_path(root, &models[0].path),
                    repo::relative_unix_path(root, &expected),
                ),
            );
        }
    }
    report
}

/// Finds companions whose primary file no longer exists.
///
/// Auto-fix deletes the orphan, and its directory too once empty. Deletion
/// failures become per-file problems so the sweep keeps going.
pub fn clean_orphan_companions(root: &Path, config: &ReconcileConfig) -> Result<Report> {
    let mut report = Report::new();
    for companion_path in scan::scan_companions(root, config)? {
        let candidates = companion::primary_candidates(&companion_path);
        if candidates.iter().any(|p| p.is_file()) {
            continue;
        }
        let label = repo::relative_unix_path(root, &companion_path);
        if config.auto_fix {
            match remove_orphan(&companion_path) {
                Ok(()) => {
                    info!("Deleted orphaned companion {}", companion_path.display());
                    report.add_problem(label, "deleted orphaned companion");
                }
                Err(e) => {
                    report.add_problem(label, format!("could not delete orphan: {}", e));
                }
            }
        } else {
            report.add_problem(label, "orphaned companion, no matching primary file");
        }
    }
    Ok(report)
}

fn remove_orphan(companion_path: &Path) -> Result<()> {
    fs::remove_file(companion_path)
        .map_err(|e| CuratorError::io_with_path(e, companion_path))?;
    if let Some(parent) = companion_path.parent() {
        let is_empty = fs::read_dir(parent)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            fs::remove_dir(parent).map_err(|e| CuratorError::io_with_path(e, parent))?;
        }
    }
    Ok(())
}

/// Runs every enabled tree-wide check over one fresh scan.
pub fn run_tree_checks(root: &Path, config: &ReconcileConfig) -> Result<Report> {
    let primaries = scan::scan_primaries(root, config)?;
    let mut report = Report::new();
    if config.check_uniqueness {
        report.merge(check_unique_basenames(&primaries));
    }
    if config.enforce_sibling_names {
        report.merge(check_sibling_names(root, config, &primaries));
    }
    if config.clean_orphans {
        report.merge(clean_orphan_companions(root, config)?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn primaries_of(root: &Path) -> Vec<PrimaryFile> {
        scan::scan_primaries(root, &ReconcileConfig::default()).unwrap()
    }

    #[test]
    fn test_uniqueness_reports_names_not_paths() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a/grover.ipynb"));
        touch(&dir.path().join("b/grover.ipynb"));
        touch(&dir.path().join("c/grover.qmod"));

        let report = check_unique_basenames(&primaries_of(dir.path()));
        let rendered = report.to_string();
        assert!(rendered.contains("grover.ipynb: 1 problem(s)"));
        assert!(rendered.contains("2 notebooks share this basename"));
        // The single model copy is fine; kinds are counted separately.
        assert!(!rendered.contains("grover.qmod"));
        assert!(!rendered.contains("a/"));
    }

    #[test]
    fn test_sibling_mismatch_names_actual_and_expected() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("demo/bar.ipynb"));
        touch(&dir.path().join("demo/bar_v2.qmod"));

        let config = ReconcileConfig::default();
        let report = check_sibling_names(dir.path(), &config, &primaries_of(dir.path()));
        let rendered = report.to_string();
        assert!(rendered.contains("demo/bar.ipynb"));
        assert!(rendered.contains("model file is demo/bar_v2.qmod"));
        assert!(rendered.contains("expected demo/bar.qmod"));
    }

    #[test]
    fn test_sibling_zero_or_many_models_is_exempt() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("none/solo.ipynb"));
        touch(&dir.path().join("many/two.ipynb"));
        touch(&dir.path().join("many/first.qmod"));
        touch(&dir.path().join("many/second.qmod"));

        let config = ReconcileConfig::default();
        let report = check_sibling_names(dir.path(), &config, &primaries_of(dir.path()));
        assert!(report.is_clean(), "{}", report);
    }

    #[test]
    fn test_sibling_exemption_list() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("demo/bar.ipynb"));
        touch(&dir.path().join("demo/bar_v2.qmod"));

        let mut config = ReconcileConfig::default();
        config.sibling_exempt.insert("bar.ipynb".to_string());
        let report = check_sibling_names(dir.path(), &config, &primaries_of(dir.path()));
        assert!(report.is_clean());
    }

    #[test]
    fn test_sibling_model_in_subdirectory_still_counts() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("demo/bar.ipynb"));
        touch(&dir.path().join("demo/models/bar.qmod"));

        let config = ReconcileConfig::default();
        let report = check_sibling_names(dir.path(), &config, &primaries_of(dir.path()));
        // Exactly one model under demo/, but not at the swapped path.
        assert!(!report.is_clean());
        assert!(report.to_string().contains("expected demo/bar.qmod"));
    }

    #[test]
    fn test_orphan_reported_without_fix() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("gone.metadata.json"));

        let config = ReconcileConfig::default();
        let report = clean_orphan_companions(dir.path(), &config).unwrap();
        assert!(report.to_string().contains("orphaned companion"));
        assert!(dir.path().join("gone.metadata.json").exists());
    }

    #[test]
    fn test_orphan_deleted_with_fix_and_empty_dir_removed() {
        let dir = TempDir::new().unwrap();
        let orphan = dir.path().join("old/gone.metadata.json");
        touch(&orphan);
        touch(&dir.path().join("live.qmod"));
        touch(&dir.path().join("live.metadata.json"));

        let config = ReconcileConfig::fixing();
        let report = clean_orphan_companions(dir.path(), &config).unwrap();
        assert!(!report.is_clean());
        assert!(!orphan.exists());
        assert!(!dir.path().join("old").exists());
        // A companion with a live primary is untouched.
        assert!(dir.path().join("live.metadata.json").exists());

        let second = clean_orphan_companions(dir.path(), &config).unwrap();
        assert!(second.is_clean());
    }

    #[test]
    #[cfg(unix)]
    fn test_orphan_dir_removal_failure_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let orphan = dir.path().join("old/gone.metadata.json");
        touch(&orphan);

        // Removing old/ needs write permission on its parent.
        let mut readonly = fs::metadata(dir.path()).unwrap().permissions();
        readonly.set_mode(0o555);
        fs::set_permissions(dir.path(), readonly).unwrap();
        if fs::File::create(dir.path().join("writable_check")).is_ok() {
            // Permission bits are not enforced for this user.
            return;
        }

        let config = ReconcileConfig::fixing();
        let report = clean_orphan_companions(dir.path(), &config).unwrap();

        let mut writable = fs::metadata(dir.path()).unwrap().permissions();
        writable.set_mode(0o755);
        fs::set_permissions(dir.path(), writable).unwrap();

        assert!(!report.is_clean());
        assert!(report.to_string().contains("could not delete orphan"));
        // The companion itself was removed; the directory survived.
        assert!(!orphan.exists());
        assert!(dir.path().join("old").exists());
    }

    #[test]
    fn test_orphan_spared_by_either_primary_suffix() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("nb_only.ipynb"));
        touch(&dir.path().join("nb_only.metadata.json"));
        touch(&dir.path().join("model_only.qmod"));
        touch(&dir.path().join("model_only.metadata.json"));

        let config = ReconcileConfig::fixing();
        let report = clean_orphan_companions(dir.path(), &config).unwrap();
        assert!(report.is_clean(), "{}", report);
    }

    #[test]
    fn test_run_tree_checks_merges_everything() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a/dup.ipynb"));
        touch(&dir.path().join("b/dup.ipynb"));
        touch(&dir.path().join("stale.metadata.json"));

        let config = ReconcileConfig::default();
        let report = run_tree_checks(dir.path(), &config).unwrap();
        let rendered = report.to_string();
        assert!(rendered.contains("share this basename"));
        assert!(rendered.contains("orphaned companion"));
    }
}
