//! Configuration for reconciliation passes.
//!
//! All toggles travel in an explicit [`ReconcileConfig`] value passed into
//! each pass, so tests can exercise several postures side by side. Fixed
//! repository paths and default timeouts live in const holders.

use std::collections::BTreeSet;
use std::path::Path;

/// Well-known paths and filenames inside the library tree.
pub struct LibraryPaths;

impl LibraryPaths {
    /// Timeout registry, relative to the library root.
    pub const TIMEOUTS_FILE: &'static str = "tests/resources/timeouts.yaml";
    /// Default output of the unified metadata aggregation.
    pub const UNIFIED_METADATA_FILENAME: &'static str = "unified_metadata.json";
}

/// Default registry timeouts inserted for uncovered files, per kind.
pub struct TimeoutDefaults;

impl TimeoutDefaults {
    pub const NOTEBOOK_SECONDS: u64 = 900;
    pub const MODEL_SECONDS: u64 = 300;
}

/// Toggle set for one reconciliation invocation.
///
/// The default posture is the strict pre-commit one: every check enabled,
/// no auto-fix. Callers flip `auto_fix` for repair runs.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Mutate companions/registry to the expected shape instead of only
    /// reporting. Repairs still fail the run, forcing a confirming re-run.
    pub auto_fix: bool,
    /// Treat metadata keys outside the schema as violations.
    pub forbid_extra_fields: bool,
    /// Treat absent required schema fields as violations.
    pub require_all_fields: bool,
    /// Enforce the notebook/model same-basename convention.
    pub enforce_sibling_names: bool,
    /// Enforce tree-wide basename uniqueness per kind.
    pub check_uniqueness: bool,
    /// Detect (and under auto-fix delete) companions without a primary.
    pub clean_orphans: bool,
    /// Directory segments pruned from every scan.
    pub excluded_dirs: BTreeSet<String>,
    /// Basenames that never need a companion and are skipped entirely.
    pub ignored_basenames: BTreeSet<String>,
    /// Basenames exempt from the same-basename convention.
    pub sibling_exempt: BTreeSet<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            auto_fix: false,
            forbid_extra_fields: true,
            require_all_fields: true,
            enforce_sibling_names: true,
            check_uniqueness: true,
            clean_orphans: true,
            excluded_dirs: [".git", ".ipynb_checkpoints", "generated_declarations"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_basenames: BTreeSet::new(),
            sibling_exempt: BTreeSet::new(),
        }
    }
}

impl ReconcileConfig {
    /// The default posture with auto-fix flipped on.
    pub fn fixing() -> Self {
        Self {
            auto_fix: true,
            ..Self::default()
        }
    }

    /// True when any path component matches an excluded directory segment.
    pub fn excludes_path(&self, path: &Path) -> bool {
        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|segment| self.excluded_dirs.contains(segment))
        })
    }

    /// True when the basename is configured to never need a companion.
    pub fn ignores_basename(&self, basename: &str) -> bool {
        self.ignored_basenames.contains(basename)
    }
}
