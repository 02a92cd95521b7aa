//! Curator Core - reconciliation engine for a curated library of quantum
//! example notebooks.
//!
//! Every notebook and synthesis model in the library owns a metadata
//! companion and a timeout-registry entry. This crate scans the tree,
//! compares what exists against what the schema and registry expect, and
//! either reports each discrepancy or repairs it in place. Repairs are
//! never silent: a run that fixed something still fails, and the next run
//! confirms convergence.
//!
//! # Example
//!
//! ```rust,ignore
//! use curator_core::{Curator, ReconcileConfig};
//!
//! fn main() -> curator_core::Result<()> {
//!     let curator = Curator::new("/path/to/library", ReconcileConfig::fixing())?;
//!     let report = curator.check_all(None)?;
//!     if !report.is_clean() {
//!         eprintln!("{}", report);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod checks;
pub mod companion;
pub mod config;
pub mod content;
pub mod error;
pub mod metadata;
pub mod reconcile;
pub mod repo;
pub mod report;
pub mod scan;
pub mod schema;
pub mod timeouts;

// Re-export commonly used types
pub use aggregate::{aggregate_metadata, AggregateOptions, AggregateSummary};
pub use checks::run_tree_checks;
pub use config::{LibraryPaths, ReconcileConfig, TimeoutDefaults};
pub use content::QmodDialect;
pub use error::{CuratorError, Result};
pub use reconcile::{reconcile_metadata, MetadataReconciler};
pub use report::Report;
pub use scan::{FileKind, PrimaryFile};
pub use schema::{FieldKind, FieldSpec, MetadataSchema};
pub use timeouts::{reconcile_timeouts, TimeoutRegistry};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Entry point bundling a library root with one reconciliation posture.
///
/// Thin sugar over the module-level functions, for callers that run
/// several passes against the same tree.
pub struct Curator {
    root: PathBuf,
    config: ReconcileConfig,
}

impl Curator {
    /// Binds a library root to a configuration.
    ///
    /// The root must be an existing directory.
    pub fn new(root: impl Into<PathBuf>, config: ReconcileConfig) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CuratorError::config(format!(
                "library root does not exist: {}",
                root.display()
            )));
        }
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Per-file metadata reconciliation, optionally scoped.
    pub fn reconcile_metadata(&self, scope: Option<&BTreeSet<PathBuf>>) -> Result<Report> {
        reconcile::reconcile_metadata(&self.root, &self.config, scope)
    }

    /// Uniqueness, sibling-naming, and orphan checks over the full tree.
    pub fn tree_checks(&self) -> Result<Report> {
        checks::run_tree_checks(&self.root, &self.config)
    }

    /// Timeout-registry reconciliation, coverage optionally scoped.
    pub fn reconcile_timeouts(&self, scope: Option<&BTreeSet<PathBuf>>) -> Result<Report> {
        timeouts::reconcile_timeouts(&self.root, &self.config, scope)
    }

    /// Unified metadata aggregation.
    pub fn aggregate(&self, options: &AggregateOptions) -> Result<AggregateSummary> {
        aggregate::aggregate_metadata(&self.root, &self.config, options)
    }

    /// Every reconciliation pass in one run. Tree-wide checks always cover
    /// the whole tree even when the per-file passes are scoped.
    pub fn check_all(&self, scope: Option<&BTreeSet<PathBuf>>) -> Result<Report> {
        let mut report = self.reconcile_metadata(scope)?;
        report.merge(self.tree_checks()?);
        report.merge(self.reconcile_timeouts(scope)?);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_curator_requires_existing_root() {
        let result = Curator::new("/no/such/library", ReconcileConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_check_all_converges_under_fix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("demo.ipynb"), r#"{"cells": []}"#).unwrap();
        fs::write(dir.path().join("demo.qmod"), "qfunc main() {}").unwrap();

        let curator = Curator::new(dir.path(), ReconcileConfig::fixing()).unwrap();
        let first = curator.check_all(None).unwrap();
        assert!(!first.is_clean());

        let second = curator.check_all(None).unwrap();
        assert!(second.is_clean(), "second run: {}", second);
    }

    #[test]
    fn test_check_all_reports_everything_without_fix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("demo.ipynb"), r#"{"cells": []}"#).unwrap();
        fs::write(dir.path().join("gone.metadata.json"), "{}").unwrap();

        let curator = Curator::new(dir.path(), ReconcileConfig::default()).unwrap();
        let report = curator.check_all(None).unwrap();
        let rendered = report.to_string();
        assert!(rendered.contains("missing metadata file"));
        assert!(rendered.contains("orphaned companion"));
        assert!(rendered.contains("no timeout entry"));
        // Nothing was touched.
        assert!(dir.path().join("gone.metadata.json").exists());
        assert!(!dir.path().join("demo.metadata.json").exists());
    }
}
