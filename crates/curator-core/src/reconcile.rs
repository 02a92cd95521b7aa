//! Per-file metadata reconciliation.
//!
//! For every primary file the reconciler derives the companion path and
//! walks a fixed stage order, each stage assuming the previous one's
//! invariant already holds:
//!
//! 1. Existence: the companion must exist (auto-fix synthesizes it from
//!    schema defaults).
//! 2. Extra fields: keys outside the schema (auto-fix removes them).
//! 3. Missing fields: schema fields with a derivable default that are
//!    absent (auto-fix inserts them).
//! 4. Type/value validation: never auto-fixed, only reported.
//!
//! The on-disk record is reloaded after every mutating stage so later
//! stages see what was actually written. Every fix is reported as a
//! problem: a repairing run fails and the next run confirms convergence.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::companion;
use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::metadata;
use crate::repo;
use crate::report::Report;
use crate::scan::{self, PrimaryFile};
use crate::schema::MetadataSchema;

/// Reconciles companion records against the metadata schema.
pub struct MetadataReconciler<'a> {
    root: &'a Path,
    config: &'a ReconcileConfig,
    schema: MetadataSchema,
}

impl<'a> MetadataReconciler<'a> {
    pub fn new(root: &'a Path, config: &'a ReconcileConfig) -> Self {
        Self {
            root,
            config,
            schema: MetadataSchema::standard(),
        }
    }

    /// Runs per-file reconciliation over the tree.
    ///
    /// With a scope, only primaries whose absolute path is in the set are
    /// reconciled; the scan itself always covers the whole tree.
    pub fn run(&self, scope: Option<&BTreeSet<PathBuf>>) -> Result<Report> {
        let primaries = scan::scan_primaries(self.root, self.config)?;
        let mut report = Report::new();
        for primary in &primaries {
            if scope.is_some_and(|s| !s.contains(&primary.path)) {
                continue;
            }
            self.reconcile_file(primary, &mut report);
        }
        Ok(report)
    }

    fn label(&self, primary: &PrimaryFile) -> String {
        repo::relative_unix_path(self.root, &primary.path)
    }

    /// Reconciles one primary file, converting internal failures into
    /// per-file problems so one bad file never aborts the batch.
    fn reconcile_file(&self, primary: &PrimaryFile, report: &mut Report) {
        debug!("Reconciling {}", primary.path.display());
        if let Err(e) = self.reconcile_file_inner(primary, report) {
            report.add_problem(self.label(primary), format!("reconcile failed: {}", e));
        }
    }

    fn reconcile_file_inner(&self, primary: &PrimaryFile, report: &mut Report) -> Result<()> {
        let label = self.label(primary);
        let companion_path = companion::metadata_path(&primary.path);
        let companion_rel = repo::relative_unix_path(self.root, &companion_path);

        // Stage 1: existence.
        let mut record = match metadata::load_record(&companion_path) {
            Ok(Some(record)) => record,
            Ok(None) => {
                if self.config.auto_fix {
                    let record = self.schema.default_record(primary);
                    metadata::save_record(&companion_path, &record, &self.schema)?;
                    info!("Created {}", companion_path.display());
                    report.add_problem(
                        label,
                        format!("created {} from defaults, stage it for commit", companion_rel),
                    );
                } else {
                    report.add_problem(
                        label,
                        format!("missing metadata file, expected {}", companion_rel),
                    );
                }
                return Ok(());
            }
            Err(e) => {
                report.add_problem(label, format!("could not parse {}: {}", companion_rel, e));
                return Ok(());
            }
        };

        // Stage 2: extra fields. Removal runs before missing-field
        // insertion so a misnamed key is not flagged twice in one pass.
        if self.config.forbid_extra_fields {
            let extras: Vec<String> = record
                .keys()
                .filter(|k| !self.schema.contains(k))
                .cloned()
                .collect();
            if !extras.is_empty() {
                if self.config.auto_fix {
                    for key in &extras {
                        record.remove(key);
                    }
                    metadata::save_record(&companion_path, &record, &self.schema)?;
                    info!("Removed extra fields from {}", companion_path.display());
                    report.add_problem(
                        &label,
                        format!("removed extra fields: {}", extras.join(", ")),
                    );
                    record = self.reload(&companion_path)?;
                } else {
                    report.add_problem(
                        &label,
                        format!("extra fields not in schema: {}", extras.join(", ")),
                    );
                }
            }
        }

        // Stage 3: missing fields. A field counts as missing only when its
        // default is derivable for this primary.
        if self.config.require_all_fields {
            let mut missing: Vec<(&str, Value)> = Vec::new();
            for field in self.schema.fields() {
                if record.contains_key(field.name) {
                    continue;
                }
                if let Some(value) = (field.default)(primary) {
                    missing.push((field.name, value));
                }
            }
            if !missing.is_empty() {
                let names: Vec<&str> = missing.iter().map(|(name, _)| *name).collect();
                if self.config.auto_fix {
                    for (name, value) in missing {
                        record.insert(name.to_string(), value);
                    }
                    metadata::save_record(&companion_path, &record, &self.schema)?;
                    info!("Inserted missing fields into {}", companion_path.display());
                    report.add_problem(
                        &label,
                        format!("inserted missing fields: {}", names.join(", ")),
                    );
                    record = self.reload(&companion_path)?;
                } else {
                    report.add_problem(&label, format!("missing fields: {}", names.join(", ")));
                }
            }
        }

        // Stage 4: type/value validation, report only.
        for field in self.schema.fields() {
            if let Some(value) = record.get(field.name) {
                if let Some(message) = field.check(value) {
                    report.add_problem(&label, message);
                }
            }
        }

        Ok(())
    }

    /// Re-reads a record the previous stage just wrote.
    fn reload(&self, companion_path: &Path) -> Result<Map<String, Value>> {
        Ok(metadata::load_record(companion_path)?.unwrap_or_default())
    }
}

/// Convenience entry: reconcile the whole tree (or a scoped subset) once.
pub fn reconcile_metadata(
    root: &Path,
    config: &ReconcileConfig,
    scope: Option<&BTreeSet<PathBuf>>,
) -> Result<Report> {
    MetadataReconciler::new(root, config).run(scope)
}
