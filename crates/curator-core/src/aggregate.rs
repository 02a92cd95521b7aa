//! Unified metadata aggregation.
//!
//! A read-only consumer of companion records: walks a subtree, resolves
//! every companion to its model file, injects the model's relative `path`
//! and its `qmod_dialect` when absent, and writes the whole collection as
//! one pretty-printed JSON array. A companion without a model file is
//! fatal here, since the dialect cannot be determined.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::companion;
use crate::config::{LibraryPaths, ReconcileConfig};
use crate::content;
use crate::error::{CuratorError, Result};
use crate::metadata;
use crate::repo;
use crate::scan::{self, FileKind};

/// Where to scan and where to write.
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Subtree to aggregate; the library root when absent.
    pub dir: Option<PathBuf>,
    /// Output file; `unified_metadata.json` inside the scanned subtree
    /// when absent.
    pub output: Option<PathBuf>,
}

/// Outcome of one aggregation run.
#[derive(Debug)]
pub struct AggregateSummary {
    pub output: PathBuf,
    pub records: usize,
}

/// Aggregates every companion under the chosen subtree into one document.
pub fn aggregate_metadata(
    root: &Path,
    config: &ReconcileConfig,
    options: &AggregateOptions,
) -> Result<AggregateSummary> {
    let scan_dir = options.dir.clone().unwrap_or_else(|| root.to_path_buf());
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| scan_dir.join(LibraryPaths::UNIFIED_METADATA_FILENAME));
    let mut records: Vec<(String, Value)> = Vec::new();
    for companion_path in scan::scan_companions(&scan_dir, config)? {
        if is_same_file(&companion_path, &output) {
            continue;
        }

        let model = companion_path.with_file_name(format!(
            "{}.{}",
            companion::companion_stem(&companion_path).unwrap_or_default(),
            FileKind::Model.extension()
        ));
        if !model.is_file() {
            return Err(CuratorError::config(format!(
                "no model file for {}, expected {}",
                companion_path.display(),
                model.display()
            )));
        }

        let mut record = metadata::load_record(&companion_path)?.ok_or_else(|| {
            CuratorError::config(format!("companion vanished: {}", companion_path.display()))
        })?;

        let model_rel = repo::relative_unix_path(&scan_dir, &model);
        record.insert("path".to_string(), Value::String(model_rel.clone()));
        if !record.contains_key("qmod_dialect") {
            let dialect = content::probe_dialect(&model)?;
            record.insert(
                "qmod_dialect".to_string(),
                Value::String(dialect.as_str().to_string()),
            );
        }
        records.push((model_rel, Value::Object(record)));
    }

    records.sort_by(|a, b| a.0.cmp(&b.0));
    let document: Vec<Value> = records.into_iter().map(|(_, record)| record).collect();
    let count = document.len();
    metadata::write_json(&output, &document)?;
    info!("Aggregated {} records into {}", count, output.display());

    Ok(AggregateSummary {
        output,
        records: count,
    })
}

/// Whether two paths name the same file, tolerating relative/absolute
/// spellings. The output file may not exist yet, so its parent directory
/// is canonicalized instead of the path itself.
fn is_same_file(candidate: &Path, output: &Path) -> bool {
    if candidate.file_name() != output.file_name() {
        return false;
    }
    let canonical_parent = |p: &Path| p.parent().and_then(|d| d.canonicalize().ok());
    match (canonical_parent(candidate), canonical_parent(output)) {
        (Some(a), Some(b)) => a == b,
        _ => candidate == output,
    }
}
