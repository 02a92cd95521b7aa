//! Timeout registry reconciliation.
//!
//! The registry is one flat YAML mapping from root-relative file path to a
//! timeout in seconds, rewritten wholesale on every change and expected to
//! be serialized with sorted keys. Duplicate keys are legal in the text
//! format but collapse when parsed, so the duplicate check tokenizes the
//! raw text before parsing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{LibraryPaths, ReconcileConfig};
use crate::error::{CuratorError, Result};
use crate::metadata;
use crate::repo;
use crate::report::Report;
use crate::scan;

/// The timeout registry and the textual key order it was loaded with.
#[derive(Debug)]
pub struct TimeoutRegistry {
    path: PathBuf,
    entries: BTreeMap<String, serde_yaml::Value>,
    /// Top-level keys in on-disk order at load time, duplicates included.
    loaded_keys: Vec<String>,
}

impl TimeoutRegistry {
    /// Registry location for a library root.
    pub fn registry_path(root: &Path) -> PathBuf {
        root.join(LibraryPaths::TIMEOUTS_FILE)
    }

    /// Loads the registry, treating a missing file as empty.
    ///
    /// Duplicate keys in the text collapse to their last occurrence, the
    /// same way a permissive YAML loader would; the original textual key
    /// order is kept for the duplicate and sort-order checks.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::registry_path(root);
        if !path.exists() {
            return Ok(Self {
                path,
                entries: Default::default(),
                loaded_keys: Vec::new(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|e| CuratorError::io_with_path(e, &path))?;
        let loaded_keys = tokenize_keys(&raw);
        let deduped = strip_shadowed_lines(&raw);
        let entries: BTreeMap<String, serde_yaml::Value> =
            serde_yaml::from_str(&deduped).map_err(|e| CuratorError::Yaml {
                message: format!("Failed to parse {}: {}", path.display(), e),
                source: Some(e),
            })?;
        for (key, value) in &entries {
            let seconds = value.as_f64().ok_or_else(|| CuratorError::Validation {
                field: key.clone(),
                message: "timeout value must be a number of seconds".to_string(),
            })?;
            if seconds < 0.0 {
                return Err(CuratorError::Validation {
                    field: key.clone(),
                    message: format!("timeout value must not be negative, got {}", seconds),
                });
            }
        }
        debug!("Loaded {} timeout entries", loaded_keys.len());
        Ok(Self {
            path,
            entries,
            loaded_keys,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Timeout in seconds, if the entry exists and is numeric.
    pub fn seconds(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(|v| v.as_f64())
    }

    /// Inserts an integral timeout; integral values serialize as integers.
    pub fn insert_seconds(&mut self, key: impl Into<String>, seconds: u64) {
        self.entries
            .insert(key.into(), serde_yaml::Value::Number(seconds.into()));
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys that appeared more than once in the loaded text, each once.
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for key in &self.loaded_keys {
            *counts.entry(key).or_insert(0) += 1;
        }
        let mut duplicates: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key.to_string())
            .collect();
        duplicates.sort();
        duplicates
    }

    /// Whether the loaded text already had lexicographically sorted keys.
    pub fn is_sorted_on_disk(&self) -> bool {
        self.loaded_keys.windows(2).all(|w| w[0] <= w[1])
    }

    /// Rewrites the registry with sorted keys, atomically.
    pub fn persist(&self) -> Result<()> {
        let serialized =
            serde_yaml::to_string(&self.entries).map_err(|e| CuratorError::Yaml {
                message: format!("Failed to serialize {}", self.path.display()),
                source: Some(e),
            })?;
        metadata::write_text(&self.path, &serialized)
    }
}

/// Top-level mapping keys of a flat YAML document, in textual order.
fn tokenize_keys(raw: &str) -> Vec<String> {
    raw.lines().filter_map(line_key).collect()
}

fn line_key(line: &str) -> Option<String> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return None;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (key, _) = trimmed.split_once(':')?;
    let key = key.trim();
    let key = key
        .strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .or_else(|| key.strip_prefix('\'').and_then(|k| k.strip_suffix('\'')))
        .unwrap_or(key);
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Drops all but the last line for each duplicated key so a strict parser
/// accepts the document with the same collapse a permissive one applies.
fn strip_shadowed_lines(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let keys: Vec<Option<String>> = lines.iter().map(|l| line_key(l)).collect();
    let mut last_index: HashMap<&str, usize> = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
        if let Some(key) = key {
            last_index.insert(key.as_str(), i);
        }
    }
    let mut kept = String::new();
    for (i, line) in lines.iter().enumerate() {
        let shadowed = keys[i]
            .as_ref()
            .is_some_and(|key| last_index.get(key.as_str()) != Some(&i));
        if !shadowed {
            kept.push_str(line);
            kept.push('\n');
        }
    }
    kept
}

/// Runs every registry check: coverage, staleness, duplicates, sort order.
///
/// Coverage honors the scope; the registry-wide checks never do. The
/// duplicate and sort-order views reflect the text as loaded, so a fix
/// applied by an earlier check cannot mask them within the same run.
pub fn reconcile_timeouts(
    root: &Path,
    config: &ReconcileConfig,
    scope: Option<&BTreeSet<PathBuf>>,
) -> Result<Report> {
    let registry_label = LibraryPaths::TIMEOUTS_FILE;
    let mut registry = TimeoutRegistry::load(root)?;
    let mut report = Report::new();

    // Coverage: every in-scope primary needs an entry.
    let primaries = scan::scan_primaries(root, config)?;
    let mut inserted = false;
    for primary in &primaries {
        if scope.is_some_and(|s| !s.contains(&primary.path)) {
            continue;
        }
        let key = repo::relative_unix_path(root, &primary.path);
        if registry.contains(&key) {
            continue;
        }
        if config.auto_fix {
            let seconds = primary.kind.default_timeout_seconds();
            registry.insert_seconds(key.clone(), seconds);
            inserted = true;
            report.add_problem(
                key,
                format!("added timeout entry with default {}s", seconds),
            );
        } else {
            report.add_problem(key, "no timeout entry for this file");
        }
    }
    if inserted {
        registry.persist()?;
        info!("Appended missing timeout entries");
    }

    // Staleness: every key must resolve to an existing file.
    let stale: Vec<String> = registry
        .keys()
        .filter(|key| !root.join(key).is_file())
        .cloned()
        .collect();
    if !stale.is_empty() {
        for key in &stale {
            if config.auto_fix {
                report.add_problem(key.clone(), "removed stale timeout entry");
            } else {
                report.add_problem(key.clone(), "timeout entry for a missing file");
            }
        }
        if config.auto_fix {
            for key in &stale {
                registry.remove(key);
            }
            registry.persist()?;
            info!("Removed {} stale timeout entries", stale.len());
        }
    }

    // Duplicate keys, from the raw text.
    let duplicates = registry.duplicate_keys();
    if !duplicates.is_empty() {
        for key in &duplicates {
            if config.auto_fix {
                report.add_problem(registry_label, format!("collapsed duplicate key '{}'", key));
            } else {
                report.add_problem(registry_label, format!("duplicate key '{}'", key));
            }
        }
        if config.auto_fix {
            registry.persist()?;
        }
    }

    // Sort order of the loaded text.
    if !registry.is_sorted_on_disk() {
        if config.auto_fix {
            registry.persist()?;
            report.add_problem(registry_label, "re-sorted registry keys");
        } else {
            report.add_problem(registry_label, "keys are not sorted");
        }
    }

    Ok(report)
}
