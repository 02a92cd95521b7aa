//! Content probing for default metadata values.
//!
//! Default generators look inside primary files: a notebook's first markdown
//! heading becomes its title, and a model's text decides its dialect. Probes
//! used for defaults are tolerant of malformed content; the strict variants
//! used by aggregation propagate errors instead.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::companion;
use crate::error::{CuratorError, Result};
use crate::scan::{FileKind, PrimaryFile};

// ========================================
// Model Dialects
// ========================================

/// Serialization dialect of a synthesis model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QmodDialect {
    /// The model body is a JSON document.
    Json,
    /// The model body is standalone model-language text.
    Standalone,
}

impl QmodDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            QmodDialect::Json => "json",
            QmodDialect::Standalone => "standalone",
        }
    }
}

impl fmt::Display for QmodDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides the dialect of a model file by inspecting its content.
///
/// A body that starts with `{` and parses as JSON is the JSON dialect;
/// anything else is standalone. Read failures propagate so callers that
/// require a model file (aggregation) can abort.
pub fn probe_dialect(model: &Path) -> Result<QmodDialect> {
    let content =
        fs::read_to_string(model).map_err(|e| CuratorError::io_with_path(e, model))?;
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') && serde_json::from_str::<Value>(trimmed).is_ok() {
        Ok(QmodDialect::Json)
    } else {
        Ok(QmodDialect::Standalone)
    }
}

/// Dialect for a primary file, or `None` when it cannot be determined.
///
/// Models are probed directly. Notebooks are probed through their same-stem
/// model sibling; a notebook without one has no dialect.
pub fn dialect_for_primary(primary: &PrimaryFile) -> Option<QmodDialect> {
    let model = match primary.kind {
        FileKind::Model => primary.path.clone(),
        FileKind::Notebook => {
            let sibling = companion::sibling_with_kind(&primary.path, FileKind::Model);
            if !sibling.is_file() {
                return None;
            }
            sibling
        }
    };
    match probe_dialect(&model) {
        Ok(dialect) => Some(dialect),
        Err(e) => {
            debug!("Could not probe dialect of {}: {}", model.display(), e);
            None
        }
    }
}

// ========================================
// Titles
// ========================================

/// Regex for a non-empty markdown heading line.
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#+\s*(\S.*?)\s*$").unwrap());

/// First markdown heading of a notebook, with the hash prefix stripped.
///
/// Tolerant of malformed notebooks: any read or parse failure yields `None`
/// so the caller can fall back to a name-derived title.
pub fn first_markdown_heading(notebook: &Path) -> Option<String> {
    let content = fs::read_to_string(notebook).ok()?;
    let value: Value = serde_json::from_str(&content).ok()?;
    let cells = value.get("cells")?.as_array()?;

    for cell in cells {
        if cell.get("cell_type").and_then(Value::as_str) != Some("markdown") {
            continue;
        }
        let source = cell.get("source")?;
        let text = match source {
            Value::String(s) => s.clone(),
            Value::Array(lines) => lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(""),
            _ => continue,
        };
        for line in text.lines() {
            if let Some(captures) = HEADING.captures(line) {
                return Some(captures[1].to_string());
            }
        }
    }
    None
}

/// Title-cases an underscore-separated stem, e.g. `grover_search` to
/// `Grover Search`.
pub fn title_from_stem(stem: &str) -> String {
    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Default title for a primary file.
///
/// Notebooks prefer their first markdown heading; models and heading-less
/// notebooks fall back to the title-cased stem.
pub fn default_title(primary: &PrimaryFile) -> String {
    if primary.kind == FileKind::Notebook {
        if let Some(heading) = first_markdown_heading(&primary.path) {
            return heading;
        }
    }
    title_from_stem(&primary.stem())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_notebook(dir: &Path, name: &str, markdown: &[&str]) -> PathBuf {
        let cells: Vec<Value> = markdown
            .iter()
            .map(|text| {
                serde_json::json!({
                    "cell_type": "markdown",
                    "source": [text],
                })
            })
            .collect();
        let notebook = serde_json::json!({ "cells": cells, "nbformat": 4 });
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(&notebook).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_title_from_stem() {
        assert_eq!(title_from_stem("foo"), "Foo");
        assert_eq!(title_from_stem("grover_search"), "Grover Search");
        assert_eq!(title_from_stem("vqe__h2"), "Vqe H2");
    }

    #[test]
    fn test_first_markdown_heading() {
        let dir = TempDir::new().unwrap();
        let path = write_notebook(
            dir.path(),
            "demo.ipynb",
            &["plain prose\n", "## Grover on 3 Qubits\n"],
        );
        assert_eq!(
            first_markdown_heading(&path),
            Some("Grover on 3 Qubits".to_string())
        );
    }

    #[test]
    fn test_first_markdown_heading_missing() {
        let dir = TempDir::new().unwrap();
        let path = write_notebook(dir.path(), "demo.ipynb", &["no headings here\n"]);
        assert_eq!(first_markdown_heading(&path), None);

        let malformed = dir.path().join("broken.ipynb");
        fs::write(&malformed, "not json").unwrap();
        assert_eq!(first_markdown_heading(&malformed), None);
    }

    #[test]
    fn test_default_title_falls_back_to_stem() {
        let dir = TempDir::new().unwrap();
        let path = write_notebook(dir.path(), "foo.ipynb", &[]);
        let primary = PrimaryFile {
            path,
            kind: FileKind::Notebook,
        };
        assert_eq!(default_title(&primary), "Foo");
    }

    #[test]
    fn test_probe_dialect() {
        let dir = TempDir::new().unwrap();
        let json_model = dir.path().join("a.qmod");
        fs::write(&json_model, "  {\"functions\": []}").unwrap();
        assert_eq!(probe_dialect(&json_model).unwrap(), QmodDialect::Json);

        let native_model = dir.path().join("b.qmod");
        fs::write(&native_model, "qfunc main() {}").unwrap();
        assert_eq!(probe_dialect(&native_model).unwrap(), QmodDialect::Standalone);

        // Starts with a brace but is not valid JSON.
        let odd_model = dir.path().join("c.qmod");
        fs::write(&odd_model, "{ not json").unwrap();
        assert_eq!(probe_dialect(&odd_model).unwrap(), QmodDialect::Standalone);
    }

    #[test]
    fn test_dialect_for_notebook_uses_model_sibling() {
        let dir = TempDir::new().unwrap();
        let notebook = write_notebook(dir.path(), "demo.ipynb", &[]);
        let primary = PrimaryFile {
            path: notebook,
            kind: FileKind::Notebook,
        };
        assert_eq!(dialect_for_primary(&primary), None);

        fs::write(dir.path().join("demo.qmod"), "{}").unwrap();
        assert_eq!(dialect_for_primary(&primary), Some(QmodDialect::Json));
    }
}
