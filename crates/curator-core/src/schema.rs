//! The metadata field schema.
//!
//! The ordered [`FieldSpec`] list is the single source of truth for what a
//! valid companion record looks like. Keys outside it are extra; absent keys
//! with a derivable default are missing. Companions are always written with
//! keys in schema order.

use serde_json::{Map, Value};

use crate::content;
use crate::scan::PrimaryFile;

/// Allowed `tags` values.
pub const TAG_VOCABULARY: &[&str] = &[
    "algorithms",
    "applications",
    "tutorials",
    "chemistry",
    "finance",
    "optimization",
    "machine-learning",
];

/// Allowed `level` values.
pub const LEVEL_VOCABULARY: &[&str] = &["beginner", "intermediate", "advanced"];

/// Allowed `qmod_dialect` values.
pub const DIALECT_VOCABULARY: &[&str] = &["json", "standalone"];

/// Value shape of one metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Scalar string.
    String,
    /// List of strings.
    StringList,
}

/// One entry of the metadata schema.
#[derive(Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Strings only: whether the empty string is a valid value.
    pub allow_empty: bool,
    /// Closed set of allowed values (for lists, allowed elements).
    pub vocabulary: Option<&'static [&'static str]>,
    /// Required fields must be present in every valid record.
    pub required: bool,
    /// Default generator. `None` means the field cannot be derived for this
    /// primary file and is simply left out.
    pub default: fn(&PrimaryFile) -> Option<Value>,
}

impl FieldSpec {
    /// Checks a present value against this spec. Returns a violation
    /// message, or `None` when the value conforms.
    pub fn check(&self, value: &Value) -> Option<String> {
        match self.kind {
            FieldKind::String => {
                let Some(s) = value.as_str() else {
                    return Some(format!(
                        "field '{}' must be a string, got {}",
                        self.name,
                        value_type_name(value)
                    ));
                };
                if s.is_empty() && !self.allow_empty {
                    return Some(format!("field '{}' must not be empty", self.name));
                }
                if let Some(vocabulary) = self.vocabulary {
                    if !vocabulary.contains(&s) {
                        return Some(format!(
                            "field '{}' value '{}' is not one of: {}",
                            self.name,
                            s,
                            vocabulary.join(", ")
                        ));
                    }
                }
                None
            }
            FieldKind::StringList => {
                let Some(items) = value.as_array() else {
                    return Some(format!(
                        "field '{}' must be a list of strings, got {}",
                        self.name,
                        value_type_name(value)
                    ));
                };
                for item in items {
                    let Some(s) = item.as_str() else {
                        return Some(format!(
                            "field '{}' must contain only strings, got {}",
                            self.name,
                            value_type_name(item)
                        ));
                    };
                    if let Some(vocabulary) = self.vocabulary {
                        if !vocabulary.contains(&s) {
                            return Some(format!(
                                "field '{}' value '{}' is not one of: {}",
                                self.name,
                                s,
                                vocabulary.join(", ")
                            ));
                        }
                    }
                }
                None
            }
        }
    }
}

/// Human name of a JSON value's type, for violation messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

// ========================================
// Default Generators
// ========================================

fn default_title(primary: &PrimaryFile) -> Option<Value> {
    Some(Value::String(content::default_title(primary)))
}

fn default_description(_primary: &PrimaryFile) -> Option<Value> {
    Some(Value::String(String::new()))
}

fn default_empty_list(_primary: &PrimaryFile) -> Option<Value> {
    Some(Value::Array(Vec::new()))
}

fn default_dialect(primary: &PrimaryFile) -> Option<Value> {
    content::dialect_for_primary(primary).map(|d| Value::String(d.to_string()))
}

// ========================================
// Schema
// ========================================

/// The ordered metadata schema.
pub struct MetadataSchema {
    fields: Vec<FieldSpec>,
}

impl MetadataSchema {
    /// The schema every companion in the library is reconciled against.
    pub fn standard() -> Self {
        Self {
            fields: vec![
                FieldSpec {
                    name: "title",
                    kind: FieldKind::String,
                    allow_empty: false,
                    vocabulary: None,
                    required: true,
                    default: default_title,
                },
                FieldSpec {
                    name: "description",
                    kind: FieldKind::String,
                    allow_empty: true,
                    vocabulary: None,
                    required: true,
                    default: default_description,
                },
                FieldSpec {
                    name: "tags",
                    kind: FieldKind::StringList,
                    allow_empty: false,
                    vocabulary: Some(TAG_VOCABULARY),
                    required: true,
                    default: default_empty_list,
                },
                FieldSpec {
                    name: "level",
                    kind: FieldKind::StringList,
                    allow_empty: false,
                    vocabulary: Some(LEVEL_VOCABULARY),
                    required: true,
                    default: default_empty_list,
                },
                FieldSpec {
                    name: "qmod_dialect",
                    kind: FieldKind::String,
                    allow_empty: false,
                    vocabulary: Some(DIALECT_VOCABULARY),
                    required: false,
                    default: default_dialect,
                },
            ],
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True when `name` is a schema field.
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Position of a field in schema order; extras sort after all fields.
    pub fn index_of(&self, name: &str) -> usize {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .unwrap_or(self.fields.len())
    }

    /// Builds a complete fresh record for a primary file from defaults.
    ///
    /// Fields whose generator yields nothing (a dialect without a model
    /// file) are left out.
    pub fn default_record(&self, primary: &PrimaryFile) -> Map<String, Value> {
        let mut record = Map::new();
        for field in &self.fields {
            if let Some(value) = (field.default)(primary) {
                record.insert(field.name.to_string(), value);
            }
        }
        record
    }

    /// Reorders a record so schema fields come first in schema order;
    /// non-schema keys keep their relative order at the end.
    pub fn order_record(&self, record: &Map<String, Value>) -> Map<String, Value> {
        let mut keys: Vec<&String> = record.keys().collect();
        keys.sort_by_key(|k| self.index_of(k));
        let mut ordered = Map::new();
        for key in keys {
            if let Some(value) = record.get(key) {
                ordered.insert(key.clone(), value.clone());
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::FileKind;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn spec(name: &str) -> FieldSpec {
        MetadataSchema::standard().field(name).unwrap().clone()
    }

    #[test]
    fn test_schema_order_and_required_set() {
        let schema = MetadataSchema::standard();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec!["title", "description", "tags", "level", "qmod_dialect"]
        );
        let required: Vec<_> = schema
            .fields()
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        assert_eq!(required, vec!["title", "description", "tags", "level"]);
    }

    #[test]
    fn test_string_field_checks() {
        let title = spec("title");
        assert_eq!(title.check(&json!("Grover")), None);
        assert!(title.check(&json!("")).unwrap().contains("must not be empty"));
        assert!(title.check(&json!(7)).unwrap().contains("must be a string"));

        let description = spec("description");
        assert_eq!(description.check(&json!("")), None);
    }

    #[test]
    fn test_list_field_checks() {
        let tags = spec("tags");
        assert_eq!(tags.check(&json!([])), None);
        assert_eq!(tags.check(&json!(["algorithms", "chemistry"])), None);
        assert!(tags
            .check(&json!(["algorithms", "cooking"]))
            .unwrap()
            .contains("'cooking'"));
        assert!(tags.check(&json!("algorithms")).unwrap().contains("list"));
        assert!(tags.check(&json!([1])).unwrap().contains("only strings"));
    }

    #[test]
    fn test_dialect_field_vocabulary() {
        let dialect = spec("qmod_dialect");
        assert_eq!(dialect.check(&json!("json")), None);
        assert_eq!(dialect.check(&json!("standalone")), None);
        assert!(dialect.check(&json!("yaml")).unwrap().contains("not one of"));
    }

    #[test]
    fn test_default_record_for_bare_notebook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.ipynb");
        fs::write(&path, r#"{"cells": []}"#).unwrap();
        let primary = PrimaryFile {
            path,
            kind: FileKind::Notebook,
        };

        let schema = MetadataSchema::standard();
        let record = schema.default_record(&primary);
        assert_eq!(record.get("title"), Some(&json!("Foo")));
        assert_eq!(record.get("description"), Some(&json!("")));
        assert_eq!(record.get("tags"), Some(&json!([])));
        assert_eq!(record.get("level"), Some(&json!([])));
        // No model sibling, so no dialect.
        assert!(!record.contains_key("qmod_dialect"));
    }

    #[test]
    fn test_order_record_sorts_by_schema_index() {
        let schema = MetadataSchema::standard();
        let mut record = Map::new();
        record.insert("tags".to_string(), json!([]));
        record.insert("custom".to_string(), json!(1));
        record.insert("title".to_string(), json!("T"));

        let ordered = schema.order_record(&record);
        let keys: Vec<_> = ordered.keys().cloned().collect();
        assert_eq!(keys, vec!["title", "tags", "custom"]);
    }
}
