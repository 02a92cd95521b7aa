//! Companion record persistence.
//!
//! A companion record is a flat JSON object keyed by schema field names.
//! Records are loaded as ordered maps and always written back with keys in
//! schema order, through the atomic writer.

mod atomic;

pub use atomic::{read_json, write_json, write_text};

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::schema::MetadataSchema;

/// Loads a companion record.
///
/// Returns `None` when the companion does not exist. A companion that exists
/// but is not a JSON object is a parse error for the caller to report
/// against that file.
pub fn load_record(path: &Path) -> Result<Option<Map<String, Value>>> {
    atomic::read_json(path)
}

/// Writes a companion record with keys in schema order.
pub fn save_record(
    path: &Path,
    record: &Map<String, Value>,
    schema: &MetadataSchema,
) -> Result<()> {
    let ordered = schema.order_record(record);
    atomic::write_json(path, &ordered)
}
