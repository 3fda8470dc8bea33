//! Folding partial extraction results together
//!
//! Chunk results and the gap-filling pass all go through [`merge`]: the newest
//! finding wins and "not found" never displaces an earlier finding.

use crate::types::{ExtractionResult, FieldValue, NOT_FOUND};
use immo_domain::FieldSpec;
use serde_json::Value;

/// Whether an extracted value counts as found
pub fn is_found(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => is_meaningful(s),
        Value::Array(items) => !items.is_empty(),
        Value::Object(members) => members.values().any(|member| match member {
            Value::String(s) => is_meaningful(s),
            other => is_meaningful(&other.to_string()),
        }),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

fn is_meaningful(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    !normalized.is_empty() && normalized != NOT_FOUND
}

/// Fold `update` into `base`, keeping only found records from `update`
pub fn merge(mut base: ExtractionResult, update: ExtractionResult) -> ExtractionResult {
    for (path, entry) in update {
        if entry.is_found() {
            base.insert(path, entry);
        }
    }
    base
}

/// Fields with no found record in `result`
pub fn missing_fields(fields: &[FieldSpec], result: &ExtractionResult) -> Vec<FieldSpec> {
    fields
        .iter()
        .filter(|field| !result.get(&field.path).is_some_and(FieldValue::is_found))
        .cloned()
        .collect()
}
