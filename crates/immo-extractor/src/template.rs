//! Extraction templates
//!
//! A template is a nested JSON object. Leaves carrying an `expected_type`
//! key are the fields to extract; the fill step replaces them with
//! `{value, source: {page, excerpt}}` records. The top-level `meta` section
//! describes the source file and is never sent to the LLM.

use crate::error::ExtractorError;
use crate::types::{ExtractionResult, FieldValue, NOT_FOUND};
use immo_domain::FieldSpec;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reserved top-level section holding file metadata
pub const META_KEY: &str = "meta";

/// Key marking a template leaf as a field to extract
pub const EXPECTED_TYPE_KEY: &str = "expected_type";

/// A JSON extraction template, filled in place
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: Map<String, Value>,
}

impl Template {
    /// Wrap a JSON value; only objects are templates
    pub fn from_value(value: Value) -> Result<Self, ExtractorError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ExtractorError::Template(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse a template from JSON text
    pub fn parse(json_str: &str) -> Result<Self, ExtractorError> {
        let value: Value = serde_json::from_str(json_str)
            .map_err(|e| ExtractorError::Template(e.to_string()))?;
        Self::from_value(value)
    }

    /// Load a template file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExtractorError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ExtractorError::TemplateNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        debug!("Loaded template {} ({} bytes)", path.display(), content.len());
        Self::parse(&content)
    }

    /// Pretty-printed JSON, non-ASCII characters kept as is
    pub fn to_json_pretty(&self) -> Result<String, ExtractorError> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    /// Write the template to `path` as pretty-printed UTF-8 JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExtractorError> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// The template as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Fields to extract, in template document order
    pub fn fields(&self) -> Vec<FieldSpec> {
        let mut fields = Vec::new();
        for (key, node) in &self.root {
            if key != META_KEY {
                collect_fields(node, key, &mut fields);
            }
        }
        fields
    }

    /// Node at a dot path
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = self.root.get(segments.next()?)?;
        segments.try_fold(first, |node, segment| node.get(segment))
    }

    /// Write a record at a dot path
    ///
    /// Missing or non-object intermediate nodes become empty objects. An
    /// existing record (an object with a `value` key) is updated in place;
    /// any other leaf is replaced by `{value, source: {page, excerpt}}`.
    pub fn set_path(&mut self, path: &str, value: Value, page: Option<u32>, excerpt: &str) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut node = &mut self.root;
        for segment in segments {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            node = ensure_object(child);
        }

        let source = json!({ "page": page, "excerpt": excerpt });
        let is_record = matches!(
            node.get(leaf),
            Some(Value::Object(existing)) if existing.contains_key("value")
        );

        if is_record {
            if let Some(Value::Object(record)) = node.get_mut(leaf) {
                record.insert("value".to_string(), value);
                match record.get_mut("source") {
                    Some(Value::Object(existing)) => {
                        existing.insert("page".to_string(), json!(page));
                        existing.insert("excerpt".to_string(), json!(excerpt));
                    }
                    _ => {
                        record.insert("source".to_string(), source);
                    }
                }
            }
        } else {
            node.insert(
                leaf.to_string(),
                json!({ "value": value, "source": source }),
            );
        }
    }

    /// Read back a record written by [`Template::set_path`]
    pub fn read_record(&self, path: &str) -> Option<(Value, Option<u32>, String)> {
        let record = self.get_path(path)?.as_object()?;
        let value = record.get("value")?.clone();
        let source = record.get("source");
        let page = source
            .and_then(|s| s.get("page"))
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok());
        let excerpt = source
            .and_then(|s| s.get("excerpt"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some((value, page, excerpt))
    }

    /// Write one record per field
    ///
    /// Fields without a record in `result` are written as "not found".
    pub fn fill(&mut self, fields: &[FieldSpec], result: &ExtractionResult) {
        for field in fields {
            match result.get(&field.path) {
                Some(FieldValue::Annotated {
                    value,
                    page,
                    excerpt,
                }) => self.set_path(&field.path, value.clone(), *page, excerpt),
                _ => self.set_path(&field.path, json!(NOT_FOUND), None, ""),
            }
        }
    }

    /// Record the source file's extension and name under `meta`
    pub fn set_file_meta(&mut self, document: &Path) {
        let file_type = document
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = document
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.set_path("meta.file_type", json!(file_type), None, "");
        self.set_path("meta.file_name", json!(file_name), None, "");
    }
}

/// Append the fields under `node` (at `path`) to `fields`
pub fn collect_fields(node: &Value, path: &str, fields: &mut Vec<FieldSpec>) {
    let Value::Object(members) = node else {
        return;
    };

    if let Some(expected) = members.get(EXPECTED_TYPE_KEY) {
        let expected_type = match expected {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        fields.push(FieldSpec::from_path(path, expected_type));
        return;
    }

    for (key, child) in members {
        collect_fields(child, &format!("{}.{}", path, key), fields);
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
