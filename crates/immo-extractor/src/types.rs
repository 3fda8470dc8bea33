//! Extraction result and report types

use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Sentinel value for fields the LLM could not locate
pub const NOT_FOUND: &str = "not found";

/// One entry of an LLM extraction response
///
/// LLM output is untrusted: an entry is either the expected
/// `{value, page, excerpt}` record or some other JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Entry that is not a record; never counts as a finding
    Raw(Value),

    /// `{value, page, excerpt}` record
    Annotated {
        /// Extracted value, or "not found"
        value: Value,
        /// Source page, when known
        page: Option<u32>,
        /// Supporting quote from the document
        excerpt: String,
    },
}

impl FieldValue {
    /// Record for a located value
    pub fn found(value: impl Into<Value>, page: Option<u32>, excerpt: impl Into<String>) -> Self {
        FieldValue::Annotated {
            value: value.into(),
            page,
            excerpt: excerpt.into(),
        }
    }

    /// Record for a value the LLM could not locate
    pub fn not_found() -> Self {
        FieldValue::Annotated {
            value: json!(NOT_FOUND),
            page: None,
            excerpt: String::new(),
        }
    }

    /// Convert a JSON entry from an LLM response
    ///
    /// Objects become records: a missing `value` reads as "not found", `page`
    /// accepts a number or a numeric string, `excerpt` is stringified.
    pub fn from_json(entry: Value) -> Self {
        let mut record = match entry {
            Value::Object(record) => record,
            other => return FieldValue::Raw(other),
        };

        let value = record.remove("value").unwrap_or_else(|| json!(NOT_FOUND));
        let page = record.get("page").and_then(page_number);
        let excerpt = match record.remove("excerpt") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };

        FieldValue::Annotated {
            value,
            page,
            excerpt,
        }
    }

    /// The extracted value of a record
    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldValue::Annotated { value, .. } => Some(value),
            FieldValue::Raw(_) => None,
        }
    }

    /// True if this is a record whose value counts as found
    pub fn is_found(&self) -> bool {
        self.value().is_some_and(crate::merge::is_found)
    }

    /// JSON form, `{value, page, excerpt}` for records
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Raw(value) => value.clone(),
            FieldValue::Annotated {
                value,
                page,
                excerpt,
            } => json!({ "value": value, "page": page, "excerpt": excerpt }),
        }
    }
}

fn page_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extraction results keyed by field path
pub type ExtractionResult = BTreeMap<String, FieldValue>;

/// What happened to the gap-filling second pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondPass {
    /// Not requested
    Disabled,
    /// Every field was found in the first pass
    NothingMissing,
    /// No page mentions a missing field
    NoRelevantPages,
    /// One LLM call over the relevant pages
    Ran {
        /// Pages sent to the LLM
        pages: usize,
        /// Fields asked for
        fields: usize,
    },
    /// The LLM call failed; first-pass findings are kept
    Failed(String),
}

/// Metadata about an extraction run
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Name of the LLM model used
    pub model_name: String,

    /// Pages available to the run
    pub pages: usize,

    /// Fields requested
    pub fields: usize,

    /// Chunks dispatched in the first pass
    pub chunks: usize,

    /// Chunks whose LLM call failed or timed out
    pub chunks_failed: usize,

    /// Fields still missing after the first pass
    pub missing_after_first_pass: usize,

    /// Second pass status
    pub second_pass: SecondPass,

    /// Fields still missing at the end
    pub missing: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl ExtractionReport {
    /// Fields found by the run
    pub fn found(&self) -> usize {
        self.fields.saturating_sub(self.missing)
    }
}

/// Merged extraction results with their report
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// Findings keyed by field path
    pub result: ExtractionResult,

    /// Run metadata
    pub report: ExtractionReport,
}
