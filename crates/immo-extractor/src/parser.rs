//! Parse LLM output into extraction results

use crate::types::{ExtractionResult, FieldValue};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Parse an LLM response into field records
///
/// Never fails: output that cannot be read as a JSON object yields an empty
/// result, which merges as "nothing found".
pub fn parse_llm_response(response: &str) -> ExtractionResult {
    match parse_json_object(response) {
        Some(object) => object
            .into_iter()
            .map(|(path, entry)| (path, FieldValue::from_json(entry)))
            .collect(),
        None => {
            warn!(
                chars = response.len(),
                "LLM response is not a JSON object, ignoring it"
            );
            ExtractionResult::new()
        }
    }
}

/// Read a JSON object from raw LLM text
///
/// Tries the whole text first, then the span from the first `{` to the last
/// `}`, which recovers objects wrapped in prose or markdown code blocks.
pub fn parse_json_object(response: &str) -> Option<Map<String, Value>> {
    let parsed = match serde_json::from_str::<Value>(response) {
        Ok(value) => value,
        Err(_) => {
            let candidate = extract_braced(response)?;
            debug!("Strict JSON parse failed, retrying on braced span");
            serde_json::from_str::<Value>(candidate).ok()?
        }
    };

    match parsed {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

/// Span from the first `{` to the last `}`, inclusive
fn extract_braced(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end > start {
        Some(&response[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_valid_json() {
        let response = r#"{
            "immeuble.adresse": {"value": "12 rue des Lilas", "page": 1, "excerpt": "sis 12 rue des Lilas"},
            "immeuble.nb_lots": {"value": "not found", "page": null, "excerpt": ""}
        }"#;

        let result = parse_llm_response(response);
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.get("immeuble.adresse"),
            Some(&FieldValue::found("12 rue des Lilas", Some(1), "sis 12 rue des Lilas"))
        );
        assert!(!result["immeuble.nb_lots"].is_found());
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let result = parse_llm_response(r#"Sure! {"a":{"value":1}} thanks"#);
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("a").and_then(|v| v.value()), Some(&json!(1)));
    }

    #[test]
    fn test_parse_braced_span_raw_object() {
        let object = parse_json_object(r#"Sure! {"a":{"value":1}} thanks"#).unwrap();
        assert_eq!(Value::Object(object), json!({"a": {"value": 1}}));
    }

    #[test]
    fn test_parse_json_with_markdown_wrapper() {
        let response = r#"```json
{"syndic.nom": {"value": "Foncia", "page": 2, "excerpt": "Syndic : Foncia"}}
```"#;
        let result = parse_llm_response(response);
        assert!(result["syndic.nom"].is_found());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_llm_response("This is not JSON").is_empty());
        assert!(parse_llm_response("} backwards {").is_empty());
        assert!(parse_llm_response("{ broken: ").is_empty());
        assert!(parse_llm_response("").is_empty());
    }

    #[test]
    fn test_parse_json_not_object() {
        assert!(parse_llm_response(r#"[{"value": 1}]"#).is_empty());
        assert!(parse_llm_response("42").is_empty());
    }

    #[test]
    fn test_non_record_entries_are_raw() {
        let result = parse_llm_response(r#"{"a": "Paris", "b": {"value": "Lyon"}}"#);
        assert_eq!(result["a"], FieldValue::Raw(json!("Paris")));
        assert!(result["b"].is_found());
    }

    #[test]
    fn test_extract_braced() {
        assert_eq!(extract_braced(r#"x {"k": {}} y"#), Some(r#"{"k": {}}"#));
        assert_eq!(extract_braced("no braces"), None);
    }
}
