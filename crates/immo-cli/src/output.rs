//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use immo_domain::FieldSpec;
use immo_extractor::{is_found, ExtractionReport, SecondPass, Template};
use serde_json::{json, Map, Value};
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest value shown in a table cell, in characters
const MAX_CELL_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of an extraction.
    pub fn format_extraction(
        &self,
        template: &Template,
        fields: &[FieldSpec],
        report: &ExtractionReport,
        output: &Path,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_extraction_json(template, fields, report, output),
            OutputFormat::Table => Ok(self.format_extraction_table(template, fields, report)),
            OutputFormat::Quiet => Ok(output.display().to_string()),
        }
    }

    /// Format extraction as JSON.
    fn format_extraction_json(
        &self,
        template: &Template,
        fields: &[FieldSpec],
        report: &ExtractionReport,
        output: &Path,
    ) -> Result<String> {
        let mut values = Map::new();
        for field in fields {
            let (value, page, _) = template
                .read_record(&field.path)
                .unwrap_or((Value::Null, None, String::new()));
            values.insert(field.path.clone(), json!({ "value": value, "page": page }));
        }

        let summary = json!({
            "output": output.display().to_string(),
            "model": report.model_name,
            "pages": report.pages,
            "fields": report.fields,
            "found": report.found(),
            "chunks": report.chunks,
            "chunks_failed": report.chunks_failed,
            "second_pass": second_pass_label(&report.second_pass),
            "processing_time_ms": report.processing_time_ms,
            "values": values,
        });

        Ok(serde_json::to_string_pretty(&summary)?)
    }

    /// Format extraction as a table of field, value and page.
    fn format_extraction_table(
        &self,
        template: &Template,
        fields: &[FieldSpec],
        report: &ExtractionReport,
    ) -> String {
        if fields.is_empty() {
            return self.colorize("No fields in template.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value", "Page"]);

        for field in fields {
            let (value, page) = match template.read_record(&field.path) {
                Some((value, page, _)) if is_found(&value) => (
                    display_value(&value),
                    page.map(|p| p.to_string()).unwrap_or_default(),
                ),
                _ => ("-".to_string(), String::new()),
            };
            builder.push_record([field.path.clone(), value, page]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let summary = format!(
            "{}/{} fields found over {} pages ({} chunks, {} failed, second pass: {})",
            report.found(),
            report.fields,
            report.pages,
            report.chunks,
            report.chunks_failed,
            second_pass_label(&report.second_pass)
        );
        let summary = if report.missing == 0 {
            self.colorize(&summary, "green")
        } else {
            self.colorize(&summary, "yellow")
        };

        format!("{}\n{}", table, summary)
    }

    /// Format the fields of a template.
    pub fn format_fields(&self, fields: &[FieldSpec]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let entries: Vec<Value> = fields
                    .iter()
                    .map(|f| {
                        json!({
                            "path": f.path,
                            "label": f.label,
                            "expected_type": f.expected_type,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&entries)?)
            }
            OutputFormat::Table => {
                if fields.is_empty() {
                    return Ok(self.colorize("No fields in template.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Field", "Type"]);
                for field in fields {
                    builder.push_record([field.path.as_str(), field.expected_type.as_str()]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
            OutputFormat::Quiet => Ok(fields
                .iter()
                .map(|f| f.path.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Whether the format prints human-readable messages
    pub fn is_verbose(&self) -> bool {
        matches!(self.format, OutputFormat::Table)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn second_pass_label(second_pass: &SecondPass) -> String {
    match second_pass {
        SecondPass::Disabled => "off".to_string(),
        SecondPass::NothingMissing => "nothing missing".to_string(),
        SecondPass::NoRelevantPages => "no relevant pages".to_string(),
        SecondPass::Ran { pages, fields } => format!("{} fields over {} pages", fields, pages),
        SecondPass::Failed(reason) => format!("failed ({})", reason),
    }
}

/// Single-line rendering of an extracted value, truncated for tables
fn display_value(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() > MAX_CELL_CHARS {
        let truncated: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
        format!("{}…", truncated)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> (Template, Vec<FieldSpec>, ExtractionReport) {
        let mut template = Template::parse(
            r#"{"syndic": {"nom": {"expected_type": "string"}, "contact": {"expected_type": "contact"}}}"#,
        )
        .unwrap();
        let fields = template.fields();
        template.set_path("syndic.nom", json!("Foncia"), Some(2), "Syndic : Foncia");
        template.set_path("syndic.contact", json!("not found"), None, "");

        let report = ExtractionReport {
            model_name: "mock".to_string(),
            pages: 3,
            fields: 2,
            chunks: 1,
            chunks_failed: 0,
            missing_after_first_pass: 1,
            second_pass: SecondPass::NoRelevantPages,
            missing: 1,
            processing_time_ms: 42,
        };
        (template, fields, report)
    }

    #[test]
    fn test_table_format() {
        let (template, fields, report) = filled();
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter
            .format_extraction(&template, &fields, &report, Path::new("out.json"))
            .unwrap();

        assert!(output.contains("Field"));
        assert!(output.contains("syndic.nom"));
        assert!(output.contains("Foncia"));
        assert!(output.contains("1/2 fields found over 3 pages"));
        assert!(output.contains("second pass: no relevant pages"));
    }

    #[test]
    fn test_json_format() {
        let (template, fields, report) = filled();
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter
            .format_extraction(&template, &fields, &report, Path::new("out.json"))
            .unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["found"], json!(1));
        assert_eq!(parsed["output"], json!("out.json"));
        assert_eq!(parsed["values"]["syndic.nom"], json!({"value": "Foncia", "page": 2}));
        assert_eq!(parsed["values"]["syndic.contact"]["value"], json!("not found"));
    }

    #[test]
    fn test_quiet_format() {
        let (template, fields, report) = filled();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter
            .format_extraction(&template, &fields, &report, Path::new("out.json"))
            .unwrap();
        assert_eq!(output, "out.json");
        assert!(!formatter.is_verbose());
    }

    #[test]
    fn test_fields_formats() {
        let fields = vec![
            FieldSpec::from_path("immeuble.adresse", "string"),
            FieldSpec::from_path("travaux.liste", "list"),
        ];

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(
            quiet.format_fields(&fields).unwrap(),
            "immeuble.adresse\ntravaux.liste"
        );

        let table = Formatter::new(OutputFormat::Table, false);
        let output = table.format_fields(&fields).unwrap();
        assert!(output.contains("Type"));
        assert!(output.contains("list"));

        let json = Formatter::new(OutputFormat::Json, false);
        let parsed: Value = serde_json::from_str(&json.format_fields(&fields).unwrap()).unwrap();
        assert_eq!(parsed[1]["expected_type"], json!("list"));
    }

    #[test]
    fn test_empty_fields() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_fields(&[]).unwrap();
        assert!(output.contains("No fields"));
    }

    #[test]
    fn test_display_value_truncates() {
        assert_eq!(display_value(&json!("a\n  b")), "a b");
        assert_eq!(display_value(&json!(["x", "y"])), r#"["x","y"]"#);
        let long = display_value(&json!("é".repeat(100)));
        assert_eq!(long.chars().count(), MAX_CELL_CHARS);
        assert!(long.ends_with('…'));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.warning("test"), "⚠ test");
    }
}
