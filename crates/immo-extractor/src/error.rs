//! Error types for the Extractor

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// A single LLM call exceeded its time budget
    #[error("Extraction timeout")]
    Timeout,

    /// Source document could not be opened or read
    #[error("Document error: {0}")]
    Document(String),

    /// Template asset is missing
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// Template content is not usable
    #[error("Invalid template: {0}")]
    Template(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}
