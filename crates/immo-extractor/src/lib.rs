//! Immo Extractor
//!
//! Fills real-estate extraction templates from PDFs and scans using an LLM.
//!
//! # Overview
//!
//! A document is loaded page by page, with OCR for pages that carry little
//! native text. Pages are grouped into chunks and each chunk is sent to the
//! LLM with the template's field list; the answers are merged so that a
//! value found anywhere wins over "not found". An optional second pass asks
//! again for the fields still missing, over the pages that mention them.
//!
//! # Architecture
//!
//! ```text
//! Document → Pages (+OCR) → Chunks → LLM → Merge → [Second pass] → Template
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use immo_extractor::{DocType, DocumentPipeline, ExtractorConfig, Template};
//! use immo_llm::{MockOcr, MockProvider};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let template_path = DocType::Carnet.template_path(Path::new("templates"));
//! let template = Template::load(&template_path)?;
//!
//! let pipeline = DocumentPipeline::new(
//!     MockProvider::new("{}"),
//!     MockOcr::new(""),
//!     ExtractorConfig::default(),
//! );
//!
//! let (filled, report) = pipeline.process(Path::new("carnet.pdf"), template).await?;
//! filled.save("carnet_entretien_empty_fill.json")?;
//!
//! println!("Found {}/{} fields", report.found(), report.fields);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod doc_type;
mod error;
mod extractor;
mod merge;
mod ocr_cache;
mod pages;
mod parser;
mod pipeline;
mod prompt;
mod relevance;
mod template;
mod types;

#[cfg(test)]
mod tests;

pub use chunking::{flatten_pages, PageChunker};
pub use config::ExtractorConfig;
pub use doc_type::{default_output_path, DocType};
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use merge::{is_found, merge, missing_fields};
pub use ocr_cache::{content_key, CachedOcr, DirOcrCache, MemoryOcrCache, NoOpCache};
pub use pages::{load_from_source, load_pages, LoadOptions, PageSource, PdfDocument};
pub use parser::{parse_json_object, parse_llm_response};
pub use pipeline::DocumentPipeline;
pub use prompt::{build_prompt, Prompt};
pub use relevance::{find_relevant_pages, label_tokens};
pub use template::{collect_fields, Template};
pub use types::{
    ExtractionOutcome, ExtractionReport, ExtractionResult, FieldValue, SecondPass, NOT_FOUND,
};
