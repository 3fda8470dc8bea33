//! Immo Domain Layer
//!
//! Core value types and collaborator traits for the real-estate document
//! extraction pipeline. This crate has no external dependencies: it defines
//! what a page and a field are, and the boundaries behind which LLM, OCR and
//! caching infrastructure live.
//!
//! ## Key Concepts
//!
//! - **Page**: one numbered page of document text, possibly OCR-augmented
//! - **FieldSpec**: one template leaf to extract (dot path, label, expected type)
//! - **Traits**: `LlmProvider`, `OcrProvider` and `OcrCache`, implemented by
//!   `immo-llm` and `immo-extractor`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod field;
pub mod page;
pub mod traits;

// Re-exports for convenience
pub use field::FieldSpec;
pub use page::Page;
