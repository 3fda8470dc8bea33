//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for page loading and multi-pass extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum number of PDF pages to load (0 = no limit)
    pub max_pages: usize,

    /// Pages per chunk in the first pass
    pub chunk_pages: usize,

    /// Maximum concurrent LLM calls in the first pass
    pub parallel_api: usize,

    /// Run a targeted second pass over fields still missing
    pub second_pass: bool,

    /// OCR every page, not only pages with little native text
    pub ocr_all: bool,

    /// Directory of the OCR cache; `None` or empty disables caching
    pub ocr_cache_dir: Option<PathBuf>,

    /// Pages with fewer native characters than this are OCRed
    pub native_text_threshold: usize,

    /// Character budget of the document text embedded in one prompt
    pub max_prompt_chars: usize,

    /// Maximum time for a single LLM call (seconds)
    pub llm_timeout_secs: u64,
}

impl ExtractorConfig {
    /// Get the LLM call timeout as a Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_pages == 0 {
            return Err("chunk_pages must be greater than 0".to_string());
        }
        if self.parallel_api == 0 {
            return Err("parallel_api must be greater than 0".to_string());
        }
        if self.max_prompt_chars == 0 {
            return Err("max_prompt_chars must be greater than 0".to_string());
        }
        if self.llm_timeout_secs == 0 {
            return Err("llm_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_pages: 12,
            chunk_pages: 8,
            parallel_api: 2,
            second_pass: false,
            ocr_all: false,
            ocr_cache_dir: Some(PathBuf::from(".ocr_cache")),
            native_text_threshold: 80,
            max_prompt_chars: 32_000,
            llm_timeout_secs: 180,
        }
    }
}

impl ExtractorConfig {
    /// Single-pass preset: every loaded page goes into one LLM call
    pub fn single_pass() -> Self {
        let defaults = Self::default();
        Self {
            chunk_pages: defaults.max_pages,
            parallel_api: 1,
            ..defaults
        }
    }

    /// Thorough preset: OCR on every page and a gap-filling second pass
    pub fn thorough() -> Self {
        Self {
            second_pass: true,
            ocr_all: true,
            llm_timeout_secs: 300,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str)
            .map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
