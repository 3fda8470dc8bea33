//! Trait definitions for external interactions
//!
//! These traits define the boundaries between extraction logic and
//! infrastructure. Implementations live in other crates.

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (immo-llm). The response is raw
/// text; callers treat it as untrusted and parse it defensively.
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Send a system instruction and a user instruction, return the raw reply
    fn generate(&self, system: &str, user: &str) -> Result<String, Self::Error>;

    /// Name of the model answering `generate` calls
    fn model_name(&self) -> &str {
        "llm"
    }
}

/// Trait for transcribing the text of a rendered page image
///
/// Implemented by the infrastructure layer (immo-llm)
pub trait OcrProvider {
    /// Error type for OCR operations
    type Error;

    /// Transcribe the readable text of a PNG image
    fn transcribe(&self, image: &[u8]) -> Result<String, Self::Error>;
}

/// Content-addressed cache of OCR transcriptions
///
/// Implemented by the application layer (immo-extractor). Reads may miss at
/// any time and writes are best-effort: neither operation can fail.
pub trait OcrCache {
    /// Look up the transcription of an image
    fn read(&self, image: &[u8]) -> Option<String>;

    /// Remember the transcription of an image
    fn write(&self, image: &[u8], text: &str);
}

impl<T: LlmProvider + ?Sized> LlmProvider for std::sync::Arc<T> {
    type Error = T::Error;

    fn generate(&self, system: &str, user: &str) -> Result<String, Self::Error> {
        (**self).generate(system, user)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

impl<T: OcrProvider + ?Sized> OcrProvider for std::sync::Arc<T> {
    type Error = T::Error;

    fn transcribe(&self, image: &[u8]) -> Result<String, Self::Error> {
        (**self).transcribe(image)
    }
}
