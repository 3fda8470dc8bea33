//! Immo LLM Provider Layer
//!
//! Pluggable LLM and OCR provider implementations.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` and `OcrProvider`
//! traits from `immo-domain`. Every provider is a blocking client: the
//! extractor drives them from worker threads.
//!
//! # Providers
//!
//! - `MockProvider` / `MockOcr`: Deterministic mocks for testing
//! - `MistralProvider`: Mistral chat-completions API (text and vision)
//! - `GeminiProvider`: Google Gemini generateContent API (text and vision)
//!
//! # Examples
//!
//! ```
//! use immo_llm::MockProvider;
//! use immo_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new("{}");
//! let result = provider.generate("system", "user").unwrap();
//! assert_eq!(result, "{}");
//! ```

#![warn(missing_docs)]

pub mod gemini;
pub mod mistral;

use immo_domain::traits::{LlmProvider as LlmProviderTrait, OcrProvider as OcrProviderTrait};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use gemini::GeminiProvider;
pub use mistral::MistralProvider;

/// Instruction sent alongside every page image
pub const OCR_INSTRUCTION: &str = "Transcris le texte lisible de cette image.";

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// API credential absent from the environment
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Read an API key from the environment, treating blank values as missing
pub fn api_key_from_env(var: &str) -> Result<String, LlmError> {
    api_key_from_value(var, std::env::var(var).ok())
}

fn api_key_from_value(var: &str, value: Option<String>) -> Result<String, LlmError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(LlmError::MissingCredential(var.to_string())),
    }
}

/// Map a reqwest failure status to an `LlmError`
pub(crate) fn status_error(status: reqwest::StatusCode, body: String, model: &str) -> LlmError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
        reqwest::StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(model.to_string()),
        _ => LlmError::Communication(format!("HTTP {}: {}", status, body)),
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail,
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network calls.
/// Responses are selected by marker: the first registered marker contained in the
/// user instruction wins, otherwise the default response is returned.
///
/// # Examples
///
/// ```
/// use immo_llm::MockProvider;
/// use immo_domain::traits::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("sys", "any prompt").unwrap(), "Fixed response");
///
/// // Responses keyed on prompt content
/// let mut provider = MockProvider::default();
/// provider.add_response("[page 1]", "response1");
/// provider.add_response("[page 9]", "response2");
/// assert_eq!(provider.generate("sys", "...[page 1]...").unwrap(), "response1");
/// assert_eq!(provider.generate("sys", "...[page 9]...").unwrap(), "response2");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, Scripted)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    model: String,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            model: "mock".to_string(),
        }
    }

    /// Add a response for prompts containing `marker`
    pub fn add_response(&mut self, marker: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push((marker.into(), Scripted::Reply(response.into())));
    }

    /// Configure to return an error for prompts containing `marker`
    pub fn add_error(&mut self, marker: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push((marker.into(), Scripted::Fail));
    }

    /// Sleep before answering, to exercise timeouts and concurrency
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report a specific model name
    pub fn with_model_name(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// User instructions received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Reset the call history
    pub fn reset_call_count(&self) {
        self.prompts.lock().unwrap().clear();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, _system: &str, user: &str) -> Result<String, Self::Error> {
        self.prompts.lock().unwrap().push(user.to_string());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let responses = self.responses.lock().unwrap();
        let scripted = responses
            .iter()
            .find(|(marker, _)| user.contains(marker.as_str()))
            .map(|(_, scripted)| scripted.clone());

        match scripted {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock OCR provider for deterministic testing
///
/// Returns the same transcription for every image, or fails every call.
#[derive(Debug, Clone)]
pub struct MockOcr {
    text: Option<String>,
    call_count: Arc<Mutex<usize>>,
}

impl MockOcr {
    /// OCR that always transcribes `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// OCR that fails on every image
    pub fn failing() -> Self {
        Self {
            text: None,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Get the number of times transcribe was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl OcrProviderTrait for MockOcr {
    type Error = LlmError;

    fn transcribe(&self, _image: &[u8]) -> Result<String, Self::Error> {
        *self.call_count.lock().unwrap() += 1;
        self.text
            .clone()
            .ok_or_else(|| LlmError::Communication("Mock OCR failure".to_string()))
    }
}
