//! Mistral Provider Implementation
//!
//! Provides integration with Mistral's chat-completions API, used both for
//! field extraction (text models) and for page transcription (vision models).
//!
//! # Examples
//!
//! ```no_run
//! use immo_llm::MistralProvider;
//!
//! // Reads MISTRAL_API_KEY from the environment
//! let provider = MistralProvider::from_env("mistral-large-latest", "pixtral-large-latest")?;
//! # Ok::<(), immo_llm::LlmError>(())
//! ```

use crate::{api_key_from_env, status_error, LlmError, OCR_INSTRUCTION};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use immo_domain::traits::{LlmProvider as LlmProviderTrait, OcrProvider as OcrProviderTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Default Mistral API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.mistral.ai";

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "MISTRAL_API_KEY";

/// Default text model
pub const DEFAULT_MODEL: &str = "mistral-large-latest";

/// Default vision model used for OCR
pub const DEFAULT_OCR_MODEL: &str = "pixtral-large-latest";

/// Timeout for extraction requests
pub const CHAT_TIMEOUT_SECS: u64 = 180;

/// Timeout for OCR requests
pub const OCR_TIMEOUT_SECS: u64 = 120;

/// Mistral API provider
pub struct MistralProvider {
    endpoint: String,
    api_key: String,
    model: String,
    ocr_model: String,
    client: reqwest::blocking::Client,
}

/// Request body for the chat-completions API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: serde_json::Value,
}

/// Response from the chat-completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl MistralProvider {
    /// Create a new Mistral provider
    ///
    /// # Parameters
    ///
    /// - `api_key`: Mistral API key
    /// - `model`: Text model used for extraction
    /// - `ocr_model`: Vision model used for page transcription
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        ocr_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            ocr_model: ocr_model.into(),
            client,
        })
    }

    /// Create a provider with the API key taken from `MISTRAL_API_KEY`
    pub fn from_env(
        model: impl Into<String>,
        ocr_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key_from_env(API_KEY_VAR)?;
        Self::new(api_key, model, ocr_model)
    }

    /// Point the provider at another endpoint (proxies, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Vision model used for OCR
    pub fn ocr_model(&self) -> &str {
        &self.ocr_model
    }

    fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let body = ChatRequest {
            model,
            messages,
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, error_text, model));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("Response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        debug!(model, chars = content.len(), "Mistral reply received");
        Ok(content)
    }
}

impl LlmProviderTrait for MistralProvider {
    type Error = LlmError;

    fn generate(&self, system: &str, user: &str) -> Result<String, Self::Error> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: json!(system),
            },
            ChatMessage {
                role: "user",
                content: json!(user),
            },
        ];
        self.chat(&self.model, messages, Duration::from_secs(CHAT_TIMEOUT_SECS))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

impl OcrProviderTrait for MistralProvider {
    type Error = LlmError;

    fn transcribe(&self, image: &[u8]) -> Result<String, Self::Error> {
        let data_url = format!("data:image/png;base64,{}", BASE64_STANDARD.encode(image));
        let messages = vec![ChatMessage {
            role: "user",
            content: json!([
                { "type": "text", "text": OCR_INSTRUCTION },
                { "type": "image_url", "image_url": { "url": data_url } },
            ]),
        }];
        self.chat(&self.ocr_model, messages, Duration::from_secs(OCR_TIMEOUT_SECS))
    }
}
