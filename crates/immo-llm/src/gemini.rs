//! Gemini Provider Implementation
//!
//! Provides integration with Google's Gemini `generateContent` API. Gemini has
//! no separate system role in this integration: the system instruction is
//! prepended to the user instruction.

use crate::{api_key_from_env, status_error, LlmError, OCR_INSTRUCTION};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use immo_domain::traits::{LlmProvider as LlmProviderTrait, OcrProvider as OcrProviderTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Default Gemini API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Environment variable overriding the text model
pub const TEXT_MODEL_VAR: &str = "GEMINI_TEXT_MODEL";

/// Environment variable overriding the vision model
pub const VISION_MODEL_VAR: &str = "GEMINI_VISION_MODEL";

/// Timeout for extraction requests
pub const CHAT_TIMEOUT_SECS: u64 = 180;

/// Timeout for OCR requests
pub const OCR_TIMEOUT_SECS: u64 = 120;

/// Gemini API provider
pub struct GeminiProvider {
    endpoint: String,
    api_key: String,
    model: String,
    vision_model: String,
    client: reqwest::blocking::Client,
}

/// Model entry from the models listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. "models/gemini-1.5-pro"
    pub name: String,

    /// Methods the model accepts
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// Pick a model from a listing
///
/// Models that do not support `generateContent` are skipped. With `prefer_pro`,
/// the first "pro" model wins; otherwise the first "flash" model is used.
pub fn choose_model(models: &[ModelInfo], prefer_pro: bool) -> Option<String> {
    let mut chosen = None;
    for model in models {
        if !model
            .supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
        {
            continue;
        }
        if prefer_pro && model.name.contains("pro") {
            return Some(model.name.clone());
        }
        if chosen.is_none() && model.name.contains("flash") {
            chosen = Some(model.name.clone());
        }
    }
    chosen
}

fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn build_client() -> Result<reqwest::blocking::Client, LlmError> {
    reqwest::blocking::Client::builder()
        .build()
        .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// `vision_model` falls back to `model` when empty.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        vision_model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let model = model.into();
        let vision_model = vision_model.into();
        let vision_model = if vision_model.trim().is_empty() {
            model.clone()
        } else {
            vision_model
        };

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model,
            vision_model,
            client: build_client()?,
        })
    }

    /// Create a provider from the environment
    ///
    /// Models resolve from the explicit arguments, then `GEMINI_TEXT_MODEL` /
    /// `GEMINI_VISION_MODEL`, then automatic selection from the models listing.
    pub fn from_env(model: Option<String>, vision_model: Option<String>) -> Result<Self, LlmError> {
        let api_key = api_key_from_env(API_KEY_VAR)?;
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let model = match non_empty(model).or_else(|| non_empty(std::env::var(TEXT_MODEL_VAR).ok())) {
            Some(model) => model,
            None => Self::select_model(DEFAULT_ENDPOINT, &api_key, true)?.ok_or_else(|| {
                LlmError::ModelNotAvailable("no model supports generateContent".to_string())
            })?,
        };
        let vision_model = non_empty(vision_model)
            .or_else(|| non_empty(std::env::var(VISION_MODEL_VAR).ok()))
            .unwrap_or_default();

        info!(model = %model, "Using Gemini model");
        Self::new(api_key, model, vision_model)
    }

    /// List available models and pick one with [`choose_model`]
    pub fn select_model(
        endpoint: &str,
        api_key: &str,
        prefer_pro: bool,
    ) -> Result<Option<String>, LlmError> {
        let client = build_client()?;
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = client
                .get(format!("{}/v1beta/models", endpoint.trim_end_matches('/')))
                .query(&[("key", api_key)])
                .timeout(Duration::from_secs(30));
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;
            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().unwrap_or_default();
                return Err(status_error(status, error_text, "models"));
            }
            let page: ModelList = response.json().map_err(|e| {
                LlmError::InvalidResponse(format!("Failed to parse model list: {}", e))
            })?;

            models.extend(page.models);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(choose_model(&models, prefer_pro))
    }

    /// Point the provider at another endpoint (proxies, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Vision model used for OCR
    pub fn vision_model(&self) -> &str {
        &self.vision_model
    }

    fn generate_content(
        &self,
        model: &str,
        parts: serde_json::Value,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.endpoint,
            model_path(model)
        );
        let body = GenerateRequest {
            contents: vec![json!({ "role": "user", "parts": parts })],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
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

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        let text = parsed.text();
        debug!(model, chars = text.len(), "Gemini reply received");
        Ok(text)
    }
}

impl LlmProviderTrait for GeminiProvider {
    type Error = LlmError;

    fn generate(&self, system: &str, user: &str) -> Result<String, Self::Error> {
        let prompt = format!("{}\n\n{}", system, user);
        self.generate_content(
            &self.model,
            json!([{ "text": prompt }]),
            Duration::from_secs(CHAT_TIMEOUT_SECS),
        )
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

impl OcrProviderTrait for GeminiProvider {
    type Error = LlmError;

    fn transcribe(&self, image: &[u8]) -> Result<String, Self::Error> {
        let parts = json!([
            { "text": OCR_INSTRUCTION },
            { "inline_data": { "mime_type": "image/png", "data": BASE64_STANDARD.encode(image) } },
        ]);
        self.generate_content(
            &self.vision_model,
            parts,
            Duration::from_secs(OCR_TIMEOUT_SECS),
        )
    }
}
