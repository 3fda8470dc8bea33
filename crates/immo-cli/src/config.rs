//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use immo_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the empty templates
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    /// Default LLM provider
    #[serde(default)]
    pub provider: Provider,

    /// Mistral models
    #[serde(default)]
    pub mistral: MistralSettings,

    /// Gemini models
    #[serde(default)]
    pub gemini: GeminiSettings,

    /// Output settings
    #[serde(default)]
    pub settings: Settings,

    /// Page loading and extraction settings
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// LLM provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Mistral chat-completions API
    #[default]
    Mistral,
    /// Google Gemini API
    Gemini,
}

/// Mistral model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralSettings {
    /// Text model
    #[serde(default = "default_mistral_model")]
    pub model: String,

    /// Vision model used for OCR
    #[serde(default = "default_mistral_ocr_model")]
    pub ocr_model: String,
}

/// Gemini model selection; unset models are resolved at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiSettings {
    /// Text model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Vision model used for OCR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".immo-extract").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is read
    /// when present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::load_from(path)
            }
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config
            .extractor
            .validate()
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            provider: Provider::default(),
            mistral: MistralSettings::default(),
            gemini: GeminiSettings::default(),
            settings: Settings::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl Default for MistralSettings {
    fn default() -> Self {
        Self {
            model: default_mistral_model(),
            ocr_model: default_mistral_ocr_model(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_mistral_model() -> String {
    immo_llm::mistral::DEFAULT_MODEL.to_string()
}

fn default_mistral_ocr_model() -> String {
    immo_llm::mistral::DEFAULT_OCR_MODEL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.templates_dir, PathBuf::from("templates"));
        assert_eq!(config.provider, Provider::Mistral);
        assert_eq!(config.mistral.model, "mistral-large-latest");
        assert_eq!(config.mistral.ocr_model, "pixtral-large-latest");
        assert!(config.gemini.model.is_none());
        assert!(config.settings.color);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
provider = "gemini"

[gemini]
model = "gemini-1.5-pro"

[extractor]
second_pass = true
parallel_api = 4
"#,
        )
        .unwrap();

        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.gemini.model.as_deref(), Some("gemini-1.5-pro"));
        assert!(config.extractor.second_pass);
        assert_eq!(config.extractor.parallel_api, 4);
        assert_eq!(config.extractor.chunk_pages, 8);
        assert_eq!(config.mistral.model, "mistral-large-latest");
        assert_eq!(config.settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.templates_dir = PathBuf::from("/srv/templates");
        config.settings.format = OutputFormat::Json;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(loaded.templates_dir, PathBuf::from("/srv/templates"));
        assert_eq!(loaded.settings.format, OutputFormat::Json);
        assert_eq!(loaded.extractor, config.extractor);
    }

    #[test]
    fn test_explicit_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(temp.path().join("absent.toml").as_path()));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_invalid_extractor_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[extractor]\nchunk_pages = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(CliError::Config(_))));
    }
}
