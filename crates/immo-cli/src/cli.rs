//! CLI command definitions and argument parsing.

use clap::{ArgAction, Parser, Subcommand};
use immo_extractor::{DocType, ExtractorConfig};
use std::path::PathBuf;

/// Fill real-estate document templates with values extracted by an LLM.
#[derive(Debug, Parser)]
#[command(name = "immo-extract")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the empty JSON templates
    #[arg(long, env = "IMMO_TEMPLATES_DIR", global = true)]
    pub templates_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (paths only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract a document into its filled template
    Extract(ExtractArgs),

    /// List the fields of a document type's template
    Fields(FieldsArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Document type
    #[arg(value_enum)]
    pub doc_type: DocTypeArg,

    /// PDF, image or other document to extract
    pub document: PathBuf,

    /// Output file (default: <template stem>_fill.json next to the template)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Template file overriding the document type's template
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// LLM provider
    #[arg(short, long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Text model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Vision model used for OCR
    #[arg(long)]
    pub ocr_model: Option<String>,

    /// Maximum pages to read (0 = all)
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// OCR every page, not only pages with little text
    #[arg(long)]
    pub ocr_all: bool,

    /// OCR cache directory ("" disables the cache)
    #[arg(long)]
    pub ocr_cache_dir: Option<String>,

    /// Pages per LLM call
    #[arg(long)]
    pub chunk_pages: Option<usize>,

    /// Concurrent LLM calls
    #[arg(long)]
    pub parallel_api: Option<usize>,

    /// Ask again for missing fields over the pages that mention them
    #[arg(long)]
    pub second_pass: bool,
}

impl ExtractArgs {
    /// Apply command-line overrides on top of file configuration
    pub fn apply_overrides(&self, config: &mut ExtractorConfig) {
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(chunk_pages) = self.chunk_pages {
            config.chunk_pages = chunk_pages;
        }
        if let Some(parallel_api) = self.parallel_api {
            config.parallel_api = parallel_api;
        }
        if let Some(dir) = &self.ocr_cache_dir {
            config.ocr_cache_dir = if dir.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }
        config.ocr_all |= self.ocr_all;
        config.second_pass |= self.second_pass;
    }
}

/// Arguments for the fields command.
#[derive(Debug, Parser)]
pub struct FieldsArgs {
    /// Document type
    #[arg(value_enum)]
    pub doc_type: DocTypeArg,

    /// Template file overriding the document type's template
    #[arg(short, long)]
    pub template: Option<PathBuf>,
}

/// Document type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DocTypeArg {
    /// Carnet d'entretien
    Carnet,
    /// Règlement de copropriété
    Reglement,
    /// Dossier technique amiante
    Dta,
    /// Constat de risque d'exposition au plomb
    Crep,
    /// Contrôle technique quinquennal d'ascenseur
    Ct,
    /// Liste des occupants
    Occupants,
    /// Devis ou facture de travaux
    Devis,
}

/// LLM provider argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderArg {
    /// Mistral chat-completions API
    Mistral,
    /// Google Gemini API
    Gemini,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<DocTypeArg> for DocType {
    fn from(doc_type: DocTypeArg) -> Self {
        match doc_type {
            DocTypeArg::Carnet => DocType::Carnet,
            DocTypeArg::Reglement => DocType::Reglement,
            DocTypeArg::Dta => DocType::Dta,
            DocTypeArg::Crep => DocType::Crep,
            DocTypeArg::Ct => DocType::Ct,
            DocTypeArg::Occupants => DocType::Occupants,
            DocTypeArg::Devis => DocType::Devis,
        }
    }
}

impl From<ProviderArg> for crate::config::Provider {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Mistral => crate::config::Provider::Mistral,
            ProviderArg::Gemini => crate::config::Provider::Gemini,
        }
    }
}
