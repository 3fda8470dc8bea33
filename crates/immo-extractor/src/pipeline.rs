//! End-to-end processing of one document against one template

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::extractor::Extractor;
use crate::ocr_cache::{CachedOcr, DirOcrCache};
use crate::pages::{load_pages, LoadOptions};
use crate::template::Template;
use crate::types::ExtractionReport;
use immo_domain::traits::{LlmProvider, OcrCache, OcrProvider};
use immo_domain::Page;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Loads a document, extracts the template's fields and fills the template
pub struct DocumentPipeline<L, O, C = DirOcrCache>
where
    L: LlmProvider,
{
    extractor: Extractor<L>,
    ocr: Arc<CachedOcr<O, C>>,
    load_options: LoadOptions,
}

impl<L, O> DocumentPipeline<L, O, DirOcrCache>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
    O: OcrProvider + Send + Sync + 'static,
    O::Error: Display,
{
    /// Create a pipeline caching OCR in `config.ocr_cache_dir`
    pub fn new(llm: L, ocr: O, config: ExtractorConfig) -> Self {
        let cache = DirOcrCache::new(config.ocr_cache_dir.clone());
        Self::with_cache(llm, ocr, cache, config)
    }
}

impl<L, O, C> DocumentPipeline<L, O, C>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
    O: OcrProvider + Send + Sync + 'static,
    O::Error: Display,
    C: OcrCache + Send + Sync + 'static,
{
    /// Create a pipeline with a specific OCR cache
    pub fn with_cache(llm: L, ocr: O, cache: C, config: ExtractorConfig) -> Self {
        let load_options = LoadOptions::from(&config);
        Self {
            extractor: Extractor::new(llm, config),
            ocr: Arc::new(CachedOcr::new(ocr, cache)),
            load_options,
        }
    }

    /// The underlying extractor
    pub fn extractor(&self) -> &Extractor<L> {
        &self.extractor
    }

    /// Load the pages of `document` on a blocking thread
    pub async fn load(&self, document: &Path) -> Result<Vec<Page>, ExtractorError> {
        let ocr = Arc::clone(&self.ocr);
        let path = document.to_path_buf();
        let options = self.load_options.clone();

        tokio::task::spawn_blocking(move || load_pages(&path, &options, &*ocr))
            .await
            .map_err(|e| ExtractorError::Document(format!("Page loading task failed: {}", e)))?
    }

    /// Fill `template` from `document`
    ///
    /// The returned template has one record per field plus the file
    /// metadata. Only an unreadable PDF or an invalid configuration fails.
    pub async fn process(
        &self,
        document: &Path,
        mut template: Template,
    ) -> Result<(Template, ExtractionReport), ExtractorError> {
        let fields = template.fields();
        if fields.is_empty() {
            warn!("Template declares no fields to extract");
        }

        let pages = self.load(document).await?;
        info!("Processing {} ({} pages)", document.display(), pages.len());

        let outcome = self.extractor.extract(&pages, &fields).await?;

        template.set_file_meta(document);
        template.fill(&fields, &outcome.result);
        Ok((template, outcome.report))
    }
}
