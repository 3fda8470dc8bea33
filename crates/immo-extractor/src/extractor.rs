//! Core Extractor implementation

use crate::chunking::{flatten_pages, PageChunker};
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::merge::{merge, missing_fields};
use crate::parser::parse_llm_response;
use crate::prompt::{build_prompt, Prompt};
use crate::relevance::find_relevant_pages;
use crate::types::{ExtractionOutcome, ExtractionReport, ExtractionResult, FieldValue, SecondPass};
use immo_domain::traits::LlmProvider;
use immo_domain::{FieldSpec, Page};
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// The Extractor turns document pages into field values with an LLM
///
/// The first pass sends every chunk of pages with the full field list; the
/// optional second pass asks again for the fields still missing, over the
/// pages that mention them.
pub struct Extractor<L>
where
    L: LlmProvider,
{
    llm_provider: Arc<L>,
    config: ExtractorConfig,
}

impl<L> Extractor<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    /// Create a new Extractor
    pub fn new(llm_provider: L, config: ExtractorConfig) -> Self {
        Self::from_shared(Arc::new(llm_provider), config)
    }

    /// Create an Extractor around a provider shared with other components
    pub fn from_shared(llm_provider: Arc<L>, config: ExtractorConfig) -> Self {
        Self {
            llm_provider,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract `fields` from `pages`
    ///
    /// LLM failures never abort the run: a failed chunk contributes nothing
    /// and a failed second pass leaves the first-pass findings in place.
    /// Every field has an entry in the returned result, "not found" when no
    /// call located it.
    pub async fn extract(
        &self,
        pages: &[Page],
        fields: &[FieldSpec],
    ) -> Result<ExtractionOutcome, ExtractorError> {
        self.config.validate().map_err(ExtractorError::Config)?;

        let start_time = Instant::now();
        info!(
            "Starting extraction of {} fields from {} pages",
            fields.len(),
            pages.len()
        );

        let (mut result, chunks, chunks_failed) = self.first_pass(pages, fields).await;

        let missing = missing_fields(fields, &result);
        let missing_after_first_pass = missing.len();
        info!(
            "First pass complete: {} chunks, {} failed, {} fields missing",
            chunks, chunks_failed, missing_after_first_pass
        );

        let second_pass = if self.config.second_pass {
            self.second_pass(pages, &missing, &mut result).await
        } else {
            SecondPass::Disabled
        };

        let still_missing = missing_fields(fields, &result);
        for field in &still_missing {
            result.insert(field.path.clone(), FieldValue::not_found());
        }

        let report = ExtractionReport {
            model_name: self.llm_provider.model_name().to_string(),
            pages: pages.len(),
            fields: fields.len(),
            chunks,
            chunks_failed,
            missing_after_first_pass,
            second_pass,
            missing: still_missing.len(),
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Extraction complete: {}/{} fields found in {} ms",
            report.found(),
            report.fields,
            report.processing_time_ms
        );

        Ok(ExtractionOutcome { result, report })
    }

    /// Query every chunk, at most `parallel_api` at a time
    ///
    /// Returns the merged result, the chunk count and the failed chunk count.
    async fn first_pass(
        &self,
        pages: &[Page],
        fields: &[FieldSpec],
    ) -> (ExtractionResult, usize, usize) {
        let chunker = PageChunker::new(self.config.chunk_pages, self.config.max_prompt_chars);
        let chunks = chunker.chunk(pages);
        let semaphore = Arc::new(Semaphore::new(self.config.parallel_api.max(1)));
        let mut tasks = JoinSet::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let prompt = build_prompt(&chunker.flatten(chunk), fields);
            let llm = Arc::clone(&self.llm_provider);
            let semaphore = Arc::clone(&semaphore);
            let limit = self.config.llm_timeout();

            debug!("Dispatching chunk {}/{} ({} pages)", index + 1, chunks.len(), chunk.len());
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_query(llm, prompt, limit).await,
                    Err(e) => Err(ExtractorError::Llm(format!("Semaphore closed: {}", e))),
                };
                (index, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(chunks.len());
        let mut chunks_failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Chunk task join error: {}", e);
                    chunks_failed += 1;
                }
            }
        }

        // Merge in chunk order so results do not depend on completion order
        outcomes.sort_by_key(|(index, _)| *index);
        let mut result = ExtractionResult::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(update) => {
                    debug!("Chunk {} returned {} entries", index + 1, update.len());
                    result = merge(result, update);
                }
                Err(e) => {
                    warn!("Chunk {} failed: {}", index + 1, e);
                    chunks_failed += 1;
                }
            }
        }

        (result, chunks.len(), chunks_failed)
    }

    /// Ask for the missing fields over the pages that mention them
    async fn second_pass(
        &self,
        pages: &[Page],
        missing: &[FieldSpec],
        result: &mut ExtractionResult,
    ) -> SecondPass {
        if missing.is_empty() {
            return SecondPass::NothingMissing;
        }

        let relevant = find_relevant_pages(pages, missing);
        if relevant.is_empty() {
            info!("Second pass skipped: no page mentions the missing fields");
            return SecondPass::NoRelevantPages;
        }

        info!(
            "Second pass: {} missing fields over {} pages",
            missing.len(),
            relevant.len()
        );
        let prompt = build_prompt(
            &flatten_pages(&relevant, self.config.max_prompt_chars),
            missing,
        );

        match run_query(
            Arc::clone(&self.llm_provider),
            prompt,
            self.config.llm_timeout(),
        )
        .await
        {
            Ok(update) => {
                let merged = merge(std::mem::take(result), update);
                *result = merged;
                SecondPass::Ran {
                    pages: relevant.len(),
                    fields: missing.len(),
                }
            }
            Err(e) => {
                warn!("Second pass failed, keeping first pass results: {}", e);
                SecondPass::Failed(e.to_string())
            }
        }
    }
}

/// One LLM call on a blocking thread, bounded by `limit`, parsed
///
/// On timeout the blocking call is abandoned, not cancelled.
async fn run_query<L>(
    llm: Arc<L>,
    prompt: Prompt,
    limit: Duration,
) -> Result<ExtractionResult, ExtractorError>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: Display,
{
    debug!(
        "Prompt length: {} chars",
        prompt.system.len() + prompt.user.len()
    );

    // Call in a blocking context since LlmProvider is not async
    let call = tokio::task::spawn_blocking(move || {
        llm.generate(&prompt.system, &prompt.user)
            .map_err(|e| ExtractorError::Llm(e.to_string()))
    });

    let response = timeout(limit, call)
        .await
        .map_err(|_| ExtractorError::Timeout)?
        .map_err(|e| ExtractorError::Llm(format!("Task join error: {}", e)))??;

    debug!("LLM response length: {} chars", response.len());
    Ok(parse_llm_response(&response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use immo_llm::MockProvider;

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::from_path("immeuble.adresse", "string"),
            FieldSpec::from_path("syndic.nom", "string"),
        ]
    }

    #[tokio::test]
    async fn test_extract_without_pages() {
        let llm = Arc::new(MockProvider::new(r#"{"syndic.nom": {"value": "Foncia"}}"#));
        let extractor = Extractor::from_shared(Arc::clone(&llm), ExtractorConfig::default());

        let outcome = extractor.extract(&[], &fields()).await.unwrap();
        assert_eq!(llm.call_count(), 0);
        assert_eq!(outcome.report.chunks, 0);
        assert_eq!(outcome.report.missing, 2);
        assert_eq!(outcome.result.len(), 2);
        assert!(outcome.result.values().all(|v| *v == FieldValue::not_found()));
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_config() {
        let config = ExtractorConfig {
            parallel_api: 0,
            ..ExtractorConfig::default()
        };
        let extractor = Extractor::new(MockProvider::default(), config);
        let result = extractor.extract(&[Page::new(1, "x")], &fields()).await;
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    #[tokio::test]
    async fn test_report_model_name() {
        let llm = MockProvider::default().with_model_name("mistral-large-latest");
        let extractor = Extractor::new(llm, ExtractorConfig::default());
        let outcome = extractor
            .extract(&[Page::new(1, "texte")], &fields())
            .await
            .unwrap();
        assert_eq!(outcome.report.model_name, "mistral-large-latest");
        assert_eq!(outcome.report.second_pass, SecondPass::Disabled);
        assert_eq!(outcome.report.found(), 0);
    }
}
