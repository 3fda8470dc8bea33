//! Extract command implementation.

use super::resolve_template_path;
use crate::cli::ExtractArgs;
use crate::config::{Config, Provider};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use immo_domain::traits::{LlmProvider, OcrProvider};
use immo_extractor::{
    default_output_path, DocType, DocumentPipeline, ExtractionReport, ExtractorConfig, Template,
};
use immo_llm::{GeminiProvider, LlmError, MistralProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Execute the extract command.
///
/// Providers use a blocking HTTP client, so they are built and dropped on
/// this thread and only the pipeline runs inside the runtime.
pub fn execute_extract(
    args: ExtractArgs,
    config: &Config,
    templates_dir: &Path,
    formatter: &Formatter,
) -> Result<()> {
    let started = Instant::now();

    let doc_type: DocType = args.doc_type.into();
    let template_path = resolve_template_path(doc_type, args.template.as_deref(), templates_dir);
    let template = Template::load(&template_path)?;
    let fields = template.fields();
    debug!(
        template = %template_path.display(),
        fields = fields.len(),
        "Loaded template"
    );

    if !args.document.is_file() {
        return Err(CliError::InvalidInput(format!(
            "Document not found: {}",
            args.document.display()
        )));
    }

    let output = output_path(args.output.as_deref(), &template_path);
    let extractor_config = extractor_config(&args, config)?;

    let provider = args.provider.map(Into::into).unwrap_or(config.provider);
    let (filled, report) = match provider {
        Provider::Mistral => {
            let model = args
                .model
                .clone()
                .unwrap_or_else(|| config.mistral.model.clone());
            let ocr_model = args
                .ocr_model
                .clone()
                .unwrap_or_else(|| config.mistral.ocr_model.clone());
            let llm = MistralProvider::from_env(model, ocr_model)?;
            run_pipeline(llm, extractor_config, &args.document, template)?
        }
        Provider::Gemini => {
            let model = args.model.clone().or_else(|| config.gemini.model.clone());
            let vision_model = args
                .ocr_model
                .clone()
                .or_else(|| config.gemini.vision_model.clone());
            let llm = GeminiProvider::from_env(model, vision_model)?;
            run_pipeline(llm, extractor_config, &args.document, template)?
        }
    };

    filled.save(&output)?;
    info!(output = %output.display(), "Wrote filled template");

    println!(
        "{}",
        formatter.format_extraction(&filled, &fields, &report, &output)?
    );
    if formatter.is_verbose() {
        println!(
            "{}",
            formatter.success(&format!("Wrote {}", output.display()))
        );
        println!(
            "{}",
            formatter.info(&format!(
                "Done in {:.1}s",
                started.elapsed().as_secs_f64()
            ))
        );
    }

    Ok(())
}

/// Explicit output, or `<template stem>_fill.json` next to the template.
fn output_path(output: Option<&Path>, template_path: &Path) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(template_path),
    }
}

/// File configuration with command-line overrides applied.
fn extractor_config(args: &ExtractArgs, config: &Config) -> Result<ExtractorConfig> {
    let mut extractor_config = config.extractor.clone();
    args.apply_overrides(&mut extractor_config);
    extractor_config.validate().map_err(CliError::Config)?;
    Ok(extractor_config)
}

/// Run the document pipeline with one provider serving both text and OCR.
fn run_pipeline<P>(
    provider: P,
    config: ExtractorConfig,
    document: &Path,
    template: Template,
) -> Result<(Template, ExtractionReport)>
where
    P: LlmProvider<Error = LlmError> + OcrProvider<Error = LlmError> + Send + Sync + 'static,
{
    let provider = Arc::new(provider);
    let pipeline = DocumentPipeline::new(Arc::clone(&provider), provider, config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(pipeline.process(document, template));
    // Timed-out LLM calls keep their blocking threads; don't wait for them.
    runtime.shutdown_background();

    Ok(result?)
}
