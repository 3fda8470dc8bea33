//! Integration tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        DocumentPipeline, Extractor, ExtractorConfig, ExtractorError, FieldValue,
        MemoryOcrCache, SecondPass, Template,
    };
    use immo_domain::traits::LlmProvider;
    use immo_domain::{FieldSpec, Page};
    use immo_llm::{MockOcr, MockProvider};
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn numbered_pages(count: u32) -> Vec<Page> {
        (1..=count)
            .map(|n| Page::new(n, format!("Contenu de la page {}", n)))
            .collect()
    }

    fn config(chunk_pages: usize, parallel_api: usize) -> ExtractorConfig {
        ExtractorConfig {
            chunk_pages,
            parallel_api,
            ..ExtractorConfig::default()
        }
    }

    const FOUND_X: &str = r#"{"f1": {"value": "X", "page": 1, "excerpt": "x"}}"#;
    const NOT_FOUND_F1: &str = r#"{"f1": {"value": "not found", "page": null, "excerpt": ""}}"#;

    #[tokio::test]
    async fn test_found_beats_not_found_across_chunks() {
        let fields = vec![FieldSpec::from_path("f1", "string")];

        for (first, second) in [(FOUND_X, NOT_FOUND_F1), (NOT_FOUND_F1, FOUND_X)] {
            let mut llm = MockProvider::default();
            llm.add_response("[page 1]", first);
            llm.add_response("[page 3]", second);

            let extractor = Extractor::new(llm, config(2, 2));
            let outcome = extractor.extract(&numbered_pages(4), &fields).await.unwrap();

            assert_eq!(outcome.report.chunks, 2);
            assert_eq!(
                outcome.result.get("f1"),
                Some(&FieldValue::found("X", Some(1), "x"))
            );
        }
    }

    #[tokio::test]
    async fn test_every_chunk_is_queried() {
        let fields = vec![FieldSpec::from_path("f1", "string")];
        for parallel_api in [1, 3] {
            let llm = MockProvider::default().with_delay(Duration::from_millis(20));
            let extractor = Extractor::new(llm.clone(), config(2, parallel_api));

            let outcome = extractor.extract(&numbered_pages(9), &fields).await.unwrap();
            assert_eq!(outcome.report.chunks, 5);
            assert_eq!(llm.call_count(), 5);

            assert!(llm.prompts().iter().any(|p| p.contains("[page 9]")));
        }
    }

    /// Provider recording the peak number of overlapping calls
    #[derive(Clone, Default)]
    struct InFlightProvider {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl LlmProvider for InFlightProvider {
        type Error = String;

        fn generate(&self, _system: &str, _user: &str) -> Result<String, Self::Error> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok("{}".to_string())
        }
    }

    #[tokio::test]
    async fn test_parallel_calls_bounded_by_parallel_api() {
        let fields = vec![FieldSpec::from_path("f1", "string")];
        for parallel_api in [2, 4] {
            let llm = InFlightProvider::default();
            let extractor = Extractor::new(llm.clone(), config(1, parallel_api));

            let outcome = extractor.extract(&numbered_pages(8), &fields).await.unwrap();
            assert_eq!(outcome.report.chunks, 8);

            let peak = llm.peak.load(Ordering::SeqCst);
            assert!(peak <= parallel_api, "peak {} > {}", peak, parallel_api);
            assert!(peak > 1, "chunks never overlapped");
            assert_eq!(llm.current.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_abort_siblings() {
        let fields = vec![
            FieldSpec::from_path("f1", "string"),
            FieldSpec::from_path("f2", "string"),
        ];
        let mut llm = MockProvider::default();
        llm.add_error("[page 1]");
        llm.add_response("[page 3]", r#"{"f2": {"value": "Foncia", "page": 3, "excerpt": ""}}"#);

        let extractor = Extractor::new(llm, config(2, 2));
        let outcome = extractor.extract(&numbered_pages(4), &fields).await.unwrap();

        assert_eq!(outcome.report.chunks_failed, 1);
        assert!(outcome.result["f2"].is_found());
        assert_eq!(outcome.result["f1"], FieldValue::not_found());
        assert_eq!(outcome.report.missing, 1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_counts_as_nothing_found() {
        let fields = vec![FieldSpec::from_path("f1", "string")];
        let extractor = Extractor::new(MockProvider::new("Désolé, je ne peux pas."), config(8, 1));

        let outcome = extractor.extract(&numbered_pages(2), &fields).await.unwrap();
        assert_eq!(outcome.report.chunks_failed, 0);
        assert_eq!(outcome.result["f1"], FieldValue::not_found());
    }

    #[tokio::test]
    async fn test_raw_entries_are_not_findings() {
        let fields = vec![FieldSpec::from_path("f1", "string")];
        let extractor = Extractor::new(MockProvider::new(r#"{"f1": "Paris"}"#), config(8, 1));

        let outcome = extractor.extract(&numbered_pages(1), &fields).await.unwrap();
        assert_eq!(outcome.result["f1"], FieldValue::not_found());
    }

    #[tokio::test]
    async fn test_llm_timeout_is_recovered() {
        let fields = vec![FieldSpec::from_path("f1", "string")];
        let llm = MockProvider::new(FOUND_X).with_delay(Duration::from_millis(1500));
        let config = ExtractorConfig {
            llm_timeout_secs: 1,
            ..config(8, 1)
        };

        let outcome = Extractor::new(llm, config)
            .extract(&numbered_pages(2), &fields)
            .await
            .unwrap();

        assert_eq!(outcome.report.chunks, 1);
        assert_eq!(outcome.report.chunks_failed, 1);
        assert_eq!(outcome.result["f1"], FieldValue::not_found());
    }

    fn construction_pages() -> Vec<Page> {
        vec![
            Page::new(1, "Cette résidence..."),
            Page::new(2, "Date de construction: 1985"),
        ]
    }

    fn construction_field() -> Vec<FieldSpec> {
        vec![FieldSpec::new(
            "immeuble.date_construction",
            "Date de construction",
            "date",
        )]
    }

    #[tokio::test]
    async fn test_second_pass_targets_relevant_pages() {
        let mut llm = MockProvider::default();
        llm.add_response("[page 1]", "{}");
        llm.add_response(
            "[page 2]",
            r#"{"immeuble.date_construction": {"value": "1985", "page": 2, "excerpt": "Date de construction: 1985"}}"#,
        );
        let config = ExtractorConfig {
            second_pass: true,
            ..config(8, 1)
        };

        let outcome = Extractor::new(llm.clone(), config)
            .extract(&construction_pages(), &construction_field())
            .await
            .unwrap();

        assert_eq!(outcome.report.missing_after_first_pass, 1);
        assert_eq!(outcome.report.second_pass, SecondPass::Ran { pages: 1, fields: 1 });
        assert_eq!(
            outcome.result["immeuble.date_construction"],
            FieldValue::found("1985", Some(2), "Date de construction: 1985")
        );

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("[page 2]"));
        assert!(!prompts[1].contains("[page 1]"));
    }

    #[tokio::test]
    async fn test_second_pass_skipped_without_relevant_pages() {
        let llm = MockProvider::default();
        let fields = vec![FieldSpec::new("immeuble.gardien", "Gardien", "string")];
        let config = ExtractorConfig {
            second_pass: true,
            ..config(8, 1)
        };

        let outcome = Extractor::new(llm.clone(), config)
            .extract(&construction_pages(), &fields)
            .await
            .unwrap();

        assert_eq!(outcome.report.second_pass, SecondPass::NoRelevantPages);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_second_pass_skipped_when_nothing_missing() {
        let llm = MockProvider::new(
            r#"{"immeuble.date_construction": {"value": "1985", "page": 2, "excerpt": ""}}"#,
        );
        let config = ExtractorConfig {
            second_pass: true,
            ..config(8, 1)
        };

        let outcome = Extractor::new(llm.clone(), config)
            .extract(&construction_pages(), &construction_field())
            .await
            .unwrap();

        assert_eq!(outcome.report.second_pass, SecondPass::NothingMissing);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_second_pass_failure_keeps_first_pass() {
        let fields = vec![
            FieldSpec::from_path("immeuble.adresse", "string"),
            FieldSpec::new("syndic.gestionnaire", "Gestionnaire", "string"),
        ];
        let pages = vec![
            Page::new(1, "Adresse : 12 rue des Lilas"),
            Page::new(2, "Le gestionnaire sera désigné en assemblée."),
        ];
        let mut llm = MockProvider::default();
        llm.add_response(
            "[page 1]",
            r#"{"immeuble.adresse": {"value": "12 rue des Lilas", "page": 1, "excerpt": ""}}"#,
        );
        llm.add_error("[page 2]");
        let config = ExtractorConfig {
            second_pass: true,
            ..config(8, 1)
        };

        let outcome = Extractor::new(llm, config).extract(&pages, &fields).await.unwrap();

        assert!(matches!(outcome.report.second_pass, SecondPass::Failed(_)));
        assert!(outcome.result["immeuble.adresse"].is_found());
        assert_eq!(outcome.result["syndic.gestionnaire"], FieldValue::not_found());
        assert_eq!(outcome.report.found(), 1);
    }

    #[tokio::test]
    async fn test_no_pages_no_calls_even_with_second_pass() {
        let llm = MockProvider::new(FOUND_X);
        let config = ExtractorConfig {
            second_pass: true,
            ..ExtractorConfig::default()
        };

        let outcome = Extractor::new(llm.clone(), config)
            .extract(&[], &construction_field())
            .await
            .unwrap();

        assert_eq!(llm.call_count(), 0);
        assert_eq!(outcome.report.second_pass, SecondPass::NoRelevantPages);
        assert_eq!(
            outcome.result["immeuble.date_construction"],
            FieldValue::not_found()
        );
    }

    const SYNDIC_TEMPLATE: &str = r#"{
        "meta": {
            "file_type": {"expected_type": "string"},
            "file_name": {"expected_type": "string"}
        },
        "syndic": {
            "nom": {"expected_type": "string"},
            "contact": {"expected_type": "contact"}
        }
    }"#;

    #[tokio::test]
    async fn test_pipeline_fills_template_from_scan() {
        let temp = TempDir::new().unwrap();
        let scan = temp.path().join("attestation.png");
        std::fs::write(&scan, b"fake image").unwrap();

        let ocr = MockOcr::new("Syndic : Foncia Lyon\nContact : lyon@foncia.fr");
        let mut llm = MockProvider::default();
        llm.add_response(
            "Foncia Lyon",
            r#"Voici le résultat : {"syndic.nom": {"value": "Foncia Lyon", "page": "1", "excerpt": "Syndic : Foncia Lyon"}}"#,
        );

        let pipeline = DocumentPipeline::with_cache(
            llm,
            ocr.clone(),
            MemoryOcrCache::new(),
            ExtractorConfig::default(),
        );

        let template = Template::parse(SYNDIC_TEMPLATE).unwrap();
        let (filled, report) = pipeline.process(&scan, template.clone()).await.unwrap();

        assert_eq!(
            filled.get_path("syndic.nom"),
            Some(&json!({"value": "Foncia Lyon", "source": {"page": 1, "excerpt": "Syndic : Foncia Lyon"}}))
        );
        assert_eq!(
            filled.read_record("syndic.contact"),
            Some((json!("not found"), None, String::new()))
        );
        assert_eq!(filled.read_record("meta.file_type").map(|r| r.0), Some(json!("png")));
        assert_eq!(
            filled.read_record("meta.file_name").map(|r| r.0),
            Some(json!("attestation.png"))
        );
        assert_eq!(report.pages, 1);
        assert_eq!(report.found(), 1);

        // Same image again: transcription comes from the cache
        pipeline.process(&scan, template).await.unwrap();
        assert_eq!(ocr.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_rejects_unreadable_pdf() {
        let temp = TempDir::new().unwrap();
        let pdf = temp.path().join("carnet.pdf");
        std::fs::write(&pdf, b"%PDF-garbage").unwrap();

        let llm = MockProvider::default();
        let pipeline = DocumentPipeline::with_cache(
            llm.clone(),
            MockOcr::new(""),
            MemoryOcrCache::new(),
            ExtractorConfig::default(),
        );

        let template = Template::parse(SYNDIC_TEMPLATE).unwrap();
        let result = pipeline.process(&pdf, template).await;
        assert!(matches!(result, Err(ExtractorError::Document(_))));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_pipeline_missing_document_still_fills_template() {
        let llm = MockProvider::default();
        let pipeline = DocumentPipeline::with_cache(
            llm,
            MockOcr::new("ignored"),
            MemoryOcrCache::new(),
            ExtractorConfig::default(),
        );

        let template = Template::parse(SYNDIC_TEMPLATE).unwrap();
        let (filled, report) = pipeline
            .process(Path::new("/nonexistent/photo.jpg"), template)
            .await
            .unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.missing, 2);
        assert_eq!(
            filled.read_record("syndic.nom"),
            Some((json!("not found"), None, String::new()))
        );
    }
}
