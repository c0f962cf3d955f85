/*!
 * Integration tests for the batch-and-reconcile engine against misbehaving providers
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use subrecon::errors::TranslationError;
use subrecon::providers::Translator;
use subrecon::providers::mock::{MockProvider, MockRequest};
use subrecon::subtitle_processor::SubtitleDocument;
use subrecon::translation::{
    BatchProgress, ConfidenceLevel, EngineOptions, ReconcileMethod, TranslationEngine, TranslationOutcome,
};
use crate::common;

fn engine(provider: MockProvider, batch_size: usize) -> TranslationEngine {
    let translator: Arc<dyn Translator> = Arc::new(provider);
    TranslationEngine::new(translator, EngineOptions { batch_size, fallback_concurrency: 2 })
}

async fn run(provider: MockProvider, document: &SubtitleDocument, batch_size: usize) -> Result<TranslationOutcome, TranslationError> {
    let cancel = AtomicBool::new(false);
    engine(provider, batch_size)
        .translate_document(document, "es", "auto", |_| Ok(()), &cancel)
        .await
}

fn assert_total(document: &SubtitleDocument, outcome: &TranslationOutcome) {
    let original: Vec<(u32, &str)> = document.records().iter().map(|r| (r.id, r.time_code.as_str())).collect();
    let translated: Vec<(u32, &str)> = outcome.records.iter().map(|r| (r.record.id, r.record.time_code.as_str())).collect();
    assert_eq!(original, translated, "every record must come back once, in order, with its timecode");
}

/// Test a well-behaved provider yields only structural matches
#[tokio::test]
async fn test_engine_withWorkingProvider_shouldBeFullyStructural() {
    common::init_logging();
    let document = SubtitleDocument::parse(common::SAMPLE_SRT);
    let provider = MockProvider::working();
    let outcome = run(provider.clone(), &document, 10).await.unwrap();

    assert_total(&document, &outcome);
    assert!(outcome.records.iter().all(|r| r.method == ReconcileMethod::Structural));
    assert_eq!(outcome.records[1].record.lines, vec!["[ES] How are you?", "[ES] I am fine."]);
    assert_eq!(outcome.confidence().average_confidence_level, ConfidenceLevel::High);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(outcome.stats.provider_calls, 1);
}

/// Test a lost record envelope is recovered by an individual call
#[tokio::test]
async fn test_engine_withStrippedRecordMarker_shouldFallBackForThatRecord() {
    let document = SubtitleDocument::parse(common::SAMPLE_SRT);
    let provider = MockProvider::strip_record_markers(&[2]);
    let outcome = run(provider.clone(), &document, 10).await.unwrap();

    assert_total(&document, &outcome);
    let methods: Vec<ReconcileMethod> = outcome.records.iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![ReconcileMethod::Structural, ReconcileMethod::Fallback, ReconcileMethod::Structural]);
    assert_eq!(outcome.records[1].record.lines, vec!["[ES] How are you?", "[ES] I am fine."]);

    let confidence = outcome.confidence();
    assert_eq!(confidence.records[1].level, ConfidenceLevel::Low);
    assert_eq!(confidence.average_confidence_level, ConfidenceLevel::Medium);

    // one batch call plus one individual call carrying only the record text
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1], "How are you?\nI am fine.");
}

/// Test shuffled envelopes are matched by id
#[tokio::test]
async fn test_engine_withShuffledEnvelopes_shouldRestoreOrder() {
    let document = SubtitleDocument::parse(&common::generate_srt(12));
    let outcome = run(MockProvider::shuffled(), &document, 5).await.unwrap();

    assert_total(&document, &outcome);
    assert!(outcome.records.iter().all(|r| r.method == ReconcileMethod::Structural));
    for reconciled in &outcome.records {
        assert_eq!(reconciled.record.lines, vec![format!("[ES] Subtitle number {}", reconciled.record.id)]);
    }
}

/// Test duplicated envelopes keep the first occurrence
#[tokio::test]
async fn test_engine_withDuplicatedEnvelopes_shouldKeepFirstOccurrence() {
    let document = SubtitleDocument::parse(common::SAMPLE_SRT);
    let outcome = run(MockProvider::duplicated(), &document, 10).await.unwrap();

    assert_total(&document, &outcome);
    assert!(outcome.records.iter().all(|r| !r.record.text().contains("DUPLICATE")));
}

/// Test dropped envelopes are recovered individually
#[tokio::test]
async fn test_engine_withDroppedEnvelopes_shouldRecoverEveryRecord() {
    let document = SubtitleDocument::parse(&common::generate_srt(6));
    let outcome = run(MockProvider::drop_records(&[1, 6]), &document, 3).await.unwrap();

    assert_total(&document, &outcome);
    assert_eq!(outcome.records[0].method, ReconcileMethod::Fallback);
    assert_eq!(outcome.records[5].method, ReconcileMethod::Fallback);
    assert_eq!(outcome.stats.fallback, 2);
    assert_eq!(outcome.stats.provider_calls, 4);
}

/// Test lost line markers degrade instead of failing
#[tokio::test]
async fn test_engine_withStrippedLineMarkers_shouldDegrade() {
    let document = SubtitleDocument::parse(common::SAMPLE_SRT);
    let outcome = run(MockProvider::strip_line_markers(), &document, 10).await.unwrap();

    assert_total(&document, &outcome);
    assert!(outcome.records.iter().all(|r| r.method == ReconcileMethod::Degraded));
    assert_eq!(outcome.records[0].record.lines, vec!["[ES] Hello there."]);
    assert_eq!(outcome.confidence().average_confidence_level, ConfidenceLevel::Medium);
}

/// Test empty replies fall back and keep the original text
#[tokio::test]
async fn test_engine_withEmptyReplies_shouldKeepOriginalText() {
    let document = SubtitleDocument::parse(common::SAMPLE_SRT);
    let outcome = run(MockProvider::empty(), &document, 10).await.unwrap();

    assert_total(&document, &outcome);
    assert!(outcome.records.iter().all(|r| r.method == ReconcileMethod::Fallback));
    assert_eq!(outcome.document().to_srt(), document.to_srt());
    assert_eq!(outcome.confidence().average_confidence_level, ConfidenceLevel::Low);
}

/// Test a failing batch call aborts the run
#[tokio::test]
async fn test_engine_withFailingProvider_shouldReturnProviderError() {
    let document = SubtitleDocument::parse(common::SAMPLE_SRT);
    let result = run(MockProvider::failing(), &document, 10).await;

    assert!(matches!(result, Err(TranslationError::Provider(_))));
}

/// Test a failing fallback call aborts the run
#[tokio::test]
async fn test_engine_withFailingFallback_shouldReturnProviderError() {
    fn lose_second_envelope(request: &MockRequest) -> String {
        MockProvider::fake_translate(&request.text, &request.target_language)
            .replace("<SUBT:2>", "")
            .replace("</SUBT:2>", "")
    }

    let document = SubtitleDocument::parse(common::SAMPLE_SRT);

    let intact = run(MockProvider::failing_on_single(), &document, 10).await;
    assert!(intact.is_ok(), "no fallback needed when every envelope survives");

    let provider = MockProvider::failing_on_single().with_custom_response(lose_second_envelope);
    let result = run(provider.clone(), &document, 10).await;
    assert!(matches!(result, Err(TranslationError::Provider(_))));
    assert_eq!(provider.call_count(), 2);
}

/// Test each batch comes back sorted by id, batches in document order
#[tokio::test]
async fn test_engine_withDescendingIds_shouldSortEachBatchById() {
    let content = "9\n00:00:01,000 --> 00:00:02,000\nNine\n\n4\n00:00:03,000 --> 00:00:04,000\nFour\n\n7\n00:00:05,000 --> 00:00:06,000\nSeven\n\n2\n00:00:07,000 --> 00:00:08,000\nTwo\n\n1\n00:00:09,000 --> 00:00:10,000\nOne\n";
    let document = SubtitleDocument::parse(content);

    let single = run(MockProvider::shuffled(), &document, 10).await.unwrap();
    let ids: Vec<u32> = single.records.iter().map(|r| r.record.id).collect();
    assert_eq!(ids, vec![1, 2, 4, 7, 9]);
    assert_eq!(single.records[0].record.time_code, "00:00:09,000 --> 00:00:10,000");
    assert_eq!(single.records[4].record.lines, vec!["[ES] Nine"]);

    let batched = run(MockProvider::working(), &document, 3).await.unwrap();
    let ids: Vec<u32> = batched.records.iter().map(|r| r.record.id).collect();
    assert_eq!(ids, vec![4, 7, 9, 1, 2]);
}

/// Test progress is reported once per batch with growing character counts
#[tokio::test]
async fn test_engine_withObserver_shouldReportEveryBatch() {
    let document = SubtitleDocument::parse(&common::generate_srt(25));
    let cancel = AtomicBool::new(false);
    let mut reports: Vec<BatchProgress> = Vec::new();

    engine(MockProvider::working(), 10)
        .translate_document(&document, "de", "en", |progress| {
            reports.push(progress);
            Ok(())
        }, &cancel)
        .await
        .unwrap();

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.batch_count == 3));
    assert!(reports.windows(2).all(|pair| pair[0].translated_chars < pair[1].translated_chars));
    assert_eq!(reports[2].translated_chars, document.total_text_chars());
}

/// Test cancellation between batches
#[tokio::test]
async fn test_engine_withCancelAfterFirstBatch_shouldStop() {
    let document = SubtitleDocument::parse(&common::generate_srt(30));
    let cancel = AtomicBool::new(false);
    let provider = MockProvider::working();

    let result = engine(provider.clone(), 10)
        .translate_document(&document, "es", "auto", |_| {
            cancel.store(true, Ordering::SeqCst);
            Ok(())
        }, &cancel)
        .await;

    assert!(matches!(result, Err(TranslationError::Cancelled)));
    assert_eq!(provider.call_count(), 1);
}

/// Test an observer error stops the run
#[tokio::test]
async fn test_engine_withFailingObserver_shouldPropagateError() {
    let document = SubtitleDocument::parse(&common::generate_srt(20));
    let cancel = AtomicBool::new(false);

    let result = engine(MockProvider::working(), 10)
        .translate_document(&document, "es", "auto", |_| Err(TranslationError::Internal("observer".into())), &cancel)
        .await;

    assert!(matches!(result, Err(TranslationError::Internal(_))));
}

/// Test an empty document makes no call
#[tokio::test]
async fn test_engine_withEmptyDocument_shouldReturnNoRecords() {
    let outcome = run(MockProvider::working(), &SubtitleDocument::default(), 10).await.unwrap();

    assert!(outcome.records.is_empty());
    assert_eq!(outcome.confidence().average_confidence, 1.0);
}
