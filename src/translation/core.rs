/*!
 * Core translation engine.
 *
 * Drives a document through the batch loop: partition, encode, one provider
 * call per batch, reconcile, then recover unmatched records with individual
 * calls. Batches run strictly in order so progress is monotonic.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error, info, warn};

use crate::errors::{ProviderError, TranslationError};
use crate::providers::Translator;
use crate::subtitle_processor::{SubtitleDocument, SubtitleRecord};
use super::batch::{Batch, DEFAULT_BATCH_SIZE, partition_into_batches};
use super::confidence::{self, DocumentConfidence};
use super::markers::{MarkerCodec, TagMarkerCodec};
use super::reconcile::{ReconcileMethod, ReconciledRecord, reconcile_batch, split_text_lines};

/// Default number of concurrent fallback calls
pub const DEFAULT_FALLBACK_CONCURRENCY: usize = 4;

/// Engine tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Records per provider call
    pub batch_size: usize,
    /// Individual fallback calls in flight at once
    pub fallback_concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            fallback_concurrency: DEFAULT_FALLBACK_CONCURRENCY,
        }
    }
}

/// Progress notification emitted after each reconciled batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 0-based index of the batch just completed
    pub batch_index: usize,
    pub batch_count: usize,
    /// Cumulative source characters translated so far
    pub translated_chars: usize,
}

/// Counters collected during one document run
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub batches: usize,
    pub provider_calls: usize,
    pub structural: usize,
    pub degraded: usize,
    pub fallback: usize,
    pub elapsed: Duration,
}

impl EngineStats {
    fn record(&mut self, method: ReconcileMethod) {
        match method {
            ReconcileMethod::Structural => self.structural += 1,
            ReconcileMethod::Degraded => self.degraded += 1,
            ReconcileMethod::Fallback => self.fallback += 1,
        }
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} batches, {} provider calls, {} structural / {} degraded / {} fallback, {:.1}s",
            self.batches, self.provider_calls, self.structural, self.degraded, self.fallback,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Result of translating a whole document
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// One record per input record, sorted by id within each batch, batches in order
    pub records: Vec<ReconciledRecord>,
    pub stats: EngineStats,
}

impl TranslationOutcome {
    /// Translated document in output order
    pub fn document(&self) -> SubtitleDocument {
        SubtitleDocument::from_records(self.records.iter().map(|r| r.record.clone()).collect())
    }

    /// Per-record confidence and its aggregate
    pub fn confidence(&self) -> DocumentConfidence {
        confidence::summarize(&self.records)
    }
}

/// Batch-and-reconcile translation engine
#[derive(Debug, Clone)]
pub struct TranslationEngine {
    translator: Arc<dyn Translator>,
    codec: Arc<dyn MarkerCodec>,
    options: EngineOptions,
}

impl TranslationEngine {
    /// Create an engine using the tag marker syntax
    pub fn new(translator: Arc<dyn Translator>, options: EngineOptions) -> Self {
        Self::with_codec(translator, Arc::new(TagMarkerCodec), options)
    }

    /// Create an engine with a specific marker syntax
    pub fn with_codec(translator: Arc<dyn Translator>, codec: Arc<dyn MarkerCodec>, options: EngineOptions) -> Self {
        Self { translator, codec, options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Translate a document batch by batch.
    ///
    /// `observer` is called after every reconciled batch; an error from it
    /// stops the run. `cancel` is checked before each batch and before the
    /// fallback tier of each batch.
    pub async fn translate_document<F>(
        &self,
        document: &SubtitleDocument,
        target_language: &str,
        source_language: &str,
        mut observer: F,
        cancel: &AtomicBool,
    ) -> Result<TranslationOutcome, TranslationError>
    where
        F: FnMut(BatchProgress) -> Result<(), TranslationError>,
    {
        let start = Instant::now();
        let source = normalize_source_language(source_language);
        let batches = partition_into_batches(document, self.options.batch_size);
        let batch_count = batches.len();

        info!("Translating {} subtitles in {} batches with {} ({} -> {})",
              document.len(), batch_count, self.translator.name(),
              source.unwrap_or("auto"), target_language);

        let mut stats = EngineStats::default();
        let mut records = Vec::with_capacity(document.len());
        let mut translated_chars = 0;

        for batch in batches {
            ensure_not_cancelled(cancel)?;

            let mut reconciled = self.translate_batch(&batch, target_language, source, cancel, &mut stats).await?;
            reconciled.sort_by_key(|r| r.record.id);
            reconciled.iter().for_each(|r| stats.record(r.method));
            records.extend(reconciled);

            translated_chars += batch.char_count();
            stats.batches += 1;
            observer(BatchProgress {
                batch_index: batch.index,
                batch_count,
                translated_chars,
            })?;
        }

        stats.elapsed = start.elapsed();
        info!("Translation finished: {}", stats.summary());

        Ok(TranslationOutcome { records, stats })
    }

    async fn translate_batch(
        &self,
        batch: &Batch<'_>,
        target_language: &str,
        source_language: Option<&str>,
        cancel: &AtomicBool,
        stats: &mut EngineStats,
    ) -> Result<Vec<ReconciledRecord>, TranslationError> {
        let encoded = self.codec.encode(batch.records);
        debug!("Batch {}: sending {} records ({} chars)", batch.index + 1, batch.len(), batch.char_count());

        stats.provider_calls += 1;
        let translated = self.translator
            .translate(&encoded, target_language, source_language)
            .await
            .map_err(|e| {
                error!("Batch {} failed: {}", batch.index + 1, e);
                e
            })?;

        let reconciliation = reconcile_batch(self.codec.as_ref(), batch.records, &translated);
        let mut records = reconciliation.matched;

        if !reconciliation.unmatched.is_empty() {
            ensure_not_cancelled(cancel)?;
            warn!("Batch {}: recovering {} subtitles individually", batch.index + 1, reconciliation.unmatched.len());

            stats.provider_calls += reconciliation.unmatched.len();
            let recovered = self.recover_unmatched(reconciliation.unmatched, target_language, source_language).await?;
            records.extend(recovered);
        }

        Ok(records)
    }

    // Individual calls run concurrently but their results keep input order
    async fn recover_unmatched(
        &self,
        unmatched: Vec<SubtitleRecord>,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<Vec<ReconciledRecord>, TranslationError> {
        let concurrency = self.options.fallback_concurrency.max(1);

        let recovered = stream::iter(unmatched)
            .map(|record| self.translate_single(record, target_language, source_language))
            .buffered(concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(recovered)
    }

    async fn translate_single(
        &self,
        record: SubtitleRecord,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<ReconciledRecord, ProviderError> {
        let translated = self.translator
            .translate(&record.text(), target_language, source_language)
            .await?;

        let lines = split_text_lines(&translated);
        let record = if lines.is_empty() {
            warn!("Subtitle {}: empty translation, keeping original text", record.id);
            record
        } else {
            record.with_lines(lines)
        };

        Ok(ReconciledRecord { record, method: ReconcileMethod::Fallback })
    }
}

/// `auto` or an empty code means "let the provider detect"
pub fn normalize_source_language(source_language: &str) -> Option<&str> {
    let trimmed = source_language.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(trimmed)
    }
}

fn ensure_not_cancelled(cancel: &AtomicBool) -> Result<(), TranslationError> {
    if cancel.load(Ordering::SeqCst) {
        info!("Cancellation observed, stopping batch dispatch");
        return Err(TranslationError::Cancelled);
    }
    Ok(())
}
