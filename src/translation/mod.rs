/*!
 * Batch-and-reconcile translation of subtitle documents.
 *
 * This module is split into several submodules:
 *
 * - `batch`: Partitioning of a document into bounded batches
 * - `markers`: Marker envelopes wrapping each record and line of a batch
 * - `reconcile`: Mapping translated blobs back onto original records
 * - `confidence`: Reliability scores derived from the reconciliation outcome
 * - `core`: The engine driving the batch loop and fallback tier
 * - `cache`: History of completed translations
 */

// Re-export main types for easier usage
pub use self::batch::{Batch, partition_into_batches};
pub use self::cache::{HistoryEntry, TranslationHistory};
pub use self::confidence::{ConfidenceLevel, ConfidenceRecord, DocumentConfidence};
pub use self::core::{BatchProgress, EngineOptions, TranslationEngine, TranslationOutcome};
pub use self::markers::{MarkerCodec, RecordSpan, TagMarkerCodec};
pub use self::reconcile::{BatchReconciliation, ReconcileMethod, ReconciledRecord, reconcile_batch};

// Submodules
pub mod batch;
pub mod cache;
pub mod confidence;
pub mod core;
pub mod markers;
pub mod reconcile;
