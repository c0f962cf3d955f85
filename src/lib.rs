/*!
 * # subrecon - batch-and-reconcile subtitle translation
 *
 * A Rust library that translates SRT subtitles through a machine translation
 * API several records at a time, then maps every translated batch back onto
 * the original records.
 *
 * ## Features
 *
 * - SRT parsing, validation and serialization
 * - Marker envelopes that survive a round trip through the provider
 * - Structural, degraded and individual-fallback reconciliation of each batch
 * - Per-record and per-document confidence scores
 * - Progress sessions with phases, time estimates and cancellation
 * - ISO 639-1 and ISO 639-2 language code support and language detection
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Subtitle parsing and serialization
 * - `translation`: The batch-and-reconcile engine:
 *   - `translation::batch`: Partitioning into batches
 *   - `translation::markers`: Marker encoding and tolerant decoding
 *   - `translation::reconcile`: Mapping translations back onto records
 *   - `translation::confidence`: Confidence scoring
 *   - `translation::core`: The engine loop
 *   - `translation::cache`: History of completed translations
 * - `session`: Progress sessions and their state machine
 * - `providers`: Translation API clients:
 *   - `providers::deepl`: DeepL REST client
 *   - `providers::retry`: Retrying adapter
 *   - `providers::mock`: Scripted offline provider
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod translation;
pub mod session;
pub mod app_controller;
pub mod language_utils;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, TranslationResult};
pub use session::{Phase, ProgressSnapshot, SessionRegistry};
pub use subtitle_processor::{SubtitleDocument, SubtitleRecord};
pub use translation::{ConfidenceLevel, DocumentConfidence, TranslationEngine};
