use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::app_config::{Config, TranslationProvider};
use crate::errors::{AppError, SessionError, TranslationError};
use crate::file_utils::FileManager;
use crate::language_utils::{self, DetectionResult, LanguageDetector, StopwordDetector};
use crate::providers::Translator;
use crate::providers::deepl::{DeepL, DeepLOptions};
use crate::providers::mock::MockProvider;
use crate::providers::retry::{RetryPolicy, RetryingTranslator};
use crate::session::{ProgressSnapshot, SessionRegistry, SessionWriter};
use crate::subtitle_processor::{self, LineLengthViolation, SubtitleDocument};
use crate::translation::{
    ConfidenceLevel, ConfidenceRecord, DocumentConfidence, EngineOptions, TranslationEngine, TranslationHistory,
};
use crate::translation::cache::DEFAULT_HISTORY_CAPACITY;

// @module: Application controller for subtitle translation sessions

/// What a finished translation hands back to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    /// Translated document serialized as SRT
    pub translated_content: String,
    /// One confidence record per subtitle
    pub confidence_data: Vec<ConfidenceRecord>,
    pub average_confidence: f64,
    pub average_confidence_level: ConfidenceLevel,
    /// Translated lines longer than the configured maximum
    pub format_warnings: Vec<LineLengthViolation>,
    /// Whether the result came from the translation history
    pub from_cache: bool,
}

impl TranslationResult {
    fn new(translated_content: String, confidence: DocumentConfidence, max_chars_per_line: usize, from_cache: bool) -> Self {
        let format_warnings = subtitle_processor::validate_line_length(
            &SubtitleDocument::parse(&translated_content),
            max_chars_per_line,
        );

        Self {
            translated_content,
            confidence_data: confidence.records,
            average_confidence: confidence.average_confidence,
            average_confidence_level: confidence.average_confidence_level,
            format_warnings,
            from_cache,
        }
    }
}

/// Counters reported after a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller for subtitle translation
#[derive(Debug, Clone)]
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Progress sessions of this controller
    registry: Arc<SessionRegistry>,

    // @field: Completed translations by content digest
    history: Arc<TranslationHistory>,

    // @field: Batch-and-reconcile engine
    engine: TranslationEngine,

    // @field: Source language detection
    detector: Arc<dyn LanguageDetector>,
}

impl Controller {
    /// Create a controller with a mock provider and default configuration
    pub fn new_for_test() -> Self {
        let mut config = Config::default();
        config.translation.provider = TranslationProvider::Mock;
        Self::with_translator(config, Arc::new(MockProvider::working()))
    }

    // @method: Create a new controller with the provider described by the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let translator = build_translator(&config)?;
        Ok(Self::with_translator(config, translator))
    }

    // @method: Create a new controller around an explicit provider
    pub fn with_translator(config: Config, translator: Arc<dyn Translator>) -> Self {
        let common = &config.translation.common;
        let engine = TranslationEngine::new(translator, EngineOptions {
            batch_size: common.batch_size,
            fallback_concurrency: common.fallback_concurrency,
        });

        Self {
            registry: Arc::new(SessionRegistry::new(config.session.estimate_threshold_percent)),
            history: Arc::new(TranslationHistory::new(true, DEFAULT_HISTORY_CAPACITY)),
            detector: Arc::new(StopwordDetector::default()),
            engine,
            config,
        }
    }

    /// Replace the language detector
    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &Arc<TranslationHistory> {
        &self.history
    }

    // =========================================================================
    // Session interface
    // =========================================================================

    /// Create a progress session for SRT content
    pub fn init_session(&self, srt_content: &str) -> String {
        self.registry.init(srt_content)
    }

    /// Translate SRT content, driving the given session to a terminal phase
    pub async fn run_translation(
        &self,
        session_id: &str,
        srt_content: &str,
        target_language: &str,
        source_language: &str,
        file_name: Option<&str>,
    ) -> Result<TranslationResult, AppError> {
        self.registry.purge_expired(Duration::from_secs(self.config.session.ttl_secs));
        let writer = self.registry.writer(session_id)?;

        if let Err(e) = subtitle_processor::check_srt(srt_content) {
            let _ = writer.fail(e.to_string());
            return Err(e.into());
        }

        let document = SubtitleDocument::parse(srt_content);
        writer.set_total_chars(document.total_text_chars())
            .map_err(|e| session_failure(&writer, e))?;

        let max_chars_per_line = self.config.translation.common.max_chars_per_line;

        if let Some(entry) = self.history.get(srt_content, source_language, target_language) {
            info!("Reusing previous translation of {}", file_name.unwrap_or("content"));
            writer.translating_all("Loaded from translation history").map_err(|e| session_failure(&writer, e))?;
            writer.finalizing("Assembling translated subtitles").map_err(|e| session_failure(&writer, e))?;
            writer.complete("Translation completed").map_err(|e| session_failure(&writer, e))?;
            return Ok(TranslationResult::new(entry.translated_content, entry.confidence, max_chars_per_line, true));
        }

        let cancel = writer.cancel_flag();
        let run = self.engine.translate_document(
            &document,
            target_language,
            source_language,
            |progress| {
                let message = format!("Translated batch {}/{}", progress.batch_index + 1, progress.batch_count);
                writer.translating(progress.translated_chars, message)
                    .map(|_| ())
                    .map_err(|e| match e {
                        SessionError::Terminal { .. } => TranslationError::Cancelled,
                        other => TranslationError::Internal(other.to_string()),
                    })
            },
            &cancel,
        ).await;

        let outcome = match run {
            Ok(outcome) => outcome,
            Err(e) => {
                if !writer.is_cancelled() {
                    let _ = writer.fail(e.to_string());
                }
                return Err(e.into());
            }
        };

        writer.finalizing("Assembling translated subtitles").map_err(|e| session_failure(&writer, e))?;

        let translated_content = outcome.document().to_srt();
        let confidence = outcome.confidence();
        let result = TranslationResult::new(translated_content, confidence.clone(), max_chars_per_line, false);

        for warning in &result.format_warnings {
            warn!("Line too long: {}", warning);
        }

        self.history.store(
            srt_content,
            source_language,
            target_language,
            file_name,
            &result.translated_content,
            &confidence,
        );

        writer.complete("Translation completed").map_err(|e| session_failure(&writer, e))?;
        Ok(result)
    }

    /// Current snapshot of a session
    pub fn query_progress(&self, session_id: &str) -> Result<ProgressSnapshot, SessionError> {
        self.registry.query(session_id)
    }

    /// Push-style view of a session's snapshots
    pub fn subscribe(&self, session_id: &str) -> Result<watch::Receiver<ProgressSnapshot>, SessionError> {
        self.registry.subscribe(session_id)
    }

    /// Cancel a running session; `Ok(false)` when it already ended
    pub fn cancel(&self, session_id: &str) -> Result<bool, SessionError> {
        self.registry.cancel(session_id)
    }

    /// Guess the source language of SRT content
    pub fn detect_language(&self, srt_content: &str) -> DetectionResult {
        language_utils::detect_srt_language(self.detector.as_ref(), srt_content)
    }

    // =========================================================================
    // File workflow
    // =========================================================================

    /// Translate one `.srt` file next to itself (or into `output_dir`)
    ///
    /// Returns the written path, or `None` when the output already exists.
    pub async fn translate_file(&self, input_file: &Path, output_dir: Option<&Path>, force_overwrite: bool) -> Result<Option<PathBuf>> {
        self.translate_file_with_progress(input_file, output_dir, force_overwrite, &MultiProgress::new()).await
    }

    async fn translate_file_with_progress(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<Option<PathBuf>> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let target_language = self.config.target_language.clone();
        let output_path = FileManager::generate_output_path(input_file, output_dir, &target_language);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", input_file);
            return Ok(None);
        }

        let content = FileManager::read_to_string(input_file)?;
        subtitle_processor::check_srt(&content)
            .with_context(|| format!("Rejected {:?}", input_file))?;

        let source_language = self.config.source_language.clone();
        if language_utils::is_auto(&source_language) {
            let detection = self.detect_language(&content);
            match (&detection.language, detection.confidence) {
                (Some(language), Some(confidence)) => debug!("Detected source language {} ({:.0}%)", language, confidence * 100.0),
                _ => debug!("Source language not detected, provider will detect it"),
            }
        }

        let file_name = input_file.file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        info!("Translating {} with {} ({} -> {})",
              file_name, self.engine.translator().name(), source_language, target_language);

        let session_id = self.init_session(&content);
        let progress_bar = multi_progress.add(ProgressBar::new(100));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {percent}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let task = {
            let controller = self.clone();
            let session_id = session_id.clone();
            let file_name = file_name.clone();
            tokio::spawn(async move {
                controller.run_translation(&session_id, &content, &target_language, &source_language, Some(&file_name)).await
            })
        };

        let poll_interval = Duration::from_millis(self.config.session.poll_interval_ms.max(10));
        while !task.is_finished() {
            if let Ok(snapshot) = self.query_progress(&session_id) {
                progress_bar.set_position(snapshot.progress.round() as u64);
                progress_bar.set_message(snapshot.message.clone());
                if snapshot.is_terminal() {
                    break;
                }
            }
            tokio::time::sleep(poll_interval).await;
        }

        let result = task.await.context("Translation task panicked")?;
        progress_bar.finish_and_clear();
        let result = result?;

        FileManager::write_to_file(&output_path, &result.translated_content)?;

        let low_confidence = result.confidence_data.iter()
            .filter(|record| record.level == ConfidenceLevel::Low)
            .count();
        if low_confidence > 0 {
            warn!("{} subtitles were recovered individually, review them", low_confidence);
        }

        info!("Success: {:?} (confidence {:.2}, {}{}) in {}",
              output_path,
              result.average_confidence,
              result.average_confidence_level,
              if result.from_cache { ", from history" } else { "" },
              Self::format_duration(start_time.elapsed()));

        Ok(Some(output_path))
    }

    /// Translate every `.srt` file below a directory
    /// Files that already have translated subtitles will be skipped
    pub async fn translate_folder(&self, input_dir: &Path, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();
        let target_language = &self.config.target_language;

        let files: Vec<PathBuf> = FileManager::find_srt_files(input_dir)?
            .into_iter()
            .filter(|path| !FileManager::is_translation_output(path, target_language))
            .collect();

        if files.is_empty() {
            return Err(anyhow!("No subtitle files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(files.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();

        for file in &files {
            let file_name = file.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self.translate_file_with_progress(file, None, force_overwrite, &multi_progress).await {
                Ok(Some(_)) => summary.translated += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_and_clear();
        info!("Finished {} files: {} translated, {} skipped, {} failed in {}",
              files.len(), summary.translated, summary.skipped, summary.failed,
              Self::format_duration(start_time.elapsed()));

        Ok(summary)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

// A writer call failing after cancellation is reported as the cancellation itself
fn session_failure(writer: &SessionWriter, error: SessionError) -> AppError {
    if writer.is_cancelled() {
        AppError::Translation(TranslationError::Cancelled)
    } else {
        AppError::Session(error)
    }
}

/// Build the provider described by the configuration, wrapped in the retry policy
pub fn build_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    let common = &config.translation.common;
    let policy = RetryPolicy {
        max_retries: common.retry_count,
        backoff_base_ms: common.retry_backoff_ms,
        rate_limit_delay_ms: common.rate_limit_delay_ms,
    };

    match config.translation.provider {
        TranslationProvider::DeepL => {
            let api_key = config.translation.get_api_key();
            if api_key.is_empty() {
                return Err(anyhow!("Translation API key is required for DeepL provider"));
            }

            let client = DeepL::new(api_key, config.translation.get_endpoint(), config.translation.get_timeout_secs())
                .with_options(DeepLOptions {
                    formality: common.formality.clone(),
                    preserve_formatting: common.preserve_formatting,
                    split_sentences: common.split_sentences,
                    tag_handling: common.tag_handling,
                    glossary_id: common.glossary_id.clone(),
                });
            Ok(Arc::new(RetryingTranslator::new(client, policy)))
        }
        TranslationProvider::Mock => Ok(Arc::new(RetryingTranslator::new(MockProvider::working(), policy))),
    }
}
