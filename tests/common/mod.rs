/*!
 * Common test utilities for the subrecon test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use subrecon::app_config::{Config, TranslationProvider};
use subrecon::app_controller::Controller;
use subrecon::providers::Translator;
use subrecon::providers::mock::MockProvider;

/// Three short subtitles, the second one spanning two lines
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
Hello there.

2
00:00:05,000 --> 00:00:09,000
How are you?
I am fine.

3
00:00:10,000 --> 00:00:14,000
Goodbye.
";

/// Initialise env_logger once for tests that want log output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// SRT content with `count` single-line subtitles numbered from 1
pub fn generate_srt(count: u32) -> String {
    (1..=count)
        .map(|id| {
            format!(
                "{}\n00:00:{:02},000 --> 00:00:{:02},500\nSubtitle number {}\n",
                id,
                id % 60,
                id % 60,
                id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Config using the mock provider
pub fn mock_config(batch_size: usize) -> Config {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Mock;
    config.translation.common.batch_size = batch_size;
    config.translation.common.retry_count = 0;
    config
}

/// Controller around a specific mock, returning the mock for call inspection
pub fn mock_controller(provider: MockProvider, batch_size: usize) -> (Controller, MockProvider) {
    let observed = provider.clone();
    let translator: Arc<dyn Translator> = Arc::new(provider);
    (Controller::with_translator(mock_config(batch_size), translator), observed)
}
