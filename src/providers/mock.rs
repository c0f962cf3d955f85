/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates the ways a free-text
 * translation service mangles marker-tagged input:
 * - `MockProvider::working()` - Translates every text segment, markers intact
 * - `MockProvider::strip_record_markers(ids)` - Loses the record envelope of some ids
 * - `MockProvider::strip_line_markers()` - Loses every line envelope
 * - `MockProvider::shuffled()` - Returns the envelopes in random order
 * - `MockProvider::duplicated()` - Returns every envelope twice
 * - `MockProvider::drop_records(ids)` - Omits whole envelopes
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::failing_on_single()` - Fails only for unmarked (single record) calls
 */

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{Provider, Translator};

static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(?:SUBT|LINE)\s*:\s*\d+\s*>|<\s*SUBT_DIV\s*>").unwrap()
});

static LINE_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/?\s*LINE\s*:\s*\d+\s*>").unwrap()
});

static SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*<SUBT_DIV>\s*").unwrap()
});

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The text to translate
    pub text: String,
    /// Source language, `None` for auto-detection
    pub source_language: Option<String>,
    /// Target language
    pub target_language: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The translated text
    pub text: String,
    /// Simulated billed characters
    pub billed_characters: usize,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Translates text outside markers, leaves markers intact
    Working,
    /// Removes the record open/close markers of the listed ids
    StripRecordMarkers { ids: Vec<u32> },
    /// Removes every line marker
    StripLineMarkers,
    /// Shuffles record envelopes
    Shuffle,
    /// Emits every record envelope twice, the copy carrying different text
    Duplicate,
    /// Omits the envelopes of the listed ids
    DropRecords { ids: Vec<u32> },
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Fails whenever the text carries no record marker
    FailOnSingle,
    /// Returns empty response
    Empty,
    /// Simulates slow response
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every text received, in call order
    requests: Arc<Mutex<Vec<String>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that loses the record markers of `ids`
    pub fn strip_record_markers(ids: &[u32]) -> Self {
        Self::new(MockBehavior::StripRecordMarkers { ids: ids.to_vec() })
    }

    /// Create a mock that loses every line marker
    pub fn strip_line_markers() -> Self {
        Self::new(MockBehavior::StripLineMarkers)
    }

    /// Create a mock that reorders envelopes
    pub fn shuffled() -> Self {
        Self::new(MockBehavior::Shuffle)
    }

    /// Create a mock that duplicates envelopes
    pub fn duplicated() -> Self {
        Self::new(MockBehavior::Duplicate)
    }

    /// Create a mock that omits the envelopes of `ids`
    pub fn drop_records(ids: &[u32]) -> Self {
        Self::new(MockBehavior::DropRecords { ids: ids.to_vec() })
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that fails only for unmarked single record calls
    pub fn failing_on_single() -> Self {
        Self::new(MockBehavior::FailOnSingle)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator, used by the working behavior
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts received so far, in call order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Deterministic fake translation: every text segment outside markers
    /// becomes `[TARGET] segment`
    pub fn fake_translate(text: &str, target_language: &str) -> String {
        let tag = format!("[{}]", target_language.to_uppercase());
        let mut output = String::with_capacity(text.len() * 2);
        let mut last = 0;

        for marker in MARKER_REGEX.find_iter(text) {
            output.push_str(&translate_segment(&text[last..marker.start()], &tag));
            output.push_str(marker.as_str());
            last = marker.end();
        }
        output.push_str(&translate_segment(&text[last..], &tag));
        output
    }

    fn fail(message: impl Into<String>, status_code: u16) -> ProviderError {
        ProviderError::ApiError {
            status_code,
            message: message.into(),
        }
    }
}

fn translate_segment(segment: &str, tag: &str) -> String {
    segment
        .split('\n')
        .map(|piece| {
            if piece.trim().is_empty() {
                piece.to_string()
            } else {
                format!("{} {}", tag, piece.trim())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_record_markers(text: &str, ids: &[u32]) -> String {
    ids.iter().fold(text.to_string(), |acc, id| {
        match Regex::new(&format!(r"(?i)<\s*/?\s*SUBT\s*:\s*{}\s*>", id)) {
            Ok(pattern) => pattern.replace_all(&acc, "").into_owned(),
            Err(_) => acc,
        }
    })
}

fn drop_records(text: &str, ids: &[u32]) -> String {
    ids.iter().fold(text.to_string(), |acc, id| {
        match Regex::new(&format!(r"(?s)<SUBT:{}>.*?</SUBT:{}>", id, id)) {
            Ok(pattern) => pattern.replace_all(&acc, "").into_owned(),
            Err(_) => acc,
        }
    })
}

fn envelopes(text: &str) -> Vec<String> {
    SEPARATOR_REGEX
        .split(text)
        .filter(|envelope| !envelope.trim().is_empty())
        .map(str::to_string)
        .collect()
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.text.clone());

        let translated = match &self.custom_response {
            Some(generator) => generator(&request),
            None => Self::fake_translate(&request.text, &request.target_language),
        };

        let text = match &self.behavior {
            MockBehavior::Working => translated,

            MockBehavior::StripRecordMarkers { ids } => strip_record_markers(&translated, ids),

            MockBehavior::StripLineMarkers => LINE_MARKER_REGEX.replace_all(&translated, "\n").into_owned(),

            MockBehavior::Shuffle => {
                let mut parts = envelopes(&translated);
                parts.shuffle(&mut rand::rng());
                parts.join("\n\n")
            }

            MockBehavior::Duplicate => {
                let parts = envelopes(&translated);
                let copies: Vec<String> = parts.iter().map(|part| part.replace("] ", "] DUPLICATE ")).collect();
                parts.into_iter().chain(copies).collect::<Vec<_>>().join("\n<SUBT_DIV>\n")
            }

            MockBehavior::DropRecords { ids } => drop_records(&translated, ids),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    return Err(Self::fail(format!("Simulated intermittent failure (request #{})", count + 1), 503));
                }
                translated
            }

            MockBehavior::Failing => return Err(Self::fail("Simulated provider failure", 500)),

            MockBehavior::FailOnSingle => {
                if !MARKER_REGEX.is_match(&request.text) {
                    return Err(Self::fail("Simulated failure on single record call", 500));
                }
                translated
            }

            MockBehavior::Empty => String::new(),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                translated
            }
        };

        Ok(MockResponse {
            billed_characters: request.text.chars().count(),
            text,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(Self::fail("Simulated provider failure", 500)),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}

#[async_trait]
impl Translator for MockProvider {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<String, ProviderError> {
        let request = MockRequest {
            text: text.to_string(),
            source_language: source_language.map(str::to_string),
            target_language: target_language.to_string(),
        };

        let response = self.complete(request).await?;
        Ok(Self::extract_text(&response))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
