use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// Language utilities: ISO code handling and source language detection
///
/// Codes are ISO 639-1 (2-letter) or ISO 639-2 (3-letter). Detection works
/// on subtitle text only, with ids and timecodes removed.

static ID_LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\d+\s*$").unwrap());

static TIMECODE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\d{2}:\d{2}:\d{2},\d{3}\s*-->\s*\d{2}:\d{2}:\d{2},\d{3}.*$").unwrap()
});

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}']+").unwrap());

// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"), ("ger", "deu"), ("dut", "nld"), ("gre", "ell"),
    ("chi", "zho"), ("cze", "ces"), ("ice", "isl"), ("alb", "sqi"),
    ("arm", "hye"), ("baq", "eus"), ("bur", "mya"), ("per", "fas"),
    ("geo", "kat"), ("may", "msa"), ("mac", "mkd"), ("rum", "ron"),
    ("slo", "slk"), ("wel", "cym"),
];

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(bibliographic, _)| *bibliographic == code)
        .map(|(_, terminology)| *terminology)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminology(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match validate_language_code(&normalized_code) {
        Ok(LanguageCodeType::Part1) => Language::from_639_1(&normalized_code)
            .map(|lang| lang.to_639_3().to_string())
            .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code)),
        Ok(LanguageCodeType::Part2T) => Ok(normalized_code),
        Ok(LanguageCodeType::Part2B) => bibliographic_to_terminology(&normalized_code)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code)),
        Err(_) => Err(anyhow!("Cannot normalize invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang.to_639_1().map(str::to_string).unwrap_or(part2t))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(normalized1), Ok(normalized2)) => normalized1 == normalized2,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// `auto` (or empty) source language, meaning provider-side detection
pub fn is_auto(code: &str) -> bool {
    let code = code.trim();
    code.is_empty() || code.eq_ignore_ascii_case("auto")
}

/// Subtitle text with ids and timecodes removed, lines joined by spaces
pub fn extract_subtitle_text(srt_content: &str) -> String {
    let without_ids = ID_LINE_REGEX.replace_all(srt_content, "");
    let without_timecodes = TIMECODE_LINE_REGEX.replace_all(&without_ids, "");

    without_timecodes
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of a language detection request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl DetectionResult {
    pub fn detected(language: impl Into<String>, confidence: f64) -> Self {
        Self {
            success: true,
            language: Some(language.into()),
            confidence: Some(confidence),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            language: None,
            confidence: None,
            message: Some(message.into()),
        }
    }
}

/// Detection capability used to pre-select a source language
pub trait LanguageDetector: Send + Sync + Debug {
    /// Best guess as (ISO 639-1 code, probability), `None` when undecided
    fn detect(&self, text: &str) -> Option<(String, f64)>;
}

/// Detector counting frequent function words of a few languages
#[derive(Debug, Clone)]
pub struct StopwordDetector {
    stopwords: HashMap<&'static str, &'static [&'static str]>,
}

impl Default for StopwordDetector {
    fn default() -> Self {
        let mut stopwords: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        stopwords.insert("en", &["the", "and", "you", "is", "are", "what", "this", "that", "with", "have", "not", "it's", "i'm", "don't", "of", "to"]);
        stopwords.insert("es", &["el", "la", "los", "las", "que", "y", "es", "por", "qué", "pero", "con", "para", "una", "está", "no", "de"]);
        stopwords.insert("fr", &["le", "la", "les", "et", "est", "je", "vous", "pas", "que", "une", "pour", "avec", "c'est", "qui", "nous", "des"]);
        stopwords.insert("de", &["der", "die", "das", "und", "ist", "ich", "nicht", "sie", "du", "ein", "eine", "mit", "was", "wir", "zu", "auf"]);
        stopwords.insert("it", &["il", "che", "è", "non", "di", "un", "una", "per", "sono", "gli", "questo", "ma", "come", "io", "lo", "della"]);
        stopwords.insert("pt", &["o", "os", "que", "não", "é", "um", "uma", "você", "com", "para", "isso", "mas", "eu", "do", "da", "está"]);
        stopwords.insert("nl", &["de", "het", "een", "en", "is", "niet", "ik", "je", "dat", "wat", "van", "met", "zijn", "we", "maar", "op"]);
        Self { stopwords }
    }
}

impl LanguageDetector for StopwordDetector {
    fn detect(&self, text: &str) -> Option<(String, f64)> {
        let words: Vec<String> = WORD_REGEX
            .find_iter(text)
            .map(|word| word.as_str().to_lowercase())
            .collect();

        let mut scores: Vec<(&str, usize)> = self.stopwords
            .iter()
            .map(|(language, list)| {
                let hits = words.iter().filter(|word| list.contains(&word.as_str())).count();
                (*language, hits)
            })
            .filter(|(_, hits)| *hits > 0)
            .collect();

        // deterministic tie-break on the language code
        scores.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let total: usize = scores.iter().map(|(_, hits)| hits).sum();
        let (language, hits) = scores.first()?;
        Some((language.to_string(), *hits as f64 / total as f64))
    }
}

/// Detect the language of SRT content
pub fn detect_srt_language(detector: &dyn LanguageDetector, srt_content: &str) -> DetectionResult {
    if srt_content.trim().is_empty() {
        return DetectionResult::failed("No SRT content provided");
    }

    let text = extract_subtitle_text(srt_content);
    match detector.detect(&text) {
        Some((language, confidence)) => DetectionResult::detected(language, confidence),
        None => DetectionResult::failed("Could not detect language"),
    }
}
