/*!
 * Tests for language utilities
 */

use subrecon::language_utils::{self, LanguageCodeType, StopwordDetector};
use crate::common;

/// Test code validation for both ISO parts
#[test]
fn test_validate_language_code_withVariousCodes_shouldClassify() {
    assert_eq!(language_utils::validate_language_code("en").unwrap(), LanguageCodeType::Part1);
    assert_eq!(language_utils::validate_language_code("FRA").unwrap(), LanguageCodeType::Part2T);
    assert_eq!(language_utils::validate_language_code("ger").unwrap(), LanguageCodeType::Part2B);
    assert!(language_utils::validate_language_code("q1").is_err());
    assert!(language_utils::validate_language_code("").is_err());
}

/// Test normalization between code forms
#[test]
fn test_normalize_withMixedCodes_shouldConverge() {
    assert_eq!(language_utils::normalize_to_part2t("de").unwrap(), "deu");
    assert_eq!(language_utils::normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(language_utils::normalize_to_part1_or_part2t("spa").unwrap(), "es");
    assert!(language_utils::language_codes_match("en", "eng"));
    assert!(language_utils::language_codes_match("ger", "de"));
    assert!(!language_utils::language_codes_match("en", "fr"));
}

/// Test language names
#[test]
fn test_get_language_name_withKnownCode_shouldReturnEnglishName() {
    assert_eq!(language_utils::get_language_name("en").unwrap(), "English");
    assert!(language_utils::get_language_name("q1").is_err());
}

/// Test the auto keyword
#[test]
fn test_is_auto_withAutoOrEmpty_shouldBeTrue() {
    assert!(language_utils::is_auto("auto"));
    assert!(language_utils::is_auto(" AUTO "));
    assert!(language_utils::is_auto(""));
    assert!(!language_utils::is_auto("en"));
}

/// Test text extraction drops ids and timecodes
#[test]
fn test_extract_subtitle_text_withSample_shouldKeepOnlyText() {
    let text = language_utils::extract_subtitle_text(common::SAMPLE_SRT);

    assert_eq!(text, "Hello there. How are you? I am fine. Goodbye.");
}

/// Test detection of English and Spanish subtitles
#[test]
fn test_detect_srt_language_withKnownLanguages_shouldDetect() {
    let detector = StopwordDetector::default();

    let english = language_utils::detect_srt_language(&detector, "1\n00:00:01,000 --> 00:00:02,000\nWhat is this? I don't know and you are not helping.\n");
    assert!(english.success);
    assert_eq!(english.language.as_deref(), Some("en"));

    let spanish = language_utils::detect_srt_language(&detector, "1\n00:00:01,000 --> 00:00:02,000\nPero qué es esto, por favor, con los niños para la casa.\n");
    assert!(spanish.success);
    assert_eq!(spanish.language.as_deref(), Some("es"));
    assert!(spanish.confidence.unwrap() > 0.5);
}

/// Test detection failures
#[test]
fn test_detect_srt_language_withoutSignal_shouldFail() {
    let detector = StopwordDetector::default();

    let empty = language_utils::detect_srt_language(&detector, "  ");
    assert!(!empty.success);
    assert_eq!(empty.message.as_deref(), Some("No SRT content provided"));

    let unknown = language_utils::detect_srt_language(&detector, "1\n00:00:01,000 --> 00:00:02,000\n12345 ???\n");
    assert!(!unknown.success);
    assert_eq!(unknown.message.as_deref(), Some("Could not detect language"));
}
