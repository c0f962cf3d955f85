/*!
 * Tests for the translation history
 */

use subrecon::translation::cache::content_hash;
use subrecon::translation::confidence;
use subrecon::translation::TranslationHistory;
use crate::common;

/// Test store then lookup with normalized languages
#[test]
fn test_history_withStoredEntry_shouldHitIgnoringLanguageCase() {
    let history = TranslationHistory::new(true, 10);
    let summary = confidence::summarize(&[]);

    assert!(history.get(common::SAMPLE_SRT, "EN", "ES").is_none());
    history.store(common::SAMPLE_SRT, "EN", "ES", Some("movie.srt"), "translated", &summary);

    let entry = history.get(common::SAMPLE_SRT, "en", "es").expect("entry should be stored");
    assert_eq!(entry.translated_content, "translated");
    assert_eq!(entry.file_name.as_deref(), Some("movie.srt"));
    assert_eq!(entry.content_hash, content_hash(common::SAMPLE_SRT));

    let (hits, misses, hit_rate) = history.stats();
    assert_eq!((hits, misses), (1, 1));
    assert!((hit_rate - 0.5).abs() < f64::EPSILON);
}

/// Test that a different target language misses
#[test]
fn test_history_withOtherTarget_shouldMiss() {
    let history = TranslationHistory::default();
    history.store(common::SAMPLE_SRT, "auto", "es", None, "translated", &confidence::summarize(&[]));

    assert!(history.get(common::SAMPLE_SRT, "auto", "fr").is_none());
    assert!(history.get(common::SAMPLE_SRT, "", "es").is_some());
}

/// Test eviction of the oldest entry
#[test]
fn test_history_withCapacityExceeded_shouldEvictOldest() {
    let history = TranslationHistory::new(true, 2);
    let summary = confidence::summarize(&[]);

    history.store("a", "en", "es", None, "A", &summary);
    history.store("b", "en", "es", None, "B", &summary);
    history.store("c", "en", "es", None, "C", &summary);

    assert_eq!(history.len(), 2);
    assert!(history.get("a", "en", "es").is_none());
    assert!(history.get("c", "en", "es").is_some());
}

/// Test a disabled history never stores
#[test]
fn test_history_whenDisabled_shouldNeverStore() {
    let history = TranslationHistory::new(false, 10);
    history.store("a", "en", "es", None, "A", &confidence::summarize(&[]));

    assert!(history.is_empty());
    assert!(history.get("a", "en", "es").is_none());

    history.clear();
    assert_eq!(history.stats().0, 0);
}

/// Test single-content lookup and deletion by digest
#[test]
fn test_history_byHash_shouldListAndRemoveEveryLanguagePair() {
    let history = TranslationHistory::default();
    let summary = confidence::summarize(&[]);
    let hash = content_hash(common::SAMPLE_SRT);

    history.store(common::SAMPLE_SRT, "en", "es", None, "ES", &summary);
    history.store(common::SAMPLE_SRT, "en", "fr", None, "FR", &summary);
    history.store("other", "en", "es", None, "OTHER", &summary);

    let found = history.get_by_hash(&hash);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|entry| entry.content_hash == hash));
    assert!(history.get_by_hash("unknown").is_empty());

    assert_eq!(history.remove(&hash), 2);
    assert_eq!(history.remove(&hash), 0);
    assert_eq!(history.len(), 1);
    assert!(history.get(common::SAMPLE_SRT, "en", "es").is_none());
    assert!(history.get("other", "en", "es").is_some());
}

/// Test a removed entry frees its capacity slot
#[test]
fn test_history_afterRemove_shouldNotEvictSurvivors() {
    let history = TranslationHistory::new(true, 2);
    let summary = confidence::summarize(&[]);

    history.store("a", "en", "es", None, "A", &summary);
    history.store("b", "en", "es", None, "B", &summary);
    history.remove(&content_hash("a"));
    history.store("c", "en", "es", None, "C", &summary);

    assert_eq!(history.len(), 2);
    assert!(history.get("b", "en", "es").is_some());
    assert!(history.get("c", "en", "es").is_some());
}

/// Test the digest format
#[test]
fn test_content_hash_shouldBeStableHex() {
    let hash = content_hash("hello");

    assert_eq!(hash.len(), 64);
    assert_eq!(hash, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
}
