/*!
 * Translation history.
 *
 * Completed document translations are kept in memory, keyed by the SHA-256
 * digest of the source SRT content and the language pair, so translating the
 * same file twice does not call the provider again. Entries also serve as a
 * browsable history of recent jobs.
 */

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::translation::confidence::DocumentConfidence;

/// Default number of entries kept before the oldest is evicted
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Cache key: content digest plus language pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct HistoryKey {
    content_hash: String,
    source_language: String,
    target_language: String,
}

impl HistoryKey {
    fn new(content: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            content_hash: content_hash(content),
            source_language: normalize_language(source_language),
            target_language: normalize_language(target_language),
        }
    }
}

/// A stored document translation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub content_hash: String,
    pub file_name: Option<String>,
    pub source_language: String,
    pub target_language: String,
    pub translated_content: String,
    pub confidence: DocumentConfidence,
    pub created_at: DateTime<Utc>,
}

/// In-memory translation history with hit/miss counters
#[derive(Debug)]
pub struct TranslationHistory {
    /// Entries by key
    entries: Arc<RwLock<HashMap<HistoryKey, HistoryEntry>>>,

    /// Insertion order, oldest first
    order: Arc<RwLock<VecDeque<HistoryKey>>>,

    /// Cache hit counter
    hits: Arc<RwLock<usize>>,

    /// Cache miss counter
    misses: Arc<RwLock<usize>>,

    capacity: usize,

    /// Whether lookups and stores are enabled
    enabled: bool,
}

impl Default for TranslationHistory {
    fn default() -> Self {
        Self::new(true, DEFAULT_HISTORY_CAPACITY)
    }
}

impl TranslationHistory {
    /// Create a new history
    pub fn new(enabled: bool, capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            order: Arc::new(RwLock::new(VecDeque::new())),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
            capacity: capacity.max(1),
            enabled,
        }
    }

    /// Look up a previous translation of the same content and language pair
    pub fn get(&self, content: &str, source_language: &str, target_language: &str) -> Option<HistoryEntry> {
        if !self.enabled {
            return None;
        }

        let key = HistoryKey::new(content, source_language, target_language);
        let found = self.entries.read().get(&key).cloned();

        match &found {
            Some(_) => {
                *self.hits.write() += 1;
                debug!("History hit for {} ({} -> {})", &key.content_hash[..8], key.source_language, key.target_language);
            }
            None => {
                *self.misses.write() += 1;
                debug!("History miss for {} ({} -> {})", &key.content_hash[..8], key.source_language, key.target_language);
            }
        }

        found
    }

    /// Store a finished translation, evicting the oldest entry when full
    pub fn store(
        &self,
        content: &str,
        source_language: &str,
        target_language: &str,
        file_name: Option<&str>,
        translated_content: &str,
        confidence: &DocumentConfidence,
    ) {
        if !self.enabled {
            return;
        }

        let key = HistoryKey::new(content, source_language, target_language);
        let entry = HistoryEntry {
            content_hash: key.content_hash.clone(),
            file_name: file_name.map(str::to_string),
            source_language: key.source_language.clone(),
            target_language: key.target_language.clone(),
            translated_content: translated_content.to_string(),
            confidence: confidence.clone(),
            created_at: Utc::now(),
        };

        let mut entries = self.entries.write();
        let mut order = self.order.write();

        if entries.insert(key.clone(), entry).is_none() {
            order.push_back(key);
        }

        while order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                entries.remove(&oldest);
            }
        }
    }

    /// Stored entries, most recent first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let entries = self.entries.read();
        let mut list: Vec<HistoryEntry> = entries.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Entries stored for one content digest, one per language pair, most recent first
    pub fn get_by_hash(&self, content_hash: &str) -> Vec<HistoryEntry> {
        let entries = self.entries.read();
        let mut found: Vec<HistoryEntry> = entries
            .iter()
            .filter(|(key, _)| key.content_hash == content_hash)
            .map(|(_, entry)| entry.clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Delete every entry stored for a content digest, returning how many went
    pub fn remove(&self, content_hash: &str) -> usize {
        let mut entries = self.entries.write();
        let mut order = self.order.write();

        let before = entries.len();
        entries.retain(|key, _| key.content_hash != content_hash);
        order.retain(|key| key.content_hash != content_hash);

        let removed = before - entries.len();
        if removed > 0 {
            debug!("Removed {} history entries for {}", removed, &content_hash[..content_hash.len().min(8)]);
        }
        removed
    }

    /// Get cache statistics: hits, misses, hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear the history and its counters
    pub fn clear(&self) {
        self.entries.write().clear();
        self.order.write().clear();
        *self.hits.write() = 0;
        *self.misses.write() = 0;
    }
}

/// Hex SHA-256 digest of the content
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

fn normalize_language(code: &str) -> String {
    let code = code.trim().to_lowercase();
    if code.is_empty() { "auto".to_string() } else { code }
}
