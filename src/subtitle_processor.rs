use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: SRT parsing, serialization and pre-flight validation

// @const: SRT timecode line regex (validator only, the parser treats timecodes as opaque)
static TIMECODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2},\d{3}\s-->\s\d{2}:\d{2}:\d{2},\d{3}$").unwrap()
});

const BOM: char = '\u{feff}';

// @struct: Single timed subtitle entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    // @field: Entry id as written in the file (unique, not necessarily contiguous)
    pub id: u32,

    // @field: Timecode line, kept byte-for-byte
    pub time_code: String,

    // @field: Text lines, never empty for a well-formed record
    pub lines: Vec<String>,
}

impl SubtitleRecord {
    /// Creates a record without checking its invariants - used by tests and mocks
    pub fn new(id: u32, time_code: impl Into<String>, lines: Vec<String>) -> Self {
        SubtitleRecord {
            id,
            time_code: time_code.into(),
            lines,
        }
    }

    // @creates: Validated subtitle record
    // @validates: At least one text line
    pub fn new_validated(id: u32, time_code: impl Into<String>, lines: Vec<String>) -> Result<Self, SubtitleError> {
        if lines.is_empty() {
            return Err(SubtitleError::InvalidFormat(format!("subtitle {} has no text lines", id)));
        }

        Ok(Self::new(id, time_code, lines))
    }

    /// Text lines joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of characters over all text lines (id and timecode excluded)
    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|line| line.chars().count()).sum()
    }

    /// Copy of this record carrying different text lines
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self::new(self.id, self.time_code.clone(), lines)
    }
}

impl fmt::Display for SubtitleRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{}", self.time_code)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Ordered sequence of subtitle records in original file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    records: Vec<SubtitleRecord>,
}

impl SubtitleDocument {
    /// Wrap an already built list of records
    pub fn from_records(records: Vec<SubtitleRecord>) -> Self {
        Self { records }
    }

    /// Parse SRT content into a document.
    ///
    /// Parsing never fails: malformed blocks are skipped and logged, so the
    /// result may be empty or partial. Use [`is_valid_srt`] as the strict gate.
    pub fn parse(content: &str) -> Self {
        let normalized = normalize_line_endings(content);
        let mut records = Vec::new();

        for (block_index, block) in split_blocks(&normalized).into_iter().enumerate() {
            if block.len() < 2 {
                debug!("Skipping block {}: fewer than two lines", block_index + 1);
                continue;
            }

            let id = match block[0].trim().parse::<u32>() {
                Ok(id) => id,
                Err(_) => {
                    warn!("Skipping block {}: '{}' is not a subtitle id", block_index + 1, block[0].trim());
                    continue;
                }
            };

            let time_code = block[1].to_string();
            let lines: Vec<String> = block[2..].iter().map(|line| line.to_string()).collect();

            match SubtitleRecord::new_validated(id, time_code, lines) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping subtitle {}: {}", id, e),
            }
        }

        Self { records }
    }

    /// Serialize back to SRT: one blank line between blocks, none after the last
    pub fn to_srt(&self) -> String {
        self.records
            .iter()
            .map(|record| record.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Records in document order
    pub fn records(&self) -> &[SubtitleRecord] {
        &self.records
    }

    /// Consume the document, returning its records
    pub fn into_records(self) -> Vec<SubtitleRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of text-line character counts, skipping id and timecode lines
    pub fn total_text_chars(&self) -> usize {
        self.records.iter().map(SubtitleRecord::char_count).sum()
    }
}

/// Strict pre-flight check run before any translation work starts.
///
/// Every block needs a numeric id, a `HH:MM:SS,mmm --> HH:MM:SS,mmm` timecode
/// and at least one non-empty text line.
pub fn is_valid_srt(content: &str) -> bool {
    check_srt(content).is_ok()
}

/// Same rules as [`is_valid_srt`], reporting the first violation
pub fn check_srt(content: &str) -> Result<(), SubtitleError> {
    if content.trim().trim_start_matches(BOM).trim().is_empty() {
        return Err(SubtitleError::Empty);
    }

    let normalized = normalize_line_endings(content);
    let blocks = split_blocks(&normalized);
    if blocks.is_empty() {
        return Err(SubtitleError::Empty);
    }

    for (block_index, block) in blocks.iter().enumerate() {
        let position = block_index + 1;
        if block.len() < 3 {
            return Err(SubtitleError::InvalidFormat(format!(
                "block {} needs an id, a timecode and at least one text line", position
            )));
        }

        if block[0].trim().parse::<u32>().is_err() {
            return Err(SubtitleError::InvalidFormat(format!(
                "block {} has a non-numeric id '{}'", position, block[0].trim()
            )));
        }

        if !TIMECODE_REGEX.is_match(block[1].trim()) {
            return Err(SubtitleError::InvalidFormat(format!(
                "block {} has a malformed timecode '{}'", position, block[1].trim()
            )));
        }
    }

    Ok(())
}

/// A text line longer than the configured maximum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineLengthViolation {
    pub subtitle_id: u32,
    /// 1-based line number inside the subtitle
    pub line_number: usize,
    pub line_content: String,
    pub length: usize,
}

impl fmt::Display for LineLengthViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Subtitle #{}, line {} ({} chars): {}",
            self.subtitle_id, self.line_number, self.length, self.line_content
        )
    }
}

// @checks: Lines exceeding max_chars_per_line characters
pub fn validate_line_length(document: &SubtitleDocument, max_chars_per_line: usize) -> Vec<LineLengthViolation> {
    let mut violations = Vec::new();

    for record in document.records() {
        for (index, line) in record.lines.iter().enumerate() {
            let length = line.chars().count();
            if length > max_chars_per_line {
                violations.push(LineLengthViolation {
                    subtitle_id: record.id,
                    line_number: index + 1,
                    line_content: line.clone(),
                    length,
                });
            }
        }
    }

    violations
}

// @normalizes: CRLF and lone CR to LF, drops a leading BOM
fn normalize_line_endings(content: &str) -> String {
    content
        .trim_start_matches(BOM)
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

// @splits: Content into blocks of non-blank lines separated by blank lines
fn split_blocks(normalized: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}
