/*!
 * Marker envelopes for batch translation.
 *
 * Each record of a batch is wrapped in a record envelope carrying its id, and
 * each of its lines in a line envelope carrying the 1-based line index:
 *
 * ```text
 * <SUBT:12>
 * <LINE:1>Hello there</LINE:1>
 * <LINE:2>General Kenobi</LINE:2>
 * </SUBT:12>
 * <SUBT_DIV>
 * <SUBT:13>
 * ...
 * ```
 *
 * Decoding is regex based and lenient: whitespace inside or around markers,
 * tag case, envelope order and missing close tags are all tolerated. The
 * syntax lives behind [`MarkerCodec`] so it can be swapped without touching
 * partitioning or confidence logic.
 */

use std::collections::HashSet;
use std::fmt::Debug;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitle_processor::SubtitleRecord;

static RECORD_OPEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*SUBT\s*:\s*(\d+)\s*>").expect("Invalid record open marker regex")
});

static RECORD_CLOSE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/\s*SUBT\s*:\s*(\d+)\s*>").expect("Invalid record close marker regex")
});

static LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<\s*LINE\s*:\s*(\d+)\s*>(.*?)<\s*/\s*LINE\s*:\s*\d+\s*>")
        .expect("Invalid line marker regex")
});

static SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*SUBT_DIV\s*>").expect("Invalid separator regex")
});

static ANY_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*/?\s*(?:SUBT|LINE)\s*:\s*\d+\s*>|<\s*SUBT_DIV\s*>")
        .expect("Invalid marker regex")
});

/// Separator placed between record envelopes of the same batch
pub const RECORD_SEPARATOR: &str = "<SUBT_DIV>";

/// What the decoder recovered for one record id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpan {
    /// Record id carried by the envelope
    pub id: u32,

    /// Lines recovered through line markers, ordered by line index
    pub marked_lines: Vec<String>,

    /// Whole span with every marker stripped, blank lines removed
    pub raw_text: String,
}

/// Encodes a batch into one blob and recovers per-record spans from the
/// provider's rewrite of that blob
pub trait MarkerCodec: Send + Sync + Debug {
    /// Encode the records of a batch into a single text blob
    fn encode(&self, records: &[SubtitleRecord]) -> String;

    /// Find the spans of `expected_ids` in a translated blob.
    ///
    /// Ids that are absent from the result are unmatched; ids that do not
    /// belong to the batch are ignored; the first occurrence of a duplicated
    /// envelope wins.
    fn decode(&self, translated: &str, expected_ids: &[u32]) -> Vec<RecordSpan>;
}

/// Bracketed-tag marker syntax (`<SUBT:id>`, `<LINE:n>`)
#[derive(Debug, Clone, Copy, Default)]
pub struct TagMarkerCodec;

impl MarkerCodec for TagMarkerCodec {
    fn encode(&self, records: &[SubtitleRecord]) -> String {
        records
            .iter()
            .map(encode_record)
            .collect::<Vec<_>>()
            .join(&format!("\n{}\n", RECORD_SEPARATOR))
    }

    fn decode(&self, translated: &str, expected_ids: &[u32]) -> Vec<RecordSpan> {
        let expected: HashSet<u32> = expected_ids.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut spans = Vec::new();

        let opens: Vec<(u32, usize, usize)> = RECORD_OPEN_REGEX
            .captures_iter(translated)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let id = caps.get(1)?.as_str().parse::<u32>().ok()?;
                Some((id, whole.start(), whole.end()))
            })
            .collect();

        for (position, &(id, _, body_start)) in opens.iter().enumerate() {
            if !expected.contains(&id) || seen.contains(&id) {
                continue;
            }

            let region_end = opens
                .get(position + 1)
                .map(|&(_, next_start, _)| next_start)
                .unwrap_or(translated.len());
            let region = &translated[body_start..region_end];
            let body = span_body(region, id);

            seen.insert(id);
            spans.push(RecordSpan {
                id,
                marked_lines: extract_marked_lines(body),
                raw_text: strip_markers(body),
            });
        }

        spans
    }
}

fn encode_record(record: &SubtitleRecord) -> String {
    let mut envelope = format!("<SUBT:{}>\n", record.id);
    for (index, line) in record.lines.iter().enumerate() {
        let line_number = index + 1;
        envelope.push_str(&format!("<LINE:{}>{}</LINE:{}>\n", line_number, line, line_number));
    }
    envelope.push_str(&format!("</SUBT:{}>", record.id));
    envelope
}

// Cut the region at the matching close tag, or at the next separator when the close tag is missing
fn span_body(region: &str, id: u32) -> &str {
    let close = RECORD_CLOSE_REGEX.captures_iter(region).find_map(|caps| {
        let whole = caps.get(0)?;
        let close_id = caps.get(1)?.as_str().parse::<u32>().ok()?;
        (close_id == id).then_some(whole.start())
    });

    match close {
        Some(end) => &region[..end],
        None => match SEPARATOR_REGEX.find(region) {
            Some(separator) => &region[..separator.start()],
            None => region,
        },
    }
}

fn extract_marked_lines(body: &str) -> Vec<String> {
    let mut lines: Vec<(u32, String)> = LINE_REGEX
        .captures_iter(body)
        .filter_map(|caps| {
            let index = caps.get(1)?.as_str().parse::<u32>().ok()?;
            let text = strip_markers(caps.get(2)?.as_str());
            Some((index, text))
        })
        .filter(|(_, text)| !text.is_empty())
        .collect();

    // stable: equal indices keep provider order, then the first one wins
    lines.sort_by_key(|(index, _)| *index);
    lines.dedup_by_key(|(index, _)| *index);
    lines.into_iter().map(|(_, text)| text).collect()
}

fn strip_markers(text: &str) -> String {
    ANY_MARKER_REGEX
        .replace_all(text, "\n")
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
