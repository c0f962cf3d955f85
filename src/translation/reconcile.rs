/*!
 * Response reconciliation.
 *
 * Maps a provider's rewrite of an encoded batch back onto the original
 * records by identity. Records are matched structurally through their marker
 * spans; anything the decoder cannot place ends up in the `unmatched` list and
 * is recovered by the engine with one individual call per record.
 */

use std::collections::HashMap;

use log::{debug, warn};
use serde::Serialize;

use crate::subtitle_processor::SubtitleRecord;
use crate::translation::markers::{MarkerCodec, RecordSpan};

/// How a translated record was recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMethod {
    /// Line markers found, line count preserved
    Structural,
    /// Record span found, but line recovery was partial
    Degraded,
    /// Recovered through an individual provider call
    Fallback,
}

/// One record after reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledRecord {
    pub record: SubtitleRecord,
    pub method: ReconcileMethod,
}

/// Outcome of matching one batch
#[derive(Debug, Clone, Default)]
pub struct BatchReconciliation {
    /// Records matched from the batch blob, in batch order
    pub matched: Vec<ReconciledRecord>,

    /// Original records whose id was missing from the blob or whose span was empty
    pub unmatched: Vec<SubtitleRecord>,
}

impl BatchReconciliation {
    /// True when every record was matched from the batch blob
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Match the translated blob of a batch against the batch's original records
pub fn reconcile_batch(
    codec: &dyn MarkerCodec,
    originals: &[SubtitleRecord],
    translated: &str,
) -> BatchReconciliation {
    let ids: Vec<u32> = originals.iter().map(|record| record.id).collect();
    let mut spans: HashMap<u32, RecordSpan> = codec
        .decode(translated, &ids)
        .into_iter()
        .map(|span| (span.id, span))
        .collect();

    let mut result = BatchReconciliation::default();

    for original in originals {
        let Some(span) = spans.remove(&original.id) else {
            warn!("Subtitle {} missing from batch response", original.id);
            result.unmatched.push(original.clone());
            continue;
        };

        match reconcile_span(original, span) {
            Some(reconciled) => result.matched.push(reconciled),
            None => {
                warn!("Subtitle {} came back empty", original.id);
                result.unmatched.push(original.clone());
            }
        }
    }

    debug!("Reconciled {} of {} subtitles structurally", result.matched.len(), originals.len());
    result
}

fn reconcile_span(original: &SubtitleRecord, span: RecordSpan) -> Option<ReconciledRecord> {
    if !span.marked_lines.is_empty() {
        let method = if span.marked_lines.len() == original.lines.len() {
            ReconcileMethod::Structural
        } else {
            debug!("Subtitle {}: expected {} lines, recovered {}",
                   original.id, original.lines.len(), span.marked_lines.len());
            ReconcileMethod::Degraded
        };
        return Some(ReconciledRecord {
            record: original.with_lines(span.marked_lines),
            method,
        });
    }

    let lines = split_text_lines(&span.raw_text);
    if lines.is_empty() {
        return None;
    }

    Some(ReconciledRecord {
        record: original.with_lines(lines),
        method: ReconcileMethod::Degraded,
    })
}

/// Split provider text on newlines, trimming and dropping blank lines
pub fn split_text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
