use std::fmt;

use serde::{Deserialize, Serialize};

use crate::translation::reconcile::{ReconcileMethod, ReconciledRecord};

// @module: Reliability signal derived from how each record was reconciled

// @const: Aggregate thresholds consumed by callers for messaging
pub const HIGH_THRESHOLD: f64 = 0.8;
pub const MEDIUM_THRESHOLD: f64 = 0.5;

// @const: Per-method scores
pub const STRUCTURAL_SCORE: f64 = 1.0;
pub const DEGRADED_SCORE: f64 = 0.7;
pub const FALLBACK_SCORE: f64 = 0.3;

/// Confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Bucket for a numeric score using the aggregate thresholds
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// @struct: Confidence of one translated record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRecord {
    pub id: u32,
    pub confidence: f64,
    pub level: ConfidenceLevel,
}

// @struct: Aggregate over a whole document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfidence {
    pub records: Vec<ConfidenceRecord>,
    pub average_confidence: f64,
    pub average_confidence_level: ConfidenceLevel,
}

/// Score and level for a reconciliation method
pub fn score_for(method: ReconcileMethod) -> (f64, ConfidenceLevel) {
    match method {
        ReconcileMethod::Structural => (STRUCTURAL_SCORE, ConfidenceLevel::High),
        ReconcileMethod::Degraded => (DEGRADED_SCORE, ConfidenceLevel::Medium),
        ReconcileMethod::Fallback => (FALLBACK_SCORE, ConfidenceLevel::Low),
    }
}

/// Build the per-record confidence list and its aggregate.
///
/// The average of an empty document is 1.0.
pub fn summarize(records: &[ReconciledRecord]) -> DocumentConfidence {
    let records: Vec<ConfidenceRecord> = records
        .iter()
        .map(|reconciled| {
            let (confidence, level) = score_for(reconciled.method);
            ConfidenceRecord { id: reconciled.record.id, confidence, level }
        })
        .collect();

    let average_confidence = if records.is_empty() {
        1.0
    } else {
        records.iter().map(|r| r.confidence).sum::<f64>() / records.len() as f64
    };

    DocumentConfidence {
        average_confidence_level: ConfidenceLevel::from_score(average_confidence),
        average_confidence,
        records,
    }
}
