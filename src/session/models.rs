/*!
 * Progress session models.
 *
 * A session walks `starting -> preparing -> translating* -> finalizing ->
 * completed`, or drops into `error` from any non-terminal phase. Snapshots
 * serialize to the camelCase shape pollers expect.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message stored on a session cancelled by the caller
pub const CANCELLED_MESSAGE: &str = "Translation cancelled";

/// Phase of a progress session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Starting,
    Preparing,
    Translating,
    Finalizing,
    Completed,
    Error,
}

impl Phase {
    /// No transition leaves a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Error)
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;

        match (self, next) {
            (from, Error) => !from.is_terminal(),
            (Starting, Preparing)
            | (Preparing, Translating)
            | (Translating, Translating)
            | (Preparing, Finalizing)
            | (Translating, Finalizing)
            | (Finalizing, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Preparing => "preparing",
            Phase::Translating => "translating",
            Phase::Finalizing => "finalizing",
            Phase::Completed => "completed",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session, handed out to pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Session ID
    pub session_id: String,
    /// Current phase
    pub phase: Phase,
    /// Percentage in [0, 100]
    pub progress: f64,
    /// Source characters translated so far
    pub translated_chars: usize,
    /// Source characters in the whole document
    pub total_chars: usize,
    /// Human-readable status line
    pub message: String,
    /// Projected total duration, once enough signal exists
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub estimated_total_time_ms: Option<u64>,
    /// Projected remaining duration, once enough signal exists
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remaining_time_ms: Option<u64>,
    /// Set when the session ended through `cancel`
    #[serde(default)]
    pub cancelled: bool,
}

impl ProgressSnapshot {
    /// Fresh snapshot in the `starting` phase
    pub fn starting(session_id: impl Into<String>, total_chars: usize) -> Self {
        Self {
            session_id: session_id.into(),
            phase: Phase::Starting,
            progress: 0.0,
            translated_chars: 0,
            total_chars,
            message: "Starting translation".to_string(),
            estimated_total_time_ms: None,
            remaining_time_ms: None,
            cancelled: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// First eight characters of the id, for logs
    pub fn short_id(&self) -> &str {
        short_id(&self.session_id)
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {:.1}% ({}/{} chars) {}",
            self.short_id(),
            self.phase,
            self.progress,
            self.translated_chars,
            self.total_chars,
            self.message
        )
    }
}

/// Percentage of `translated` over `total`, clamped to [0, 100]
pub fn progress_percentage(translated: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (translated as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Smoothed characters-per-millisecond rate used for time estimates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateEstimator {
    rate: Option<f64>,
}

impl RateEstimator {
    /// Weight kept from the previous rate
    pub const PREVIOUS_WEIGHT: f64 = 0.7;

    /// Fold a new observation into the rate and return it
    pub fn observe(&mut self, translated_chars: usize, elapsed_ms: u64) -> Option<f64> {
        if translated_chars == 0 || elapsed_ms == 0 {
            return self.rate;
        }

        let current = translated_chars as f64 / elapsed_ms as f64;
        let previous = self.rate.unwrap_or(current);
        let updated = previous * Self::PREVIOUS_WEIGHT + current * (1.0 - Self::PREVIOUS_WEIGHT);
        self.rate = Some(updated);
        self.rate
    }

    /// (estimated total, remaining) in milliseconds for the current rate
    pub fn estimates(&self, translated_chars: usize, total_chars: usize) -> Option<(u64, u64)> {
        let rate = self.rate.filter(|rate| *rate > 0.0)?;
        let total = (total_chars as f64 / rate) as u64;
        let remaining = (total_chars.saturating_sub(translated_chars) as f64 / rate) as u64;
        Some((total, remaining))
    }
}
