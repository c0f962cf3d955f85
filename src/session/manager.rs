/*!
 * Progress session registry.
 *
 * This module handles:
 * - Creating sessions and computing their character totals
 * - Handing out the single writer allowed per session
 * - Snapshot queries and push subscriptions for pollers
 * - Cooperative cancellation
 * - Cleanup of terminal sessions
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

use crate::errors::SessionError;
use crate::subtitle_processor::SubtitleDocument;

use super::models::{CANCELLED_MESSAGE, Phase, ProgressSnapshot, RateEstimator, progress_percentage, short_id};

/// Default progress percentage after which time estimates are published
pub const DEFAULT_ESTIMATE_THRESHOLD_PERCENT: f64 = 5.0;

/// Mutable state of one session, guarded by the slot mutex
#[derive(Debug)]
struct SessionState {
    snapshot: ProgressSnapshot,
    started: Instant,
    updated: Instant,
    rate: RateEstimator,
}

#[derive(Debug)]
struct SessionSlot {
    state: Mutex<SessionState>,
    cancel: Arc<AtomicBool>,
    writer_claimed: AtomicBool,
    sender: watch::Sender<ProgressSnapshot>,
}

impl SessionSlot {
    fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().snapshot.clone()
    }

    // Apply a phase change under the lock and publish the resulting snapshot
    fn transition<F>(&self, next: Phase, mutate: F) -> Result<ProgressSnapshot, SessionError>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = self.state.lock();
        let current = state.snapshot.phase;

        if current.is_terminal() {
            return Err(SessionError::Terminal {
                session_id: state.snapshot.session_id.clone(),
                phase: current.to_string(),
            });
        }
        if !current.can_transition_to(next) {
            return Err(SessionError::IllegalTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        state.snapshot.phase = next;
        mutate(&mut state);
        state.updated = Instant::now();

        let snapshot = state.snapshot.clone();
        self.sender.send_replace(snapshot.clone());
        Ok(snapshot)
    }
}

/// Process-wide registry of progress sessions keyed by session id
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    estimate_threshold_percent: f64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ESTIMATE_THRESHOLD_PERCENT)
    }
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new(estimate_threshold_percent: f64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            estimate_threshold_percent,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a session for SRT content and move it to `preparing`
    pub fn init(&self, srt_content: &str) -> String {
        let total_chars = SubtitleDocument::parse(srt_content).total_text_chars();
        self.init_with_total(total_chars)
    }

    /// Create a session for a known character total and move it to `preparing`
    pub fn init_with_total(&self, total_chars: usize) -> String {
        let session_id = Uuid::new_v4().to_string();
        let snapshot = ProgressSnapshot::starting(session_id.clone(), total_chars);
        let (sender, _) = watch::channel(snapshot.clone());
        let now = Instant::now();

        let slot = Arc::new(SessionSlot {
            state: Mutex::new(SessionState {
                snapshot,
                started: now,
                updated: now,
                rate: RateEstimator::default(),
            }),
            cancel: Arc::new(AtomicBool::new(false)),
            writer_claimed: AtomicBool::new(false),
            sender,
        });

        // starting -> preparing is always legal on a fresh slot
        let _ = slot.transition(Phase::Preparing, |state| {
            state.snapshot.message = "Preparing translation".to_string();
        });

        self.sessions.write().insert(session_id.clone(), slot);
        info!("Created session {} ({} chars)", short_id(&session_id), total_chars);

        session_id
    }

    /// Claim the only writer of a session
    pub fn writer(&self, session_id: &str) -> Result<SessionWriter, SessionError> {
        let slot = self.slot(session_id)?;

        if slot.writer_claimed.swap(true, Ordering::SeqCst) {
            return Err(SessionError::WriterTaken(session_id.to_string()));
        }

        Ok(SessionWriter {
            session_id: session_id.to_string(),
            slot,
            estimate_threshold_percent: self.estimate_threshold_percent,
        })
    }

    /// Current snapshot of a session
    pub fn query(&self, session_id: &str) -> Result<ProgressSnapshot, SessionError> {
        Ok(self.slot(session_id)?.snapshot())
    }

    /// Receiver seeing every snapshot published from now on
    pub fn subscribe(&self, session_id: &str) -> Result<watch::Receiver<ProgressSnapshot>, SessionError> {
        Ok(self.slot(session_id)?.sender.subscribe())
    }

    /// Cancel a running session.
    ///
    /// Returns `Ok(false)` when the session is already terminal.
    pub fn cancel(&self, session_id: &str) -> Result<bool, SessionError> {
        let slot = self.slot(session_id)?;
        let flag = &slot.cancel;

        // the flag is raised before the error snapshot becomes visible
        let result = slot.transition(Phase::Error, |state| {
            flag.store(true, Ordering::SeqCst);
            state.snapshot.message = CANCELLED_MESSAGE.to_string();
            state.snapshot.cancelled = true;
            state.snapshot.estimated_total_time_ms = None;
            state.snapshot.remaining_time_ms = None;
        });

        match result {
            Ok(_) => {
                info!("Session {} cancelled", short_id(session_id));
                Ok(true)
            }
            Err(SessionError::Terminal { .. }) => {
                debug!("Session {} already terminal, cancel ignored", short_id(session_id));
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a session, returning whether it existed
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    /// Remove terminal sessions not updated for at least `ttl`
    pub fn purge_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();

        sessions.retain(|_, slot| {
            let state = slot.state.lock();
            !(state.snapshot.is_terminal() && state.updated.elapsed() >= ttl)
        });

        let purged = before - sessions.len();
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }
        purged
    }

    /// Ids of every known session
    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn slot(&self, session_id: &str) -> Result<Arc<SessionSlot>, SessionError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }
}

/// The single handle allowed to advance a session
#[derive(Debug)]
pub struct SessionWriter {
    session_id: String,
    slot: Arc<SessionSlot>,
    estimate_threshold_percent: f64,
}

impl SessionWriter {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Flag raised by `cancel`, shared with the engine
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.slot.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.cancel.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.slot.snapshot()
    }

    /// Replace the character total while still preparing
    pub fn set_total_chars(&self, total_chars: usize) -> Result<ProgressSnapshot, SessionError> {
        let mut state = self.slot.state.lock();
        if state.snapshot.phase != Phase::Preparing {
            return Err(SessionError::IllegalTransition {
                from: state.snapshot.phase.to_string(),
                to: Phase::Preparing.to_string(),
            });
        }

        state.snapshot.total_chars = total_chars;
        state.updated = Instant::now();
        let snapshot = state.snapshot.clone();
        self.slot.sender.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// Record a completed batch
    pub fn translating(&self, translated_chars: usize, message: impl Into<String>) -> Result<ProgressSnapshot, SessionError> {
        let threshold = self.estimate_threshold_percent;
        let message = message.into();

        self.slot.transition(Phase::Translating, |state| {
            let total = state.snapshot.total_chars;
            let translated = translated_chars.max(state.snapshot.translated_chars).min(total);
            let progress = progress_percentage(translated, total);

            let estimates = if progress > threshold {
                let elapsed_ms = state.started.elapsed().as_millis() as u64;
                state.rate.observe(translated, elapsed_ms);
                state.rate.estimates(translated, total)
            } else {
                None
            };

            state.snapshot.translated_chars = translated;
            state.snapshot.progress = progress;
            state.snapshot.message = message;
            state.snapshot.estimated_total_time_ms = estimates.map(|(total, _)| total);
            state.snapshot.remaining_time_ms = estimates.map(|(_, remaining)| remaining);
        })
    }

    /// Record a cache hit: the whole document is translated at once
    pub fn translating_all(&self, message: impl Into<String>) -> Result<ProgressSnapshot, SessionError> {
        let message = message.into();

        self.slot.transition(Phase::Translating, |state| {
            state.snapshot.translated_chars = state.snapshot.total_chars;
            state.snapshot.progress = 100.0;
            state.snapshot.message = message;
        })
    }

    /// All batches are done, output is being assembled
    pub fn finalizing(&self, message: impl Into<String>) -> Result<ProgressSnapshot, SessionError> {
        let message = message.into();

        self.slot.transition(Phase::Finalizing, |state| {
            state.snapshot.message = message;
        })
    }

    /// Terminal success; progress is forced to 100
    pub fn complete(&self, message: impl Into<String>) -> Result<ProgressSnapshot, SessionError> {
        let message = message.into();

        let snapshot = self.slot.transition(Phase::Completed, |state| {
            state.snapshot.translated_chars = state.snapshot.total_chars;
            state.snapshot.progress = 100.0;
            state.snapshot.message = message;
            state.snapshot.estimated_total_time_ms = Some(state.started.elapsed().as_millis() as u64);
            state.snapshot.remaining_time_ms = Some(0);
        })?;

        info!("Session {} completed", short_id(&self.session_id));
        Ok(snapshot)
    }

    /// Terminal failure with a human-readable message
    pub fn fail(&self, message: impl Into<String>) -> Result<ProgressSnapshot, SessionError> {
        let message = message.into();
        warn!("Session {} failed: {}", short_id(&self.session_id), message);

        self.slot.transition(Phase::Error, |state| {
            state.snapshot.message = message;
            state.snapshot.estimated_total_time_ms = None;
            state.snapshot.remaining_time_ms = None;
        })
    }
}
