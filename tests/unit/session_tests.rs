/*!
 * Tests for progress sessions and their state machine
 */

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use subrecon::errors::SessionError;
use subrecon::session::models::{RateEstimator, progress_percentage};
use subrecon::session::{CANCELLED_MESSAGE, Phase, SessionRegistry};
use crate::common;

/// Test the transition table of the phase state machine
#[test]
fn test_phase_transitions_withStateMachine_shouldAllowOnlyLegalMoves() {
    use Phase::*;

    assert!(Starting.can_transition_to(Preparing));
    assert!(Preparing.can_transition_to(Translating));
    assert!(Translating.can_transition_to(Translating));
    assert!(Preparing.can_transition_to(Finalizing));
    assert!(Translating.can_transition_to(Finalizing));
    assert!(Finalizing.can_transition_to(Completed));

    for phase in [Starting, Preparing, Translating, Finalizing] {
        assert!(phase.can_transition_to(Error), "{} -> error should be legal", phase);
    }

    assert!(!Preparing.can_transition_to(Completed));
    assert!(!Finalizing.can_transition_to(Translating));
    assert!(!Completed.can_transition_to(Error));
    assert!(!Error.can_transition_to(Preparing));
}

/// Test that a new session is preparing with nothing translated
#[test]
fn test_init_withSampleContent_shouldBePreparingAtZero() {
    let registry = SessionRegistry::default();
    let id = registry.init(common::SAMPLE_SRT);
    let snapshot = registry.query(&id).unwrap();

    assert_eq!(snapshot.phase, Phase::Preparing);
    assert_eq!(snapshot.progress, 0.0);
    assert_eq!(snapshot.translated_chars, 0);
    assert_eq!(snapshot.total_chars, 42);
    assert!(snapshot.remaining_time_ms.is_none());
    assert!(!snapshot.cancelled);
}

/// Test unknown ids
#[test]
fn test_registry_withUnknownId_shouldReturnNotFound() {
    let registry = SessionRegistry::default();

    assert!(matches!(registry.query("nope"), Err(SessionError::NotFound(_))));
    assert!(matches!(registry.cancel("nope"), Err(SessionError::NotFound(_))));
    assert!(matches!(registry.writer("nope"), Err(SessionError::NotFound(_))));
}

/// Test that only one writer can be claimed
#[test]
fn test_writer_whenClaimedTwice_shouldRejectSecondClaim() {
    let registry = SessionRegistry::default();
    let id = registry.init_with_total(10);

    let _writer = registry.writer(&id).unwrap();
    assert!(matches!(registry.writer(&id), Err(SessionError::WriterTaken(_))));
}

/// Test a full successful walk through the phases
#[test]
fn test_writer_withFullRun_shouldReachCompletedAtHundred() {
    let registry = SessionRegistry::default();
    let id = registry.init_with_total(200);
    let writer = registry.writer(&id).unwrap();

    let first = writer.translating(50, "batch 1/4").unwrap();
    assert_eq!(first.phase, Phase::Translating);
    assert_eq!(first.progress, 25.0);

    let regressed = writer.translating(20, "late update").unwrap();
    assert_eq!(regressed.translated_chars, 50, "progress must not move backwards");

    let over = writer.translating(500, "batch 4/4").unwrap();
    assert_eq!(over.progress, 100.0);

    writer.finalizing("assembling").unwrap();
    let done = writer.complete("done").unwrap();
    assert_eq!(done.phase, Phase::Completed);
    assert_eq!(done.progress, 100.0);
    assert_eq!(done.remaining_time_ms, Some(0));

    assert!(matches!(writer.translating(10, "again"), Err(SessionError::Terminal { .. })));
    assert!(matches!(writer.fail("late"), Err(SessionError::Terminal { .. })));
}

/// Test illegal transitions are rejected without changing state
#[test]
fn test_writer_withIllegalTransition_shouldKeepPhase() {
    let registry = SessionRegistry::default();
    let id = registry.init_with_total(10);
    let writer = registry.writer(&id).unwrap();

    assert!(matches!(writer.complete("too early"), Err(SessionError::IllegalTransition { .. })));
    assert_eq!(registry.query(&id).unwrap().phase, Phase::Preparing);
}

/// Test estimates stay hidden below the progress threshold
#[test]
fn test_translating_belowThreshold_shouldNotPublishEstimates() {
    let registry = SessionRegistry::new(50.0);
    let id = registry.init_with_total(100);
    let writer = registry.writer(&id).unwrap();

    std::thread::sleep(Duration::from_millis(5));
    let early = writer.translating(10, "batch").unwrap();
    assert!(early.estimated_total_time_ms.is_none());
    assert!(early.remaining_time_ms.is_none());

    std::thread::sleep(Duration::from_millis(5));
    let later = writer.translating(60, "batch").unwrap();
    let total = later.estimated_total_time_ms.expect("estimate above threshold");
    let remaining = later.remaining_time_ms.expect("remaining above threshold");
    assert!(remaining <= total);
}

/// Test cancellation of a running and of a finished session
#[test]
fn test_cancel_withRunningAndTerminalSessions_shouldReportWhetherItActed() {
    let registry = SessionRegistry::default();
    let id = registry.init_with_total(10);
    let writer = registry.writer(&id).unwrap();
    writer.translating(5, "half").unwrap();

    assert!(registry.cancel(&id).unwrap());
    assert!(writer.is_cancelled());

    let snapshot = registry.query(&id).unwrap();
    assert_eq!(snapshot.phase, Phase::Error);
    assert_eq!(snapshot.message, CANCELLED_MESSAGE);
    assert!(snapshot.cancelled);

    assert!(!registry.cancel(&id).unwrap());
    assert!(matches!(writer.translating(8, "too late"), Err(SessionError::Terminal { .. })));
}

/// Test a reader that sees the cancelled phase also sees the raised flag
#[test]
fn test_cancel_fromAnotherThread_shouldRaiseFlagBeforeErrorIsVisible() {
    let registry = Arc::new(SessionRegistry::default());

    for _ in 0..50 {
        let id = registry.init_with_total(10);
        let writer = registry.writer(&id).unwrap();
        writer.translating(3, "running").unwrap();

        let canceller = {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            thread::spawn(move || registry.cancel(&id))
        };

        loop {
            let snapshot = registry.query(&id).unwrap();
            if snapshot.phase == Phase::Error {
                assert!(writer.is_cancelled(), "error phase published before the cancel flag");
                break;
            }
            thread::yield_now();
        }

        assert!(canceller.join().unwrap().unwrap());
    }
}

/// Test subscribers see published snapshots
#[tokio::test]
async fn test_subscribe_withUpdates_shouldReceiveLatestSnapshot() {
    let registry = SessionRegistry::default();
    let id = registry.init_with_total(4);
    let mut receiver = registry.subscribe(&id).unwrap();
    let writer = registry.writer(&id).unwrap();

    writer.translating(2, "halfway").unwrap();
    receiver.changed().await.unwrap();
    assert_eq!(receiver.borrow().translated_chars, 2);
}

/// Test cleanup of terminal sessions only
#[test]
fn test_purge_expired_withZeroTtl_shouldRemoveTerminalSessionsOnly() {
    let registry = SessionRegistry::default();
    let running = registry.init_with_total(10);
    let finished = registry.init_with_total(10);
    registry.writer(&finished).unwrap().fail("boom").unwrap();

    assert_eq!(registry.purge_expired(Duration::ZERO), 1);
    assert_eq!(registry.ids(), vec![running.clone()]);
    assert!(registry.remove(&running));
    assert!(registry.is_empty());
}

/// Test the smoothed rate and percentage helpers
#[test]
fn test_rate_estimator_withTwoObservations_shouldSmooth() {
    let mut rate = RateEstimator::default();
    assert!(rate.estimates(0, 100).is_none());

    assert_eq!(rate.observe(10, 10), Some(1.0));
    let smoothed = rate.observe(40, 10).unwrap();
    assert!((smoothed - (0.7 * 1.0 + 0.3 * 4.0)).abs() < 1e-9);

    assert_eq!(progress_percentage(1, 0), 0.0);
    assert_eq!(progress_percentage(1, 4), 25.0);
}

/// Test snapshot serialization field names
#[test]
fn test_snapshot_serialization_shouldUseCamelCase() {
    let registry = SessionRegistry::default();
    let id = registry.init_with_total(3);
    let json = serde_json::to_value(registry.query(&id).unwrap()).unwrap();

    assert_eq!(json["sessionId"], id.as_str());
    assert_eq!(json["phase"], "preparing");
    assert_eq!(json["totalChars"], 3);
    assert!(json.get("remainingTimeMs").is_none());
}
