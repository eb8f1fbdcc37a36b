// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the status polling loop.

mod common;

use std::time::Duration;

use common::{Script, TestError, fast_policy, statuses};
use converge_core::{
    CancellationToken, ConvergeError, FailureKind, OperationKind, ReconciliationOutcome,
    StatePoller, StatusSnapshot, TimeoutCause,
};
use tokio::time::Instant;

fn build_active_poller(timeout: Duration) -> StatePoller {
    StatePoller::new(
        fast_policy(timeout)
            .with_pending(["BUILD"])
            .with_target(["ACTIVE"])
            .with_fatal(["ERROR"]),
    )
    .unwrap()
}

/// Pending for three ticks then active: exactly four fetches, real clock.
#[tokio::test]
async fn test_converges_after_pending_ticks() {
    let script = statuses(&["BUILD", "BUILD", "BUILD", "ACTIVE"]);
    let poller = build_active_poller(Duration::from_secs(1));

    let started = Instant::now();
    let outcome = poller
        .poll(OperationKind::Create, || async { script.next() })
        .await;
    let elapsed = started.elapsed();

    assert_eq!(
        outcome,
        ReconciliationOutcome::Converged {
            status: "ACTIVE".to_string()
        }
    );
    assert_eq!(script.calls(), 4);
    assert!(elapsed >= Duration::from_millis(30), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(1), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_converges_on_first_fetch() {
    let script = statuses(&["ACTIVE"]);
    let outcome = build_active_poller(Duration::from_secs(1))
        .poll(OperationKind::Create, || async { script.next() })
        .await;

    assert_eq!(outcome.status(), Some("ACTIVE"));
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_wins_over_unobserved_target() {
    // Never leaves BUILD within the budget.
    let script = statuses(&["BUILD"]);
    let poller = build_active_poller(Duration::from_millis(55));

    let outcome = poller
        .poll(OperationKind::Create, || async { script.next() })
        .await;

    assert_eq!(
        outcome,
        ReconciliationOutcome::TimedOut {
            cause: TimeoutCause::Deadline
        }
    );
    assert!(script.calls() >= 5 && script.calls() <= 6);
    assert!(outcome.into_result().unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_is_cut_by_deadline() {
    let poller = build_active_poller(Duration::from_millis(100));

    let outcome = poller
        .poll(OperationKind::Create, || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, TestError>(StatusSnapshot::status("ACTIVE"))
        })
        .await;

    assert_eq!(
        outcome,
        ReconciliationOutcome::TimedOut {
            cause: TimeoutCause::Deadline
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_not_found_is_converged() {
    let script: Script<Result<StatusSnapshot, TestError>> =
        Script::new([Err(TestError::NotFound("vol-1".to_string()))]);
    let poller = StatePoller::new(
        fast_policy(Duration::from_secs(1))
            .with_pending(["deleting"])
            .with_target(["deleted"]),
    )
    .unwrap();

    let outcome = poller
        .poll(OperationKind::Delete, || async { script.next() })
        .await;

    assert_eq!(outcome.status(), Some(converge_core::DELETED_STATUS));
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_create_not_found_is_failure() {
    let script: Script<Result<StatusSnapshot, TestError>> =
        Script::new([Err(TestError::NotFound("pvm-1".to_string()))]);

    let outcome = build_active_poller(Duration::from_secs(1))
        .poll(OperationKind::Create, || async { script.next() })
        .await;

    match &outcome {
        ReconciliationOutcome::Failed { kind, reason, .. } => {
            assert_eq!(*kind, FailureKind::NotFound);
            assert!(reason.contains("pvm-1"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(matches!(
        outcome.into_result(),
        Err(ConvergeError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_counts_as_pending() {
    let script = Script::new([
        Err(TestError::Unavailable),
        Err(TestError::Unavailable),
        Ok(StatusSnapshot::status("ACTIVE")),
    ]);

    let outcome = build_active_poller(Duration::from_secs(1))
        .poll(OperationKind::Update, || async { script.next() })
        .await;

    assert!(outcome.is_converged());
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_stops_immediately() {
    let script: Script<Result<StatusSnapshot, TestError>> =
        Script::new([Err(TestError::Fatal("forbidden".to_string()))]);

    let outcome = build_active_poller(Duration::from_secs(1))
        .poll(OperationKind::Update, || async { script.next() })
        .await;

    assert!(matches!(
        outcome,
        ReconciliationOutcome::Failed {
            kind: FailureKind::RemoteError,
            ..
        }
    ));
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_status_carries_fault() {
    let script = Script::new([
        Ok::<_, TestError>(StatusSnapshot::status("BUILD")),
        Ok(StatusSnapshot::with_fault("ERROR", "no capacity in pool")),
    ]);
    let poller = StatePoller::new(
        fast_policy(Duration::from_secs(1))
            .with_subject("instance")
            .with_pending(["BUILD"])
            .with_target(["ACTIVE"])
            .with_fatal(["ERROR"]),
    )
    .unwrap();

    let outcome = poller
        .poll(OperationKind::Create, || async { script.next() })
        .await;

    assert_eq!(
        outcome,
        ReconciliationOutcome::Failed {
            reason: "instance status ERROR".to_string(),
            remote_fault: Some("no capacity in pool".to_string()),
            kind: FailureKind::FatalStatus,
        }
    );
    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.to_string(), "instance status ERROR: no capacity in pool");
}

#[tokio::test(start_paused = true)]
async fn test_missing_status_is_failure() {
    let script = Script::new([Ok::<_, TestError>(StatusSnapshot::missing())]);

    let outcome = build_active_poller(Duration::from_secs(1))
        .poll(OperationKind::Create, || async { script.next() })
        .await;

    assert!(matches!(
        outcome,
        ReconciliationOutcome::Failed {
            kind: FailureKind::MissingStatus,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_status_is_pending() {
    let script = statuses(&["MIGRATING", "MIGRATING", "BUILD", "ACTIVE"]);

    let outcome = build_active_poller(Duration::from_secs(1))
        .poll(OperationKind::Update, || async { script.next() })
        .await;

    assert!(outcome.is_converged());
    assert_eq!(script.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_never_fetches() {
    let script = statuses(&["ACTIVE"]);
    let token = CancellationToken::new();
    token.cancel();

    let outcome = build_active_poller(Duration::from_secs(1))
        .with_cancellation(token)
        .poll(OperationKind::Create, || async { script.next() })
        .await;

    assert_eq!(
        outcome,
        ReconciliationOutcome::TimedOut {
            cause: TimeoutCause::Cancelled
        }
    );
    assert_eq!(script.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_wait() {
    let script = statuses(&["BUILD"]);
    let token = CancellationToken::new();
    let poller = StatePoller::new(
        fast_policy(Duration::from_secs(3600))
            .with_pending(["BUILD"])
            .with_target(["ACTIVE"])
            .with_poll_interval(Duration::from_secs(60)),
    )
    .unwrap()
    .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(90)).await;
        token.cancel();
    });

    let started = Instant::now();
    let outcome = poller
        .poll(OperationKind::Create, || async { script.next() })
        .await;
    canceller.await.unwrap();

    assert_eq!(
        outcome,
        ReconciliationOutcome::TimedOut {
            cause: TimeoutCause::Cancelled
        }
    );
    // Fetches at 0s and 60s, cancelled at 90s while sleeping.
    assert_eq!(script.calls(), 2);
    assert!(started.elapsed() < Duration::from_secs(120));
    let err = outcome.into_result().unwrap_err();
    assert!(matches!(err, ConvergeError::TimedOut { cancelled: true }));
}

#[tokio::test(start_paused = true)]
async fn test_initial_delay_and_min_interval() {
    let script = statuses(&["BUILD", "ACTIVE"]);
    let poller = StatePoller::new(
        fast_policy(Duration::from_secs(3600))
            .with_pending(["BUILD"])
            .with_target(["ACTIVE"])
            .with_initial_delay(Duration::from_secs(30))
            .with_poll_interval(Duration::from_secs(10))
            .with_min_poll_interval(Duration::from_secs(120)),
    )
    .unwrap();

    let started = Instant::now();
    let outcome = poller
        .poll(OperationKind::Create, || async { script.next() })
        .await;

    assert!(outcome.is_converged());
    assert!(started.elapsed() >= Duration::from_secs(150));
    assert!(started.elapsed() < Duration::from_secs(151));
}

#[test]
fn test_invalid_policy_is_rejected() {
    let result = StatePoller::new(
        fast_policy(Duration::from_secs(1))
            .with_pending(["ACTIVE"])
            .with_target(["ACTIVE"]),
    );
    assert!(matches!(result, Err(ConvergeError::Config(_))));
}
