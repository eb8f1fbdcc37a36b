// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for the stop, mutate, start orchestration.

mod common;

use std::time::Duration;

use common::{Script, ScriptedResource, TestError, resize_policies, statuses};
use converge_core::{
    ActionAck, CancellationToken, ConvergeError, JobSnapshot, JobState, JobWaiter,
    ResizeOrchestrator, ResizePhase, StatusSnapshot, TransientRetry,
};

fn orchestrator(resource: &ScriptedResource) -> ResizeOrchestrator<'_, ScriptedResource> {
    ResizeOrchestrator::new(resource, resize_policies())
        .unwrap()
        .with_retry(TransientRetry::new(2, Duration::from_secs(1)))
        .with_job_waiter(JobWaiter::new(Duration::from_millis(10)))
}

#[tokio::test(start_paused = true)]
async fn test_full_resize_ordering() {
    let resource = ScriptedResource::new(statuses(&[
        "ACTIVE",
        "STOPPING",
        "SHUTOFF",
        "RESIZE",
        "VERIFY_RESIZE",
        "SHUTOFF",
        "BUILD",
        "ACTIVE",
    ]));

    let report = orchestrator(&resource).run("pvm-1", &4).await.unwrap();

    assert!(!report.stop_skipped);
    assert_eq!(report.final_status, "ACTIVE");
    assert_eq!(
        resource.log(),
        vec![
            "status:ACTIVE",
            "stop",
            "status:STOPPING",
            "status:SHUTOFF",
            "update",
            "status:RESIZE",
            "status:VERIFY_RESIZE",
            "status:SHUTOFF",
            "start",
            "status:BUILD",
            "status:ACTIVE",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_already_stopped_skips_stop() {
    let resource = ScriptedResource::new(statuses(&["SHUTOFF", "RESIZE", "SHUTOFF", "ACTIVE"]));

    let report = orchestrator(&resource).run("pvm-2", &2).await.unwrap();

    assert!(report.stop_skipped);
    assert_eq!(resource.actions(), vec!["update", "start"]);
}

#[tokio::test(start_paused = true)]
async fn test_failure_while_mutating_never_starts() {
    let resource = ScriptedResource::new(Script::new([
        Ok(StatusSnapshot::status("ACTIVE")),
        Ok(StatusSnapshot::status("SHUTOFF")),
        Ok(StatusSnapshot::status("RESIZE")),
        Ok(StatusSnapshot::with_fault("ERROR", "resize rejected by host")),
    ]));

    let err = orchestrator(&resource).run("pvm-3", &8).await.unwrap_err();

    assert_eq!(err.phase(), Some(ResizePhase::Mutating));
    assert_eq!(err.remote_fault(), Some("resize rejected by host"));
    assert_eq!(resource.actions(), vec!["stop", "update"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_job_failure_is_mutating_failure() {
    let resource = ScriptedResource::new(statuses(&["SHUTOFF"]))
        .with_ack("update", Ok(ActionAck::Job("job-9".to_string())))
        .with_jobs(Script::new([
            Ok(JobSnapshot::new(JobState::Running)),
            Ok(JobSnapshot::failed("invalid processor type")),
        ]));

    let err = orchestrator(&resource).run("pvm-4", &1).await.unwrap_err();

    assert_eq!(err.phase(), Some(ResizePhase::Mutating));
    assert_eq!(err.remote_fault(), Some("invalid processor type"));
    assert_eq!(resource.actions(), vec!["update"]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_job_is_awaited_before_polling() {
    let resource = ScriptedResource::new(statuses(&["ACTIVE", "SHUTOFF", "SHUTOFF", "ACTIVE"]))
        .with_ack("stop", Ok(ActionAck::Job("job-1".to_string())));

    orchestrator(&resource).run("pvm-5", &1).await.unwrap();

    let log = resource.log();
    assert_eq!(&log[..4], &["status:ACTIVE", "stop", "job:job-1:completed", "status:SHUTOFF"]);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_ack_status_fails_immediately() {
    let resource = ScriptedResource::new(statuses(&["SHUTOFF"]))
        .with_ack("update", Ok(ActionAck::Status("ERROR".to_string())));

    let err = orchestrator(&resource).run("pvm-6", &1).await.unwrap_err();

    assert_eq!(err.phase(), Some(ResizePhase::Mutating));
    assert!(matches!(err.root(), ConvergeError::RemoteFault { .. }));
    // Only the inspection fetch happened.
    assert_eq!(resource.statuses.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_stop_error_exhausts_retry() {
    let resource =
        ScriptedResource::new(statuses(&["ACTIVE"])).with_ack("stop", Err(TestError::Unavailable));

    let err = orchestrator(&resource).run("pvm-7", &1).await.unwrap_err();

    assert_eq!(err.phase(), Some(ResizePhase::Stopping));
    assert!(matches!(
        err.root(),
        ConvergeError::TransientExhausted { attempts: 3, .. }
    ));
    assert_eq!(resource.actions(), vec!["stop", "stop", "stop"]);
}

#[tokio::test(start_paused = true)]
async fn test_resource_in_error_fails_inspection() {
    let resource = ScriptedResource::new(statuses(&["ERROR"]));

    let err = orchestrator(&resource).run("pvm-8", &1).await.unwrap_err();

    assert_eq!(err.phase(), Some(ResizePhase::Inspecting));
    assert!(resource.actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_orchestration_issues_no_actions() {
    let resource = ScriptedResource::new(statuses(&["ACTIVE"]));
    let token = CancellationToken::new();
    token.cancel();

    let err = orchestrator(&resource)
        .with_cancellation(token)
        .run("pvm-9", &1)
        .await
        .unwrap_err();

    assert_eq!(err.phase(), Some(ResizePhase::Inspecting));
    assert!(err.is_timeout());
    assert!(resource.log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_stop_retries() {
    let resource = ScriptedResource::new(statuses(&["ACTIVE"]))
        .with_ack("stop", Err(TestError::Unavailable));
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = orchestrator(&resource)
        .with_retry(TransientRetry::new(2, Duration::from_secs(600)))
        .with_cancellation(token)
        .run("pvm-10", &1)
        .await
        .unwrap_err();

    assert_eq!(err.phase(), Some(ResizePhase::Stopping));
    assert!(err.is_timeout());
    assert_eq!(resource.actions(), vec!["stop"]);
    assert!(started.elapsed() < Duration::from_secs(600));
}

#[test]
fn test_invalid_policies_are_rejected() {
    let resource = ScriptedResource::new(statuses(&["ACTIVE"]));
    let mut policies = resize_policies();
    policies.start.target.clear();

    let result = ResizeOrchestrator::new(&resource, policies);
    assert!(matches!(result, Err(ConvergeError::Config(_))));
}
