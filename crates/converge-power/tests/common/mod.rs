// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for converge-power integration tests.
//!
//! Payload builders for scripting [`MockPowerCloud`] and a reconciler with
//! short job intervals.

#![allow(dead_code)]

use std::time::Duration;

use converge_core::{ConvergeConfig, JobState};
use converge_power::models::{
    InstanceFault, InstanceHealth, Job, JobStatus, PvmInstance, Snapshot, Volume,
};
use converge_power::{ApiError, ApiResult, MockPowerCloud, PowerReconciler};

pub const CLOUD: &str = "cloud-1";

/// Reconciler over a fresh mock, with one-second job polling and retries.
pub fn reconciler() -> PowerReconciler<MockPowerCloud> {
    let config = ConvergeConfig::new()
        .with_job_poll_interval(Duration::from_secs(1))
        .with_transient_retry(2, Duration::from_secs(60))
        .with_default_timeout(Duration::from_secs(30 * 60));
    PowerReconciler::new(CLOUD, MockPowerCloud::new()).with_config(config)
}

pub fn instance(status: &str, health: &str) -> ApiResult<PvmInstance> {
    Ok(PvmInstance {
        pvm_instance_id: "pvm-1".to_string(),
        status: Some(status.to_string()),
        health: Some(InstanceHealth {
            status: health.to_string(),
        }),
        memory: 4.0,
        processors: 0.5,
        max_memory: 8.0,
        max_processors: 1.0,
        ..Default::default()
    })
}

pub fn failed_instance(fault: &str) -> ApiResult<PvmInstance> {
    let mut failed = instance("ERROR", "CRITICAL")?;
    failed.fault = Some(InstanceFault {
        message: fault.to_string(),
    });
    Ok(failed)
}

pub fn volume(state: &str) -> ApiResult<Volume> {
    Ok(Volume {
        volume_id: "vol-1".to_string(),
        state: Some(state.to_string()),
    })
}

pub fn snapshot(status: &str, percent_complete: i64) -> ApiResult<Snapshot> {
    Ok(Snapshot {
        snapshot_id: "snap-1".to_string(),
        status: Some(status.to_string()),
        percent_complete,
    })
}

pub fn job(state: JobState) -> ApiResult<Job> {
    Ok(Job {
        id: "job-1".to_string(),
        status: Some(JobStatus {
            state: Some(state.as_str().to_string()),
            message: None,
        }),
    })
}

pub fn failed_job(message: &str) -> ApiResult<Job> {
    Ok(Job {
        id: "job-1".to_string(),
        status: Some(JobStatus {
            state: Some(JobState::Failed.as_str().to_string()),
            message: Some(message.to_string()),
        }),
    })
}

pub fn not_found<T>(operation: &str, id: &str) -> ApiResult<T> {
    Err(ApiError::not_found(operation, id))
}

/// The VPC setup condition retried on cloud connection create.
pub fn vpc_unavailable() -> ApiError {
    ApiError::coded(
        "pcloudCloudconnectionsPost",
        "pcloudCloudconnectionsPostServiceUnavailable",
        "unable to get vpc details",
    )
}
