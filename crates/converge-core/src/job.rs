// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Waiting on detached jobs.
//!
//! Some remote operations return a job handle instead of exposing progress on
//! the resource. [`JobWaiter`] polls the job resource through a [`JobClient`]
//! and maps the job vocabulary onto the common outcome taxonomy.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::classify::RemoteError;
use crate::config::ConvergeConfig;
use crate::error::Result;
use crate::poller::{FailureKind, PollPolicy, ReconciliationOutcome, StatePoller};
use crate::types::{OperationKind, StatusSnapshot};

/// Fault message used when a failed job carries no message of its own.
pub const GENERIC_JOB_FAULT: &str = "job failed";

/// Job status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobState {
    Queued,
    ReadyForProcessing,
    InProgress,
    Running,
    Waiting,
    Completed,
    Failed,
}

impl JobState {
    /// States in which the job is still making progress.
    pub const PENDING: [JobState; 5] = [
        JobState::Queued,
        JobState::ReadyForProcessing,
        JobState::InProgress,
        JobState::Running,
        JobState::Waiting,
    ];

    /// Wire value of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::ReadyForProcessing => "readyForProcessing",
            JobState::InProgress => "inProgress",
            JobState::Running => "running",
            JobState::Waiting => "waiting",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Parse a wire value. Unknown values return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        [JobState::Completed, JobState::Failed]
            .into_iter()
            .chain(JobState::PENDING)
            .find(|state| state.as_str() == value)
    }

    /// Whether the job has stopped making progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status as returned by the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job state, `None` when the payload carried none.
    pub state: Option<String>,
    /// Progress or failure message.
    pub message: Option<String>,
}

impl JobSnapshot {
    /// Snapshot in the given state.
    pub fn new(state: JobState) -> Self {
        Self {
            state: Some(state.as_str().to_string()),
            message: None,
        }
    }

    /// Failed snapshot with a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: Some(JobState::Failed.as_str().to_string()),
            message: Some(message.into()),
        }
    }

    /// Parsed state, if recognized.
    pub fn job_state(&self) -> Option<JobState> {
        self.state.as_deref().and_then(JobState::parse)
    }

    fn into_status(self) -> StatusSnapshot {
        let failed = self.job_state() == Some(JobState::Failed);
        let fault = match (failed, self.message) {
            (true, Some(message)) if !message.is_empty() => Some(message),
            (true, _) => Some(GENERIC_JOB_FAULT.to_string()),
            (false, message) => message,
        };
        StatusSnapshot {
            status: self.state,
            fault,
        }
    }
}

/// Fetches job status.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Error returned by the remote client.
    type Error: RemoteError;

    /// Fetch the current state of a job.
    async fn get_job(&self, job_id: &str) -> std::result::Result<JobSnapshot, Self::Error>;
}

/// Polls a job until it completes or fails.
#[derive(Debug, Clone)]
pub struct JobWaiter {
    poll_interval: Duration,
    min_poll_interval: Duration,
    initial_delay: Duration,
    cancel: CancellationToken,
}

impl Default for JobWaiter {
    fn default() -> Self {
        Self::from_config(&ConvergeConfig::default())
    }
}

impl JobWaiter {
    /// Create a waiter with an explicit poll interval.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            min_poll_interval: Duration::ZERO,
            initial_delay: Duration::ZERO,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a waiter using the configured job intervals.
    pub fn from_config(config: &ConvergeConfig) -> Self {
        Self::new(config.job_poll_interval).with_initial_delay(config.job_poll_interval)
    }

    /// Set the floor applied to the sleep between ticks.
    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    /// Set the wait before the first fetch.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Stop waiting when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Policy used for a job wait with the given timeout.
    pub fn policy(&self, timeout: Duration) -> PollPolicy {
        PollPolicy::new(timeout)
            .with_subject("job")
            .with_pending(JobState::PENDING.iter().map(JobState::as_str))
            .with_target([JobState::Completed.as_str()])
            .with_fatal([JobState::Failed.as_str()])
            .with_poll_interval(self.poll_interval)
            .with_min_poll_interval(self.min_poll_interval)
            .with_initial_delay(self.initial_delay)
    }

    /// Wait for `job_id` to reach a terminal state.
    ///
    /// A job that disappears mid-poll or returns no state is a failure: jobs
    /// are kept by the remote system until well after they finish.
    #[instrument(skip(self, client, job_id), fields(job_id = %job_id))]
    pub async fn wait_for_job<C>(
        &self,
        client: &C,
        job_id: &str,
        timeout: Duration,
    ) -> ReconciliationOutcome
    where
        C: JobClient + ?Sized,
    {
        let poller = match StatePoller::new(self.policy(timeout)) {
            Ok(poller) => poller.with_cancellation(self.cancel.clone()),
            Err(err) => {
                return ReconciliationOutcome::Failed {
                    reason: err.to_string(),
                    remote_fault: None,
                    kind: FailureKind::InvalidPolicy,
                };
            }
        };

        poller
            .poll(OperationKind::Action, || async move {
                client.get_job(job_id).await.map(JobSnapshot::into_status)
            })
            .await
    }

    /// Wait for `job_id` and map the outcome onto the error taxonomy.
    pub async fn wait<C>(&self, client: &C, job_id: &str, timeout: Duration) -> Result<String>
    where
        C: JobClient + ?Sized,
    {
        self.wait_for_job(client, job_id, timeout)
            .await
            .into_result()
    }
}
