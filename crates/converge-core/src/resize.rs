// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stop, mutate, start orchestration.
//!
//! Some in-place mutations are only accepted by the remote API while the
//! resource is stopped. [`ResizeOrchestrator`] drives the only legal path:
//!
//! ```text
//! Running -> Stopping -> Stopped -> Mutating -> Stopped' -> Starting -> Running'
//! ```
//!
//! The stop is skipped when the resource is already stopped. A failure in any
//! phase aborts the remaining phases and is returned as
//! [`ConvergeError::Phase`]. Nothing is rolled back: a resource left stopped
//! after a failed mutation stays stopped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::{ConvergeError, Result};
use crate::job::{JobClient, JobWaiter};
use crate::poller::{PollPolicy, StatePoller};
use crate::retry::TransientRetry;
use crate::types::{ActionAck, OperationKind, StatusSnapshot};

/// Phase of a resize orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePhase {
    /// Reading the current status.
    Inspecting,
    /// Stopping the resource and waiting until it is stopped.
    Stopping,
    /// Applying the mutation and waiting for it to land.
    Mutating,
    /// Starting the resource and waiting until it is healthy.
    Starting,
}

impl std::fmt::Display for ResizePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResizePhase::Inspecting => write!(f, "inspecting"),
            ResizePhase::Stopping => write!(f, "stopping"),
            ResizePhase::Mutating => write!(f, "mutating"),
            ResizePhase::Starting => write!(f, "starting"),
        }
    }
}

/// Remote operations needed to resize a resource.
#[async_trait]
pub trait ResizeTarget: JobClient {
    /// Mutation request body.
    type Payload: Send + Sync;

    /// Fetch the resource status.
    async fn fetch_status(&self, id: &str) -> std::result::Result<StatusSnapshot, Self::Error>;

    /// Issue a stop action.
    async fn stop(&self, id: &str) -> std::result::Result<ActionAck, Self::Error>;

    /// Issue a start action.
    async fn start(&self, id: &str) -> std::result::Result<ActionAck, Self::Error>;

    /// Issue the in-place mutation.
    async fn update(
        &self,
        id: &str,
        payload: &Self::Payload,
    ) -> std::result::Result<ActionAck, Self::Error>;
}

/// Poll policies for the three waits of a resize.
#[derive(Debug, Clone)]
pub struct ResizePolicies {
    /// Wait for the resource to stop. Its target set defines "already stopped".
    pub stop: PollPolicy,
    /// Wait for the mutation's transitional states to clear.
    pub mutate: PollPolicy,
    /// Wait for the resource to be healthy again.
    pub start: PollPolicy,
}

impl ResizePolicies {
    fn validate(&self) -> Result<()> {
        self.stop.validate()?;
        self.mutate.validate()?;
        self.start.validate()
    }
}

/// Result of a successful resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResizeReport {
    /// The resource was already stopped, so no stop action was issued.
    pub stop_skipped: bool,
    /// Status observed at the end of the start phase.
    pub final_status: String,
}

/// Drives a resource through stop, mutate and start.
pub struct ResizeOrchestrator<'a, T: ResizeTarget + ?Sized> {
    target: &'a T,
    policies: ResizePolicies,
    retry: TransientRetry,
    job_waiter: JobWaiter,
    cancel: CancellationToken,
}

impl<'a, T: ResizeTarget + ?Sized> ResizeOrchestrator<'a, T> {
    /// Create an orchestrator. Fails if any policy is invalid.
    pub fn new(target: &'a T, policies: ResizePolicies) -> Result<Self> {
        policies.validate()?;
        Ok(Self {
            target,
            policies,
            retry: TransientRetry::default(),
            job_waiter: JobWaiter::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Set the retry policy applied to every remote call.
    ///
    /// Retries stop as soon as the orchestration is cancelled.
    pub fn with_retry(mut self, retry: TransientRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Set the waiter used when an action returns a job.
    pub fn with_job_waiter(mut self, waiter: JobWaiter) -> Self {
        self.job_waiter = waiter;
        self
    }

    /// Abort the orchestration when `token` is cancelled.
    ///
    /// No further remote call is issued once the token fires, including
    /// pending retries.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.job_waiter = self.job_waiter.with_cancellation(token.clone());
        self.cancel = token;
        self
    }

    /// Run the orchestration for resource `id`.
    #[instrument(skip(self, id, payload), fields(resource_id = %id))]
    pub async fn run(&self, id: &str, payload: &T::Payload) -> Result<ResizeReport> {
        let current = self
            .current_status(id)
            .await
            .map_err(|e| e.in_phase(ResizePhase::Inspecting))?;

        let stop_skipped = self.policies.stop.target.contains(&current);
        if stop_skipped {
            info!(status = %current, "Resource already stopped, skipping stop");
        } else {
            self.stop_phase(id)
                .await
                .map_err(|e| e.in_phase(ResizePhase::Stopping))?;
        }

        self.mutate_phase(id, payload)
            .await
            .map_err(|e| e.in_phase(ResizePhase::Mutating))?;

        let final_status = self
            .start_phase(id)
            .await
            .map_err(|e| e.in_phase(ResizePhase::Starting))?;

        info!(final_status = %final_status, stop_skipped, "Resize completed");
        Ok(ResizeReport {
            stop_skipped,
            final_status,
        })
    }

    async fn current_status(&self, id: &str) -> Result<String> {
        let snapshot = self
            .retry
            .call_cancellable("fetch status", &self.cancel, || {
                self.target.fetch_status(id)
            })
            .await?;

        match snapshot.status {
            Some(status) if self.policies.stop.fatal.contains(&status) => {
                Err(ConvergeError::RemoteFault {
                    reason: format!("{} status {}", self.policies.stop.subject, status),
                    message: snapshot.fault,
                })
            }
            Some(status) => Ok(status),
            None => Err(ConvergeError::InvalidPayload(format!(
                "{} status missing from response",
                self.policies.stop.subject
            ))),
        }
    }

    async fn stop_phase(&self, id: &str) -> Result<String> {
        info!(phase = %ResizePhase::Stopping, "Issuing stop");
        let ack = self
            .retry
            .call_cancellable("stop", &self.cancel, || self.target.stop(id))
            .await?;
        self.await_ack(ack, &self.policies.stop).await?;
        self.wait(id, &self.policies.stop).await
    }

    async fn mutate_phase(&self, id: &str, payload: &T::Payload) -> Result<String> {
        info!(phase = %ResizePhase::Mutating, "Issuing update");
        let ack = self
            .retry
            .call_cancellable("update", &self.cancel, || self.target.update(id, payload))
            .await?;
        self.await_ack(ack, &self.policies.mutate).await?;
        self.wait(id, &self.policies.mutate).await
    }

    async fn start_phase(&self, id: &str) -> Result<String> {
        info!(phase = %ResizePhase::Starting, "Issuing start");
        let ack = self
            .retry
            .call_cancellable("start", &self.cancel, || self.target.start(id))
            .await?;
        self.await_ack(ack, &self.policies.start).await?;
        self.wait(id, &self.policies.start).await
    }

    /// Handle the immediate response of an action before polling the resource.
    async fn await_ack(&self, ack: ActionAck, policy: &PollPolicy) -> Result<()> {
        match ack {
            ActionAck::Accepted => Ok(()),
            ActionAck::Status(status) if policy.fatal.contains(&status) => {
                Err(ConvergeError::RemoteFault {
                    reason: format!("{} status {}", policy.subject, status),
                    message: None,
                })
            }
            ActionAck::Status(_) => Ok(()),
            ActionAck::Job(job_id) => {
                self.job_waiter
                    .wait(self.target, &job_id, policy.timeout)
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn wait(&self, id: &str, policy: &PollPolicy) -> Result<String> {
        StatePoller::new(policy.clone())?
            .with_cancellation(self.cancel.clone())
            .poll(OperationKind::Update, || self.target.fetch_status(id))
            .await
            .into_result()
    }
}
