// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generic status polling loop.
//!
//! A [`StatePoller`] repeatedly fetches the status of a remote resource until
//! it enters a target state, enters a fatal state, the overall timeout
//! elapses, or the caller cancels. Fetches are strictly sequential and the
//! loop sleeps between ticks instead of spinning.
//!
//! Status values outside every set of the [`PollPolicy`] are treated as
//! pending so that new values in the remote vocabulary do not break waits;
//! each distinct unrecognized value is logged once.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::classify::{ErrorClass, RemoteError, classify};
use crate::error::{ConvergeError, Result};
use crate::types::{OperationKind, StatusSnapshot};

/// Status reported when a delete wait observes that the resource is gone.
pub const DELETED_STATUS: &str = "deleted";

/// Timing and state vocabulary for one reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Noun used in failure reasons ("job" gives "job status failed").
    pub subject: String,
    /// States that mean "keep waiting".
    pub pending: BTreeSet<String>,
    /// States that mean "done".
    pub target: BTreeSet<String>,
    /// States that mean "failed". Empty means only fetch errors are fatal.
    pub fatal: BTreeSet<String>,
    /// Sleep between ticks.
    pub poll_interval: Duration,
    /// Floor applied to the sleep between ticks.
    pub min_poll_interval: Duration,
    /// Sleep before the first fetch.
    pub initial_delay: Duration,
    /// Overall budget, measured from the start of the loop.
    pub timeout: Duration,
}

impl PollPolicy {
    /// Create a policy with the given overall timeout and empty state sets.
    pub fn new(timeout: Duration) -> Self {
        Self {
            subject: "resource".to_string(),
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            fatal: BTreeSet::new(),
            poll_interval: Duration::from_secs(10),
            min_poll_interval: Duration::ZERO,
            initial_delay: Duration::ZERO,
            timeout,
        }
    }

    /// Set the noun used in failure reasons.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the pending states.
    pub fn with_pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set the target states.
    pub fn with_target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fatal states.
    pub fn with_fatal<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fatal = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set the sleep between ticks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the floor applied to the sleep between ticks.
    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    /// Set the sleep before the first fetch.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the overall budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Effective sleep between ticks.
    pub fn tick_interval(&self) -> Duration {
        self.poll_interval.max(self.min_poll_interval)
    }

    /// Check the policy invariants.
    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(ConvergeError::Config(format!(
                "{} poll policy has no target states",
                self.subject
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConvergeError::Config(format!(
                "{} poll policy has a zero timeout",
                self.subject
            )));
        }

        let pairs = [
            ("pending", &self.pending, "target", &self.target),
            ("pending", &self.pending, "fatal", &self.fatal),
            ("target", &self.target, "fatal", &self.fatal),
        ];
        for (left_name, left, right_name, right) in pairs {
            if let Some(state) = left.intersection(right).next() {
                return Err(ConvergeError::Config(format!(
                    "{} poll policy lists {:?} as both {} and {}",
                    self.subject, state, left_name, right_name
                )));
            }
        }
        Ok(())
    }
}

/// Why a loop ended without a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutCause {
    /// The overall timeout elapsed.
    Deadline,
    /// The caller cancelled the wait.
    Cancelled,
}

/// What made a loop fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A fatal state was observed.
    FatalStatus,
    /// The status payload had no status value.
    MissingStatus,
    /// The resource disappeared during a non-delete wait.
    NotFound,
    /// A fetch failed with a fatal error.
    RemoteError,
    /// The wait could not start because its policy is invalid.
    InvalidPolicy,
}

/// Terminal result of one reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ReconciliationOutcome {
    /// A target state was observed.
    Converged {
        /// The observed target state.
        status: String,
    },
    /// The operation failed.
    Failed {
        /// What failed.
        reason: String,
        /// Fault text returned by the remote system, verbatim.
        remote_fault: Option<String>,
        /// Failure category.
        kind: FailureKind,
    },
    /// No terminal state was observed in time.
    TimedOut {
        /// Deadline or cancellation.
        cause: TimeoutCause,
    },
}

impl ReconciliationOutcome {
    /// Whether a target state was reached.
    pub fn is_converged(&self) -> bool {
        matches!(self, ReconciliationOutcome::Converged { .. })
    }

    /// Final status on convergence.
    pub fn status(&self) -> Option<&str> {
        match self {
            ReconciliationOutcome::Converged { status } => Some(status),
            _ => None,
        }
    }

    /// Map the outcome onto the error taxonomy, returning the final status on success.
    pub fn into_result(self) -> Result<String> {
        match self {
            ReconciliationOutcome::Converged { status } => Ok(status),
            ReconciliationOutcome::Failed {
                reason,
                remote_fault,
                kind,
            } => Err(match kind {
                FailureKind::FatalStatus => ConvergeError::RemoteFault {
                    reason,
                    message: remote_fault,
                },
                FailureKind::MissingStatus => ConvergeError::InvalidPayload(reason),
                FailureKind::NotFound => ConvergeError::NotFound(reason),
                FailureKind::RemoteError => ConvergeError::Remote(reason),
                FailureKind::InvalidPolicy => ConvergeError::Config(reason),
            }),
            ReconciliationOutcome::TimedOut { cause } => Err(ConvergeError::TimedOut {
                cancelled: cause == TimeoutCause::Cancelled,
            }),
        }
    }

    fn timed_out(cause: TimeoutCause) -> Self {
        ReconciliationOutcome::TimedOut { cause }
    }
}

/// Repeatedly fetches status until a terminal condition.
#[derive(Debug, Clone)]
pub struct StatePoller {
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl StatePoller {
    /// Create a poller for a validated policy.
    pub fn new(policy: PollPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop polling when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The policy driving this poller.
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll `fetch` until a terminal condition is reached.
    ///
    /// Cancellation wins over everything else and is reported as
    /// `TimedOut { cause: Cancelled }`, never as convergence.
    #[instrument(skip_all, fields(subject = %self.policy.subject, kind = %kind))]
    pub async fn poll<F, Fut, E>(&self, kind: OperationKind, mut fetch: F) -> ReconciliationOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<StatusSnapshot, E>>,
        E: RemoteError,
    {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut fetches: u32 = 0;
        let mut warned: BTreeSet<String> = BTreeSet::new();

        if !self.policy.initial_delay.is_zero() {
            if let Some(cause) = self.pause(self.policy.initial_delay, deadline).await {
                return self.finish_timed_out(cause, fetches, started);
            }
        }

        loop {
            if self.cancel.is_cancelled() {
                return self.finish_timed_out(TimeoutCause::Cancelled, fetches, started);
            }
            if Instant::now() >= deadline {
                return self.finish_timed_out(TimeoutCause::Deadline, fetches, started);
            }

            fetches += 1;
            let fetched = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    return self.finish_timed_out(TimeoutCause::Cancelled, fetches, started);
                }

                _ = tokio::time::sleep_until(deadline) => {
                    return self.finish_timed_out(TimeoutCause::Deadline, fetches, started);
                }

                result = fetch() => result,
            };

            match self.evaluate(kind, fetched, &mut warned) {
                Tick::Done(outcome) => {
                    info!(
                        fetches,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        outcome = ?outcome,
                        "Reconciliation finished"
                    );
                    return outcome;
                }
                Tick::Pending => {}
            }

            if let Some(cause) = self.pause(self.policy.tick_interval(), deadline).await {
                return self.finish_timed_out(cause, fetches, started);
            }
        }
    }

    /// Sleep for `duration`, returning early with a cause on cancellation or deadline.
    async fn pause(&self, duration: Duration, deadline: Instant) -> Option<TimeoutCause> {
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Some(TimeoutCause::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Some(TimeoutCause::Deadline),
            _ = tokio::time::sleep(duration) => None,
        }
    }

    fn evaluate<E: RemoteError>(
        &self,
        kind: OperationKind,
        fetched: std::result::Result<StatusSnapshot, E>,
        warned: &mut BTreeSet<String>,
    ) -> Tick {
        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(err) => return self.evaluate_error(kind, &err),
        };

        let Some(status) = snapshot.status else {
            return Tick::Done(ReconciliationOutcome::Failed {
                reason: format!("{} status missing from response", self.policy.subject),
                remote_fault: snapshot.fault,
                kind: FailureKind::MissingStatus,
            });
        };

        if self.policy.fatal.contains(&status) {
            return Tick::Done(ReconciliationOutcome::Failed {
                reason: format!("{} status {}", self.policy.subject, status),
                remote_fault: snapshot.fault,
                kind: FailureKind::FatalStatus,
            });
        }

        if self.policy.target.contains(&status) {
            return Tick::Done(ReconciliationOutcome::Converged { status });
        }

        if self.policy.pending.contains(&status) {
            debug!(status = %status, "Still pending");
        } else if warned.insert(status.clone()) {
            warn!(
                status = %status,
                "Unrecognized status, treating as pending"
            );
        }
        Tick::Pending
    }

    fn evaluate_error<E: RemoteError>(&self, kind: OperationKind, err: &E) -> Tick {
        match classify(err) {
            ErrorClass::NotFound if kind == OperationKind::Delete => {
                debug!("Resource no longer exists");
                Tick::Done(ReconciliationOutcome::Converged {
                    status: DELETED_STATUS.to_string(),
                })
            }
            ErrorClass::NotFound => Tick::Done(ReconciliationOutcome::Failed {
                reason: format!("{} not found: {}", self.policy.subject, err.message()),
                remote_fault: None,
                kind: FailureKind::NotFound,
            }),
            ErrorClass::Transient => {
                warn!(error = %err.message(), "Transient error while fetching status");
                Tick::Pending
            }
            ErrorClass::Fatal => Tick::Done(ReconciliationOutcome::Failed {
                reason: format!(
                    "failed to fetch {} status: {}",
                    self.policy.subject,
                    err.message()
                ),
                remote_fault: None,
                kind: FailureKind::RemoteError,
            }),
        }
    }

    fn finish_timed_out(
        &self,
        cause: TimeoutCause,
        fetches: u32,
        started: Instant,
    ) -> ReconciliationOutcome {
        warn!(
            fetches,
            cause = ?cause,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reconciliation did not reach a terminal state"
        );
        ReconciliationOutcome::timed_out(cause)
    }
}

enum Tick {
    Done(ReconciliationOutcome),
    Pending,
}
