// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Entry point for Power reconciliation.

use std::future::Future;
use std::time::Duration;

use converge_core::{
    CancellationToken, ConvergeConfig, JobClient, JobWaiter, OperationKind, PollPolicy,
    StatePoller, StatusSnapshot,
};
use tracing::instrument;

use crate::error::{ApiError, Result};

/// Waits for Power resources to converge after a mutating call.
///
/// Owns the API client for one cloud instance. The per-resource waits live in
/// their own modules and are available when the client implements the
/// matching API trait.
pub struct PowerReconciler<C> {
    pub(crate) cloud_instance_id: String,
    pub(crate) client: C,
    pub(crate) config: ConvergeConfig,
    pub(crate) cancel: CancellationToken,
}

impl<C> PowerReconciler<C> {
    /// Create a reconciler for `cloud_instance_id` with the default configuration.
    pub fn new(cloud_instance_id: impl Into<String>, client: C) -> Self {
        Self {
            cloud_instance_id: cloud_instance_id.into(),
            client,
            config: ConvergeConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ConvergeConfig) -> Self {
        self.config = config;
        self
    }

    /// Abort every wait when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cloud instance (workspace) the client is bound to.
    pub fn cloud_instance_id(&self) -> &str {
        &self.cloud_instance_id
    }

    /// The API client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The configuration.
    pub fn config(&self) -> &ConvergeConfig {
        &self.config
    }

    /// Cancellation token observed by every wait.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.config.default_timeout)
    }

    pub(crate) fn job_waiter(&self) -> JobWaiter {
        JobWaiter::from_config(&self.config).with_cancellation(self.cancel.clone())
    }

    /// Poll `fetch` under `policy` and map the outcome onto [`crate::PowerError`].
    pub(crate) async fn wait<F, Fut>(
        &self,
        policy: PollPolicy,
        kind: OperationKind,
        fetch: F,
    ) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<StatusSnapshot, ApiError>>,
    {
        let poller = StatePoller::new(policy)?.with_cancellation(self.cancel.clone());
        Ok(poller.poll(kind, fetch).await.into_result()?)
    }
}

impl<C> PowerReconciler<C>
where
    C: JobClient<Error = ApiError>,
{
    /// Wait for a job to complete.
    ///
    /// `None` uses the configured default timeout.
    #[instrument(skip(self, job_id), fields(job_id = %job_id))]
    pub async fn wait_for_job(&self, job_id: &str, timeout: Option<Duration>) -> Result<String> {
        let timeout = self.timeout(timeout);
        Ok(self.job_waiter().wait(&self.client, job_id, timeout).await?)
    }
}
