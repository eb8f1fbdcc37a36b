// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for reconciliation loops.

use std::time::Duration;

use crate::error::{ConvergeError, Result};
use crate::poller::PollPolicy;
use crate::retry::TransientRetry;

/// Default timing shared by reconciliation loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergeConfig {
    /// Sleep between status fetches.
    pub poll_interval: Duration,
    /// Floor applied to the sleep between status fetches.
    pub min_poll_interval: Duration,
    /// Sleep between job fetches.
    pub job_poll_interval: Duration,
    /// Retries for calls failing with a transient error.
    pub transient_retry_count: u32,
    /// Sleep between transient retries.
    pub transient_retry_delay: Duration,
    /// Timeout used when the caller supplies none.
    pub default_timeout: Duration,
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            min_poll_interval: Duration::from_secs(10),
            job_poll_interval: Duration::from_secs(10),
            transient_retry_count: 2,
            transient_retry_delay: Duration::from_secs(60),
            default_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl ConvergeConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CONVERGE_POLL_INTERVAL_MS`: Status poll interval (default: 10000)
    /// - `CONVERGE_MIN_POLL_INTERVAL_MS`: Poll interval floor (default: 10000)
    /// - `CONVERGE_JOB_POLL_INTERVAL_MS`: Job poll interval (default: 10000)
    /// - `CONVERGE_TRANSIENT_RETRY_COUNT`: Retries for transient errors (default: 2)
    /// - `CONVERGE_TRANSIENT_RETRY_DELAY_MS`: Delay between transient retries (default: 60000)
    /// - `CONVERGE_DEFAULT_TIMEOUT_MS`: Timeout when none is given (default: 1800000)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| ConvergeError::Config(format!("invalid {}: {}", key, e))),
                None => Ok(default),
            }
        };

        let transient_retry_count = match lookup("CONVERGE_TRANSIENT_RETRY_COUNT") {
            Some(value) => value.trim().parse::<u32>().map_err(|e| {
                ConvergeError::Config(format!("invalid CONVERGE_TRANSIENT_RETRY_COUNT: {}", e))
            })?,
            None => defaults.transient_retry_count,
        };

        let config = Self {
            poll_interval: millis("CONVERGE_POLL_INTERVAL_MS", defaults.poll_interval)?,
            min_poll_interval: millis("CONVERGE_MIN_POLL_INTERVAL_MS", defaults.min_poll_interval)?,
            job_poll_interval: millis("CONVERGE_JOB_POLL_INTERVAL_MS", defaults.job_poll_interval)?,
            transient_retry_count,
            transient_retry_delay: millis(
                "CONVERGE_TRANSIENT_RETRY_DELAY_MS",
                defaults.transient_retry_delay,
            )?,
            default_timeout: millis("CONVERGE_DEFAULT_TIMEOUT_MS", defaults.default_timeout)?,
        };

        if config.default_timeout.is_zero() {
            return Err(ConvergeError::Config(
                "CONVERGE_DEFAULT_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// Set the status poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the poll interval floor.
    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    /// Set the job poll interval.
    pub fn with_job_poll_interval(mut self, interval: Duration) -> Self {
        self.job_poll_interval = interval;
        self
    }

    /// Set the transient retry budget.
    pub fn with_transient_retry(mut self, retries: u32, delay: Duration) -> Self {
        self.transient_retry_count = retries;
        self.transient_retry_delay = delay;
        self
    }

    /// Set the timeout used when the caller supplies none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Transient retry policy derived from this configuration.
    pub fn transient_retry(&self) -> TransientRetry {
        TransientRetry::from_config(self)
    }

    /// Poll policy prefilled with the configured intervals.
    ///
    /// `None` uses the configured default timeout.
    pub fn policy(&self, timeout: Option<Duration>) -> PollPolicy {
        PollPolicy::new(timeout.unwrap_or(self.default_timeout))
            .with_poll_interval(self.poll_interval)
            .with_min_poll_interval(self.min_poll_interval)
    }
}
