// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for converge-core integration tests.
//!
//! Provides scripted status sources and a scripted resource implementing the
//! job and resize traits.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use converge_core::{
    ActionAck, JobClient, JobSnapshot, PollPolicy, RemoteError, ResizePolicies, ResizeTarget,
    StatusSnapshot,
};

/// Remote error used by the test doubles.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TestError {
    #[error("resource {0} not found")]
    NotFound(String),
    #[error("service temporarily unavailable")]
    Unavailable,
    #[error("{0}")]
    Fatal(String),
}

impl RemoteError for TestError {
    fn is_not_found(&self) -> bool {
        matches!(self, TestError::NotFound(_))
    }

    fn is_transient(&self) -> bool {
        matches!(self, TestError::Unavailable)
    }
}

/// Sequence of responses. Once exhausted, the last response repeats.
pub struct Script<T> {
    items: Mutex<VecDeque<T>>,
    last: Mutex<Option<T>>,
    calls: AtomicUsize,
}

impl<T: Clone> Script<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> T {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut items = self.items.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(item) = items.pop_front() {
            *last = Some(item.clone());
            item
        } else {
            last.clone().expect("script is empty")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Status script built from plain status strings.
pub fn statuses(values: &[&str]) -> Script<Result<StatusSnapshot, TestError>> {
    Script::new(values.iter().map(|v| Ok(StatusSnapshot::status(*v))))
}

/// Resource whose status, job states and action responses are scripted.
pub struct ScriptedResource {
    pub statuses: Script<Result<StatusSnapshot, TestError>>,
    pub jobs: Script<Result<JobSnapshot, TestError>>,
    acks: Mutex<HashMap<&'static str, Result<ActionAck, TestError>>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedResource {
    pub fn new(statuses: Script<Result<StatusSnapshot, TestError>>) -> Self {
        Self {
            statuses,
            jobs: Script::new([Ok(JobSnapshot::new(converge_core::JobState::Completed))]),
            acks: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_jobs(mut self, jobs: Script<Result<JobSnapshot, TestError>>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Response for `action` ("stop", "start" or "update"). Defaults to `Accepted`.
    pub fn with_ack(self, action: &'static str, ack: Result<ActionAck, TestError>) -> Self {
        self.acks.lock().unwrap().insert(action, ack);
        self
    }

    /// Calls in order, statuses as `status:<value>`.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Calls to actions only.
    pub fn actions(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter(|entry| !entry.starts_with("status:") && !entry.starts_with("job:"))
            .collect()
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn ack(&self, action: &'static str) -> Result<ActionAck, TestError> {
        self.record(action);
        self.acks
            .lock()
            .unwrap()
            .get(action)
            .cloned()
            .unwrap_or(Ok(ActionAck::Accepted))
    }
}

#[async_trait]
impl JobClient for ScriptedResource {
    type Error = TestError;

    async fn get_job(&self, job_id: &str) -> Result<JobSnapshot, TestError> {
        let job = self.jobs.next();
        let state = match &job {
            Ok(snapshot) => snapshot.state.clone().unwrap_or_default(),
            Err(err) => err.to_string(),
        };
        self.record(format!("job:{}:{}", job_id, state));
        job
    }
}

#[async_trait]
impl ResizeTarget for ScriptedResource {
    type Payload = u32;

    async fn fetch_status(&self, _id: &str) -> Result<StatusSnapshot, TestError> {
        let status = self.statuses.next();
        let entry = match &status {
            Ok(snapshot) => snapshot.status.clone().unwrap_or_default(),
            Err(err) => err.to_string(),
        };
        self.record(format!("status:{}", entry));
        status
    }

    async fn stop(&self, _id: &str) -> Result<ActionAck, TestError> {
        self.ack("stop")
    }

    async fn start(&self, _id: &str) -> Result<ActionAck, TestError> {
        self.ack("start")
    }

    async fn update(&self, _id: &str, _payload: &u32) -> Result<ActionAck, TestError> {
        self.ack("update")
    }
}

/// Policy with short intervals for tests.
pub fn fast_policy(timeout: Duration) -> PollPolicy {
    PollPolicy::new(timeout)
        .with_poll_interval(Duration::from_millis(10))
        .with_min_poll_interval(Duration::ZERO)
}

/// Resize policies mirroring the instance vocabulary.
pub fn resize_policies() -> ResizePolicies {
    let timeout = Duration::from_secs(5);
    ResizePolicies {
        stop: fast_policy(timeout)
            .with_subject("instance")
            .with_pending(["STOPPING", "ACTIVE"])
            .with_target(["SHUTOFF"])
            .with_fatal(["ERROR"]),
        mutate: fast_policy(timeout)
            .with_subject("instance")
            .with_pending(["RESIZE", "VERIFY_RESIZE"])
            .with_target(["ACTIVE", "SHUTOFF"])
            .with_fatal(["ERROR"]),
        start: fast_policy(timeout)
            .with_subject("instance")
            .with_pending(["SHUTOFF", "BUILD"])
            .with_target(["ACTIVE"])
            .with_fatal(["ERROR"]),
    }
}
