// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared types for reconciliation.

use serde::{Deserialize, Serialize};

/// Kind of mutation being reconciled.
///
/// The kind decides how a not-found fetch is interpreted: for `Delete` the
/// resource is gone and the wait has converged, for everything else it is a
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Resource creation.
    Create,
    /// In-place modification.
    Update,
    /// Resource deletion.
    Delete,
    /// Lifecycle action (start, stop, capture, ...).
    Action,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
            OperationKind::Action => write!(f, "action"),
        }
    }
}

/// One in-flight remote mutation.
///
/// Built from the response of the mutating call and dropped once the
/// reconciliation has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteOperationHandle {
    resource_id: String,
    job_id: Option<String>,
    kind: OperationKind,
}

impl RemoteOperationHandle {
    /// Handle for an operation whose status is exposed on the resource itself.
    pub fn new(resource_id: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            resource_id: resource_id.into(),
            job_id: None,
            kind,
        }
    }

    /// Handle for an operation tracked by a detached job.
    pub fn with_job(
        resource_id: impl Into<String>,
        job_id: impl Into<String>,
        kind: OperationKind,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            job_id: Some(job_id.into()),
            kind,
        }
    }

    /// Remote-assigned resource ID.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Job ID, for job-based APIs.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Kind of mutation.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

/// Status observed by one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Status value. `None` means the payload carried no status at all.
    pub status: Option<String>,
    /// Fault or message text returned alongside the status.
    pub fault: Option<String>,
}

impl StatusSnapshot {
    /// Snapshot with a status and no fault.
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            fault: None,
        }
    }

    /// Snapshot with a status and a fault message.
    pub fn with_fault(status: impl Into<String>, fault: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            fault: Some(fault.into()),
        }
    }

    /// Snapshot of a payload without a status field.
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Immediate result of an action-issuing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum ActionAck {
    /// The request was accepted; progress is visible on the resource status.
    Accepted,
    /// The request returned the resource's new status.
    Status(String),
    /// The request returned a detached job to wait for.
    Job(String),
}
