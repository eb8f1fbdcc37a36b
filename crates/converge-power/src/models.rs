// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire models for the Power Virtual Server API.
//!
//! Only the fields read by the reconciliation loops are modelled. Unknown
//! fields are ignored on deserialization.

use converge_core::{JobSnapshot, OperationKind, RemoteOperationHandle};
use serde::{Deserialize, Serialize};

/// Instance health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceHealth {
    pub status: String,
}

/// Fault reported on an instance in `ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFault {
    pub message: String,
}

/// A Power virtual server instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvmInstance {
    #[serde(rename = "pvmInstanceID")]
    pub pvm_instance_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub health: Option<InstanceHealth>,
    #[serde(default)]
    pub fault: Option<InstanceFault>,
    #[serde(default)]
    pub memory: f64,
    #[serde(default)]
    pub processors: f64,
    #[serde(rename = "maxmem", default)]
    pub max_memory: f64,
    #[serde(rename = "maxproc", default)]
    pub max_processors: f64,
    #[serde(default)]
    pub proc_type: Option<String>,
}

impl PvmInstance {
    /// Health status, if reported.
    pub fn health_status(&self) -> Option<&str> {
        self.health.as_ref().map(|health| health.status.as_str())
    }

    /// Fault message, if reported.
    pub fn fault_message(&self) -> Option<&str> {
        self.fault.as_ref().map(|fault| fault.message.as_str())
    }
}

/// Virtual core assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualCores {
    pub assigned: i64,
}

/// Instance update request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processors: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proc_type: Option<String>,
    #[serde(rename = "sapProfileID", skip_serializing_if = "Option::is_none")]
    pub sap_profile_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_cores: Option<VirtualCores>,
}

/// Instance lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceAction {
    Start,
    Stop,
    ImmediateShutdown,
    SoftReboot,
    HardReboot,
}

impl InstanceAction {
    /// Wire value of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceAction::Start => "start",
            InstanceAction::Stop => "stop",
            InstanceAction::ImmediateShutdown => "immediate-shutdown",
            InstanceAction::SoftReboot => "soft-reboot",
            InstanceAction::HardReboot => "hard-reboot",
        }
    }
}

/// A storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(rename = "volumeID")]
    pub volume_id: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// A boot image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "imageID")]
    pub image_id: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// A network. The VLAN is assigned once the network is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(rename = "networkID")]
    pub network_id: String,
    #[serde(rename = "vlanID", default)]
    pub vlan_id: Option<i64>,
}

/// Instance a network port is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInstance {
    #[serde(rename = "pvmInstanceID")]
    pub pvm_instance_id: String,
}

/// A network port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPort {
    #[serde(rename = "portID")]
    pub port_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pvm_instance: Option<PortInstance>,
}

/// An instance snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "snapshotID")]
    pub snapshot_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub percent_complete: i64,
}

/// A rule of a network security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub id: String,
}

/// A network security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    #[serde(default)]
    pub rules: Vec<SecurityGroupRule>,
}

impl SecurityGroup {
    /// Whether the group contains a rule with `rule_id`.
    pub fn has_rule(&self, rule_id: &str) -> bool {
        self.rules.iter().any(|rule| rule.id == rule_id)
    }
}

/// A cloud connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudConnection {
    #[serde(rename = "cloudConnectionID")]
    pub cloud_connection_id: String,
    pub name: String,
    pub speed: i64,
}

/// Cloud connection create request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudConnectionSpec {
    pub name: String,
    pub speed: i64,
    #[serde(default)]
    pub global_routing: bool,
    #[serde(default)]
    pub metered: bool,
    #[serde(default)]
    pub transit_enabled: bool,
}

/// Cloud connection update request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConnectionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<i64>,
}

/// Reference to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReference {
    pub id: String,
}

/// Accepted cloud connection request tracked by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudConnectionJob {
    #[serde(rename = "cloudConnectionID")]
    pub cloud_connection_id: String,
    pub job_ref: JobReference,
}

/// Response of a cloud connection create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudConnectionResponse {
    /// The request completed synchronously.
    Done(CloudConnection),
    /// The request continues in a job.
    Job(CloudConnectionJob),
}

impl CloudConnectionResponse {
    /// Connection ID, from either form.
    pub fn cloud_connection_id(&self) -> &str {
        match self {
            CloudConnectionResponse::Done(connection) => &connection.cloud_connection_id,
            CloudConnectionResponse::Job(job) => &job.cloud_connection_id,
        }
    }

    /// Job ID, when the request continues in a job.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            CloudConnectionResponse::Done(_) => None,
            CloudConnectionResponse::Job(job) => Some(&job.job_ref.id),
        }
    }

    /// Handle tracking the operation that produced this response.
    pub fn handle(&self, kind: OperationKind) -> RemoteOperationHandle {
        match self.job_id() {
            Some(job_id) => {
                RemoteOperationHandle::with_job(self.cloud_connection_id(), job_id, kind)
            }
            None => RemoteOperationHandle::new(self.cloud_connection_id(), kind),
        }
    }
}

/// Job progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub status: Option<JobStatus>,
}

impl From<Job> for JobSnapshot {
    fn from(job: Job) -> Self {
        let status = job.status.unwrap_or_default();
        JobSnapshot {
            state: status.state,
            message: status.message,
        }
    }
}
