// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status derivation per resource kind.
//!
//! Each function turns a fetched resource into the [`StatusSnapshot`] seen by
//! the poll loop. Several resources have no single status field that means
//! "done", so the derived value combines fields (status and health, status and
//! progress, presence of a VLAN or rule).

use converge_core::StatusSnapshot;

use crate::models::{Image, Network, NetworkPort, PvmInstance, SecurityGroup, Snapshot, Volume};

pub const ACTIVE: &str = "ACTIVE";
pub const BUILD: &str = "BUILD";
pub const ERROR: &str = "ERROR";
pub const PENDING: &str = "PENDING";
pub const SHUTOFF: &str = "SHUTOFF";
pub const STOPPING: &str = "STOPPING";
pub const RESIZE: &str = "RESIZE";
pub const VERIFY_RESIZE: &str = "VERIFY_RESIZE";
pub const INSTANCE_DELETING: &str = "DELETING";

pub const HEALTH_OK: &str = "OK";
pub const HEALTH_WARNING: &str = "WARNING";

pub const VOLUME_AVAILABLE: &str = "available";
pub const VOLUME_IN_USE: &str = "in-use";
pub const VOLUME_CREATING: &str = "creating";
pub const VOLUME_DELETING: &str = "deleting";

pub const IMAGE_ACTIVE: &str = "active";
pub const IMAGE_QUEUED: &str = "queued";

pub const NETWORK_READY: &str = "NETWORK_READY";
pub const NETWORK_BUILD: &str = "build";

pub const PORT_DOWN: &str = "DOWN";
pub const PORT_ACTIVE: &str = "ACTIVE";
pub const PORT_BUILD: &str = "build";

pub const SNAPSHOT_AVAILABLE: &str = "available";
pub const SNAPSHOT_IN_PROGRESS: &str = "in_progress";
pub const SNAPSHOT_DELETING: &str = "deleting";

pub const RULE_AVAILABLE: &str = "available";
pub const RULE_PENDING: &str = "pending";
pub const RULE_REMOVED: &str = "removed";

/// Health accepted as "ready" when waiting for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyHealth {
    /// Wait for health `OK`.
    #[default]
    Ok,
    /// Accept health `WARNING` as well as `OK`.
    Warning,
}

impl ReadyHealth {
    fn accepts(&self, health: Option<&str>) -> bool {
        match (self, health) {
            (_, Some(HEALTH_OK)) => true,
            (ReadyHealth::Warning, Some(HEALTH_WARNING)) => true,
            _ => false,
        }
    }
}

fn instance_fault(instance: &PvmInstance) -> String {
    match instance.fault_message() {
        Some(message) => format!("failed to create the lpar: {}", message),
        None => "failed to create the lpar".to_string(),
    }
}

/// Instance reaching `wanted` (ACTIVE or SHUTOFF) with ready health.
fn instance_reaching(instance: &PvmInstance, wanted: &str, ready: ReadyHealth) -> StatusSnapshot {
    match instance.status.as_deref() {
        None => StatusSnapshot::missing(),
        Some(ERROR) => StatusSnapshot::with_fault(ERROR, instance_fault(instance)),
        Some(status) if status == wanted && ready.accepts(instance.health_status()) => {
            StatusSnapshot::status(wanted)
        }
        Some(_) => StatusSnapshot::status(BUILD),
    }
}

/// Instance being created or started: `ACTIVE`, `ERROR` or `BUILD`.
pub fn instance_available(instance: &PvmInstance, ready: ReadyHealth) -> StatusSnapshot {
    instance_reaching(instance, ACTIVE, ready)
}

/// Instance created in the stopped state: `SHUTOFF`, `ERROR` or `BUILD`.
pub fn instance_shutoff(instance: &PvmInstance, ready: ReadyHealth) -> StatusSnapshot {
    instance_reaching(instance, SHUTOFF, ready)
}

/// Instance status during a stop, mutate, start sequence.
///
/// `ERROR` passes through with its fault, a stable state with health other
/// than `OK` becomes `WARNING`, anything else is the raw status.
pub fn instance_normalized(instance: &PvmInstance) -> StatusSnapshot {
    let Some(status) = instance.status.as_deref() else {
        return StatusSnapshot::missing();
    };
    if status == ERROR {
        return StatusSnapshot::with_fault(ERROR, instance_fault(instance));
    }
    let stable = status == ACTIVE || status == SHUTOFF;
    if stable && instance.health_status() != Some(HEALTH_OK) {
        return StatusSnapshot::status(HEALTH_WARNING);
    }
    StatusSnapshot::status(status)
}

/// Instance still present during a delete, whatever its status.
///
/// A failed instance is deleted like any other, so `ERROR` is not a fault here.
pub fn instance_deleting(_instance: &PvmInstance) -> StatusSnapshot {
    StatusSnapshot::status(INSTANCE_DELETING)
}

/// Volume: `available` once available or attached, `creating` otherwise.
pub fn volume_available(volume: &Volume) -> StatusSnapshot {
    match volume.state.as_deref() {
        Some(VOLUME_AVAILABLE) | Some(VOLUME_IN_USE) => StatusSnapshot::status(VOLUME_AVAILABLE),
        Some(state) if state.eq_ignore_ascii_case(ERROR) => {
            StatusSnapshot::with_fault(ERROR, format!("volume {} is in error", volume.volume_id))
        }
        _ => StatusSnapshot::status(VOLUME_CREATING),
    }
}

/// Volume still present during a delete.
pub fn volume_deleting(_volume: &Volume) -> StatusSnapshot {
    StatusSnapshot::status(VOLUME_DELETING)
}

/// Image: `active` or `queued`.
pub fn image_available(image: &Image) -> StatusSnapshot {
    match image.state.as_deref() {
        Some(IMAGE_ACTIVE) => StatusSnapshot::status(IMAGE_ACTIVE),
        _ => StatusSnapshot::status(IMAGE_QUEUED),
    }
}

/// Network: ready once a VLAN is assigned.
pub fn network_ready(network: &Network) -> StatusSnapshot {
    match network.vlan_id {
        Some(_) => StatusSnapshot::status(NETWORK_READY),
        None => StatusSnapshot::status(NETWORK_BUILD),
    }
}

/// Network port created but not attached.
pub fn port_down(port: &NetworkPort) -> StatusSnapshot {
    match port.status.as_deref() {
        Some(PORT_DOWN) => StatusSnapshot::status(PORT_DOWN),
        _ => StatusSnapshot::status(PORT_BUILD),
    }
}

/// Network port attached to `instance_id`.
pub fn port_attached(port: &NetworkPort, instance_id: &str) -> StatusSnapshot {
    let attached_here = port
        .pvm_instance
        .as_ref()
        .is_some_and(|instance| instance.pvm_instance_id == instance_id);
    match port.status.as_deref() {
        Some(PORT_ACTIVE) if attached_here => StatusSnapshot::status(PORT_ACTIVE),
        _ => StatusSnapshot::status(PORT_BUILD),
    }
}

/// Snapshot: `available` once complete, `in_progress` otherwise.
pub fn snapshot_available(snapshot: &Snapshot) -> StatusSnapshot {
    match snapshot.status.as_deref() {
        Some(SNAPSHOT_AVAILABLE) | Some(ACTIVE) if snapshot.percent_complete >= 100 => {
            StatusSnapshot::status(SNAPSHOT_AVAILABLE)
        }
        Some(status) if status.eq_ignore_ascii_case(ERROR) => StatusSnapshot::with_fault(
            ERROR,
            format!("snapshot {} is in error", snapshot.snapshot_id),
        ),
        _ => StatusSnapshot::status(SNAPSHOT_IN_PROGRESS),
    }
}

/// Snapshot still present during a delete.
pub fn snapshot_deleting(_snapshot: &Snapshot) -> StatusSnapshot {
    StatusSnapshot::status(SNAPSHOT_DELETING)
}

/// Security group rule being added.
pub fn rule_added(group: &SecurityGroup, rule_id: &str) -> StatusSnapshot {
    if group.has_rule(rule_id) {
        StatusSnapshot::status(RULE_AVAILABLE)
    } else {
        StatusSnapshot::status(RULE_PENDING)
    }
}

/// Security group rule being removed.
pub fn rule_removed(group: &SecurityGroup, rule_id: &str) -> StatusSnapshot {
    if group.has_rule(rule_id) {
        StatusSnapshot::status(RULE_PENDING)
    } else {
        StatusSnapshot::status(RULE_REMOVED)
    }
}
