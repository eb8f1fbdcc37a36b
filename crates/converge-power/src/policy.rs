// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Poll policy presets per resource kind.
//!
//! The intervals reflect how slowly each resource moves on the remote side:
//! instances are polled every few minutes, networks and jobs every few
//! seconds.

use std::time::Duration;

use converge_core::{DELETED_STATUS, PollPolicy, ResizePolicies};

use crate::status::{
    self, ACTIVE, BUILD, ERROR, HEALTH_WARNING, PENDING, RESIZE, ReadyHealth, SHUTOFF, STOPPING,
    VERIFY_RESIZE,
};

const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

const fn mins(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// Timeout of an instance create or start wait.
pub const INSTANCE_AVAILABLE_TIMEOUT: Duration = mins(120);
/// Timeout of an instance stop wait.
pub const INSTANCE_STOPPED_TIMEOUT: Duration = mins(30);
/// Timeout of the wait following an in-place resize.
pub const POST_RESIZE_TIMEOUT: Duration = mins(60);
/// Timeout of an instance delete wait.
pub const INSTANCE_DELETED_TIMEOUT: Duration = mins(10);

/// Min interval while waiting for an instance to become active.
pub const ACTIVE_MIN_INTERVAL: Duration = mins(2);
/// Min interval while waiting for an instance that may stay in WARNING.
pub const WARNING_MIN_INTERVAL: Duration = secs(60);

fn preset(
    subject: &str,
    timeout: Duration,
    initial_delay: Duration,
    min_interval: Duration,
) -> PollPolicy {
    PollPolicy::new(timeout)
        .with_subject(subject)
        .with_poll_interval(secs(10))
        .with_min_poll_interval(min_interval)
        .with_initial_delay(initial_delay)
}

/// Instance reaching ACTIVE after create or start.
pub fn instance_available(ready: ReadyHealth) -> PollPolicy {
    let min_interval = match ready {
        ReadyHealth::Ok => ACTIVE_MIN_INTERVAL,
        ReadyHealth::Warning => WARNING_MIN_INTERVAL,
    };
    preset("instance", INSTANCE_AVAILABLE_TIMEOUT, secs(30), min_interval)
        .with_pending([PENDING, BUILD, HEALTH_WARNING])
        .with_target([ACTIVE])
        .with_fatal([ERROR])
}

/// Instance created in the stopped state reaching SHUTOFF.
pub fn instance_shutoff(ready: ReadyHealth) -> PollPolicy {
    instance_available(ready).with_target([SHUTOFF])
}

/// Instance reaching SHUTOFF after a stop.
pub fn instance_stopped() -> PollPolicy {
    preset("instance", INSTANCE_STOPPED_TIMEOUT, secs(10), mins(2))
        .with_pending([ACTIVE, STOPPING, RESIZE, VERIFY_RESIZE, HEALTH_WARNING])
        .with_target([SHUTOFF])
        .with_fatal([ERROR])
}

/// Stopped instance settling after an in-place resize.
pub fn post_resize() -> PollPolicy {
    preset("instance", POST_RESIZE_TIMEOUT, secs(10), mins(5))
        .with_pending([RESIZE, VERIFY_RESIZE, HEALTH_WARNING])
        .with_target([ACTIVE, SHUTOFF])
        .with_fatal([ERROR])
}

/// Instance disappearing after a delete.
///
/// Only a not-found lookup ends the wait; an instance in `ERROR` is still
/// being deleted.
pub fn instance_deleted() -> PollPolicy {
    preset("instance", INSTANCE_DELETED_TIMEOUT, secs(10), secs(10))
        .with_pending([status::INSTANCE_DELETING])
        .with_target([DELETED_STATUS])
}

/// The three waits of a cold resize.
pub fn resize() -> ResizePolicies {
    ResizePolicies {
        stop: instance_stopped(),
        mutate: post_resize(),
        start: preset("instance", INSTANCE_AVAILABLE_TIMEOUT, secs(10), mins(2))
            .with_pending([SHUTOFF, BUILD, PENDING, HEALTH_WARNING])
            .with_target([ACTIVE])
            .with_fatal([ERROR]),
    }
}

pub fn volume_available(timeout: Duration) -> PollPolicy {
    preset("volume", timeout, secs(10), mins(2))
        .with_pending([status::VOLUME_CREATING])
        .with_target([status::VOLUME_AVAILABLE])
        .with_fatal([ERROR])
}

pub fn volume_deleted(timeout: Duration) -> PollPolicy {
    preset("volume", timeout, secs(10), mins(2))
        .with_pending([status::VOLUME_DELETING])
        .with_target([DELETED_STATUS])
}

pub fn image_active(timeout: Duration) -> PollPolicy {
    preset("image", timeout, secs(20), secs(10))
        .with_pending([status::IMAGE_QUEUED])
        .with_target([status::IMAGE_ACTIVE])
}

pub fn network_ready(timeout: Duration) -> PollPolicy {
    preset("network", timeout, secs(10), secs(10))
        .with_pending([status::NETWORK_BUILD])
        .with_target([status::NETWORK_READY])
}

pub fn port_down(timeout: Duration) -> PollPolicy {
    preset("network port", timeout, secs(10), mins(10))
        .with_pending([status::PORT_BUILD])
        .with_target([status::PORT_DOWN])
}

pub fn port_attached(timeout: Duration) -> PollPolicy {
    preset("network port", timeout, secs(10), mins(10))
        .with_pending([status::PORT_BUILD])
        .with_target([status::PORT_ACTIVE])
}

pub fn snapshot_available(timeout: Duration) -> PollPolicy {
    preset("snapshot", timeout, secs(30), mins(2))
        .with_pending([status::SNAPSHOT_IN_PROGRESS])
        .with_target([status::SNAPSHOT_AVAILABLE])
        .with_fatal([ERROR])
}

pub fn snapshot_deleted(timeout: Duration) -> PollPolicy {
    preset("snapshot", timeout, secs(10), secs(10))
        .with_pending([status::SNAPSHOT_DELETING])
        .with_target([DELETED_STATUS])
}

pub fn rule_added(timeout: Duration) -> PollPolicy {
    preset("security group rule", timeout, secs(10), mins(10))
        .with_pending([status::RULE_PENDING])
        .with_target([status::RULE_AVAILABLE])
}

pub fn rule_removed(timeout: Duration) -> PollPolicy {
    preset("security group rule", timeout, secs(10), mins(10))
        .with_pending([status::RULE_PENDING])
        .with_target([status::RULE_REMOVED])
}
