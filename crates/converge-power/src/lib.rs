// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Converge Power
//!
//! Power Virtual Server adapters for [`converge_core`].
//!
//! A [`PowerReconciler`] wraps an API client bound to one cloud instance and
//! waits for instances, volumes, images, networks, ports, snapshots, security
//! group rules, cloud connections and jobs to converge. The client only has
//! to implement the API traits for the resources it is used with.
//!
//! # Example
//!
//! ```no_run
//! use converge_power::{MockPowerCloud, PowerReconciler, ReadyHealth};
//!
//! # async fn example() -> converge_power::Result<()> {
//! let reconciler = PowerReconciler::new("cloud-1", MockPowerCloud::new());
//!
//! reconciler.start_instance("pvm-1").await?;
//! let status = reconciler
//!     .wait_for_instance_available("pvm-1", ReadyHealth::Ok)
//!     .await?;
//! assert_eq!(status, "ACTIVE");
//! # Ok(())
//! # }
//! ```

pub mod api;
mod cloud_connection;
mod error;
mod instance;
pub mod mock;
pub mod models;
mod network;
mod planning;
pub mod policy;
mod reconciler;
mod security_group;
mod snapshot;
pub mod status;
mod volume;

pub use api::{
    ApiResult, CloudConnectionApi, ImageApi, InstanceApi, NetworkApi, SecurityGroupApi,
    SnapshotApi, VolumeApi,
};
pub use error::{ApiError, PowerError, Result, TRANSIENT_CODES};
pub use mock::MockPowerCloud;
pub use planning::{ChangePlan, ChangeReport, HotWait, InstanceChange, plan_change};
pub use reconciler::PowerReconciler;
pub use status::ReadyHealth;
