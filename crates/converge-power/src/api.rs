// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client traits for the Power Virtual Server API.
//!
//! One trait per resource family. A client is bound to a single cloud
//! instance (workspace), so methods only take resource IDs. Job access goes
//! through [`converge_core::JobClient`] with `Error = ApiError`.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{
    CloudConnection, CloudConnectionResponse, CloudConnectionSpec, CloudConnectionUpdate, Image,
    InstanceAction, InstanceUpdate, JobReference, Network, NetworkPort, PvmInstance,
    SecurityGroup, Snapshot, Volume,
};

/// Result of a single API call.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[async_trait]
pub trait InstanceApi: Send + Sync {
    async fn get_instance(&self, instance_id: &str) -> ApiResult<PvmInstance>;

    async fn update_instance(
        &self,
        instance_id: &str,
        update: &InstanceUpdate,
    ) -> ApiResult<PvmInstance>;

    async fn instance_action(&self, instance_id: &str, action: InstanceAction) -> ApiResult<()>;

    async fn delete_instance(&self, instance_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait VolumeApi: Send + Sync {
    async fn get_volume(&self, volume_id: &str) -> ApiResult<Volume>;

    async fn delete_volume(&self, volume_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn get_image(&self, image_id: &str) -> ApiResult<Image>;
}

#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn get_network(&self, network_id: &str) -> ApiResult<Network>;

    async fn get_port(&self, network_id: &str, port_id: &str) -> ApiResult<NetworkPort>;
}

#[async_trait]
pub trait SnapshotApi: Send + Sync {
    async fn get_snapshot(&self, snapshot_id: &str) -> ApiResult<Snapshot>;

    async fn delete_snapshot(&self, snapshot_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait SecurityGroupApi: Send + Sync {
    async fn get_security_group(&self, group_id: &str) -> ApiResult<SecurityGroup>;
}

/// Cloud connection lifecycle.
///
/// Create and update either finish synchronously or hand back a job.
#[async_trait]
pub trait CloudConnectionApi: Send + Sync {
    async fn get_cloud_connection(&self, connection_id: &str) -> ApiResult<CloudConnection>;

    async fn create_cloud_connection(
        &self,
        spec: &CloudConnectionSpec,
    ) -> ApiResult<CloudConnectionResponse>;

    async fn update_cloud_connection(
        &self,
        connection_id: &str,
        update: &CloudConnectionUpdate,
    ) -> ApiResult<CloudConnectionResponse>;

    /// Delete a connection. Returns the job tracking the deletion, if any.
    async fn delete_cloud_connection(&self, connection_id: &str)
    -> ApiResult<Option<JobReference>>;
}
