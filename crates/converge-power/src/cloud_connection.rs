// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cloud connection lifecycle.
//!
//! Connections are identified externally by `cloud_instance_id/connection_id`.
//! Create and update may fail with a "service unavailable" code while the
//! remote side sets up the VPC; those calls are retried as a whole.

use std::time::Duration;

use converge_core::{
    CompositeId, ErrorClass, JobClient, OperationKind, RemoteOperationHandle, classify,
};
use tracing::{debug, info, instrument};

use crate::api::CloudConnectionApi;
use crate::error::{ApiError, PowerError, Result, api_failure};
use crate::models::{CloudConnection, CloudConnectionSpec, CloudConnectionUpdate};
use crate::reconciler::PowerReconciler;

const ID_SEGMENTS: usize = 2;

impl<C> PowerReconciler<C>
where
    C: CloudConnectionApi + JobClient<Error = ApiError>,
{
    /// Create a connection and wait for its job, if any.
    ///
    /// Returns the composite ID `cloud_instance_id/connection_id`.
    #[instrument(skip(self, spec), fields(name = %spec.name))]
    pub async fn create_cloud_connection(
        &self,
        spec: &CloudConnectionSpec,
        timeout: Option<Duration>,
    ) -> Result<CompositeId> {
        let response = self
            .config
            .transient_retry()
            .call_cancellable("pcloudCloudconnectionsPost", &self.cancel, || {
                self.client.create_cloud_connection(spec)
            })
            .await?;

        let id = CompositeId::new([
            self.cloud_instance_id.as_str(),
            response.cloud_connection_id(),
        ])?;
        self.await_operation(&response.handle(OperationKind::Create), timeout)
            .await?;
        info!(cloud_connection_id = %id, "Cloud connection created");
        Ok(id)
    }

    /// Update a connection and wait for its job, if any.
    #[instrument(skip(self, id, update), fields(cloud_connection_id = %id))]
    pub async fn update_cloud_connection(
        &self,
        id: &str,
        update: &CloudConnectionUpdate,
        timeout: Option<Duration>,
    ) -> Result<CompositeId> {
        let id = self.parse_id(id)?;
        let connection_id = id.leaf();
        let response = self
            .config
            .transient_retry()
            .call_cancellable("pcloudCloudconnectionsPut", &self.cancel, || {
                self.client.update_cloud_connection(connection_id, update)
            })
            .await?;
        self.await_operation(&response.handle(OperationKind::Update), timeout)
            .await?;
        Ok(id)
    }

    /// Read a connection. `None` when it no longer exists.
    pub async fn read_cloud_connection(&self, id: &str) -> Result<Option<CloudConnection>> {
        let id = self.parse_id(id)?;
        match self.client.get_cloud_connection(id.leaf()).await {
            Ok(connection) => Ok(Some(connection)),
            Err(err) if classify(&err) == ErrorClass::NotFound => Ok(None),
            Err(err) => Err(api_failure(err)),
        }
    }

    /// Delete a connection and wait for the deletion job.
    ///
    /// A connection that is already gone counts as deleted.
    #[instrument(skip(self, id), fields(cloud_connection_id = %id))]
    pub async fn delete_cloud_connection(&self, id: &str, timeout: Option<Duration>) -> Result<()> {
        let id = self.parse_id(id)?;
        let connection_id = id.leaf();

        if let Err(err) = self.client.get_cloud_connection(connection_id).await {
            if classify(&err) == ErrorClass::NotFound {
                info!("Cloud connection already deleted");
                return Ok(());
            }
            return Err(api_failure(err));
        }

        let handle = match self
            .client
            .delete_cloud_connection(connection_id)
            .await
            .map_err(api_failure)?
        {
            Some(job) => {
                RemoteOperationHandle::with_job(connection_id, job.id, OperationKind::Delete)
            }
            None => RemoteOperationHandle::new(connection_id, OperationKind::Delete),
        };
        self.await_operation(&handle, timeout).await
    }

    fn parse_id(&self, id: &str) -> Result<CompositeId> {
        CompositeId::parse(id, ID_SEGMENTS).map_err(PowerError::from)
    }

    /// Wait for the job behind `handle`, if the request continues in one.
    async fn await_operation(
        &self,
        handle: &RemoteOperationHandle,
        timeout: Option<Duration>,
    ) -> Result<()> {
        match handle.job_id() {
            Some(job_id) => {
                self.wait_for_job(job_id, timeout).await?;
            }
            None => debug!(
                kind = %handle.kind(),
                cloud_connection_id = handle.resource_id(),
                "Cloud connection request completed without a job"
            ),
        }
        Ok(())
    }
}
