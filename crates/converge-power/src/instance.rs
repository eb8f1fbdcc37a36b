// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Instance lifecycle waits and actions.

use async_trait::async_trait;
use converge_core::{
    ActionAck, ErrorClass, JobClient, JobSnapshot, OperationKind, ResizeTarget, StatusSnapshot,
    classify,
};
use tracing::{info, instrument};

use crate::api::InstanceApi;
use crate::error::{ApiError, Result, api_failure};
use crate::models::{InstanceAction, InstanceUpdate};
use crate::policy;
use crate::reconciler::PowerReconciler;
use crate::status::{self, ReadyHealth};

impl<C: InstanceApi> PowerReconciler<C> {
    /// Wait for a new or started instance to become ACTIVE with ready health.
    #[instrument(skip(self, instance_id), fields(instance_id = %instance_id))]
    pub async fn wait_for_instance_available(
        &self,
        instance_id: &str,
        ready: ReadyHealth,
    ) -> Result<String> {
        self.wait(
            policy::instance_available(ready),
            OperationKind::Create,
            || async move {
                self.client
                    .get_instance(instance_id)
                    .await
                    .map(|instance| status::instance_available(&instance, ready))
            },
        )
        .await
    }

    /// Wait for an instance created in the stopped state to reach SHUTOFF.
    #[instrument(skip(self, instance_id), fields(instance_id = %instance_id))]
    pub async fn wait_for_instance_shutoff(
        &self,
        instance_id: &str,
        ready: ReadyHealth,
    ) -> Result<String> {
        self.wait(
            policy::instance_shutoff(ready),
            OperationKind::Create,
            || async move {
                self.client
                    .get_instance(instance_id)
                    .await
                    .map(|instance| status::instance_shutoff(&instance, ready))
            },
        )
        .await
    }

    /// Wait for a stopped instance to reach SHUTOFF with health OK.
    #[instrument(skip(self, instance_id), fields(instance_id = %instance_id))]
    pub async fn wait_for_instance_stopped(&self, instance_id: &str) -> Result<String> {
        self.wait(policy::instance_stopped(), OperationKind::Action, || {
            self.normalized(instance_id)
        })
        .await
    }

    /// Wait for an instance to settle after an in-place resize.
    #[instrument(skip(self, instance_id), fields(instance_id = %instance_id))]
    pub async fn wait_for_instance_resized(&self, instance_id: &str) -> Result<String> {
        self.wait(policy::post_resize(), OperationKind::Update, || {
            self.normalized(instance_id)
        })
        .await
    }

    /// Wait for a deleted instance to disappear.
    ///
    /// Any instance that can still be fetched counts as deleting, including
    /// one in `ERROR`.
    #[instrument(skip(self, instance_id), fields(instance_id = %instance_id))]
    pub async fn wait_for_instance_deleted(&self, instance_id: &str) -> Result<String> {
        self.wait(
            policy::instance_deleted(),
            OperationKind::Delete,
            || async move {
                self.client
                    .get_instance(instance_id)
                    .await
                    .map(|instance| status::instance_deleting(&instance))
            },
        )
        .await
    }

    /// Start an instance and wait until it is ACTIVE with health OK.
    pub async fn start_instance(&self, instance_id: &str) -> Result<String> {
        self.client
            .instance_action(instance_id, InstanceAction::Start)
            .await
            .map_err(api_failure)?;
        self.wait_for_instance_available(instance_id, ReadyHealth::Ok)
            .await
    }

    /// Stop an instance and wait until it is SHUTOFF.
    pub async fn stop_instance(&self, instance_id: &str) -> Result<String> {
        self.client
            .instance_action(instance_id, InstanceAction::Stop)
            .await
            .map_err(api_failure)?;
        self.wait_for_instance_stopped(instance_id).await
    }

    /// Delete an instance and wait until it is gone.
    ///
    /// An instance that is already gone counts as deleted.
    pub async fn delete_instance(&self, instance_id: &str) -> Result<()> {
        match self.client.delete_instance(instance_id).await {
            Ok(()) => {}
            Err(err) if classify(&err) == ErrorClass::NotFound => {
                info!(instance_id, "Instance already deleted");
                return Ok(());
            }
            Err(err) => return Err(api_failure(err)),
        }
        self.wait_for_instance_deleted(instance_id).await?;
        Ok(())
    }

    async fn normalized(&self, instance_id: &str) -> std::result::Result<StatusSnapshot, ApiError> {
        self.client
            .get_instance(instance_id)
            .await
            .map(|instance| status::instance_normalized(&instance))
    }
}

/// Instance seen through the resize workflow.
///
/// Stop uses an immediate shutdown. Instance actions never return jobs, so
/// every ack is `Accepted` and progress is read from the instance status.
pub(crate) struct InstanceResize<'a, C> {
    client: &'a C,
}

impl<'a, C> InstanceResize<'a, C> {
    pub(crate) fn new(client: &'a C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a, C> JobClient for InstanceResize<'a, C>
where
    C: JobClient<Error = ApiError>,
{
    type Error = ApiError;

    async fn get_job(&self, job_id: &str) -> std::result::Result<JobSnapshot, ApiError> {
        self.client.get_job(job_id).await
    }
}

#[async_trait]
impl<'a, C> ResizeTarget for InstanceResize<'a, C>
where
    C: InstanceApi + JobClient<Error = ApiError>,
{
    type Payload = InstanceUpdate;

    async fn fetch_status(&self, id: &str) -> std::result::Result<StatusSnapshot, ApiError> {
        let instance = self.client.get_instance(id).await?;
        Ok(status::instance_normalized(&instance))
    }

    async fn stop(&self, id: &str) -> std::result::Result<ActionAck, ApiError> {
        self.client
            .instance_action(id, InstanceAction::ImmediateShutdown)
            .await?;
        Ok(ActionAck::Accepted)
    }

    async fn start(&self, id: &str) -> std::result::Result<ActionAck, ApiError> {
        self.client.instance_action(id, InstanceAction::Start).await?;
        Ok(ActionAck::Accepted)
    }

    async fn update(
        &self,
        id: &str,
        payload: &InstanceUpdate,
    ) -> std::result::Result<ActionAck, ApiError> {
        self.client.update_instance(id, payload).await?;
        Ok(ActionAck::Accepted)
    }
}
