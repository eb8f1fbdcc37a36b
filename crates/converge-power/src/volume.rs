// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Volume and image waits.

use std::time::Duration;

use converge_core::{ErrorClass, OperationKind, classify};
use tracing::{info, instrument};

use crate::api::{ImageApi, VolumeApi};
use crate::error::{Result, api_failure};
use crate::policy;
use crate::reconciler::PowerReconciler;
use crate::status;

impl<C: VolumeApi> PowerReconciler<C> {
    /// Wait for a volume to become available.
    #[instrument(skip(self, volume_id), fields(volume_id = %volume_id))]
    pub async fn wait_for_volume_available(
        &self,
        volume_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::volume_available(self.timeout(timeout)),
            OperationKind::Create,
            || async move {
                self.client
                    .get_volume(volume_id)
                    .await
                    .map(|volume| status::volume_available(&volume))
            },
        )
        .await
    }

    /// Wait until a volume lookup returns not found.
    #[instrument(skip(self, volume_id), fields(volume_id = %volume_id))]
    pub async fn wait_for_volume_deleted(
        &self,
        volume_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::volume_deleted(self.timeout(timeout)),
            OperationKind::Delete,
            || async move {
                self.client
                    .get_volume(volume_id)
                    .await
                    .map(|volume| status::volume_deleting(&volume))
            },
        )
        .await
    }

    /// Delete a volume and wait until it is gone.
    pub async fn delete_volume(&self, volume_id: &str, timeout: Option<Duration>) -> Result<()> {
        match self.client.delete_volume(volume_id).await {
            Ok(()) => {}
            Err(err) if classify(&err) == ErrorClass::NotFound => {
                info!(volume_id, "Volume already deleted");
                return Ok(());
            }
            Err(err) => return Err(api_failure(err)),
        }
        self.wait_for_volume_deleted(volume_id, timeout).await?;
        Ok(())
    }
}

impl<C: ImageApi> PowerReconciler<C> {
    /// Wait for an imported or captured image to become active.
    #[instrument(skip(self, image_id), fields(image_id = %image_id))]
    pub async fn wait_for_image_active(
        &self,
        image_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::image_active(self.timeout(timeout)),
            OperationKind::Create,
            || async move {
                self.client
                    .get_image(image_id)
                    .await
                    .map(|image| status::image_available(&image))
            },
        )
        .await
    }
}
