// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Snapshot waits.

use std::time::Duration;

use converge_core::{ErrorClass, OperationKind, classify};
use tracing::{info, instrument};

use crate::api::SnapshotApi;
use crate::error::{Result, api_failure};
use crate::policy;
use crate::reconciler::PowerReconciler;
use crate::status;

impl<C: SnapshotApi> PowerReconciler<C> {
    /// Wait for a snapshot to be available and complete.
    #[instrument(skip(self, snapshot_id), fields(snapshot_id = %snapshot_id))]
    pub async fn wait_for_snapshot_available(
        &self,
        snapshot_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::snapshot_available(self.timeout(timeout)),
            OperationKind::Create,
            || async move {
                self.client
                    .get_snapshot(snapshot_id)
                    .await
                    .map(|snapshot| status::snapshot_available(&snapshot))
            },
        )
        .await
    }

    /// Wait until a snapshot lookup returns not found.
    #[instrument(skip(self, snapshot_id), fields(snapshot_id = %snapshot_id))]
    pub async fn wait_for_snapshot_deleted(
        &self,
        snapshot_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::snapshot_deleted(self.timeout(timeout)),
            OperationKind::Delete,
            || async move {
                self.client
                    .get_snapshot(snapshot_id)
                    .await
                    .map(|snapshot| status::snapshot_deleting(&snapshot))
            },
        )
        .await
    }

    /// Delete a snapshot and wait until it is gone.
    pub async fn delete_snapshot(&self, snapshot_id: &str, timeout: Option<Duration>) -> Result<()> {
        match self.client.delete_snapshot(snapshot_id).await {
            Ok(()) => {}
            Err(err) if classify(&err) == ErrorClass::NotFound => {
                info!(snapshot_id, "Snapshot already deleted");
                return Ok(());
            }
            Err(err) => return Err(api_failure(err)),
        }
        self.wait_for_snapshot_deleted(snapshot_id, timeout).await?;
        Ok(())
    }
}
