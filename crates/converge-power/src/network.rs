// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Network and network port waits.

use std::time::Duration;

use converge_core::OperationKind;
use tracing::instrument;

use crate::api::NetworkApi;
use crate::error::Result;
use crate::policy;
use crate::reconciler::PowerReconciler;
use crate::status;

impl<C: NetworkApi> PowerReconciler<C> {
    /// Wait for a network to get its VLAN.
    #[instrument(skip(self, network_id), fields(network_id = %network_id))]
    pub async fn wait_for_network_ready(
        &self,
        network_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::network_ready(self.timeout(timeout)),
            OperationKind::Create,
            || async move {
                self.client
                    .get_network(network_id)
                    .await
                    .map(|network| status::network_ready(&network))
            },
        )
        .await
    }

    /// Wait for a new port to report DOWN.
    #[instrument(skip(self, network_id, port_id), fields(network_id = %network_id, port_id = %port_id))]
    pub async fn wait_for_port_down(
        &self,
        network_id: &str,
        port_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::port_down(self.timeout(timeout)),
            OperationKind::Create,
            || async move {
                self.client
                    .get_port(network_id, port_id)
                    .await
                    .map(|port| status::port_down(&port))
            },
        )
        .await
    }

    /// Wait for a port to be ACTIVE and attached to `instance_id`.
    #[instrument(
        skip(self, network_id, port_id, instance_id),
        fields(network_id = %network_id, port_id = %port_id, instance_id = %instance_id)
    )]
    pub async fn wait_for_port_attached(
        &self,
        network_id: &str,
        port_id: &str,
        instance_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::port_attached(self.timeout(timeout)),
            OperationKind::Update,
            || async move {
                self.client
                    .get_port(network_id, port_id)
                    .await
                    .map(|port| status::port_attached(&port, instance_id))
            },
        )
        .await
    }
}
