// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Network security group rule waits.
//!
//! Rules have no status of their own; convergence is the presence or absence
//! of the rule ID in the group.

use std::time::Duration;

use converge_core::OperationKind;
use tracing::instrument;

use crate::api::SecurityGroupApi;
use crate::error::Result;
use crate::policy;
use crate::reconciler::PowerReconciler;
use crate::status;

impl<C: SecurityGroupApi> PowerReconciler<C> {
    #[instrument(skip(self, group_id, rule_id), fields(group_id = %group_id, rule_id = %rule_id))]
    pub async fn wait_for_rule_added(
        &self,
        group_id: &str,
        rule_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::rule_added(self.timeout(timeout)),
            OperationKind::Create,
            || async move {
                self.client
                    .get_security_group(group_id)
                    .await
                    .map(|group| status::rule_added(&group, rule_id))
            },
        )
        .await
    }

    /// A missing group also means the rule is gone.
    #[instrument(skip(self, group_id, rule_id), fields(group_id = %group_id, rule_id = %rule_id))]
    pub async fn wait_for_rule_removed(
        &self,
        group_id: &str,
        rule_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        self.wait(
            policy::rule_removed(self.timeout(timeout)),
            OperationKind::Delete,
            || async move {
                self.client
                    .get_security_group(group_id)
                    .await
                    .map(|group| status::rule_removed(&group, rule_id))
            },
        )
        .await
    }
}
