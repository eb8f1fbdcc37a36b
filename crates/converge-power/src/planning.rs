// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Instance resource changes.
//!
//! Memory and processor changes inside the instance's current maximums are
//! applied hot. Anything beyond the maximums on a running instance, and any
//! processor type or SAP profile change, needs a stop, update and start cycle
//! driven by [`converge_core::ResizeOrchestrator`].

use converge_core::{JobClient, ResizeOrchestrator, ResizeReport};
use serde::Serialize;
use tracing::{info, instrument};

use crate::api::InstanceApi;
use crate::error::{ApiError, PowerError, Result};
use crate::instance::InstanceResize;
use crate::models::{InstanceUpdate, PvmInstance, VirtualCores};
use crate::policy;
use crate::reconciler::PowerReconciler;
use crate::status::{HEALTH_WARNING, ReadyHealth, SHUTOFF};

/// Requested change to an instance. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceChange {
    pub name: Option<String>,
    pub memory: Option<f64>,
    pub processors: Option<f64>,
    pub proc_type: Option<String>,
    pub sap_profile_id: Option<String>,
    pub virtual_cores: Option<i64>,
}

impl InstanceChange {
    /// Whether nothing is requested.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Update body carrying every requested field.
    pub fn to_update(&self) -> InstanceUpdate {
        InstanceUpdate {
            server_name: self.name.clone(),
            memory: self.memory,
            processors: self.processors,
            proc_type: self.proc_type.clone(),
            sap_profile_id: self.sap_profile_id.clone(),
            virtual_cores: self
                .virtual_cores
                .map(|assigned| VirtualCores { assigned }),
        }
    }

    fn exceeds_maximums(&self, current: &PvmInstance) -> bool {
        self.memory.is_some_and(|memory| memory > current.max_memory)
            || self
                .processors
                .is_some_and(|processors| processors > current.max_processors)
    }
}

/// Wait following a hot update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HotWait {
    /// Running instance: wait until ACTIVE with health OK.
    Available,
    /// Stopped instance: wait for the resize states to clear.
    PostResize,
}

/// How a change is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "plan", content = "wait")]
pub enum ChangePlan {
    /// Update in place, then wait.
    Hot(HotWait),
    /// Stop, update, start.
    Cold,
}

/// Decide how `change` is applied to `current`.
pub fn plan_change(current: &PvmInstance, change: &InstanceChange) -> Result<ChangePlan> {
    if current.health_status() == Some(HEALTH_WARNING) {
        return Err(PowerError::UnhealthyInstance(HEALTH_WARNING.to_string()));
    }
    if change.is_empty() {
        return Err(PowerError::InvalidChange("no changes requested".to_string()));
    }

    let stopped = current.status.as_deref() == Some(SHUTOFF);
    if change.proc_type.is_some() || change.sap_profile_id.is_some() {
        return Ok(ChangePlan::Cold);
    }
    if change.exceeds_maximums(current) && !stopped {
        return Ok(ChangePlan::Cold);
    }
    if stopped {
        Ok(ChangePlan::Hot(HotWait::PostResize))
    } else {
        Ok(ChangePlan::Hot(HotWait::Available))
    }
}

/// Outcome of [`PowerReconciler::apply_instance_change`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    /// Plan that was executed.
    pub plan: ChangePlan,
    /// Instance status once the change has converged.
    pub final_status: String,
    /// For cold changes, whether the instance was already stopped.
    pub stop_skipped: bool,
}

impl<C> PowerReconciler<C>
where
    C: InstanceApi + JobClient<Error = ApiError>,
{
    /// Apply `change` to an instance and wait until it has converged.
    #[instrument(skip(self, instance_id, change), fields(instance_id = %instance_id))]
    pub async fn apply_instance_change(
        &self,
        instance_id: &str,
        change: &InstanceChange,
    ) -> Result<ChangeReport> {
        let retry = self.config.transient_retry();
        let current = retry
            .call_cancellable("pcloudPvminstancesGet", &self.cancel, || {
                self.client.get_instance(instance_id)
            })
            .await?;

        let plan = plan_change(&current, change)?;
        info!(?plan, status = ?current.status, "Applying instance change");

        let update = change.to_update();
        match plan {
            ChangePlan::Hot(wait) => {
                retry
                    .call_cancellable("pcloudPvminstancesPut", &self.cancel, || {
                        self.client.update_instance(instance_id, &update)
                    })
                    .await?;
                let final_status = match wait {
                    HotWait::Available => {
                        self.wait_for_instance_available(instance_id, ReadyHealth::Ok)
                            .await?
                    }
                    HotWait::PostResize => self.wait_for_instance_resized(instance_id).await?,
                };
                Ok(ChangeReport {
                    plan,
                    final_status,
                    stop_skipped: false,
                })
            }
            ChangePlan::Cold => {
                let target = InstanceResize::new(&self.client);
                let ResizeReport {
                    stop_skipped,
                    final_status,
                } = ResizeOrchestrator::new(&target, policy::resize())?
                    .with_retry(retry)
                    .with_job_waiter(self.job_waiter())
                    .with_cancellation(self.cancel.clone())
                    .run(instance_id, &update)
                    .await?;
                Ok(ChangeReport {
                    plan,
                    final_status,
                    stop_skipped,
                })
            }
        }
    }
}
