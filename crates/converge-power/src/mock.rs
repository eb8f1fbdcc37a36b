// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock Power cloud for testing.
//!
//! Every lookup is answered from a per-ID script. Each call consumes one
//! scripted response; the last one repeats forever. A lookup with nothing
//! scripted answers 404. Mutating calls succeed unless a failure was queued
//! for the operation. All calls are recorded in order.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use converge_core::{JobClient, JobSnapshot};
use tokio::sync::Mutex;

use crate::api::{
    ApiResult, CloudConnectionApi, ImageApi, InstanceApi, NetworkApi, SecurityGroupApi,
    SnapshotApi, VolumeApi,
};
use crate::error::ApiError;
use crate::models::{
    CloudConnection, CloudConnectionResponse, CloudConnectionSpec, CloudConnectionUpdate, Image,
    InstanceAction, InstanceUpdate, Job, JobReference, Network, NetworkPort, PvmInstance,
    SecurityGroup, Snapshot, Volume,
};

type Scripts<T> = HashMap<String, VecDeque<ApiResult<T>>>;

#[derive(Default)]
struct MockState {
    instances: Scripts<PvmInstance>,
    volumes: Scripts<Volume>,
    images: Scripts<Image>,
    networks: Scripts<Network>,
    ports: Scripts<NetworkPort>,
    snapshots: Scripts<Snapshot>,
    security_groups: Scripts<SecurityGroup>,
    cloud_connections: Scripts<CloudConnection>,
    jobs: Scripts<Job>,
    connection_responses: Scripts<CloudConnectionResponse>,
    delete_jobs: Scripts<Option<JobReference>>,
    failures: HashMap<String, VecDeque<ApiError>>,
    calls: Vec<String>,
}

impl MockState {
    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn take_failure(&mut self, operation: &str) -> ApiResult<()> {
        match self
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Next scripted response for `key`, repeating the last one.
fn next<T: Clone>(scripts: &mut Scripts<T>, key: &str) -> Option<ApiResult<T>> {
    let queue = scripts.get_mut(key)?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn lookup<T: Clone>(scripts: &mut Scripts<T>, operation: &str, key: &str) -> ApiResult<T> {
    next(scripts, key).unwrap_or_else(|| Err(ApiError::not_found(operation, key)))
}

fn push<T, I>(scripts: &mut Scripts<T>, key: &str, responses: I)
where
    I: IntoIterator<Item = ApiResult<T>>,
{
    scripts
        .entry(key.to_string())
        .or_default()
        .extend(responses);
}

/// Scripted in-memory Power cloud.
#[derive(Default)]
pub struct MockPowerCloud {
    state: Mutex<MockState>,
}

impl MockPowerCloud {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the responses of instance lookups.
    pub async fn script_instance<I>(&self, instance_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<PvmInstance>>,
    {
        push(&mut self.state.lock().await.instances, instance_id, responses);
    }

    /// Script the responses of volume lookups.
    pub async fn script_volume<I>(&self, volume_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<Volume>>,
    {
        push(&mut self.state.lock().await.volumes, volume_id, responses);
    }

    /// Script the responses of image lookups.
    pub async fn script_image<I>(&self, image_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<Image>>,
    {
        push(&mut self.state.lock().await.images, image_id, responses);
    }

    /// Script the responses of network lookups.
    pub async fn script_network<I>(&self, network_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<Network>>,
    {
        push(&mut self.state.lock().await.networks, network_id, responses);
    }

    /// Script the responses of port lookups.
    pub async fn script_port<I>(&self, network_id: &str, port_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<NetworkPort>>,
    {
        let key = format!("{}/{}", network_id, port_id);
        push(&mut self.state.lock().await.ports, &key, responses);
    }

    /// Script the responses of snapshot lookups.
    pub async fn script_snapshot<I>(&self, snapshot_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<Snapshot>>,
    {
        push(&mut self.state.lock().await.snapshots, snapshot_id, responses);
    }

    /// Script the responses of security group lookups.
    pub async fn script_security_group<I>(&self, group_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<SecurityGroup>>,
    {
        push(
            &mut self.state.lock().await.security_groups,
            group_id,
            responses,
        );
    }

    /// Script the responses of cloud connection lookups.
    pub async fn script_cloud_connection<I>(&self, connection_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<CloudConnection>>,
    {
        push(
            &mut self.state.lock().await.cloud_connections,
            connection_id,
            responses,
        );
    }

    /// Script the responses of cloud connection creates and updates.
    pub async fn script_connection_responses<I>(&self, responses: I)
    where
        I: IntoIterator<Item = ApiResult<CloudConnectionResponse>>,
    {
        push(
            &mut self.state.lock().await.connection_responses,
            "",
            responses,
        );
    }

    /// Script the job returned by a cloud connection delete.
    pub async fn script_delete_job(&self, connection_id: &str, job_id: Option<&str>) {
        let job = job_id.map(|id| JobReference { id: id.to_string() });
        push(
            &mut self.state.lock().await.delete_jobs,
            connection_id,
            [Ok(job)],
        );
    }

    /// Script the responses of job lookups.
    pub async fn script_job<I>(&self, job_id: &str, responses: I)
    where
        I: IntoIterator<Item = ApiResult<Job>>,
    {
        push(&mut self.state.lock().await.jobs, job_id, responses);
    }

    /// Make the next call of `operation` fail with `err`.
    ///
    /// Operations are named after the calls recorded in [`MockPowerCloud::calls`],
    /// e.g. `update_instance` or `action:immediate-shutdown`.
    pub async fn fail_next(&self, operation: &str, err: ApiError) {
        self.state
            .lock()
            .await
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(err);
    }

    /// All calls made so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    /// Calls made so far that start with `prefix`.
    pub async fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InstanceApi for MockPowerCloud {
    async fn get_instance(&self, instance_id: &str) -> ApiResult<PvmInstance> {
        let mut state = self.state.lock().await;
        state.record(format!("get_instance:{}", instance_id));
        lookup(&mut state.instances, "pcloudPvminstancesGet", instance_id)
    }

    async fn update_instance(
        &self,
        instance_id: &str,
        _update: &InstanceUpdate,
    ) -> ApiResult<PvmInstance> {
        let mut state = self.state.lock().await;
        state.record(format!("update_instance:{}", instance_id));
        state.take_failure("update_instance")?;
        Ok(PvmInstance {
            pvm_instance_id: instance_id.to_string(),
            ..Default::default()
        })
    }

    async fn instance_action(&self, instance_id: &str, action: InstanceAction) -> ApiResult<()> {
        let operation = format!("action:{}", action.as_str());
        let mut state = self.state.lock().await;
        state.record(format!("{}:{}", operation, instance_id));
        state.take_failure(&operation)
    }

    async fn delete_instance(&self, instance_id: &str) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("delete_instance:{}", instance_id));
        state.take_failure("delete_instance")
    }
}

#[async_trait]
impl VolumeApi for MockPowerCloud {
    async fn get_volume(&self, volume_id: &str) -> ApiResult<Volume> {
        let mut state = self.state.lock().await;
        state.record(format!("get_volume:{}", volume_id));
        lookup(&mut state.volumes, "pcloudCloudinstancesVolumesGet", volume_id)
    }

    async fn delete_volume(&self, volume_id: &str) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("delete_volume:{}", volume_id));
        state.take_failure("delete_volume")
    }
}

#[async_trait]
impl ImageApi for MockPowerCloud {
    async fn get_image(&self, image_id: &str) -> ApiResult<Image> {
        let mut state = self.state.lock().await;
        state.record(format!("get_image:{}", image_id));
        lookup(&mut state.images, "pcloudCloudinstancesImagesGet", image_id)
    }
}

#[async_trait]
impl NetworkApi for MockPowerCloud {
    async fn get_network(&self, network_id: &str) -> ApiResult<Network> {
        let mut state = self.state.lock().await;
        state.record(format!("get_network:{}", network_id));
        lookup(&mut state.networks, "pcloudNetworksGet", network_id)
    }

    async fn get_port(&self, network_id: &str, port_id: &str) -> ApiResult<NetworkPort> {
        let key = format!("{}/{}", network_id, port_id);
        let mut state = self.state.lock().await;
        state.record(format!("get_port:{}", key));
        lookup(&mut state.ports, "pcloudNetworksPortsGet", &key)
    }
}

#[async_trait]
impl SnapshotApi for MockPowerCloud {
    async fn get_snapshot(&self, snapshot_id: &str) -> ApiResult<Snapshot> {
        let mut state = self.state.lock().await;
        state.record(format!("get_snapshot:{}", snapshot_id));
        lookup(&mut state.snapshots, "pcloudCloudinstancesSnapshotsGet", snapshot_id)
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> ApiResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("delete_snapshot:{}", snapshot_id));
        state.take_failure("delete_snapshot")
    }
}

#[async_trait]
impl SecurityGroupApi for MockPowerCloud {
    async fn get_security_group(&self, group_id: &str) -> ApiResult<SecurityGroup> {
        let mut state = self.state.lock().await;
        state.record(format!("get_security_group:{}", group_id));
        lookup(&mut state.security_groups, "v1NetworkSecurityGroupsGet", group_id)
    }
}

#[async_trait]
impl CloudConnectionApi for MockPowerCloud {
    async fn get_cloud_connection(&self, connection_id: &str) -> ApiResult<CloudConnection> {
        let mut state = self.state.lock().await;
        state.record(format!("get_cloud_connection:{}", connection_id));
        lookup(
            &mut state.cloud_connections,
            "pcloudCloudconnectionsGet",
            connection_id,
        )
    }

    async fn create_cloud_connection(
        &self,
        spec: &CloudConnectionSpec,
    ) -> ApiResult<CloudConnectionResponse> {
        let mut state = self.state.lock().await;
        state.record(format!("create_cloud_connection:{}", spec.name));
        match next(&mut state.connection_responses, "") {
            Some(response) => response,
            None => Ok(CloudConnectionResponse::Done(CloudConnection {
                cloud_connection_id: format!("cc-{}", spec.name),
                name: spec.name.clone(),
                speed: spec.speed,
            })),
        }
    }

    async fn update_cloud_connection(
        &self,
        connection_id: &str,
        update: &CloudConnectionUpdate,
    ) -> ApiResult<CloudConnectionResponse> {
        let mut state = self.state.lock().await;
        state.record(format!("update_cloud_connection:{}", connection_id));
        match next(&mut state.connection_responses, "") {
            Some(response) => response,
            None => Ok(CloudConnectionResponse::Done(CloudConnection {
                cloud_connection_id: connection_id.to_string(),
                name: update.name.clone().unwrap_or_default(),
                speed: update.speed.unwrap_or_default(),
            })),
        }
    }

    async fn delete_cloud_connection(
        &self,
        connection_id: &str,
    ) -> ApiResult<Option<JobReference>> {
        let mut state = self.state.lock().await;
        state.record(format!("delete_cloud_connection:{}", connection_id));
        state.take_failure("delete_cloud_connection")?;
        next(&mut state.delete_jobs, connection_id).unwrap_or(Ok(None))
    }
}

#[async_trait]
impl JobClient for MockPowerCloud {
    type Error = ApiError;

    async fn get_job(&self, job_id: &str) -> ApiResult<JobSnapshot> {
        let mut state = self.state.lock().await;
        state.record(format!("get_job:{}", job_id));
        lookup(&mut state.jobs, "pcloudCloudinstancesJobsGet", job_id).map(JobSnapshot::from)
    }
}
