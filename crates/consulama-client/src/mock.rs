//! Mock CustomActionClient for unit testing
//!
//! Keeps clusters, snapshots and federation state in memory. Operation
//! polling is scriptable: a test queues the states an operation id moves
//! through and `get_operation` serves them in order, holding the last one
//! once the script runs out. Mutating calls are recorded so tests can
//! assert which actions a reconcile pass invoked.

use crate::action_trait::CustomActionClientTrait;
use crate::error::CustomActionError;
use crate::models::{
    ClusterResponse, ClusterUpdate, CreateFederationTokenResponse, CreateSnapshotResponse,
    CreateTokenResponse, FederationResponse, GetConfigResponse, MasterToken, Operation,
    OperationState, RenameSnapshotResponse, SnapshotProperties, UpgradeVersion,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Mock custom-action client for testing.
#[derive(Debug, Clone, Default)]
pub struct MockCustomActionClient {
    clusters: Arc<Mutex<BTreeMap<(String, String), ClusterResponse>>>,
    snapshots: Arc<Mutex<BTreeMap<String, SnapshotProperties>>>,
    upgrade_versions: Arc<Mutex<Vec<UpgradeVersion>>>,
    federation: Arc<Mutex<FederationResponse>>,
    federation_token: Arc<Mutex<String>>,
    config: Arc<Mutex<GetConfigResponse>>,
    operations: Arc<Mutex<BTreeMap<String, VecDeque<Operation>>>>,
    update_calls: Arc<Mutex<Vec<ClusterUpdate>>>,
    root_tokens_minted: Arc<Mutex<u32>>,
    federation_tokens_minted: Arc<Mutex<u32>>,
    deleted_snapshots: Arc<Mutex<Vec<String>>>,
    counter: Arc<Mutex<u32>>,
}

impl MockCustomActionClient {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cluster under a managed resource group scope.
    pub fn add_cluster(&self, managed_resource_group: &str, cluster: ClusterResponse) {
        self.clusters
            .lock()
            .unwrap()
            .insert((managed_resource_group.to_string(), cluster.name.clone()), cluster);
    }

    /// Remove a seeded cluster.
    pub fn remove_cluster(&self, managed_resource_group: &str, cluster_name: &str) {
        self.clusters
            .lock()
            .unwrap()
            .remove(&(managed_resource_group.to_string(), cluster_name.to_string()));
    }

    /// Seed a snapshot directly (bypassing create).
    pub fn add_snapshot(&self, snapshot: SnapshotProperties) {
        self.snapshots.lock().unwrap().insert(snapshot.id.clone(), snapshot);
    }

    /// Snapshot of a stored snapshot, if present.
    pub fn snapshot(&self, snapshot_id: &str) -> Option<SnapshotProperties> {
        self.snapshots.lock().unwrap().get(snapshot_id).cloned()
    }

    /// Set the cluster-scoped upgrade-version list.
    pub fn set_upgrade_versions(&self, versions: Vec<UpgradeVersion>) {
        *self.upgrade_versions.lock().unwrap() = versions;
    }

    /// Set the federation view returned by `get_federation`.
    pub fn set_federation(&self, federation: FederationResponse) {
        *self.federation.lock().unwrap() = federation;
    }

    /// Set the token returned by `create_federation_token`.
    pub fn set_federation_token(&self, token: &str) {
        *self.federation_token.lock().unwrap() = token.to_string();
    }

    /// Set the response of `get_config`.
    pub fn set_config(&self, config: GetConfigResponse) {
        *self.config.lock().unwrap() = config;
    }

    /// Queue the states an operation id will move through. `get_operation`
    /// serves them in order and keeps answering the last one.
    pub fn script_operation(&self, operation_id: &str, states: Vec<Operation>) {
        self.operations
            .lock()
            .unwrap()
            .insert(operation_id.to_string(), states.into());
    }

    /// Cluster updates recorded by `update_cluster`, in call order.
    pub fn update_calls(&self) -> Vec<ClusterUpdate> {
        self.update_calls.lock().unwrap().clone()
    }

    /// Number of root tokens minted so far.
    pub fn root_tokens_minted(&self) -> u32 {
        *self.root_tokens_minted.lock().unwrap()
    }

    /// Number of federation tokens minted so far.
    pub fn federation_tokens_minted(&self) -> u32 {
        *self.federation_tokens_minted.lock().unwrap()
    }

    /// Snapshot ids passed to `delete_snapshot`, in call order.
    pub fn deleted_snapshots(&self) -> Vec<String> {
        self.deleted_snapshots.lock().unwrap().clone()
    }

    fn next_id(&self) -> u32 {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        *counter
    }

    /// A finished operation without error, used when nothing was scripted.
    fn done_operation(id: String) -> Operation {
        Operation {
            id,
            state: OperationState::Done,
            error: None,
        }
    }
}

#[async_trait::async_trait]
impl CustomActionClientTrait for MockCustomActionClient {
    async fn create_root_token(
        &self,
        _managed_resource_group: &str,
    ) -> Result<CreateTokenResponse, CustomActionError> {
        let mut minted = self.root_tokens_minted.lock().unwrap();
        *minted += 1;
        Ok(CreateTokenResponse {
            master_token: MasterToken {
                accessor_id: format!("accessor-{}", minted),
                secret_id: format!("secret-{}", minted),
            },
        })
    }

    async fn get_cluster(
        &self,
        managed_resource_group: &str,
        cluster_name: &str,
    ) -> Result<ClusterResponse, CustomActionError> {
        self.clusters
            .lock()
            .unwrap()
            .get(&(managed_resource_group.to_string(), cluster_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                CustomActionError::NotFound(format!(
                    "consul cluster {} in {}",
                    cluster_name, managed_resource_group
                ))
            })
    }

    async fn create_snapshot(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
        snapshot_name: &str,
    ) -> Result<CreateSnapshotResponse, CustomActionError> {
        let n = self.next_id();
        let snapshot_id = format!("snapshot-{}", n);
        self.snapshots.lock().unwrap().insert(
            snapshot_id.clone(),
            SnapshotProperties {
                id: snapshot_id.clone(),
                name: snapshot_name.to_string(),
                state: "READY".to_string(),
                size: "1024".to_string(),
                requested_at: "2021-06-01T12:00:00.000Z".to_string(),
                finished_at: "2021-06-01T12:01:00.000Z".to_string(),
                restored_at: crate::models::NEVER_RESTORED.to_string(),
            },
        );
        Ok(CreateSnapshotResponse {
            operation: Some(Self::done_operation(format!("op-{}", n))),
            snapshot_id,
        })
    }

    async fn get_snapshot(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
        snapshot_id: &str,
    ) -> Result<SnapshotProperties, CustomActionError> {
        self.snapshots
            .lock()
            .unwrap()
            .get(snapshot_id)
            .cloned()
            .ok_or_else(|| CustomActionError::NotFound(format!("snapshot {}", snapshot_id)))
    }

    async fn delete_snapshot(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
        snapshot_id: &str,
    ) -> Result<Option<Operation>, CustomActionError> {
        self.deleted_snapshots.lock().unwrap().push(snapshot_id.to_string());
        self.snapshots
            .lock()
            .unwrap()
            .remove(snapshot_id)
            .ok_or_else(|| CustomActionError::NotFound(format!("snapshot {}", snapshot_id)))?;
        Ok(Some(Self::done_operation(format!("op-{}", self.next_id()))))
    }

    async fn rename_snapshot(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
        snapshot_id: &str,
        snapshot_name: &str,
    ) -> Result<RenameSnapshotResponse, CustomActionError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let snapshot = snapshots
            .get_mut(snapshot_id)
            .ok_or_else(|| CustomActionError::NotFound(format!("snapshot {}", snapshot_id)))?;
        snapshot.name = snapshot_name.to_string();
        Ok(RenameSnapshotResponse {
            snapshot: snapshot.clone(),
        })
    }

    async fn list_upgrade_versions(
        &self,
        _managed_resource_group: &str,
    ) -> Result<Vec<UpgradeVersion>, CustomActionError> {
        Ok(self.upgrade_versions.lock().unwrap().clone())
    }

    async fn update_cluster(
        &self,
        _managed_resource_group: &str,
        update: &ClusterUpdate,
    ) -> Result<Option<Operation>, CustomActionError> {
        self.update_calls.lock().unwrap().push(update.clone());
        Ok(Some(Self::done_operation(format!("op-{}", self.next_id()))))
    }

    async fn get_federation(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
    ) -> Result<FederationResponse, CustomActionError> {
        Ok(self.federation.lock().unwrap().clone())
    }

    async fn create_federation_token(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
    ) -> Result<CreateFederationTokenResponse, CustomActionError> {
        *self.federation_tokens_minted.lock().unwrap() += 1;
        Ok(CreateFederationTokenResponse {
            federation_token: self.federation_token.lock().unwrap().clone(),
        })
    }

    async fn get_config(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
    ) -> Result<GetConfigResponse, CustomActionError> {
        let config = self.config.lock().unwrap();
        Ok(GetConfigResponse {
            consul_config_file: config.consul_config_file.clone(),
            ca_file: config.ca_file.clone(),
        })
    }

    async fn get_operation(
        &self,
        _managed_resource_group: &str,
        _resource_group: &str,
        operation_id: &str,
    ) -> Result<Operation, CustomActionError> {
        let mut operations = self.operations.lock().unwrap();
        match operations.get_mut(operation_id) {
            Some(queue) => {
                // Serve the script in order, holding the final state.
                if queue.len() > 1 {
                    Ok(queue.pop_front().unwrap())
                } else {
                    queue
                        .front()
                        .cloned()
                        .ok_or_else(|| {
                            CustomActionError::NotFound(format!("operation {}", operation_id))
                        })
                }
            }
            None => Ok(Self::done_operation(operation_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperationError;
    use std::time::Duration;

    fn op(id: &str, state: OperationState, error: Option<OperationError>) -> Operation {
        Operation {
            id: id.to_string(),
            state,
            error,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poll_operation_walks_the_scripted_states() {
        let mock = MockCustomActionClient::new();
        mock.script_operation(
            "op-1",
            vec![
                op("op-1", OperationState::Pending, None),
                op("op-1", OperationState::Running, None),
                op("op-1", OperationState::Done, None),
            ],
        );

        mock.poll_operation("mrg", "rg", "op-1", Duration::from_secs(10))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_operation_fails_when_done_carries_an_error() {
        let mock = MockCustomActionClient::new();
        mock.script_operation(
            "op-2",
            vec![
                op("op-2", OperationState::Running, None),
                op(
                    "op-2",
                    OperationState::Done,
                    Some(OperationError {
                        code: 13,
                        message: "upgrade failed".to_string(),
                    }),
                ),
            ],
        );

        let err = mock
            .poll_operation("mrg", "rg", "op-2", Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomActionError::OperationFailed { code: 13 }));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_operation_stops_at_the_callers_timeout() {
        let mock = MockCustomActionClient::new();
        // Never leaves RUNNING; only the caller's timeout can end the wait.
        mock.script_operation("op-3", vec![op("op-3", OperationState::Running, None)]);

        let started = tokio::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(3),
            mock.poll_operation("mrg", "rg", "op-3", Duration::from_secs(10)),
        )
        .await;

        assert!(result.is_err());
        // The wait ends at the timeout deadline, not at the next poll tick.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }
}
