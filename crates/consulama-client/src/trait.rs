//! CustomActionClient trait for mocking
//!
//! Abstracts the custom resource provider actions so reconciler tests can
//! run against an in-memory implementation. The `managed_resource_group`
//! argument is always the managed resource group id of the owning
//! application, which scopes the action path.

use crate::error::CustomActionError;
use crate::models::{
    ClusterResponse, ClusterUpdate, CreateFederationTokenResponse, CreateSnapshotResponse,
    CreateTokenResponse, FederationResponse, GetConfigResponse, Operation, OperationState,
    RenameSnapshotResponse, SnapshotProperties, UpgradeVersion,
};
use std::time::Duration;
use tracing::debug;

/// Trait for custom resource provider actions.
#[async_trait::async_trait]
pub trait CustomActionClientTrait: Send + Sync {
    /// Mint a new cluster root token, invalidating the previous one.
    async fn create_root_token(
        &self,
        managed_resource_group: &str,
    ) -> Result<CreateTokenResponse, CustomActionError>;

    /// Fetch a Consul cluster by name.
    async fn get_cluster(
        &self,
        managed_resource_group: &str,
        cluster_name: &str,
    ) -> Result<ClusterResponse, CustomActionError>;

    /// Start creating a named snapshot.
    async fn create_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_name: &str,
    ) -> Result<CreateSnapshotResponse, CustomActionError>;

    /// Fetch a snapshot by id.
    async fn get_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_id: &str,
    ) -> Result<SnapshotProperties, CustomActionError>;

    /// Start deleting a snapshot by id.
    async fn delete_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_id: &str,
    ) -> Result<Option<Operation>, CustomActionError>;

    /// Rename a snapshot. Synchronous: the renamed snapshot is returned
    /// directly, there is no operation to poll.
    async fn rename_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_id: &str,
        snapshot_name: &str,
    ) -> Result<RenameSnapshotResponse, CustomActionError>;

    /// List the versions this cluster can upgrade to. Empty means the
    /// cluster already runs the latest version.
    async fn list_upgrade_versions(
        &self,
        managed_resource_group: &str,
    ) -> Result<Vec<UpgradeVersion>, CustomActionError>;

    /// Submit a combined version/audit-logging update.
    async fn update_cluster(
        &self,
        managed_resource_group: &str,
        update: &ClusterUpdate,
    ) -> Result<Option<Operation>, CustomActionError>;

    /// Fetch the federation view of the cluster in the given scope.
    async fn get_federation(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
    ) -> Result<FederationResponse, CustomActionError>;

    /// Mint a federation token for secondaries to join with.
    async fn create_federation_token(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
    ) -> Result<CreateFederationTokenResponse, CustomActionError>;

    /// Fetch the Consul client configuration and CA material.
    async fn get_config(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
    ) -> Result<GetConfigResponse, CustomActionError>;

    /// Fetch the current state of an asynchronous operation.
    async fn get_operation(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        operation_id: &str,
    ) -> Result<Operation, CustomActionError>;

    /// Poll an operation every `interval` until it reaches DONE.
    ///
    /// Returns Ok on a clean finish and `OperationFailed` when the finished
    /// operation carries an error. A fetch error aborts the wait and the
    /// caller retries the whole action. Callers bound the wait with a
    /// timeout; each sleep is the cancellation point.
    async fn poll_operation(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        operation_id: &str,
        interval: Duration,
    ) -> Result<(), CustomActionError> {
        loop {
            tokio::time::sleep(interval).await;

            let operation = self
                .get_operation(managed_resource_group, resource_group, operation_id)
                .await?;

            if operation.state != OperationState::Done {
                debug!(
                    "Operation {} in state {:?}; polling again",
                    operation_id, operation.state
                );
                continue;
            }

            return match operation.error {
                Some(error) => Err(CustomActionError::OperationFailed { code: error.code }),
                None => Ok(()),
            };
        }
    }
}
