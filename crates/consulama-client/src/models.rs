//! Custom-action API data types
//!
//! The wire format is camelCase JSON; string-typed toggles come in two
//! flavors, `enabled`/`disabled` strings on the cluster properties and the
//! `TRUE`/`FALSE` [`AmaBoolean`] on audit logging.

use serde::{Deserialize, Serialize};

/// `restoredAt` value of a snapshot that has never been restored.
pub const NEVER_RESTORED: &str = "0001-01-01T00:00:00.000Z";

/// State of an asynchronous custom-action operation.
///
/// The state machine is deliberately coarse: PENDING -> RUNNING -> DONE with
/// no other transitions. Success or failure is determined by the presence of
/// an error once DONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    /// Not started yet.
    Pending,
    /// In progress.
    Running,
    /// Finished, successfully or not.
    Done,
}

/// Error attached to a finished operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationError {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message, if any.
    #[serde(default)]
    pub message: String,
}

/// An asynchronous operation tracked through the `operation` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation id to poll with.
    #[serde(default)]
    pub id: String,
    /// Current state.
    pub state: OperationState,
    /// Present exactly when the operation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

/// Response envelope of the `operation` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOperationResponse {
    /// The polled operation.
    pub operation: Operation,
}

/// String boolean used by the managed application wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmaBoolean {
    /// Wire `TRUE`.
    True,
    /// Wire `FALSE`.
    #[default]
    False,
}

impl AmaBoolean {
    /// Plain boolean view.
    pub fn as_bool(self) -> bool {
        self == AmaBoolean::True
    }
}

impl From<bool> for AmaBoolean {
    fn from(value: bool) -> Self {
        if value { AmaBoolean::True } else { AmaBoolean::False }
    }
}

/// A freshly minted cluster root (master) token.
///
/// The secret id is only ever observable in this response; no read surface
/// returns it again.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterToken {
    /// Accessor id of the token.
    #[serde(default)]
    pub accessor_id: String,
    /// Secret id of the token.
    #[serde(default)]
    pub secret_id: String,
}

/// Response of the `createToken` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenResponse {
    /// The minted root token.
    pub master_token: MasterToken,
}

/// Descriptive properties of a Consul cluster.
///
/// All fields are optional on the wire; string toggles hold
/// `enabled`/`disabled` except [`audit_logging_enabled`](Self::audit_logging_enabled)
/// which is an [`AmaBoolean`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterProperties {
    /// Contact email of the cluster owner.
    pub email: String,
    /// Cluster state as reported by the service.
    pub state: String,
    /// Number of Consul servers, as a string; `"1"` denotes development mode.
    pub consul_num_servers: String,
    /// Currently running Consul version.
    pub consul_current_version: String,
    /// Initially provisioned Consul version.
    pub consul_initial_version: String,
    /// Consul datacenter name.
    pub consul_datacenter: String,
    /// CIDR of the cluster virtual network.
    pub consul_vnet_cidr: String,
    /// Name of the cluster virtual network.
    pub vnet_name: String,
    /// Storage account the cluster persists to.
    pub storage_account_name: String,
    /// Blob container for cluster data.
    pub blob_container_name: String,
    /// Id of the owning managed application.
    pub managed_app_id: String,
    /// Resource group of the storage account.
    pub storage_account_resource_group: String,
    /// Whether automatic upgrades are enabled (`enabled`/`disabled`).
    pub consul_automatic_upgrades: String,
    /// Interval between automatic snapshots.
    pub consul_snapshot_interval: String,
    /// Retention window of automatic snapshots.
    pub consul_snapshot_retention: String,
    /// Base64 Consul client configuration file.
    pub consul_config_file: String,
    /// Base64 Consul CA file.
    pub consul_ca_file: String,
    /// Whether Consul Connect is enabled (`enabled`/`disabled`).
    pub consul_connect: String,
    /// Whether the external endpoint is enabled (`enabled`/`disabled`).
    pub consul_external_endpoint: String,
    /// External endpoint URL, when enabled.
    #[serde(rename = "consulExternalEndpointUrl")]
    pub consul_external_endpoint_url: String,
    /// Private endpoint URL.
    #[serde(rename = "consulPrivateEndpointUrl")]
    pub consul_private_endpoint_url: String,
    /// Globally unique cluster id.
    pub consul_cluster_id: String,
    /// Whether audit logging is enabled.
    pub audit_logging_enabled: AmaBoolean,
    /// Blob container URL audit logs are written to.
    #[serde(rename = "auditLogStorageContainerUrl")]
    pub audit_log_storage_container_url: String,
    /// Resource id of the managed identity of the cluster VMs.
    pub managed_identity: String,
    /// Federation token the cluster joined with, if any.
    pub federation_token: String,
    /// Region of the cluster.
    pub location: String,
}

/// Response of the `consulClusters/{name}` read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResponse {
    /// Cluster name.
    #[serde(default)]
    pub name: String,
    /// Descriptive properties.
    #[serde(default)]
    pub properties: ClusterProperties,
}

/// Properties of a Consul snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotProperties {
    /// Snapshot id.
    pub id: String,
    /// Snapshot name.
    pub name: String,
    /// Snapshot state as reported by the service.
    pub state: String,
    /// Size in bytes, a string on the wire.
    pub size: String,
    /// When the snapshot was requested.
    pub requested_at: String,
    /// When the snapshot finished.
    pub finished_at: String,
    /// When the snapshot was last restored; the [`NEVER_RESTORED`] sentinel
    /// when it never was.
    pub restored_at: String,
}

impl SnapshotProperties {
    /// True once the snapshot has been restored at least once.
    pub fn was_restored(&self) -> bool {
        !self.restored_at.is_empty() && self.restored_at != NEVER_RESTORED
    }
}

/// Response of the `createSnapshot` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotResponse {
    /// Operation tracking the snapshot creation.
    #[serde(default)]
    pub operation: Option<Operation>,
    /// Id of the snapshot being created.
    #[serde(default)]
    pub snapshot_id: String,
}

/// Response of the `getSnapshot` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSnapshotResponse {
    /// The snapshot.
    pub snapshot: SnapshotProperties,
}

/// Response of the `deleteSnapshot` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSnapshotResponse {
    /// Operation tracking the snapshot deletion.
    #[serde(default)]
    pub operation: Option<Operation>,
}

/// Response of the `renameSnapshot` action; the rename is synchronous.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameSnapshotResponse {
    /// The renamed snapshot.
    pub snapshot: SnapshotProperties,
}

/// One entry of the cluster-scoped upgrade-version list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeVersion {
    /// Consul version string.
    pub version: String,
    /// Availability status of the version.
    #[serde(default)]
    pub status: String,
}

/// Response of the `listConsulUpgradeVersions` action.
///
/// An empty list means the cluster is already on the latest version.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUpgradeVersionsResponse {
    /// Versions the cluster can upgrade to.
    #[serde(default)]
    pub versions: Vec<UpgradeVersion>,
}

/// Audit-logging portion of a cluster update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLoggingUpdate {
    /// Whether audit logging should be enabled.
    pub enabled: AmaBoolean,
    /// Blob container URL to write audit logs to.
    #[serde(rename = "storageContainerUrl")]
    pub storage_container_url: String,
}

/// Combined cluster update submitted to the `update` action.
///
/// Version upgrade and audit-logging change travel in the same request; a
/// field left unset is left untouched by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpdate {
    /// New Consul version, normalized, if upgrading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consul_version: Option<String>,
    /// Audit-logging change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_logging: Option<AuditLoggingUpdate>,
}

impl ClusterUpdate {
    /// True when the update carries no change at all.
    pub fn is_empty(&self) -> bool {
        self.consul_version.is_none() && self.audit_logging.is_none()
    }
}

/// Response of the `update` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterResponse {
    /// Operation tracking the update.
    #[serde(default)]
    pub operation: Option<Operation>,
}

/// One datacenter of a federation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    /// Managed application name of the cluster.
    pub name: String,
    /// Resource group the cluster lives in.
    pub resource_group: String,
}

/// Response of the `getFederation` action.
///
/// Both fields empty means the cluster is not federated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationResponse {
    /// Primary datacenter of the federation, if any.
    #[serde(default)]
    pub primary_datacenter: Option<Datacenter>,
    /// Secondary datacenters joined to the primary.
    #[serde(default)]
    pub secondary_datacenters: Vec<Datacenter>,
}

/// Response of the `createFederationToken` action.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFederationTokenResponse {
    /// Token a secondary presents to join the federation.
    #[serde(default)]
    pub federation_token: String,
}

/// Response of the `config` action.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetConfigResponse {
    /// Consul client configuration file (JSON).
    #[serde(default)]
    pub consul_config_file: String,
    /// Consul CA file (PEM).
    #[serde(default)]
    pub ca_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_states_deserialize_from_wire() {
        let op: Operation =
            serde_json::from_str(r#"{"id":"op-1","state":"PENDING"}"#).unwrap();
        assert_eq!(op.state, OperationState::Pending);
        assert!(op.error.is_none());

        let op: Operation = serde_json::from_str(
            r#"{"id":"op-1","state":"DONE","error":{"code":13,"message":"boom"}}"#,
        )
        .unwrap();
        assert_eq!(op.state, OperationState::Done);
        assert_eq!(op.error.unwrap().code, 13);
    }

    #[test]
    fn ama_boolean_round_trip() {
        assert_eq!(serde_json::to_string(&AmaBoolean::True).unwrap(), "\"TRUE\"");
        let b: AmaBoolean = serde_json::from_str("\"FALSE\"").unwrap();
        assert!(!b.as_bool());
        assert_eq!(AmaBoolean::from(true), AmaBoolean::True);
    }

    #[test]
    fn never_restored_sentinel_is_not_a_restore() {
        let snapshot = SnapshotProperties {
            restored_at: NEVER_RESTORED.to_string(),
            ..SnapshotProperties::default()
        };
        assert!(!snapshot.was_restored());

        let snapshot = SnapshotProperties {
            restored_at: "2021-06-01T12:00:00.000Z".to_string(),
            ..SnapshotProperties::default()
        };
        assert!(snapshot.was_restored());
    }

    #[test]
    fn cluster_update_serializes_only_set_fields() {
        let update = ClusterUpdate {
            consul_version: Some("v1.11.2".to_string()),
            audit_logging: None,
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["consulVersion"], "v1.11.2");
        assert!(value.get("auditLogging").is_none());

        assert!(ClusterUpdate::default().is_empty());
    }

    #[test]
    fn cluster_properties_tolerate_missing_fields() {
        let cluster: ClusterResponse =
            serde_json::from_str(r#"{"name":"dc1","properties":{"consulNumServers":"1"}}"#)
                .unwrap();
        assert_eq!(cluster.properties.consul_num_servers, "1");
        assert!(!cluster.properties.audit_logging_enabled.as_bool());
    }
}
