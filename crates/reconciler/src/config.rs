//! Reconciler configuration and context

use arm_client::{ManagedAppClientTrait, TagValue};
use consul_meta::MetaClientTrait;
use consulama_client::CustomActionClientTrait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Default CIDR of the cluster virtual network.
pub const DEFAULT_VNET_CIDR: &str = "172.25.16.0/24";

/// Default interval between polls of an asynchronous operation or a
/// provisioning state.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default cool-down observed after a cluster deletion completes. Deleting
/// and immediately re-purchasing the marketplace offer makes the billing
/// backend reject the purchase, so the reconciler waits this long before
/// reporting the delete done.
pub const DEFAULT_DELETE_COOLDOWN: Duration = Duration::from_secs(60);

/// Static configuration of a reconciler instance.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Azure subscription all resources live under.
    pub subscription_id: String,
    /// Domain of the version catalog service; used when wiring the catalog
    /// client.
    pub hcp_api_domain: String,
    /// Marketplace product the clusters are purchased from.
    pub marketplace_product_name: String,
    /// Channel identifier sent with every cluster creation.
    pub source_channel: String,
    /// Correlation id attached to every outgoing request of this instance.
    pub correlation_id: String,
    /// Interval between polls of asynchronous operations.
    pub operation_poll_interval: Duration,
    /// Cool-down observed after a completed cluster deletion.
    pub delete_cooldown: Duration,
}

impl ReconcilerConfig {
    /// Build a configuration with a fresh correlation id and default
    /// intervals.
    pub fn new(
        subscription_id: impl Into<String>,
        hcp_api_domain: impl Into<String>,
        marketplace_product_name: impl Into<String>,
        source_channel: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            hcp_api_domain: hcp_api_domain.into(),
            marketplace_product_name: marketplace_product_name.into(),
            source_channel: source_channel.into(),
            correlation_id: Uuid::new_v4().to_string(),
            operation_poll_interval: DEFAULT_POLL_INTERVAL,
            delete_cooldown: DEFAULT_DELETE_COOLDOWN,
        }
    }
}

/// Shared handles the reconciler operations run against.
#[derive(Clone)]
pub struct ReconcilerContext {
    /// Resource Manager client.
    pub managed_app: Arc<dyn ManagedAppClientTrait>,
    /// Custom-action client.
    pub custom_action: Arc<dyn CustomActionClientTrait>,
    /// Catalog metadata client.
    pub meta: Arc<dyn MetaClientTrait>,
    /// Static configuration.
    pub config: ReconcilerConfig,
}

impl std::fmt::Debug for ReconcilerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Deployment mode of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMode {
    /// Single server, no redundancy.
    Development,
    /// Multi-server quorum.
    Production,
}

impl ClusterMode {
    /// The creation-parameter form of the mode.
    pub fn as_parameter(self) -> &'static str {
        match self {
            ClusterMode::Development => "DEVELOPMENT",
            ClusterMode::Production => "PRODUCTION",
        }
    }

    /// Derive the mode from the reported server count. A single server
    /// denotes a development cluster.
    pub fn from_num_servers(num_servers: &str) -> Self {
        if num_servers == "1" {
            ClusterMode::Development
        } else {
            ClusterMode::Production
        }
    }
}

/// Desired configuration of a cluster to create.
///
/// Optional fields default during the resolution pass that precedes the
/// create; see [`crate::cluster::resolve_cluster_config`].
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Resource group to create the managed application in.
    pub resource_group_name: String,
    /// Name of the managed application.
    pub managed_app_name: String,
    /// Contact email of the cluster owner.
    pub email: String,
    /// Deployment mode.
    pub cluster_mode: ClusterMode,
    /// Cluster name; defaults to the managed application name.
    pub cluster_name: Option<String>,
    /// CIDR of the cluster virtual network.
    pub vnet_cidr: String,
    /// Consul version to pin; defaults to the recommended catalog version.
    pub min_consul_version: Option<String>,
    /// Consul datacenter name; defaults to the managed application name.
    pub consul_datacenter: Option<String>,
    /// Federation token to join an existing federation with.
    pub federation_token: Option<String>,
    /// Whether to expose the Consul UI on an external endpoint.
    pub external_endpoint: bool,
    /// Deployment region; defaults to the resource group's region.
    pub location: Option<String>,
    /// Marketplace plan name; defaults to the catalog plan default.
    pub plan_name: Option<String>,
    /// Managed resource group name; defaults to a name derived from the
    /// resource group id and the application name.
    pub managed_resource_group_name: Option<String>,
    /// Tags to place on the managed application.
    pub tags: BTreeMap<String, TagValue>,
    /// Whether Consul audit logging is enabled.
    pub audit_logging_enabled: bool,
    /// Blob container URL audit logs are written to; required when audit
    /// logging is enabled.
    pub audit_log_storage_container_url: Option<String>,
}

impl ClusterConfig {
    /// A configuration with every optional field left to default.
    pub fn new(
        resource_group_name: impl Into<String>,
        managed_app_name: impl Into<String>,
        email: impl Into<String>,
        cluster_mode: ClusterMode,
    ) -> Self {
        Self {
            resource_group_name: resource_group_name.into(),
            managed_app_name: managed_app_name.into(),
            email: email.into(),
            cluster_mode,
            cluster_name: None,
            vnet_cidr: DEFAULT_VNET_CIDR.to_string(),
            min_consul_version: None,
            consul_datacenter: None,
            federation_token: None,
            external_endpoint: false,
            location: None,
            plan_name: None,
            managed_resource_group_name: None,
            tags: BTreeMap::new(),
            audit_logging_enabled: false,
            audit_log_storage_container_url: None,
        }
    }
}

/// Desired changes to an existing cluster.
///
/// `None` leaves the corresponding aspect untouched.
#[derive(Debug, Clone, Default)]
pub struct ClusterUpdateConfig {
    /// New minimum Consul version to upgrade to.
    pub min_consul_version: Option<String>,
    /// New audit-logging toggle.
    pub audit_logging_enabled: Option<bool>,
    /// New audit-log container URL.
    pub audit_log_storage_container_url: Option<String>,
    /// Replacement tag set for the managed application.
    pub tags: Option<BTreeMap<String, TagValue>>,
}
