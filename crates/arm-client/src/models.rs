//! Resource Manager data types

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Marketplace plan of a managed application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan name, e.g. `on-demand-v2`.
    pub name: String,
    /// Plan version.
    pub version: String,
    /// Marketplace product the plan belongs to.
    pub product: String,
    /// Marketplace publisher id.
    pub publisher: String,
}

/// Provisioning state of a Resource Manager resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ProvisioningState {
    /// Request accepted, provisioning not started.
    Accepted,
    /// Resource is being created.
    Creating,
    /// Resource is being updated.
    Updating,
    /// Resource is being deleted.
    Deleting,
    /// Terminal success.
    Succeeded,
    /// Terminal failure.
    Failed,
    /// Terminal cancellation.
    Canceled,
    /// Any state this client does not model.
    #[serde(other)]
    Other,
}

impl ProvisioningState {
    /// True for states that will not change without another mutation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProvisioningState::Succeeded | ProvisioningState::Failed | ProvisioningState::Canceled
        )
    }
}

/// Properties envelope of a managed application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationProperties {
    /// The managed scope under which the cluster's internal resources live.
    pub managed_resource_group_id: String,
    /// Creation-time parameter bag; write-only after create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    /// Current provisioning state reported by the control plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

/// A provisioned managed application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedApplication {
    /// Global resource id.
    #[serde(default)]
    pub id: String,
    /// Resource name.
    #[serde(default)]
    pub name: String,
    /// Deployment region.
    pub location: String,
    /// Application kind; always `MarketPlace` for this offering.
    #[serde(default)]
    pub kind: String,
    /// Marketplace plan.
    pub plan: Plan,
    /// Resource tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Properties envelope.
    pub properties: ApplicationProperties,
}

impl ManagedApplication {
    /// The managed scope of this application.
    pub fn managed_resource_group_id(&self) -> &str {
        &self.properties.managed_resource_group_id
    }
}

/// Request body for creating a managed application.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRequest {
    /// Deployment region.
    pub location: String,
    /// Application kind; `MarketPlace` for this offering.
    pub kind: String,
    /// Marketplace plan.
    pub plan: Plan,
    /// Resource tags, already stringified for the wire.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Properties envelope carrying the managed scope and the parameter bag.
    pub properties: ApplicationRequestProperties,
}

/// Properties envelope for [`ApplicationRequest`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRequestProperties {
    /// The managed scope to provision the cluster internals under.
    pub managed_resource_group_id: String,
    /// Typed creation parameters.
    pub parameters: ClusterParameters,
}

/// Creation parameters for a Consul cluster managed application.
///
/// Serialized as the `{ "<name>": { "value": ... } }` map the control plane
/// expects. Boolean toggles are carried as `enabled`/`disabled` strings on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterParameters {
    /// `DEVELOPMENT` or `PRODUCTION`.
    pub cluster_mode: String,
    /// Name of the cluster managed resource.
    pub cluster_name: String,
    /// Consul datacenter name.
    pub consul_datacenter: String,
    /// VNET CIDR range of the cluster.
    pub consul_vnet_cidr: String,
    /// Contact email of the primary cluster owner.
    pub email: String,
    /// Whether the Consul UI is exposed on an external endpoint.
    pub external_endpoint: bool,
    /// Consul version to provision.
    pub initial_consul_version: String,
    /// Channel (client) that originated the request.
    pub source_channel: String,
    /// Whether Consul audit logging is enabled.
    pub audit_logging_enabled: bool,
    /// Blob storage container URL audit logs are written to.
    pub audit_log_storage_container_url: String,
    /// Token for joining an existing federation, if any.
    pub federation_token: Option<String>,
}

#[derive(Serialize)]
struct ParamValue<T: Serialize> {
    value: T,
}

fn enabled_str(b: bool) -> &'static str {
    if b { "enabled" } else { "disabled" }
}

impl Serialize for ClusterParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 10 + usize::from(self.federation_token.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("clusterMode", &ParamValue { value: &self.cluster_mode })?;
        map.serialize_entry("clusterName", &ParamValue { value: &self.cluster_name })?;
        map.serialize_entry("consulDataCenter", &ParamValue { value: &self.consul_datacenter })?;
        map.serialize_entry("consulVnetCidr", &ParamValue { value: &self.consul_vnet_cidr })?;
        map.serialize_entry("email", &ParamValue { value: &self.email })?;
        map.serialize_entry(
            "externalEndpoint",
            &ParamValue { value: enabled_str(self.external_endpoint) },
        )?;
        map.serialize_entry(
            "initialConsulVersion",
            &ParamValue { value: &self.initial_consul_version },
        )?;
        map.serialize_entry("sourceChannel", &ParamValue { value: &self.source_channel })?;
        map.serialize_entry(
            "auditLoggingEnabled",
            &ParamValue { value: enabled_str(self.audit_logging_enabled) },
        )?;
        map.serialize_entry(
            "auditLogStorageContainerURL",
            &ParamValue { value: &self.audit_log_storage_container_url },
        )?;
        if let Some(token) = &self.federation_token {
            map.serialize_entry("federationToken", &ParamValue { value: token })?;
        }
        map.end()
    }
}

/// A managed-application tag value.
///
/// Tag values arrive from callers as either strings or integers; the wire
/// only carries strings, so the conversion is made explicit here instead of
/// being hidden behind a dynamically-typed map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// String tag value.
    String(String),
    /// Integer tag value, stringified on the wire.
    Int(i64),
}

impl TagValue {
    /// The wire form of the tag value.
    pub fn to_wire_string(&self) -> String {
        match self {
            TagValue::String(s) => s.clone(),
            TagValue::Int(i) => i.to_string(),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::String(value.to_string())
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Int(value)
    }
}

/// Outcome of a tag update.
///
/// The control plane acknowledges some tag patches with `202 Accepted`
/// instead of `200 OK`; both are successful outcomes and callers must treat
/// them as such rather than inferring failure from the response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagUpdateOutcome {
    /// The update was applied synchronously.
    Updated,
    /// The update was accepted and applies asynchronously.
    Accepted,
}

/// An Azure resource group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    /// Global resource id.
    pub id: String,
    /// Resource group name.
    pub name: String,
    /// Region of the resource group.
    pub location: String,
}

/// A virtual network belonging to a cluster's managed scope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    /// Global resource id.
    pub id: String,
    /// Network name.
    pub name: String,
}
