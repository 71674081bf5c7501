//! Consul agent configuration for external clients
//!
//! The `config` action returns the Consul client configuration file and the
//! cluster CA. The pieces Kubernetes-hosted agents need (gossip key, CA
//! cert, datacenter, retry-join addresses) are extracted here and rendered
//! as a secret manifest for the `consul-k8s` Helm chart.

use crate::config::ReconcilerContext;
use crate::error::ReconcileError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::warn;

/// The subset of the Consul client configuration file the agent setup
/// consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsulAgentConfig {
    /// Gossip encryption key.
    #[serde(default, rename = "encrypt")]
    pub gossip_key: String,
    /// Datacenter the agents join.
    #[serde(default)]
    pub datacenter: String,
    /// Server addresses agents retry joining.
    #[serde(default)]
    pub retry_join: Vec<String>,
}

/// Fetch and parse the agent-relevant slice of the cluster's Consul
/// configuration, along with the cluster CA (PEM).
pub async fn fetch(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
) -> Result<(ConsulAgentConfig, String), ReconcileError> {
    let app = match ctx
        .managed_app
        .get_application(resource_group_name, managed_app_name)
        .await
    {
        Ok(app) => app,
        Err(e) if e.is_not_found() => {
            warn!(
                "No cluster found for agent config (managed application {}) (resource group {})",
                managed_app_name, resource_group_name
            );
            return Err(ReconcileError::Validation(format!(
                "cannot fetch agent config: cluster (managed application {}) (resource group {}) not found",
                managed_app_name, resource_group_name
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let response = ctx
        .custom_action
        .get_config(app.managed_resource_group_id(), resource_group_name)
        .await?;

    let config: ConsulAgentConfig =
        serde_json::from_str(&response.consul_config_file).map_err(|e| {
            ReconcileError::Validation(format!("unable to parse Consul config file: {}", e))
        })?;

    Ok((config, response.ca_file))
}

/// Render the agent gossip key and CA as a Kubernetes secret manifest for
/// the `consul-k8s` Helm chart.
pub async fn kubernetes_secret(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
) -> Result<String, ReconcileError> {
    let (config, ca_file) = fetch(ctx, resource_group_name, managed_app_name).await?;

    Ok(render_kubernetes_secret(
        managed_app_name,
        &config.gossip_key,
        &ca_file,
    ))
}

fn render_kubernetes_secret(managed_app_name: &str, gossip_key: &str, ca_file: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: {}-hcs\ntype: Opaque\ndata:\n  gossipEncryptionKey: {}\n  caCert: {}",
        managed_app_name.to_lowercase(),
        STANDARD.encode(gossip_key),
        STANDARD.encode(ca_file)
    )
}

/// Render `consul-k8s` Helm values wiring AKS-hosted agents to the cluster.
///
/// The bootstrap-token and gossip/CA secret names match the manifests
/// rendered by [`kubernetes_secret`] and
/// [`crate::root_token::kubernetes_secret`]. `aks_fqdn` is the API server
/// host of the consuming AKS cluster.
pub async fn helm_config(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
    aks_fqdn: &str,
    expose_gossip_ports: bool,
) -> Result<String, ReconcileError> {
    let (config, _ca_file) = fetch(ctx, resource_group_name, managed_app_name).await?;

    Ok(render_helm_config(
        managed_app_name,
        &config,
        aks_fqdn,
        expose_gossip_ports,
    ))
}

fn render_helm_config(
    managed_app_name: &str,
    config: &ConsulAgentConfig,
    aks_fqdn: &str,
    expose_gossip_ports: bool,
) -> String {
    let lower = managed_app_name.to_lowercase();
    // Single-quoted bracketed list, the format the service CLI emits.
    let retry_join = format!(
        "[{}]",
        config
            .retry_join
            .iter()
            .map(|host| format!("'{}'", host))
            .collect::<Vec<_>>()
            .join(" ")
    );

    format!(
        "global:
  enabled: false
  name: consul
  datacenter: {datacenter}
  acls:
    manageSystemACLs: true
    bootstrapToken:
      secretName: {lower}-bootstrap-token
      secretKey: token
  gossipEncryption:
    secretName: {lower}-hcs
    secretKey: gossipEncryptionKey
  tls:
    enabled: true
    enableAutoEncrypt: true
    caCert:
      secretName: {lower}-hcs
      secretKey: caCert
externalServers:
  enabled: true
  hosts: {retry_join}
  httpsPort: 443
  useSystemRoots: true
  k8sAuthMethodHost: https://{aks_fqdn}:443
client:
  enabled: true
  exposeGossipPorts: {expose_gossip_ports}
  join: {retry_join}
connectInject:
  enabled: true",
        datacenter = config.datacenter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_config_parses_consul_config_file() {
        let raw = r#"{
            "encrypt": "gossip-key==",
            "datacenter": "dc1",
            "retry_join": ["10.0.0.4", "10.0.0.5"],
            "verify_incoming": true
        }"#;
        let config: ConsulAgentConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.gossip_key, "gossip-key==");
        assert_eq!(config.datacenter, "dc1");
        assert_eq!(config.retry_join.len(), 2);
    }

    #[test]
    fn kubernetes_secret_encodes_key_and_ca() {
        let manifest = render_kubernetes_secret("MyCluster", "key==", "PEM");
        assert!(manifest.contains("name: mycluster-hcs"));
        assert!(manifest.contains(&format!("gossipEncryptionKey: {}", STANDARD.encode("key=="))));
        assert!(manifest.contains(&format!("caCert: {}", STANDARD.encode("PEM"))));
    }

    #[test]
    fn helm_config_wires_secrets_hosts_and_auth_method() {
        let config = ConsulAgentConfig {
            gossip_key: "key==".to_string(),
            datacenter: "dc1".to_string(),
            retry_join: vec!["10.0.0.4".to_string(), "10.0.0.5".to_string()],
        };

        let values = render_helm_config("MyCluster", &config, "aks.example.com", true);

        assert!(values.contains("datacenter: dc1"));
        // Secret names line up with the rendered secret manifests.
        assert!(values.contains("secretName: mycluster-bootstrap-token"));
        assert!(values.contains("secretName: mycluster-hcs"));
        assert!(values.contains("hosts: ['10.0.0.4' '10.0.0.5']"));
        assert!(values.contains("join: ['10.0.0.4' '10.0.0.5']"));
        assert!(values.contains("k8sAuthMethodHost: https://aks.example.com:443"));
        assert!(values.contains("exposeGossipPorts: true"));
        assert!(values.starts_with("global:\n  enabled: false"));
    }
}
