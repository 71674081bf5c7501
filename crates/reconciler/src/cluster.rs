//! Cluster lifecycle reconciliation
//!
//! A cluster is a marketplace managed application whose managed resource
//! group hosts the Consul servers. Creation goes through the Resource
//! Manager and waits on the transport-level provisioning state; everything
//! that touches the running cluster afterwards goes through custom actions
//! and their explicit operation poller.

use crate::config::{ClusterConfig, ClusterMode, ClusterUpdateConfig, ReconcilerContext};
use crate::error::ReconcileError;
use crate::ids::{parse_import_id, parse_resource_group_name_from_id, parse_resource_name_from_id};
use crate::federation::is_primary_with_secondaries;
use arm_client::{
    ApplicationRequest, ApplicationRequestProperties, ClusterParameters, ManagedApplication, Plan,
    ResourceGroup, TagUpdateOutcome, VirtualNetwork,
};
use consul_meta::{is_valid_version, normalize_version, recommended_version, region_is_supported};
use consulama_client::{
    AmaBoolean, AuditLoggingUpdate, ClusterResponse, ClusterUpdate, CustomActionError,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Marketplace publisher of the Consul managed application offer.
const MARKETPLACE_PUBLISHER: &str = "hashicorp-4665790";

/// Application kind of marketplace managed applications.
const MANAGED_APP_KIND: &str = "MarketPlace";

/// Suffix of the virtual network inside the managed resource group.
const VNET_SUFFIX: &str = "-vnet";

/// Fully defaulted creation parameters, produced by
/// [`resolve_cluster_config`] before any mutation happens.
#[derive(Debug, Clone)]
pub struct ResolvedClusterConfig {
    /// Cluster name, defaulted to the managed application name.
    pub cluster_name: String,
    /// Consul datacenter, defaulted to the managed application name.
    pub datacenter: String,
    /// Deployment region, defaulted to the resource group's region.
    pub location: String,
    /// Managed resource group id the cluster internals live under.
    pub managed_resource_group_id: String,
    /// Marketplace plan to purchase.
    pub plan: Plan,
    /// Consul version to provision, normalized.
    pub consul_version: String,
}

/// Everything the read surface observes about a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterState {
    /// Managed application id the cluster is tracked by.
    pub id: String,
    /// Resource group of the managed application.
    pub resource_group_name: String,
    /// Managed application name.
    pub managed_app_name: String,
    /// Contact email of the cluster owner.
    pub email: String,
    /// Deployment mode, derived from the server count.
    pub cluster_mode: ClusterMode,
    /// Cluster name.
    pub cluster_name: String,
    /// CIDR of the cluster virtual network.
    pub vnet_cidr: String,
    /// Id of the cluster virtual network.
    pub vnet_id: String,
    /// Name of the cluster virtual network.
    pub vnet_name: String,
    /// Resource group of the cluster virtual network.
    pub vnet_resource_group_name: String,
    /// Currently running Consul version.
    pub consul_version: String,
    /// Consul datacenter name.
    pub consul_datacenter: String,
    /// Federation token the cluster joined with, if any.
    pub consul_federation_token: String,
    /// Whether the Consul UI is exposed externally.
    pub consul_external_endpoint: bool,
    /// Deployment region.
    pub location: String,
    /// Marketplace plan name.
    pub plan_name: String,
    /// Name of the managed resource group.
    pub managed_resource_group_name: String,
    /// Tags on the managed application.
    pub tags: BTreeMap<String, String>,
    /// Cluster state reported by the service.
    pub state: String,
    /// Storage account the cluster persists to.
    pub storage_account_name: String,
    /// Blob container for cluster data.
    pub blob_container_name: String,
    /// Managed application id reported on the cluster properties.
    pub managed_application_id: String,
    /// Resource group of the storage account.
    pub storage_account_resource_group: String,
    /// Whether automatic upgrades are enabled.
    pub consul_automatic_upgrades: bool,
    /// Interval between automatic snapshots.
    pub consul_snapshot_interval: String,
    /// Retention window of automatic snapshots.
    pub consul_snapshot_retention: String,
    /// Base64 Consul client configuration file.
    pub consul_config_file: String,
    /// Base64 Consul CA file.
    pub consul_ca_file: String,
    /// Whether Consul Connect is enabled.
    pub consul_connect: bool,
    /// External endpoint URL, when enabled.
    pub consul_external_endpoint_url: String,
    /// Private endpoint URL.
    pub consul_private_endpoint_url: String,
    /// Globally unique cluster id.
    pub consul_cluster_id: String,
    /// Whether audit logging is enabled.
    pub audit_logging_enabled: bool,
    /// Blob container URL audit logs are written to.
    pub audit_log_storage_container_url: String,
    /// Name of the managed identity of the cluster VMs.
    pub managed_identity_name: String,
}

/// The root token minted at cluster creation.
///
/// The secret id is only observable here; no read surface returns it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootToken {
    /// Accessor id of the token.
    pub accessor_id: String,
    /// Secret id of the token.
    pub secret_id: String,
}

/// Result of a successful cluster creation.
#[derive(Debug, Clone)]
pub struct CreatedCluster {
    /// The observed state after creation.
    pub state: ClusterState,
    /// The root token minted for the new cluster.
    pub root_token: RootToken,
}

/// Resolve the optional fields of a [`ClusterConfig`] in a single ordered
/// pass, validating against the catalogs as it goes.
///
/// The region check fails open: an unfetchable region catalog imposes no
/// restriction. An unfetchable version catalog is a hard error since a
/// version must be chosen.
pub async fn resolve_cluster_config(
    ctx: &ReconcilerContext,
    config: &ClusterConfig,
    resource_group: &ResourceGroup,
) -> Result<ResolvedClusterConfig, ReconcileError> {
    // Region, normalized the way the Resource Manager reports it.
    let location = match &config.location {
        Some(location) => location.to_lowercase().replace(' ', ""),
        None => resource_group.location.clone(),
    };

    match ctx.meta.supported_regions().await {
        Ok(regions) => {
            if !region_is_supported(&location, &regions) {
                return Err(ReconcileError::Validation(format!(
                    "unsupported location: {}; expected one of {:?}",
                    location,
                    regions.iter().map(|r| r.short_name.as_str()).collect::<Vec<_>>()
                )));
            }
        }
        Err(e) => {
            warn!("Unable to fetch supported regions, skipping region check: {}", e);
        }
    }

    // Consul version: the catalog's recommendation unless pinned.
    let available = ctx.meta.available_versions().await?;
    let consul_version = match &config.min_consul_version {
        Some(pinned) => normalize_version(pinned),
        None => recommended_version(&available)
            .ok_or_else(|| {
                ReconcileError::Validation("version catalog returned no versions".to_string())
            })?
            .to_string(),
    };
    if !is_valid_version(&consul_version, &available) {
        return Err(ReconcileError::Validation(format!(
            "specified Consul version ({}) is unavailable; must be one of: {:?}",
            consul_version,
            available.iter().map(|v| v.version.as_str()).collect::<Vec<_>>()
        )));
    }

    // Marketplace plan, defaulted from the catalog, name overridable.
    let plan_defaults = ctx.meta.plan_defaults().await?;
    let plan = Plan {
        name: config.plan_name.clone().unwrap_or(plan_defaults.name),
        version: plan_defaults.version,
        product: ctx.config.marketplace_product_name.clone(),
        publisher: MARKETPLACE_PUBLISHER.to_string(),
    };

    let managed_resource_group_id = match &config.managed_resource_group_name {
        Some(name) => format!(
            "/subscriptions/{}/resourceGroups/{}",
            ctx.config.subscription_id, name
        ),
        None => format!("{}-mrg-{}", resource_group.id, config.managed_app_name),
    };

    Ok(ResolvedClusterConfig {
        cluster_name: config
            .cluster_name
            .clone()
            .unwrap_or_else(|| config.managed_app_name.clone()),
        datacenter: config
            .consul_datacenter
            .clone()
            .unwrap_or_else(|| config.managed_app_name.clone()),
        location,
        managed_resource_group_id,
        plan,
        consul_version,
    })
}

/// Create a cluster.
///
/// Fails with [`ReconcileError::AlreadyExists`] when a managed application
/// of the same name is already present; a 404 from that probe is the good
/// case. The root token in the result is the only chance to observe its
/// secret id.
pub async fn create(
    ctx: &ReconcilerContext,
    config: &ClusterConfig,
) -> Result<CreatedCluster, ReconcileError> {
    let resource_group_name = &config.resource_group_name;
    let managed_app_name = &config.managed_app_name;

    match ctx
        .managed_app
        .get_application(resource_group_name, managed_app_name)
        .await
    {
        Ok(existing) => {
            return Err(ReconcileError::AlreadyExists { id: existing.id });
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    // Validate before mutating anything.
    let audit_log_storage_container_url = config
        .audit_log_storage_container_url
        .clone()
        .unwrap_or_default();
    if config.audit_logging_enabled && audit_log_storage_container_url.is_empty() {
        return Err(ReconcileError::Validation(
            "audit_log_storage_container_url must be set when audit logging is enabled".to_string(),
        ));
    }

    let resource_group = ctx.managed_app.get_resource_group(resource_group_name).await?;
    let resolved = resolve_cluster_config(ctx, config, &resource_group).await?;

    let parameters = ClusterParameters {
        cluster_mode: config.cluster_mode.as_parameter().to_string(),
        cluster_name: resolved.cluster_name.clone(),
        consul_datacenter: resolved.datacenter.clone(),
        consul_vnet_cidr: config.vnet_cidr.clone(),
        email: config.email.clone(),
        external_endpoint: config.external_endpoint,
        initial_consul_version: resolved.consul_version.clone(),
        source_channel: ctx.config.source_channel.clone(),
        audit_logging_enabled: config.audit_logging_enabled,
        audit_log_storage_container_url,
        federation_token: config.federation_token.clone(),
    };

    let request = ApplicationRequest {
        location: resolved.location.clone(),
        kind: MANAGED_APP_KIND.to_string(),
        plan: resolved.plan.clone(),
        tags: stringify_tags(&config.tags),
        properties: ApplicationRequestProperties {
            managed_resource_group_id: resolved.managed_resource_group_id.clone(),
            parameters,
        },
    };

    info!(
        "Creating cluster (managed application {}) (resource group {}) (correlation id {})",
        managed_app_name, resource_group_name, ctx.config.correlation_id
    );
    ctx.managed_app
        .create_application(resource_group_name, managed_app_name, &request)
        .await?;
    let app = ctx
        .managed_app
        .wait_for_provisioning(
            resource_group_name,
            managed_app_name,
            ctx.config.operation_poll_interval,
        )
        .await?;

    let token = ctx
        .custom_action
        .create_root_token(app.managed_resource_group_id())
        .await?;
    let root_token = RootToken {
        accessor_id: token.master_token.accessor_id,
        secret_id: token.master_token.secret_id,
    };

    let state = observe(ctx, &app, Some(&resolved.cluster_name)).await?;
    Ok(CreatedCluster { state, root_token })
}

/// Read the full observed state of a cluster by managed application id.
///
/// Returns `None` when the managed application is gone; that is the signal
/// to drop the cluster from tracked state. Failures of the dependent
/// cluster and network reads are errors, not absence.
pub async fn read(
    ctx: &ReconcilerContext,
    managed_app_id: &str,
    cluster_name: Option<&str>,
) -> Result<Option<ClusterState>, ReconcileError> {
    let app = match ctx.managed_app.get_application_by_id(managed_app_id).await {
        Ok(app) => app,
        Err(e) if e.is_not_found() => {
            warn!(
                "No cluster found for (managed application id {}) (correlation id {}); dropping",
                managed_app_id, ctx.config.correlation_id
            );
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Some(observe(ctx, &app, cluster_name).await?))
}

/// Apply desired changes to a cluster.
///
/// Version and audit-logging changes travel together through one custom
/// action with its own operation poll; tag changes go through the Resource
/// Manager, where a 202 Accepted counts as success. Returns the re-read
/// state, or `None` when the managed application is gone.
pub async fn update(
    ctx: &ReconcilerContext,
    managed_app_id: &str,
    desired: &ClusterUpdateConfig,
) -> Result<Option<ClusterState>, ReconcileError> {
    let app = match ctx.managed_app.get_application_by_id(managed_app_id).await {
        Ok(app) => app,
        Err(e) if e.is_not_found() => {
            warn!(
                "No cluster found for (managed application id {}) (correlation id {}); dropping",
                managed_app_id, ctx.config.correlation_id
            );
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let current = ctx
        .custom_action
        .get_cluster(app.managed_resource_group_id(), &app.name)
        .await?;

    let update = build_cluster_update(desired, &current)?;
    if !update.is_empty() {
        apply_cluster_update(ctx, &app, &update).await?;
    }

    if let Some(tags) = &desired.tags {
        let tags = stringify_tags(tags);
        if tags != app.tags {
            let outcome = ctx.managed_app.update_tags_by_id(&app.id, &tags).await?;
            if outcome == TagUpdateOutcome::Accepted {
                info!(
                    "Tag update accepted asynchronously (managed application id {})",
                    app.id
                );
            }
        }
    }

    read(ctx, managed_app_id, None).await
}

/// Delete a cluster by managed application id.
///
/// Absence is success. A federation primary that still has secondaries is
/// never deleted. After the deletion completes the full delete cool-down is
/// waited out so an immediate re-purchase of the offer is not rejected.
pub async fn delete(
    ctx: &ReconcilerContext,
    managed_app_id: &str,
    resource_group_name: &str,
) -> Result<(), ReconcileError> {
    let app = match ctx.managed_app.get_application_by_id(managed_app_id).await {
        Ok(app) => app,
        Err(e) if e.is_not_found() => {
            warn!(
                "No cluster found for (managed application id {}) (correlation id {})",
                managed_app_id, ctx.config.correlation_id
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // A failure here denotes the cluster is not part of a federation.
    match ctx
        .custom_action
        .get_federation(app.managed_resource_group_id(), resource_group_name)
        .await
    {
        Ok(federation) => {
            if is_primary_with_secondaries(&app.name, resource_group_name, &federation) {
                return Err(ReconcileError::FederationInvariant {
                    name: app.name,
                    resource_group: resource_group_name.to_string(),
                });
            }
        }
        Err(e) => {
            debug!("Cluster is not federated: {}", e);
        }
    }

    info!(
        "Deleting cluster (managed application id {}) (correlation id {})",
        managed_app_id, ctx.config.correlation_id
    );
    ctx.managed_app.delete_application_by_id(managed_app_id).await?;
    ctx.managed_app
        .wait_for_deletion(managed_app_id, ctx.config.operation_poll_interval)
        .await?;

    // The billing backend rejects an immediate re-purchase of a deleted
    // offer, so hold the completion back for the full cool-down.
    tokio::time::sleep(ctx.config.delete_cooldown).await;

    Ok(())
}

/// Import an untracked cluster from a `managed_application_id:cluster_name`
/// composite id, returning the id, the cluster name and a full read.
pub async fn import(
    ctx: &ReconcilerContext,
    composite_id: &str,
) -> Result<Option<(String, String, ClusterState)>, ReconcileError> {
    let (managed_app_id, cluster_name) = parse_import_id(composite_id)?;

    Ok(read(ctx, managed_app_id, Some(cluster_name))
        .await?
        .map(|state| (managed_app_id.to_string(), cluster_name.to_string(), state)))
}

/// Assemble the combined custom-action update from the desired changes and
/// the currently observed cluster.
fn build_cluster_update(
    desired: &ClusterUpdateConfig,
    current: &ClusterResponse,
) -> Result<ClusterUpdate, ReconcileError> {
    let mut update = ClusterUpdate::default();

    let current_enabled = current.properties.audit_logging_enabled.as_bool();
    let current_url = &current.properties.audit_log_storage_container_url;
    let desired_enabled = desired.audit_logging_enabled.unwrap_or(current_enabled);
    let desired_url = desired
        .audit_log_storage_container_url
        .clone()
        .unwrap_or_else(|| current_url.clone());

    if desired_enabled != current_enabled || desired_url != *current_url {
        if desired_enabled && desired_url.is_empty() {
            return Err(ReconcileError::Validation(
                "audit_log_storage_container_url must be set when audit logging is enabled"
                    .to_string(),
            ));
        }

        update.audit_logging = Some(AuditLoggingUpdate {
            enabled: AmaBoolean::from(desired_enabled),
            storage_container_url: desired_url,
        });
    }

    if let Some(version) = &desired.min_consul_version {
        let version = normalize_version(version);
        if version != current.properties.consul_current_version {
            update.consul_version = Some(version);
        }
    }

    Ok(update)
}

/// Run the combined update custom action and poll its operation.
///
/// A version change is validated against the cluster-scoped upgrade list
/// first; an empty list means the cluster already runs the latest version.
async fn apply_cluster_update(
    ctx: &ReconcilerContext,
    app: &ManagedApplication,
    update: &ClusterUpdate,
) -> Result<(), ReconcileError> {
    let managed_resource_group = app.managed_resource_group_id();

    if let Some(version) = &update.consul_version {
        let upgrade_versions = ctx
            .custom_action
            .list_upgrade_versions(managed_resource_group)
            .await?;

        if upgrade_versions.is_empty() {
            return Err(ReconcileError::Validation(
                "no upgrade versions of Consul are available for this cluster; you may already be on the latest supported Consul version"
                    .to_string(),
            ));
        }

        if !upgrade_versions.iter().any(|v| v.version == *version) {
            return Err(ReconcileError::Validation(format!(
                "specified Consul version ({}) is unavailable; must be one of: {:?}",
                version,
                upgrade_versions.iter().map(|v| v.version.as_str()).collect::<Vec<_>>()
            )));
        }
    }

    info!(
        "Updating cluster (managed application id {}) (consul version {:?}) (correlation id {})",
        app.id, update.consul_version, ctx.config.correlation_id
    );
    let operation = ctx
        .custom_action
        .update_cluster(managed_resource_group, update)
        .await?
        .ok_or_else(|| {
            CustomActionError::Api("update action returned no operation to poll".to_string())
        })?;

    let resource_group = parse_resource_group_name_from_id(&app.id)?;
    ctx.custom_action
        .poll_operation(
            managed_resource_group,
            &resource_group,
            &operation.id,
            ctx.config.operation_poll_interval,
        )
        .await?;

    Ok(())
}

/// Build the observed state from the managed application, the cluster
/// custom resource and the managed virtual network.
async fn observe(
    ctx: &ReconcilerContext,
    app: &ManagedApplication,
    cluster_name: Option<&str>,
) -> Result<ClusterState, ReconcileError> {
    let cluster_name = cluster_name.unwrap_or(&app.name);
    let managed_resource_group_id = app.managed_resource_group_id();

    let cluster = ctx
        .custom_action
        .get_cluster(managed_resource_group_id, cluster_name)
        .await?;
    let props = &cluster.properties;

    let managed_resource_group_name =
        parse_resource_group_name_from_id(managed_resource_group_id)?;

    // The vnet carries a '-vnet' suffix that is not always present on the
    // cluster properties.
    let vnet_name = format!(
        "{}{}",
        props.vnet_name.strip_suffix(VNET_SUFFIX).unwrap_or(&props.vnet_name),
        VNET_SUFFIX
    );
    let vnet: VirtualNetwork = ctx
        .managed_app
        .get_virtual_network(&managed_resource_group_name, &vnet_name)
        .await?;

    Ok(ClusterState {
        id: app.id.clone(),
        resource_group_name: parse_resource_group_name_from_id(&app.id)?,
        managed_app_name: app.name.clone(),
        email: props.email.clone(),
        cluster_mode: ClusterMode::from_num_servers(&props.consul_num_servers),
        cluster_name: cluster.name.clone(),
        vnet_cidr: props.consul_vnet_cidr.clone(),
        vnet_id: vnet.id,
        vnet_name: vnet.name,
        vnet_resource_group_name: managed_resource_group_name.clone(),
        consul_version: props.consul_current_version.clone(),
        consul_datacenter: props.consul_datacenter.clone(),
        consul_federation_token: props.federation_token.clone(),
        consul_external_endpoint: enabled(&props.consul_external_endpoint),
        location: props.location.clone(),
        plan_name: app.plan.name.clone(),
        managed_resource_group_name,
        tags: app.tags.clone(),
        state: props.state.clone(),
        storage_account_name: props.storage_account_name.clone(),
        blob_container_name: props.blob_container_name.clone(),
        managed_application_id: props.managed_app_id.clone(),
        storage_account_resource_group: props.storage_account_resource_group.clone(),
        consul_automatic_upgrades: enabled(&props.consul_automatic_upgrades),
        consul_snapshot_interval: props.consul_snapshot_interval.clone(),
        consul_snapshot_retention: props.consul_snapshot_retention.clone(),
        consul_config_file: props.consul_config_file.clone(),
        consul_ca_file: props.consul_ca_file.clone(),
        consul_connect: enabled(&props.consul_connect),
        consul_external_endpoint_url: props.consul_external_endpoint_url.clone(),
        consul_private_endpoint_url: props.consul_private_endpoint_url.clone(),
        consul_cluster_id: props.consul_cluster_id.clone(),
        audit_logging_enabled: props.audit_logging_enabled.as_bool(),
        audit_log_storage_container_url: props.audit_log_storage_container_url.clone(),
        managed_identity_name: parse_resource_name_from_id(&props.managed_identity).to_string(),
    })
}

fn enabled(value: &str) -> bool {
    value.eq_ignore_ascii_case("enabled")
}

fn stringify_tags(
    tags: &BTreeMap<String, arm_client::TagValue>,
) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(k, v)| (k.clone(), v.to_wire_string()))
        .collect()
}
