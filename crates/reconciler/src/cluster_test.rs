//! Unit tests for the cluster lifecycle, run against the in-memory clients.

use crate::cluster;
use crate::config::{
    ClusterConfig, ClusterMode, ClusterUpdateConfig, ReconcilerConfig, ReconcilerContext,
};
use crate::error::ReconcileError;
use arm_client::{MockManagedAppClient, TagUpdateOutcome, TagValue};
use consul_meta::{ConsulVersion, MockMetaClient, PlanDefaults, SupportedRegion, VersionStatus};
use consulama_client::{
    ClusterProperties, ClusterResponse, Datacenter, FederationResponse, MockCustomActionClient,
    UpgradeVersion,
};
use std::collections::BTreeMap;
use std::sync::Arc;

const SUBSCRIPTION: &str = "subscription-guid";

struct Harness {
    managed_app: MockManagedAppClient,
    custom_action: MockCustomActionClient,
    meta: MockMetaClient,
    ctx: ReconcilerContext,
}

fn harness() -> Harness {
    let managed_app = MockManagedAppClient::new(SUBSCRIPTION);
    let custom_action = MockCustomActionClient::new();
    let meta = MockMetaClient::new();
    let ctx = ReconcilerContext {
        managed_app: Arc::new(managed_app.clone()),
        custom_action: Arc::new(custom_action.clone()),
        meta: Arc::new(meta.clone()),
        config: ReconcilerConfig::new(
            SUBSCRIPTION,
            "api.example.com",
            "hcs-production",
            "consul-ama",
        ),
    };
    Harness {
        managed_app,
        custom_action,
        meta,
        ctx,
    }
}

fn region(short: &str) -> SupportedRegion {
    SupportedRegion {
        short_name: short.to_string(),
        friendly_name: short.to_string(),
    }
}

fn seed_catalogs(h: &Harness) {
    h.meta.set_versions(vec![
        ConsulVersion {
            version: "v1.10.4".to_string(),
            status: VersionStatus::Available,
        },
        ConsulVersion {
            version: "v1.11.2".to_string(),
            status: VersionStatus::Recommended,
        },
    ]);
    h.meta.set_plan_defaults(PlanDefaults {
        name: "on-demand-v2".to_string(),
        version: "0.0.1".to_string(),
        ama_api_version: "2018-09-01-preview".to_string(),
    });
    h.meta.set_regions(vec![region("westus2"), region("eastus")]);
}

/// Managed resource group id the reconciler derives for `rg`/`app` under the
/// test subscription.
fn managed_resource_group_id(resource_group: &str, app: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}-mrg-{}",
        SUBSCRIPTION, resource_group, app
    )
}

/// Seed the cluster and vnet the post-create observation reads.
fn seed_cluster(h: &Harness, resource_group: &str, app: &str) {
    let mrg_id = managed_resource_group_id(resource_group, app);
    let mrg_name = format!("{}-mrg-{}", resource_group, app);

    h.custom_action.add_cluster(
        &mrg_id,
        ClusterResponse {
            name: app.to_string(),
            properties: ClusterProperties {
                email: "ops@example.com".to_string(),
                state: "READY".to_string(),
                consul_num_servers: "3".to_string(),
                consul_current_version: "v1.11.2".to_string(),
                consul_datacenter: app.to_string(),
                consul_vnet_cidr: "172.25.16.0/24".to_string(),
                vnet_name: format!("{}-vnet", app),
                ..ClusterProperties::default()
            },
        },
    );
    h.managed_app
        .add_virtual_network(&mrg_name, &format!("{}-vnet", app));
}

#[tokio::test]
async fn create_provisions_and_mints_one_root_token() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    assert_eq!(h.custom_action.root_tokens_minted(), 1);
    assert_eq!(created.root_token.secret_id, "secret-1");
    assert_eq!(created.state.cluster_mode, ClusterMode::Production);
    assert_eq!(created.state.consul_version, "v1.11.2");
    assert_eq!(created.state.plan_name, "on-demand-v2");
    assert_eq!(created.state.resource_group_name, "rg");
    assert_eq!(created.state.vnet_name, "dc1-vnet");

    // The stored parameter bag carries the `{ "<name>": { "value": ... } }`
    // wire shape with the recommended version and the channel.
    let app = h.managed_app.application("rg", "dc1").unwrap();
    assert_eq!(app.location, "westus2");
    let params = app.properties.parameters.unwrap();
    assert_eq!(params["clusterMode"]["value"], "PRODUCTION");
    assert_eq!(params["initialConsulVersion"]["value"], "v1.11.2");
    assert_eq!(params["sourceChannel"]["value"], "consul-ama");
    assert_eq!(params["auditLoggingEnabled"]["value"], "disabled");
}

#[tokio::test]
async fn create_refuses_to_clobber_an_existing_cluster() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    cluster::create(&h.ctx, &config).await.unwrap();

    let err = cluster::create(&h.ctx, &config).await.unwrap_err();
    assert!(matches!(err, ReconcileError::AlreadyExists { .. }));
    // The failed second attempt must not have mutated anything.
    assert_eq!(h.custom_action.root_tokens_minted(), 1);
}

#[tokio::test]
async fn create_rejects_an_unsupported_region() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");

    let mut config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    config.location = Some("Central US".to_string());

    let err = cluster::create(&h.ctx, &config).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(_)));
    assert!(err.to_string().contains("unsupported location: centralus"));
}

#[tokio::test]
async fn region_check_fails_open_when_the_catalog_is_unreachable() {
    let h = harness();
    // No region catalog configured; versions and plan defaults only.
    h.meta.set_versions(vec![ConsulVersion {
        version: "v1.11.2".to_string(),
        status: VersionStatus::Recommended,
    }]);
    h.meta.set_plan_defaults(PlanDefaults {
        name: "on-demand-v2".to_string(),
        version: "0.0.1".to_string(),
        ama_api_version: "2018-09-01-preview".to_string(),
    });
    h.managed_app.add_resource_group("rg", "someregion");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    cluster::create(&h.ctx, &config).await.unwrap();
}

#[tokio::test]
async fn create_requires_an_audit_container_when_audit_logging_is_enabled() {
    let h = harness();

    let mut config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    config.audit_logging_enabled = true;

    let err = cluster::create(&h.ctx, &config).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(_)));
    assert!(err.to_string().contains("audit_log_storage_container_url"));
}

#[tokio::test]
async fn create_rejects_a_pinned_version_missing_from_the_catalog() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");

    let mut config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    config.min_consul_version = Some("1.9.0".to_string());

    let err = cluster::create(&h.ctx, &config).await.unwrap_err();
    assert!(err.to_string().contains("(v1.9.0) is unavailable"));
}

#[tokio::test]
async fn read_of_a_deleted_cluster_is_none() {
    let h = harness();

    let state = cluster::read(&h.ctx, "/subscriptions/s/resourceGroups/rg/gone", None)
        .await
        .unwrap();
    assert!(state.is_none());
}

#[tokio::test(start_paused = true)]
async fn update_upgrades_the_consul_version_through_one_operation() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    h.custom_action.set_upgrade_versions(vec![UpgradeVersion {
        version: "v1.12.0".to_string(),
        status: "AVAILABLE".to_string(),
    }]);
    let desired = ClusterUpdateConfig {
        min_consul_version: Some("1.12.0".to_string()),
        ..ClusterUpdateConfig::default()
    };

    let state = cluster::update(&h.ctx, &created.state.id, &desired)
        .await
        .unwrap();
    assert!(state.is_some());

    let calls = h.custom_action.update_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].consul_version.as_deref(), Some("v1.12.0"));
    assert!(calls[0].audit_logging.is_none());
}

#[tokio::test]
async fn update_reports_already_latest_when_no_upgrades_are_offered() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    // Upgrade list left empty.
    let desired = ClusterUpdateConfig {
        min_consul_version: Some("1.12.0".to_string()),
        ..ClusterUpdateConfig::default()
    };

    let err = cluster::update(&h.ctx, &created.state.id, &desired)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already be on the latest"));
    assert!(h.custom_action.update_calls().is_empty());
}

#[tokio::test]
async fn update_rejects_a_version_the_cluster_cannot_upgrade_to() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    h.custom_action.set_upgrade_versions(vec![UpgradeVersion {
        version: "v1.12.0".to_string(),
        status: "AVAILABLE".to_string(),
    }]);
    let desired = ClusterUpdateConfig {
        min_consul_version: Some("1.13.0".to_string()),
        ..ClusterUpdateConfig::default()
    };

    let err = cluster::update(&h.ctx, &created.state.id, &desired)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("(v1.13.0) is unavailable"));
    assert!(h.custom_action.update_calls().is_empty());
}

#[tokio::test]
async fn update_treats_an_accepted_tag_patch_as_success() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    h.managed_app.set_tag_outcome(TagUpdateOutcome::Accepted);
    let mut tags = BTreeMap::new();
    tags.insert("env".to_string(), TagValue::from("prod"));
    tags.insert("cost-center".to_string(), TagValue::from(42));
    let desired = ClusterUpdateConfig {
        tags: Some(tags),
        ..ClusterUpdateConfig::default()
    };

    cluster::update(&h.ctx, &created.state.id, &desired)
        .await
        .unwrap();

    let calls = h.managed_app.tag_update_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.get("env").map(String::as_str), Some("prod"));
    assert_eq!(calls[0].1.get("cost-center").map(String::as_str), Some("42"));
    // No version or audit change travels along.
    assert!(h.custom_action.update_calls().is_empty());
}

#[tokio::test]
async fn update_with_no_changes_touches_nothing() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    cluster::update(&h.ctx, &created.state.id, &ClusterUpdateConfig::default())
        .await
        .unwrap();

    assert!(h.custom_action.update_calls().is_empty());
    assert!(h.managed_app.tag_update_calls().is_empty());
}

#[tokio::test]
async fn delete_of_an_absent_cluster_is_a_success_without_side_effects() {
    let h = harness();

    cluster::delete(&h.ctx, "/subscriptions/s/resourceGroups/rg/gone", "rg")
        .await
        .unwrap();
    assert!(h.managed_app.deleted_ids().is_empty());
}

#[tokio::test]
async fn delete_refuses_a_federation_primary_with_secondaries() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    h.custom_action.set_federation(FederationResponse {
        primary_datacenter: Some(Datacenter {
            name: "dc1".to_string(),
            resource_group: "rg".to_string(),
        }),
        secondary_datacenters: vec![Datacenter {
            name: "dc2".to_string(),
            resource_group: "rg".to_string(),
        }],
    });

    let err = cluster::delete(&h.ctx, &created.state.id, "rg")
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::FederationInvariant { .. }));
    assert!(h.managed_app.deleted_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delete_waits_out_the_cooldown_after_the_resource_is_gone() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    let started = tokio::time::Instant::now();
    cluster::delete(&h.ctx, &created.state.id, "rg").await.unwrap();

    assert_eq!(h.managed_app.deleted_ids(), vec![created.state.id.clone()]);
    assert!(started.elapsed() >= h.ctx.config.delete_cooldown);
}

#[tokio::test]
async fn import_reads_a_cluster_through_its_composite_id() {
    let h = harness();
    seed_catalogs(&h);
    h.managed_app.add_resource_group("rg", "westus2");
    seed_cluster(&h, "rg", "dc1");

    let config = ClusterConfig::new("rg", "dc1", "ops@example.com", ClusterMode::Production);
    let created = cluster::create(&h.ctx, &config).await.unwrap();

    let imported = cluster::import(&h.ctx, &format!("{}:dc1", created.state.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(imported.0, created.state.id);
    assert_eq!(imported.1, "dc1");
    assert_eq!(imported.2.cluster_name, "dc1");
}

#[tokio::test]
async fn import_rejects_a_malformed_composite_id() {
    let h = harness();

    let err = cluster::import(&h.ctx, "missing-a-colon").await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidImportId(_)));
}
