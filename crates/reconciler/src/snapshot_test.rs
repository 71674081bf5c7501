//! Unit tests for the snapshot lifecycle, run against the in-memory
//! clients.

use crate::config::{ReconcilerConfig, ReconcilerContext};
use crate::snapshot;
use arm_client::{
    ApplicationProperties, ManagedApplication, MockManagedAppClient, Plan, ProvisioningState,
};
use consul_meta::MockMetaClient;
use consulama_client::{MockCustomActionClient, SnapshotProperties, NEVER_RESTORED};
use std::collections::BTreeMap;
use std::sync::Arc;

const SUBSCRIPTION: &str = "subscription-guid";

struct Harness {
    managed_app: MockManagedAppClient,
    custom_action: MockCustomActionClient,
    ctx: ReconcilerContext,
}

fn harness() -> Harness {
    let managed_app = MockManagedAppClient::new(SUBSCRIPTION);
    let custom_action = MockCustomActionClient::new();
    let ctx = ReconcilerContext {
        managed_app: Arc::new(managed_app.clone()),
        custom_action: Arc::new(custom_action.clone()),
        meta: Arc::new(MockMetaClient::new()),
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
        ctx,
    }
}

fn seed_application(h: &Harness, resource_group: &str, name: &str) {
    let id = h.managed_app.application_id(resource_group, name);
    h.managed_app.insert_application(ManagedApplication {
        id,
        name: name.to_string(),
        location: "westus2".to_string(),
        kind: "MarketPlace".to_string(),
        plan: Plan {
            name: "on-demand-v2".to_string(),
            version: "0.0.1".to_string(),
            product: "hcs-production".to_string(),
            publisher: "hashicorp-4665790".to_string(),
        },
        tags: BTreeMap::new(),
        properties: ApplicationProperties {
            managed_resource_group_id: format!(
                "/subscriptions/{}/resourceGroups/{}-mrg-{}",
                SUBSCRIPTION, resource_group, name
            ),
            parameters: None,
            provisioning_state: Some(ProvisioningState::Succeeded),
        },
    });
}

#[tokio::test(start_paused = true)]
async fn create_polls_the_operation_and_returns_the_snapshot() {
    let h = harness();
    seed_application(&h, "rg", "dc1");

    let snapshot = snapshot::create(&h.ctx, "rg", "dc1", "nightly")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.name, "nightly");
    assert_eq!(snapshot.size, 1024);
    assert!(snapshot.restored_at.is_none());
}

#[tokio::test]
async fn create_without_an_owning_cluster_is_orphaned() {
    let h = harness();

    let snapshot = snapshot::create(&h.ctx, "rg", "dc1", "nightly").await.unwrap();
    assert!(snapshot.is_none());
}

#[tokio::test]
async fn read_maps_the_restore_sentinel_to_none() {
    let h = harness();
    seed_application(&h, "rg", "dc1");
    h.custom_action.add_snapshot(SnapshotProperties {
        id: "snap-1".to_string(),
        name: "nightly".to_string(),
        state: "READY".to_string(),
        size: "2048".to_string(),
        requested_at: "2021-06-01T12:00:00.000Z".to_string(),
        finished_at: "2021-06-01T12:01:00.000Z".to_string(),
        restored_at: NEVER_RESTORED.to_string(),
    });

    let snapshot = snapshot::read(&h.ctx, "rg", "dc1", "snap-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.size, 2048);
    assert!(snapshot.restored_at.is_none());
}

#[tokio::test]
async fn read_of_an_expired_snapshot_is_none() {
    let h = harness();
    seed_application(&h, "rg", "dc1");

    let snapshot = snapshot::read(&h.ctx, "rg", "dc1", "aged-out").await.unwrap();
    assert!(snapshot.is_none());
}

#[tokio::test]
async fn rename_applies_synchronously() {
    let h = harness();
    seed_application(&h, "rg", "dc1");
    h.custom_action.add_snapshot(SnapshotProperties {
        id: "snap-1".to_string(),
        name: "nightly".to_string(),
        state: "READY".to_string(),
        size: "2048".to_string(),
        requested_at: "2021-06-01T12:00:00.000Z".to_string(),
        finished_at: "2021-06-01T12:01:00.000Z".to_string(),
        restored_at: NEVER_RESTORED.to_string(),
    });

    let snapshot = snapshot::rename(&h.ctx, "rg", "dc1", "snap-1", "pre-upgrade")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.name, "pre-upgrade");
    assert_eq!(
        h.custom_action.snapshot("snap-1").unwrap().name,
        "pre-upgrade"
    );
}

#[tokio::test(start_paused = true)]
async fn delete_is_idempotent() {
    let h = harness();
    seed_application(&h, "rg", "dc1");
    h.custom_action.add_snapshot(SnapshotProperties {
        id: "snap-1".to_string(),
        name: "nightly".to_string(),
        state: "READY".to_string(),
        size: "2048".to_string(),
        requested_at: "2021-06-01T12:00:00.000Z".to_string(),
        finished_at: "2021-06-01T12:01:00.000Z".to_string(),
        restored_at: NEVER_RESTORED.to_string(),
    });

    snapshot::delete(&h.ctx, "rg", "dc1", "snap-1").await.unwrap();
    assert!(h.custom_action.snapshot("snap-1").is_none());

    // Second delete finds the snapshot gone and still succeeds.
    snapshot::delete(&h.ctx, "rg", "dc1", "snap-1").await.unwrap();

    // A missing owner is also a successful delete.
    snapshot::delete(&h.ctx, "rg", "other", "snap-1").await.unwrap();
}
