//! Consul snapshot lifecycle
//!
//! Snapshots live inside the owning cluster's managed scope. Creation and
//! deletion are asynchronous behind the operation poller; a rename applies
//! synchronously. A snapshot read can fail for two distinct reasons that
//! both mean "gone": the owning cluster was deleted, or the snapshot aged
//! out of the retention window.

use crate::config::ReconcilerContext;
use crate::error::ReconcileError;
use arm_client::ManagedApplication;
use consulama_client::{CustomActionError, SnapshotProperties};
use tracing::{info, warn};

/// Observed state of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Snapshot id.
    pub id: String,
    /// Snapshot name.
    pub name: String,
    /// Snapshot state as reported by the service.
    pub state: String,
    /// Size in bytes.
    pub size: u64,
    /// When the snapshot was requested.
    pub requested_at: String,
    /// When the snapshot finished.
    pub finished_at: String,
    /// When the snapshot was last restored; `None` when it never was.
    pub restored_at: Option<String>,
}

impl Snapshot {
    fn from_properties(props: SnapshotProperties) -> Result<Self, ReconcileError> {
        let size = if props.size.is_empty() {
            0
        } else {
            props.size.parse().map_err(|_| {
                ReconcileError::Validation(format!(
                    "snapshot {} reported a non-numeric size {:?}",
                    props.id, props.size
                ))
            })?
        };

        let restored_at = props.was_restored().then(|| props.restored_at.clone());

        Ok(Snapshot {
            id: props.id,
            name: props.name,
            state: props.state,
            size,
            requested_at: props.requested_at,
            finished_at: props.finished_at,
            restored_at,
        })
    }
}

async fn owning_application(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
) -> Result<Option<ManagedApplication>, ReconcileError> {
    match ctx
        .managed_app
        .get_application(resource_group_name, managed_app_name)
        .await
    {
        Ok(app) => Ok(Some(app)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create a named snapshot and wait for it to finish.
///
/// Returns `None` when the owning cluster no longer exists; the snapshot is
/// then orphaned and must be dropped from tracked state.
pub async fn create(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
    snapshot_name: &str,
) -> Result<Option<Snapshot>, ReconcileError> {
    let Some(app) = owning_application(ctx, resource_group_name, managed_app_name).await? else {
        warn!(
            "No cluster found for snapshot (managed application {}) (resource group {}); dropping",
            managed_app_name, resource_group_name
        );
        return Ok(None);
    };
    let managed_resource_group = app.managed_resource_group_id();

    info!(
        "Creating snapshot {} (managed application {}) (correlation id {})",
        snapshot_name, managed_app_name, ctx.config.correlation_id
    );
    let response = ctx
        .custom_action
        .create_snapshot(managed_resource_group, resource_group_name, snapshot_name)
        .await?;
    let operation = response.operation.ok_or_else(|| {
        CustomActionError::Api("createSnapshot returned no operation to poll".to_string())
    })?;

    ctx.custom_action
        .poll_operation(
            managed_resource_group,
            resource_group_name,
            &operation.id,
            ctx.config.operation_poll_interval,
        )
        .await?;

    let props = ctx
        .custom_action
        .get_snapshot(managed_resource_group, resource_group_name, &response.snapshot_id)
        .await?;

    Ok(Some(Snapshot::from_properties(props)?))
}

/// Read a snapshot by id.
///
/// Returns `None` when the owning cluster is gone or the snapshot itself is
/// gone, typically because it aged out of the retention window.
pub async fn read(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
    snapshot_id: &str,
) -> Result<Option<Snapshot>, ReconcileError> {
    let Some(app) = owning_application(ctx, resource_group_name, managed_app_name).await? else {
        warn!(
            "No cluster found for snapshot (managed application {}) (resource group {}); dropping",
            managed_app_name, resource_group_name
        );
        return Ok(None);
    };

    let props = match ctx
        .custom_action
        .get_snapshot(app.managed_resource_group_id(), resource_group_name, snapshot_id)
        .await
    {
        Ok(props) => props,
        Err(e) if e.is_not_found() => {
            warn!(
                "Snapshot {} not found, it may have exceeded its retention window; dropping",
                snapshot_id
            );
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Some(Snapshot::from_properties(props)?))
}

/// Rename a snapshot. The rename applies synchronously.
///
/// Returns `None` when the owning cluster is gone.
pub async fn rename(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
    snapshot_id: &str,
    snapshot_name: &str,
) -> Result<Option<Snapshot>, ReconcileError> {
    let Some(app) = owning_application(ctx, resource_group_name, managed_app_name).await? else {
        warn!(
            "No cluster found for snapshot (managed application {}) (resource group {}); dropping",
            managed_app_name, resource_group_name
        );
        return Ok(None);
    };

    let response = ctx
        .custom_action
        .rename_snapshot(
            app.managed_resource_group_id(),
            resource_group_name,
            snapshot_id,
            snapshot_name,
        )
        .await?;

    Ok(Some(Snapshot::from_properties(response.snapshot)?))
}

/// Delete a snapshot by id and wait for the deletion to finish.
///
/// Absence of the owning cluster or of the snapshot itself is success.
pub async fn delete(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
    snapshot_id: &str,
) -> Result<(), ReconcileError> {
    let Some(app) = owning_application(ctx, resource_group_name, managed_app_name).await? else {
        warn!(
            "No cluster found for snapshot (managed application {}) (resource group {})",
            managed_app_name, resource_group_name
        );
        return Ok(());
    };
    let managed_resource_group = app.managed_resource_group_id();

    let operation = match ctx
        .custom_action
        .delete_snapshot(managed_resource_group, resource_group_name, snapshot_id)
        .await
    {
        Ok(operation) => operation,
        Err(e) if e.is_not_found() => {
            warn!("Snapshot {} already gone", snapshot_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(operation) = operation {
        ctx.custom_action
            .poll_operation(
                managed_resource_group,
                resource_group_name,
                &operation.id,
                ctx.config.operation_poll_interval,
            )
            .await?;
    }

    Ok(())
}
