//! Cluster root token lifecycle
//!
//! The service holds exactly one root token per cluster; minting a new one
//! invalidates the previous one. Deleting a tracked token is therefore
//! implemented as minting a replacement and discarding it.

use crate::cluster::RootToken;
use crate::config::ReconcilerContext;
use crate::error::ReconcileError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, warn};

/// Mint a new root token for the cluster owned by the named managed
/// application. The previous root token stops working.
pub async fn create(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
) -> Result<RootToken, ReconcileError> {
    let app = match ctx
        .managed_app
        .get_application(resource_group_name, managed_app_name)
        .await
    {
        Ok(app) => app,
        Err(e) if e.is_not_found() => {
            return Err(ReconcileError::Validation(format!(
                "cannot create a root token: cluster (managed application {}) (resource group {}) not found",
                managed_app_name, resource_group_name
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let response = ctx
        .custom_action
        .create_root_token(app.managed_resource_group_id())
        .await?;

    Ok(RootToken {
        accessor_id: response.master_token.accessor_id,
        secret_id: response.master_token.secret_id,
    })
}

/// True while the owning cluster still exists. The token itself is not
/// observable after minting, so the cluster's presence is the only read.
pub async fn exists(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
) -> Result<bool, ReconcileError> {
    match ctx
        .managed_app
        .get_application(resource_group_name, managed_app_name)
        .await
    {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => {
            warn!(
                "No cluster found for root token (managed application {}) (resource group {}); dropping",
                managed_app_name, resource_group_name
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Invalidate the tracked root token by minting a replacement that is
/// immediately discarded. Absence of the cluster is success.
pub async fn delete(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
) -> Result<(), ReconcileError> {
    let app = match ctx
        .managed_app
        .get_application(resource_group_name, managed_app_name)
        .await
    {
        Ok(app) => app,
        Err(e) if e.is_not_found() => {
            warn!(
                "No cluster found for root token (managed application {}) (resource group {})",
                managed_app_name, resource_group_name
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        "Invalidating root token by rotation (managed application {}) (correlation id {})",
        managed_app_name, ctx.config.correlation_id
    );
    ctx.custom_action
        .create_root_token(app.managed_resource_group_id())
        .await?;

    Ok(())
}

/// Render the root token as a Kubernetes secret manifest suitable for
/// `consul-k8s` bootstrap-ACL injection.
pub fn kubernetes_secret(secret_id: &str, managed_app_name: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: {}-bootstrap-token\ntype: Opaque\ndata:\n  token: {}",
        managed_app_name.to_lowercase(),
        STANDARD.encode(secret_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kubernetes_secret_lowercases_name_and_encodes_token() {
        let manifest = kubernetes_secret("s3cr3t", "MyCluster");
        assert!(manifest.contains("name: mycluster-bootstrap-token"));
        assert!(manifest.contains(&format!("token: {}", STANDARD.encode("s3cr3t"))));
        assert!(manifest.starts_with("apiVersion: v1\nkind: Secret\n"));
    }
}
