//! Federation token lifecycle
//!
//! A federation token is minted against the intended primary cluster and
//! handed to secondaries at creation time. The service only validates
//! tokens when a secondary joins, so there is nothing to revoke: deletion
//! is dropping the token from tracked state.

use crate::config::ReconcilerContext;
use crate::error::ReconcileError;
use tracing::warn;

/// Mint a federation token against the named primary cluster.
pub async fn create(
    ctx: &ReconcilerContext,
    resource_group_name: &str,
    managed_app_name: &str,
) -> Result<String, ReconcileError> {
    let app = match ctx
        .managed_app
        .get_application(resource_group_name, managed_app_name)
        .await
    {
        Ok(app) => app,
        Err(e) if e.is_not_found() => {
            return Err(ReconcileError::Validation(format!(
                "cannot create a federation token: cluster (managed application {}) (resource group {}) not found",
                managed_app_name, resource_group_name
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let response = ctx
        .custom_action
        .create_federation_token(app.managed_resource_group_id(), resource_group_name)
        .await?;

    Ok(response.federation_token)
}

/// True while the primary cluster still exists. The token itself carries no
/// server-side state to observe.
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
                "No cluster found for federation token (managed application {}) (resource group {}); dropping",
                managed_app_name, resource_group_name
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Drop a federation token from tracked state. There is nothing to revoke
/// remotely, so this always succeeds.
pub async fn delete(
    _ctx: &ReconcilerContext,
    _resource_group_name: &str,
    _managed_app_name: &str,
) -> Result<(), ReconcileError> {
    Ok(())
}
