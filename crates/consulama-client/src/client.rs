//! Custom resource provider API client
//!
//! Every action is a POST of a camelCase JSON body that carries at least the
//! resource group and subscription id, to
//! `{scope}/providers/Microsoft.CustomProviders/resourceProviders/public/{action}`.
//! Success statuses are 200 and 201.

use crate::action_trait::CustomActionClientTrait;
use crate::error::CustomActionError;
use crate::models::{
    ClusterResponse, ClusterUpdate, CreateFederationTokenResponse, CreateSnapshotResponse,
    CreateTokenResponse, FederationResponse, GetConfigResponse, GetOperationResponse,
    GetSnapshotResponse, ListUpgradeVersionsResponse, Operation, RenameSnapshotResponse,
    SnapshotProperties, UpdateClusterResponse, UpgradeVersion,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// API version of the custom resource provider.
const CUSTOM_ACTION_API_VERSION: &str = "2018-09-01-preview";

/// Header carrying the correlation id of a reconcile pass.
const CORRELATION_HEADER: &str = "x-ms-correlation-request-id";

/// Custom resource provider API client.
pub struct CustomActionClient {
    client: Client,
    base_url: String,
    subscription_id: String,
    token: String,
    correlation_id: String,
}

impl std::fmt::Debug for CustomActionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomActionClient")
            .field("base_url", &self.base_url)
            .field("subscription_id", &self.subscription_id)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

impl CustomActionClient {
    /// Create a new custom-action client.
    ///
    /// # Arguments
    /// * `base_url` - Resource Manager endpoint the action paths hang off
    /// * `subscription_id` - Subscription id sent in every action body
    /// * `token` - Bearer token for authentication
    /// * `correlation_id` - Correlation id attached to every request
    /// * `user_agent` - User agent to send with every request
    pub fn new(
        base_url: String,
        subscription_id: String,
        token: String,
        correlation_id: String,
        user_agent: &str,
    ) -> Result<Self, CustomActionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(user_agent)
            .build()
            .map_err(CustomActionError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            subscription_id,
            token,
            correlation_id,
        })
    }

    fn action_url(&self, managed_resource_group: &str, action: &str) -> String {
        format!(
            "{}/{}/providers/Microsoft.CustomProviders/resourceProviders/public/{}?api-version={}",
            self.base_url,
            managed_resource_group.trim_start_matches('/'),
            action,
            CUSTOM_ACTION_API_VERSION
        )
    }

    /// POST a custom action and decode the response.
    async fn custom_action<T: for<'de> serde::Deserialize<'de>>(
        &self,
        managed_resource_group: &str,
        action: &str,
        mut body: Value,
    ) -> Result<T, CustomActionError> {
        // Every action body carries the subscription id.
        if let Some(map) = body.as_object_mut() {
            map.insert("subscriptionId".to_string(), json!(self.subscription_id));
        }

        let url = self.action_url(managed_resource_group, action);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(CORRELATION_HEADER, &self.correlation_id)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(CustomActionError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CustomActionError::NotFound(format!(
                "custom action {} on {}",
                action, managed_resource_group
            )));
        }
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            return Err(CustomActionError::Api(format!(
                "custom action {} on {} failed: {} - {}",
                action, managed_resource_group, status, text
            )));
        }

        response.json::<T>().await.map_err(CustomActionError::Http)
    }
}

#[async_trait::async_trait]
impl CustomActionClientTrait for CustomActionClient {
    async fn create_root_token(
        &self,
        managed_resource_group: &str,
    ) -> Result<CreateTokenResponse, CustomActionError> {
        self.custom_action(
            managed_resource_group,
            "createToken",
            json!({ "resourceGroup": managed_resource_group }),
        )
        .await
    }

    async fn get_cluster(
        &self,
        managed_resource_group: &str,
        cluster_name: &str,
    ) -> Result<ClusterResponse, CustomActionError> {
        let url = format!(
            "{}/{}/providers/Microsoft.CustomProviders/resourceProviders/public/consulClusters/{}?api-version={}",
            self.base_url,
            managed_resource_group.trim_start_matches('/'),
            urlencoding::encode(cluster_name),
            CUSTOM_ACTION_API_VERSION
        );
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header(CORRELATION_HEADER, &self.correlation_id)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(CustomActionError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CustomActionError::NotFound(format!(
                "consul cluster {} in {}",
                cluster_name, managed_resource_group
            )));
        }
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            return Err(CustomActionError::Api(format!(
                "failed to fetch consul cluster {}: {} - {}",
                cluster_name, status, text
            )));
        }

        response
            .json::<ClusterResponse>()
            .await
            .map_err(CustomActionError::Http)
    }

    async fn create_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_name: &str,
    ) -> Result<CreateSnapshotResponse, CustomActionError> {
        self.custom_action(
            managed_resource_group,
            "createSnapshot",
            json!({ "resourceGroup": resource_group, "name": snapshot_name }),
        )
        .await
    }

    async fn get_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_id: &str,
    ) -> Result<SnapshotProperties, CustomActionError> {
        let response: GetSnapshotResponse = self
            .custom_action(
                managed_resource_group,
                "getSnapshot",
                json!({ "resourceGroup": resource_group, "snapshotId": snapshot_id }),
            )
            .await?;
        Ok(response.snapshot)
    }

    async fn delete_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_id: &str,
    ) -> Result<Option<Operation>, CustomActionError> {
        let response: crate::models::DeleteSnapshotResponse = self
            .custom_action(
                managed_resource_group,
                "deleteSnapshot",
                json!({ "resourceGroup": resource_group, "snapshotId": snapshot_id }),
            )
            .await?;
        Ok(response.operation)
    }

    async fn rename_snapshot(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        snapshot_id: &str,
        snapshot_name: &str,
    ) -> Result<RenameSnapshotResponse, CustomActionError> {
        self.custom_action(
            managed_resource_group,
            "renameSnapshot",
            json!({
                "resourceGroup": resource_group,
                "snapshotId": snapshot_id,
                "name": snapshot_name,
            }),
        )
        .await
    }

    async fn list_upgrade_versions(
        &self,
        managed_resource_group: &str,
    ) -> Result<Vec<UpgradeVersion>, CustomActionError> {
        let response: ListUpgradeVersionsResponse = self
            .custom_action(
                managed_resource_group,
                "listConsulUpgradeVersions",
                json!({ "resourceGroup": managed_resource_group }),
            )
            .await?;
        Ok(response.versions)
    }

    async fn update_cluster(
        &self,
        managed_resource_group: &str,
        update: &ClusterUpdate,
    ) -> Result<Option<Operation>, CustomActionError> {
        let response: UpdateClusterResponse = self
            .custom_action(
                managed_resource_group,
                "update",
                json!({
                    "resourceGroup": managed_resource_group,
                    "update": update,
                }),
            )
            .await?;
        Ok(response.operation)
    }

    async fn get_federation(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
    ) -> Result<FederationResponse, CustomActionError> {
        self.custom_action(
            managed_resource_group,
            "getFederation",
            json!({ "resourceGroup": resource_group }),
        )
        .await
    }

    async fn create_federation_token(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
    ) -> Result<CreateFederationTokenResponse, CustomActionError> {
        self.custom_action(
            managed_resource_group,
            "createFederationToken",
            json!({ "resourceGroup": resource_group }),
        )
        .await
    }

    async fn get_config(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
    ) -> Result<GetConfigResponse, CustomActionError> {
        self.custom_action(
            managed_resource_group,
            "config",
            json!({ "resourceGroup": resource_group }),
        )
        .await
    }

    async fn get_operation(
        &self,
        managed_resource_group: &str,
        resource_group: &str,
        operation_id: &str,
    ) -> Result<Operation, CustomActionError> {
        let response: GetOperationResponse = self
            .custom_action(
                managed_resource_group,
                "operation",
                json!({ "resourceGroup": resource_group, "operationId": operation_id }),
            )
            .await?;
        Ok(response.operation)
    }
}
