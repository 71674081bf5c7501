//! Azure Resource Manager API client
//!
//! Implements the Resource Manager REST surface for managed applications
//! (`Microsoft.Solutions/applications`), resource groups and virtual
//! networks. Every request carries a bearer token and a correlation id so
//! the control plane can tie the requests of one reconcile pass together.

use crate::arm_trait::ManagedAppClientTrait;
use crate::error::ArmError;
use crate::models::{
    ApplicationRequest, ManagedApplication, ResourceGroup, TagUpdateOutcome, VirtualNetwork,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Resource Manager endpoint.
pub const DEFAULT_BASE_URL: &str = "https://management.azure.com";

/// API version for `Microsoft.Solutions/applications` operations.
const APPLICATIONS_API_VERSION: &str = "2019-07-01";

/// API version for resource group reads.
const RESOURCE_GROUPS_API_VERSION: &str = "2020-06-01";

/// API version for virtual network reads.
const VIRTUAL_NETWORKS_API_VERSION: &str = "2020-05-01";

/// Header carrying the correlation id of a reconcile pass.
const CORRELATION_HEADER: &str = "x-ms-correlation-request-id";

/// Resource Manager API client.
pub struct ManagedAppClient {
    client: Client,
    base_url: String,
    subscription_id: String,
    token: String,
    correlation_id: String,
}

impl std::fmt::Debug for ManagedAppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedAppClient")
            .field("base_url", &self.base_url)
            .field("subscription_id", &self.subscription_id)
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

impl ManagedAppClient {
    /// Create a new Resource Manager client against the public endpoint.
    ///
    /// # Arguments
    /// * `subscription_id` - Subscription every resource path is scoped to
    /// * `token` - Bearer token for authentication
    /// * `correlation_id` - Correlation id attached to every request
    /// * `user_agent` - User agent to send with every request
    pub fn new(
        subscription_id: String,
        token: String,
        correlation_id: String,
        user_agent: &str,
    ) -> Result<Self, ArmError> {
        Self::with_base_url(
            DEFAULT_BASE_URL.to_string(),
            subscription_id,
            token,
            correlation_id,
            user_agent,
        )
    }

    /// Create a new Resource Manager client against a custom endpoint.
    pub fn with_base_url(
        base_url: String,
        subscription_id: String,
        token: String,
        correlation_id: String,
        user_agent: &str,
    ) -> Result<Self, ArmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(user_agent)
            .build()
            .map_err(ArmError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            subscription_id,
            token,
            correlation_id,
        })
    }

    fn application_url(&self, resource_group: &str, name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Solutions/applications/{}?api-version={}",
            self.base_url,
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(resource_group),
            urlencoding::encode(name),
            APPLICATIONS_API_VERSION
        )
    }

    /// Build a URL from a global resource id such as
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/...`.
    fn url_by_id(&self, id: &str, api_version: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.base_url,
            id.trim_start_matches('/'),
            api_version
        )
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(CORRELATION_HEADER, &self.correlation_id)
            .header("Accept", "application/json")
    }

    async fn get_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, ArmError> {
        debug!("GET {}", url);

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(ArmError::Http)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ArmError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArmError::Api(format!(
                "failed to fetch {}: {} - {}",
                what, status, body
            )));
        }

        response.json::<T>().await.map_err(ArmError::Http)
    }
}

#[async_trait::async_trait]
impl ManagedAppClientTrait for ManagedAppClient {
    async fn get_application(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ManagedApplication, ArmError> {
        let url = self.application_url(resource_group, name);
        self.get_json(&url, &format!("managed application {}/{}", resource_group, name))
            .await
    }

    async fn get_application_by_id(&self, id: &str) -> Result<ManagedApplication, ArmError> {
        let url = self.url_by_id(id, APPLICATIONS_API_VERSION);
        self.get_json(&url, &format!("managed application {}", id)).await
    }

    async fn create_application(
        &self,
        resource_group: &str,
        name: &str,
        request: &ApplicationRequest,
    ) -> Result<ManagedApplication, ArmError> {
        let url = self.application_url(resource_group, name);
        debug!("PUT {}", url);

        let response = self
            .request(Method::PUT, &url)
            .json(request)
            .send()
            .await
            .map_err(ArmError::Http)?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(ArmError::Api(format!(
                "failed to create managed application {}/{}: {} - {}",
                resource_group, name, status, body
            )));
        }

        response.json::<ManagedApplication>().await.map_err(ArmError::Http)
    }

    async fn wait_for_provisioning(
        &self,
        resource_group: &str,
        name: &str,
        interval: Duration,
    ) -> Result<ManagedApplication, ArmError> {
        loop {
            let app = self.get_application(resource_group, name).await?;
            match app.properties.provisioning_state {
                Some(state) if state.is_terminal() => {
                    if state == crate::models::ProvisioningState::Succeeded {
                        return Ok(app);
                    }
                    return Err(ArmError::Provisioning(format!(
                        "managed application {}/{} ended in state {:?}",
                        resource_group, name, state
                    )));
                }
                state => {
                    debug!(
                        "Managed application {}/{} provisioning state {:?}; polling again",
                        resource_group, name, state
                    );
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn update_tags_by_id(
        &self,
        id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<TagUpdateOutcome, ArmError> {
        let url = self.url_by_id(id, APPLICATIONS_API_VERSION);
        debug!("PATCH {}", url);

        let response = self
            .request(Method::PATCH, &url)
            .json(&json!({ "tags": tags }))
            .send()
            .await
            .map_err(ArmError::Http)?;

        match response.status() {
            StatusCode::OK => Ok(TagUpdateOutcome::Updated),
            StatusCode::ACCEPTED => {
                warn!("Tag update for {} accepted asynchronously", id);
                Ok(TagUpdateOutcome::Accepted)
            }
            StatusCode::NOT_FOUND => Err(ArmError::NotFound(format!("managed application {}", id))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ArmError::Api(format!(
                    "failed to update tags of {}: {} - {}",
                    id, status, body
                )))
            }
        }
    }

    async fn delete_application_by_id(&self, id: &str) -> Result<(), ArmError> {
        let url = self.url_by_id(id, APPLICATIONS_API_VERSION);
        debug!("DELETE {}", url);

        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(ArmError::Http)?;

        match response.status() {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ArmError::NotFound(format!("managed application {}", id))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ArmError::Api(format!(
                    "failed to delete {}: {} - {}",
                    id, status, body
                )))
            }
        }
    }

    async fn wait_for_deletion(&self, id: &str, interval: Duration) -> Result<(), ArmError> {
        loop {
            match self.get_application_by_id(id).await {
                Err(ArmError::NotFound(_)) => return Ok(()),
                Err(e) => return Err(e),
                Ok(app) => {
                    debug!(
                        "Managed application {} still present in state {:?}; polling again",
                        id, app.properties.provisioning_state
                    );
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, ArmError> {
        let url = format!(
            "{}/subscriptions/{}/resourceGroups/{}?api-version={}",
            self.base_url,
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(name),
            RESOURCE_GROUPS_API_VERSION
        );
        self.get_json(&url, &format!("resource group {}", name)).await
    }

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualNetwork, ArmError> {
        let url = format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}?api-version={}",
            self.base_url,
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(resource_group),
            urlencoding::encode(name),
            VIRTUAL_NETWORKS_API_VERSION
        );
        self.get_json(&url, &format!("virtual network {}/{}", resource_group, name))
            .await
    }
}
