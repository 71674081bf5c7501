//! Catalog metadata client
//!
//! Two independent sources back this client: the version catalog service
//! (`{domain}/consul/{api-version}/versions`) and the static metadata
//! repository that serves the supported-region list and the marketplace plan
//! defaults as flat JSON documents.

use crate::error::MetaError;
use crate::meta_trait::MetaClientTrait;
use crate::models::{
    AvailableVersionsResponse, ConsulVersion, PlanDefaults, SupportedRegion,
    SupportedRegionsResponse,
};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Version of the catalog API used to retrieve Consul versions.
const VERSION_CATALOG_API_VERSION: &str = "2021-02-04";

/// Platform type passed to the version catalog to scope the version list to
/// the managed-application offering.
const PLATFORM_TYPE: &str = "HCS";

/// Default URL prefix for the static metadata repository.
pub const DEFAULT_META_URL: &str =
    "https://raw.githubusercontent.com/hashicorp/cloud-hcs-meta/master";

/// Catalog metadata client.
pub struct MetaClient {
    client: Client,
    api_domain: String,
    meta_url: String,
}

impl std::fmt::Debug for MetaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaClient")
            .field("api_domain", &self.api_domain)
            .field("meta_url", &self.meta_url)
            .finish_non_exhaustive()
    }
}

impl MetaClient {
    /// Create a new metadata client.
    ///
    /// # Arguments
    /// * `api_domain` - Domain of the version catalog service (scheme and
    ///   trailing slash are stripped if present)
    /// * `user_agent` - User agent to send with every catalog request
    pub fn new(api_domain: &str, user_agent: &str) -> Result<Self, MetaError> {
        Self::with_meta_url(api_domain, user_agent, DEFAULT_META_URL)
    }

    /// Create a new metadata client against a custom metadata repository URL.
    pub fn with_meta_url(
        api_domain: &str,
        user_agent: &str,
        meta_url: &str,
    ) -> Result<Self, MetaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .map_err(MetaError::Http)?;

        let api_domain = api_domain
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            api_domain,
            meta_url: meta_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> serde::Deserialize<'de>>(&self, url: &str) -> Result<T, MetaError> {
        debug!("Fetching catalog document: {}", url);

        let response = self.client.get(url).send().await.map_err(MetaError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MetaError::Api(format!(
                "failed to fetch {}: {} - {}",
                url, status, body
            )));
        }

        response.json::<T>().await.map_err(MetaError::Http)
    }
}

#[async_trait::async_trait]
impl MetaClientTrait for MetaClient {
    async fn available_versions(&self) -> Result<Vec<ConsulVersion>, MetaError> {
        let url = format!(
            "https://{}/consul/{}/versions?platform_type={}",
            self.api_domain, VERSION_CATALOG_API_VERSION, PLATFORM_TYPE
        );

        let body: AvailableVersionsResponse = self.get_json(&url).await?;
        Ok(body.versions)
    }

    async fn plan_defaults(&self) -> Result<PlanDefaults, MetaError> {
        let url = format!("{}/ama-plans/defaults.json", self.meta_url);
        self.get_json(&url).await
    }

    async fn supported_regions(&self) -> Result<Vec<SupportedRegion>, MetaError> {
        let url = format!("{}/regions/regions.json", self.meta_url);
        let body: SupportedRegionsResponse = self.get_json(&url).await?;
        Ok(body.regions)
    }
}
