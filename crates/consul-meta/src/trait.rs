//! MetaClient trait for mocking
//!
//! Abstracts the catalog fetches so reconciler tests can run without network
//! access. The concrete [`MetaClient`](crate::client::MetaClient) implements
//! this trait.

use crate::error::MetaError;
use crate::models::{ConsulVersion, PlanDefaults, SupportedRegion};

/// Trait for catalog metadata operations.
#[async_trait::async_trait]
pub trait MetaClientTrait: Send + Sync {
    /// Fetch the Consul versions currently offered by the version catalog.
    async fn available_versions(&self) -> Result<Vec<ConsulVersion>, MetaError>;

    /// Fetch the default marketplace plan metadata.
    async fn plan_defaults(&self) -> Result<PlanDefaults, MetaError>;

    /// Fetch the regions supported for new cluster deployments.
    async fn supported_regions(&self) -> Result<Vec<SupportedRegion>, MetaError>;
}
