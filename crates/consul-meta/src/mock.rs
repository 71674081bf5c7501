//! Mock MetaClient for unit testing
//!
//! Stores catalog data in memory. Fields left unset make the corresponding
//! fetch fail, which lets tests exercise the fail-open region handling and
//! the hard failure on a missing version catalog.

use crate::error::MetaError;
use crate::meta_trait::MetaClientTrait;
use crate::models::{ConsulVersion, PlanDefaults, SupportedRegion};
use std::sync::{Arc, Mutex};

/// Mock catalog client for testing.
#[derive(Debug, Clone, Default)]
pub struct MockMetaClient {
    versions: Arc<Mutex<Option<Vec<ConsulVersion>>>>,
    plan_defaults: Arc<Mutex<Option<PlanDefaults>>>,
    regions: Arc<Mutex<Option<Vec<SupportedRegion>>>>,
}

impl MockMetaClient {
    /// Create a mock with no catalog data; every fetch fails until populated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the versions returned by `available_versions`.
    pub fn set_versions(&self, versions: Vec<ConsulVersion>) {
        *self.versions.lock().unwrap() = Some(versions);
    }

    /// Set the plan defaults returned by `plan_defaults`.
    pub fn set_plan_defaults(&self, defaults: PlanDefaults) {
        *self.plan_defaults.lock().unwrap() = Some(defaults);
    }

    /// Set the regions returned by `supported_regions`.
    pub fn set_regions(&self, regions: Vec<SupportedRegion>) {
        *self.regions.lock().unwrap() = Some(regions);
    }
}

#[async_trait::async_trait]
impl MetaClientTrait for MockMetaClient {
    async fn available_versions(&self) -> Result<Vec<ConsulVersion>, MetaError> {
        self.versions
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MetaError::Api("no version catalog configured".to_string()))
    }

    async fn plan_defaults(&self) -> Result<PlanDefaults, MetaError> {
        self.plan_defaults
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MetaError::Api("no plan defaults configured".to_string()))
    }

    async fn supported_regions(&self) -> Result<Vec<SupportedRegion>, MetaError> {
        self.regions
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| MetaError::Api("no region catalog configured".to_string()))
    }
}
