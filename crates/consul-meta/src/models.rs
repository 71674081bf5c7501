//! Catalog data types

use serde::{Deserialize, Serialize};

/// Availability status of a Consul version in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    /// The version is available for new clusters.
    Available,
    /// The version is the catalog's recommended default.
    Recommended,
    /// The version is offered as a preview only.
    Preview,
}

/// A Consul version entry from the version catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsulVersion {
    /// The Consul product version, e.g. `v1.11.2`.
    pub version: String,
    /// Availability of this version.
    pub status: VersionStatus,
}

/// Body of the version catalog response.
#[derive(Debug, Deserialize)]
pub(crate) struct AvailableVersionsResponse {
    pub versions: Vec<ConsulVersion>,
}

/// Default values of the current marketplace plan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlanDefaults {
    /// Name of the default plan.
    pub name: String,
    /// Version of the default plan.
    pub version: String,
    /// Current version of the managed-application API.
    #[serde(rename = "ama_api_version")]
    pub ama_api_version: String,
}

/// A deployment region supported for new clusters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupportedRegion {
    /// Short region name, e.g. `westus2`.
    #[serde(rename = "short")]
    pub short_name: String,
    /// Display name of the region.
    #[serde(rename = "friendly")]
    pub friendly_name: String,
}

/// Body of the supported regions response.
#[derive(Debug, Deserialize)]
pub(crate) struct SupportedRegionsResponse {
    #[serde(rename = "regions", default)]
    pub regions: Vec<SupportedRegion>,
}

/// Determines whether a region is supported for cluster deployment.
///
/// An empty region list means no restriction: callers that could not fetch
/// the catalog pass an empty slice and the region is allowed.
pub fn region_is_supported(region: &str, supported: &[SupportedRegion]) -> bool {
    if supported.is_empty() {
        return true;
    }

    supported.iter().any(|s| s.short_name == region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<SupportedRegion> {
        vec![
            SupportedRegion {
                short_name: "westus2".to_string(),
                friendly_name: "West US 2".to_string(),
            },
            SupportedRegion {
                short_name: "eastus".to_string(),
                friendly_name: "East US".to_string(),
            },
        ]
    }

    #[test]
    fn region_in_catalog_is_supported() {
        assert!(region_is_supported("eastus", &regions()));
    }

    #[test]
    fn region_not_in_catalog_is_unsupported() {
        assert!(!region_is_supported("centralus", &regions()));
    }

    #[test]
    fn empty_catalog_allows_any_region() {
        assert!(region_is_supported("anywhere", &[]));
    }

    #[test]
    fn version_status_wire_format() {
        let v: ConsulVersion =
            serde_json::from_str(r#"{"version":"v1.11.2","status":"RECOMMENDED"}"#).unwrap();
        assert_eq!(v.status, VersionStatus::Recommended);
    }
}
