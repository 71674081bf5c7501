//! Pure helpers for selecting and validating Consul versions.

use crate::models::{ConsulVersion, VersionStatus};

/// Returns the version the catalog recommends for new clusters.
///
/// Falls back to the last entry in catalog order when no entry carries the
/// RECOMMENDED status. The catalog has so far always listed versions oldest
/// first, so the fallback behaves like "newest available"; we deliberately do
/// not re-sort here to keep parity with the catalog's ordering contract.
pub fn recommended_version(versions: &[ConsulVersion]) -> Option<&str> {
    let mut default_version = None;

    for v in versions {
        default_version = Some(v.version.as_str());

        if v.status == VersionStatus::Recommended {
            return default_version;
        }
    }

    default_version
}

/// Ensures a version string carries exactly one leading `v`.
pub fn normalize_version(version: &str) -> String {
    format!("v{}", version.strip_prefix('v').unwrap_or(version))
}

/// Determines whether `version` is contained in the list of catalog versions.
///
/// The comparison is exact; callers must normalize both sides first.
pub fn is_valid_version(version: &str, versions: &[ConsulVersion]) -> bool {
    versions.iter().any(|v| version == v.version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(value: &str, status: VersionStatus) -> ConsulVersion {
        ConsulVersion {
            version: value.to_string(),
            status,
        }
    }

    #[test]
    fn recommended_version_prefers_recommended_status() {
        let versions = vec![
            version("v1.10.4", VersionStatus::Recommended),
            version("v1.11.1", VersionStatus::Available),
        ];
        assert_eq!(recommended_version(&versions), Some("v1.10.4"));
    }

    #[test]
    fn recommended_version_falls_back_to_last_entry() {
        let versions = vec![
            version("v1.10.4", VersionStatus::Available),
            version("v1.11.1", VersionStatus::Available),
        ];
        assert_eq!(recommended_version(&versions), Some("v1.11.1"));
    }

    #[test]
    fn recommended_version_of_empty_list_is_none() {
        assert_eq!(recommended_version(&[]), None);
    }

    #[test]
    fn normalize_version_adds_prefix() {
        assert_eq!(normalize_version("1.9.8"), "v1.9.8");
    }

    #[test]
    fn normalize_version_keeps_existing_prefix() {
        assert_eq!(normalize_version("v1.9.8"), "v1.9.8");
    }

    #[test]
    fn normalize_version_is_idempotent() {
        for input in ["1.9.8", "v1.9.8", "v1.11.0-beta1", ""] {
            let once = normalize_version(input);
            assert_eq!(normalize_version(&once), once);
        }
    }

    #[test]
    fn is_valid_version_requires_exact_match() {
        let versions = vec![version("v1.11.2", VersionStatus::Available)];
        assert!(is_valid_version("v1.11.2", &versions));
        // No implicit normalization
        assert!(!is_valid_version("1.11.2", &versions));
        assert!(!is_valid_version("v1.11", &versions));
    }

    #[test]
    fn is_valid_version_on_empty_list() {
        assert!(!is_valid_version("v1.11.2", &[]));
    }
}
