//! Consul deployment metadata client
//!
//! Fetches the catalog data the cluster reconciler needs before it can
//! provision anything: the list of Consul versions currently offered by the
//! version catalog service, the set of supported deployment regions, and the
//! default marketplace plan.
//!
//! The pure helpers (`recommended_version`, `normalize_version`,
//! `is_valid_version`, `region_is_supported`) are kept free of I/O so they can
//! be applied to both the global create-time catalog and the cluster-scoped
//! upgrade-version list returned by the custom-action API.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod meta_trait;
pub mod version;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::MetaClient;
pub use error::MetaError;
pub use meta_trait::MetaClientTrait;
pub use models::{ConsulVersion, PlanDefaults, SupportedRegion, VersionStatus, region_is_supported};
pub use version::{is_valid_version, normalize_version, recommended_version};
#[cfg(feature = "test-util")]
pub use mock::MockMetaClient;
