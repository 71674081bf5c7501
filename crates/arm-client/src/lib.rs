//! Azure Resource Manager client
//!
//! Covers the slice of the Resource Manager surface the cluster reconciler
//! needs: managed-application CRUD (by resource group + name or by global
//! id), resource-group reads, virtual-network reads, and tag patching.
//!
//! Managed-application creation and deletion are long-running on the remote
//! side; this crate exposes them as a mutation followed by an explicit
//! `wait_for_*` poll of the resource itself. That transport-level wait is a
//! separate mechanism from the custom-action Operation protocol, which lives
//! in the `consulama-client` crate.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod arm_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use arm_trait::ManagedAppClientTrait;
pub use client::ManagedAppClient;
pub use error::ArmError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockManagedAppClient;
