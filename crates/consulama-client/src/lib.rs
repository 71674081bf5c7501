//! Custom-action API client
//!
//! The Consul managed application exposes its control surface as custom
//! resource provider actions: every call is a POST to
//! `{scope}/providers/Microsoft.CustomProviders/resourceProviders/public/{action}`
//! under the application's managed resource group, except the one GET of
//! `consulClusters/{name}`.
//!
//! Mutations that take time return an [`Operation`](models::Operation) which
//! moves PENDING -> RUNNING -> DONE and never backwards; the operation
//! carries an error exactly when it failed. This explicit poll protocol is
//! the second long-running mechanism next to the transport-level
//! provisioning wait in the `arm-client` crate, and the two are never mixed.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod action_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use action_trait::CustomActionClientTrait;
pub use client::CustomActionClient;
pub use error::CustomActionError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockCustomActionClient;
