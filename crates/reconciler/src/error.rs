//! Reconciler errors
//!
//! Client NotFound errors are matched and recovered inside the reconciler
//! wherever absence is a legitimate outcome (reads of deleted resources,
//! idempotent deletes). Everything else surfaces here with enough context
//! to identify the resource involved.

use arm_client::ArmError;
use consul_meta::MetaError;
use consulama_client::CustomActionError;
use thiserror::Error;

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A managed application with the requested name already exists
    #[error(
        "a cluster with managed application id {id} already exists; import it instead of creating it"
    )]
    AlreadyExists {
        /// Id of the conflicting managed application.
        id: String,
    },

    /// The desired configuration is invalid
    #[error("validation failed: {0}")]
    Validation(String),

    /// The cluster is the federation primary and still has secondaries
    #[error(
        "unable to delete primary datacenter of a federation before all secondary datacenters are deleted: (managed application {name}) (resource group {resource_group})"
    )]
    FederationInvariant {
        /// Managed application name of the primary.
        name: String,
        /// Resource group of the primary.
        resource_group: String,
    },

    /// A composite import id could not be parsed
    #[error("invalid import id: {0}")]
    InvalidImportId(String),

    /// An Azure resource id could not be parsed
    #[error("unable to parse resource group name from id {0:?}")]
    InvalidResourceId(String),

    /// Resource Manager API error
    #[error("managed application API: {0}")]
    ManagedApp(#[from] ArmError),

    /// Custom-action API error
    #[error("custom action API: {0}")]
    CustomAction(#[from] CustomActionError),

    /// Catalog metadata error
    #[error("catalog metadata: {0}")]
    Meta(#[from] MetaError),
}
