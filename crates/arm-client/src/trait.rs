//! ManagedAppClient trait for mocking
//!
//! Abstracts the Resource Manager operations the reconciler performs so its
//! tests can run against an in-memory implementation. The concrete
//! [`ManagedAppClient`](crate::client::ManagedAppClient) implements this
//! trait.

use crate::error::ArmError;
use crate::models::{
    ApplicationRequest, ManagedApplication, ResourceGroup, TagUpdateOutcome, VirtualNetwork,
};
use std::collections::BTreeMap;
use std::time::Duration;

/// Trait for Resource Manager operations on managed applications.
#[async_trait::async_trait]
pub trait ManagedAppClientTrait: Send + Sync {
    /// Fetch a managed application by resource group and name.
    async fn get_application(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ManagedApplication, ArmError>;

    /// Fetch a managed application by its global resource id.
    async fn get_application_by_id(&self, id: &str) -> Result<ManagedApplication, ArmError>;

    /// Create (or replace) a managed application.
    ///
    /// Creation is long-running on the remote side; the returned resource
    /// usually carries a non-terminal provisioning state. Follow up with
    /// [`wait_for_provisioning`](Self::wait_for_provisioning).
    async fn create_application(
        &self,
        resource_group: &str,
        name: &str,
        request: &ApplicationRequest,
    ) -> Result<ManagedApplication, ArmError>;

    /// Poll a managed application until its provisioning state is terminal.
    ///
    /// Returns the resource on `Succeeded` and an error on `Failed` or
    /// `Canceled`. Polls forever otherwise; callers bound the wait with a
    /// timeout.
    async fn wait_for_provisioning(
        &self,
        resource_group: &str,
        name: &str,
        interval: Duration,
    ) -> Result<ManagedApplication, ArmError>;

    /// Patch the tags of a managed application identified by global id.
    ///
    /// The control plane may answer `202 Accepted` instead of applying the
    /// patch synchronously; both responses are successful outcomes.
    async fn update_tags_by_id(
        &self,
        id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<TagUpdateOutcome, ArmError>;

    /// Delete a managed application by its global resource id.
    ///
    /// Deletion is long-running on the remote side; follow up with
    /// [`wait_for_deletion`](Self::wait_for_deletion).
    async fn delete_application_by_id(&self, id: &str) -> Result<(), ArmError>;

    /// Poll a managed application by id until the control plane reports it
    /// absent.
    async fn wait_for_deletion(&self, id: &str, interval: Duration) -> Result<(), ArmError>;

    /// Fetch a resource group by name.
    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, ArmError>;

    /// Fetch a virtual network inside a resource group.
    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualNetwork, ArmError>;
}
