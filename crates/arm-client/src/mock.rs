//! Mock ManagedAppClient for unit testing
//!
//! Keeps managed applications, resource groups and virtual networks in
//! memory, and records mutating calls so tests can assert which endpoints a
//! reconcile pass touched (or did not touch).

use crate::arm_trait::ManagedAppClientTrait;
use crate::error::ArmError;
use crate::models::{
    ApplicationProperties, ApplicationRequest, ManagedApplication, ProvisioningState,
    ResourceGroup, TagUpdateOutcome, VirtualNetwork,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock Resource Manager client for testing.
#[derive(Debug, Clone)]
pub struct MockManagedAppClient {
    subscription_id: String,
    apps: Arc<Mutex<BTreeMap<String, ManagedApplication>>>,
    resource_groups: Arc<Mutex<BTreeMap<String, ResourceGroup>>>,
    vnets: Arc<Mutex<BTreeMap<(String, String), VirtualNetwork>>>,
    create_state: Arc<Mutex<ProvisioningState>>,
    tag_outcome: Arc<Mutex<TagUpdateOutcome>>,
    deleted: Arc<Mutex<Vec<String>>>,
    tag_calls: Arc<Mutex<Vec<(String, BTreeMap<String, String>)>>>,
}

impl MockManagedAppClient {
    /// Create an empty mock scoped to the given subscription.
    pub fn new(subscription_id: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            apps: Arc::new(Mutex::new(BTreeMap::new())),
            resource_groups: Arc::new(Mutex::new(BTreeMap::new())),
            vnets: Arc::new(Mutex::new(BTreeMap::new())),
            create_state: Arc::new(Mutex::new(ProvisioningState::Succeeded)),
            tag_outcome: Arc::new(Mutex::new(TagUpdateOutcome::Updated)),
            deleted: Arc::new(Mutex::new(Vec::new())),
            tag_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Global resource id the mock assigns to an application.
    pub fn application_id(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Solutions/applications/{}",
            self.subscription_id, resource_group, name
        )
    }

    /// Seed a managed application directly (bypassing create).
    pub fn insert_application(&self, app: ManagedApplication) {
        self.apps.lock().unwrap().insert(app.id.clone(), app);
    }

    /// Seed a resource group with a synthesized id.
    pub fn add_resource_group(&self, name: &str, location: &str) {
        let rg = ResourceGroup {
            id: format!("/subscriptions/{}/resourceGroups/{}", self.subscription_id, name),
            name: name.to_string(),
            location: location.to_string(),
        };
        self.resource_groups.lock().unwrap().insert(name.to_string(), rg);
    }

    /// Seed a virtual network inside a resource group.
    pub fn add_virtual_network(&self, resource_group: &str, name: &str) {
        let vnet = VirtualNetwork {
            id: format!(
                "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}",
                self.subscription_id, resource_group, name
            ),
            name: name.to_string(),
        };
        self.vnets
            .lock()
            .unwrap()
            .insert((resource_group.to_string(), name.to_string()), vnet);
    }

    /// Terminal provisioning state assigned to newly created applications.
    pub fn set_create_state(&self, state: ProvisioningState) {
        *self.create_state.lock().unwrap() = state;
    }

    /// Outcome reported for tag updates.
    pub fn set_tag_outcome(&self, outcome: TagUpdateOutcome) {
        *self.tag_outcome.lock().unwrap() = outcome;
    }

    /// Snapshot of a stored application, if present.
    pub fn application(&self, resource_group: &str, name: &str) -> Option<ManagedApplication> {
        let id = self.application_id(resource_group, name);
        self.apps.lock().unwrap().get(&id).cloned()
    }

    /// Ids passed to `delete_application_by_id`, in call order.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Tag patches recorded by `update_tags_by_id`, in call order.
    pub fn tag_update_calls(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.tag_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ManagedAppClientTrait for MockManagedAppClient {
    async fn get_application(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<ManagedApplication, ArmError> {
        let id = self.application_id(resource_group, name);
        self.get_application_by_id(&id).await
    }

    async fn get_application_by_id(&self, id: &str) -> Result<ManagedApplication, ArmError> {
        self.apps
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ArmError::NotFound(format!("managed application {}", id)))
    }

    async fn create_application(
        &self,
        resource_group: &str,
        name: &str,
        request: &ApplicationRequest,
    ) -> Result<ManagedApplication, ArmError> {
        let id = self.application_id(resource_group, name);
        let app = ManagedApplication {
            id: id.clone(),
            name: name.to_string(),
            location: request.location.clone(),
            kind: request.kind.clone(),
            plan: request.plan.clone(),
            tags: request.tags.clone(),
            properties: ApplicationProperties {
                managed_resource_group_id: request.properties.managed_resource_group_id.clone(),
                parameters: serde_json::to_value(&request.properties.parameters).ok(),
                provisioning_state: Some(*self.create_state.lock().unwrap()),
            },
        };
        self.apps.lock().unwrap().insert(id, app.clone());
        Ok(app)
    }

    async fn wait_for_provisioning(
        &self,
        resource_group: &str,
        name: &str,
        interval: Duration,
    ) -> Result<ManagedApplication, ArmError> {
        loop {
            let app = self.get_application(resource_group, name).await?;
            match app.properties.provisioning_state {
                Some(ProvisioningState::Succeeded) => return Ok(app),
                Some(state) if state.is_terminal() => {
                    return Err(ArmError::Provisioning(format!(
                        "managed application {}/{} ended in state {:?}",
                        resource_group, name, state
                    )));
                }
                _ => tokio::time::sleep(interval).await,
            }
        }
    }

    async fn update_tags_by_id(
        &self,
        id: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<TagUpdateOutcome, ArmError> {
        self.tag_calls
            .lock()
            .unwrap()
            .push((id.to_string(), tags.clone()));

        let mut apps = self.apps.lock().unwrap();
        let app = apps
            .get_mut(id)
            .ok_or_else(|| ArmError::NotFound(format!("managed application {}", id)))?;
        app.tags = tags.clone();
        Ok(*self.tag_outcome.lock().unwrap())
    }

    async fn delete_application_by_id(&self, id: &str) -> Result<(), ArmError> {
        self.deleted.lock().unwrap().push(id.to_string());
        self.apps
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ArmError::NotFound(format!("managed application {}", id)))
    }

    async fn wait_for_deletion(&self, id: &str, interval: Duration) -> Result<(), ArmError> {
        loop {
            match self.get_application_by_id(id).await {
                Err(ArmError::NotFound(_)) => return Ok(()),
                Err(e) => return Err(e),
                Ok(_) => tokio::time::sleep(interval).await,
            }
        }
    }

    async fn get_resource_group(&self, name: &str) -> Result<ResourceGroup, ArmError> {
        self.resource_groups
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ArmError::NotFound(format!("resource group {}", name)))
    }

    async fn get_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<VirtualNetwork, ArmError> {
        self.vnets
            .lock()
            .unwrap()
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| {
                ArmError::NotFound(format!("virtual network {}/{}", resource_group, name))
            })
    }
}
