//! Carina Instatus Provider
//!
//! Manages Instatus status page components through the Instatus REST API.
//!
//! ## Module Structure
//!
//! - `client` - HTTP client and wire DTOs
//! - `component` - `instatus_component` lifecycle
//! - `provider` - InstatusProvider configuration and dispatch
//! - `schemas` - Resource schemas

pub mod client;
pub mod component;
pub mod provider;
pub mod schemas;

// Re-export main types
pub use client::{ClientError, Component, ComponentApi, ComponentRequest, InstatusClient};
pub use component::{ComponentResource, ComponentType};
pub use provider::{API_KEY_ENV, BASE_URL_ENV, InstatusProvider};

use carina_core::provider::{
    BoxFuture, Provider, ProviderConfig, ProviderResult, ResourceType,
};
use carina_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for InstatusProvider {
    fn name(&self) -> &'static str {
        "instatus"
    }

    fn configure(&mut self, config: &ProviderConfig) -> ProviderResult<()> {
        self.configure_with_env(config, |name| std::env::var(name).ok())
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        vec![Box::new(ComponentType)]
    }

    fn read(&self, state: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let state = state.clone();
        Box::pin(async move { self.component_for(&state.id)?.read(&state).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.component_for(&resource.id)?.create(&resource).await })
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.component_for(&to.id)?.update(&from, &to).await })
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let state = state.clone();
        Box::pin(async move { self.component_for(&state.id)?.delete(&state).await })
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let result = self
            .component_for(id)
            .map(|component| component.import(id, import_id));
        Box::pin(async move { result })
    }
}
