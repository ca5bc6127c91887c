//! Instatus Provider implementation
//!
//! Owns the API client and the resources that share it. Lifecycle calls
//! are dispatched by full resource type name.

use std::sync::Arc;

use carina_core::provider::{ProviderConfig, ProviderError, ProviderResult};
use carina_core::resource::ResourceId;

use crate::client::{ComponentApi, DEFAULT_BASE_URL, InstatusClient};
use crate::component::ComponentResource;
use crate::schemas::component::RESOURCE_TYPE as COMPONENT_TYPE;

pub const API_KEY_ENV: &str = "INSTATUS_API_KEY";
pub const BASE_URL_ENV: &str = "INSTATUS_BASE_URL";

/// Instatus Provider
#[derive(Default)]
pub struct InstatusProvider {
    component: ComponentResource,
}

impl InstatusProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider bound to an already constructed client
    pub fn with_client(client: Arc<dyn ComponentApi>) -> Self {
        let mut provider = Self::new();
        provider.component.configure(Some(client));
        provider
    }

    /// Configure from a provider block, falling back to `lookup_env` for
    /// settings the block leaves out
    pub fn configure_with_env(
        &mut self,
        config: &ProviderConfig,
        lookup_env: impl Fn(&str) -> Option<String>,
    ) -> ProviderResult<()> {
        let api_key = setting(config, "api_key", API_KEY_ENV, &lookup_env).ok_or_else(|| {
            ProviderError::diagnostic(
                "Missing Instatus API Key",
                format!(
                    "The provider cannot create the Instatus API client as there is a missing or empty value for the Instatus API key. \
                     Set the api_key value in the configuration or use the {} environment variable.",
                    API_KEY_ENV
                ),
            )
        })?;
        let base_url = setting(config, "base_url", BASE_URL_ENV, &lookup_env)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = InstatusClient::with_base_url(api_key, base_url).map_err(|e| {
            ProviderError::diagnostic(
                "Unable to Create Instatus API Client",
                format!("An unexpected error occurred when creating the Instatus API client: {}", e),
            )
            .with_cause(e)
        })?;

        log::debug!("configured Instatus client for {}", client.base_url());
        self.component.configure(Some(Arc::new(client)));
        Ok(())
    }

    pub(crate) fn component_for(&self, id: &ResourceId) -> ProviderResult<&ComponentResource> {
        if id.resource_type == COMPONENT_TYPE {
            Ok(&self.component)
        } else {
            Err(
                ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                    .for_resource(id.clone()),
            )
        }
    }
}

/// Non-empty value from the block, else from the environment
fn setting(
    config: &ProviderConfig,
    key: &str,
    env: &str,
    lookup_env: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    config
        .get_string(key)
        .map(String::from)
        .or_else(|| lookup_env(env))
        .filter(|v| !v.is_empty())
}
