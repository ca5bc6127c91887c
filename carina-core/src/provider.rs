//! Provider - Trait abstracting resource operations
//!
//! A Provider defines the lifecycle of the resource types it manages against
//! one remote service. It is responsible for converting Effects into actual
//! API calls. Planning, diffing and state persistence stay in the host.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Error type for Provider operations
///
/// Carries a short `summary` (the diagnostic title) and a `message` with the
/// details, usually including the verbatim error from the remote client.
#[derive(Debug)]
pub struct ProviderError {
    pub summary: Option<String>,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] ", id.resource_type, id.name)?;
        }
        match self.summary {
            Some(ref summary) => write!(f, "{}: {}", summary, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            summary: None,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    /// Error with a diagnostic summary and detail
    pub fn diagnostic(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(detail).with_summary(summary)
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Provider configuration block
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub name: String,
    pub attributes: HashMap<String, Value>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get a string attribute value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Short resource name (e.g., "component")
    fn name(&self) -> &'static str;

    /// Full type name under the given provider (e.g., "instatus_component")
    fn type_name(&self, provider_type_name: &str) -> String {
        format!("{}_{}", provider_type_name, self.name())
    }

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// Each remote service provider implements this trait.
/// All resource operations are async and involve side effects.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "instatus")
    fn name(&self) -> &'static str;

    /// Configure the provider (credentials, endpoints) before any resource call
    fn configure(&mut self, config: &ProviderConfig) -> ProviderResult<()>;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Schema for a full resource type name, if this provider handles it
    fn schema(&self, resource_type: &str) -> Option<ResourceSchema> {
        self.resource_types()
            .into_iter()
            .find(|t| t.type_name(self.name()) == resource_type)
            .map(|t| t.schema())
    }

    /// Refresh a resource from the remote service using its prior state
    fn read(&self, state: &State) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the remote identifier
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource from its prior state to the planned resource
    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>>;

    /// Import an existing remote object under the given resource id
    ///
    /// The default stores the import identifier verbatim as `id`; the host
    /// refreshes the result with `read` afterwards.
    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let state = import_passthrough(id, import_id);
        Box::pin(async move { Ok(state) })
    }
}

/// Build an imported state whose `id` attribute is the import identifier
pub fn import_passthrough(id: &ResourceId, import_id: &str) -> State {
    let mut attributes = HashMap::new();
    attributes.insert("id".to_string(), Value::String(import_id.to_string()));
    State::existing(id.clone(), attributes).with_identifier(import_id)
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn configure(&mut self, config: &ProviderConfig) -> ProviderResult<()> {
        (**self).configure(config)
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn schema(&self, resource_type: &str) -> Option<ResourceSchema> {
        (**self).schema(resource_type)
    }

    fn read(&self, state: &State) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(state)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(from, to)
    }

    fn delete(&self, state: &State) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(state)
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, import_id)
    }
}
