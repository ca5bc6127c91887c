//! The `instatus_component` resource
//!
//! Maps between configuration/state attributes and the component DTOs of
//! the Instatus API. Every client failure is returned as a terminal
//! diagnostic carrying the client error verbatim.

use std::collections::HashMap;
use std::sync::Arc;

use carina_core::provider::{ProviderError, ProviderResult, ResourceType, import_passthrough};
use carina_core::resource::{Resource, ResourceId, State, Value};
use carina_core::schema::ResourceSchema;
use chrono::Utc;

use crate::client::{Component, ComponentApi, ComponentRequest};
use crate::schemas;

/// RFC 850 layout used for `last_updated`
const LAST_UPDATED_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S UTC";

pub struct ComponentType;

impl ResourceType for ComponentType {
    fn name(&self) -> &'static str {
        "component"
    }

    fn schema(&self) -> ResourceSchema {
        schemas::component::schema()
    }
}

#[derive(Default)]
pub struct ComponentResource {
    client: Option<Arc<dyn ComponentApi>>,
}

impl ComponentResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the provider's client. `None` leaves the resource as it was.
    pub fn configure(&mut self, client: Option<Arc<dyn ComponentApi>>) {
        if let Some(client) = client {
            self.client = Some(client);
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self, id: &ResourceId) -> ProviderResult<&dyn ComponentApi> {
        self.client.as_deref().ok_or_else(|| {
            ProviderError::diagnostic(
                "Unconfigured provider",
                "The Instatus client has not been configured. Configure the provider before managing components.",
            )
            .for_resource(id.clone())
        })
    }

    pub async fn create(&self, plan: &Resource) -> ProviderResult<State> {
        let client = self.client(&plan.id)?;
        let page_id = plan.get_str("page_id").unwrap_or_default();

        let component = client
            .create_component(page_id, &request_from(&plan.attributes))
            .await
            .map_err(|e| {
                ProviderError::diagnostic(
                    "Error creating component",
                    format!("Could not create component, unexpected error: {}", e),
                )
                .for_resource(plan.id.clone())
                .with_cause(e)
            })?;

        let mut attributes = plan.attributes.clone();
        set_opt(&mut attributes, "id", component.id.clone());
        set_opt(&mut attributes, "unique_email", component.unique_email.clone());
        set_opt(&mut attributes, "order", component.order);
        set_opt(&mut attributes, "group_id", component.group_id.clone());
        set_opt(&mut attributes, "group", component.group_name());
        attributes.insert("last_updated".to_string(), Value::String(last_updated()));

        log::debug!(
            "created component {} on page {}",
            component.id.as_deref().unwrap_or("<none>"),
            page_id
        );
        Ok(with_remote_id(State::existing(plan.id.clone(), attributes)))
    }

    pub async fn read(&self, state: &State) -> ProviderResult<State> {
        let client = self.client(&state.id)?;
        let page_id = state.get_str("page_id").unwrap_or_default();
        let component_id = component_id(state);

        let component = client
            .get_component(page_id, component_id)
            .await
            .map_err(|e| {
                ProviderError::diagnostic(
                    "Error Reading Instatus Component",
                    format!(
                        "Could not read Instatus component ID {}: {}",
                        component_id, e
                    ),
                )
                .for_resource(state.id.clone())
                .with_cause(e)
            })?;

        let mut attributes = state.attributes.clone();
        apply_refresh(&mut attributes, &component);
        Ok(with_remote_id(State::existing(state.id.clone(), attributes)))
    }

    pub async fn update(&self, prior: &State, plan: &Resource) -> ProviderResult<State> {
        let client = self.client(&plan.id)?;
        let page_id = plan.get_str("page_id").unwrap_or_default();
        let component_id = plan.get_str("id").unwrap_or_else(|| component_id(prior));

        let component = client
            .update_component(page_id, component_id, &request_from(&plan.attributes))
            .await
            .map_err(|e| {
                ProviderError::diagnostic(
                    "Error Updating Instatus Component",
                    format!("Could not update component, unexpected error: {}", e),
                )
                .for_resource(plan.id.clone())
                .with_cause(e)
            })?;

        log::warn!("{}", group_name_warning(&component));

        let mut attributes = plan.attributes.clone();
        set_opt(&mut attributes, "id", component.id.clone());
        set_opt(&mut attributes, "group_id", component.group_id.clone());
        set_opt(&mut attributes, "group", component.group_name());
        set_opt(&mut attributes, "order", component.order);
        set_opt(&mut attributes, "unique_email", component.unique_email.clone());
        attributes.insert("last_updated".to_string(), Value::String(last_updated()));

        Ok(with_remote_id(State::existing(plan.id.clone(), attributes)))
    }

    pub async fn delete(&self, state: &State) -> ProviderResult<()> {
        let client = self.client(&state.id)?;
        let page_id = state.get_str("page_id").unwrap_or_default();

        client
            .delete_component(page_id, component_id(state))
            .await
            .map_err(|e| {
                ProviderError::diagnostic(
                    "Error Deleting Instatus Component",
                    format!("Could not delete component, unexpected error: {}", e),
                )
                .for_resource(state.id.clone())
                .with_cause(e)
            })
    }

    /// Stores the import identifier as `id`.
    ///
    /// `<page_id>/<component_id>` additionally fills `page_id`, which the
    /// refresh following an import needs to address the component.
    pub fn import(&self, id: &ResourceId, import_id: &str) -> State {
        match import_id.split_once('/') {
            Some((page_id, component_id)) if !page_id.is_empty() && !component_id.is_empty() => {
                let mut state = import_passthrough(id, component_id);
                state
                    .attributes
                    .insert("page_id".to_string(), Value::String(page_id.to_string()));
                state
            }
            _ => import_passthrough(id, import_id),
        }
    }
}

/// Request body from planned attributes; absent attributes stay absent
fn request_from(attributes: &HashMap<String, Value>) -> ComponentRequest {
    let string = |key: &str| attributes.get(key).and_then(Value::as_str).map(String::from);
    let flag = |key: &str| attributes.get(key).and_then(Value::as_bool);

    ComponentRequest {
        name: string("name"),
        description: string("description"),
        status: string("status"),
        order: attributes.get("order").and_then(Value::as_int),
        show_uptime: flag("show_uptime"),
        grouped: flag("grouped"),
        group: string("group"),
    }
}

/// Overwrite refreshed attributes with the remote component
fn apply_refresh(attributes: &mut HashMap<String, Value>, component: &Component) {
    set_opt(attributes, "unique_email", component.unique_email.clone());
    set_opt(attributes, "name", component.name.clone());
    set_opt(attributes, "description", component.description.clone());
    set_opt(attributes, "status", component.status.clone());
    set_opt(attributes, "order", component.order);
    set_opt(attributes, "group_id", component.group_id.clone());
    set_opt(attributes, "show_uptime", component.show_uptime);
    attributes.insert(
        "grouped".to_string(),
        Value::Bool(component.group_name().is_some()),
    );
    set_opt(attributes, "group", component.group_name());
}

/// Set `key` to `value`, removing it when the service returned nothing
fn set_opt<V: Into<Value>>(attributes: &mut HashMap<String, Value>, key: &str, value: Option<V>) {
    match value {
        Some(v) => {
            attributes.insert(key.to_string(), v.into());
        }
        None => {
            attributes.remove(key);
        }
    }
}

/// Warning reported after every update, naming the component's group
fn group_name_warning(component: &Component) -> String {
    format!("Group name : {}", component.group_name().unwrap_or_default())
}

fn component_id(state: &State) -> &str {
    state
        .get_str("id")
        .or(state.identifier.as_deref())
        .unwrap_or_default()
}

fn with_remote_id(state: State) -> State {
    match state.get_str("id").map(String::from) {
        Some(id) => state.with_identifier(id),
        None => state,
    }
}

fn last_updated() -> String {
    Utc::now().format(LAST_UPDATED_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, ComponentGroup};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory stand-in for the Instatus API
    #[derive(Default)]
    struct FakeApi {
        components: Mutex<HashMap<String, Component>>,
        requests: Mutex<Vec<ComponentRequest>>,
        fail: Option<(u16, &'static str)>,
    }

    impl FakeApi {
        fn failing(status: u16, body: &'static str) -> Self {
            Self {
                fail: Some((status, body)),
                ..Default::default()
            }
        }

        fn check(&self) -> Result<(), ClientError> {
            match self.fail {
                Some((status, body)) => Err(ClientError::Status {
                    status,
                    body: body.to_string(),
                }),
                None => Ok(()),
            }
        }

        fn apply(&self, id: &str, request: &ComponentRequest) -> Component {
            self.requests.lock().unwrap().push(request.clone());

            let mut components = self.components.lock().unwrap();
            let order = request.order.unwrap_or(components.len() as i64 + 1);
            let group = match (request.grouped, &request.group) {
                (Some(true), Some(name)) => Some(ComponentGroup {
                    id: Some(format!("grp-{}", name.to_lowercase())),
                    name: Some(name.clone()),
                }),
                _ => None,
            };
            let component = Component {
                id: Some(id.to_string()),
                name: request.name.clone(),
                description: request.description.clone(),
                status: request.status.clone().or(Some("OPERATIONAL".to_string())),
                unique_email: Some(format!("{}@instatus.test", id)),
                show_uptime: request.show_uptime,
                order: Some(order),
                group_id: group.as_ref().and_then(|g| g.id.clone()),
                group,
            };
            components.insert(id.to_string(), component.clone());
            component
        }

        fn set(&self, component: Component) {
            let id = component.id.clone().unwrap_or_default();
            self.components.lock().unwrap().insert(id, component);
        }

        fn last_request(&self) -> ComponentRequest {
            self.requests.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    fn not_found(id: &str) -> ClientError {
        ClientError::Status {
            status: 404,
            body: format!("component {} not found", id),
        }
    }

    #[async_trait]
    impl ComponentApi for FakeApi {
        async fn create_component(
            &self,
            _page_id: &str,
            component: &ComponentRequest,
        ) -> Result<Component, ClientError> {
            self.check()?;
            let id = format!("cmp-{}", self.components.lock().unwrap().len() + 1);
            Ok(self.apply(&id, component))
        }

        async fn get_component(
            &self,
            _page_id: &str,
            component_id: &str,
        ) -> Result<Component, ClientError> {
            self.check()?;
            self.components
                .lock()
                .unwrap()
                .get(component_id)
                .cloned()
                .ok_or_else(|| not_found(component_id))
        }

        async fn update_component(
            &self,
            _page_id: &str,
            component_id: &str,
            component: &ComponentRequest,
        ) -> Result<Component, ClientError> {
            self.check()?;
            if !self.components.lock().unwrap().contains_key(component_id) {
                return Err(not_found(component_id));
            }
            Ok(self.apply(component_id, component))
        }

        async fn delete_component(
            &self,
            _page_id: &str,
            component_id: &str,
        ) -> Result<(), ClientError> {
            self.check()?;
            self.components
                .lock()
                .unwrap()
                .remove(component_id)
                .map(|_| ())
                .ok_or_else(|| not_found(component_id))
        }
    }

    fn resource_with(api: Arc<FakeApi>) -> ComponentResource {
        let mut resource = ComponentResource::new();
        resource.configure(Some(api));
        resource
    }

    fn planned(name: &str) -> Resource {
        let desired = Resource::new("instatus_component", "api")
            .with_attribute("page_id", "page-1")
            .with_attribute("name", name);
        schemas::component::schema().plan(&desired, None)
    }

    #[tokio::test]
    async fn create_sets_computed_attributes() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api.clone());

        let plan = planned("API").with_attribute("show_uptime", true);
        let state = resource.create(&plan).await.unwrap();

        assert!(state.exists);
        assert_eq!(state.identifier.as_deref(), Some("cmp-1"));
        assert_eq!(state.get_str("id"), Some("cmp-1"));
        assert_eq!(state.get_str("unique_email"), Some("cmp-1@instatus.test"));
        assert_eq!(state.get_int("order"), Some(1));
        assert_eq!(state.get_str("page_id"), Some("page-1"));
        assert_eq!(state.get_bool("show_uptime"), Some(true));
        assert_eq!(state.get_bool("grouped"), Some(false));
        assert!(state.get_str("group_id").is_none());
        assert!(state.get_str("last_updated").is_some());
        // status is only refreshed by read
        assert!(state.get_str("status").is_none());

        assert_eq!(
            api.last_request(),
            ComponentRequest {
                name: Some("API".to_string()),
                show_uptime: Some(true),
                grouped: Some(false),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn create_preserves_group_from_response() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api);

        let plan = planned("API")
            .with_attribute("grouped", true)
            .with_attribute("group", "Backend");
        let state = resource.create(&plan).await.unwrap();

        assert_eq!(state.get_bool("grouped"), Some(true));
        assert_eq!(state.get_str("group"), Some("Backend"));
        assert_eq!(state.get_str("group_id"), Some("grp-backend"));
    }

    #[tokio::test]
    async fn create_failure_is_a_diagnostic() {
        let resource = resource_with(Arc::new(FakeApi::failing(401, "unauthorized")));

        let err = resource.create(&planned("API")).await.unwrap_err();

        assert_eq!(err.summary.as_deref(), Some("Error creating component"));
        assert_eq!(
            err.message,
            "Could not create component, unexpected error: status: 401, body: unauthorized"
        );
        assert_eq!(
            err.resource_id,
            Some(ResourceId::new("instatus_component", "api"))
        );
    }

    #[tokio::test]
    async fn read_refreshes_remote_attributes() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api.clone());
        let created = resource
            .create(&planned("API").with_attribute("description", "Public API"))
            .await
            .unwrap();

        api.set(Component {
            id: Some("cmp-1".to_string()),
            name: Some("API (renamed)".to_string()),
            status: Some("MAJOROUTAGE".to_string()),
            unique_email: Some("new@instatus.test".to_string()),
            order: Some(7),
            show_uptime: Some(false),
            group_id: Some("grp-1".to_string()),
            group: Some(ComponentGroup {
                id: Some("grp-1".to_string()),
                name: Some("Edge".to_string()),
            }),
            ..Default::default()
        });

        let state = resource.read(&created).await.unwrap();

        assert_eq!(state.get_str("name"), Some("API (renamed)"));
        assert_eq!(state.get_str("status"), Some("MAJOROUTAGE"));
        assert_eq!(state.get_str("unique_email"), Some("new@instatus.test"));
        assert_eq!(state.get_int("order"), Some(7));
        assert_eq!(state.get_bool("show_uptime"), Some(false));
        assert_eq!(state.get_str("group_id"), Some("grp-1"));
        assert_eq!(state.get_str("group"), Some("Edge"));
        assert_eq!(state.get_bool("grouped"), Some(true));
        assert!(state.get_str("description").is_none());

        assert_eq!(state.get_str("page_id"), Some("page-1"));
        assert_eq!(state.get_str("id"), Some("cmp-1"));
        assert_eq!(state.get_str("last_updated"), created.get_str("last_updated"));
    }

    #[tokio::test]
    async fn read_without_group_clears_grouped() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api.clone());
        let created = resource
            .create(
                &planned("API")
                    .with_attribute("grouped", true)
                    .with_attribute("group", "Backend"),
            )
            .await
            .unwrap();

        api.set(Component {
            id: Some("cmp-1".to_string()),
            name: Some("API".to_string()),
            group: Some(ComponentGroup::default()),
            ..Default::default()
        });

        let state = resource.read(&created).await.unwrap();
        assert_eq!(state.get_bool("grouped"), Some(false));
        assert!(state.get_str("group").is_none());
        assert!(state.get_str("group_id").is_none());
    }

    #[tokio::test]
    async fn read_failure_names_component_id() {
        let resource = resource_with(Arc::new(FakeApi::default()));
        let mut attrs = HashMap::new();
        attrs.insert("page_id".to_string(), Value::from("page-1"));
        attrs.insert("id".to_string(), Value::from("cmp-9"));
        let state = State::existing(ResourceId::new("instatus_component", "api"), attrs);

        let err = resource.read(&state).await.unwrap_err();

        assert_eq!(
            err.summary.as_deref(),
            Some("Error Reading Instatus Component")
        );
        assert_eq!(
            err.message,
            "Could not read Instatus component ID cmp-9: status: 404, body: component cmp-9 not found"
        );
    }

    #[tokio::test]
    async fn update_uses_prior_id_and_keeps_plan() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api.clone());
        let created = resource.create(&planned("API")).await.unwrap();

        let desired = Resource::new("instatus_component", "api")
            .with_attribute("page_id", "page-1")
            .with_attribute("name", "API v2")
            .with_attribute("status", "DEGRADEDPERFORMANCE")
            .with_attribute("grouped", true)
            .with_attribute("group", "Backend");
        let plan = schemas::component::schema().plan(&desired, Some(&created));
        assert_eq!(plan.get_str("id"), Some("cmp-1"));

        let state = resource.update(&created, &plan).await.unwrap();

        assert_eq!(state.get_str("id"), Some("cmp-1"));
        assert_eq!(state.identifier.as_deref(), Some("cmp-1"));
        assert_eq!(state.get_str("name"), Some("API v2"));
        assert_eq!(state.get_str("status"), Some("DEGRADEDPERFORMANCE"));
        assert_eq!(state.get_str("group"), Some("Backend"));
        assert_eq!(state.get_str("group_id"), Some("grp-backend"));
        assert_eq!(state.get_str("unique_email"), Some("cmp-1@instatus.test"));
        assert!(state.get_str("last_updated").is_some());

        let request = api.last_request();
        assert_eq!(request.name.as_deref(), Some("API v2"));
        assert_eq!(request.grouped, Some(true));
    }

    #[tokio::test]
    async fn update_leaves_unset_attributes_out() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api.clone());
        let mut desired = planned("API");
        desired
            .attributes
            .insert("description".to_string(), Value::from("Old description"));
        let created = resource.create(&desired).await.unwrap();
        assert_eq!(created.get_str("description"), Some("Old description"));

        let plan = schemas::component::schema().plan(
            &Resource::new("instatus_component", "api")
                .with_attribute("page_id", "page-1")
                .with_attribute("name", "API"),
            Some(&created),
        );
        let state = resource.update(&created, &plan).await.unwrap();

        assert!(api.last_request().description.is_none());
        assert!(state.get_str("description").is_none());
    }

    #[test]
    fn group_name_warning_names_group() {
        let grouped = Component {
            group: Some(ComponentGroup {
                id: Some("grp-1".to_string()),
                name: Some("Frontend".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(group_name_warning(&grouped), "Group name : Frontend");
        assert_eq!(group_name_warning(&Component::default()), "Group name : ");
    }

    #[tokio::test]
    async fn update_failure_is_a_diagnostic() {
        let resource = resource_with(Arc::new(FakeApi::default()));
        let mut attrs = HashMap::new();
        attrs.insert("id".to_string(), Value::from("cmp-404"));
        let prior = State::existing(ResourceId::new("instatus_component", "api"), attrs);

        let err = resource
            .update(&prior, &planned("API"))
            .await
            .unwrap_err();

        assert_eq!(
            err.summary.as_deref(),
            Some("Error Updating Instatus Component")
        );
        assert_eq!(
            err.message,
            "Could not update component, unexpected error: status: 404, body: component cmp-404 not found"
        );
    }

    #[tokio::test]
    async fn delete_removes_component() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api.clone());
        let created = resource.create(&planned("API")).await.unwrap();

        resource.delete(&created).await.unwrap();
        assert!(api.components.lock().unwrap().is_empty());

        let err = resource.delete(&created).await.unwrap_err();
        assert_eq!(
            err.summary.as_deref(),
            Some("Error Deleting Instatus Component")
        );
        assert!(
            err.message
                .starts_with("Could not delete component, unexpected error: status: 404")
        );
    }

    #[tokio::test]
    async fn unconfigured_resource_refuses_calls() {
        let mut resource = ComponentResource::new();
        resource.configure(None);
        assert!(!resource.is_configured());

        let err = resource.create(&planned("API")).await.unwrap_err();
        assert_eq!(err.summary.as_deref(), Some("Unconfigured provider"));
    }

    #[tokio::test]
    async fn configure_none_keeps_existing_client() {
        let api = Arc::new(FakeApi::default());
        let mut resource = resource_with(api);
        resource.configure(None);

        assert!(resource.is_configured());
        assert!(resource.create(&planned("API")).await.is_ok());
    }

    #[tokio::test]
    async fn import_then_read_round_trips() {
        let api = Arc::new(FakeApi::default());
        let resource = resource_with(api.clone());
        resource
            .create(&planned("API").with_attribute("order", Value::Int(3)))
            .await
            .unwrap();

        let id = ResourceId::new("instatus_component", "imported");
        let imported = resource.import(&id, "page-1/cmp-1");
        assert_eq!(imported.get_str("id"), Some("cmp-1"));
        assert_eq!(imported.get_str("page_id"), Some("page-1"));

        let state = resource.read(&imported).await.unwrap();
        assert_eq!(state.id, id);
        assert_eq!(state.get_str("name"), Some("API"));
        assert_eq!(state.get_int("order"), Some(3));
        assert_eq!(state.get_bool("grouped"), Some(false));
    }

    #[test]
    fn import_passes_bare_id_through() {
        let resource = ComponentResource::new();
        let id = ResourceId::new("instatus_component", "api");

        let state = resource.import(&id, "cmp-42");
        assert_eq!(state.get_str("id"), Some("cmp-42"));
        assert_eq!(state.identifier.as_deref(), Some("cmp-42"));
        assert!(state.get_str("page_id").is_none());

        let state = resource.import(&id, "/cmp-42");
        assert_eq!(state.get_str("id"), Some("/cmp-42"));
    }

    #[test]
    fn last_updated_is_rfc850() {
        let stamp = last_updated();
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, LAST_UPDATED_FORMAT).is_ok());
        assert!(stamp.ends_with(" UTC"));
    }

    #[test]
    fn request_omits_unset_attributes() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::from("API"));
        attrs.insert("order".to_string(), Value::Int(2));
        attrs.insert("page_id".to_string(), Value::from("page-1"));

        let request = request_from(&attrs);
        assert_eq!(request.name.as_deref(), Some("API"));
        assert_eq!(request.order, Some(2));
        assert_eq!(request.description, None);
        assert_eq!(request.grouped, None);
    }

    #[test]
    fn type_name_is_provider_prefixed() {
        assert_eq!(ComponentType.type_name("instatus"), "instatus_component");
        assert_eq!(
            ComponentType.schema().resource_type,
            ComponentType.type_name("instatus")
        );
    }
}
