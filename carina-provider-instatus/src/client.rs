//! Instatus REST API client
//!
//! Thin wrapper over `reqwest` for the component endpoints of the Instatus
//! API. Every request is authenticated with a bearer API key; responses
//! outside the 2xx range become [`ClientError::Status`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.instatus.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status code
    #[error("status: {status}, body: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Parent group of a component as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Component as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_uptime: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ComponentGroup>,
}

impl Component {
    /// Name of the parent group, if the component belongs to one
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_ref().and_then(|g| g.name.as_deref())
    }
}

/// Body of create and update requests; absent fields are left out of the JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_uptime: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Component operations the `instatus_component` resource depends on
#[async_trait]
pub trait ComponentApi: Send + Sync {
    async fn create_component(
        &self,
        page_id: &str,
        component: &ComponentRequest,
    ) -> Result<Component, ClientError>;

    async fn get_component(&self, page_id: &str, component_id: &str)
    -> Result<Component, ClientError>;

    async fn update_component(
        &self,
        page_id: &str,
        component_id: &str,
        component: &ComponentRequest,
    ) -> Result<Component, ClientError>;

    async fn delete_component(&self, page_id: &str, component_id: &str)
    -> Result<(), ClientError>;
}

/// HTTP client for the Instatus API
pub struct InstatusClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl InstatusClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn components_url(&self, page_id: &str) -> String {
        format!("{}/v1/{}/components", self.base_url, page_id)
    }

    fn component_url(&self, page_id: &str, component_id: &str) -> String {
        format!("{}/{}", self.components_url(page_id), component_id)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let status = response.status();
        log::debug!("Instatus API response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        Ok(self.execute(request).await?.json().await?)
    }
}

#[async_trait]
impl ComponentApi for InstatusClient {
    async fn create_component(
        &self,
        page_id: &str,
        component: &ComponentRequest,
    ) -> Result<Component, ClientError> {
        let url = self.components_url(page_id);
        log::debug!("POST {}", url);
        self.execute_json(self.http.post(url).json(component)).await
    }

    async fn get_component(
        &self,
        page_id: &str,
        component_id: &str,
    ) -> Result<Component, ClientError> {
        let url = self.component_url(page_id, component_id);
        log::debug!("GET {}", url);
        self.execute_json(self.http.get(url)).await
    }

    async fn update_component(
        &self,
        page_id: &str,
        component_id: &str,
        component: &ComponentRequest,
    ) -> Result<Component, ClientError> {
        let url = self.component_url(page_id, component_id);
        log::debug!("PUT {}", url);
        self.execute_json(self.http.put(url).json(component)).await
    }

    async fn delete_component(&self, page_id: &str, component_id: &str) -> Result<(), ClientError> {
        let url = self.component_url(page_id, component_id);
        log::debug!("DELETE {}", url);
        self.execute(self.http.delete(url)).await.map(|_| ())
    }
}

fn user_agent() -> String {
    format!("carina-provider-instatus/{}", env!("CARGO_PKG_VERSION"))
}
