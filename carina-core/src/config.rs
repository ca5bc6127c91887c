//! Config - Parse configuration files
//!
//! A configuration file is TOML with three kinds of top-level tables:
//!
//! ```toml
//! [provider.instatus]
//! base_url = "https://api.instatus.com"
//!
//! [backend]
//! type = "local"
//! path = "carina.state.json"
//!
//! [resources.instatus_component.api]
//! page_id = "ckf01fvnxywz60a35wdbn5gz5"
//! name = "API"
//! ```

use std::collections::HashMap;

use crate::provider::ProviderConfig;
use crate::resource::{Resource, Value};

/// Config error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("Invalid block '{0}': expected a table")]
    InvalidBlock(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing backend type")]
    MissingBackendType,

    #[error("Unknown top-level block '{0}'")]
    UnknownBlock(String),
}

/// Backend configuration for state storage
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Backend type (e.g., "local")
    pub backend_type: String,
    /// Backend-specific attributes
    pub attributes: HashMap<String, Value>,
}

/// Parse result
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub providers: Vec<ProviderConfig>,
    /// Backend configuration for state storage
    pub backend: Option<BackendConfig>,
    pub resources: Vec<Resource>,
}

impl ParsedFile {
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

/// Parse a configuration file
pub fn parse(input: &str) -> Result<ParsedFile, ConfigError> {
    let root: toml::Table = toml::from_str(input)?;
    let mut parsed = ParsedFile::default();

    for (key, value) in &root {
        match key.as_str() {
            "provider" => {
                for (name, block) in as_table(key, value)? {
                    parsed.providers.push(ProviderConfig {
                        name: name.clone(),
                        attributes: convert_table(name, as_table(name, block)?)?,
                    });
                }
            }
            "backend" => {
                let mut attributes = convert_table(key, as_table(key, value)?)?;
                let backend_type = match attributes.remove("type") {
                    Some(Value::String(s)) => s,
                    Some(_) => {
                        return Err(ConfigError::InvalidValue {
                            key: "backend.type".to_string(),
                            message: "expected a string".to_string(),
                        });
                    }
                    None => return Err(ConfigError::MissingBackendType),
                };
                parsed.backend = Some(BackendConfig {
                    backend_type,
                    attributes,
                });
            }
            "resources" => {
                for (resource_type, bindings) in as_table(key, value)? {
                    for (name, block) in as_table(resource_type, bindings)? {
                        let path = format!("{}.{}", resource_type, name);
                        let mut resource = Resource::new(resource_type.clone(), name.clone());
                        resource.attributes = convert_table(&path, as_table(&path, block)?)?;
                        parsed.resources.push(resource);
                    }
                }
            }
            other => return Err(ConfigError::UnknownBlock(other.to_string())),
        }
    }

    Ok(parsed)
}

fn as_table<'a>(key: &str, value: &'a toml::Value) -> Result<&'a toml::Table, ConfigError> {
    value
        .as_table()
        .ok_or_else(|| ConfigError::InvalidBlock(key.to_string()))
}

fn convert_table(
    path: &str,
    table: &toml::Table,
) -> Result<HashMap<String, Value>, ConfigError> {
    table
        .iter()
        .map(|(k, v)| {
            let key = format!("{}.{}", path, k);
            convert_value(&key, v).map(|v| (k.clone(), v))
        })
        .collect()
}

fn convert_value(key: &str, value: &toml::Value) -> Result<Value, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(Value::String(s.clone())),
        toml::Value::Integer(i) => Ok(Value::Int(*i)),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        toml::Value::Datetime(dt) => Ok(Value::String(dt.to_string())),
        toml::Value::Array(items) => items
            .iter()
            .map(|v| convert_value(key, v))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        toml::Value::Table(table) => convert_table(key, table).map(Value::Map),
        toml::Value::Float(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "floating point values are not supported".to_string(),
        }),
    }
}
