//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type, enabling type validation
//! before any remote call and shaping the planned values handed to providers.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Resource, State, Value};

/// Attribute type
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed string values)
    Enum(Vec<String>),
}

impl AttributeType {
    /// Build an enum type from a list of allowed values
    pub fn one_of(values: &[&str]) -> Self {
        AttributeType::Enum(values.iter().map(|v| v.to_string()).collect())
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed by the provider and cannot be set")]
    ComputedOnly { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// May be set in configuration
    pub optional: bool,
    /// Value may be assigned by the provider
    pub computed: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    /// Keep the prior state value when the configuration does not set one
    pub use_state_for_unknown: bool,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            default: None,
            description: None,
            use_state_for_unknown: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn use_state_for_unknown(mut self) -> Self {
        self.use_state_for_unknown = true;
        self
    }

    /// Computed attributes that configuration cannot set
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate configured resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();
        for name in names {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        let mut configured: Vec<(&String, &Value)> = attributes.iter().collect();
        configured.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in configured {
            match self.attributes.get(name) {
                Some(schema) if schema.is_read_only() => {
                    errors.push(TypeError::ComputedOnly { name: name.clone() });
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Compute the planned resource handed to a provider.
    ///
    /// Absent attributes with a default take the default. Attributes marked
    /// `use_state_for_unknown` keep the prior state value when not configured.
    pub fn plan(&self, desired: &Resource, prior: Option<&State>) -> Resource {
        let mut planned = desired.clone();

        for (name, schema) in &self.attributes {
            if planned.attributes.contains_key(name) {
                continue;
            }
            if let Some(default) = &schema.default {
                planned.attributes.insert(name.clone(), default.clone());
                continue;
            }
            if schema.use_state_for_unknown
                && let Some(state) = prior.filter(|s| s.exists)
                && let Some(value) = state.attributes.get(name)
            {
                planned.attributes.insert(name.clone(), value.clone());
            }
        }

        planned
    }
}

/// Description suffix listing enum values, e.g. "One of: (A, B)."
pub fn describe_one_of(prefix: &str, values: &[&str]) -> String {
    format!("{} One of: ({}).", prefix, values.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;

    fn test_schema() -> ResourceSchema {
        ResourceSchema::new("test_widget")
            .attribute(
                AttributeSchema::new("id", AttributeType::String)
                    .computed()
                    .use_state_for_unknown(),
            )
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(
                AttributeSchema::new("color", AttributeType::one_of(&["RED", "BLUE"])).optional(),
            )
            .attribute(
                AttributeSchema::new("enabled", AttributeType::Bool)
                    .optional()
                    .computed()
                    .with_default(Value::Bool(false)),
            )
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::String("hello".to_string())).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::one_of(&["a", "b"]);
        assert!(t.validate(&Value::String("a".to_string())).is_ok());
        assert!(t.validate(&Value::String("c".to_string())).is_err());
        assert!(t.validate(&Value::Bool(true)).is_err());
    }

    #[test]
    fn validate_resource_schema() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("widget".to_string()));
        attrs.insert("color".to_string(), Value::String("RED".to_string()));
        attrs.insert("enabled".to_string(), Value::Bool(true));

        assert!(test_schema().validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let result = test_schema().validate(&HashMap::new());
        assert_eq!(
            result.unwrap_err(),
            vec![TypeError::MissingRequired {
                name: "name".to_string()
            }]
        );
    }

    #[test]
    fn computed_only_attribute_is_rejected() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("widget".to_string()));
        attrs.insert("id".to_string(), Value::String("abc".to_string()));

        let errors = test_schema().validate(&attrs).unwrap_err();
        assert_eq!(
            errors,
            vec![TypeError::ComputedOnly {
                name: "id".to_string()
            }]
        );
    }

    #[test]
    fn errors_are_collected() {
        let mut attrs = HashMap::new();
        attrs.insert("color".to_string(), Value::String("GREEN".to_string()));
        attrs.insert("size".to_string(), Value::Int(3));

        let errors = test_schema().validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[1].to_string().contains("expected one of: RED, BLUE"));
        assert_eq!(errors[2].to_string(), "Unknown attribute 'size'");
    }

    #[test]
    fn plan_applies_defaults() {
        let desired = Resource::new("test_widget", "w").with_attribute("name", "widget");
        let planned = test_schema().plan(&desired, None);

        assert_eq!(planned.get_bool("enabled"), Some(false));
        assert!(!planned.attributes.contains_key("id"));
    }

    #[test]
    fn plan_keeps_configured_value_over_default() {
        let desired = Resource::new("test_widget", "w")
            .with_attribute("name", "widget")
            .with_attribute("enabled", true);
        let planned = test_schema().plan(&desired, None);

        assert_eq!(planned.get_bool("enabled"), Some(true));
    }

    #[test]
    fn plan_uses_state_for_unknown() {
        let prior = State::existing(
            ResourceId::new("test_widget", "w"),
            HashMap::from([
                ("id".to_string(), Value::String("abc".to_string())),
                ("color".to_string(), Value::String("BLUE".to_string())),
            ]),
        );
        let desired = Resource::new("test_widget", "w").with_attribute("name", "widget");
        let planned = test_schema().plan(&desired, Some(&prior));

        assert_eq!(planned.get_str("id"), Some("abc"));
        // color has no plan modifier
        assert_eq!(planned.get_str("color"), None);
    }

    #[test]
    fn describe_one_of_lists_values() {
        assert_eq!(
            describe_one_of("Color of the widget.", &["RED", "BLUE"]),
            "Color of the widget. One of: (RED, BLUE)."
        );
    }
}
