//! Schema of `instatus_component`

use carina_core::resource::Value;
use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema, describe_one_of};

pub const RESOURCE_TYPE: &str = "instatus_component";

/// Accepted values of the `status` attribute
pub const STATUSES: [&str; 5] = [
    "OPERATIONAL",
    "UNDERMAINTENANCE",
    "DEGRADEDPERFORMANCE",
    "PARTIALOUTAGE",
    "MAJOROUTAGE",
];

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("Manages a component.")
        .attribute(
            AttributeSchema::new("id", AttributeType::String)
                .computed()
                .use_state_for_unknown()
                .with_description("String Identifier of the component."),
        )
        .attribute(
            AttributeSchema::new("unique_email", AttributeType::String)
                .computed()
                .with_description("Unique email generated by Instatus for the component."),
        )
        .attribute(
            AttributeSchema::new("last_updated", AttributeType::String)
                .computed()
                .with_description("Timestamp of the last Carina update of the component."),
        )
        .attribute(
            AttributeSchema::new("page_id", AttributeType::String)
                .required()
                .with_description("String Identifier of the page of the component."),
        )
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_description("Name of the component."),
        )
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .optional()
                .with_description("Description of the component."),
        )
        .attribute(
            AttributeSchema::new("status", AttributeType::one_of(&STATUSES))
                .optional()
                .with_description(describe_one_of("Status of the component.", &STATUSES)),
        )
        .attribute(
            AttributeSchema::new("order", AttributeType::Int)
                .optional()
                .computed()
                .with_description("Order in the page of the component."),
        )
        .attribute(
            AttributeSchema::new("group_id", AttributeType::String)
                .computed()
                .with_description("String Identifier of the parent group of the component."),
        )
        .attribute(
            AttributeSchema::new("show_uptime", AttributeType::Bool)
                .optional()
                .with_description("Whether show uptime is enabled in the component."),
        )
        .attribute(
            AttributeSchema::new("grouped", AttributeType::Bool)
                .optional()
                .computed()
                .with_default(Value::Bool(false))
                .with_description(
                    "Whether the component is in a group (Require group set to desired name when true).",
                ),
        )
        .attribute(
            AttributeSchema::new("group", AttributeType::String)
                .optional()
                .with_description("Name of the group for the component (Require grouped set to true)."),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::resource::{Resource, ResourceId, State};
    use carina_core::schema::TypeError;
    use std::collections::HashMap;

    fn config(extra: &[(&str, Value)]) -> HashMap<String, Value> {
        let mut attrs: HashMap<String, Value> = [
            ("page_id".to_string(), Value::from("page-1")),
            ("name".to_string(), Value::from("API")),
        ]
        .into_iter()
        .collect();
        for (k, v) in extra {
            attrs.insert(k.to_string(), v.clone());
        }
        attrs
    }

    #[test]
    fn status_description_lists_values() {
        let schema = schema();
        assert_eq!(
            schema.attributes["status"].description.as_deref(),
            Some(
                "Status of the component. One of: (OPERATIONAL, UNDERMAINTENANCE, \
                 DEGRADEDPERFORMANCE, PARTIALOUTAGE, MAJOROUTAGE)."
            )
        );
    }

    #[test]
    fn accepts_every_status() {
        let schema = schema();
        for status in STATUSES {
            assert!(schema.validate(&config(&[("status", Value::from(status))])).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let errors = schema()
            .validate(&config(&[("status", Value::from("DOWN"))]))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            TypeError::AttributeError { name, .. } if name == "status"
        ));
    }

    #[test]
    fn requires_page_id_and_name() {
        let errors = schema().validate(&HashMap::new()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                TypeError::MissingRequired {
                    name: "name".to_string()
                },
                TypeError::MissingRequired {
                    name: "page_id".to_string()
                },
            ]
        );
    }

    #[test]
    fn computed_attributes_cannot_be_configured() {
        let errors = schema()
            .validate(&config(&[
                ("id", Value::from("cmp-1")),
                ("unique_email", Value::from("x@instatus.test")),
            ]))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, TypeError::ComputedOnly { .. })));
    }

    #[test]
    fn optional_computed_attributes_can_be_configured() {
        let attrs = config(&[("order", Value::Int(3)), ("grouped", Value::Bool(true))]);
        assert!(schema().validate(&attrs).is_ok());
    }

    #[test]
    fn plan_defaults_grouped_and_keeps_prior_id() {
        let desired = Resource::new(RESOURCE_TYPE, "api")
            .with_attribute("page_id", "page-1")
            .with_attribute("name", "API");
        let mut prior_attrs = HashMap::new();
        prior_attrs.insert("id".to_string(), Value::from("cmp-1"));
        prior_attrs.insert("order".to_string(), Value::Int(4));
        let prior = State::existing(ResourceId::new(RESOURCE_TYPE, "api"), prior_attrs);

        let planned = schema().plan(&desired, Some(&prior));

        assert_eq!(planned.get_bool("grouped"), Some(false));
        assert_eq!(planned.get_str("id"), Some("cmp-1"));
        // order is optional+computed without the state plan modifier
        assert_eq!(planned.get_int("order"), None);
    }
}
