//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the planned resources (configuration after schema defaults and
//! plan modifiers) with the current state recorded for them, and generates
//! a list of required Effects (Plan).

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
    /// Resource exists but not in desired state -> needs deletion
    Delete(State),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
///
/// Attributes the schema marks as computed-only never trigger an update.
/// A settable, non-computed attribute present in state but no longer
/// configured is reported as changed so the update clears it.
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        if let Some(schema) = schema
            && schema
                .attributes
                .get(key)
                .is_some_and(|attr| attr.is_read_only())
        {
            continue;
        }

        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    // Unset attributes; without a schema there is no telling which are settable
    if let Some(schema) = schema {
        for key in current.keys() {
            if desired.contains_key(key) || key.starts_with('_') {
                continue;
            }
            if schema
                .attributes
                .get(key)
                .is_some_and(|attr| (attr.required || attr.optional) && !attr.computed)
            {
                changed.push(key.clone());
            }
        }
    }

    changed.sort();
    changed
}

/// Compute Diff for multiple resources and generate a Plan
///
/// `desired` resources should already be planned through their schema.
/// States without a desired counterpart are scheduled for deletion.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        let d = diff(resource, &current, schemas.get(&resource.id.resource_type));

        match d {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => {
                plan.add(Effect::Update { id, from, to });
            }
            Diff::NoChange(_) => {}
            Diff::Delete(state) => plan.add(Effect::Delete(state)),
        }
    }

    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|s| s.exists && !desired.iter().any(|r| r.id == s.id))
        .collect();
    orphans.sort_by(|a, b| {
        (&a.id.resource_type, &a.id.name).cmp(&(&b.id.resource_type, &b.id.name))
    });
    for state in orphans {
        plan.add(Effect::Delete(state.clone()));
    }

    plan
}

/// Plan the deletion of every existing state
pub fn destroy_plan(states: &[State]) -> Plan {
    let mut plan = Plan::new();
    for state in states.iter().filter(|s| s.exists) {
        plan.add(Effect::Delete(state.clone()));
    }
    plan
}
