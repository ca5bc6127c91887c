//! Effect - A single lifecycle call described as a value
//!
//! Effects are produced by the differ and executed by the Interpreter.
//! Building one has no side effect.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Refresh an existing resource from the remote service
    Read(State),
    /// Create a new resource from its planned configuration
    Create(Resource),
    /// Update an existing resource
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete an existing resource
    Delete(State),
}

impl Effect {
    /// Whether executing this Effect changes remote infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(state) | Effect::Delete(state) => &state.id,
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } => id,
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Read(state) => write!(f, "Read {}", state.id),
            Effect::Create(resource) => write!(f, "Create {}", resource.id),
            Effect::Update { id, .. } => write!(f, "Update {}", id),
            Effect::Delete(state) => write!(f, "Delete {}", state.id),
        }
    }
}
