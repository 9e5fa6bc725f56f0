//! Error types for the layout engine

use scene_model::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Duplicate component id '{id}' in container '{container}'")]
    DuplicateId { container: String, id: String },

    #[error("Component not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Component '{0}' is not a container")]
    NotAContainer(String),

    #[error("Component '{0}' already belongs to a container")]
    AlreadyParented(String),

    #[error("Adding '{child}' to '{container}' would create a cycle")]
    CyclicHierarchy { container: String, child: String },

    #[error("No component with id '{id}' in container '{container}'")]
    UnknownChild { container: String, id: String },

    #[error("Attribute '{name}' of '{component}' is solved directly and cannot be rebound")]
    ReservedAttribute { component: String, name: String },

    #[error("Constraint on '{id}' is outside the layout of '{container}'")]
    ForeignComponent { container: String, id: String },

    #[error("Infeasible layout in '{container}': unsatisfiable constraint over [{}]", .variables.join(", "))]
    InfeasibleLayout {
        container: String,
        variables: Vec<String>,
    },

    #[error("Unbounded layout in '{container}': {reason}")]
    UnboundedLayout { container: String, reason: String },

    #[error("Solver failure in '{container}': {reason}")]
    Solver { container: String, reason: String },
}

pub type Result<T> = std::result::Result<T, LayoutError>;
