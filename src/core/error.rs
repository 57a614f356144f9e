//! Central error taxonomy for compilation, resolution, and diffing.
//!
//! A compile either yields a fully validated, edge-connected graph or one of
//! these errors — there is no partial-success mode.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A component's own validation rejected its data.
    #[error("component '{id}' is invalid: {reason}")]
    Validation { id: String, reason: String },

    /// A declared dependency does not exist in the graph.
    #[error("could not resolve component dependency '{dependency}' of '{component}'")]
    UnresolvedDependency {
        component: String,
        dependency: String,
    },

    /// Two components map to the same logical ID.
    #[error("duplicate component id '{0}'")]
    DuplicateComponent(String),

    /// An edge endpoint does not resolve to an existing component.
    #[error("edge references unknown component '{0}'")]
    DanglingEdge(String),

    /// The dependency graph is not a DAG.
    #[error("dependency cycle detected involving: {0}")]
    DependencyCycle(String),

    /// The provider could not be inferred from the credentials payload.
    #[error("could not infer provider from credentials payload")]
    UnknownProvider,

    /// A generic graph document record failed to decode into a typed component.
    #[error("cannot decode component record: {0}")]
    Decode(String),

    /// A definition failed its structural checks.
    #[error("invalid definition: {0}")]
    Definition(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_component() {
        let e = Error::Validation {
            id: "instance::web-1".to_string(),
            reason: "cpus must be at least 1".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("instance::web-1"));
        assert!(msg.contains("cpus must be at least 1"));
    }

    #[test]
    fn test_unresolved_dependency_names_both_ends() {
        let e = Error::UnresolvedDependency {
            component: "instance::web-1".to_string(),
            dependency: "network::ghost".to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("could not resolve component dependency"));
        assert!(msg.contains("network::ghost"));
        assert!(msg.contains("instance::web-1"));
    }
}
