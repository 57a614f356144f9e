//! Dependency resolver — turns a flat component list into a validated,
//! edge-connected graph.
//!
//! Two-pass: rebuild and validate every component first, then construct
//! edges, so resolution errors are never masked by partially built edges.
//! Re-running on an already-resolved graph changes nothing.

use crate::core::error::{Error, Result};
use crate::core::graph::Graph;
use indexmap::IndexMap;

/// Resolve a graph in place. Aborts on the first validation failure.
pub fn resolve(graph: &mut Graph) -> Result<()> {
    // Rebuild against a pre-pass snapshot so the outcome does not depend on
    // visit order: components reference siblings by name, never by rebuild
    // state, and missing sibling data is left for a later pass.
    let lookup = graph.clone();
    for component in graph.components_mut() {
        component.rebuild(&lookup);
    }

    for component in graph.components() {
        component.validate()?;
    }

    let mut edges: Vec<(String, String)> = Vec::new();
    for component in graph.components() {
        let id = component.id();
        for dependency in component.dependencies() {
            if graph.component(&dependency).is_none() {
                return Err(Error::UnresolvedDependency {
                    component: id,
                    dependency,
                });
            }
            edges.push((dependency, id.clone()));
        }
    }
    for (from, to) in edges {
        graph.connect(&from, &to)?;
    }

    connect_sequential(graph)?;

    // A resolved graph must admit a provisioning order.
    graph.ordered()?;

    log::debug!(
        "resolved graph '{}': {} components, {} edges",
        graph.name,
        graph.len(),
        graph.edges().len()
    );
    Ok(())
}

/// Serialize dependents that share a sequential origin: mutating one parent
/// concurrently (e.g. attaching several volumes to one instance) is unsafe,
/// so siblings are chained in graph order.
fn connect_sequential(graph: &mut Graph) -> Result<()> {
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for component in graph.components() {
        for origin in component.sequential_dependencies() {
            groups.entry(origin).or_default().push(component.id());
        }
    }
    for siblings in groups.values() {
        for pair in siblings.windows(2) {
            graph.connect(&pair[0], &pair[1])?;
        }
    }
    Ok(())
}
