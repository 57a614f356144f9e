//! Graph — an ordered collection of components plus derived dependency edges.

use crate::core::component::{Component, ComponentKind};
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// A directed dependency edge: `from` must be provisioned before `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// An ordered sequence of components keyed by logical ID, plus edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub id: String,
    pub name: String,
    pub user: Option<String>,
    components: Vec<Component>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Append a component. Logical IDs are unique within a graph.
    pub fn push(&mut self, component: Component) -> Result<()> {
        let id = component.id();
        if self.component(&id).is_some() {
            return Err(Error::DuplicateComponent(id));
        }
        self.components.push(component);
        Ok(())
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id() == id)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id() == id)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [Component] {
        &mut self.components
    }

    pub fn by_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind() == kind)
    }

    pub fn by_group(&self, group: &str) -> impl Iterator<Item = &Component> + '_ {
        let group = group.to_string();
        self.components
            .iter()
            .filter(move |c| c.group() == Some(group.as_str()))
    }

    /// Find the component holding a given provider-assigned ID. Components
    /// not yet provisioned (empty provider ID) never match.
    pub fn find_by_provider_id(&self, provider_id: &str) -> Option<&Component> {
        if provider_id.is_empty() {
            return None;
        }
        self.components
            .iter()
            .find(|c| c.provider_id() == provider_id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    /// Connect a directed edge from a dependency to its dependent. Both
    /// endpoints must resolve to existing components; reconnecting an
    /// existing edge is a no-op so resolution stays idempotent.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<()> {
        if self.component(from).is_none() {
            return Err(Error::DanglingEdge(from.to_string()));
        }
        if self.component(to).is_none() {
            return Err(Error::DanglingEdge(to.to_string()));
        }
        if !self.has_edge(from, to) {
            self.edges.push(Edge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Deterministic topological provisioning order over the edges.
    /// Kahn's algorithm with alphabetical tie-breaking.
    pub fn ordered(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = self.components.iter().map(Component::id).collect();
        let mut in_degree: HashMap<String, usize> = HashMap::new();
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();

        for id in &ids {
            in_degree.insert(id.clone(), 0);
            adjacency.insert(id.clone(), Vec::new());
        }
        for edge in &self.edges {
            if let (Some(adj), Some(deg)) = (
                adjacency.get_mut(&edge.from),
                in_degree.get_mut(&edge.to),
            ) {
                adj.push(edge.to.clone());
                *deg += 1;
            }
        }

        let mut queue: VecDeque<String> = VecDeque::new();
        let mut zero_degree: Vec<String> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(id, _)| id.clone())
            .collect();
        zero_degree.sort();
        for id in zero_degree {
            queue.push_back(id);
        }

        let mut order = Vec::with_capacity(ids.len());
        while let Some(current) = queue.pop_front() {
            order.push(current.clone());

            let mut next_ready: Vec<String> = Vec::new();
            if let Some(neighbors) = adjacency.get(&current) {
                for neighbor in neighbors {
                    let degree = in_degree
                        .get_mut(neighbor)
                        .ok_or_else(|| Error::DanglingEdge(neighbor.clone()))?;
                    *degree -= 1;
                    if *degree == 0 {
                        next_ready.push(neighbor.clone());
                    }
                }
            }
            next_ready.sort();
            for id in next_ready {
                queue.push_back(id);
            }
        }

        if order.len() != ids.len() {
            let ordered: HashSet<&String> = order.iter().collect();
            let mut cycle_members: Vec<&str> = ids
                .iter()
                .filter(|id| !ordered.contains(id))
                .map(String::as_str)
                .collect();
            cycle_members.sort_unstable();
            return Err(Error::DependencyCycle(cycle_members.join(", ")));
        }

        Ok(order)
    }
}
