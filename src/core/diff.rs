//! Diff engine — field-level structural comparison of two graphs.
//!
//! Comparison is driven by per-kind declarative field rules rather than
//! hand-written per-type code: each rule names a field, a comparison mode,
//! and optionally the identifier keys aligning collection elements. One
//! generic routine consumes the rules over the components' flat-record form.

use crate::core::component::{Action, Component};
use crate::core::error::{Error, Result};
use crate::core::graph::Graph;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

// ============================================================================
// Field rules
// ============================================================================

/// How a field participates in comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bookkeeping or derived — excluded from comparison entirely.
    Ignored,
    /// A difference produces an in-place update.
    Mutable,
    /// Any difference forces destroy-and-recreate of the whole component.
    Immutable,
}

/// One field's comparison rule.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub mode: Mode,
    /// Sub-fields used to align collection elements between old and new
    /// before per-element diffing. Empty for scalar fields.
    pub identifier: &'static [&'static str],
}

impl FieldRule {
    pub const fn mutable(field: &'static str) -> Self {
        Self {
            field,
            mode: Mode::Mutable,
            identifier: &[],
        }
    }

    pub const fn immutable(field: &'static str) -> Self {
        Self {
            field,
            mode: Mode::Immutable,
            identifier: &[],
        }
    }

    pub const fn collection(field: &'static str, identifier: &'static [&'static str]) -> Self {
        Self {
            field,
            mode: Mode::Mutable,
            identifier,
        }
    }
}

// ============================================================================
// Changelog
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Mutate,
    Replace,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutate => write!(f, "mutate"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

/// One field-level difference between two same-kind components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub component_id: String,
    pub field: String,
    pub old: Value,
    pub new: Value,
    pub kind: ChangeKind,
}

// ============================================================================
// Value comparison
// ============================================================================

/// An unresolved placeholder: a value known to be filled in only after
/// provisioning (a NAT's translated IP, an instance's assigned address).
fn unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Plain value inequality, with one explicit exception: an unresolved
/// placeholder on the new side is never a change against a concrete old
/// value — otherwise every diff would spuriously flag such fields.
// TODO: if a schema ever allows a field to be legitimately cleared, this
// exception needs a per-rule opt-out to distinguish the two cases.
fn differs(old: &Value, new: &Value) -> bool {
    if old == new {
        return false;
    }
    if unset(new) {
        return false;
    }
    true
}

/// Objects are compared key-by-key so element sub-fields get the same
/// placeholder exception as top-level scalars.
fn element_differs(old: &Value, new: &Value) -> bool {
    match (old.as_object(), new.as_object()) {
        (Some(o), Some(n)) => {
            let mut keys: Vec<&String> = o.keys().chain(n.keys()).collect();
            keys.sort_unstable();
            keys.dedup();
            keys.into_iter().any(|k| {
                differs(
                    o.get(k).unwrap_or(&Value::Null),
                    n.get(k).unwrap_or(&Value::Null),
                )
            })
        }
        _ => differs(old, new),
    }
}

fn key_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn element_key(element: &Value, identifier: &[&str]) -> String {
    identifier
        .iter()
        .map(|k| key_text(element.get(*k)))
        .collect::<Vec<_>>()
        .join("/")
}

fn rule_kind(mode: Mode) -> ChangeKind {
    match mode {
        Mode::Immutable => ChangeKind::Replace,
        _ => ChangeKind::Mutate,
    }
}

/// Align two collections by identifier key (first-available match in
/// encounter order) and diff matched elements; additions and removals are
/// changes of the collection field.
fn diff_collection(
    component_id: &str,
    rule: &FieldRule,
    old_items: &[Value],
    new_items: &[Value],
    changes: &mut Vec<Change>,
) {
    let kind = rule_kind(rule.mode);
    let mut matched = vec![false; old_items.len()];

    for new_item in new_items {
        let key = element_key(new_item, rule.identifier);
        let slot = old_items.iter().enumerate().position(|(i, old_item)| {
            !matched[i] && element_key(old_item, rule.identifier) == key
        });
        match slot {
            Some(i) => {
                matched[i] = true;
                if element_differs(&old_items[i], new_item) {
                    changes.push(Change {
                        component_id: component_id.to_string(),
                        field: format!("{}[{}]", rule.field, key),
                        old: old_items[i].clone(),
                        new: new_item.clone(),
                        kind,
                    });
                }
            }
            None => changes.push(Change {
                component_id: component_id.to_string(),
                field: format!("{}[{}]", rule.field, key),
                old: Value::Null,
                new: new_item.clone(),
                kind,
            }),
        }
    }

    for (i, old_item) in old_items.iter().enumerate() {
        if !matched[i] {
            changes.push(Change {
                component_id: component_id.to_string(),
                field: format!("{}[{}]", rule.field, element_key(old_item, rule.identifier)),
                old: old_item.clone(),
                new: Value::Null,
                kind,
            });
        }
    }
}

// ============================================================================
// Component diff
// ============================================================================

/// Field-level changelog between a desired component and its provisioned
/// counterpart. Components of different kinds never pair (same logical ID
/// implies same kind), so the changelog is empty.
pub fn component_changelog(new: &Component, old: &Component) -> Result<Vec<Change>> {
    if new.kind() != old.kind() {
        return Ok(Vec::new());
    }
    let new_record = serde_json::to_value(new).map_err(|e| Error::Serialize(e.to_string()))?;
    let old_record = serde_json::to_value(old).map_err(|e| Error::Serialize(e.to_string()))?;
    let component_id = new.id();

    let mut changes = Vec::new();
    for rule in new.schema() {
        if rule.mode == Mode::Ignored {
            continue;
        }
        let old_value = old_record.get(rule.field).cloned().unwrap_or(Value::Null);
        let new_value = new_record.get(rule.field).cloned().unwrap_or(Value::Null);

        match (
            rule.identifier.is_empty(),
            old_value.as_array(),
            new_value.as_array(),
        ) {
            (false, Some(old_items), Some(new_items)) => {
                diff_collection(&component_id, rule, old_items, new_items, &mut changes);
            }
            _ => {
                if differs(&old_value, &new_value) {
                    changes.push(Change {
                        component_id: component_id.clone(),
                        field: rule.field.to_string(),
                        old: old_value,
                        new: new_value,
                        kind: rule_kind(rule.mode),
                    });
                }
            }
        }
    }
    Ok(changes)
}

// ============================================================================
// Graph diff
// ============================================================================

/// The full reconciliation plan between two graphs.
#[derive(Debug, Clone)]
pub struct GraphDiff {
    /// Desired components (plus stateful deletions) with actions assigned.
    pub graph: Graph,
    pub changelog: Vec<Change>,
    pub to_create: u32,
    pub to_update: u32,
    pub to_replace: u32,
    pub to_delete: u32,
    pub unchanged: u32,
}

impl GraphDiff {
    pub fn has_changes(&self) -> bool {
        self.to_create + self.to_update + self.to_replace + self.to_delete > 0
    }
}

/// Compare a desired graph against an existing snapshot.
///
/// - Present only in desired: create (find placeholders keep their action).
/// - Present only in existing: delete when stateful, silently dropped
///   otherwise.
/// - Present in both: none/update/replace from the field-level changelog.
pub fn diff_graphs(desired: &Graph, existing: &Graph) -> Result<GraphDiff> {
    let mut graph = Graph::new(desired.id.clone(), desired.name.clone());
    graph.user = desired.user.clone();

    let mut changelog = Vec::new();
    let (mut to_create, mut to_update, mut to_replace, mut to_delete, mut unchanged) =
        (0u32, 0u32, 0u32, 0u32, 0u32);

    for component in desired.components() {
        let mut planned = component.clone();
        match existing.component(&component.id()) {
            None => {
                if planned.action() != Action::Find {
                    planned.set_action(Action::Create);
                }
                to_create += 1;
            }
            Some(old) => {
                let changes = component_changelog(component, old)?;
                if changes.iter().any(|c| c.kind == ChangeKind::Replace) {
                    planned.set_action(Action::Replace);
                    to_replace += 1;
                } else if changes.is_empty() {
                    planned.set_action(Action::None);
                    unchanged += 1;
                } else {
                    planned.set_action(Action::Update);
                    to_update += 1;
                }
                changelog.extend(changes);
            }
        }
        graph.push(planned)?;
    }

    for component in existing.components() {
        if desired.component(&component.id()).is_some() {
            continue;
        }
        if !component.is_stateful() {
            log::debug!("dropping non-stateful component '{}'", component.id());
            continue;
        }
        let mut planned = component.clone();
        planned.set_action(Action::Delete);
        graph.push(planned)?;
        to_delete += 1;
    }

    // Desired edges first, then surviving edges of deleted components so a
    // downstream executor can still order destroys.
    for edge in desired.edges() {
        graph.connect(&edge.from, &edge.to)?;
    }
    for edge in existing.edges() {
        if graph.component(&edge.from).is_some() && graph.component(&edge.to).is_some() {
            graph.connect(&edge.from, &edge.to)?;
        }
    }

    Ok(GraphDiff {
        graph,
        changelog,
        to_create,
        to_update,
        to_replace,
        to_delete,
        unchanged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::firewall::{Firewall, FirewallRule};
    use crate::components::gateway::Gateway;
    use crate::components::instance::Instance;
    use crate::components::nat::{Nat, NatRule};
    use crate::components::network::Network;
    use crate::core::component::{Meta, Provider};
    use serde_json::json;

    fn instance(name: &str, cpus: u32, network: &str) -> Component {
        Component::Instance(Instance {
            meta: Meta::new(name, Provider::Aws),
            image: "debian-13".to_string(),
            cpus,
            memory: 2048,
            network_name: network.to_string(),
            ..Instance::default()
        })
    }

    fn network(name: &str, subnet: &str) -> Component {
        Component::Network(Network {
            meta: Meta::new(name, Provider::Aws),
            subnet: subnet.to_string(),
            ..Network::default()
        })
    }

    #[test]
    fn test_differs_placeholder_exception() {
        // Empty new-side never counts against a concrete old value.
        assert!(!differs(&json!("203.0.113.7"), &json!("")));
        assert!(!differs(&json!("203.0.113.7"), &Value::Null));
        // A concrete new value against an empty old one is a real change.
        assert!(differs(&json!(""), &json!("203.0.113.7")));
        assert!(differs(&json!("a"), &json!("b")));
        assert!(!differs(&json!(""), &Value::Null));
    }

    #[test]
    fn test_identical_components_no_changes() {
        let a = instance("foo", 1, "bar");
        assert!(component_changelog(&a, &a).unwrap().is_empty());
    }

    #[test]
    fn test_mutable_field_mutates() {
        let old = instance("foo", 1, "bar");
        let new = instance("foo", 2, "bar");
        let changes = component_changelog(&new, &old).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].component_id, "instance::foo");
        assert_eq!(changes[0].field, "cpus");
        assert_eq!(changes[0].old, json!(1));
        assert_eq!(changes[0].new, json!(2));
        assert_eq!(changes[0].kind, ChangeKind::Mutate);
    }

    #[test]
    fn test_immutable_field_replaces() {
        let old = instance("foo", 1, "bar");
        let new = instance("foo", 1, "other");
        let changes = component_changelog(&new, &old).unwrap();
        assert!(changes.iter().any(|c| c.kind == ChangeKind::Replace));
    }

    #[test]
    fn test_bookkeeping_fields_ignored() {
        let old = instance("foo", 1, "bar");
        let mut new = instance("foo", 1, "bar");
        new.set_action(Action::Create);
        new.meta_mut().provider_id = "i-123".to_string();
        assert!(component_changelog(&new, &old).unwrap().is_empty());
    }

    fn firewall(rules: Vec<FirewallRule>) -> Component {
        Component::Firewall(Firewall {
            meta: Meta::new("edge", Provider::Aws),
            network_name: "bar".to_string(),
            rules,
            ..Firewall::default()
        })
    }

    fn rule(source: &str, port: u16) -> FirewallRule {
        FirewallRule {
            protocol: "tcp".to_string(),
            source: source.to_string(),
            port_from: port,
            port_to: port,
        }
    }

    #[test]
    fn test_collection_aligned_by_identifier() {
        let old = firewall(vec![rule("10.0.0.0/16", 22), rule("0.0.0.0/0", 443)]);
        let mut changed = rule("0.0.0.0/0", 443);
        changed.port_to = 8443;
        let new = firewall(vec![rule("10.0.0.0/16", 22), changed]);

        let changes = component_changelog(&new, &old).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "rules[0.0.0.0/0/443]");
        assert_eq!(changes[0].kind, ChangeKind::Mutate);
    }

    #[test]
    fn test_collection_addition_and_removal() {
        let old = firewall(vec![rule("10.0.0.0/16", 22)]);
        let new = firewall(vec![rule("10.0.0.0/16", 2222)]);
        let changes = component_changelog(&new, &old).unwrap();
        // Different identifier: one removal and one addition.
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(|c| c.new == Value::Null));
        assert!(changes.iter().any(|c| c.old == Value::Null));
    }

    #[test]
    fn test_nat_unresolved_translation_not_a_change() {
        let resolved = NatRule {
            protocol: "tcp".to_string(),
            origin_port: 80,
            translation_port: 8080,
            translation_ip: "203.0.113.7".to_string(),
        };
        let mut pending = resolved.clone();
        pending.translation_ip = String::new();

        let old = Component::Nat(Nat {
            meta: Meta::new("egress", Provider::Aws),
            network_name: "bar".to_string(),
            rules: vec![resolved],
            ..Nat::default()
        });
        let new = Component::Nat(Nat {
            meta: Meta::new("egress", Provider::Aws),
            network_name: "bar".to_string(),
            rules: vec![pending],
            ..Nat::default()
        });
        assert!(component_changelog(&new, &old).unwrap().is_empty());
    }

    #[test]
    fn test_diff_same_graph_is_all_none() {
        let mut g = Graph::new("g-1", "demo");
        g.push(network("bar", "10.1.0.0/24")).unwrap();
        g.push(instance("foo", 1, "bar")).unwrap();
        g.connect("network::bar", "instance::foo").unwrap();

        let diff = diff_graphs(&g, &g).unwrap();
        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged, 2);
        assert!(diff
            .graph
            .components()
            .iter()
            .all(|c| c.action() == Action::None));
    }

    #[test]
    fn test_diff_against_empty_is_all_create() {
        let mut g = Graph::new("g-1", "demo");
        g.push(network("bar", "10.1.0.0/24")).unwrap();
        g.push(instance("foo", 1, "bar")).unwrap();

        let diff = diff_graphs(&g, &Graph::default()).unwrap();
        assert_eq!(diff.to_create, 2);
        assert!(diff
            .graph
            .components()
            .iter()
            .all(|c| c.action() == Action::Create));
    }

    #[test]
    fn test_diff_empty_against_existing_is_all_delete() {
        let mut g = Graph::new("g-1", "demo");
        g.push(network("bar", "10.1.0.0/24")).unwrap();
        g.push(instance("foo", 1, "bar")).unwrap();
        g.connect("network::bar", "instance::foo").unwrap();

        let diff = diff_graphs(&Graph::default(), &g).unwrap();
        assert_eq!(diff.to_delete, 2);
        assert!(diff
            .graph
            .components()
            .iter()
            .all(|c| c.action() == Action::Delete));
        // Edges survive so destroys can still be ordered.
        assert!(diff.graph.has_edge("network::bar", "instance::foo"));
    }

    #[test]
    fn test_non_stateful_components_dropped_silently() {
        let mut g = Graph::new("g-1", "demo");
        g.push(network("bar", "10.1.0.0/24")).unwrap();
        g.push(Component::Gateway(Gateway {
            meta: Meta::new("bar", Provider::Aws),
            network_name: "bar".to_string(),
            ..Gateway::default()
        }))
        .unwrap();

        let diff = diff_graphs(&Graph::default(), &g).unwrap();
        assert_eq!(diff.to_delete, 1);
        assert!(diff.graph.component("gateway::bar").is_none());
    }

    #[test]
    fn test_update_flow_mixes_actions() {
        let mut existing = Graph::new("g-1", "demo");
        existing.push(network("bar", "10.1.0.0/24")).unwrap();
        existing.push(instance("foo", 1, "bar")).unwrap();

        let mut desired = Graph::new("g-1", "demo");
        desired.push(network("bar", "10.1.0.0/24")).unwrap();
        desired.push(instance("foo", 2, "bar")).unwrap();
        desired.push(instance("extra", 1, "bar")).unwrap();

        let diff = diff_graphs(&desired, &existing).unwrap();
        assert_eq!(diff.to_create, 1);
        assert_eq!(diff.to_update, 1);
        assert_eq!(diff.unchanged, 1);
        assert_eq!(diff.to_delete, 0);
        assert_eq!(
            diff.graph.component("instance::foo").unwrap().action(),
            Action::Update
        );
        assert_eq!(diff.changelog.len(), 1);
        assert_eq!(diff.changelog[0].field, "cpus");
    }
}
