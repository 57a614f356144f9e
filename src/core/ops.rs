//! Reconciliation operations — the external entry points of the core.
//!
//! Each operation produces a [`GraphDiff`] whose graph is stamped with the
//! caller-supplied scope, and fails with a named error when the provider
//! cannot be inferred from the credentials payload.

use crate::core::component::{Action, Component, IMPORTABLE};
use crate::core::definition::{compile, Credentials, Definition};
use crate::core::diff::{diff_graphs, GraphDiff};
use crate::core::error::Result;
use crate::core::graph::Graph;
use crate::core::resolver;

/// Caller-supplied identity stamped onto every produced graph.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub id: String,
    pub name: String,
    pub user: Option<String>,
}

impl Scope {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            user: None,
        }
    }
}

fn stamp(mut diff: GraphDiff, scope: &Scope) -> GraphDiff {
    diff.graph.id = scope.id.clone();
    diff.graph.name = scope.name.clone();
    diff.graph.user = scope.user.clone();
    diff
}

/// Compile a definition and diff it against nothing: an all-create plan.
pub fn create(scope: &Scope, definition: &Definition, credentials: &Credentials) -> Result<GraphDiff> {
    let desired = compile(definition, credentials)?;
    let diff = diff_graphs(&desired, &Graph::default())?;
    log::debug!("create '{}': {} components to create", scope.name, diff.to_create);
    Ok(stamp(diff, scope))
}

/// Compile a definition, merge provider-observed fields from the existing
/// snapshot into it, and diff the result against that snapshot.
pub fn update(
    scope: &Scope,
    definition: &Definition,
    existing: &Graph,
    credentials: &Credentials,
) -> Result<GraphDiff> {
    let mut desired = compile(definition, credentials)?;
    for component in desired.components_mut() {
        if let Some(counterpart) = existing.component(&component.id()) {
            component.merge(counterpart);
        }
    }
    // Re-derive computed fields now that observed values are in place.
    resolver::resolve(&mut desired)?;

    let diff = diff_graphs(&desired, existing)?;
    log::debug!(
        "update '{}': {} create, {} update, {} replace, {} delete",
        scope.name,
        diff.to_create,
        diff.to_update,
        diff.to_replace,
        diff.to_delete
    );
    Ok(stamp(diff, scope))
}

/// Rebuild and validate the existing snapshot, then diff nothing against it:
/// an all-delete plan over its stateful components.
pub fn delete(scope: &Scope, existing: &Graph, credentials: &Credentials) -> Result<GraphDiff> {
    credentials.provider()?;
    let mut existing = existing.clone();
    resolver::resolve(&mut existing)?;
    let diff = diff_graphs(&Graph::default(), &existing)?;
    Ok(stamp(diff, scope))
}

/// Direct diff between two graphs: the changes that take `from` to `to`.
pub fn diff(scope: &Scope, from: &Graph, to: &Graph) -> Result<GraphDiff> {
    let diff = diff_graphs(to, from)?;
    Ok(stamp(diff, scope))
}

/// Name filter for the import operation. Empty means everything.
#[derive(Debug, Clone, Default)]
pub struct ImportFilter {
    pub names: Vec<String>,
}

/// Build a query-only graph of find placeholders per importable kind, to be
/// populated by an external inventory scan, and diff it against nothing to
/// materialize a baseline.
pub fn import(scope: &Scope, credentials: &Credentials, filter: &ImportFilter) -> Result<GraphDiff> {
    let provider = credentials.provider()?;
    let names: Vec<&str> = if filter.names.is_empty() {
        vec!["*"]
    } else {
        filter.names.iter().map(String::as_str).collect()
    };

    let mut placeholders = Graph::new(scope.id.clone(), scope.name.clone());
    for kind in IMPORTABLE {
        for name in &names {
            if let Some(mut component) = Component::placeholder(*kind, name, provider) {
                component.set_action(Action::Find);
                placeholders.push(component)?;
            }
        }
    }

    let diff = diff_graphs(&placeholders, &Graph::default())?;
    Ok(stamp(diff, scope))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::ComponentKind;
    use crate::core::definition::parse_definition;
    use crate::core::diff::ChangeKind;
    use serde_json::json;

    fn credentials() -> Credentials {
        Credentials {
            access_key: "AKIA000".to_string(),
            secret_key: "secret".to_string(),
            datacenter: "eu-west-1".to_string(),
            ..Credentials::default()
        }
    }

    fn scope() -> Scope {
        let mut s = Scope::new("job-42", "demo");
        s.user = Some("ops".to_string());
        s
    }

    fn definition(cpus: u32, network: &str) -> Definition {
        parse_definition(&format!(
            r#"
version: "1.0"
name: demo
networks:
  {net}:
    subnet: 10.1.0.0/24
instances:
  foo:
    image: debian-13
    cpus: {cpus}
    memory: 2048
    network: {net}
"#,
            net = network,
            cpus = cpus,
        ))
        .unwrap()
    }

    #[test]
    fn test_create_is_all_create_and_stamped() {
        let diff = create(&scope(), &definition(1, "bar"), &credentials()).unwrap();
        assert_eq!(diff.graph.id, "job-42");
        assert_eq!(diff.graph.name, "demo");
        assert_eq!(diff.graph.user.as_deref(), Some("ops"));
        assert!(diff
            .graph
            .components()
            .iter()
            .all(|c| c.action() == Action::Create));
    }

    #[test]
    fn test_update_cpu_change_is_single_mutate() {
        let existing = compile(&definition(1, "bar"), &credentials()).unwrap();
        let diff = update(&scope(), &definition(2, "bar"), &existing, &credentials()).unwrap();

        assert_eq!(diff.to_update, 1);
        assert_eq!(diff.changelog.len(), 1);
        let change = &diff.changelog[0];
        assert_eq!(change.component_id, "instance::foo");
        assert_eq!(change.field, "cpus");
        assert_eq!(change.old, json!(1));
        assert_eq!(change.new, json!(2));
        assert_eq!(change.kind, ChangeKind::Mutate);
        assert_eq!(
            diff.graph.component("instance::foo").unwrap().action(),
            Action::Update
        );
    }

    #[test]
    fn test_update_network_change_is_replace() {
        let existing = compile(&definition(1, "bar"), &credentials()).unwrap();
        let diff = update(&scope(), &definition(1, "baz"), &existing, &credentials()).unwrap();

        assert_eq!(
            diff.graph.component("instance::foo").unwrap().action(),
            Action::Replace
        );
        // The old network is gone from the desired definition.
        assert_eq!(
            diff.graph.component("network::bar").unwrap().action(),
            Action::Delete
        );
        assert_eq!(
            diff.graph.component("network::baz").unwrap().action(),
            Action::Create
        );
    }

    #[test]
    fn test_update_merges_provider_observed_fields() {
        let mut existing = compile(&definition(1, "bar"), &credentials()).unwrap();
        existing
            .component_mut("instance::foo")
            .unwrap()
            .meta_mut()
            .provider_id = "i-0abc".to_string();

        let diff = update(&scope(), &definition(2, "bar"), &existing, &credentials()).unwrap();
        let foo = diff.graph.component("instance::foo").unwrap();
        assert_eq!(foo.provider_id(), "i-0abc");
        // The assigned ID itself never shows up as a change.
        assert!(diff.changelog.iter().all(|c| c.field == "cpus"));
    }

    #[test]
    fn test_delete_is_all_delete_for_stateful() {
        let existing = compile(&definition(1, "bar"), &credentials()).unwrap();
        let diff = delete(&scope(), &existing, &credentials()).unwrap();

        // Credentials pseudo-component is dropped, not destroyed.
        assert!(diff.graph.component("credentials::aws").is_none());
        assert_eq!(diff.to_delete, 2);
        assert!(diff
            .graph
            .components()
            .iter()
            .all(|c| c.action() == Action::Delete));
    }

    #[test]
    fn test_diff_direction_takes_from_to_to() {
        let from = compile(&definition(1, "bar"), &credentials()).unwrap();
        let to = compile(&definition(2, "bar"), &credentials()).unwrap();

        let d = diff(&scope(), &from, &to).unwrap();
        assert_eq!(d.to_update, 1);
        assert_eq!(d.changelog[0].old, json!(1));
        assert_eq!(d.changelog[0].new, json!(2));
    }

    #[test]
    fn test_import_builds_find_placeholders() {
        let diff = import(&scope(), &credentials(), &ImportFilter::default()).unwrap();

        assert_eq!(diff.graph.len(), IMPORTABLE.len());
        assert!(diff
            .graph
            .components()
            .iter()
            .all(|c| c.action() == Action::Find));
        assert!(diff.graph.component("network::*").is_some());
        assert!(diff
            .graph
            .by_kind(ComponentKind::Credentials)
            .next()
            .is_none());
    }

    #[test]
    fn test_operations_require_inferable_provider() {
        let no_creds = Credentials::default();
        let err = create(&scope(), &definition(1, "bar"), &no_creds).unwrap_err();
        assert!(err.to_string().contains("could not infer provider"));

        let existing = compile(&definition(1, "bar"), &credentials()).unwrap();
        assert!(delete(&scope(), &existing, &no_creds).is_err());
        assert!(import(&scope(), &no_creds, &ImportFilter::default()).is_err());
    }
}
