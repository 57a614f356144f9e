//! Lazy cross-component references expressed as template expressions.
//!
//! A reference pair is two fields: a stable human-authored name and a
//! reference that is either a literal provider-assigned ID or a template
//! expression of the form `{{ component.<kind>::<name>.<field> }}` that a
//! downstream executor resolves once the sibling's provider ID is known.
//! The core only constructs and normalizes these, never evaluates them.

use crate::core::component::{logical_id, ComponentKind, ID_DELIMITER};
use crate::core::graph::Graph;

/// A normalized cross-component reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// An opaque provider-assigned identifier.
    Literal(String),
    /// A lazily-resolved lookup of a sibling's provider-observed field.
    Query {
        kind: ComponentKind,
        name: String,
        field: String,
    },
}

impl Reference {
    pub fn query(kind: ComponentKind, name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Query {
            kind,
            name: name.into(),
            field: field.into(),
        }
    }

    /// Parse a reference field. Anything that is not a well-formed template
    /// expression is a literal.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let Some(inner) = trimmed
            .strip_prefix("{{")
            .and_then(|s| s.strip_suffix("}}"))
        else {
            return Self::Literal(raw.to_string());
        };
        let Some(expr) = inner.trim().strip_prefix("component.") else {
            return Self::Literal(raw.to_string());
        };
        let Some((id, field)) = expr.rsplit_once('.') else {
            return Self::Literal(raw.to_string());
        };
        let Some((kind, name)) = id.split_once(ID_DELIMITER) else {
            return Self::Literal(raw.to_string());
        };
        match ComponentKind::parse(kind) {
            Some(kind) if !name.is_empty() && !field.is_empty() => Self::Query {
                kind,
                name: name.to_string(),
                field: field.to_string(),
            },
            _ => Self::Literal(raw.to_string()),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Literal(id) => id.clone(),
            Self::Query { kind, name, field } => {
                format!("{{{{ component.{}.{} }}}}", logical_id(*kind, name), field)
            }
        }
    }
}

/// Reconcile one (name, reference) pair against the graph.
///
/// - Name set, reference empty: synthesize the template expression.
/// - Reference set, name empty: a template form carries the name; a literal
///   is looked up by provider ID, and stays unresolved when the resource
///   lives outside this graph (imported state).
/// - Both set: never overwritten.
///
/// Safe to invoke any number of times in any visit order.
pub fn sync_pair(
    kind: ComponentKind,
    field: &str,
    name: &mut String,
    reference: &mut String,
    lookup: &Graph,
) {
    if !name.is_empty() && reference.is_empty() {
        *reference = Reference::query(kind, name.clone(), field).render();
    } else if name.is_empty() && !reference.is_empty() {
        match Reference::parse(reference) {
            Reference::Query { name: n, .. } => *name = n,
            Reference::Literal(pid) => {
                if let Some(sibling) = lookup.find_by_provider_id(&pid) {
                    *name = sibling.name().to_string();
                }
            }
        }
    }
}

/// Reconcile a parallel pair of lists element-wise, padding the shorter side
/// so indices stay aligned across rebuilds.
pub fn sync_pair_list(
    kind: ComponentKind,
    field: &str,
    names: &mut Vec<String>,
    references: &mut Vec<String>,
    lookup: &Graph,
) {
    let len = names.len().max(references.len());
    names.resize(len, String::new());
    references.resize(len, String::new());
    for i in 0..len {
        sync_pair(kind, field, &mut names[i], &mut references[i], lookup);
    }
}

/// True when the pair denotes one consistent sibling: at least one side is
/// populated, and a populated template reference names the same sibling.
pub fn pair_consistent(name: &str, reference: &str) -> bool {
    if name.is_empty() && reference.is_empty() {
        return false;
    }
    if name.is_empty() || reference.is_empty() {
        return true;
    }
    match Reference::parse(reference) {
        Reference::Query { name: n, .. } => n == name,
        Reference::Literal(_) => true,
    }
}
