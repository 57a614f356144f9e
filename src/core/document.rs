//! Graph document — the wire format for stored graph snapshots.
//!
//! A document is a flat list of component records carrying the reserved
//! fields `_provider`, `_component`, `_component_id`, `_state`, `_action`
//! next to each kind's own fields. Loading reconstructs typed components by
//! dispatching on `_component`; unknown kinds are skipped so documents
//! written by newer versions still import.

use crate::core::component::{Component, ComponentKind};
use crate::core::error::{Error, Result};
use crate::core::graph::Graph;
use serde_json::{Map, Value};
use std::path::Path;

/// Render a graph into its generic document form.
pub fn encode(graph: &Graph) -> Result<Value> {
    let mut components = Vec::with_capacity(graph.len());
    for component in graph.components() {
        let mut record =
            serde_json::to_value(component).map_err(|e| Error::Serialize(e.to_string()))?;
        if let Some(map) = record.as_object_mut() {
            map.insert("_component_id".to_string(), Value::String(component.id()));
        }
        components.push(record);
    }

    let mut doc = Map::new();
    doc.insert("id".to_string(), Value::String(graph.id.clone()));
    doc.insert("name".to_string(), Value::String(graph.name.clone()));
    if let Some(user) = &graph.user {
        doc.insert("user".to_string(), Value::String(user.clone()));
    }
    doc.insert("components".to_string(), Value::Array(components));
    Ok(Value::Object(doc))
}

/// Reconstruct typed components from a generic document. The logical ID is
/// recomputed from each record's kind and name, never read back.
pub fn decode(doc: &Value) -> Result<Graph> {
    let mut graph = Graph::new(
        doc.get("id").and_then(Value::as_str).unwrap_or_default(),
        doc.get("name").and_then(Value::as_str).unwrap_or_default(),
    );
    graph.user = doc
        .get("user")
        .and_then(Value::as_str)
        .map(str::to_string);

    let records = doc
        .get("components")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Decode("document has no components list".to_string()))?;

    for record in records {
        let kind_tag = record
            .get("_component")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Decode("component record has no _component tag".to_string()))?;
        if ComponentKind::parse(kind_tag).is_none() {
            log::warn!("skipping component record of unknown kind '{}'", kind_tag);
            continue;
        }
        let component: Component = serde_json::from_value(record.clone())
            .map_err(|e| Error::Decode(format!("{}: {}", kind_tag, e)))?;
        graph.push(component)?;
    }
    Ok(graph)
}

/// Load a graph document from a YAML file.
pub fn load(path: &Path) -> Result<Graph> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let doc: Value = serde_yaml_ng::from_str(&content)
        .map_err(|e| Error::Decode(format!("invalid graph document {}: {}", path.display(), e)))?;
    decode(&doc)
}

/// Save a graph document atomically (write to temp, then rename).
pub fn save(path: &Path, graph: &Graph) -> Result<()> {
    let doc = encode(graph)?;
    let yaml = serde_yaml_ng::to_string(&doc).map_err(|e| Error::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml).map_err(|e| Error::Io {
        path: tmp_path.display().to_string(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}
