//! Managed database component.

use crate::core::component::{logical_id, valid_name, ComponentKind, Meta};
use crate::core::diff::FieldRule;
use crate::core::graph::Graph;
use crate::core::reference::{pair_consistent, sync_pair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default)]
    pub engine: String,

    #[serde(default)]
    pub size_gb: u32,

    #[serde(default)]
    pub replicas: u32,

    #[serde(default)]
    pub encrypted: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encryption_key: String,

    #[serde(default)]
    pub network_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_ref: String,

    /// Connection endpoint assigned by the provider.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
}

const ENGINES: &[&str] = &["postgres", "mysql", "mariadb"];

/// Storage and replica counts scale in place; engine, placement, and
/// encryption are fixed at creation.
pub static SCHEMA: &[FieldRule] = &[
    FieldRule::immutable("engine"),
    FieldRule::immutable("network_name"),
    FieldRule::immutable("encrypted"),
    FieldRule::immutable("encryption_key"),
    FieldRule::mutable("size_gb"),
    FieldRule::mutable("replicas"),
];

impl Database {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid database name '{}'", self.meta.name));
        }
        if !ENGINES.contains(&self.engine.as_str()) {
            return Err(format!("unknown database engine '{}'", self.engine));
        }
        if self.size_gb < 1 {
            return Err("database storage must be at least 1 GB".to_string());
        }
        if self.replicas < 1 {
            return Err("database needs at least 1 replica".to_string());
        }
        if self.encrypted && self.encryption_key.is_empty() {
            return Err("encrypted storage requires an encryption key".to_string());
        }
        if !pair_consistent(&self.network_name, &self.network_ref) {
            return Err("database must reference a network".to_string());
        }
        Ok(())
    }

    pub fn dependencies(&self) -> Vec<String> {
        if self.network_name.is_empty() {
            return Vec::new();
        }
        vec![logical_id(ComponentKind::Network, &self.network_name)]
    }

    pub fn rebuild(&mut self, lookup: &Graph) {
        sync_pair(
            ComponentKind::Network,
            "provider_id",
            &mut self.network_name,
            &mut self.network_ref,
            lookup,
        );
    }

    pub fn merge(&mut self, other: &Database) {
        self.meta.absorb(&other.meta);
        if !other.endpoint.is_empty() {
            self.endpoint = other.endpoint.clone();
        }
    }
}
