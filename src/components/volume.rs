//! Block volume component.
//!
//! Volumes attach to one instance. Attaching several volumes to the same
//! instance concurrently is unsafe on every supported provider, so the
//! instance is also a sequential dependency: the resolver serializes
//! sibling volumes sharing an instance.

use crate::core::component::{logical_id, valid_name, ComponentKind, Meta};
use crate::core::diff::FieldRule;
use crate::core::graph::Graph;
use crate::core::reference::{pair_consistent, sync_pair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default)]
    pub instance_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_ref: String,

    #[serde(default)]
    pub device: String,

    #[serde(default)]
    pub size_gb: u32,
}

/// Volumes grow in place; moving one to another device or instance means
/// recreating the attachment.
pub static SCHEMA: &[FieldRule] = &[
    FieldRule::immutable("instance_name"),
    FieldRule::immutable("device"),
    FieldRule::mutable("size_gb"),
];

impl Volume {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid volume name '{}'", self.meta.name));
        }
        if !pair_consistent(&self.instance_name, &self.instance_ref) {
            return Err("volume must reference an instance".to_string());
        }
        if self.device.is_empty() {
            return Err("volume device must be set".to_string());
        }
        if self.size_gb < 1 {
            return Err("volume size must be at least 1 GB".to_string());
        }
        Ok(())
    }

    pub fn dependencies(&self) -> Vec<String> {
        if self.instance_name.is_empty() {
            return Vec::new();
        }
        vec![logical_id(ComponentKind::Instance, &self.instance_name)]
    }

    pub fn sequential_dependencies(&self) -> Vec<String> {
        self.dependencies()
    }

    pub fn rebuild(&mut self, lookup: &Graph) {
        sync_pair(
            ComponentKind::Instance,
            "provider_id",
            &mut self.instance_name,
            &mut self.instance_ref,
            lookup,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::Provider;

    fn volume() -> Volume {
        Volume {
            meta: Meta::new("data", Provider::Aws),
            instance_name: "db-1".to_string(),
            device: "vdb".to_string(),
            size_gb: 100,
            ..Volume::default()
        }
    }

    #[test]
    fn test_valid_volume() {
        assert!(volume().validate().is_ok());
        assert_eq!(volume().dependencies(), vec!["instance::db-1"]);
    }

    #[test]
    fn test_sequential_dependencies_match_dependencies() {
        let v = volume();
        assert_eq!(v.sequential_dependencies(), v.dependencies());
    }

    #[test]
    fn test_size_check() {
        let mut v = volume();
        v.size_gb = 0;
        assert!(v.validate().unwrap_err().contains("at least 1 GB"));
    }
}
