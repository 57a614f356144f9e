//! Compute instance component.

use crate::core::component::{logical_id, valid_name, ComponentKind, Meta};
use crate::core::diff::FieldRule;
use crate::core::graph::Graph;
use crate::core::reference::{pair_consistent, sync_pair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub cpus: u32,

    /// Memory in megabytes.
    #[serde(default)]
    pub memory: u32,

    #[serde(default)]
    pub network_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_ref: String,

    /// Address assigned by the provider; empty until provisioned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<Disk>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    pub device: String,
    pub size_gb: u32,
}

/// Image and network placement cannot change in place; sizing can.
pub static SCHEMA: &[FieldRule] = &[
    FieldRule::immutable("image"),
    FieldRule::immutable("network_name"),
    FieldRule::mutable("cpus"),
    FieldRule::mutable("memory"),
    FieldRule::collection("disks", &["device"]),
];

impl Instance {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid instance name '{}'", self.meta.name));
        }
        if self.image.is_empty() {
            return Err("instance image must be set".to_string());
        }
        if self.cpus < 1 {
            return Err("cpus must be at least 1".to_string());
        }
        if self.memory < 256 {
            return Err("memory must be at least 256 MB".to_string());
        }
        if !pair_consistent(&self.network_name, &self.network_ref) {
            return Err("instance must reference a network".to_string());
        }
        for (i, disk) in self.disks.iter().enumerate() {
            if disk.device.is_empty() {
                return Err(format!("disk {} has no device", i));
            }
            if disk.size_gb < 1 {
                return Err(format!("disk '{}' must be at least 1 GB", disk.device));
            }
            if self.disks.iter().filter(|d| d.device == disk.device).count() > 1 {
                return Err(format!("duplicate disk device '{}'", disk.device));
            }
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

    /// Carry provider-observed fields over from a provisioned counterpart.
    pub fn merge(&mut self, other: &Instance) {
        self.meta.absorb(&other.meta);
        if !other.ip.is_empty() {
            self.ip = other.ip.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::Provider;

    fn instance() -> Instance {
        Instance {
            meta: Meta::new("web-1", Provider::Aws),
            image: "debian-13".to_string(),
            cpus: 2,
            memory: 2048,
            network_name: "web".to_string(),
            ..Instance::default()
        }
    }

    #[test]
    fn test_valid_instance() {
        assert!(instance().validate().is_ok());
    }

    #[test]
    fn test_range_checks() {
        let mut i = instance();
        i.cpus = 0;
        assert!(i.validate().unwrap_err().contains("cpus"));

        let mut i = instance();
        i.memory = 128;
        assert!(i.validate().unwrap_err().contains("memory"));
    }

    #[test]
    fn test_duplicate_disk_device_rejected() {
        let mut i = instance();
        i.disks = vec![
            Disk { device: "vdb".to_string(), size_gb: 10 },
            Disk { device: "vdb".to_string(), size_gb: 20 },
        ];
        assert!(i.validate().unwrap_err().contains("duplicate disk device"));
    }

    #[test]
    fn test_merge_carries_observed_fields() {
        let mut desired = instance();
        let mut observed = instance();
        observed.meta.provider_id = "i-0abc".to_string();
        observed.ip = "10.0.0.5".to_string();

        desired.merge(&observed);
        assert_eq!(desired.meta.provider_id, "i-0abc");
        assert_eq!(desired.ip, "10.0.0.5");
    }

    #[test]
    fn test_rebuild_idempotent() {
        let g = Graph::new("g", "t");
        let mut a = instance();
        a.rebuild(&g);
        let snapshot = a.clone();
        a.rebuild(&g);
        assert_eq!(a, snapshot);
    }
}
