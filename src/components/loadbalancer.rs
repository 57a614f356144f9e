//! Load balancer component — listeners fronting a set of instances.

use crate::core::component::{logical_id, valid_name, ComponentKind, Meta};
use crate::core::diff::FieldRule;
use crate::core::graph::Graph;
use crate::core::reference::sync_pair_list;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<Listener>,

    /// Target instance names, paired index-for-index with `instance_refs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_refs: Vec<String>,

    /// Assigned by the provider; empty until provisioned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dns_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub instance_port: u16,

    #[serde(default)]
    pub protocol: String,

    #[serde(default)]
    pub certificate: String,
}

const PROTOCOLS: &[&str] = &["http", "https", "tcp"];

/// Listeners are aligned by front port; target membership updates in place.
pub static SCHEMA: &[FieldRule] = &[
    FieldRule::collection("listeners", &["port"]),
    FieldRule::mutable("instances"),
];

impl LoadBalancer {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid load balancer name '{}'", self.meta.name));
        }
        if self.listeners.is_empty() {
            return Err("load balancer needs at least one listener".to_string());
        }
        for listener in &self.listeners {
            if !PROTOCOLS.contains(&listener.protocol.as_str()) {
                return Err(format!("unknown listener protocol '{}'", listener.protocol));
            }
            if listener.port < 1 || listener.instance_port < 1 {
                return Err("listener ports must be at least 1".to_string());
            }
            if listener.protocol == "https" && listener.certificate.is_empty() {
                return Err(format!(
                    "listener on port {} uses https but has no certificate",
                    listener.port
                ));
            }
        }
        for (i, name) in self.instances.iter().enumerate() {
            let reference = self.instance_refs.get(i).map(String::as_str).unwrap_or("");
            if name.is_empty() && reference.is_empty() {
                return Err(format!("target {} references no instance", i));
            }
        }
        Ok(())
    }

    pub fn dependencies(&self) -> Vec<String> {
        self.instances
            .iter()
            .filter(|name| !name.is_empty())
            .map(|name| logical_id(ComponentKind::Instance, name))
            .collect()
    }

    pub fn rebuild(&mut self, lookup: &Graph) {
        sync_pair_list(
            ComponentKind::Instance,
            "provider_id",
            &mut self.instances,
            &mut self.instance_refs,
            lookup,
        );
    }

    pub fn merge(&mut self, other: &LoadBalancer) {
        self.meta.absorb(&other.meta);
        if !other.dns_name.is_empty() {
            self.dns_name = other.dns_name.clone();
        }
    }
}
