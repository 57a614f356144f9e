//! Firewall component — ingress rules attached to a network.

use crate::components::valid_cidr;
use crate::core::component::{logical_id, valid_name, ComponentKind, Meta};
use crate::core::diff::FieldRule;
use crate::core::graph::Graph;
use crate::core::reference::{pair_consistent, sync_pair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Firewall {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default)]
    pub network_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_ref: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<FirewallRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(default)]
    pub protocol: String,

    /// CIDR source; empty until an upstream reference resolves.
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub port_from: u16,

    #[serde(default)]
    pub port_to: u16,
}

const PROTOCOLS: &[&str] = &["tcp", "udp", "icmp", "any"];

/// Rules are aligned between old and new by source and starting port.
pub static SCHEMA: &[FieldRule] = &[
    FieldRule::immutable("network_name"),
    FieldRule::collection("rules", &["source", "port_from"]),
];

impl Firewall {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid firewall name '{}'", self.meta.name));
        }
        if !pair_consistent(&self.network_name, &self.network_ref) {
            return Err("firewall must reference a network".to_string());
        }
        for rule in &self.rules {
            if !PROTOCOLS.contains(&rule.protocol.as_str()) {
                return Err(format!("unknown rule protocol '{}'", rule.protocol));
            }
            if !rule.source.is_empty() && !valid_cidr(&rule.source) {
                return Err(format!("rule source '{}' is not a valid CIDR range", rule.source));
            }
            if matches!(rule.protocol.as_str(), "tcp" | "udp") {
                if rule.port_from < 1 {
                    return Err("rule port must be at least 1".to_string());
                }
                if rule.port_from > rule.port_to {
                    return Err(format!(
                        "rule port range {}-{} is inverted",
                        rule.port_from, rule.port_to
                    ));
                }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::Provider;

    fn firewall(rules: Vec<FirewallRule>) -> Firewall {
        Firewall {
            meta: Meta::new("edge", Provider::Aws),
            network_name: "web".to_string(),
            rules,
            ..Firewall::default()
        }
    }

    fn rule(protocol: &str, source: &str, from: u16, to: u16) -> FirewallRule {
        FirewallRule {
            protocol: protocol.to_string(),
            source: source.to_string(),
            port_from: from,
            port_to: to,
        }
    }

    #[test]
    fn test_valid_rules() {
        let fw = firewall(vec![
            rule("tcp", "0.0.0.0/0", 443, 443),
            rule("icmp", "10.0.0.0/16", 0, 0),
            // Source pending upstream resolution.
            rule("tcp", "", 22, 22),
        ]);
        assert!(fw.validate().is_ok());
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        let fw = firewall(vec![rule("quic", "0.0.0.0/0", 443, 443)]);
        assert!(fw.validate().unwrap_err().contains("quic"));
    }

    #[test]
    fn test_inverted_port_range_rejected() {
        let fw = firewall(vec![rule("tcp", "0.0.0.0/0", 443, 80)]);
        assert!(fw.validate().unwrap_err().contains("inverted"));
    }

    #[test]
    fn test_bad_source_rejected() {
        let fw = firewall(vec![rule("tcp", "everywhere", 443, 443)]);
        assert!(fw.validate().unwrap_err().contains("CIDR"));
    }
}
