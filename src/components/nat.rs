//! NAT component — port translation rules attached to a network.

use crate::core::component::{logical_id, valid_name, ComponentKind, Meta};
use crate::core::diff::FieldRule;
use crate::core::graph::Graph;
use crate::core::reference::{pair_consistent, sync_pair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nat {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default)]
    pub network_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_ref: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<NatRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NatRule {
    #[serde(default)]
    pub protocol: String,

    #[serde(default)]
    pub origin_port: u16,

    #[serde(default)]
    pub translation_port: u16,

    /// Translated address, assigned by the provider; empty until the rule
    /// has been provisioned.
    #[serde(default)]
    pub translation_ip: String,
}

/// Rules are aligned by protocol and origin port; the translated address is
/// provider-assigned and covered by the placeholder exception.
pub static SCHEMA: &[FieldRule] = &[
    FieldRule::immutable("network_name"),
    FieldRule::collection("rules", &["protocol", "origin_port"]),
];

impl Nat {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid nat name '{}'", self.meta.name));
        }
        if !pair_consistent(&self.network_name, &self.network_ref) {
            return Err("nat must reference a network".to_string());
        }
        for rule in &self.rules {
            if !matches!(rule.protocol.as_str(), "tcp" | "udp") {
                return Err(format!("unknown nat protocol '{}'", rule.protocol));
            }
            if rule.origin_port < 1 || rule.translation_port < 1 {
                return Err("nat ports must be at least 1".to_string());
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

    /// Carry observed translation addresses over from a provisioned
    /// counterpart, matching rules by protocol and origin port.
    pub fn merge(&mut self, other: &Nat) {
        self.meta.absorb(&other.meta);
        for rule in &mut self.rules {
            if !rule.translation_ip.is_empty() {
                continue;
            }
            let observed = other.rules.iter().find(|o| {
                o.protocol == rule.protocol && o.origin_port == rule.origin_port
            });
            if let Some(observed) = observed {
                rule.translation_ip = observed.translation_ip.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::Provider;

    fn nat(rules: Vec<NatRule>) -> Nat {
        Nat {
            meta: Meta::new("egress", Provider::Aws),
            network_name: "web".to_string(),
            rules,
            ..Nat::default()
        }
    }

    fn rule(protocol: &str, origin: u16, translation: u16) -> NatRule {
        NatRule {
            protocol: protocol.to_string(),
            origin_port: origin,
            translation_port: translation,
            translation_ip: String::new(),
        }
    }

    #[test]
    fn test_valid_nat() {
        assert!(nat(vec![rule("tcp", 80, 8080)]).validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        assert!(nat(vec![rule("tcp", 0, 8080)]).validate().is_err());
    }

    #[test]
    fn test_merge_carries_translation_ips() {
        let mut desired = nat(vec![rule("tcp", 80, 8080), rule("udp", 53, 53)]);
        let mut observed = nat(vec![rule("tcp", 80, 8080)]);
        observed.rules[0].translation_ip = "203.0.113.7".to_string();
        observed.meta.provider_id = "nat-1".to_string();

        desired.merge(&observed);
        assert_eq!(desired.rules[0].translation_ip, "203.0.113.7");
        assert!(desired.rules[1].translation_ip.is_empty());
        assert_eq!(desired.meta.provider_id, "nat-1");
    }
}
