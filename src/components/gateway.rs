//! Gateway component — a network's egress point.
//!
//! Gateways are provisioned and torn down with their network, never on
//! their own, so the kind is not stateful: dropping one from the desired
//! graph produces no destroy action.

use crate::core::component::{logical_id, valid_name, ComponentKind, Meta};
use crate::core::diff::FieldRule;
use crate::core::graph::Graph;
use crate::core::reference::{pair_consistent, sync_pair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default)]
    pub network_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_ref: String,
}

pub static SCHEMA: &[FieldRule] = &[FieldRule::immutable("network_name")];

impl Gateway {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid gateway name '{}'", self.meta.name));
        }
        if !pair_consistent(&self.network_name, &self.network_ref) {
            return Err("gateway must reference a network".to_string());
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
