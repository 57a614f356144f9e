//! Network component — an isolated address range.

use crate::components::valid_cidr;
use crate::core::component::{valid_name, Meta};
use crate::core::diff::FieldRule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default)]
    pub subnet: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<String>,
}

/// Moving a network to another address range means recreating it.
pub static SCHEMA: &[FieldRule] = &[
    FieldRule::immutable("subnet"),
    FieldRule::mutable("dns_servers"),
];

impl Network {
    pub fn validate(&self) -> Result<(), String> {
        if !valid_name(&self.meta.name) {
            return Err(format!("invalid network name '{}'", self.meta.name));
        }
        if !valid_cidr(&self.subnet) {
            return Err(format!("subnet '{}' is not a valid CIDR range", self.subnet));
        }
        for server in &self.dns_servers {
            if !crate::components::valid_ipv4(server) {
                return Err(format!("dns server '{}' is not a valid address", server));
            }
        }
        Ok(())
    }
}
