//! Credentials pseudo-component — `credentials::<provider>`.
//!
//! Other components reference it indirectly via template expressions, never
//! through a direct dependency edge, and it is never diffed or destroyed.

use crate::core::component::Meta;
use crate::core::diff::FieldRule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(flatten)]
    pub meta: Meta,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub datacenter: String,
}

/// Nothing on a credentials component participates in comparison.
pub static SCHEMA: &[FieldRule] = &[];

impl Credential {
    pub fn validate(&self) -> Result<(), String> {
        if self.meta.name.is_empty() {
            return Err("credentials must carry a provider name".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::{Component, Provider};

    #[test]
    fn test_logical_id_is_credentials_provider() {
        let c = Component::Credentials(Credential {
            meta: Meta::new("aws", Provider::Aws),
            datacenter: "eu-west-1".to_string(),
        });
        assert_eq!(c.id(), "credentials::aws");
        assert!(!c.is_stateful());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_missing_name_rejected() {
        let c = Credential::default();
        assert!(c.validate().is_err());
    }
}
