//! Component contract — the typed unit of the graph.
//!
//! Every provisionable resource kind is a variant of [`Component`], a closed
//! tagged enum keyed by the `_component` field of the wire format. The enum
//! delegates the shared contract (identity, validation, dependencies,
//! rebuild, merge, diff schema) to the typed structs in `crate::components`.

use crate::components::credentials::Credential;
use crate::components::database::Database;
use crate::components::firewall::Firewall;
use crate::components::gateway::Gateway;
use crate::components::instance::Instance;
use crate::components::loadbalancer::LoadBalancer;
use crate::components::nat::Nat;
use crate::components::network::Network;
use crate::components::volume::Volume;
use crate::core::diff::FieldRule;
use crate::core::error::{Error, Result};
use crate::core::graph::Graph;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between kind and name in a logical ID.
pub const ID_DELIMITER: &str = "::";

/// Deterministic `kind::name` primary key of a component.
pub fn logical_id(kind: ComponentKind, name: &str) -> String {
    format!("{}{}{}", kind, ID_DELIMITER, name)
}

/// Component names are restricted so logical IDs and template expressions
/// stay unambiguous.
pub fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

// ============================================================================
// Provider
// ============================================================================

/// Supported providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Aws,
    Libvirt,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aws => write!(f, "aws"),
            Self::Libvirt => write!(f, "libvirt"),
        }
    }
}

// ============================================================================
// Component kind
// ============================================================================

/// Resource kind vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Credentials,
    Network,
    Gateway,
    Instance,
    Volume,
    Firewall,
    Nat,
    LoadBalancer,
    Database,
}

impl ComponentKind {
    /// Parse a wire-format kind tag. Unknown kinds return None so document
    /// loading can skip them (forward-compatible import).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credentials" => Some(Self::Credentials),
            "network" => Some(Self::Network),
            "gateway" => Some(Self::Gateway),
            "instance" => Some(Self::Instance),
            "volume" => Some(Self::Volume),
            "firewall" => Some(Self::Firewall),
            "nat" => Some(Self::Nat),
            "load_balancer" => Some(Self::LoadBalancer),
            "database" => Some(Self::Database),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials => write!(f, "credentials"),
            Self::Network => write!(f, "network"),
            Self::Gateway => write!(f, "gateway"),
            Self::Instance => write!(f, "instance"),
            Self::Volume => write!(f, "volume"),
            Self::Firewall => write!(f, "firewall"),
            Self::Nat => write!(f, "nat"),
            Self::LoadBalancer => write!(f, "load_balancer"),
            Self::Database => write!(f, "database"),
        }
    }
}

/// Kinds materialized as find placeholders by the import operation.
pub const IMPORTABLE: &[ComponentKind] = &[
    ComponentKind::Network,
    ComponentKind::Instance,
    ComponentKind::Firewall,
    ComponentKind::Nat,
    ComponentKind::LoadBalancer,
    ComponentKind::Database,
];

// ============================================================================
// Lifecycle bookkeeping
// ============================================================================

/// Lifecycle state tag. Bookkeeping only — never diffed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Pending,
    Running,
    Done,
    Errored,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

/// Action decided for a component by the diff engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    Create,
    Update,
    Replace,
    Delete,
    Find,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Replace => write!(f, "REPLACE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Find => write!(f, "FIND"),
        }
    }
}

// ============================================================================
// Shared metadata
// ============================================================================

/// Fields every component carries, flattened into its wire record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub name: String,

    #[serde(rename = "_provider", default)]
    pub provider: Provider,

    /// Opaque identifier assigned by the provider. Empty until first
    /// successful provisioning.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider_id: String,

    /// Clusters components spawned from one definition entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, String>,

    #[serde(rename = "_state", default)]
    pub state: State,

    #[serde(rename = "_action", default)]
    pub action: Action,
}

impl Meta {
    pub fn new(name: impl Into<String>, provider: Provider) -> Self {
        Self {
            name: name.into(),
            provider,
            ..Self::default()
        }
    }

    /// Carry the provider-assigned ID over from a provisioned counterpart.
    pub fn absorb(&mut self, other: &Meta) {
        if !other.provider_id.is_empty() {
            self.provider_id = other.provider_id.clone();
        }
    }
}

// ============================================================================
// Component
// ============================================================================

/// One graph node representing a single provisionable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_component", rename_all = "snake_case")]
pub enum Component {
    Credentials(Credential),
    Network(Network),
    Gateway(Gateway),
    Instance(Instance),
    Volume(Volume),
    Firewall(Firewall),
    Nat(Nat),
    LoadBalancer(LoadBalancer),
    Database(Database),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Credentials(_) => ComponentKind::Credentials,
            Self::Network(_) => ComponentKind::Network,
            Self::Gateway(_) => ComponentKind::Gateway,
            Self::Instance(_) => ComponentKind::Instance,
            Self::Volume(_) => ComponentKind::Volume,
            Self::Firewall(_) => ComponentKind::Firewall,
            Self::Nat(_) => ComponentKind::Nat,
            Self::LoadBalancer(_) => ComponentKind::LoadBalancer,
            Self::Database(_) => ComponentKind::Database,
        }
    }

    pub fn meta(&self) -> &Meta {
        match self {
            Self::Credentials(c) => &c.meta,
            Self::Network(c) => &c.meta,
            Self::Gateway(c) => &c.meta,
            Self::Instance(c) => &c.meta,
            Self::Volume(c) => &c.meta,
            Self::Firewall(c) => &c.meta,
            Self::Nat(c) => &c.meta,
            Self::LoadBalancer(c) => &c.meta,
            Self::Database(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        match self {
            Self::Credentials(c) => &mut c.meta,
            Self::Network(c) => &mut c.meta,
            Self::Gateway(c) => &mut c.meta,
            Self::Instance(c) => &mut c.meta,
            Self::Volume(c) => &mut c.meta,
            Self::Firewall(c) => &mut c.meta,
            Self::Nat(c) => &mut c.meta,
            Self::LoadBalancer(c) => &mut c.meta,
            Self::Database(c) => &mut c.meta,
        }
    }

    /// Logical ID — recomputed from kind and name, never stored.
    pub fn id(&self) -> String {
        logical_id(self.kind(), &self.meta().name)
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn provider(&self) -> Provider {
        self.meta().provider
    }

    pub fn provider_id(&self) -> &str {
        &self.meta().provider_id
    }

    pub fn group(&self) -> Option<&str> {
        self.meta().group.as_deref()
    }

    pub fn tags(&self) -> &IndexMap<String, String> {
        &self.meta().tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.meta().tags.get(key).map(String::as_str)
    }

    pub fn state(&self) -> State {
        self.meta().state
    }

    pub fn set_state(&mut self, state: State) {
        self.meta_mut().state = state;
    }

    pub fn action(&self) -> Action {
        self.meta().action
    }

    pub fn set_action(&mut self, action: Action) {
        self.meta_mut().action = action;
    }

    /// Check required fields, numeric ranges, enumerations, and cross-field
    /// constraints. The resolver aborts the whole compile on first failure.
    pub fn validate(&self) -> Result<()> {
        let check = match self {
            Self::Credentials(c) => c.validate(),
            Self::Network(c) => c.validate(),
            Self::Gateway(c) => c.validate(),
            Self::Instance(c) => c.validate(),
            Self::Volume(c) => c.validate(),
            Self::Firewall(c) => c.validate(),
            Self::Nat(c) => c.validate(),
            Self::LoadBalancer(c) => c.validate(),
            Self::Database(c) => c.validate(),
        };
        check.map_err(|reason| Error::Validation {
            id: self.id(),
            reason,
        })
    }

    /// Logical IDs of resources this component cannot be provisioned before.
    pub fn dependencies(&self) -> Vec<String> {
        match self {
            Self::Credentials(_) | Self::Network(_) => Vec::new(),
            Self::Gateway(c) => c.dependencies(),
            Self::Instance(c) => c.dependencies(),
            Self::Volume(c) => c.dependencies(),
            Self::Firewall(c) => c.dependencies(),
            Self::Nat(c) => c.dependencies(),
            Self::LoadBalancer(c) => c.dependencies(),
            Self::Database(c) => c.dependencies(),
        }
    }

    /// Stricter subset of [`Self::dependencies`]: dependents sharing one of
    /// these origins must additionally be serialized relative to each other.
    pub fn sequential_dependencies(&self) -> Vec<String> {
        match self {
            Self::Volume(c) => c.sequential_dependencies(),
            _ => Vec::new(),
        }
    }

    /// Idempotent normalization pass keeping each reference pair consistent.
    /// Safe to call against a graph whose other members are not yet rebuilt.
    pub fn rebuild(&mut self, lookup: &Graph) {
        match self {
            Self::Credentials(_) | Self::Network(_) => {}
            Self::Gateway(c) => c.rebuild(lookup),
            Self::Instance(c) => c.rebuild(lookup),
            Self::Volume(c) => c.rebuild(lookup),
            Self::Firewall(c) => c.rebuild(lookup),
            Self::Nat(c) => c.rebuild(lookup),
            Self::LoadBalancer(c) => c.rebuild(lookup),
            Self::Database(c) => c.rebuild(lookup),
        }
    }

    /// Merge provider-observed fields from a provisioned counterpart.
    /// No-op when the counterpart is a different kind.
    pub fn merge(&mut self, other: &Component) {
        match (self, other) {
            (Self::Credentials(a), Self::Credentials(b)) => a.meta.absorb(&b.meta),
            (Self::Network(a), Self::Network(b)) => a.meta.absorb(&b.meta),
            (Self::Gateway(a), Self::Gateway(b)) => a.meta.absorb(&b.meta),
            (Self::Instance(a), Self::Instance(b)) => a.merge(b),
            (Self::Volume(a), Self::Volume(b)) => a.meta.absorb(&b.meta),
            (Self::Firewall(a), Self::Firewall(b)) => a.meta.absorb(&b.meta),
            (Self::Nat(a), Self::Nat(b)) => a.merge(b),
            (Self::LoadBalancer(a), Self::LoadBalancer(b)) => a.merge(b),
            (Self::Database(a), Self::Database(b)) => a.merge(b),
            _ => {}
        }
    }

    /// Field-level changelog against a counterpart of the same kind.
    pub fn diff(&self, other: &Component) -> Result<Vec<crate::core::diff::Change>> {
        crate::core::diff::component_changelog(self, other)
    }

    /// Field comparison rules consumed by the generic diff routine.
    pub fn schema(&self) -> &'static [FieldRule] {
        match self {
            Self::Credentials(_) => crate::components::credentials::SCHEMA,
            Self::Network(_) => crate::components::network::SCHEMA,
            Self::Gateway(_) => crate::components::gateway::SCHEMA,
            Self::Instance(_) => crate::components::instance::SCHEMA,
            Self::Volume(_) => crate::components::volume::SCHEMA,
            Self::Firewall(_) => crate::components::firewall::SCHEMA,
            Self::Nat(_) => crate::components::nat::SCHEMA,
            Self::LoadBalancer(_) => crate::components::loadbalancer::SCHEMA,
            Self::Database(_) => crate::components::database::SCHEMA,
        }
    }

    /// Whether removal from the desired graph requires an explicit destroy.
    /// Gateways cannot be destroyed on their own; credentials are a
    /// pseudo-component.
    pub fn is_stateful(&self) -> bool {
        !matches!(self, Self::Gateway(_) | Self::Credentials(_))
    }

    /// Empty component of the given kind, used by the import operation as a
    /// query-only find placeholder. Credentials, gateways, and volumes are
    /// not importable on their own.
    pub fn placeholder(kind: ComponentKind, name: &str, provider: Provider) -> Option<Component> {
        let meta = Meta::new(name, provider);
        match kind {
            ComponentKind::Network => Some(Self::Network(Network {
                meta,
                ..Network::default()
            })),
            ComponentKind::Instance => Some(Self::Instance(Instance {
                meta,
                ..Instance::default()
            })),
            ComponentKind::Firewall => Some(Self::Firewall(Firewall {
                meta,
                ..Firewall::default()
            })),
            ComponentKind::Nat => Some(Self::Nat(Nat { meta, ..Nat::default() })),
            ComponentKind::LoadBalancer => Some(Self::LoadBalancer(LoadBalancer {
                meta,
                ..LoadBalancer::default()
            })),
            ComponentKind::Database => Some(Self::Database(Database {
                meta,
                ..Database::default()
            })),
            _ => None,
        }
    }
}
