//! Definition — the declarative input schema and its mapping to components.
//!
//! Definitions are parsed from YAML, validated structurally, then mapped
//! entry-by-entry into unresolved components. Provider constants are not
//! baked in globally: an immutable [`Context`] built from the credentials
//! payload is passed into the mapping step.

use crate::components::credentials::Credential;
use crate::components::database::Database;
use crate::components::firewall::{Firewall, FirewallRule};
use crate::components::gateway::Gateway;
use crate::components::instance::{Disk, Instance};
use crate::components::loadbalancer::{Listener, LoadBalancer};
use crate::components::nat::{Nat, NatRule};
use crate::components::network::Network;
use crate::components::volume::Volume;
use crate::core::component::{Component, Meta, Provider};
use crate::core::error::{Error, Result};
use crate::core::graph::Graph;
use crate::core::resolver;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Schema
// ============================================================================

/// Root definition — the desired state of one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Environment name
    pub name: String,

    /// Resource declarations (order-preserving)
    #[serde(default)]
    pub networks: IndexMap<String, NetworkDef>,

    #[serde(default)]
    pub instances: IndexMap<String, InstanceDef>,

    #[serde(default)]
    pub volumes: IndexMap<String, VolumeDef>,

    #[serde(default)]
    pub firewalls: IndexMap<String, FirewallDef>,

    #[serde(default)]
    pub nats: IndexMap<String, NatDef>,

    #[serde(default)]
    pub loadbalancers: IndexMap<String, LoadBalancerDef>,

    #[serde(default)]
    pub databases: IndexMap<String, DatabaseDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDef {
    pub subnet: String,

    #[serde(default)]
    pub dns_servers: Vec<String>,

    /// Also provision an egress gateway for this network.
    #[serde(default)]
    pub gateway: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDef {
    pub image: String,
    pub cpus: u32,
    pub memory: u32,
    pub network: String,

    /// Replica count; entries above 1 expand into `name-1 .. name-N`.
    #[serde(default = "default_count")]
    pub count: u32,

    #[serde(default)]
    pub disks: Vec<Disk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDef {
    pub instance: String,
    pub device: String,
    pub size_gb: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallDef {
    pub network: String,

    #[serde(default)]
    pub rules: Vec<FirewallRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatDef {
    pub network: String,

    #[serde(default)]
    pub rules: Vec<NatRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerDef {
    #[serde(default)]
    pub listeners: Vec<Listener>,

    /// Instance entry names; replica entries expand to all replicas.
    #[serde(default)]
    pub instances: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDef {
    pub engine: String,
    pub size_gb: u32,
    pub network: String,

    #[serde(default = "default_count")]
    pub replicas: u32,

    #[serde(default)]
    pub encrypted: bool,

    #[serde(default)]
    pub encryption_key: String,
}

fn default_count() -> u32 {
    1
}

/// Parse a definition from a YAML string.
pub fn parse_definition(yaml: &str) -> Result<Definition> {
    serde_yaml_ng::from_str(yaml).map_err(|e| Error::Definition(e.to_string()))
}

/// Parse a definition file from disk.
pub fn parse_definition_file(path: &Path) -> Result<Definition> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_definition(&content)
}

impl Definition {
    /// Structural checks on the definition itself. Component-level rules run
    /// during resolution.
    pub fn validate(&self) -> Result<()> {
        if self.version != "1.0" {
            return Err(Error::Definition(format!(
                "version must be \"1.0\", got \"{}\"",
                self.version
            )));
        }
        if self.name.is_empty() {
            return Err(Error::Definition("name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Component names an instance entry expands to.
    pub fn instance_names(&self, entry: &str) -> Vec<String> {
        match self.instances.get(entry) {
            Some(def) if def.count > 1 => {
                (1..=def.count).map(|i| format!("{}-{}", entry, i)).collect()
            }
            // Unknown entries pass through untouched; the resolver reports
            // them if they name nothing in the graph.
            _ => vec![entry.to_string()],
        }
    }
}

// ============================================================================
// Credentials and context
// ============================================================================

/// Opaque credentials payload supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    /// Hypervisor connection URI (libvirt).
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub datacenter: String,
}

impl Credentials {
    /// Infer the provider from the payload shape.
    pub fn provider(&self) -> Result<Provider> {
        if !self.access_key.is_empty() && !self.secret_key.is_empty() {
            return Ok(Provider::Aws);
        }
        if self.uri.starts_with("qemu") || self.uri.starts_with("lxc") {
            return Ok(Provider::Libvirt);
        }
        Err(Error::UnknownProvider)
    }
}

/// Parse a credentials payload from a YAML string.
pub fn parse_credentials(yaml: &str) -> Result<Credentials> {
    serde_yaml_ng::from_str(yaml).map_err(|e| Error::Definition(e.to_string()))
}

/// Parse a credentials file from disk.
pub fn parse_credentials_file(path: &Path) -> Result<Credentials> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_credentials(&content)
}

/// Immutable per-compile constants injected into the mapping step.
#[derive(Debug, Clone)]
pub struct Context {
    pub provider: Provider,
    pub datacenter: String,
}

impl Context {
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            provider: credentials.provider()?,
            datacenter: credentials.datacenter.clone(),
        })
    }
}

// ============================================================================
// Mapping
// ============================================================================

/// Compile a definition into a resolved graph.
pub fn compile(definition: &Definition, credentials: &Credentials) -> Result<Graph> {
    definition.validate()?;
    let ctx = Context::from_credentials(credentials)?;

    let mut graph = Graph::new("", definition.name.clone());

    graph.push(Component::Credentials(Credential {
        meta: Meta::new(ctx.provider.to_string(), ctx.provider),
        datacenter: ctx.datacenter.clone(),
    }))?;

    for (name, def) in &definition.networks {
        graph.push(Component::Network(Network {
            meta: Meta::new(name.clone(), ctx.provider),
            subnet: def.subnet.clone(),
            dns_servers: def.dns_servers.clone(),
        }))?;
        if def.gateway {
            graph.push(Component::Gateway(Gateway {
                meta: Meta::new(name.clone(), ctx.provider),
                network_name: name.clone(),
                network_ref: String::new(),
            }))?;
        }
    }

    for (entry, def) in &definition.instances {
        for name in definition.instance_names(entry) {
            let mut meta = Meta::new(name, ctx.provider);
            meta.group = Some(entry.clone());
            graph.push(Component::Instance(Instance {
                meta,
                image: def.image.clone(),
                cpus: def.cpus,
                memory: def.memory,
                network_name: def.network.clone(),
                disks: def.disks.clone(),
                ..Instance::default()
            }))?;
        }
    }

    for (name, def) in &definition.volumes {
        graph.push(Component::Volume(Volume {
            meta: Meta::new(name.clone(), ctx.provider),
            instance_name: def.instance.clone(),
            device: def.device.clone(),
            size_gb: def.size_gb,
            ..Volume::default()
        }))?;
    }

    for (name, def) in &definition.firewalls {
        graph.push(Component::Firewall(Firewall {
            meta: Meta::new(name.clone(), ctx.provider),
            network_name: def.network.clone(),
            rules: def.rules.clone(),
            ..Firewall::default()
        }))?;
    }

    for (name, def) in &definition.nats {
        graph.push(Component::Nat(Nat {
            meta: Meta::new(name.clone(), ctx.provider),
            network_name: def.network.clone(),
            rules: def.rules.clone(),
            ..Nat::default()
        }))?;
    }

    for (name, def) in &definition.loadbalancers {
        let targets: Vec<String> = def
            .instances
            .iter()
            .flat_map(|entry| definition.instance_names(entry))
            .collect();
        graph.push(Component::LoadBalancer(LoadBalancer {
            meta: Meta::new(name.clone(), ctx.provider),
            listeners: def.listeners.clone(),
            instances: targets,
            ..LoadBalancer::default()
        }))?;
    }

    for (name, def) in &definition.databases {
        graph.push(Component::Database(Database {
            meta: Meta::new(name.clone(), ctx.provider),
            engine: def.engine.clone(),
            size_gb: def.size_gb,
            replicas: def.replicas,
            encrypted: def.encrypted,
            encryption_key: def.encryption_key.clone(),
            network_name: def.network.clone(),
            ..Database::default()
        }))?;
    }

    resolver::resolve(&mut graph)?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws_credentials() -> Credentials {
        Credentials {
            access_key: "AKIA000".to_string(),
            secret_key: "secret".to_string(),
            datacenter: "eu-west-1".to_string(),
            ..Credentials::default()
        }
    }

    fn basic_yaml() -> &'static str {
        r#"
version: "1.0"
name: demo
networks:
  bar:
    subnet: 10.1.0.0/24
instances:
  foo:
    image: debian-13
    cpus: 1
    memory: 2048
    network: bar
"#
    }

    #[test]
    fn test_parse_and_compile_basic() {
        let def = parse_definition(basic_yaml()).unwrap();
        let graph = compile(&def, &aws_credentials()).unwrap();

        assert!(graph.component("credentials::aws").is_some());
        assert!(graph.component("network::bar").is_some());
        let foo = graph.component("instance::foo").unwrap();
        assert_eq!(foo.group(), Some("foo"));
        assert!(graph.has_edge("network::bar", "instance::foo"));
    }

    #[test]
    fn test_replica_expansion_groups() {
        let yaml = r#"
version: "1.0"
name: demo
networks:
  bar:
    subnet: 10.1.0.0/24
instances:
  web:
    image: debian-13
    cpus: 1
    memory: 1024
    network: bar
    count: 3
"#;
        let def = parse_definition(yaml).unwrap();
        let graph = compile(&def, &aws_credentials()).unwrap();

        assert!(graph.component("instance::web").is_none());
        for name in ["instance::web-1", "instance::web-2", "instance::web-3"] {
            assert_eq!(graph.component(name).unwrap().group(), Some("web"));
        }
        assert_eq!(graph.by_group("web").count(), 3);
    }

    #[test]
    fn test_gateway_flag_creates_gateway() {
        let yaml = r#"
version: "1.0"
name: demo
networks:
  bar:
    subnet: 10.1.0.0/24
    gateway: true
"#;
        let def = parse_definition(yaml).unwrap();
        let graph = compile(&def, &aws_credentials()).unwrap();
        assert!(graph.component("gateway::bar").is_some());
        assert!(graph.has_edge("network::bar", "gateway::bar"));
    }

    #[test]
    fn test_loadbalancer_targets_expand_replicas() {
        let yaml = r#"
version: "1.0"
name: demo
networks:
  bar:
    subnet: 10.1.0.0/24
instances:
  web:
    image: debian-13
    cpus: 1
    memory: 1024
    network: bar
    count: 2
loadbalancers:
  front:
    listeners:
      - port: 80
        instance_port: 8080
        protocol: http
    instances: [web]
"#;
        let def = parse_definition(yaml).unwrap();
        let graph = compile(&def, &aws_credentials()).unwrap();

        let Component::LoadBalancer(front) =
            graph.component("load_balancer::front").unwrap()
        else {
            panic!("expected load balancer");
        };
        assert_eq!(front.instances, vec!["web-1", "web-2"]);
        assert!(graph.has_edge("instance::web-1", "load_balancer::front"));
        assert!(graph.has_edge("instance::web-2", "load_balancer::front"));
    }

    #[test]
    fn test_unknown_network_is_resolution_error() {
        let yaml = r#"
version: "1.0"
name: demo
instances:
  foo:
    image: debian-13
    cpus: 1
    memory: 2048
    network: ghost
"#;
        let def = parse_definition(yaml).unwrap();
        let err = compile(&def, &aws_credentials()).unwrap_err();
        assert!(err
            .to_string()
            .contains("could not resolve component dependency 'network::ghost'"));
    }

    #[test]
    fn test_validation_failure_names_component() {
        let yaml = r#"
version: "1.0"
name: demo
networks:
  bar:
    subnet: 10.1.0.0/24
instances:
  foo:
    image: debian-13
    cpus: 0
    memory: 2048
    network: bar
"#;
        let def = parse_definition(yaml).unwrap();
        let err = compile(&def, &aws_credentials()).unwrap_err();
        assert!(err.to_string().contains("instance::foo"));
    }

    #[test]
    fn test_bad_version_rejected() {
        let def = Definition {
            version: "2.0".to_string(),
            ..parse_definition(basic_yaml()).unwrap()
        };
        assert!(def.validate().unwrap_err().to_string().contains("version"));
    }

    #[test]
    fn test_provider_inference() {
        assert_eq!(aws_credentials().provider().unwrap(), Provider::Aws);

        let libvirt = Credentials {
            uri: "qemu+ssh://host/system".to_string(),
            ..Credentials::default()
        };
        assert_eq!(libvirt.provider().unwrap(), Provider::Libvirt);

        let err = Credentials::default().provider().unwrap_err();
        assert!(err.to_string().contains("could not infer provider"));
    }

    #[test]
    fn test_compile_stamps_provider_everywhere() {
        let libvirt = Credentials {
            uri: "qemu:///system".to_string(),
            ..Credentials::default()
        };
        let def = parse_definition(basic_yaml()).unwrap();
        let graph = compile(&def, &libvirt).unwrap();

        assert!(graph.component("credentials::libvirt").is_some());
        assert!(graph
            .components()
            .iter()
            .all(|c| c.provider() == Provider::Libvirt));
    }

    #[test]
    fn test_definition_roundtrip_preserves_order() {
        let yaml = r#"
version: "1.0"
name: demo
networks:
  zeta:
    subnet: 10.2.0.0/24
  alpha:
    subnet: 10.1.0.0/24
"#;
        let def = parse_definition(yaml).unwrap();
        let keys: Vec<_> = def.networks.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
