//! Flat record kinds consumed by the set reconciler.

use crate::components::firewall::FirewallRule;
use crate::components::nat::NatRule;
use crate::reconcile::set::{reconcile, Named, SetDiff};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: String,
    pub cpus: u32,
    pub memory: u32,
    #[serde(default)]
    pub disk_gb: u32,
    #[serde(skip)]
    pub exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub name: String,
    pub subnet: String,
    #[serde(skip)]
    pub exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirewallRecord {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<FirewallRule>,
    #[serde(skip)]
    pub exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NatRecord {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<NatRule>,
    #[serde(skip)]
    pub exists: bool,
}

/// A provisioning command addressed at a group of targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub name: String,
    pub payload: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(skip)]
    pub exists: bool,
}

macro_rules! impl_named {
    ($($record:ty),*) => {
        $(impl Named for $record {
            fn name(&self) -> &str {
                &self.name
            }
            fn exists(&self) -> bool {
                self.exists
            }
            fn set_exists(&mut self, exists: bool) {
                self.exists = exists;
            }
        })*
    };
}

impl_named!(InstanceRecord, NetworkRecord, FirewallRecord, NatRecord, ExecutionRecord);

pub fn reconcile_instances(
    old: &mut [InstanceRecord],
    new: &mut [InstanceRecord],
) -> SetDiff<InstanceRecord> {
    reconcile(old, new, |o, n| {
        o.cpus != n.cpus || o.memory != n.memory || o.disk_gb != n.disk_gb
    })
}

pub fn reconcile_networks(
    old: &mut [NetworkRecord],
    new: &mut [NetworkRecord],
) -> SetDiff<NetworkRecord> {
    reconcile(old, new, |o, n| o.subnet != n.subnet)
}

pub fn reconcile_firewalls(
    old: &mut [FirewallRecord],
    new: &mut [FirewallRecord],
) -> SetDiff<FirewallRecord> {
    reconcile(old, new, |o, n| o.rules != n.rules)
}

pub fn reconcile_nats(old: &mut [NatRecord], new: &mut [NatRecord]) -> SetDiff<NatRecord> {
    reconcile(old, new, |o, n| o.rules != n.rules)
}

/// Reconcile executions with incremental targeting: a command whose payload
/// is unchanged but whose target group gained members is re-addressed at
/// only the newly added targets, never re-issued against the whole group.
pub fn plan_executions(
    old: &mut [ExecutionRecord],
    new: &mut [ExecutionRecord],
) -> SetDiff<ExecutionRecord> {
    for item in old.iter_mut() {
        item.exists = false;
    }
    for item in new.iter_mut() {
        item.exists = false;
    }

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for ni in 0..new.len() {
        let name = new[ni].name.clone();
        if let Some(oi) = old.iter().position(|o| o.name == name && !o.exists) {
            old[oi].exists = true;
            new[ni].exists = true;
            pairs.push((oi, ni));
        }
    }

    let mut diff = SetDiff::default();
    for item in new.iter() {
        if !item.exists {
            diff.create.push(item.clone());
        }
    }
    for item in old.iter() {
        if !item.exists {
            diff.delete.push(item.clone());
        }
    }
    for (oi, ni) in pairs {
        let (before, after) = (&old[oi], &new[ni]);
        if before.payload != after.payload {
            diff.update.push(after.clone());
            continue;
        }
        let added: Vec<String> = after
            .targets
            .iter()
            .filter(|t| !before.targets.contains(t))
            .cloned()
            .collect();
        if !added.is_empty() {
            let mut retargeted = after.clone();
            retargeted.targets = added;
            diff.update.push(retargeted);
        }
    }
    diff
}
