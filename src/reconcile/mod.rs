//! Name-keyed set reconciliation over flat collections.
//!
//! A simpler layer than the graph diff, used for provisioning side-effects:
//! matching two flat collections by name to compute create/update/delete
//! sets, and re-targeting bootstrap commands at only newly added members.

pub mod records;
pub mod set;
