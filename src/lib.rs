//! Trama — provider-agnostic infrastructure graph compiler.
//!
//! Compiles declarative infrastructure definitions into a typed component
//! graph, resolves dependencies, and diffs two graphs into an ordered
//! create/update/replace/delete plan.

pub mod cli;
pub mod components;
pub mod core;
pub mod reconcile;
