//! Dependency resolution for addons.
//!
//! [`DependencyGraph`] is a plain directed graph over technical keys with
//! cycle detection and stable topological sorting. [`Resolver`] builds on it
//! to turn discovered manifests into a load order, excluding modules that
//! cannot be loaded and pulling in auto-install modules.

pub mod error;
pub mod graph;
pub mod resolve;

pub use error::{Error, Result};
pub use graph::DependencyGraph;
pub use resolve::{
    AutoInstallPolicy, Conflict, ExclusionReason, Resolution, Resolver, Selection, resolve,
};
