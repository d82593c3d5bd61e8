//! Shared test utilities for the addon loader workspace.
//!
//! Used from `tests/` directories only; never published.
//!
//! # Modules
//!
//! - [`tree`]: [`AddonTree`](tree::AddonTree) builder for addon directories
//! - [`events`]: [`EventLog`](events::EventLog), a recording record-loader
//!   and hook provider

pub mod events;
pub mod tree;

pub use events::{Event, EventLog};
pub use tree::{AddonBuilder, AddonTree};
