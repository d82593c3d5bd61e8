//! Addon descriptor reading for the addon loader.
//!
//! This crate turns addon directories into typed [`Manifest`] records. A
//! descriptor is either a TOML table (`__manifest__.toml`) or a Python dict
//! literal (`__manifest__.py`, legacy `__openerp__.py`), parsed by the small
//! literal parser in [`literal`] without evaluating any code.

pub mod checksum;
pub mod discovery;
pub mod error;
pub mod literal;
pub mod manifest;

pub use checksum::descriptor_checksum;
pub use discovery::{Discovery, DiscoveryFailure, DiscoveryWarning, discover};
pub use error::{Error, Result};
pub use manifest::{
    AssetEntry, AutoInstall, DESCRIPTOR_FILENAMES, ExternalDependencies, LifecycleHooks,
    Manifest, ManifestWarning, find_descriptor, validate_key,
};

/// Read the addon directory `dir`.
pub fn read(dir: &std::path::Path) -> Result<Manifest> {
    Manifest::read(dir)
}
