//! Error types for addon-core

use std::path::PathBuf;

use crate::state::ModuleState;

/// Result type for addon-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a load pass or a state operation.
///
/// Per-module failures (data files, hooks, rejected contributions) do not
/// abort a pass; they are collected in the [`LoadReport`](crate::LoadReport).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested keys that no addons path provides
    #[error("Unknown module(s): {}", .0.join(", "))]
    UnknownModule(Vec<String>),

    /// Upgrade or removal of a module that is not installed
    #[error("Module '{0}' is not installed")]
    NotInstalled(String),

    /// Removal that would break installed modules or touches a server-wide module
    #[error("Cannot remove '{key}': {reason}")]
    RemoveRefused { key: String, reason: String },

    /// Two modules of the target set exclude each other
    #[error("Modules '{0}' and '{1}' are incompatible")]
    Incompatible(String, String),

    /// Another load pass holds the loader
    #[error("Another load pass is running")]
    LoaderBusy,

    /// A state change outside the module lifecycle
    #[error("Invalid state transition for '{key}': {from} -> {to}")]
    InvalidTransition {
        key: String,
        from: ModuleState,
        to: ModuleState,
    },

    /// Configuration file could not be parsed
    #[error("Invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Persisted module state could not be parsed
    #[error("Invalid module state in {path}: {message}")]
    State { path: PathBuf, message: String },

    // Transparent wrappers for underlying crate errors
    /// Descriptor or discovery error from addon-manifest
    #[error(transparent)]
    Manifest(#[from] addon_manifest::Error),

    /// Fatal composition error from addon-registry
    #[error(transparent)]
    Compose(#[from] addon_registry::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
