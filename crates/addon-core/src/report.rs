//! Outcome of a load pass

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use addon_graph::ExclusionReason;
use serde::{Serialize, Serializer};

use crate::hooks::HookKind;

/// Why a module took no part in the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Not installable, missing dependency, or cycle
    Unresolvable(ExclusionReason),
    /// Descriptor could not be read
    Unreadable(String),
    /// Contributions rejected by the composer
    Rejected(addon_registry::Error),
    /// The module source failed
    ContributionsUnavailable(String),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolvable(reason) => write!(f, "{reason}"),
            Self::Unreadable(message) => write!(f, "unreadable descriptor: {message}"),
            Self::Rejected(error) => write!(f, "{error}"),
            Self::ContributionsUnavailable(message) => write!(f, "contributions unavailable: {message}"),
        }
    }
}

impl Serialize for Exclusion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What stopped a module's transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AbortCause {
    DataFile { path: PathBuf, message: String },
    Hook {
        #[serde(serialize_with = "collect_str")]
        event: HookKind,
        hook: String,
        message: String,
    },
    Purge { message: String },
    /// A module it depends on was aborted earlier in the pass
    DependencyAborted { dependency: String },
    /// Removal skipped because an installed module depending on it stayed
    DependentAborted { dependent: String },
}

fn collect_str<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataFile { path, message } => write!(f, "data file {}: {message}", path.display()),
            Self::Hook { event, hook, message } => write!(f, "{event} hook '{hook}': {message}"),
            Self::Purge { message } => write!(f, "purge failed: {message}"),
            Self::DependencyAborted { dependency } => write!(f, "dependency '{dependency}' was aborted"),
            Self::DependentAborted { dependent } => write!(f, "still required by '{dependent}', whose removal was aborted"),
        }
    }
}

/// A transition that was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aborted {
    pub module: String,
    pub cause: AbortCause,
}

/// Everything a pass did, in the order it did it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// Modules in force after the pass, in load order
    pub loaded: Vec<String>,
    /// Newly installed, in order
    pub installed: Vec<String>,
    pub upgraded: Vec<String>,
    /// Removed, in removal order
    pub removed: Vec<String>,
    /// Installed because their triggers were
    pub auto_installed: Vec<String>,
    pub excluded: BTreeMap<String, Exclusion>,
    /// Requested modules that could not be loaded
    pub blocked: Vec<String>,
    pub aborted: Vec<Aborted>,
    pub warnings: Vec<String>,
}

impl LoadReport {
    pub fn is_aborted(&self, module: &str) -> bool {
        self.aborted.iter().any(|a| a.module == module)
    }

    pub fn abort_cause(&self, module: &str) -> Option<&AbortCause> {
        self.aborted.iter().find(|a| a.module == module).map(|a| &a.cause)
    }

    /// Every requested module was loaded and no transition was aborted.
    pub fn is_clean(&self) -> bool {
        self.blocked.is_empty() && self.aborted.is_empty()
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}
