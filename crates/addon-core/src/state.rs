//! Persisted module state
//!
//! The ledger records, per technical key, the lifecycle state of the module,
//! the version that was last installed and the checksum of the descriptor it
//! was installed from. It is stored as TOML:
//!
//! ```toml
//! version = "1"
//!
//! [modules.base]
//! state = "installed"
//! installed_version = "1.3"
//! checksum = "sha256:..."
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::Path;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const LEDGER_VERSION: &str = "1";

/// Lifecycle state of a module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    /// The descriptor marks the module as not installable
    Uninstallable,
    #[default]
    Uninstalled,
    ToInstall,
    Installed,
    ToUpgrade,
    ToRemove,
}

impl ModuleState {
    /// Whether `self -> to` is a lifecycle step, including rollbacks.
    pub fn can_become(self, to: ModuleState) -> bool {
        use ModuleState::*;
        matches!(
            (self, to),
            (Uninstalled, ToInstall)
                | (Uninstalled, Uninstallable)
                | (Uninstallable, Uninstalled)
                | (ToInstall, Installed)
                | (ToInstall, Uninstalled)
                | (Installed, ToUpgrade)
                | (Installed, ToRemove)
                | (ToUpgrade, Installed)
                | (ToRemove, Uninstalled)
                | (ToRemove, Installed)
        )
    }

    /// Whether the module's contributions are in force.
    pub fn is_installed(self) -> bool {
        matches!(self, Self::Installed | Self::ToUpgrade | Self::ToRemove)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninstallable => "uninstallable",
            Self::Uninstalled => "uninstalled",
            Self::ToInstall => "to_install",
            Self::Installed => "installed",
            Self::ToUpgrade => "to_upgrade",
            Self::ToRemove => "to_remove",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of one module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub state: ModuleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    /// Checksum of the descriptor last applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Module states by technical key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateLedger {
    /// Ledger format version for forward compatibility
    version: String,
    #[serde(default)]
    modules: BTreeMap<String, ModuleRecord>,
}

impl Default for StateLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StateLedger {
    pub fn new() -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            modules: BTreeMap::new(),
        }
    }

    /// Load a ledger from a TOML file with shared lock
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, locked, or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        file.lock_shared()?;

        // Read through the locked handle
        let mut content = String::new();
        (&file).read_to_string(&mut content)?;
        toml::from_str(&content).map_err(|e| Error::State {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the ledger, or start an empty one if the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Save atomically under an exclusive lock
    ///
    /// Writes to a temporary file next to `path`, then renames it over the
    /// target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        lock_file.lock_exclusive()?;

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    pub fn record(&self, key: &str) -> Option<&ModuleRecord> {
        self.modules.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, &ModuleRecord)> {
        self.modules.iter().map(|(key, record)| (key.as_str(), record))
    }

    /// State of `key`; unknown modules are uninstalled.
    pub fn state(&self, key: &str) -> ModuleState {
        self.modules.get(key).map(|r| r.state).unwrap_or_default()
    }

    /// Keys whose contributions are in force.
    pub fn installed(&self) -> BTreeSet<String> {
        self.modules
            .iter()
            .filter(|(_, record)| record.state.is_installed())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Keys currently in `state`.
    pub fn in_state(&self, state: ModuleState) -> Vec<String> {
        self.modules
            .iter()
            .filter(|(_, record)| record.state == state)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Move `key` one lifecycle step.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTransition` for a step outside the lifecycle.
    pub fn transition(&mut self, key: &str, to: ModuleState) -> Result<()> {
        let from = self.state(key);
        if from == to {
            return Ok(());
        }
        if !from.can_become(to) {
            return Err(Error::InvalidTransition {
                key: key.to_string(),
                from,
                to,
            });
        }
        tracing::debug!(module = %key, %from, %to, "State transition");
        self.modules.entry(key.to_string()).or_default().state = to;
        Ok(())
    }

    /// Record a completed install or upgrade.
    pub fn mark_installed(&mut self, key: &str, version: &str, checksum: &str) -> Result<()> {
        self.transition(key, ModuleState::Installed)?;
        let record = self.modules.entry(key.to_string()).or_default();
        record.installed_version = Some(version.to_string());
        record.checksum = Some(checksum.to_string());
        Ok(())
    }

    /// Record a completed removal.
    pub fn mark_removed(&mut self, key: &str) -> Result<()> {
        self.transition(key, ModuleState::Uninstalled)?;
        let record = self.modules.entry(key.to_string()).or_default();
        record.installed_version = None;
        record.checksum = None;
        Ok(())
    }

    /// Align `uninstallable` marks with the `installable` flag of discovered
    /// modules. Installed modules keep their state.
    pub fn sync_installable<'a>(&mut self, modules: impl IntoIterator<Item = (&'a str, bool)>) {
        for (key, installable) in modules {
            let state = self.state(key);
            let target = match (state, installable) {
                (ModuleState::Uninstalled, false) => ModuleState::Uninstallable,
                (ModuleState::Uninstallable, true) => ModuleState::Uninstalled,
                _ => continue,
            };
            self.modules.entry(key.to_string()).or_default().state = target;
        }
    }
}
