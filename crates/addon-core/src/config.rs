//! Loader configuration with layered resolution
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults
//! 2. `addons.toml` in the base directory (or an explicit config file)
//! 3. `addons.local.toml` next to it, for machine-local overrides
//! 4. Environment: `ADDONS_PATH`, `ADDONS_STATE`, `ADDONS_DEMO`
//!
//! Command-line flags are applied on top by the caller. Relative paths in a
//! file are relative to the directory holding that file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILENAME: &str = "addons.toml";
pub const LOCAL_CONFIG_FILENAME: &str = "addons.local.toml";
pub const DEFAULT_STATE_FILE: &str = ".addons/state.toml";

/// Effective loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Directories scanned for addons, in priority order
    pub addons_paths: Vec<PathBuf>,
    /// Persisted module state
    pub state_file: PathBuf,
    /// Apply demo files on install and upgrade
    pub load_demo: bool,
    /// Modules that can never be removed
    pub server_wide_modules: Vec<String>,
    /// Probe `external_dependencies` before installing
    pub check_external_dependencies: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            addons_paths: Vec::new(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            load_demo: false,
            server_wide_modules: vec!["base".to_string()],
            check_external_dependencies: true,
        }
    }
}

impl LoaderConfig {
    /// Defaults with paths anchored at `base`.
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            state_file: base.join(DEFAULT_STATE_FILE),
            ..Self::default()
        }
    }

    pub fn is_server_wide(&self, key: &str) -> bool {
        self.server_wide_modules.iter().any(|m| m == key)
    }

    /// Lock file guarding load passes across processes.
    pub fn lock_file(&self) -> PathBuf {
        let mut name = self.state_file.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }
}

/// One configuration file; every key optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    addons_paths: Option<Vec<PathBuf>>,
    state_file: Option<PathBuf>,
    load_demo: Option<bool>,
    server_wide_modules: Option<Vec<String>>,
    check_external_dependencies: Option<bool>,
}

impl ConfigLayer {
    fn read(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let layer: Self = toml::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let dir = path.parent().unwrap_or(Path::new("."));
        Ok(Some(layer.anchored(dir)))
    }

    fn anchored(mut self, dir: &Path) -> Self {
        if let Some(paths) = self.addons_paths.as_mut() {
            for path in paths.iter_mut() {
                if path.is_relative() {
                    *path = dir.join(&*path);
                }
            }
        }
        if let Some(state) = self.state_file.as_mut()
            && state.is_relative()
        {
            *state = dir.join(&*state);
        }
        self
    }

    fn apply(self, config: &mut LoaderConfig) {
        if let Some(paths) = self.addons_paths {
            config.addons_paths = paths;
        }
        if let Some(state) = self.state_file {
            config.state_file = state;
        }
        if let Some(demo) = self.load_demo {
            config.load_demo = demo;
        }
        if let Some(modules) = self.server_wide_modules {
            config.server_wide_modules = modules;
        }
        if let Some(check) = self.check_external_dependencies {
            config.check_external_dependencies = check;
        }
    }
}

/// Resolves a [`LoaderConfig`] from files and the environment
pub struct ConfigResolver {
    base: PathBuf,
    config_file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigResolver {
    /// Resolve relative to `base`, usually the working directory.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            config_file: None,
            env: None,
        }
    }

    /// Use an explicit config file instead of `<base>/addons.toml`.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Read variables from `env` instead of the process environment.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.env {
            Some(env) => env.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    /// Merge every layer.
    ///
    /// Missing files are skipped. An explicit config file that does not exist
    /// is an error, as is invalid TOML in any file.
    pub fn resolve(&self) -> Result<LoaderConfig> {
        let mut config = LoaderConfig::rooted_at(&self.base);

        let main = match &self.config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::Config {
                        path: path.clone(),
                        message: "file not found".to_string(),
                    });
                }
                path.clone()
            }
            None => self.base.join(CONFIG_FILENAME),
        };
        let local = main.with_file_name(LOCAL_CONFIG_FILENAME);

        for path in [&main, &local] {
            if let Some(layer) = ConfigLayer::read(path)? {
                tracing::debug!(path = %path.display(), "Applying config layer");
                layer.apply(&mut config);
            }
        }

        if let Some(paths) = self.var("ADDONS_PATH") {
            config.addons_paths = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| if p.is_relative() { self.base.join(p) } else { p })
                .collect();
        }
        if let Some(state) = self.var("ADDONS_STATE") {
            let state = PathBuf::from(state);
            config.state_file = if state.is_relative() { self.base.join(state) } else { state };
        }
        if let Some(demo) = self.var("ADDONS_DEMO") {
            config.load_demo = matches!(demo.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        Ok(config)
    }
}
