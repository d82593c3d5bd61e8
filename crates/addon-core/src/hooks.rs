//! Lifecycle hooks
//!
//! Manifests name their hooks (`pre_init_hook`, `post_init_hook`,
//! `uninstall_hook`); a [`HookProvider`] turns the name into something to run.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// When a hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Before the first data file of an install
    PreInit,
    /// After data and demo files of an install
    PostInit,
    /// Before the module's records are purged
    Uninstall,
}

impl HookKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreInit => "pre_init",
            Self::PostInit => "post_init",
            Self::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub module: &'a str,
    pub root: &'a Path,
    pub kind: HookKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("no hook named '{0}'")]
    NotFound(String),

    #[error("hook '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Runs named hooks.
pub trait HookProvider: Send + Sync {
    fn run(&self, name: &str, ctx: &HookContext<'_>) -> Result<(), HookError>;
}

/// A provider for deployments without hooks; every name is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl HookProvider for NoHooks {
    fn run(&self, name: &str, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        Err(HookError::NotFound(name.to_string()))
    }
}

type HookFn = Arc<dyn Fn(&HookContext<'_>) -> Result<(), String> + Send + Sync>;

/// In-process hooks registered per module.
#[derive(Clone, Default)]
pub struct HookTable {
    hooks: HashMap<(String, String), HookFn>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` as `name` for `module`.
    pub fn register<F>(mut self, module: impl Into<String>, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.insert((module.into(), name.into()), Arc::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookTable").field("hooks", &self.hooks.len()).finish()
    }
}

impl HookProvider for HookTable {
    fn run(&self, name: &str, ctx: &HookContext<'_>) -> Result<(), HookError> {
        let hook = self
            .hooks
            .get(&(ctx.module.to_string(), name.to_string()))
            .ok_or_else(|| HookError::NotFound(name.to_string()))?;
        hook(ctx).map_err(|message| HookError::Failed {
            name: name.to_string(),
            message,
        })
    }
}

/// Directory inside an addon holding hook scripts.
pub const HOOKS_DIR: &str = "hooks";

/// Runs `<addon>/hooks/<name>` through the system shell.
///
/// The script runs in the addon root with `ADDON_KEY`, `ADDON_PATH` and
/// `ADDON_HOOK` set. A non-zero exit fails the hook with its stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptHooks;

impl ScriptHooks {
    pub fn script_path(root: &Path, name: &str) -> PathBuf {
        root.join(HOOKS_DIR).join(name)
    }
}

impl HookProvider for ScriptHooks {
    fn run(&self, name: &str, ctx: &HookContext<'_>) -> Result<(), HookError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(HookError::NotFound(name.to_string()));
        }
        let script = Self::script_path(ctx.root, name);
        if !script.is_file() {
            return Err(HookError::NotFound(name.to_string()));
        }

        tracing::debug!(module = %ctx.module, hook = %name, kind = %ctx.kind, "Running hook script");
        let output = shell_command(&script)
            .current_dir(ctx.root)
            .env("ADDON_KEY", ctx.module)
            .env("ADDON_PATH", ctx.root)
            .env("ADDON_HOOK", ctx.kind.as_str())
            .output()
            .map_err(|e| HookError::Failed {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = match output.status.code() {
            Some(code) if stderr.is_empty() => format!("exited with code {code}"),
            Some(code) => format!("exited with code {code}: {stderr}"),
            None => "terminated by signal".to_string(),
        };
        Err(HookError::Failed {
            name: name.to_string(),
            message,
        })
    }
}

fn shell_command(script: &Path) -> Command {
    #[cfg(windows)]
    {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    }
    #[cfg(not(windows))]
    {
        let mut c = Command::new("sh");
        c.arg(script);
        c
    }
}
