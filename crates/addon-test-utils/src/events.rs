//! [`EventLog`]: a record-loader and hook provider that records every call.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use addon_core::{DataFileError, HookContext, HookError, HookKind, HookProvider, LoadContext, RecordLoader};

/// One call seen by the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A data or demo file, relative to the addon root
    Load {
        module: String,
        file: String,
        demo: bool,
    },
    Purge { module: String },
    Hook {
        module: String,
        kind: HookKind,
        name: String,
    },
}

impl Event {
    pub fn load(module: &str, file: &str) -> Self {
        Self::Load {
            module: module.to_string(),
            file: file.to_string(),
            demo: false,
        }
    }

    pub fn demo(module: &str, file: &str) -> Self {
        Self::Load {
            module: module.to_string(),
            file: file.to_string(),
            demo: true,
        }
    }

    pub fn purge(module: &str) -> Self {
        Self::Purge {
            module: module.to_string(),
        }
    }

    pub fn hook(module: &str, kind: HookKind, name: &str) -> Self {
        Self::Hook {
            module: module.to_string(),
            kind,
            name: name.to_string(),
        }
    }

    pub fn module(&self) -> &str {
        match self {
            Self::Load { module, .. } | Self::Purge { module } | Self::Hook { module, .. } => module,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<Event>,
    failing_files: BTreeSet<(String, String)>,
    failing_hooks: BTreeSet<(String, String)>,
    failing_purges: BTreeSet<String>,
}

/// Shared, cloneable call log.
///
/// Clones share the same log, so one clone can be handed to the loader as
/// record-loader, another as hook provider, and a third kept for assertions.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Inner>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loading `file` of `module` fail.
    pub fn fail_file(&self, module: &str, file: &str) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .failing_files
            .insert((module.to_string(), file.to_string()));
        self
    }

    /// Make the hook `name` of `module` fail.
    pub fn fail_hook(&self, module: &str, name: &str) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .failing_hooks
            .insert((module.to_string(), name.to_string()));
        self
    }

    /// Make purging the records of `module` fail.
    pub fn fail_purge(&self, module: &str) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .failing_purges
            .insert(module.to_string());
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn events_for(&self, module: &str) -> Vec<Event> {
        self.events().into_iter().filter(|e| e.module() == module).collect()
    }

    /// Files loaded for `module`, in order.
    pub fn files_for(&self, module: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Load { module: m, file, .. } if m == module => Some(file),
                _ => None,
            })
            .collect()
    }

    /// Modules in the order their first event was seen.
    pub fn modules(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for event in self.events() {
            if !seen.iter().any(|m| m == event.module()) {
                seen.push(event.module().to_string());
            }
        }
        seen
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().events.clear();
    }

    fn push(&self, event: Event) {
        self.inner.lock().unwrap().events.push(event);
    }
}

fn relative(file: &Path, root: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}

impl RecordLoader for EventLog {
    fn load(&self, file: &Path, ctx: &LoadContext<'_>) -> Result<(), DataFileError> {
        let relative = relative(file, ctx.root);
        self.push(Event::Load {
            module: ctx.module.to_string(),
            file: relative.clone(),
            demo: ctx.demo,
        });
        let failing = self
            .inner
            .lock()
            .unwrap()
            .failing_files
            .contains(&(ctx.module.to_string(), relative));
        if failing {
            Err(DataFileError::new(file, "record rejected"))
        } else {
            Ok(())
        }
    }

    fn purge(&self, ctx: &LoadContext<'_>) -> Result<(), DataFileError> {
        self.push(Event::purge(ctx.module));
        if self.inner.lock().unwrap().failing_purges.contains(ctx.module) {
            Err(DataFileError::new(ctx.root, "records still referenced"))
        } else {
            Ok(())
        }
    }
}

impl HookProvider for EventLog {
    fn run(&self, name: &str, ctx: &HookContext<'_>) -> Result<(), HookError> {
        self.push(Event::hook(ctx.module, ctx.kind, name));
        let failing = self
            .inner
            .lock()
            .unwrap()
            .failing_hooks
            .contains(&(ctx.module.to_string(), name.to_string()));
        if failing {
            Err(HookError::Failed {
                name: name.to_string(),
                message: "hook raised".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
