//! Load passes
//!
//! A pass runs, in order: discover addons, mark the request in the state
//! ledger, resolve the load order, compose contributions, remove modules,
//! install and upgrade modules, recompose what ended up installed, persist
//! the ledger and publish the registry.
//!
//! Errors returned by [`Loader::run`] are raised before anything is applied,
//! so they leave the published registry and the persisted state untouched.
//! Failures of single modules are collected in the [`LoadReport`] instead.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock};

use addon_graph::{AutoInstallPolicy, Conflict, DependencyGraph, Resolution, Resolver, Selection};
use addon_manifest::{Discovery, Manifest, discover};
use addon_registry::{ModelRegistry, ModuleContributions, PublishedRegistry, compose};
use serde::Serialize;

use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::external;
use crate::hooks::{HookContext, HookKind, HookProvider, ScriptHooks};
use crate::lock::PassGuard;
use crate::records::{FileCheckLoader, LoadContext, RecordLoader};
use crate::report::{AbortCause, Aborted, Exclusion, LoadReport};
use crate::source::{DeclarativeSource, ModuleSource};
use crate::state::{ModuleState, StateLedger};

/// What a pass should change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Load what is installed
    Load,
    /// Install modules with their dependencies
    Install(Vec<String>),
    /// Re-apply modules and every installed module depending on them
    Upgrade(Vec<String>),
    /// Remove modules; `cascade` also removes installed dependents
    Remove { keys: Vec<String>, cascade: bool },
}

impl Request {
    pub fn install<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Install(keys.into_iter().map(Into::into).collect())
    }

    pub fn upgrade<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Upgrade(keys.into_iter().map(Into::into).collect())
    }

    pub fn remove<I, S>(keys: I, cascade: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Remove {
            keys: keys.into_iter().map(Into::into).collect(),
            cascade,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Install(keys) => write!(f, "install {}", keys.join(", ")),
            Self::Upgrade(keys) => write!(f, "upgrade {}", keys.join(", ")),
            Self::Remove { keys, cascade: false } => write!(f, "remove {}", keys.join(", ")),
            Self::Remove { keys, cascade: true } => write!(f, "remove {} (cascade)", keys.join(", ")),
        }
    }
}

/// One row of [`Loader::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub key: String,
    pub name: Option<String>,
    /// Version in the descriptor
    pub version: Option<String>,
    pub state: ModuleState,
    pub installed_version: Option<String>,
    pub application: bool,
    pub auto_install: bool,
    /// The descriptor changed since it was last applied
    pub checksum_drift: bool,
    /// Addon directory; `None` when the module is no longer discovered
    pub path: Option<PathBuf>,
    /// Why the descriptor could not be read
    pub error: Option<String>,
}

/// Runs load passes and holds the published registry.
pub struct Loader {
    config: LoaderConfig,
    source: Box<dyn ModuleSource>,
    records: Box<dyn RecordLoader>,
    hooks: Box<dyn HookProvider>,
    published: RwLock<Arc<PublishedRegistry>>,
    busy: AtomicBool,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Builder for [`Loader`]
pub struct LoaderBuilder {
    config: LoaderConfig,
    source: Box<dyn ModuleSource>,
    records: Box<dyn RecordLoader>,
    hooks: Box<dyn HookProvider>,
}

impl LoaderBuilder {
    pub fn source(mut self, source: impl ModuleSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn records(mut self, records: impl RecordLoader + 'static) -> Self {
        self.records = Box::new(records);
        self
    }

    pub fn hooks(mut self, hooks: impl HookProvider + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn build(self) -> Loader {
        Loader {
            config: self.config,
            source: self.source,
            records: self.records,
            hooks: self.hooks,
            published: RwLock::new(Arc::new(PublishedRegistry::empty())),
            busy: AtomicBool::new(false),
        }
    }
}

impl Loader {
    /// A loader reading `models/*.toml`, checking data files and running
    /// hook scripts.
    pub fn new(config: LoaderConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: LoaderConfig) -> LoaderBuilder {
        LoaderBuilder {
            config,
            source: Box::new(DeclarativeSource),
            records: Box::new(FileCheckLoader),
            hooks: Box::new(ScriptHooks),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The registry published by the last successful pass.
    pub fn registry(&self) -> Arc<PublishedRegistry> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one load pass.
    ///
    /// # Errors
    ///
    /// - `LoaderBusy` if another pass holds the loader
    /// - `UnknownModule`, `NotInstalled`, `RemoveRefused` for invalid requests
    /// - `Incompatible` if the target set holds mutually exclusive modules
    /// - `Compose` for a duplicate model declaration
    /// - discovery, state and I/O errors
    pub fn run(&self, request: &Request) -> Result<LoadReport> {
        let _guard = PassGuard::acquire(&self.busy, &self.config.lock_file())?;
        tracing::info!(%request, "Load pass started");

        let discovery = discover(&self.config.addons_paths)?;
        let mut ledger = StateLedger::load_or_default(&self.config.state_file)?;
        ledger.sync_installable(
            discovery
                .manifests
                .iter()
                .map(|(key, manifest)| (key.as_str(), manifest.installable)),
        );

        let mut pass = Pass::new(self, &discovery, ledger);
        pass.plan(request)?;
        let resolution = pass.resolve()?;
        let (registry, modules) = pass.compose(&resolution.order)?;
        pass.mark(&modules)?;
        pass.remove_modules(&registry)?;
        pass.apply_modules(&modules, &registry)?;

        let installed: Vec<ModuleContributions> = modules
            .into_iter()
            .filter(|m| pass.ledger.state(&m.module).is_installed())
            .collect();
        let published = Arc::new(compose(&installed)?.registry.publish());

        let Pass {
            ledger, mut report, ..
        } = pass;
        ledger.save(&self.config.state_file)?;

        report.loaded = published.modules().to_vec();
        report
            .auto_installed
            .retain(|key| report.installed.contains(key));
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = published;

        tracing::info!(
            loaded = report.loaded.len(),
            installed = report.installed.len(),
            upgraded = report.upgraded.len(),
            removed = report.removed.len(),
            aborted = report.aborted.len(),
            "Load pass finished"
        );
        Ok(report)
    }

    /// Discovered and recorded modules with their state, in key order.
    pub fn status(&self) -> Result<Vec<ModuleStatus>> {
        let discovery = discover(&self.config.addons_paths)?;
        let ledger = StateLedger::load_or_default(&self.config.state_file)?;
        let mut rows: BTreeMap<String, ModuleStatus> = BTreeMap::new();

        for (key, manifest) in &discovery.manifests {
            let record = ledger.record(key);
            let state = match ledger.state(key) {
                ModuleState::Uninstalled if !manifest.installable => ModuleState::Uninstallable,
                state => state,
            };
            let checksum_drift = record
                .and_then(|r| r.checksum.as_deref())
                .is_some_and(|checksum| checksum != manifest.checksum);
            rows.insert(
                key.clone(),
                ModuleStatus {
                    key: key.clone(),
                    name: Some(manifest.name.clone()),
                    version: Some(manifest.version.clone()),
                    state,
                    installed_version: record.and_then(|r| r.installed_version.clone()),
                    application: manifest.application,
                    auto_install: manifest.is_auto_install(),
                    checksum_drift,
                    path: Some(manifest.root.clone()),
                    error: None,
                },
            );
        }

        for failure in &discovery.failures {
            rows.insert(
                failure.key.clone(),
                ModuleStatus {
                    key: failure.key.clone(),
                    name: None,
                    version: None,
                    state: ledger.state(&failure.key),
                    installed_version: ledger
                        .record(&failure.key)
                        .and_then(|r| r.installed_version.clone()),
                    application: false,
                    auto_install: false,
                    checksum_drift: false,
                    path: Some(failure.path.clone()),
                    error: Some(failure.error.to_string()),
                },
            );
        }

        for (key, record) in ledger.records() {
            if rows.contains_key(key) {
                continue;
            }
            rows.insert(
                key.to_string(),
                ModuleStatus {
                    key: key.to_string(),
                    name: None,
                    version: None,
                    state: record.state,
                    installed_version: record.installed_version.clone(),
                    application: false,
                    auto_install: false,
                    checksum_drift: false,
                    path: None,
                    error: None,
                },
            );
        }

        Ok(rows.into_values().collect())
    }
}

/// Working state of one pass.
struct Pass<'a> {
    loader: &'a Loader,
    manifests: &'a BTreeMap<String, Manifest>,
    /// Descriptors that failed to read
    unreadable: BTreeSet<String>,
    /// Every discovered module and the dependencies that exist
    graph: DependencyGraph,
    ledger: StateLedger,
    /// Installed when the pass started
    installed: BTreeSet<String>,
    install: BTreeSet<String>,
    upgrade: BTreeSet<String>,
    remove: BTreeSet<String>,
    report: LoadReport,
}

impl<'a> Pass<'a> {
    fn new(loader: &'a Loader, discovery: &'a Discovery, ledger: StateLedger) -> Self {
        let mut report = LoadReport::default();
        for warning in &discovery.warnings {
            report.warn(warning.to_string());
        }
        let mut unreadable = BTreeSet::new();
        for failure in &discovery.failures {
            unreadable.insert(failure.key.clone());
            report
                .excluded
                .insert(failure.key.clone(), Exclusion::Unreadable(failure.error.to_string()));
        }

        let mut graph = DependencyGraph::new();
        for (key, manifest) in &discovery.manifests {
            graph.add_node(key.as_str());
            for dep in &manifest.depends {
                if discovery.manifests.contains_key(dep) {
                    graph.add_edge(key, dep);
                }
            }
        }

        let installed = ledger.installed();
        Self {
            loader,
            manifests: &discovery.manifests,
            unreadable,
            graph,
            ledger,
            installed,
            install: BTreeSet::new(),
            upgrade: BTreeSet::new(),
            remove: BTreeSet::new(),
            report,
        }
    }

    fn is_known(&self, key: &str) -> bool {
        self.manifests.contains_key(key) || self.unreadable.contains(key)
    }

    /// Transitive dependencies of `key`, without `key`.
    fn dependencies(&self, key: &str) -> BTreeSet<String> {
        let mut closure = self.graph.dependency_closure([key]);
        closure.remove(key);
        closure
    }

    /// Installed modules depending on `keys`, transitively, with `keys`.
    fn installed_dependents(&self, keys: &[String]) -> BTreeSet<String> {
        self.graph
            .dependent_closure(keys.iter().map(String::as_str))
            .into_iter()
            .filter(|key| self.installed.contains(key))
            .collect()
    }

    fn check_known(&self, keys: &[String]) -> Result<()> {
        let unknown: Vec<String> = keys.iter().filter(|k| !self.is_known(k)).cloned().collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::UnknownModule(unknown))
        }
    }

    fn check_installed(&self, keys: &[String]) -> Result<()> {
        match keys.iter().find(|k| !self.installed.contains(*k)) {
            Some(key) => Err(Error::NotInstalled(key.clone())),
            None => Ok(()),
        }
    }

    /// Validate the request and decide what to install, upgrade and remove.
    fn plan(&mut self, request: &Request) -> Result<()> {
        for key in &self.loader.config.server_wide_modules {
            if self.manifests.contains_key(key) && !self.installed.contains(key) {
                self.install.insert(key.clone());
            }
        }

        match request {
            Request::Load => {}
            Request::Install(keys) => {
                self.check_known(keys)?;
                for key in keys {
                    if self.installed.contains(key) {
                        self.report.warn(format!("module '{key}' is already installed"));
                    } else {
                        self.install.insert(key.clone());
                    }
                }
            }
            Request::Upgrade(keys) => {
                self.check_known(keys)?;
                self.check_installed(keys)?;
                self.upgrade = self.installed_dependents(keys);
            }
            Request::Remove { keys, cascade } => {
                self.check_known(keys)?;
                self.check_installed(keys)?;
                self.plan_removal(keys, *cascade)?;
            }
        }
        Ok(())
    }

    fn plan_removal(&mut self, keys: &[String], cascade: bool) -> Result<()> {
        let requested: BTreeSet<&str> = keys.iter().map(String::as_str).collect();
        for key in keys {
            if !self.manifests.contains_key(key) {
                return Err(Error::RemoveRefused {
                    key: key.clone(),
                    reason: "its descriptor cannot be read".to_string(),
                });
            }
            if !cascade {
                let blocking: Vec<String> = self
                    .installed_dependents(std::slice::from_ref(key))
                    .into_iter()
                    .filter(|k| !requested.contains(k.as_str()))
                    .collect();
                if !blocking.is_empty() {
                    return Err(Error::RemoveRefused {
                        key: key.clone(),
                        reason: format!("required by installed module(s) {}", blocking.join(", ")),
                    });
                }
            }
        }

        let removal = self.installed_dependents(keys);
        if let Some(key) = removal.iter().find(|k| self.loader.config.is_server_wide(k)) {
            return Err(Error::RemoveRefused {
                key: key.clone(),
                reason: "it is a server-wide module".to_string(),
            });
        }
        self.remove = removal;
        Ok(())
    }

    fn resolve(&mut self) -> Result<Resolution> {
        let mut target: BTreeSet<String> = BTreeSet::new();
        // Removal targets stay in the order so that a module whose removal
        // aborts is composed back into the published registry.
        for key in &self.installed {
            if self.is_known(key) {
                target.insert(key.clone());
            } else {
                self.report
                    .warn(format!("installed module '{key}' is no longer in any addons path"));
            }
        }
        target.extend(self.install.iter().cloned());

        let resolution = Resolver::new(self.manifests)
            .with_policy(AutoInstallPolicy::OnFreshTrigger {
                installed: self.installed.clone(),
            })
            .resolve(&Selection::Only(target));

        if let Some(Conflict::Incompatible(a, b)) = resolution.conflicts.first() {
            return Err(Error::Incompatible(a.clone(), b.clone()));
        }

        for (key, reason) in &resolution.excluded {
            self.report
                .excluded
                .insert(key.clone(), Exclusion::Unresolvable(reason.clone()));
        }
        for key in resolution.blocked.iter().chain(&resolution.unknown) {
            if self.remove.contains(key) {
                continue;
            }
            if self.installed.contains(key) {
                let reason = self
                    .report
                    .excluded
                    .get(key)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                self.report
                    .warn(format!("installed module '{key}' cannot be loaded: {reason}"));
            }
            self.report.blocked.push(key.clone());
        }
        self.report.auto_installed = resolution.auto_installed.clone();
        Ok(resolution)
    }

    /// Collect contributions along `order` and compose them.
    ///
    /// Returns the working registry and the contributions of every module
    /// that composed cleanly, in order.
    fn compose(&mut self, order: &[String]) -> Result<(ModelRegistry, Vec<ModuleContributions>)> {
        let manifests = self.manifests;
        let mut modules = Vec::with_capacity(order.len());
        let mut dropped: BTreeSet<String> = BTreeSet::new();

        for key in order {
            let Some(manifest) = manifests.get(key) else {
                continue;
            };
            let dependencies = self.dependencies(key);
            if let Some(dependency) = dependencies.iter().find(|d| dropped.contains(*d)) {
                let error = addon_registry::Error::DependencyRejected {
                    module: key.clone(),
                    dependency: dependency.clone(),
                };
                self.report.excluded.insert(key.clone(), Exclusion::Rejected(error));
                dropped.insert(key.clone());
                continue;
            }
            match self.loader.source.contributions(manifest) {
                Ok(contributions) => modules.push(ModuleContributions {
                    module: key.clone(),
                    dependencies,
                    contributions,
                }),
                Err(error) => {
                    tracing::warn!(module = %key, "{}", error);
                    self.report
                        .excluded
                        .insert(key.clone(), Exclusion::ContributionsUnavailable(error.to_string()));
                    dropped.insert(key.clone());
                }
            }
        }

        let composition = compose(&modules)?;
        for error in composition.rejected {
            let module = error.module().to_string();
            dropped.insert(module.clone());
            self.report.excluded.insert(module, Exclusion::Rejected(error));
        }

        for key in &dropped {
            if self.installed.contains(key) {
                self.report
                    .warn(format!("installed module '{key}' was left out of the registry"));
            }
            if self.install.contains(key) || self.upgrade.contains(key) {
                self.report.blocked.push(key.clone());
            }
        }
        self.report
            .auto_installed
            .retain(|key| !dropped.contains(key));

        modules.retain(|m| !dropped.contains(&m.module));
        Ok((composition.registry, modules))
    }

    /// Record the planned transitions in the ledger.
    fn mark(&mut self, modules: &[ModuleContributions]) -> Result<()> {
        for module in modules {
            let key = module.module.as_str();
            if !self.installed.contains(key) {
                self.ledger.transition(key, ModuleState::ToInstall)?;
            } else if self.upgrade.contains(key) {
                self.ledger.transition(key, ModuleState::ToUpgrade)?;
            }
        }
        for key in &self.remove {
            self.ledger.transition(key, ModuleState::ToRemove)?;
        }
        Ok(())
    }

    fn removal_order(&self) -> Vec<String> {
        let mut graph = DependencyGraph::new();
        for key in &self.remove {
            graph.add_node(key.as_str());
            for dep in self.graph.dependencies_of(key) {
                if self.remove.contains(dep) {
                    graph.add_edge(key, dep);
                }
            }
        }
        let mut order = graph
            .topological_sort()
            .unwrap_or_else(|_| self.remove.iter().cloned().collect());
        order.reverse();
        order
    }

    /// Uninstall hook, then purge, dependents first.
    ///
    /// A module stays installed while any module depending on it does, so an
    /// aborted removal keeps its whole dependency chain in place.
    fn remove_modules(&mut self, registry: &ModelRegistry) -> Result<()> {
        let manifests = self.manifests;
        let mut kept: BTreeSet<String> = BTreeSet::new();

        for key in self.removal_order() {
            let Some(manifest) = manifests.get(&key) else {
                continue;
            };
            let dependent = self
                .graph
                .dependent_closure([key.as_str()])
                .into_iter()
                .find(|d| *d != key && kept.contains(d));

            let outcome = match dependent {
                Some(dependent) => Err(AbortCause::DependentAborted { dependent }),
                None => {
                    let dependencies = self.dependencies(&key);
                    let ctx = LoadContext {
                        module: &key,
                        root: &manifest.root,
                        dependencies: &dependencies,
                        registry,
                        demo: false,
                    };
                    self.run_hook(manifest, HookKind::Uninstall).and_then(|()| {
                        self.loader
                            .records
                            .purge(&ctx)
                            .map_err(|e| AbortCause::Purge { message: e.to_string() })
                    })
                }
            };
            match outcome {
                Ok(()) => {
                    tracing::debug!(module = %key, "Module removed");
                    self.ledger.mark_removed(&key)?;
                    self.report.removed.push(key);
                }
                Err(cause) => {
                    self.ledger.transition(&key, ModuleState::Installed)?;
                    self.abort(&key, cause);
                    kept.insert(key);
                }
            }
        }
        Ok(())
    }

    /// Install and upgrade marked modules in load order.
    fn apply_modules(&mut self, modules: &[ModuleContributions], registry: &ModelRegistry) -> Result<()> {
        let manifests = self.manifests;
        let mut aborted: BTreeSet<String> = BTreeSet::new();

        for module in modules {
            let key = module.module.as_str();
            let state = self.ledger.state(key);
            if !matches!(state, ModuleState::ToInstall | ModuleState::ToUpgrade) {
                continue;
            }
            let Some(manifest) = manifests.get(key) else {
                continue;
            };

            let outcome = match module.dependencies.iter().find(|d| aborted.contains(*d)) {
                Some(dependency) => Err(AbortCause::DependencyAborted {
                    dependency: dependency.clone(),
                }),
                None if state == ModuleState::ToInstall => {
                    self.install_module(manifest, &module.dependencies, registry)
                }
                None => self.load_files(manifest, &module.dependencies, registry),
            };

            match outcome {
                Ok(()) => {
                    self.ledger
                        .mark_installed(key, &manifest.version, &manifest.checksum)?;
                    if state == ModuleState::ToInstall {
                        tracing::info!(module = %key, version = %manifest.version, "Module installed");
                        self.report.installed.push(key.to_string());
                    } else {
                        tracing::info!(module = %key, version = %manifest.version, "Module upgraded");
                        self.report.upgraded.push(key.to_string());
                    }
                }
                Err(cause) => {
                    let rollback = if state == ModuleState::ToInstall {
                        ModuleState::Uninstalled
                    } else {
                        ModuleState::Installed
                    };
                    self.ledger.transition(key, rollback)?;
                    aborted.insert(key.to_string());
                    self.abort(key, cause);
                }
            }
        }
        Ok(())
    }

    fn install_module(
        &mut self,
        manifest: &Manifest,
        dependencies: &BTreeSet<String>,
        registry: &ModelRegistry,
    ) -> std::result::Result<(), AbortCause> {
        if self.loader.config.check_external_dependencies {
            for missing in external::probe(&manifest.external_dependencies) {
                self.report.warn(format!("{}: {missing}", manifest.key));
            }
        }
        self.run_hook(manifest, HookKind::PreInit)?;
        self.load_files(manifest, dependencies, registry)?;
        self.run_hook(manifest, HookKind::PostInit)
    }

    /// Data files in declared order, then demo files when configured.
    fn load_files(
        &self,
        manifest: &Manifest,
        dependencies: &BTreeSet<String>,
        registry: &ModelRegistry,
    ) -> std::result::Result<(), AbortCause> {
        let ctx = LoadContext {
            module: &manifest.key,
            root: &manifest.root,
            dependencies,
            registry,
            demo: false,
        };
        for file in &manifest.data {
            self.load_file(manifest, file, &ctx)?;
        }
        if self.loader.config.load_demo {
            let ctx = LoadContext { demo: true, ..ctx };
            for file in &manifest.demo {
                self.load_file(manifest, file, &ctx)?;
            }
        }
        Ok(())
    }

    fn load_file(&self, manifest: &Manifest, file: &str, ctx: &LoadContext<'_>) -> std::result::Result<(), AbortCause> {
        let path = manifest.resolve(file);
        tracing::debug!(module = %manifest.key, file = %file, demo = ctx.demo, "Loading data file");
        self.loader
            .records
            .load(&path, ctx)
            .map_err(|e| AbortCause::DataFile {
                path: e.path,
                message: e.message,
            })
    }

    fn run_hook(&self, manifest: &Manifest, kind: HookKind) -> std::result::Result<(), AbortCause> {
        let name = match kind {
            HookKind::PreInit => &manifest.hooks.pre_init,
            HookKind::PostInit => &manifest.hooks.post_init,
            HookKind::Uninstall => &manifest.hooks.uninstall,
        };
        let Some(name) = name else {
            return Ok(());
        };
        tracing::debug!(module = %manifest.key, hook = %name, %kind, "Running hook");
        let ctx = HookContext {
            module: &manifest.key,
            root: &manifest.root,
            kind,
        };
        self.loader
            .hooks
            .run(name, &ctx)
            .map_err(|e| AbortCause::Hook {
                event: kind,
                hook: name.clone(),
                message: e.to_string(),
            })
    }

    fn abort(&mut self, key: &str, cause: AbortCause) {
        tracing::warn!(module = %key, "Transition aborted: {}", cause);
        self.report.aborted.push(Aborted {
            module: key.to_string(),
            cause,
        });
    }
}
