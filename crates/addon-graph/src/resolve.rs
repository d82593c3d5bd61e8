//! Turning discovered manifests into a load order.
//!
//! Resolution never fails as a whole. Modules that cannot be loaded are left
//! out of the order and reported in [`Resolution::excluded`] with the reason,
//! and everything depending on them is excluded with them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use addon_manifest::Manifest;

use crate::graph::DependencyGraph;

/// Which modules the order should contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every installable module that is not auto-install, plus the
    /// auto-install modules they trigger.
    All,
    /// The listed modules and their dependency closure, plus triggered
    /// auto-install modules.
    Only(BTreeSet<String>),
}

impl Selection {
    pub fn only<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(keys.into_iter().map(Into::into).collect())
    }
}

/// When an auto-install module is pulled into the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AutoInstallPolicy {
    /// As soon as every trigger is selected.
    #[default]
    Always,
    /// Every trigger is selected and at least one of them is fresh, meaning
    /// selected but not in `installed`.
    OnFreshTrigger { installed: BTreeSet<String> },
}

/// Why a module was left out of the order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    /// The descriptor sets `installable` to false.
    NotInstallable,
    /// A declared dependency was not discovered.
    MissingDep(String),
    /// Member of the cycle with this index in [`Resolution::cycles`].
    CycleMember(usize),
    /// A direct dependency is itself excluded.
    DependsOnExcluded(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstallable => write!(f, "not installable"),
            Self::MissingDep(key) => write!(f, "depends on missing module '{key}'"),
            Self::CycleMember(id) => write!(f, "member of dependency cycle #{id}"),
            Self::DependsOnExcluded(key) => write!(f, "depends on excluded module '{key}'"),
        }
    }
}

/// Two selected modules that declare each other incompatible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Conflict {
    Incompatible(String, String),
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incompatible(a, b) => write!(f, "modules '{a}' and '{b}' are incompatible"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Load order, dependencies first.
    pub order: Vec<String>,
    /// Every module that cannot be loaded, with the reason.
    pub excluded: BTreeMap<String, ExclusionReason>,
    /// Detected cycles; `CycleMember(i)` refers to `cycles[i]`.
    pub cycles: Vec<Vec<String>>,
    /// Auto-install modules pulled in by their triggers, in order.
    pub auto_installed: Vec<String>,
    /// Requested keys that were never discovered.
    pub unknown: Vec<String>,
    /// Requested keys that are excluded.
    pub blocked: Vec<String>,
    pub conflicts: Vec<Conflict>,
}

impl Resolution {
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    pub fn reason(&self, key: &str) -> Option<&ExclusionReason> {
        self.excluded.get(key)
    }

    /// Whether the requested selection loads in full.
    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty() && self.blocked.is_empty() && self.conflicts.is_empty()
    }
}

/// Computes load orders over a fixed set of manifests.
pub struct Resolver<'a> {
    manifests: &'a BTreeMap<String, Manifest>,
    policy: AutoInstallPolicy,
}

impl<'a> Resolver<'a> {
    pub fn new(manifests: &'a BTreeMap<String, Manifest>) -> Self {
        Self {
            manifests,
            policy: AutoInstallPolicy::Always,
        }
    }

    pub fn with_policy(mut self, policy: AutoInstallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resolve(&self, selection: &Selection) -> Resolution {
        let mut resolution = Resolution::default();

        let graph = self.declared_graph();
        self.classify(&graph, &mut resolution);

        let mut selected = self.select(selection, &mut resolution);
        let triggered = self.trigger_auto_installs(&mut selected, &resolution);

        resolution.order = self.order(&selected, &triggered, &mut resolution);
        if let Selection::Only(keys) = selection {
            for key in keys {
                if resolution.excluded.contains_key(key) && !resolution.blocked.contains(key) {
                    resolution.blocked.push(key.clone());
                }
            }
        }
        resolution.auto_installed = resolution
            .order
            .iter()
            .filter(|key| triggered.contains(*key))
            .cloned()
            .collect();
        resolution.conflicts = self.conflicts(&selected);

        tracing::debug!(
            ordered = resolution.order.len(),
            excluded = resolution.excluded.len(),
            auto_installed = resolution.auto_installed.len(),
            "Resolved load order"
        );
        resolution
    }

    /// Graph of every discovered module and the dependencies that exist.
    ///
    /// A module that is not installable keeps its node but no outgoing
    /// edges, so it never closes a cycle and its dependents are excluded
    /// because of it.
    fn declared_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (key, manifest) in self.manifests {
            graph.add_node(key.as_str());
            if !manifest.installable {
                continue;
            }
            for dep in &manifest.depends {
                if self.manifests.contains_key(dep) {
                    graph.add_edge(key, dep);
                }
            }
        }
        graph
    }

    /// Fill `excluded` and `cycles`.
    fn classify(&self, graph: &DependencyGraph, resolution: &mut Resolution) {
        resolution.cycles = graph.cycles();
        for (id, cycle) in resolution.cycles.iter().enumerate() {
            for member in cycle {
                resolution
                    .excluded
                    .insert(member.clone(), ExclusionReason::CycleMember(id));
            }
        }

        for (key, manifest) in self.manifests {
            if !manifest.installable {
                resolution
                    .excluded
                    .insert(key.clone(), ExclusionReason::NotInstallable);
                continue;
            }
            if resolution.excluded.contains_key(key) {
                continue;
            }
            if let Some(missing) = manifest
                .depends
                .iter()
                .find(|dep| !self.manifests.contains_key(dep.as_str()))
            {
                resolution
                    .excluded
                    .insert(key.clone(), ExclusionReason::MissingDep(missing.clone()));
            }
        }

        // Everything reaching an excluded module is excluded too, naming the
        // first declared dependency that is excluded.
        let affected = graph.dependent_closure(resolution.excluded.keys().map(String::as_str));
        for key in &affected {
            if resolution.excluded.contains_key(key) {
                continue;
            }
            let blocking = self.manifests.get(key).and_then(|manifest| {
                manifest
                    .depends
                    .iter()
                    .find(|dep| affected.contains(dep.as_str()))
            });
            if let Some(dep) = blocking {
                resolution
                    .excluded
                    .insert(key.clone(), ExclusionReason::DependsOnExcluded(dep.clone()));
            }
        }
    }

    fn select(&self, selection: &Selection, resolution: &mut Resolution) -> BTreeSet<String> {
        let excluded = &resolution.excluded;
        let mut selected = BTreeSet::new();
        let roots: Vec<&str> = match selection {
            Selection::All => self
                .manifests
                .iter()
                .filter(|(key, m)| !m.is_auto_install() && !excluded.contains_key(*key))
                .map(|(key, _)| key.as_str())
                .collect(),
            Selection::Only(keys) => {
                let mut roots = Vec::new();
                for key in keys {
                    if !self.manifests.contains_key(key) {
                        resolution.unknown.push(key.clone());
                    } else if excluded.contains_key(key) {
                        resolution.blocked.push(key.clone());
                    } else {
                        roots.push(key.as_str());
                    }
                }
                roots
            }
        };

        for root in roots {
            self.add_with_dependencies(root, &mut selected);
        }
        selected
    }

    /// Add `key` and its dependencies. Only called for resolvable keys, whose
    /// dependencies are all resolvable.
    fn add_with_dependencies(&self, key: &str, selected: &mut BTreeSet<String>) -> Vec<String> {
        let mut added = Vec::new();
        let mut pending = vec![key];
        while let Some(current) = pending.pop() {
            if !selected.insert(current.to_string()) {
                continue;
            }
            added.push(current.to_string());
            if let Some(manifest) = self.manifests.get(current) {
                pending.extend(manifest.depends.iter().map(String::as_str));
            }
        }
        added
    }

    /// Grow `selected` with auto-install modules until nothing else triggers.
    fn trigger_auto_installs(
        &self,
        selected: &mut BTreeSet<String>,
        resolution: &Resolution,
    ) -> BTreeSet<String> {
        let mut fresh: BTreeSet<String> = match &self.policy {
            AutoInstallPolicy::Always => BTreeSet::new(),
            AutoInstallPolicy::OnFreshTrigger { installed } => {
                selected.difference(installed).cloned().collect()
            }
        };
        let mut triggered = BTreeSet::new();

        loop {
            let mut changed = false;
            for (key, manifest) in self.installable() {
                if !manifest.is_auto_install()
                    || selected.contains(key)
                    || resolution.excluded.contains_key(key)
                {
                    continue;
                }
                let triggers = manifest.auto_install_triggers();
                if !triggers.iter().all(|t| selected.contains(t)) {
                    continue;
                }
                let fires = match &self.policy {
                    AutoInstallPolicy::Always => true,
                    AutoInstallPolicy::OnFreshTrigger { .. } if triggers.is_empty() => {
                        !fresh.is_empty()
                    }
                    AutoInstallPolicy::OnFreshTrigger { .. } => {
                        triggers.iter().any(|t| fresh.contains(t))
                    }
                };
                if !fires {
                    continue;
                }

                tracing::debug!(module = %key, "Auto-install triggered");
                let added = self.add_with_dependencies(key, selected);
                if let AutoInstallPolicy::OnFreshTrigger { installed } = &self.policy {
                    fresh.extend(added.into_iter().filter(|k| !installed.contains(k)));
                }
                triggered.insert(key.clone());
                changed = true;
            }
            if !changed {
                break;
            }
        }
        triggered
    }

    fn order(
        &self,
        selected: &BTreeSet<String>,
        triggered: &BTreeSet<String>,
        resolution: &mut Resolution,
    ) -> Vec<String> {
        let rank = |key: &str| u8::from(!triggered.contains(key));
        let graph = self.ordering_graph(selected, triggered);
        match graph.topological_sort_by(rank) {
            Ok(order) => order,
            Err(crate::Error::DependencyCycle { .. }) => {
                // Only reachable when auto-install triggers close a loop.
                let affected = self.exclude_ordering_cycles(&graph, triggered, resolution);
                let remaining: BTreeSet<String> = selected.difference(&affected).cloned().collect();
                self.ordering_graph(&remaining, triggered)
                    .topological_sort_by(rank)
                    .unwrap_or_default()
            }
        }
    }

    /// Exclude the cycles of an ordering graph and everything reaching them.
    /// Returns the excluded keys.
    fn exclude_ordering_cycles(
        &self,
        graph: &DependencyGraph,
        triggered: &BTreeSet<String>,
        resolution: &mut Resolution,
    ) -> BTreeSet<String> {
        let mut members = BTreeSet::new();
        for cycle in graph.cycles() {
            let id = resolution.cycles.len();
            for member in &cycle {
                resolution
                    .excluded
                    .insert(member.clone(), ExclusionReason::CycleMember(id));
                members.insert(member.clone());
            }
            resolution.cycles.push(cycle);
        }

        let affected = graph.dependent_closure(members.iter().map(String::as_str));
        for key in affected.difference(&members) {
            let Some(manifest) = self.manifests.get(key) else {
                continue;
            };
            let triggers = if triggered.contains(key) {
                manifest.auto_install_triggers()
            } else {
                &[]
            };
            let blocking = manifest
                .depends
                .iter()
                .chain(triggers)
                .find(|dep| affected.contains(dep.as_str()));
            if let Some(dep) = blocking {
                resolution
                    .excluded
                    .insert(key.clone(), ExclusionReason::DependsOnExcluded(dep.clone()));
            }
        }
        affected
    }

    /// Graph of the selected modules. Triggered auto-install modules also
    /// wait for their triggers.
    fn ordering_graph(&self, selected: &BTreeSet<String>, triggered: &BTreeSet<String>) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for key in selected {
            graph.add_node(key.as_str());
            let Some(manifest) = self.manifests.get(key) else {
                continue;
            };
            let triggers = if triggered.contains(key) {
                manifest.auto_install_triggers()
            } else {
                &[]
            };
            for dep in manifest.depends.iter().chain(triggers) {
                if selected.contains(dep) {
                    graph.add_edge(key, dep);
                }
            }
        }
        graph
    }

    fn conflicts(&self, selected: &BTreeSet<String>) -> Vec<Conflict> {
        let mut conflicts = BTreeSet::new();
        for key in selected {
            let Some(manifest) = self.manifests.get(key) else {
                continue;
            };
            for other in &manifest.excludes {
                if other != key && selected.contains(other) {
                    let (a, b) = if key < other { (key, other) } else { (other, key) };
                    conflicts.insert(Conflict::Incompatible(a.clone(), b.clone()));
                }
            }
        }
        conflicts.into_iter().collect()
    }

    fn installable(&self) -> impl Iterator<Item = (&'a String, &'a Manifest)> {
        self.manifests.iter().filter(|(_, m)| m.installable)
    }
}

/// Resolve with the default auto-install policy.
pub fn resolve(manifests: &BTreeMap<String, Manifest>, selection: &Selection) -> Resolution {
    Resolver::new(manifests).resolve(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use addon_manifest::AutoInstall;

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn trigger_loop_excludes_members_and_dependents_only() {
        let mut bridge = Manifest::new("bridge");
        bridge.auto_install = AutoInstall::Modules(vec!["sale".to_string()]);
        let mut sale = Manifest::new("sale");
        sale.depends = vec!["bridge".to_string()];
        let mut report = Manifest::new("report");
        report.depends = vec!["sale".to_string()];
        let manifests: BTreeMap<String, Manifest> = [bridge, sale, report, Manifest::new("base")]
            .into_iter()
            .map(|m| (m.key.clone(), m))
            .collect();

        let mut resolution = Resolution::default();
        let order = Resolver::new(&manifests).order(
            &keys(&["base", "bridge", "report", "sale"]),
            &keys(&["bridge"]),
            &mut resolution,
        );

        assert_eq!(order, vec!["base"]);
        assert_eq!(resolution.cycles, vec![vec!["bridge".to_string(), "sale".to_string()]]);
        assert_eq!(resolution.reason("bridge"), Some(&ExclusionReason::CycleMember(0)));
        assert_eq!(resolution.reason("sale"), Some(&ExclusionReason::CycleMember(0)));
        assert_eq!(
            resolution.reason("report"),
            Some(&ExclusionReason::DependsOnExcluded("sale".to_string()))
        );
        assert!(resolution.reason("base").is_none());
    }
}
