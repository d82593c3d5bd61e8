//! Directed dependency graph over technical keys.
//!
//! Edges point from dependent to dependency: if A depends on B, the edge is
//! `A -> B`. Every traversal visits keys in ASCII order so that results are
//! identical across runs.
//!
//! # Example
//!
//! ```
//! use addon_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("sale_crm");
//! graph.add_edge("sale_crm", "sale");
//! graph.add_edge("sale", "base");
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["base", "sale", "sale_crm"]);
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Adjacency list: key depends on each value.
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, id: impl Into<String>) {
        self.edges.entry(id.into()).or_default();
    }

    /// Declare that `from` depends on `to`, adding both nodes if needed.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges.entry(to.to_string()).or_default();
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Node keys in ASCII order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .get(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Nodes that depend directly on `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(id))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// `roots` plus everything they depend on, transitively.
    pub fn dependency_closure<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<&str> = roots.into_iter().collect();
        while let Some(id) = pending.pop() {
            if !seen.insert(id.to_string()) {
                continue;
            }
            pending.extend(self.dependencies_of(id));
        }
        seen
    }

    /// `roots` plus everything that depends on them, transitively.
    pub fn dependent_closure<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<&str> = roots.into_iter().collect();
        while let Some(id) = pending.pop() {
            if !seen.insert(id.to_string()) {
                continue;
            }
            pending.extend(self.dependents_of(id));
        }
        seen
    }

    /// Strongly connected components, found with an iterative Tarjan walk.
    ///
    /// Members of each component are sorted, and components are sorted by
    /// their first member.
    pub fn strongly_connected_components(&self) -> Vec<Vec<String>> {
        const UNVISITED: usize = usize::MAX;

        let ids: Vec<&str> = self.nodes().collect();
        let position: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let adjacency: Vec<Vec<usize>> = self
            .edges
            .values()
            .map(|deps| deps.iter().filter_map(|d| position.get(d.as_str()).copied()).collect())
            .collect();

        let count = ids.len();
        let mut index = vec![UNVISITED; count];
        let mut lowlink = vec![0; count];
        let mut on_stack = vec![false; count];
        let mut stack = Vec::new();
        let mut next_index = 0;
        let mut components = Vec::new();

        // Explicit call stack of (node, next child position).
        let mut frames: Vec<(usize, usize)> = Vec::new();

        for root in 0..count {
            if index[root] != UNVISITED {
                continue;
            }
            frames.push((root, 0));

            while let Some((node, child)) = frames.pop() {
                if child == 0 {
                    index[node] = next_index;
                    lowlink[node] = next_index;
                    next_index += 1;
                    stack.push(node);
                    on_stack[node] = true;
                }

                if let Some(&next) = adjacency[node].get(child) {
                    frames.push((node, child + 1));
                    if index[next] == UNVISITED {
                        frames.push((next, 0));
                    } else if on_stack[next] {
                        lowlink[node] = lowlink[node].min(index[next]);
                    }
                    continue;
                }

                if lowlink[node] == index[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(ids[member].to_string());
                        if member == node {
                            break;
                        }
                    }
                    component.sort();
                    components.push(component);
                }

                if let Some(&(parent, _)) = frames.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
            }
        }

        components.sort();
        components
    }

    /// Components that form a cycle: more than one member, or a node that
    /// depends on itself.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        self.strongly_connected_components()
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.edges.get(single).is_some_and(|deps| deps.contains(single)),
                _ => true,
            })
            .collect()
    }

    /// Dependency-first order with ASCII tie-breaking.
    ///
    /// # Errors
    ///
    /// Returns `Error::DependencyCycle` if the graph contains a cycle.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        self.topological_sort_by(|_| 0u8)
    }

    /// Dependency-first order (Kahn). Among ready nodes the lowest
    /// `(rank, key)` is emitted first.
    pub fn topological_sort_by<K, F>(&self, rank: F) -> Result<Vec<String>>
    where
        K: Ord,
        F: Fn(&str) -> K,
    {
        let mut remaining: HashMap<&str, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, deps) in &self.edges {
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(from.as_str());
            }
        }

        let mut ready: BinaryHeap<Reverse<(K, &str)>> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| Reverse((rank(*id), *id)))
            .collect();

        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(Reverse((_, current))) = ready.pop() {
            order.push(current.to_string());
            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.push(Reverse((rank(*dependent), *dependent)));
                    }
                }
            }
        }

        if order.len() != self.edges.len() {
            let emitted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            let participants = self
                .nodes()
                .filter(|id| !emitted.contains(id))
                .map(str::to_string)
                .collect();
            return Err(Error::DependencyCycle { participants });
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.topological_sort().unwrap().is_empty());
        assert!(graph.strongly_connected_components().is_empty());
    }

    #[test]
    fn test_diamond_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("sale", "base");
        graph.add_edge("crm", "base");
        graph.add_edge("sale_crm", "sale");
        graph.add_edge("sale_crm", "crm");

        let sorted = graph.topological_sort().unwrap();
        assert_eq!(sorted, vec!["base", "crm", "sale", "sale_crm"]);
    }

    #[test]
    fn test_independent_nodes_sorted_alphabetically() {
        let mut graph = DependencyGraph::new();
        graph.add_node("zebra");
        graph.add_node("alpha");
        graph.add_node("mid");

        assert_eq!(graph.topological_sort().unwrap(), vec!["alpha", "mid", "zebra"]);
    }

    #[test]
    fn test_rank_takes_priority_over_key() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("b", "a");
        graph.add_edge("z", "a");
        graph.add_node("c");

        let sorted = graph.topological_sort_by(|id| u8::from(id != "z")).unwrap();
        assert_eq!(sorted, vec!["a", "z", "b", "c"]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");
        graph.add_edge("c", "a");

        let err = graph.topological_sort().unwrap_err();
        let Error::DependencyCycle { participants } = err;
        assert_eq!(participants, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_components_and_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        graph.add_edge("c", "a");
        graph.add_edge("d", "a");
        graph.add_edge("e", "e");
        graph.add_node("f");

        assert_eq!(
            graph.strongly_connected_components(),
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["d".to_string()],
                vec!["e".to_string()],
                vec!["f".to_string()],
            ]
        );
        assert_eq!(
            graph.cycles(),
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["e".to_string()],
            ]
        );
    }

    #[test]
    fn test_closures() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("sale", "base");
        graph.add_edge("sale_crm", "sale");
        graph.add_edge("crm", "base");

        let deps = graph.dependency_closure(["sale_crm"]);
        assert_eq!(deps.into_iter().collect::<Vec<_>>(), vec!["base", "sale", "sale_crm"]);

        let dependents = graph.dependent_closure(["sale"]);
        assert_eq!(dependents.into_iter().collect::<Vec<_>>(), vec!["sale", "sale_crm"]);

        assert_eq!(graph.dependents_of("base"), vec!["crm", "sale"]);
    }
}
