//! The query engine for javadeps.
//!
//! Answers provides / requires / what-provides / what-requires / why / diff
//! against a borrowed, immutable [`DependencyIndex`]. The package-level
//! requires-graph is derived on first use and cached for the lifetime of the
//! engine (one query session); it is never persisted.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::OnceLock;
use tracing::debug;

use super::index::DependencyIndex;
use super::types::{ClassSymbol, PackageId};

/// Read-only query session over a loaded index.
///
/// All queries take `&self`; an engine can be shared between threads.
pub struct QueryEngine<'a> {
    index: &'a DependencyIndex,
    /// Package graph, node `i` is package `PackageId(i)`.
    graph: OnceLock<DiGraph<PackageId, usize>>,
}

/// A package's requirements at package level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requirements<'a> {
    /// Packages providing at least one required class, sorted.
    pub packages: Vec<&'a str>,
    /// Required classes no indexed package provides, sorted.
    pub unresolved: Vec<&'a str>,
}

/// Answer to a `why` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "classes")]
pub enum Why<'a> {
    /// Required classes owned by the target package, sorted.
    Evidence(Vec<&'a str>),
    NoDependency,
}

impl Why<'_> {
    pub fn is_dependency(&self) -> bool {
        matches!(self, Why::Evidence(_))
    }
}

/// One edge of a transitive explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hop<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub evidence: Vec<&'a str>,
}

/// Declared vs. observed requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Declared but not observed in bytecode.
    pub extra: Vec<String>,
    /// Observed in bytecode but not declared.
    pub missing: Vec<String>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.extra.is_empty() && self.missing.is_empty()
    }
}

/// Statistics about the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub packages: usize,
    pub symbols: usize,
    pub provided_classes: usize,
    pub conflicts: usize,
    pub edges: usize,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a DependencyIndex) -> Self {
        Self {
            index,
            graph: OnceLock::new(),
        }
    }

    pub fn index(&self) -> &'a DependencyIndex {
        self.index
    }

    // ─── Package Lookups ────────────────────────────────────────

    /// Classes a package provides, sorted. `None` if the package is unknown.
    pub fn provides(&self, package: &str) -> Option<Vec<&'a str>> {
        let index = self.index;
        let package = index.package(package)?;
        let mut classes: Vec<&'a str> = package
            .provides
            .iter()
            .map(|&sym| index.symbol_name(sym))
            .collect();
        classes.sort_unstable();
        Some(classes)
    }

    /// Packages a package requires, plus the classes nobody provides.
    pub fn requires(&self, package: &str) -> Option<Requirements<'a>> {
        let index = self.index;
        let id = index.package_id(package)?;
        let resolution = index.resolve(id);

        let mut packages: Vec<&'a str> = resolution
            .targets
            .keys()
            .map(|&t| index.package_by_id(t).name.as_str())
            .collect();
        packages.sort_unstable();
        let mut unresolved: Vec<&'a str> = resolution
            .unresolved
            .iter()
            .map(|&sym| index.symbol_name(sym))
            .collect();
        unresolved.sort_unstable();

        Some(Requirements {
            packages,
            unresolved,
        })
    }

    /// [`requires`](Self::requires) for several packages, in argument order.
    pub fn requires_all<'n>(&self, packages: &[&'n str]) -> Vec<(&'n str, Option<Requirements<'a>>)> {
        packages.iter().map(|&p| (p, self.requires(p))).collect()
    }

    /// The single package owning a class. Slash and descriptor forms are
    /// accepted.
    pub fn what_provides(&self, class: &str) -> Option<&'a str> {
        let index = self.index;
        let symbol = ClassSymbol::parse(class)?;
        let id = index.symbols().get(symbol.as_str())?;
        let owner = index.provider(id)?;
        Some(index.package_by_id(owner).name.as_str())
    }

    /// Packages that require the given package, sorted.
    pub fn what_requires(&self, package: &str) -> Option<Vec<&'a str>> {
        let index = self.index;
        let id = index.package_id(package)?;
        let graph = self.graph();
        let mut dependents: Vec<&'a str> = graph
            .neighbors_directed(NodeIndex::new(id.index()), Direction::Incoming)
            .map(|n| index.package_by_id(graph[n]).name.as_str())
            .collect();
        dependents.sort_unstable();
        dependents.dedup();
        Some(dependents)
    }

    // ─── Explanations ───────────────────────────────────────────

    /// Why `from` requires `to`: the classes in `from`'s requires set that
    /// `to` owns. `None` if either package is unknown.
    pub fn why(&self, from: &str, to: &str) -> Option<Why<'a>> {
        let index = self.index;
        let from = index.package_id(from)?;
        let to = index.package_id(to)?;
        Some(self.why_ids(from, to))
    }

    fn why_ids(&self, from: PackageId, to: PackageId) -> Why<'a> {
        let index = self.index;
        if from == to {
            return Why::NoDependency;
        }
        match index.resolve(from).targets.remove(&to) {
            Some(symbols) => {
                let mut classes: Vec<&'a str> =
                    symbols.iter().map(|&s| index.symbol_name(s)).collect();
                classes.sort_unstable();
                Why::Evidence(classes)
            }
            None => Why::NoDependency,
        }
    }

    /// Shortest chain of requirements leading from `from` to `to`, with the
    /// evidence for every hop. `None` if either package is unknown or `to`
    /// is not reachable.
    pub fn why_path(&self, from: &str, to: &str) -> Option<Vec<Hop<'a>>> {
        let index = self.index;
        let start = index.package_id(from)?;
        let goal = index.package_id(to)?;
        if start == goal {
            return None;
        }

        let graph = self.graph();
        let mut parent: Vec<Option<NodeIndex>> = vec![None; graph.node_count()];
        let mut seen = vec![false; graph.node_count()];
        let mut queue = VecDeque::new();
        let start_node = NodeIndex::new(start.index());
        let goal_node = NodeIndex::new(goal.index());
        seen[start_node.index()] = true;
        queue.push_back(start_node);

        while let Some(node) = queue.pop_front() {
            if node == goal_node {
                break;
            }
            // Visit in package order so the chosen path is stable.
            let mut next: Vec<NodeIndex> = graph
                .neighbors_directed(node, Direction::Outgoing)
                .collect();
            next.sort_unstable();
            for n in next {
                if !seen[n.index()] {
                    seen[n.index()] = true;
                    parent[n.index()] = Some(node);
                    queue.push_back(n);
                }
            }
        }

        if !seen[goal_node.index()] {
            return None;
        }

        let mut chain = vec![goal_node];
        let mut cursor = goal_node;
        while let Some(p) = parent[cursor.index()] {
            chain.push(p);
            cursor = p;
        }
        chain.reverse();

        let hops = chain
            .windows(2)
            .map(|pair| {
                let (a, b) = (graph[pair[0]], graph[pair[1]]);
                let evidence = match self.why_ids(a, b) {
                    Why::Evidence(classes) => classes,
                    Why::NoDependency => Vec::new(),
                };
                Hop {
                    from: index.package_by_id(a).name.as_str(),
                    to: index.package_by_id(b).name.as_str(),
                    evidence,
                }
            })
            .collect();
        Some(hops)
    }

    // ─── Declared Requirements ──────────────────────────────────

    /// Compare declared package requirements with the observed ones.
    pub fn diff(&self, declared: &BTreeSet<String>, package: &str) -> Option<Diff> {
        let observed: BTreeSet<String> = self
            .requires(package)?
            .packages
            .into_iter()
            .map(str::to_string)
            .collect();

        Some(Diff {
            extra: declared.difference(&observed).cloned().collect(),
            missing: observed.difference(declared).cloned().collect(),
        })
    }

    // ─── Listing & Stats ────────────────────────────────────────

    /// All package names, sorted.
    pub fn list(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self
            .index
            .packages()
            .map(|(_, p)| p.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            packages: self.index.len(),
            symbols: self.index.symbols().len(),
            provided_classes: self.index.provided_count(),
            conflicts: self.index.conflicts(),
            edges: self.graph().edge_count(),
        }
    }

    /// Number of edges into each package, heaviest first. Ties break on name.
    pub fn most_required(&self, limit: usize) -> Vec<(&'a str, usize)> {
        let index = self.index;
        let graph = self.graph();
        let mut counts: Vec<(&'a str, usize)> = graph
            .node_indices()
            .map(|n| {
                let dependents = graph.neighbors_directed(n, Direction::Incoming).count();
                (index.package_by_id(graph[n]).name.as_str(), dependents)
            })
            .filter(|(_, c)| *c > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        counts.truncate(limit);
        counts
    }

    // ─── Internal Helpers ───────────────────────────────────────

    fn graph(&self) -> &DiGraph<PackageId, usize> {
        self.graph.get_or_init(|| {
            let index = self.index;
            let edges: Vec<Vec<(PackageId, usize)>> = (0..index.len())
                .into_par_iter()
                .map(|i| -> Vec<(PackageId, usize)> {
                    index
                        .resolve(PackageId(i as u32))
                        .targets
                        .into_iter()
                        .map(|(target, symbols)| (target, symbols.len()))
                        .collect()
                })
                .collect();

            let mut graph = DiGraph::with_capacity(index.len(), 0);
            for (id, _) in index.packages() {
                graph.add_node(id);
            }
            for (i, targets) in edges.into_iter().enumerate() {
                for (target, weight) in targets {
                    graph.add_edge(NodeIndex::new(i), NodeIndex::new(target.index()), weight);
                }
            }
            debug!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "package graph built"
            );
            graph
        })
    }
}
