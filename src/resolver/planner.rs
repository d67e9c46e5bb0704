//! Dependency graph ordering for plan emission.
//!
//! This module provides the graph data structure and algorithms needed to
//! order resources so every dependency is realized before its dependents,
//! including cycle detection and a reverse order for teardown.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};
use tracing::{debug, info};

use crate::core::{SynthError, SynthResult};
use crate::graph::ResourceGraph;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Dependency graph over node ids.
///
/// Node indices follow declaration order, which is the tie-break used by
/// [`DependencyGraph::topological_order`]. An edge `a → b` means `a`
/// references `b`, so `b` must be realized first.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph.
    graph: DiGraph<String, ()>,
    /// Map from node ids to their graph indices.
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of a declared resource graph.
    ///
    /// Edges to undeclared ids are skipped; dangling references are reported
    /// by the Token Resolver before ordering.
    #[must_use]
    pub fn from_resources(resources: &ResourceGraph) -> Self {
        let mut graph = Self::new();
        for id in resources.ids() {
            graph.ensure_node(id);
        }
        for edge in resources.edges() {
            if graph.node_map.contains_key(&edge.to) {
                graph.add_dependency(&edge.from, &edge.to);
            }
        }
        graph
    }

    /// Add a node to the graph if it doesn't already exist.
    ///
    /// Returns the node index in the graph.
    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(id) {
            index
        } else {
            let index = self.graph.add_node(id.to_string());
            self.node_map.insert(id.to_string(), index);
            index
        }
    }

    /// Add a dependency relationship to the graph.
    ///
    /// `from` depends on `to`, meaning `to` must be realized before `from`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Neighbors of a node in one direction, in declaration order.
    fn sorted_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        neighbors.sort();
        neighbors
    }

    /// Find one cycle, if any, as the list of participating ids.
    ///
    /// Uses DFS with colors, visiting nodes and neighbors in declaration
    /// order so the reported cycle is stable. A self-reference is a cycle
    /// of one.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|node| (node, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                return Some(cycle.into_iter().map(|idx| self.graph[idx].clone()).collect());
            }
        }
        None
    }

    /// DFS visit for cycle detection.
    ///
    /// Returns `Some(cycle_path)` if a cycle is detected, None otherwise.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.sorted_neighbors(node, Direction::Outgoing) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    // Gray nodes are always on the current path
                    let cycle_start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    return Some(path[cycle_start..].to_vec());
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Fail with [`SynthError::CycleError`] if the graph has a cycle.
    pub fn detect_cycles(&self) -> SynthResult<()> {
        match self.find_cycle() {
            Some(nodes) => Err(SynthError::CycleError {
                nodes,
            }),
            None => Ok(()),
        }
    }

    /// Get the deployment order.
    ///
    /// Every dependency comes before its dependents. Among nodes whose
    /// dependencies are all placed, the earliest declared goes first, so the
    /// order is reproducible for identical input.
    pub fn topological_order(&self) -> SynthResult<Vec<String>> {
        self.detect_cycles()?;

        let mut remaining: Vec<usize> = self
            .graph
            .node_indices()
            .map(|node| self.graph.neighbors_directed(node, Direction::Outgoing).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|node| remaining[node.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.graph[node].clone());
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                remaining[dependent.index()] -= 1;
                if remaining[dependent.index()] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let placed: HashSet<&String> = order.iter().collect();
            let stuck = self.graph.node_weights().filter(|id| !placed.contains(id)).cloned().collect();
            return Err(SynthError::CycleError {
                nodes: stuck,
            });
        }

        info!("Ordered {} nodes over {} edges", self.node_count(), self.edge_count());
        debug!("Plan order: {}", order.join(", "));
        Ok(order)
    }

    /// Get the teardown order: dependents before dependencies.
    pub fn reverse_order(&self) -> SynthResult<Vec<String>> {
        let mut order = self.topological_order()?;
        order.reverse();
        Ok(order)
    }

    /// Get all transitive dependencies for a given node.
    #[must_use]
    pub fn transitive_deps(&self, id: &str) -> BTreeSet<String> {
        let mut deps = BTreeSet::new();
        let mut queue = VecDeque::new();

        if let Some(&node_idx) = self.node_map.get(id) {
            queue.push_back(node_idx);

            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors(current) {
                    if deps.insert(self.graph[neighbor].clone()) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        deps
    }

    /// Direct dependencies of a node, in declaration order.
    #[must_use]
    pub fn direct_deps(&self, id: &str) -> Vec<String> {
        self.related(id, Direction::Outgoing)
    }

    /// Nodes that directly reference `id`, in declaration order.
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<String> {
        self.related(id, Direction::Incoming)
    }

    fn related(&self, id: &str, direction: Direction) -> Vec<String> {
        self.node_map.get(id).map_or_else(Vec::new, |&node_idx| {
            self.sorted_neighbors(node_idx, direction)
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()
        })
    }

    /// Nodes nothing depends on (or, when `inverted`, nodes that depend on
    /// nothing), in declaration order.
    #[must_use]
    pub fn roots(&self, inverted: bool) -> Vec<String> {
        let direction = if inverted {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };
        self.graph
            .node_indices()
            .filter(|&node| self.graph.neighbors_directed(node, direction).next().is_none())
            .map(|node| self.graph[node].clone())
            .collect()
    }

    /// Check whether a node id is in the graph.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Check if the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get the total number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the total number of edges (dependencies) in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Build a human-readable dependency tree rooted at `root`.
    ///
    /// With `inverted`, children are the nodes that reference their parent
    /// instead of the nodes it references.
    #[must_use]
    pub fn to_tree_string(&self, root: &str, inverted: bool) -> String {
        let mut result = String::new();
        let mut visited = HashSet::new();
        self.build_tree_string(root, inverted, &mut result, "", true, &mut visited);
        result
    }

    fn build_tree_string(
        &self,
        id: &str,
        inverted: bool,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<String>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        result.push_str(&format!("{prefix}{connector}{id}\n"));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        let children = if inverted {
            self.dependents(id)
        } else {
            self.direct_deps(id)
        };
        if !visited.insert(id.to_string()) {
            // Shared subtree already printed above
            if !children.is_empty() {
                result.push_str(&format!("{child_prefix}└── (shown above)\n"));
            }
            return;
        }
        for (i, child) in children.iter().enumerate() {
            let is_last_child = i == children.len() - 1;
            self.build_tree_string(child, inverted, result, &child_prefix, is_last_child, visited);
        }
    }
}
