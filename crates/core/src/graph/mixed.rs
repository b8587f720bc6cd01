use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::error::{Result, RicfError};

use super::{Adjacency, AncestralGraph};

/// Edge type of a mixed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// `from --> to`: direct effect of `from` on `to`.
    Directed,
    /// `from <-> to`: latent common cause.
    Bidirected,
    /// `from --- to`: selection/feedback within the undirected component.
    Undirected,
}

impl EdgeKind {
    /// Text-format connector for this kind.
    pub fn symbol(self) -> &'static str {
        match self {
            EdgeKind::Directed => "-->",
            EdgeKind::Bidirected => "<->",
            EdgeKind::Undirected => "---",
        }
    }
}

/// A typed edge between two node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub kind: EdgeKind,
}

impl Edge {
    /// Whether the edge joins `a` and `b` (in either order).
    pub fn joins(&self, a: usize, b: usize) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// The endpoint opposite `v`, if `v` is an endpoint.
    pub fn other(&self, v: usize) -> Option<usize> {
        if self.from == v {
            Some(self.to)
        } else if self.to == v {
            Some(self.from)
        } else {
            None
        }
    }

    /// Whether the edge has an arrowhead at `v`.
    pub fn has_arrowhead_at(&self, v: usize) -> bool {
        match self.kind {
            EdgeKind::Directed => self.to == v,
            EdgeKind::Bidirected => self.from == v || self.to == v,
            EdgeKind::Undirected => false,
        }
    }
}

/// Named mixed graph with at most one edge between any pair of nodes.
///
/// Nodes are indexed `0..n` in insertion order. That order is the variable
/// order the fitter expects in the covariance matrix; use
/// [`MixedGraph::reordered`] to align it with a covariance matrix.
#[derive(Debug, Clone, Default)]
pub struct MixedGraph {
    nodes: IndexSet<String>,
    edges: Vec<Edge>,
}

impl MixedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Adding an existing name returns the
    /// existing index.
    pub fn add_node(&mut self, name: &str) -> usize {
        self.nodes.insert_full(name.to_string()).0
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.get_index_of(name)
    }

    /// Name of the node at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node_name(&self, index: usize) -> &str {
        &self.nodes[index]
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|s| s.as_str()).collect()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Add an edge. For [`EdgeKind::Directed`] the edge points `from --> to`.
    ///
    /// # Errors
    /// Rejects unknown indices, self loops, and a second edge between a pair
    /// that is already adjacent.
    pub fn add_edge(&mut self, from: usize, to: usize, kind: EdgeKind) -> Result<()> {
        let n = self.nodes.len();
        if from >= n || to >= n {
            return Err(RicfError::MalformedGraph(format!(
                "edge ({}, {}) refers to a node outside 0..{}",
                from, to, n
            )));
        }
        if from == to {
            return Err(RicfError::MalformedGraph(format!(
                "self loop at '{}'",
                self.node_name(from)
            )));
        }
        if self.is_adjacent(from, to) {
            return Err(RicfError::MalformedGraph(format!(
                "'{}' and '{}' are already adjacent",
                self.node_name(from),
                self.node_name(to)
            )));
        }
        self.edges.push(Edge { from, to, kind });
        Ok(())
    }

    /// Add an edge between named nodes, creating the nodes if needed.
    pub fn add_edge_by_name(&mut self, from: &str, to: &str, kind: EdgeKind) -> Result<()> {
        let a = self.add_node(from);
        let b = self.add_node(to);
        self.add_edge(a, b, kind)
    }

    /// The edge joining `a` and `b`, if any.
    pub fn edge_between(&self, a: usize, b: usize) -> Option<&Edge> {
        self.edges.iter().find(|e| e.joins(a, b))
    }

    /// Check the structural conditions the fitter relies on.
    ///
    /// Undirected edges may only join nodes with no arrowhead pointing into
    /// them, and the directed edges must not form a cycle.
    pub fn validate(&self) -> Result<()> {
        for e in self.edges.iter().filter(|e| e.kind == EdgeKind::Undirected) {
            for v in [e.from, e.to] {
                if self.has_arrowhead_into(v) {
                    return Err(RicfError::MalformedGraph(format!(
                        "undirected edge {} --- {} touches '{}', which has an arrowhead into it",
                        self.node_name(e.from),
                        self.node_name(e.to),
                        self.node_name(v)
                    )));
                }
            }
        }

        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for e in self.edges.iter().filter(|e| e.kind == EdgeKind::Directed) {
            in_degree[e.to] += 1;
            children[e.from].push(e.to);
        }
        let mut queue: VecDeque<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
        let mut visited = 0;
        while let Some(v) = queue.pop_front() {
            visited += 1;
            for &c in &children[v] {
                in_degree[c] -= 1;
                if in_degree[c] == 0 {
                    queue.push_back(c);
                }
            }
        }
        if visited < n {
            let on_cycle: Vec<&str> = (0..n)
                .filter(|&v| in_degree[v] > 0)
                .map(|v| self.node_name(v))
                .collect();
            return Err(RicfError::MalformedGraph(format!(
                "directed cycle through {}",
                on_cycle.join(", ")
            )));
        }
        Ok(())
    }

    /// The same graph with nodes re-indexed in the order of `names`.
    ///
    /// # Errors
    /// Every name must be a node of the graph and every node must be named.
    pub fn reordered<S: AsRef<str>>(&self, names: &[S]) -> Result<MixedGraph> {
        let missing: Vec<&str> = names
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| self.node_index(s).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(RicfError::UnknownVariable(format!(
                "graph is missing variables: {}",
                missing.join(", ")
            )));
        }
        if names.len() != self.nodes.len() {
            return Err(RicfError::DimensionMismatch {
                expected: self.nodes.len(),
                got: names.len(),
                context: "graph nodes vs covariance variables".to_string(),
            });
        }

        let mut out = MixedGraph::new();
        for name in names {
            out.add_node(name.as_ref());
        }
        if out.n_nodes() != self.nodes.len() {
            return Err(RicfError::Data("duplicate variable names".to_string()));
        }
        for e in &self.edges {
            let from = out.add_node(self.node_name(e.from));
            let to = out.add_node(self.node_name(e.to));
            out.add_edge(from, to, e.kind)?;
        }
        Ok(out)
    }

    fn neighbours_by(&self, v: usize, kind: EdgeKind, pred: impl Fn(&Edge) -> bool) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .edges
            .iter()
            .filter(|e| e.kind == kind && pred(e))
            .filter_map(|e| e.other(v))
            .collect();
        out.sort_unstable();
        out
    }
}

impl Adjacency for MixedGraph {
    fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn is_adjacent(&self, a: usize, b: usize) -> bool {
        self.edges.iter().any(|e| e.joins(a, b))
    }

    fn n_edges(&self) -> usize {
        self.edges.len()
    }
}

impl AncestralGraph for MixedGraph {
    fn parents(&self, v: usize) -> Vec<usize> {
        self.neighbours_by(v, EdgeKind::Directed, |e| e.to == v)
    }

    fn spouses(&self, v: usize) -> Vec<usize> {
        self.neighbours_by(v, EdgeKind::Bidirected, |e| e.from == v || e.to == v)
    }

    fn has_arrowhead_into(&self, v: usize) -> bool {
        self.edges.iter().any(|e| e.has_arrowhead_at(v))
    }

    fn node_label(&self, v: usize) -> String {
        self.node_name(v).to_string()
    }
}
