//! Graph structure queries needed by the fitter.
//!
//! The fitter only ever asks a graph for adjacency, parents, spouses and
//! whether a node has an arrowhead pointing into it. Those queries are the
//! [`Adjacency`] and [`AncestralGraph`] traits; [`MixedGraph`] is the concrete
//! implementation used by the rest of the crate.

pub mod cliques;
mod mixed;
mod parse;

pub use cliques::maximal_cliques;
pub use mixed::{Edge, EdgeKind, MixedGraph};

/// Undirected adjacency over nodes `0..n_nodes()`.
pub trait Adjacency {
    fn n_nodes(&self) -> usize;

    /// Whether `a` and `b` share an edge of any kind.
    fn is_adjacent(&self, a: usize, b: usize) -> bool;

    /// Number of adjacent pairs.
    fn n_edges(&self) -> usize {
        let n = self.n_nodes();
        (0..n)
            .map(|a| ((a + 1)..n).filter(|&b| self.is_adjacent(a, b)).count())
            .sum()
    }

    /// Nodes adjacent to `v`, ascending.
    fn neighbors(&self, v: usize) -> Vec<usize> {
        (0..self.n_nodes())
            .filter(|&w| w != v && self.is_adjacent(v, w))
            .collect()
    }
}

/// Mixed graph with directed, bidirected and undirected edges.
pub trait AncestralGraph: Adjacency {
    /// Nodes `u` with `u --> v`, ascending.
    fn parents(&self, v: usize) -> Vec<usize>;

    /// Nodes `u` with `u <-> v`, ascending.
    fn spouses(&self, v: usize) -> Vec<usize>;

    /// Whether some edge has an arrowhead at `v`.
    fn has_arrowhead_into(&self, v: usize) -> bool;

    /// Members of the undirected component have no arrowhead pointing into them.
    fn is_undirected_node(&self, v: usize) -> bool {
        !self.has_arrowhead_into(v)
    }

    /// Human-readable name of `v` for log and error messages.
    fn node_label(&self, v: usize) -> String {
        format!("node {}", v)
    }

    /// Indices of all undirected-component nodes, ascending.
    fn undirected_nodes(&self) -> Vec<usize> {
        (0..self.n_nodes())
            .filter(|&v| self.is_undirected_node(v))
            .collect()
    }
}

/// Adjacency restricted to a subset of nodes of another graph.
///
/// Node `i` of the view is node `nodes[i]` of the underlying graph.
#[derive(Debug)]
pub struct InducedSubgraph<'a, G: ?Sized> {
    graph: &'a G,
    nodes: Vec<usize>,
}

impl<'a, G: Adjacency + ?Sized> InducedSubgraph<'a, G> {
    pub fn new(graph: &'a G, nodes: &[usize]) -> Self {
        Self {
            graph,
            nodes: nodes.to_vec(),
        }
    }

    /// Map a view index back to the underlying graph.
    pub fn original_index(&self, i: usize) -> usize {
        self.nodes[i]
    }
}

impl<G: Adjacency + ?Sized> Adjacency for InducedSubgraph<'_, G> {
    fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn is_adjacent(&self, a: usize, b: usize) -> bool {
        self.graph.is_adjacent(self.nodes[a], self.nodes[b])
    }
}
