//! Plain-text graph format.
//!
//! ```text
//! Graph Nodes:
//! X1;X2;X3;X4
//!
//! Graph Edges:
//! 1. X1 --> X2
//! 2. X2 <-> X3
//! 3. X3 --- X4
//! ```
//!
//! The node section is optional; without it nodes are created in order of
//! first appearance in the edge list. Edge numbers are optional, `<--` is a
//! directed edge written right to left, and `#` starts a comment.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Result, RicfError};

use super::{EdgeKind, MixedGraph};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Nodes,
    Edges,
}

impl MixedGraph {
    /// Read a graph from a text file in the format above.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        text.parse()
    }
}

impl FromStr for MixedGraph {
    type Err = RicfError;

    fn from_str(s: &str) -> Result<Self> {
        let mut graph = MixedGraph::new();
        let mut section = Section::Preamble;

        for (line_no, raw) in s.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("graph nodes:") {
                section = Section::Nodes;
                continue;
            }
            if line.eq_ignore_ascii_case("graph edges:") {
                section = Section::Edges;
                continue;
            }

            match section {
                Section::Nodes => {
                    for name in line.split([';', ',']).map(str::trim).filter(|n| !n.is_empty()) {
                        graph.add_node(name);
                    }
                }
                Section::Preamble | Section::Edges => {
                    parse_edge(&mut graph, line).map_err(|e| match e {
                        RicfError::MalformedGraph(msg) => {
                            RicfError::MalformedGraph(format!("line {}: {}", line_no + 1, msg))
                        }
                        other => other,
                    })?;
                }
            }
        }

        Ok(graph)
    }
}

fn parse_edge(graph: &mut MixedGraph, line: &str) -> Result<()> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if let Some(first) = tokens.first() {
        if let Some(num) = first.strip_suffix('.') {
            if !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()) {
                tokens.remove(0);
            }
        }
    }

    let [a, connector, b] = tokens[..] else {
        return Err(RicfError::MalformedGraph(format!(
            "expected '<node> <edge> <node>', got '{}'",
            line
        )));
    };

    match connector {
        "-->" => graph.add_edge_by_name(a, b, EdgeKind::Directed),
        "<--" => graph.add_edge_by_name(b, a, EdgeKind::Directed),
        "<->" => graph.add_edge_by_name(a, b, EdgeKind::Bidirected),
        "---" => graph.add_edge_by_name(a, b, EdgeKind::Undirected),
        other => Err(RicfError::MalformedGraph(format!(
            "unsupported edge '{}' (expected -->, <--, <-> or ---)",
            other
        ))),
    }
}

impl fmt::Display for MixedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Nodes:")?;
        writeln!(f, "{}", self.node_names().join(";"))?;
        writeln!(f)?;
        writeln!(f, "Graph Edges:")?;
        for (i, e) in self.edges().iter().enumerate() {
            writeln!(
                f,
                "{}. {} {} {}",
                i + 1,
                self.node_name(e.from),
                e.kind.symbol(),
                self.node_name(e.to)
            )?;
        }
        Ok(())
    }
}
