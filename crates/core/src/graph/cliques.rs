//! Maximal clique enumeration by incremental right-extension.
//!
//! For each seed node `i`, a candidate clique `L1 = {i}` is grown to the
//! right: a node from the pool `L2` (the seed's neighbours) joins `L1` when
//! its index exceeds both `max(L1)` and the most recently moved-back node and
//! it is adjacent to every member of `L1`. A candidate is recorded when no
//! node left in `L2` could join it. Then the largest member of `L1` is moved
//! back into `L2` and extension resumes, until only the seed remains.
//!
//! `L2` keeps lower-indexed neighbours too, so a clique that could still be
//! extended to the left is never recorded. Each maximal clique is thus found
//! from its lowest-indexed member.

use std::collections::{BTreeSet, HashSet};

use super::Adjacency;

/// All maximal cliques of `graph`, each as an ascending list of node indices.
///
/// Cliques appear in discovery order (by lowest member). Isolated nodes are
/// singleton cliques. A clique reached twice is reported once.
pub fn maximal_cliques<A: Adjacency + ?Sized>(graph: &A) -> Vec<Vec<usize>> {
    let mut cliques = Vec::new();
    let mut recorded: HashSet<Vec<usize>> = HashSet::new();

    for seed in 0..graph.n_nodes() {
        let mut l1: BTreeSet<usize> = BTreeSet::from([seed]);
        let mut l2: BTreeSet<usize> = graph.neighbors(seed).into_iter().collect();
        let mut moved: Option<usize> = None;

        loop {
            add_nodes_to_right(graph, &mut l1, &mut l2, moved);

            if is_maximal(graph, &l1, &l2) {
                let clique: Vec<usize> = l1.iter().copied().collect();
                if recorded.insert(clique.clone()) {
                    cliques.push(clique);
                } else {
                    log::trace!("clique {:?} reached again from seed {}", clique, seed);
                }
            }

            moved = move_last_back(&mut l1, &mut l2);
            if moved.is_none() {
                break;
            }
        }
    }

    cliques
}

fn add_nodes_to_right<A: Adjacency + ?Sized>(
    graph: &A,
    l1: &mut BTreeSet<usize>,
    l2: &mut BTreeSet<usize>,
    moved: Option<usize>,
) {
    let pool: Vec<usize> = l2.iter().copied().collect();
    for j in pool {
        let right_of_l1 = l1.last().map_or(true, |&max| j > max);
        let right_of_moved = moved.map_or(true, |m| j > m);
        if right_of_l1 && right_of_moved && addable(graph, j, l1) {
            l1.insert(j);
            l2.remove(&j);
        }
    }
}

fn is_maximal<A: Adjacency + ?Sized>(graph: &A, l1: &BTreeSet<usize>, l2: &BTreeSet<usize>) -> bool {
    !l2.iter().any(|&j| addable(graph, j, l1))
}

/// Move the largest member of `l1` into `l2`. `None` once `l1` is down to the seed.
fn move_last_back(l1: &mut BTreeSet<usize>, l2: &mut BTreeSet<usize>) -> Option<usize> {
    if l1.len() <= 1 {
        return None;
    }
    let last = l1.pop_last()?;
    l2.insert(last);
    Some(last)
}

fn addable<A: Adjacency + ?Sized>(graph: &A, j: usize, l1: &BTreeSet<usize>) -> bool {
    l1.iter().all(|&k| graph.is_adjacent(j, k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, InducedSubgraph, MixedGraph};

    fn undirected(n: usize, edges: &[(usize, usize)]) -> MixedGraph {
        let mut g = MixedGraph::new();
        for i in 0..n {
            g.add_node(&format!("X{}", i));
        }
        for &(a, b) in edges {
            g.add_edge(a, b, EdgeKind::Undirected).unwrap();
        }
        g
    }

    #[test]
    fn test_isolated_nodes_are_singletons() {
        let g = undirected(3, &[]);
        assert_eq!(maximal_cliques(&g), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_complete_graph_has_one_clique() {
        let g = undirected(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(maximal_cliques(&g), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_chain() {
        let g = undirected(3, &[(0, 1), (1, 2)]);
        assert_eq!(maximal_cliques(&g), vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn test_triangle_with_tail() {
        let g = undirected(4, &[(0, 1), (0, 2), (1, 2), (2, 3)]);
        assert_eq!(maximal_cliques(&g), vec![vec![0, 1, 2], vec![2, 3]]);
    }

    #[test]
    fn test_four_cycle() {
        let g = undirected(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert_eq!(
            maximal_cliques(&g),
            vec![vec![0, 1], vec![0, 3], vec![1, 2], vec![2, 3]]
        );
    }

    #[test]
    fn test_diamond() {
        let g = undirected(4, &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(maximal_cliques(&g), vec![vec![0, 1, 2], vec![1, 2, 3]]);
    }

    #[test]
    fn test_every_clique_is_maximal_and_unique() {
        // Two overlapping triangles plus a pendant: 0-1-2, 1-2-3, 3-4, 5 isolated.
        let g = undirected(6, &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 4)]);
        let cliques = maximal_cliques(&g);

        let unique: HashSet<&Vec<usize>> = cliques.iter().collect();
        assert_eq!(unique.len(), cliques.len());

        for c in &cliques {
            for (i, &a) in c.iter().enumerate() {
                for &b in &c[i + 1..] {
                    assert!(g.is_adjacent(a, b));
                }
            }
            for v in 0..6 {
                if !c.contains(&v) {
                    assert!(
                        !c.iter().all(|&m| g.is_adjacent(v, m)),
                        "{:?} extends by {}",
                        c,
                        v
                    );
                }
            }
        }
        assert_eq!(cliques.len(), 4);
    }

    #[test]
    fn test_edge_types_do_not_matter() {
        let mut g = MixedGraph::new();
        g.add_edge_by_name("A", "B", EdgeKind::Directed).unwrap();
        g.add_edge_by_name("B", "C", EdgeKind::Bidirected).unwrap();
        g.add_edge_by_name("A", "C", EdgeKind::Directed).unwrap();
        assert_eq!(maximal_cliques(&g), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_induced_subgraph() {
        let g = undirected(4, &[(0, 1), (1, 2), (2, 3), (0, 3)]);
        // Drop node 0: 1-2-3 chain in view indices 0-1-2.
        let sub = InducedSubgraph::new(&g, &[1, 2, 3]);
        assert_eq!(maximal_cliques(&sub), vec![vec![0, 1], vec![1, 2]]);
    }
}
