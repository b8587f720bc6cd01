use nalgebra::DMatrix;

use crate::diagnostics::ConvergenceMonitor;
use crate::error::{Result, RicfError};
use crate::graph::{maximal_cliques, Adjacency};
use crate::matrix::{assign, complement, invert_symmetric, one_norm, select, trace};

/// Maximum-likelihood fit of a Gaussian concentration graph model.
#[derive(Debug, Clone)]
pub struct ConGraphFit {
    /// Fitted covariance `V`. Agrees with `S` on every clique margin and its
    /// inverse vanishes on every non-adjacent pair.
    pub sigma_hat: DMatrix<f64>,
    /// `n * (tr(S K) - ln det(S K) - k)`.
    pub deviance: f64,
    /// `k (k - 1) / 2 - |E|`.
    pub df: i64,
    pub iterations: usize,
}

/// Iterative proportional scaling over the maximal cliques of an
/// undirected graph.
///
/// Starting from `K = diag(S)^-1`, each clique `a` with complement `b` is
/// matched in turn:
///
///   K[a, a] <- S[a, a]^-1 + K[a, b] K[b, b]^-1 K[b, a]
///
/// Updates are applied in place, so later cliques see earlier updates within
/// the same sweep. Convergence is the 1-norm of the change in `K`.
pub struct ConGraphFitter {
    max_iter: usize,
    tol: f64,
}

impl ConGraphFitter {
    pub fn new(max_iter: usize, tol: f64) -> Self {
        Self { max_iter, tol }
    }

    /// Fit `graph` to the covariance `s`. `n` is the sample size used only
    /// for the deviance.
    pub fn fit<A: Adjacency + ?Sized>(
        &self,
        graph: &A,
        s: &DMatrix<f64>,
        n: f64,
    ) -> Result<ConGraphFit> {
        let k_nodes = graph.n_nodes();
        if s.nrows() != k_nodes || s.ncols() != k_nodes {
            return Err(RicfError::DimensionMismatch {
                expected: k_nodes,
                got: s.nrows(),
                context: "covariance of the concentration graph".into(),
            });
        }

        let cliques = maximal_cliques(graph);
        if cliques.len() <= 1 {
            // Complete graph: the saturated model.
            return Ok(ConGraphFit {
                sigma_hat: s.clone(),
                deviance: 0.0,
                df: 0,
                iterations: 1,
            });
        }

        let df = (k_nodes * (k_nodes - 1) / 2) as i64 - graph.n_edges() as i64;

        // S[a, a]^-1 does not change between sweeps.
        let blocks = cliques
            .iter()
            .map(|a| {
                let s_aa_inv =
                    invert_symmetric(&select(s, a, a), &format!("S[a, a] for clique {:?}", a))?;
                Ok((a.clone(), complement(k_nodes, a), s_aa_inv))
            })
            .collect::<Result<Vec<_>>>()?;

        let diag = DMatrix::from_diagonal(&s.diagonal());
        let mut k = invert_symmetric(&diag, "diag(S)")?;
        let mut monitor = ConvergenceMonitor::new(self.tol, self.max_iter);

        loop {
            let k_old = k.clone();
            for (a, b, s_aa_inv) in &blocks {
                let k_bb_inv =
                    invert_symmetric(&select(&k, b, b), &format!("K[b, b] for clique {:?}", a))?;
                let k_ab = select(&k, a, b);
                let k_ba = select(&k, b, a);
                let block = s_aa_inv + &k_ab * &k_bb_inv * &k_ba;
                assign(&mut k, a, a, &block);
            }

            monitor.record(one_norm(&(&k - &k_old)));
            log::trace!(
                "IPS sweep {}: |dK| = {:.3e}",
                monitor.n_iterations(),
                monitor.last_change()
            );

            if monitor.is_converged() {
                break;
            }
            if monitor.max_reached() {
                return Err(RicfError::NotConverged {
                    iterations: monitor.n_iterations(),
                    change: monitor.last_change(),
                });
            }
        }

        let sigma_hat = invert_symmetric(&k, "fitted concentration matrix")?;
        let sk = s * &k;
        let deviance = n * (trace(&sk) - sk.determinant().ln() - k_nodes as f64);

        log::debug!(
            "Concentration graph fit: {} cliques, {} sweeps, deviance {:.4}",
            cliques.len(),
            monitor.n_iterations(),
            deviance
        );

        Ok(ConGraphFit {
            sigma_hat,
            deviance,
            df,
            iterations: monitor.n_iterations(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, MixedGraph};
    use approx::assert_relative_eq;

    fn undirected(n: usize, edges: &[(usize, usize)]) -> MixedGraph {
        let mut g = MixedGraph::new();
        for i in 0..n {
            g.add_node(&format!("X{}", i + 1));
        }
        for &(a, b) in edges {
            g.add_edge(a, b, EdgeKind::Undirected).unwrap();
        }
        g
    }

    fn ar1() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 3, &[1.0, 0.5, 0.25, 0.5, 1.0, 0.5, 0.25, 0.5, 1.0])
    }

    #[test]
    fn test_complete_graph_returns_sample_covariance() {
        let g = undirected(3, &[(0, 1), (0, 2), (1, 2)]);
        let fit = ConGraphFitter::new(100, 1e-6).fit(&g, &ar1(), 4.0).unwrap();
        assert_eq!(fit.sigma_hat, ar1());
        assert_eq!(fit.deviance, 0.0);
        assert_eq!(fit.df, 0);
        assert_eq!(fit.iterations, 1);
    }

    #[test]
    fn test_empty_graph_gives_diagonal() {
        let g = undirected(3, &[]);
        let fit = ConGraphFitter::new(100, 1e-6).fit(&g, &ar1(), 4.0).unwrap();
        assert_relative_eq!(fit.sigma_hat, DMatrix::identity(3, 3), epsilon = 1e-10);
        assert_eq!(fit.df, 3);
        assert_eq!(fit.iterations, 1);
    }

    #[test]
    fn test_chain_matches_margins_and_zero_pattern() {
        // X1 - X2 - X3 with S[0, 2] = 0.3 (not the Markov value 0.25).
        let g = undirected(3, &[(0, 1), (1, 2)]);
        let s = DMatrix::from_row_slice(3, 3, &[1.0, 0.5, 0.3, 0.5, 1.0, 0.5, 0.3, 0.5, 1.0]);
        let fit = ConGraphFitter::new(200, 1e-10).fit(&g, &s, 4.0).unwrap();

        for (i, j) in [(0, 0), (0, 1), (1, 1), (1, 2), (2, 2)] {
            assert_relative_eq!(fit.sigma_hat[(i, j)], s[(i, j)], epsilon = 1e-6);
        }
        // Decomposable: V[0, 2] = S[0, 1] S[1, 2] / S[1, 1].
        assert_relative_eq!(fit.sigma_hat[(0, 2)], 0.25, epsilon = 1e-6);

        let k = invert_symmetric(&fit.sigma_hat, "V").unwrap();
        assert!(k[(0, 2)].abs() < 1e-6);
        assert_eq!(fit.df, 1);
        assert!(fit.deviance > 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let g = undirected(2, &[(0, 1)]);
        assert!(matches!(
            ConGraphFitter::new(10, 1e-6).fit(&g, &ar1(), 4.0),
            Err(RicfError::DimensionMismatch { .. })
        ));
    }
}
