use std::time::Duration;

use nalgebra::DMatrix;

use crate::data::CovarianceMatrix;
use crate::diagnostics::ConvergenceMonitor;
use crate::error::{Result, RicfError};
use crate::graph::{AncestralGraph, InducedSubgraph, MixedGraph};
use crate::matrix::{assign, complement, fill, invert_general, one_norm, select, symmetrize};

use super::congraph::ConGraphFitter;
use super::result::{RicfIteration, RicfResult};
use super::update::{NodeUpdate, WorkingMatrices};

/// Residual iterative conditional fitting of a Gaussian ancestral graph.
///
/// The undirected component (nodes with no arrowhead pointing into them) is
/// fitted once as a concentration graph and held fixed. Every other node is
/// then updated in turn, Gauss-Seidel style, by regressing it on its parents
/// and on the pseudo variables of its spouses:
///
///   Sigma = B^-1 Omega B^-T
///
/// Sweeps repeat until `|dOmega|_1 + |dB|_1` drops below `tol`.
pub struct Ricf {
    max_iter: usize,
    tol: f64,
    time_budget: Option<Duration>,
    allow_non_convergence: bool,
}

impl Default for Ricf {
    fn default() -> Self {
        Self::new(1000, 1e-6)
    }
}

impl Ricf {
    pub fn new(max_iter: usize, tol: f64) -> Self {
        Self {
            max_iter,
            tol,
            time_budget: None,
            allow_non_convergence: false,
        }
    }

    /// Give up once `budget` of wall-clock time has been spent sweeping.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Return the current estimate instead of an error when the sweep or
    /// time limit is hit.
    pub fn allow_non_convergence(mut self, allow: bool) -> Self {
        self.allow_non_convergence = allow;
        self
    }

    /// Fit `graph` to a named covariance matrix. The graph is reordered to
    /// the variable order of `cov`; every variable must be a graph node and
    /// vice versa.
    pub fn fit(&self, graph: &MixedGraph, cov: &CovarianceMatrix) -> Result<RicfResult> {
        let aligned = graph.reordered(cov.names())?;
        aligned.validate()?;
        self.fit_indexed(&aligned, cov.matrix())
    }

    /// Fit `graph` to `s`, where node `i` of the graph is row/column `i` of `s`.
    pub fn fit_indexed<G: AncestralGraph + ?Sized>(
        &self,
        graph: &G,
        s: &DMatrix<f64>,
    ) -> Result<RicfResult> {
        let p = graph.n_nodes();
        check_covariance(s, p)?;
        let labels: Vec<String> = (0..p).map(|v| graph.node_label(v)).collect();

        if p == 1 {
            return Ok(RicfResult {
                sigma_hat: s.clone(),
                lambda_hat: s.clone(),
                b_hat: DMatrix::identity(1, 1),
                omega_hat: DMatrix::zeros(1, 1),
                iterations: 1,
                delta: f64::NAN,
                converged: true,
                history: Vec::new(),
                variable_names: labels,
            });
        }

        let ug = graph.undirected_nodes();
        let ug_comp = complement(p, &ug);
        check_ancestral(graph, &ug_comp)?;

        let mut state = WorkingMatrices::new(s);

        if !ug.is_empty() {
            let subgraph = InducedSubgraph::new(graph, &ug);
            let ug_fit = ConGraphFitter::new(self.max_iter, self.tol).fit(
                &subgraph,
                &select(s, &ug, &ug),
                (p + 1) as f64,
            )?;
            log::debug!(
                "Undirected component: {} nodes, {} IPS sweeps",
                ug.len(),
                ug_fit.iterations
            );
            assign(&mut state.omega, &ug, &ug, &ug_fit.sigma_hat);
        }

        let updates: Vec<(usize, NodeUpdate)> = ug_comp
            .iter()
            .map(|&v| (v, NodeUpdate::classify(graph.parents(v), graph.spouses(v))))
            .collect();
        // Without bidirected edges every update is a plain regression.
        let closed_form = !updates.iter().any(|(_, u)| u.has_spouses());

        let mut monitor =
            ConvergenceMonitor::new(self.tol, self.max_iter).with_time_budget(self.time_budget);
        let mut history = Vec::new();
        let mut converged = false;

        loop {
            let first_sweep = monitor.n_iterations() == 0;
            let omega_old = state.omega.clone();
            let b_old = state.b.clone();

            for (v, update) in &updates {
                update.apply(*v, &labels[*v], s, &mut state, first_sweep)?;
            }

            let omega_change = one_norm(&(&state.omega - &omega_old));
            let coefficient_change = one_norm(&(&state.b - &b_old));
            let change = omega_change + coefficient_change;
            monitor.record(change);
            history.push(RicfIteration {
                iteration: monitor.n_iterations(),
                omega_change,
                coefficient_change,
                change,
            });

            log::debug!(
                "RICF sweep {}: |dOmega| = {:.3e}, |dB| = {:.3e}",
                monitor.n_iterations(),
                omega_change,
                coefficient_change
            );

            if closed_form || monitor.is_converged() {
                converged = true;
                break;
            }

            let stalled = if monitor.max_reached() {
                Some(RicfError::NotConverged {
                    iterations: monitor.n_iterations(),
                    change,
                })
            } else if monitor.budget_exhausted() {
                Some(RicfError::TimeBudgetExceeded {
                    iterations: monitor.n_iterations(),
                    change,
                })
            } else {
                None
            };
            if let Some(err) = stalled {
                if !self.allow_non_convergence {
                    return Err(err);
                }
                log::warn!("{}; returning the current estimate", err);
                break;
            }
        }

        let delta = if closed_form { 0.0 } else { monitor.last_change() };
        let omega = symmetrize(&state.omega);
        let b_inv = invert_general(&state.b, "B")?;
        let sigma_hat = symmetrize(&(&b_inv * &omega * b_inv.transpose()));

        let mut lambda_hat = omega.clone();
        fill(&mut lambda_hat, &ug_comp, &ug_comp, 0.0);
        let mut omega_hat = omega;
        fill(&mut omega_hat, &ug, &ug, 0.0);

        log::info!(
            "RICF finished: {} variables, {} sweeps, delta = {:.3e}",
            p,
            monitor.n_iterations(),
            delta
        );

        Ok(RicfResult {
            sigma_hat,
            lambda_hat,
            b_hat: state.b,
            omega_hat,
            iterations: monitor.n_iterations(),
            delta,
            converged,
            history,
            variable_names: labels,
        })
    }
}

fn check_covariance(s: &DMatrix<f64>, p: usize) -> Result<()> {
    if p == 0 {
        return Err(RicfError::InvalidCovariance("no variables".into()));
    }
    if s.nrows() != p || s.ncols() != p {
        return Err(RicfError::DimensionMismatch {
            expected: p,
            got: s.nrows().max(s.ncols()),
            context: "covariance matrix vs graph nodes".into(),
        });
    }
    if s.iter().any(|x| !x.is_finite()) {
        return Err(RicfError::InvalidCovariance(
            "matrix contains non-finite values".into(),
        ));
    }
    Ok(())
}

/// Every edge at a node with an arrowhead into it must be a directed or
/// bidirected edge; an undirected edge there breaks the ancestral property.
fn check_ancestral<G: AncestralGraph + ?Sized>(graph: &G, ug_comp: &[usize]) -> Result<()> {
    for &v in ug_comp {
        let parents = graph.parents(v);
        let spouses = graph.spouses(v);
        for u in graph.neighbors(v) {
            if parents.contains(&u) || spouses.contains(&u) || graph.parents(u).contains(&v) {
                continue;
            }
            return Err(RicfError::MalformedGraph(format!(
                "undirected edge between {} and {}, which has an arrowhead pointing into it",
                graph.node_label(u),
                graph.node_label(v)
            )));
        }
    }
    Ok(())
}
