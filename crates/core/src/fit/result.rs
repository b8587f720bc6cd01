use nalgebra::DMatrix;

use crate::diagnostics::ModelFit;
use crate::error::Result;

/// The result of fitting an ancestral graph via RICF.
#[derive(Debug, Clone)]
pub struct RicfResult {
    /// Implied covariance `B^-1 Omega B^-T`.
    pub sigma_hat: DMatrix<f64>,
    /// Covariance of the undirected component: the working `Omega` with
    /// every entry outside the undirected block set to zero.
    pub lambda_hat: DMatrix<f64>,
    /// `I - beta`: unit diagonal, minus the regression coefficient of `v` on
    /// parent `u` at `[v, u]`.
    pub b_hat: DMatrix<f64>,
    /// Error covariance of the non-undirected nodes: the working `Omega`
    /// with the undirected block set to zero.
    pub omega_hat: DMatrix<f64>,
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Change of the last sweep. NaN for a single variable.
    ///
    /// When no node has a spouse the single sweep is exact, and `delta` is
    /// reported as 0 rather than measured. `history` still holds the change
    /// that sweep actually made.
    pub delta: f64,
    pub converged: bool,
    /// Iteration history.
    pub history: Vec<RicfIteration>,
    /// Variable names in matrix order.
    pub variable_names: Vec<String>,
}

/// Information about a single RICF sweep.
#[derive(Debug, Clone)]
pub struct RicfIteration {
    pub iteration: usize,
    /// 1-norm of the change in `Omega`.
    pub omega_change: f64,
    /// 1-norm of the change in `B`.
    pub coefficient_change: f64,
    /// `omega_change + coefficient_change`.
    pub change: f64,
}

impl RicfResult {
    /// Regression coefficients `beta = I - B`, with `beta[v, u]` the
    /// coefficient of parent `u` in the equation of `v`.
    pub fn regression_coefficients(&self) -> DMatrix<f64> {
        let p = self.b_hat.nrows();
        DMatrix::identity(p, p) - &self.b_hat
    }

    /// Likelihood fit statistics of `sigma_hat` against the sample
    /// covariance `s` it was fitted to.
    pub fn model_fit(&self, s: &DMatrix<f64>, n_obs: usize, n_params: usize) -> Result<ModelFit> {
        ModelFit::evaluate(&self.sigma_hat, s, n_obs, n_params)
    }

    /// Print a formatted summary of the fit.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("=== Ancestral Graph Fit (RICF) ===\n\n");
        s.push_str(&format!("Variables: {}\n", self.variable_names.len()));
        s.push_str(&format!(
            "Converged: {}   Iterations: {}   Delta: {:.3e}\n",
            self.converged, self.iterations, self.delta
        ));

        s.push_str("\n--- Implied Covariance (Sigma hat) ---\n");
        s.push_str(&self.format_matrix(&self.sigma_hat));

        s.push_str("\n--- Regression Coefficients (beta = I - B) ---\n");
        let beta = self.regression_coefficients();
        let mut any = false;
        for v in 0..beta.nrows() {
            for u in 0..beta.ncols() {
                if u != v && beta[(v, u)] != 0.0 {
                    s.push_str(&format!(
                        "  {} <- {}: {:.6}\n",
                        self.variable_names[v], self.variable_names[u], beta[(v, u)]
                    ));
                    any = true;
                }
            }
        }
        if !any {
            s.push_str("  (none)\n");
        }

        s.push_str("\n--- Error Covariance (Omega hat) ---\n");
        s.push_str(&self.format_matrix(&self.omega_hat));

        s.push_str("\n--- Undirected Component (Lambda hat) ---\n");
        s.push_str(&self.format_matrix(&self.lambda_hat));

        s
    }

    fn format_matrix(&self, m: &DMatrix<f64>) -> String {
        let width = self
            .variable_names
            .iter()
            .map(|n| n.len())
            .max()
            .unwrap_or(0)
            .max(10);

        let mut out = format!("  {:<width$}", "", width = width);
        for name in &self.variable_names {
            out.push_str(&format!(" {:>width$}", name, width = width));
        }
        out.push('\n');
        for (i, name) in self.variable_names.iter().enumerate() {
            out.push_str(&format!("  {:<width$}", name, width = width));
            for j in 0..m.ncols() {
                out.push_str(&format!(" {:>width$.4}", m[(i, j)], width = width));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_result() -> RicfResult {
        let b_hat = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, -0.5, 1.0]);
        RicfResult {
            sigma_hat: DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0]),
            lambda_hat: DMatrix::zeros(2, 2),
            b_hat,
            omega_hat: DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![1.0, 0.75])),
            iterations: 1,
            delta: 0.0,
            converged: true,
            history: Vec::new(),
            variable_names: vec!["X1".into(), "X2".into()],
        }
    }

    #[test]
    fn test_regression_coefficients_flip_sign() {
        let beta = chain_result().regression_coefficients();
        assert_eq!(beta[(1, 0)], 0.5);
        assert_eq!(beta[(0, 0)], 0.0);
        assert_eq!(beta[(1, 1)], 0.0);
    }

    #[test]
    fn test_summary_lists_edges() {
        let text = chain_result().summary();
        assert!(text.contains("RICF"));
        assert!(text.contains("X2 <- X1: 0.500000"));
        assert!(text.contains("Iterations: 1"));
    }
}
