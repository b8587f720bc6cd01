use nalgebra::DMatrix;

use crate::error::{Result, RicfError};
use crate::graph::Adjacency;
use crate::matrix::{invert_symmetric, log_determinant_spd, trace};

/// Likelihood-based fit statistics of an implied covariance against the
/// sample covariance it was fitted to.
#[derive(Debug, Clone)]
pub struct ModelFit {
    /// Gaussian log-likelihood without the `2*pi` constant:
    /// `-n/2 * (tr(K S) - ln|K|)` with `K` the inverse implied covariance.
    pub log_likelihood: f64,
    /// `n * (tr(K S) - ln|K S| - p)`: twice the log-likelihood ratio against
    /// the saturated model. NaN if `S` is singular.
    pub deviance: f64,
    /// `p (p + 1) / 2 - n_params`.
    pub df: i64,
    pub n_obs: usize,
    pub n_params: usize,
}

impl ModelFit {
    pub fn evaluate(
        sigma_hat: &DMatrix<f64>,
        s: &DMatrix<f64>,
        n_obs: usize,
        n_params: usize,
    ) -> Result<Self> {
        if sigma_hat.shape() != s.shape() {
            return Err(RicfError::DimensionMismatch {
                expected: s.nrows(),
                got: sigma_hat.nrows(),
                context: "implied vs sample covariance".to_string(),
            });
        }
        let p = s.nrows();
        let n = n_obs as f64;

        let log_det_sigma = log_determinant_spd(sigma_hat).ok_or_else(|| RicfError::SingularMatrix {
            context: "implied covariance (not positive definite)".to_string(),
        })?;
        let k = invert_symmetric(sigma_hat, "implied covariance")?;
        let tr_ks = trace(&(&k * s));

        let log_likelihood = -0.5 * n * (tr_ks + log_det_sigma);
        let deviance = match log_determinant_spd(s) {
            Some(log_det_s) => n * (tr_ks + log_det_sigma - log_det_s - p as f64),
            None => f64::NAN,
        };
        let df = (p * (p + 1) / 2) as i64 - n_params as i64;

        Ok(Self {
            log_likelihood,
            deviance,
            df,
            n_obs,
            n_params,
        })
    }

    /// AIC = -2 * logL + 2 * k.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * self.n_params as f64
    }

    /// BIC = -2 * logL + k * ln(n).
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood + self.n_params as f64 * (self.n_obs as f64).ln()
    }
}

/// Free parameters of a Gaussian graph model: one variance per node and one
/// parameter per edge.
pub fn free_parameters<G: Adjacency + ?Sized>(graph: &G) -> usize {
    graph.n_nodes() + graph.n_edges()
}
