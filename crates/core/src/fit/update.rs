//! Single-node updates of the RICF sweep.
//!
//! For a node `v` outside the undirected component the working model is the
//! regression of `v` on its parents, with an error correlated with the
//! errors of its spouses. The spouse errors are replaced by the pseudo
//! variables
//!
//!   Z = Omega[-v, -v]^-1 restricted to the spouse rows, times B[-v, :]
//!
//! and `v` is regressed on its parents and `Z` jointly. The solution gives
//! the new row of `B` (stored negated, `B = I - beta`), the new
//! `Omega[v, spo]`, and the new error variance `Omega[v, v]`.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, RicfError};
use crate::matrix::{complement, invert_symmetric, positions_in, select, solve_symmetric};

/// The working estimates updated during a sweep.
#[derive(Debug, Clone)]
pub struct WorkingMatrices {
    /// Error covariance, initialised to `diag(S)`.
    pub omega: DMatrix<f64>,
    /// `I - beta`, initialised to the identity.
    pub b: DMatrix<f64>,
}

impl WorkingMatrices {
    pub fn new(s: &DMatrix<f64>) -> Self {
        let p = s.nrows();
        Self {
            omega: DMatrix::from_diagonal(&s.diagonal()),
            b: DMatrix::identity(p, p),
        }
    }
}

/// How a node is updated, decided by its parents and spouses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeUpdate {
    /// Neither parents nor spouses: the node keeps its initial values.
    Fixed,
    /// Parents only. Closed-form least squares, run on the first sweep only
    /// since the result does not depend on the other nodes.
    Regression { parents: Vec<usize> },
    Spouses { spouses: Vec<usize> },
    ParentsAndSpouses {
        parents: Vec<usize>,
        spouses: Vec<usize>,
    },
}

impl NodeUpdate {
    pub fn classify(parents: Vec<usize>, spouses: Vec<usize>) -> Self {
        match (parents.is_empty(), spouses.is_empty()) {
            (true, true) => NodeUpdate::Fixed,
            (false, true) => NodeUpdate::Regression { parents },
            (true, false) => NodeUpdate::Spouses { spouses },
            (false, false) => NodeUpdate::ParentsAndSpouses { parents, spouses },
        }
    }

    pub fn has_spouses(&self) -> bool {
        matches!(
            self,
            NodeUpdate::Spouses { .. } | NodeUpdate::ParentsAndSpouses { .. }
        )
    }

    /// Update row/column `v` of `state` in place. `label` names `v` in error
    /// messages.
    pub fn apply(
        &self,
        v: usize,
        label: &str,
        s: &DMatrix<f64>,
        state: &mut WorkingMatrices,
        first_sweep: bool,
    ) -> Result<()> {
        match self {
            NodeUpdate::Fixed => Ok(()),
            NodeUpdate::Regression { parents } => {
                if first_sweep {
                    regress(v, label, parents, s, state)
                } else {
                    Ok(())
                }
            }
            NodeUpdate::Spouses { spouses } => update_spouses(v, label, spouses, s, state),
            NodeUpdate::ParentsAndSpouses { parents, spouses } => {
                update_parents_and_spouses(v, label, parents, spouses, s, state)
            }
        }
    }
}

fn regress(
    v: usize,
    label: &str,
    parents: &[usize],
    s: &DMatrix<f64>,
    state: &mut WorkingMatrices,
) -> Result<()> {
    let s_pp_inv = invert_symmetric(
        &select(s, parents, parents),
        &format!("S[pa, pa] for node {}", label),
    )?;
    let coef = select(s, &[v], parents) * s_pp_inv;
    let mut explained = 0.0;
    for (k, &u) in parents.iter().enumerate() {
        state.b[(v, u)] = -coef[(0, k)];
        explained += coef[(0, k)] * s[(u, v)];
    }
    state.omega[(v, v)] = s[(v, v)] - explained;
    Ok(())
}

/// Pseudo-variable design for the spouses of `v`.
struct SpouseDesign {
    /// `|spo| x p` matrix `Z`.
    z: DMatrix<f64>,
    /// `Omega[-v, -v]^-1` restricted to the spouses.
    omega_inv_spo: DMatrix<f64>,
}

impl SpouseDesign {
    fn new(v: usize, label: &str, spouses: &[usize], state: &WorkingMatrices) -> Result<Self> {
        let p = state.omega.nrows();
        let rest = complement(p, &[v]);
        let omega_rest_inv = invert_symmetric(
            &select(&state.omega, &rest, &rest),
            &format!("Omega[-v, -v] for node {}", label),
        )?;
        let spo = positions_in(&rest, spouses).ok_or_else(|| {
            RicfError::MalformedGraph(format!("node {} is listed as its own spouse", label))
        })?;
        let z = select(&omega_rest_inv, &spo, &all_of(rest.len()))
            * select(&state.b, &rest, &all_of(p));
        let omega_inv_spo = select(&omega_rest_inv, &spo, &spo);
        Ok(Self { z, omega_inv_spo })
    }

    /// Variance of `v` left after the joint regression.
    fn residual_variance(
        &self,
        s_vv: f64,
        coef: &DVector<f64>,
        rhs: &DVector<f64>,
        spouse_coef: &DVector<f64>,
    ) -> f64 {
        s_vv - coef.dot(rhs) + (spouse_coef.transpose() * &self.omega_inv_spo * spouse_coef)[(0, 0)]
    }
}

fn all_of(n: usize) -> Vec<usize> {
    (0..n).collect()
}

fn update_spouses(
    v: usize,
    label: &str,
    spouses: &[usize],
    s: &DMatrix<f64>,
    state: &mut WorkingMatrices,
) -> Result<()> {
    let design = SpouseDesign::new(v, label, spouses, state)?;
    let z = &design.z;
    let p = s.nrows();

    let xx = z * s * z.transpose();
    let yx_row = select(s, &[v], &all_of(p)) * z.transpose();
    let yx = DVector::from_iterator(spouses.len(), yx_row.iter().copied());

    let coef = solve_symmetric(&xx, &yx, &format!("Z S Z' for node {}", label))?;
    for (k, &w) in spouses.iter().enumerate() {
        state.omega[(v, w)] = coef[k];
        state.omega[(w, v)] = coef[k];
    }
    state.omega[(v, v)] = design.residual_variance(s[(v, v)], &coef, &yx, &coef);
    Ok(())
}

fn update_parents_and_spouses(
    v: usize,
    label: &str,
    parents: &[usize],
    spouses: &[usize],
    s: &DMatrix<f64>,
    state: &mut WorkingMatrices,
) -> Result<()> {
    let design = SpouseDesign::new(v, label, spouses, state)?;
    let z = &design.z;
    let p = s.nrows();
    let n_pa = parents.len();
    let n_spo = spouses.len();
    let all = all_of(p);

    // Joint design [X_pa, Z]: cross-products of parents and pseudo variables.
    let s_pz = select(s, parents, &all) * z.transpose();
    let mut xx = DMatrix::<f64>::zeros(n_pa + n_spo, n_pa + n_spo);
    xx.view_mut((0, 0), (n_pa, n_pa))
        .copy_from(&select(s, parents, parents));
    xx.view_mut((0, n_pa), (n_pa, n_spo)).copy_from(&s_pz);
    xx.view_mut((n_pa, 0), (n_spo, n_pa))
        .copy_from(&s_pz.transpose());
    xx.view_mut((n_pa, n_pa), (n_spo, n_spo))
        .copy_from(&(z * s * z.transpose()));

    let s_vz = select(s, &[v], &all) * z.transpose();
    let mut yx = DVector::<f64>::zeros(n_pa + n_spo);
    for (k, &u) in parents.iter().enumerate() {
        yx[k] = s[(v, u)];
    }
    for k in 0..n_spo {
        yx[n_pa + k] = s_vz[(0, k)];
    }

    let coef = solve_symmetric(
        &xx,
        &yx,
        &format!("[X_pa, Z]' S [X_pa, Z] for node {}", label),
    )?;

    for (k, &u) in parents.iter().enumerate() {
        state.b[(v, u)] = -coef[k];
    }
    let spouse_coef: DVector<f64> = coef.rows(n_pa, n_spo).into_owned();
    for (k, &w) in spouses.iter().enumerate() {
        state.omega[(v, w)] = spouse_coef[k];
        state.omega[(w, v)] = spouse_coef[k];
    }
    state.omega[(v, v)] = design.residual_variance(s[(v, v)], &coef, &yx, &spouse_coef);
    Ok(())
}
