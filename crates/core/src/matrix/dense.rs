use nalgebra::{DMatrix, DVector};

use crate::error::{Result, RicfError};

/// Pivots smaller than this fraction of the largest pivot mark a matrix as
/// singular to working precision.
const SINGULARITY_TOL: f64 = 1e-12;

/// Compute the Cholesky factorization of a symmetric positive-definite matrix.
/// Returns the lower-triangular factor L such that A = L * L^T.
pub fn cholesky_lower(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let chol = a.clone().cholesky()?;
    Some(chol.l())
}

/// Compute the log-determinant of an SPD matrix via Cholesky: log|A| = 2 * sum(log(diag(L))).
pub fn log_determinant_spd(a: &DMatrix<f64>) -> Option<f64> {
    let l = cholesky_lower(a)?;
    let logdet = 2.0 * (0..l.nrows()).map(|i| l[(i, i)].ln()).sum::<f64>();
    Some(logdet)
}

/// Compute the inverse of an SPD matrix via Cholesky.
/// Returns None when the factorization fails or is numerically degenerate.
pub fn inverse_spd(a: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let chol = a.clone().cholesky()?;
    if pivots_degenerate((0..a.nrows()).map(|i| chol.l_dirty()[(i, i)].powi(2))) {
        return None;
    }
    Some(chol.inverse())
}

/// Invert a symmetric matrix, trying Cholesky first and LU second.
///
/// Only the lower triangle is read by the Cholesky attempt, so `a` must be
/// symmetric; use [`invert_general`] otherwise. `context` names the
/// sub-matrix being inverted and is carried into
/// [`RicfError::SingularMatrix`] when both factorizations fail.
pub fn invert_symmetric(a: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    check_square(a, context)?;
    if a.is_empty() {
        return Ok(DMatrix::zeros(0, 0));
    }
    if let Some(inv) = inverse_spd(a) {
        return Ok(inv);
    }
    invert_general(a, context)
}

/// Invert an arbitrary square matrix by LU with partial pivoting.
pub fn invert_general(a: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>> {
    check_square(a, context)?;
    if a.is_empty() {
        return Ok(DMatrix::zeros(0, 0));
    }

    let lu = a.clone().lu();
    let u = lu.u();
    if pivots_degenerate((0..u.nrows()).map(|i| u[(i, i)].abs())) {
        return Err(singular(context));
    }
    lu.try_inverse()
        .filter(|inv| inv.iter().all(|x| x.is_finite()))
        .ok_or_else(|| singular(context))
}

/// Solve A * x = b for a (nominally) symmetric positive-definite A.
///
/// Same factorization policy as [`invert_symmetric`].
pub fn solve_symmetric(a: &DMatrix<f64>, b: &DVector<f64>, context: &str) -> Result<DVector<f64>> {
    check_square(a, context)?;
    if a.nrows() != b.len() {
        return Err(RicfError::DimensionMismatch {
            expected: a.nrows(),
            got: b.len(),
            context: context.to_string(),
        });
    }
    if a.is_empty() {
        return Ok(DVector::zeros(0));
    }

    if let Some(chol) = a.clone().cholesky() {
        let diag = (0..a.nrows()).map(|i| chol.l_dirty()[(i, i)].powi(2));
        if !pivots_degenerate(diag) {
            return Ok(chol.solve(b));
        }
    }

    let lu = a.clone().lu();
    let u = lu.u();
    if pivots_degenerate((0..u.nrows()).map(|i| u[(i, i)].abs())) {
        return Err(singular(context));
    }
    lu.solve(b)
        .filter(|x| x.iter().all(|v| v.is_finite()))
        .ok_or_else(|| singular(context))
}

/// Compute the trace of a matrix.
pub fn trace(a: &DMatrix<f64>) -> f64 {
    (0..a.nrows().min(a.ncols())).map(|i| a[(i, i)]).sum()
}

/// Matrix 1-norm: the largest absolute column sum.
pub fn one_norm(a: &DMatrix<f64>) -> f64 {
    a.column_iter()
        .map(|col| col.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Return (A + A') / 2.
pub fn symmetrize(a: &DMatrix<f64>) -> DMatrix<f64> {
    (a + a.transpose()) * 0.5
}

fn pivots_degenerate(pivots: impl Iterator<Item = f64>) -> bool {
    let (min, max) = pivots.fold((f64::INFINITY, 0.0_f64), |(lo, hi), d| (lo.min(d), hi.max(d)));
    !min.is_finite() || !max.is_finite() || max == 0.0 || min <= SINGULARITY_TOL * max
}

fn check_square(a: &DMatrix<f64>, context: &str) -> Result<()> {
    if a.nrows() != a.ncols() {
        return Err(RicfError::DimensionMismatch {
            expected: a.nrows(),
            got: a.ncols(),
            context: context.to_string(),
        });
    }
    Ok(())
}

fn singular(context: &str) -> RicfError {
    RicfError::SingularMatrix {
        context: context.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_determinant_spd() {
        // A = [[2, 0], [0, 3]], det = 6, log(det) = ln(6)
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 3.0]);
        let logdet = log_determinant_spd(&a).unwrap();
        assert_relative_eq!(logdet, 6.0_f64.ln(), epsilon = 1e-10);
    }

    #[test]
    fn test_inverse_spd() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let a_inv = inverse_spd(&a).unwrap();
        let product = &a * &a_inv;
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[(i, j)], expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_invert_falls_back_to_lu() {
        // Not positive definite, but invertible.
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        assert!(inverse_spd(&a).is_none());
        let inv = invert_symmetric(&a, "swap").unwrap();
        assert_relative_eq!(inv[(0, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(inv[(1, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(inv[(0, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invert_singular_reports_context() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        match invert_symmetric(&a, "S[pa, pa] for node X3") {
            Err(RicfError::SingularMatrix { context }) => {
                assert_eq!(context, "S[pa, pa] for node X3")
            }
            other => panic!("expected SingularMatrix, got {:?}", other),
        }
    }

    #[test]
    fn test_invert_empty() {
        let a = DMatrix::<f64>::zeros(0, 0);
        assert_eq!(invert_symmetric(&a, "empty").unwrap().nrows(), 0);
    }

    #[test]
    fn test_invert_general_unit_triangular() {
        // B = I - beta with beta[1][0] = 0.5: inverse has +0.5 below the diagonal.
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, -0.5, 1.0]);
        let inv = invert_general(&b, "B").unwrap();
        assert_relative_eq!(inv[(1, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(inv[(0, 1)], 0.0, epsilon = 1e-12);
        let product = &b * &inv;
        assert_relative_eq!(product, DMatrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn test_invert_general_singular() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 6.0]);
        assert!(matches!(
            invert_general(&a, "B"),
            Err(RicfError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_solve_symmetric() {
        // A = [[4, 2], [2, 3]], b = [1, 2] => x = [-1/8, 3/4]
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let x = solve_symmetric(&a, &b, "test").unwrap();
        assert_relative_eq!(x[0], -0.125, epsilon = 1e-10);
        assert_relative_eq!(x[1], 0.75, epsilon = 1e-10);
    }

    #[test]
    fn test_solve_symmetric_singular() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            solve_symmetric(&a, &b, "test"),
            Err(RicfError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_trace() {
        let a = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_relative_eq!(trace(&a), 15.0, epsilon = 1e-10);
    }

    #[test]
    fn test_one_norm_is_max_column_sum() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, -4.0, -2.0, 1.0]);
        // columns: |1| + |-2| = 3, |-4| + |1| = 5
        assert_relative_eq!(one_norm(&a), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetrize() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 4.0, 3.0]);
        let s = symmetrize(&a);
        assert_relative_eq!(s[(0, 1)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(s[(1, 0)], 3.0, epsilon = 1e-12);
    }
}
