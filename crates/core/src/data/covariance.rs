use nalgebra::DMatrix;

use crate::error::{Result, RicfError};
use crate::matrix::select;

/// Relative tolerance for the symmetry check on input covariances.
const SYMMETRY_TOL: f64 = 1e-8;

/// An empirical covariance matrix with named variables.
///
/// Row/column `i` belongs to `names[i]`. `sample_size` is the number of
/// observations the matrix was estimated from; it scales likelihoods and
/// information criteria but plays no part in the fit itself.
#[derive(Debug, Clone)]
pub struct CovarianceMatrix {
    names: Vec<String>,
    matrix: DMatrix<f64>,
    sample_size: usize,
}

impl CovarianceMatrix {
    /// Wrap a covariance matrix.
    ///
    /// # Errors
    /// The matrix must be square, non-empty, finite and symmetric, with a
    /// non-negative diagonal, and there must be one unique name per row.
    pub fn new(names: Vec<String>, matrix: DMatrix<f64>, sample_size: usize) -> Result<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(RicfError::InvalidCovariance(format!(
                "matrix is {} x {}, expected square",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if matrix.is_empty() {
            return Err(RicfError::InvalidCovariance("matrix has no variables".into()));
        }
        if names.len() != matrix.nrows() {
            return Err(RicfError::DimensionMismatch {
                expected: matrix.nrows(),
                got: names.len(),
                context: "covariance variable names".to_string(),
            });
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(RicfError::Data(format!("duplicate variable name '{}'", name)));
            }
        }
        if let Some(bad) = matrix.iter().position(|x| !x.is_finite()) {
            let (i, j) = (bad % matrix.nrows(), bad / matrix.nrows());
            return Err(RicfError::InvalidCovariance(format!(
                "non-finite entry at ({}, {})",
                names[i], names[j]
            )));
        }
        let p = matrix.nrows();
        for i in 0..p {
            if matrix[(i, i)] < 0.0 {
                return Err(RicfError::InvalidCovariance(format!(
                    "negative variance for '{}'",
                    names[i]
                )));
            }
            for j in (i + 1)..p {
                let (a, b) = (matrix[(i, j)], matrix[(j, i)]);
                if (a - b).abs() > SYMMETRY_TOL * a.abs().max(b.abs()).max(1.0) {
                    return Err(RicfError::InvalidCovariance(format!(
                        "not symmetric at ({}, {}): {} vs {}",
                        names[i], names[j], a, b
                    )));
                }
            }
        }

        Ok(Self {
            names,
            matrix,
            sample_size,
        })
    }

    /// Unbiased sample covariance of `data` (rows are observations, columns
    /// are variables in the order of `names`).
    pub fn from_samples(names: Vec<String>, data: &DMatrix<f64>) -> Result<Self> {
        let n = data.nrows();
        if n < 2 {
            return Err(RicfError::Data(format!(
                "need at least 2 observations to estimate a covariance, got {}",
                n
            )));
        }
        if names.len() != data.ncols() {
            return Err(RicfError::DimensionMismatch {
                expected: data.ncols(),
                got: names.len(),
                context: "data column names".to_string(),
            });
        }

        let mut centered = data.clone();
        for mut col in centered.column_iter_mut() {
            let mean = col.mean();
            col.apply(|x| *x -= mean);
        }
        let cov = (centered.transpose() * &centered) / (n - 1) as f64;

        Self::new(names, crate::matrix::symmetrize(&cov), n)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn dimension(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// The covariance restricted to `indices`, in that order.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    pub fn submatrix(&self, indices: &[usize]) -> CovarianceMatrix {
        CovarianceMatrix {
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            matrix: select(&self.matrix, indices, indices),
            sample_size: self.sample_size,
        }
    }

    /// The covariance restricted to the named variables, in that order.
    pub fn submatrix_by_name<S: AsRef<str>>(&self, names: &[S]) -> Result<CovarianceMatrix> {
        let indices = names
            .iter()
            .map(|n| {
                self.index_of(n.as_ref())
                    .ok_or_else(|| RicfError::UnknownVariable(n.as_ref().to_string()))
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(self.submatrix(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("X{}", i)).collect()
    }

    #[test]
    fn test_new_valid() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let cov = CovarianceMatrix::new(names(2), m, 100).unwrap();
        assert_eq!(cov.dimension(), 2);
        assert_eq!(cov.sample_size(), 100);
        assert_eq!(cov.index_of("X2"), Some(1));
        assert_eq!(cov.index_of("X9"), None);
    }

    #[test]
    fn test_new_rejects_bad_input() {
        let asym = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.4, 1.0]);
        assert!(matches!(
            CovarianceMatrix::new(names(2), asym, 10),
            Err(RicfError::InvalidCovariance(_))
        ));

        let rect = DMatrix::from_row_slice(1, 2, &[1.0, 0.5]);
        assert!(CovarianceMatrix::new(names(1), rect, 10).is_err());

        let ok = DMatrix::identity(2, 2);
        assert!(matches!(
            CovarianceMatrix::new(names(3), ok.clone(), 10),
            Err(RicfError::DimensionMismatch { .. })
        ));
        assert!(CovarianceMatrix::new(vec!["A".into(), "A".into()], ok, 10).is_err());

        let nan = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, f64::NAN, 1.0]);
        assert!(CovarianceMatrix::new(names(2), nan, 10).is_err());

        let neg = DMatrix::from_row_slice(1, 1, &[-1.0]);
        assert!(CovarianceMatrix::new(names(1), neg, 10).is_err());

        assert!(CovarianceMatrix::new(vec![], DMatrix::zeros(0, 0), 10).is_err());
    }

    #[test]
    fn test_from_samples() {
        // x = [1, 2, 3, 4], y = 2x => var(x) = 5/3, cov = 10/3, var(y) = 20/3
        let data = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 4.0, 8.0]);
        let cov = CovarianceMatrix::from_samples(names(2), &data).unwrap();
        assert_eq!(cov.sample_size(), 4);
        assert_relative_eq!(cov.matrix()[(0, 0)], 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov.matrix()[(0, 1)], 10.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov.matrix()[(1, 1)], 20.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_samples_needs_two_rows() {
        let data = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(CovarianceMatrix::from_samples(names(2), &data).is_err());
    }

    #[test]
    fn test_submatrix() {
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 0.1, 0.2, 0.1, 2.0, 0.3, 0.2, 0.3, 3.0]);
        let cov = CovarianceMatrix::new(names(3), m, 50).unwrap();
        let sub = cov.submatrix_by_name(&["X3", "X1"]).unwrap();
        assert_eq!(sub.names(), &["X3".to_string(), "X1".to_string()]);
        assert_relative_eq!(sub.matrix()[(0, 0)], 3.0);
        assert_relative_eq!(sub.matrix()[(0, 1)], 0.2);
        assert_eq!(sub.sample_size(), 50);
        assert!(cov.submatrix_by_name(&["X4"]).is_err());
    }
}
