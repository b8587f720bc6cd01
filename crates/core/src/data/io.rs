use std::path::Path;

use nalgebra::DMatrix;

use crate::error::{Result, RicfError};

use super::covariance::CovarianceMatrix;

impl CovarianceMatrix {
    /// Read a covariance matrix from CSV.
    ///
    /// The header row holds the variable names; it is followed by exactly one
    /// numeric row per variable, in header order.
    ///
    /// # Examples
    /// ```no_run
    /// use ricf_core::data::CovarianceMatrix;
    ///
    /// let cov = CovarianceMatrix::from_csv("cov.csv", 500).unwrap();
    /// println!("{} variables", cov.dimension());
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P, sample_size: usize) -> Result<Self> {
        let (names, rows) = read_numeric_csv(path.as_ref())?;
        if rows.len() != names.len() {
            return Err(RicfError::DimensionMismatch {
                expected: names.len(),
                got: rows.len(),
                context: format!("covariance rows in '{}'", path.as_ref().display()),
            });
        }
        let p = names.len();
        let matrix = DMatrix::from_fn(p, p, |i, j| rows[i][j]);
        CovarianceMatrix::new(names, matrix, sample_size)
    }

    /// Read raw observations from CSV (header = variable names, one row per
    /// observation) and estimate their covariance.
    pub fn from_data_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (names, rows) = read_numeric_csv(path.as_ref())?;
        let data = DMatrix::from_fn(rows.len(), names.len(), |i, j| rows[i][j]);
        CovarianceMatrix::from_samples(names, &data)
    }
}

/// Header plus all rows parsed as `f64`.
fn read_numeric_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let names: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if names.is_empty() {
        return Err(RicfError::Data(format!("'{}' has no header", path.display())));
    }

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let values = record
            .iter()
            .enumerate()
            .map(|(col, field)| {
                field.parse::<f64>().map_err(|_| {
                    RicfError::Data(format!(
                        "row {}, column '{}': '{}' is not a number",
                        row_idx + 1,
                        names[col],
                        field
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }

    Ok((names, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Helper: write CSV content to a temporary file and return the path.
    fn write_temp_csv(content: &str) -> String {
        let dir = std::env::temp_dir();
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let file_name = format!("test_ricf_{}_{}.csv", std::process::id(), id);
        let path = dir.join(file_name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_from_csv_basic() {
        let path = write_temp_csv("X1, X2\n1.0, 0.5\n0.5, 2.0\n");
        let cov = CovarianceMatrix::from_csv(&path, 200).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cov.names(), &["X1".to_string(), "X2".to_string()]);
        assert_eq!(cov.sample_size(), 200);
        assert_relative_eq!(cov.matrix()[(1, 1)], 2.0);
        assert_relative_eq!(cov.matrix()[(0, 1)], 0.5);
    }

    #[test]
    fn test_from_csv_wrong_row_count() {
        let path = write_temp_csv("a,b\n1,0\n");
        let result = CovarianceMatrix::from_csv(&path, 10);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(RicfError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_from_csv_non_numeric() {
        let path = write_temp_csv("a,b\n1,x\n0,1\n");
        let result = CovarianceMatrix::from_csv(&path, 10);
        std::fs::remove_file(&path).ok();
        match result {
            Err(RicfError::Data(msg)) => assert!(msg.contains("'b'"), "{}", msg),
            other => panic!("expected Data error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_csv_ragged_rows() {
        let path = write_temp_csv("a,b\n1,0\n0\n");
        let result = CovarianceMatrix::from_csv(&path, 10);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(RicfError::Csv(_))));
    }

    #[test]
    fn test_from_csv_file_not_found() {
        assert!(CovarianceMatrix::from_csv("/nonexistent/path/cov.csv", 10).is_err());
    }

    #[test]
    fn test_from_data_csv() {
        let path = write_temp_csv("x,y\n1,2\n2,4\n3,6\n4,8\n");
        let cov = CovarianceMatrix::from_data_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cov.sample_size(), 4);
        assert_relative_eq!(cov.matrix()[(0, 0)], 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(cov.matrix()[(1, 0)], 10.0 / 3.0, epsilon = 1e-12);
    }
}
