/// Dense matrix type (column-major).
pub type DenseMatrix = nalgebra::DMatrix<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_matrix_is_nalgebra_dmatrix() {
        let m: DenseMatrix = nalgebra::DMatrix::identity(2, 2);
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m[(1, 1)], 1.0);
    }
}
