//! Index-set bookkeeping and sub-matrix selection.
//!
//! The fitting code reads blocks such as `S[pa, pa]` or `Omega[vc, vc]` and
//! writes results back into blocks such as `B[v, pa]`. A block is read with
//! [`select`], which copies it out, and written with [`assign`], which
//! scatters a block back into the backing matrix. Writes therefore never
//! alias reads taken earlier in the same update.

use nalgebra::DMatrix;

/// Copy of the sub-matrix `m[rows, cols]`, in the order given.
pub fn select(m: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |i, j| m[(rows[i], cols[j])])
}

/// Write `block` into `m[rows, cols]`.
///
/// # Panics
/// Panics if `block` is not `rows.len() x cols.len()`.
pub fn assign(m: &mut DMatrix<f64>, rows: &[usize], cols: &[usize], block: &DMatrix<f64>) {
    assert_eq!(
        (block.nrows(), block.ncols()),
        (rows.len(), cols.len()),
        "block shape does not match the selection"
    );
    for (i, &r) in rows.iter().enumerate() {
        for (j, &c) in cols.iter().enumerate() {
            m[(r, c)] = block[(i, j)];
        }
    }
}

/// Set every entry of `m[rows, cols]` to `value`.
pub fn fill(m: &mut DMatrix<f64>, rows: &[usize], cols: &[usize], value: f64) {
    for &r in rows {
        for &c in cols {
            m[(r, c)] = value;
        }
    }
}

/// Indices in `0..p` that do not appear in `idx`, ascending.
/// Duplicates and out-of-range entries of `idx` are ignored.
pub fn complement(p: usize, idx: &[usize]) -> Vec<usize> {
    let mut excluded = vec![false; p];
    for &i in idx {
        if i < p {
            excluded[i] = true;
        }
    }
    (0..p).filter(|&i| !excluded[i]).collect()
}

/// Positions of the members of `sub` inside `idx`.
///
/// Returns `None` if some member of `sub` is not in `idx`.
pub fn positions_in(idx: &[usize], sub: &[usize]) -> Option<Vec<usize>> {
    sub.iter()
        .map(|s| idx.iter().position(|i| i == s))
        .collect()
}
