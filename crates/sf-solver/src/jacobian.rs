//! Finite difference Jacobian computation.

use nalgebra::{DMatrix, DVector};

/// Compute a Jacobian using forward finite differences, re-evaluating only
/// the rows each column touches.
///
/// `columns[j]` lists the rows whose residual depends on `x[j]`;
/// `row(i, j, v)` evaluates residual `i` at `x` with `x[j]` replaced by `v`.
/// Entries outside the incidence pattern are zero.
pub fn incidence_fd_jacobian<R>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    columns: &[Vec<usize>],
    mut row: R,
    epsilon: f64,
) -> DMatrix<f64>
where
    R: FnMut(usize, usize, f64) -> f64,
{
    let n = x.len();
    let m = f_x.len();
    let mut jac = DMatrix::zeros(m, n);

    for (j, rows) in columns.iter().enumerate().take(n) {
        let dx = epsilon * x[j].abs().max(1.0);
        let perturbed = x[j] + dx;
        for &i in rows {
            jac[(i, j)] = (row(i, j, perturbed) - f_x[i]) / dx;
        }
    }

    jac
}
