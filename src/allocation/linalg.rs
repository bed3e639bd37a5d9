//! Small dense linear algebra helpers for the allocation models.
//!
//! Asset counts here are small (tens, not thousands), so plain
//! `Vec<Vec<f64>>` matrices with Gaussian elimination are sufficient.

use crate::error::{BacktestError, Result};

/// Invert a square matrix using Gaussian elimination with partial pivoting.
///
/// Singular and near-singular matrices surface as an
/// [`BacktestError::AllocationError`] so callers can treat the window as a
/// failed allocation rather than a crash.
#[allow(clippy::needless_range_loop)]
pub fn invert_matrix(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();
    if matrix.iter().any(|row| row.len() != n) {
        return Err(BacktestError::AllocationError(
            "Cannot invert a non-square matrix".to_string(),
        ));
    }

    // Augmented matrix [A | I].
    let mut aug = vec![vec![0.0; 2 * n]; n];
    for i in 0..n {
        for j in 0..n {
            aug[i][j] = matrix[i][j];
        }
        aug[i][n + i] = 1.0;
    }

    // Forward elimination with partial pivoting.
    for col in 0..n {
        let mut max_row = col;
        for row in (col + 1)..n {
            if aug[row][col].abs() > aug[max_row][col].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            aug.swap(col, max_row);
        }

        if aug[col][col].abs() < 1e-10 {
            return Err(BacktestError::AllocationError(
                "Matrix is singular or nearly singular".to_string(),
            ));
        }

        for row in (col + 1)..n {
            let factor = aug[row][col] / aug[col][col];
            for j in col..(2 * n) {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    // Back substitution.
    for col in (0..n).rev() {
        let pivot = aug[col][col];
        for j in 0..(2 * n) {
            aug[col][j] /= pivot;
        }
        for row in 0..col {
            let factor = aug[row][col];
            for j in 0..(2 * n) {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut inverse = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            inverse[i][j] = aug[i][n + j];
        }
    }

    Ok(inverse)
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Matrix-vector product.
pub fn mat_vec(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix.iter().map(|row| dot(row, v)).collect()
}

/// Quadratic form `v' M v`.
pub fn quadratic_form(matrix: &[Vec<f64>], v: &[f64]) -> f64 {
    dot(v, &mat_vec(matrix, v))
}

/// Sum of two square matrices.
pub fn mat_add(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter()
        .zip(b.iter())
        .map(|(ra, rb)| ra.iter().zip(rb.iter()).map(|(x, y)| x + y).collect())
        .collect()
}

/// Scale every entry of a matrix.
pub fn mat_scale(matrix: &[Vec<f64>], factor: f64) -> Vec<Vec<f64>> {
    matrix
        .iter()
        .map(|row| row.iter().map(|v| v * factor).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverts_identity() {
        let identity = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let inv = invert_matrix(&identity).unwrap();
        assert_eq!(inv, identity);
    }

    #[test]
    fn inverse_times_original_is_identity() {
        let m = vec![vec![4.0, 1.0], vec![2.0, 3.0]];
        let inv = invert_matrix(&m).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let entry: f64 = (0..2).map(|k| m[i][k] * inv[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((entry - expected).abs() < 1e-10, "entry ({i},{j}) = {entry}");
            }
        }
    }

    #[test]
    fn singular_matrix_is_an_allocation_error() {
        let m = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            invert_matrix(&m),
            Err(crate::error::BacktestError::AllocationError(_))
        ));
    }

    #[test]
    fn quadratic_form_matches_hand_computation() {
        let m = vec![vec![2.0, 0.0], vec![0.0, 3.0]];
        let v = [1.0, 2.0];
        assert!((quadratic_form(&m, &v) - 14.0).abs() < 1e-12);
    }
}
