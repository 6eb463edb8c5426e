use std::fmt;

use nalgebra as na;
use na::{vector, DMatrix, DVector, Vector2, Vector3};

/// 2D pixel coordinate.
/// i32 to allow coordinates outside of the image and to remove a lot of casts.
pub type Vector2i = Vector2<i32>;
pub type Vector2f = Vector2<f32>;
pub type Vector3i = Vector3<i32>;
pub type Vector3f = Vector3<f32>;

/// Dense matrix with sizes known only at runtime. The core only ever builds 4x4 transforms with it,
/// but inversion works on the 2n wide augmented matrix, so size can't be fixed.
pub type Matrix = DMatrix<f32>;

/// Pivots smaller than this are treated as zero during inversion.
const SINGULARITY_EPSILON: f32 = 1e-6;
/// Vectors shorter than this can't be normalized.
const NORM_EPSILON: f32 = 1e-12;

/// Numeric failures of the math library. All of them are programming errors on the caller side.
#[derive(Debug, Clone, PartialEq)]
pub enum MathError {
    /// Matrix has no inverse within floating tolerance.
    SingularMatrix,
    /// Only square matrices can be inverted.
    NotSquare { rows: usize, cols: usize },
    /// Direction of a zero vector is undefined.
    ZeroLengthVector,
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::SingularMatrix => write!(f, "matrix is singular"),
            MathError::NotSquare { rows, cols } => {
                write!(f, "can't invert non-square {}x{} matrix", rows, cols)
            }
            MathError::ZeroLengthVector => write!(f, "can't normalize zero-length vector"),
        }
    }
}

impl std::error::Error for MathError {}

/// Normalization, which refuses to divide by a zero norm.
pub fn normalize(v: Vector3f) -> Result<Vector3f, MathError> {
    let norm = v.norm();
    if norm < NORM_EPSILON {
        return Err(MathError::ZeroLengthVector);
    }
    return Ok(v / norm);
}

/// Inverse of a square matrix via Gauss-Jordan elimination on [M | I] with partial pivoting.
pub fn invert(m: &Matrix) -> Result<Matrix, MathError> {
    let (rows, cols) = m.shape();
    if rows != cols {
        return Err(MathError::NotSquare { rows, cols });
    }
    let n = rows;

    // Augmented matrix, left half is M, right half is identity.
    let mut augmented = Matrix::from_fn(n, 2 * n, |i, j| {
        if j < n {
            m[(i, j)]
        } else if j - n == i {
            1.0
        } else {
            0.0
        }
    });

    for col in 0..n {
        let mut pivot_row = col;
        for row in col + 1..n {
            if augmented[(row, col)].abs() > augmented[(pivot_row, col)].abs() {
                pivot_row = row;
            }
        }
        if augmented[(pivot_row, col)].abs() < SINGULARITY_EPSILON {
            return Err(MathError::SingularMatrix);
        }
        augmented.swap_rows(col, pivot_row);

        let pivot = augmented[(col, col)];
        for j in 0..2 * n {
            augmented[(col, j)] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = augmented[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..2 * n {
                augmented[(row, j)] -= factor * augmented[(col, j)];
            }
        }
    }

    return Ok(Matrix::from_fn(n, n, |i, j| augmented[(i, n + j)]));
}

/// Transformation of a point to homogenous coordinates.
pub fn to_hom_point(v: Vector3f) -> DVector<f32> {
    return DVector::from_column_slice(&[v.x, v.y, v.z, 1.0]);
}

/// Transformation of a point from homogenous coordinates. None for points at infinity.
pub fn from_hom_point(v: &DVector<f32>) -> Option<Vector3f> {
    let w = v[3];
    if w == 0.0 {
        return None;
    }
    return Some(vector![v[0] / w, v[1] / w, v[2] / w]);
}

/// The only place where floats become pixel coordinates. Rounds to nearest, halves away from zero.
pub fn to_pixel(value: f32) -> i32 {
    return value.round() as i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_matrix_close(a: &Matrix, b: &Matrix) {
        assert_eq!(a.shape(), b.shape());
        for i in 0..a.nrows() {
            for j in 0..a.ncols() {
                assert!(
                    (a[(i, j)] - b[(i, j)]).abs() < 1e-4,
                    "mismatch at ({}, {}): {} vs {}",
                    i, j, a[(i, j)], b[(i, j)]
                );
            }
        }
    }

    #[test]
    fn test_invert_identity() {
        let identity = Matrix::identity(4, 4);
        assert_matrix_close(&invert(&identity).unwrap(), &identity);
    }

    #[test]
    fn test_invert_needs_pivoting() {
        // Zero in the top left corner forces a row swap.
        let m = Matrix::from_row_slice(3, 3, &[0.0, 2.0, 1.0,
                                               1.0, 0.0, 0.0,
                                               3.0, 1.0, 4.0]);
        let inverse = invert(&m).unwrap();
        assert_matrix_close(&(&m * &inverse), &Matrix::identity(3, 3));
        assert_matrix_close(&(&inverse * &m), &Matrix::identity(3, 3));
    }

    #[test]
    fn test_invert_transpose_commute() {
        let m = Matrix::from_row_slice(2, 2, &[4.0, 7.0,
                                               2.0, 6.0]);
        let a = invert(&m.transpose()).unwrap();
        let b = invert(&m).unwrap().transpose();
        assert_matrix_close(&a, &b);
    }

    #[test]
    fn test_invert_singular() {
        let m = Matrix::from_row_slice(2, 2, &[1.0, 2.0,
                                               2.0, 4.0]);
        assert_eq!(invert(&m), Err(MathError::SingularMatrix));
    }

    #[test]
    fn test_invert_not_square() {
        let m = Matrix::zeros(2, 3);
        assert_eq!(invert(&m), Err(MathError::NotSquare { rows: 2, cols: 3 }));
    }

    #[test]
    fn test_normalize() {
        let n = normalize(vector![3.0, 0.0, 4.0]).unwrap();
        assert!((n.norm() - 1.0).abs() < 1e-6);
        assert!((n.x - 0.6).abs() < 1e-6);
        assert_eq!(normalize(Vector3f::zeros()), Err(MathError::ZeroLengthVector));
    }

    #[test]
    fn test_cross_is_right_handed() {
        let x: Vector3f = vector![1.0, 0.0, 0.0];
        let y: Vector3f = vector![0.0, 1.0, 0.0];
        assert_eq!(x.cross(&y), vector![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_homogeneous_round_trip() {
        let p = vector![1.0, -2.0, 3.0];
        assert_eq!(from_hom_point(&to_hom_point(p)), Some(p));
        let at_infinity = DVector::from_column_slice(&[1.0, 1.0, 1.0, 0.0]);
        assert_eq!(from_hom_point(&at_infinity), None);
    }

    #[test]
    fn test_to_pixel_rounds() {
        assert_eq!(to_pixel(2.4), 2);
        assert_eq!(to_pixel(2.5), 3);
        assert_eq!(to_pixel(2.6), 3);
        assert_eq!(to_pixel(-0.6), -1);
    }
}
