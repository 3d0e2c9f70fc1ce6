//! Small fixed-size algebra helpers shared by the shell kinematics.
//!
//! All 3x3 gradients use a row-major 9-component vectorization
//! (`vec[3*i + j] = m[(i, j)]`), and symmetric 3x3 tensors use the 6-component
//! upper-triangle storage `[g11, g12, g13, g22, g23, g33]`.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;
/// 9x9 map between vectorized 3x3 gradients
pub type Mat9 = SMatrix<f64, 9, 9>;
/// 6x6 map between symmetric-tensor storages
pub type Mat6 = SMatrix<f64, 6, 6>;
pub type Vec6 = SVector<f64, 6>;
pub type Vec9 = SVector<f64, 9>;

/// Skew-symmetric matrix such that `skew(a) * b == a.cross(&b)`
pub fn skew(a: &Vec3) -> Mat3 {
    Mat3::new(0.0, -a.z, a.y, a.z, 0.0, -a.x, -a.y, a.x, 0.0)
}

/// Row-major vectorization of a 3x3 matrix
pub fn mat3_to_vec9(m: &Mat3) -> Vec9 {
    Vec9::from_fn(|k, _| m[(k / 3, k % 3)])
}

/// Inverse of [`mat3_to_vec9`]
pub fn vec9_to_mat3(v: &Vec9) -> Mat3 {
    Mat3::from_fn(|i, j| v[3 * i + j])
}

/// Symmetric storage of a (symmetric) 3x3 matrix
pub fn full_to_sym6(m: &Mat3) -> Vec6 {
    Vec6::new(
        m[(0, 0)],
        m[(0, 1)],
        m[(0, 2)],
        m[(1, 1)],
        m[(1, 2)],
        m[(2, 2)],
    )
}

/// Full symmetric 3x3 matrix from its 6-component storage
pub fn sym6_to_full(g: &Vec6) -> Mat3 {
    Mat3::new(g[0], g[1], g[2], g[1], g[3], g[4], g[2], g[4], g[5])
}

/// The 9x9 matrix of the linear map `a -> t^T a w` acting on row-major
/// vectorized 3x3 gradients.
///
/// First derivatives of a scalar push back through the transpose of this
/// matrix, and second derivatives through a congruence product with it, so the
/// displacement-gradient chain rule is a handful of matrix products.
pub fn grad_map(t: &Mat3, w: &Mat3) -> Mat9 {
    let mut k = Mat9::zeros();
    for a in 0..3 {
        for b in 0..3 {
            for i in 0..3 {
                for j in 0..3 {
                    k[(3 * a + b, 3 * i + j)] = t[(i, a)] * w[(j, b)];
                }
            }
        }
    }
    k
}

/// The 6x6 matrix of the congruence transform `g -> w^T g w` between
/// symmetric-tensor storages.
///
/// The same matrix serves the value (`e0ty = m * gty`), the transpose
/// sensitivity (`dgty = m^T * de0ty`) and the Hessian
/// (`d2gty = m^T * d2e0ty * m`) of the tying-strain rotation, which keeps the
/// off-diagonal weighting conventions in one place.
pub fn sym_transform_matrix(w: &Mat3) -> Mat6 {
    let mut m = Mat6::zeros();
    for j in 0..6 {
        let mut g = Vec6::zeros();
        g[j] = 1.0;
        let e = w.transpose() * sym6_to_full(&g) * w;
        m.set_column(j, &full_to_sym6(&e));
    }
    m
}
