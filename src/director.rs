//! Director parametrization of the through-thickness kinematics
//!
//! A director policy maps nodal rotation parameters (packed after the
//! displacement and temperature slots of each node) to the director vector
//! field `d` and its time derivatives, and folds the node-level director
//! accumulators back onto the primary residual and Jacobian through the
//! parameter derivative of that map.

use crate::math::{skew, Mat3, Vec3};

/// Rotation parametrization policy.
///
/// `VPN` is the full per-node variable stride and `OFFSET` the index of the
/// first rotation parameter within a node; node count is taken from the
/// normals array (`3 * num_nodes`). All accumulator blocks (`d2d`, `d2du`,
/// `d2Tdotd`, `d2Tdotu`) are dense row-major with row length `3 * num_nodes`.
pub trait Director {
    /// Number of rotation parameters per node
    const NUM_PARAMETERS: usize;

    /// Director field and rate from nodal parameters and normals
    fn compute_director_rates<const VPN: usize, const OFFSET: usize>(
        vars: &[f64],
        dvars: &[f64],
        t: &[f64],
        d: &mut [f64],
        ddot: &mut [f64],
    );

    /// As [`Director::compute_director_rates`], with the acceleration field
    #[allow(clippy::too_many_arguments)]
    fn compute_director_rates_accel<const VPN: usize, const OFFSET: usize>(
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        t: &[f64],
        d: &mut [f64],
        ddot: &mut [f64],
        dddot: &mut [f64],
    );

    /// Rotation matrix of one node's parameters, for the drilling penalty
    fn rotation_matrix(q: &[f64]) -> Mat3;

    /// Push a sensitivity w.r.t. the rotation matrix back onto the parameters
    fn add_rotation_matrix_transpose(dc: &Mat3, out: &mut [f64]);

    /// Fold the director accumulators `dd` (potential) and `dtdot` (kinetic)
    /// into the residual
    fn add_director_residual<const VPN: usize, const OFFSET: usize>(
        vars: &[f64],
        t: &[f64],
        dd: &[f64],
        dtdot: &[f64],
        res: &mut [f64],
    );

    /// Fold the director second-derivative accumulators into the Jacobian
    /// (and the first derivatives into `res`).
    ///
    /// `d2d`/`d2du` carry the static scale already; `gamma` scales the
    /// kinetic blocks here.
    #[allow(clippy::too_many_arguments)]
    fn add_director_jacobian<const VPN: usize, const OFFSET: usize>(
        alpha: f64,
        beta: f64,
        gamma: f64,
        vars: &[f64],
        t: &[f64],
        dd: &[f64],
        dtdot: &[f64],
        d2d: &[f64],
        d2du: &[f64],
        d2tdotd: &[f64],
        d2tdotu: &[f64],
        res: Option<&mut [f64]>,
        mat: &mut [f64],
    );

    /// Residual of the parametrization constraint equation, if any
    fn add_rotation_constraint<const VPN: usize, const OFFSET: usize>(vars: &[f64], res: &mut [f64]);

    /// Jacobian of the parametrization constraint equation, if any
    fn add_rotation_constraint_jacobian<const VPN: usize, const OFFSET: usize>(
        alpha: f64,
        vars: &[f64],
        res: Option<&mut [f64]>,
        mat: &mut [f64],
    );
}

/// Small-rotation director `d = q x n` with three parameters per node.
///
/// The parameter derivative is the constant `-skew(n)`, there is no
/// constraint equation, and the rotation matrix entering the drilling
/// penalty is `skew(q)`.
pub struct LinearizedRotation;

impl Director for LinearizedRotation {
    const NUM_PARAMETERS: usize = 3;

    fn compute_director_rates<const VPN: usize, const OFFSET: usize>(
        vars: &[f64],
        dvars: &[f64],
        t: &[f64],
        d: &mut [f64],
        ddot: &mut [f64],
    ) {
        let num_nodes = t.len() / 3;
        for a in 0..num_nodes {
            let n = Vec3::new(t[3 * a], t[3 * a + 1], t[3 * a + 2]);
            let q = Vec3::from_row_slice(&vars[VPN * a + OFFSET..VPN * a + OFFSET + 3]);
            let qdot = Vec3::from_row_slice(&dvars[VPN * a + OFFSET..VPN * a + OFFSET + 3]);
            let da = q.cross(&n);
            let ddota = qdot.cross(&n);
            for i in 0..3 {
                d[3 * a + i] = da[i];
                ddot[3 * a + i] = ddota[i];
            }
        }
    }

    fn compute_director_rates_accel<const VPN: usize, const OFFSET: usize>(
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        t: &[f64],
        d: &mut [f64],
        ddot: &mut [f64],
        dddot: &mut [f64],
    ) {
        Self::compute_director_rates::<VPN, OFFSET>(vars, dvars, t, d, ddot);
        let num_nodes = t.len() / 3;
        for a in 0..num_nodes {
            let n = Vec3::new(t[3 * a], t[3 * a + 1], t[3 * a + 2]);
            let qddot = Vec3::from_row_slice(&ddvars[VPN * a + OFFSET..VPN * a + OFFSET + 3]);
            let dddota = qddot.cross(&n);
            for i in 0..3 {
                dddot[3 * a + i] = dddota[i];
            }
        }
    }

    fn rotation_matrix(q: &[f64]) -> Mat3 {
        skew(&Vec3::new(q[0], q[1], q[2]))
    }

    fn add_rotation_matrix_transpose(dc: &Mat3, out: &mut [f64]) {
        out[0] += dc[(2, 1)] - dc[(1, 2)];
        out[1] += dc[(0, 2)] - dc[(2, 0)];
        out[2] += dc[(1, 0)] - dc[(0, 1)];
    }

    fn add_director_residual<const VPN: usize, const OFFSET: usize>(
        _vars: &[f64],
        t: &[f64],
        dd: &[f64],
        dtdot: &[f64],
        res: &mut [f64],
    ) {
        let num_nodes = t.len() / 3;
        for a in 0..num_nodes {
            let n = Vec3::new(t[3 * a], t[3 * a + 1], t[3 * a + 2]);
            let da = Vec3::new(
                dd[3 * a] + dtdot[3 * a],
                dd[3 * a + 1] + dtdot[3 * a + 1],
                dd[3 * a + 2] + dtdot[3 * a + 2],
            );
            let push = n.cross(&da);
            for i in 0..3 {
                res[VPN * a + OFFSET + i] += push[i];
            }
        }
    }

    fn add_director_jacobian<const VPN: usize, const OFFSET: usize>(
        _alpha: f64,
        _beta: f64,
        gamma: f64,
        vars: &[f64],
        t: &[f64],
        dd: &[f64],
        dtdot: &[f64],
        d2d: &[f64],
        d2du: &[f64],
        d2tdotd: &[f64],
        d2tdotu: &[f64],
        res: Option<&mut [f64]>,
        mat: &mut [f64],
    ) {
        let num_nodes = t.len() / 3;
        let drow = 3 * num_nodes;
        let size = VPN * num_nodes;

        if let Some(res) = res {
            Self::add_director_residual::<VPN, OFFSET>(vars, t, dd, dtdot, res);
        }

        for a in 0..num_nodes {
            let na = Vec3::new(t[3 * a], t[3 * a + 1], t[3 * a + 2]);
            let ba = -skew(&na); // d(d_a)/d(q_a)
            for b in 0..num_nodes {
                let nb = Vec3::new(t[3 * b], t[3 * b + 1], t[3 * b + 2]);
                let bb = -skew(&nb);

                let block = |src: &[f64]| {
                    Mat3::from_fn(|i, j| src[(3 * a + i) * drow + 3 * b + j])
                };

                // Rotation-rotation coupling through both parameter maps
                let h = block(d2d) + gamma * block(d2tdotd);
                let qq = ba.transpose() * h * bb;
                for i in 0..3 {
                    for j in 0..3 {
                        mat[(VPN * a + OFFSET + i) * size + VPN * b + OFFSET + j] += qq[(i, j)];
                    }
                }

                // Rotation-displacement coupling and its transpose
                let hdu = block(d2du) + gamma * block(d2tdotu);
                let qu = ba.transpose() * hdu;
                for i in 0..3 {
                    for j in 0..3 {
                        mat[(VPN * a + OFFSET + i) * size + VPN * b + j] += qu[(i, j)];
                        mat[(VPN * b + j) * size + VPN * a + OFFSET + i] += qu[(i, j)];
                    }
                }
            }
        }
    }

    fn add_rotation_constraint<const VPN: usize, const OFFSET: usize>(
        _vars: &[f64],
        _res: &mut [f64],
    ) {
    }

    fn add_rotation_constraint_jacobian<const VPN: usize, const OFFSET: usize>(
        _alpha: f64,
        _vars: &[f64],
        _res: Option<&mut [f64]>,
        _mat: &mut [f64],
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const VPN: usize = 7;
    const OFFSET: usize = 4;

    #[test]
    fn director_is_cross_product_of_parameters_and_normal() {
        let mut vars = [0.0; 2 * VPN];
        let mut dvars = [0.0; 2 * VPN];
        vars[OFFSET..OFFSET + 3].copy_from_slice(&[0.1, -0.2, 0.3]);
        vars[VPN + OFFSET..VPN + OFFSET + 3].copy_from_slice(&[0.4, 0.5, -0.6]);
        dvars[OFFSET..OFFSET + 3].copy_from_slice(&[1.0, 2.0, 3.0]);

        let t = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        let mut d = [0.0; 6];
        let mut ddot = [0.0; 6];
        LinearizedRotation::compute_director_rates::<VPN, OFFSET>(
            &vars, &dvars, &t, &mut d, &mut ddot,
        );

        // q0 x ez = (-0.2, -0.1, 0)
        assert_relative_eq!(d[0], -0.2, epsilon = 1e-14);
        assert_relative_eq!(d[1], -0.1, epsilon = 1e-14);
        assert_relative_eq!(d[2], 0.0, epsilon = 1e-14);
        // q1 x ex = (0, -0.6, -0.5)
        assert_relative_eq!(d[3], 0.0, epsilon = 1e-14);
        assert_relative_eq!(d[4], -0.6, epsilon = 1e-14);
        assert_relative_eq!(d[5], -0.5, epsilon = 1e-14);
        // qdot0 x ez = (2, -1, 0)
        assert_relative_eq!(ddot[0], 2.0, epsilon = 1e-14);
        assert_relative_eq!(ddot[1], -1.0, epsilon = 1e-14);
    }

    #[test]
    fn rotation_matrix_is_skew() {
        let q = [0.3, -0.7, 0.2];
        let c = LinearizedRotation::rotation_matrix(&q);
        assert_relative_eq!((c + c.transpose()).norm(), 0.0, epsilon = 1e-15);
        assert_relative_eq!(c[(0, 1)], -0.2, epsilon = 1e-15);
        assert_relative_eq!(c[(1, 0)], 0.2, epsilon = 1e-15);
    }

    #[test]
    fn rotation_matrix_transpose_is_adjoint() {
        // <dc, dC/dq . delta_q> == <push(dc), delta_q>
        let dc = Mat3::new(0.1, 0.5, -0.3, 0.2, -0.7, 0.4, 0.9, 0.0, 0.6);
        let dq = [0.3, -0.2, 0.8];
        let h = 1e-7;

        let mut push = [0.0; 3];
        LinearizedRotation::add_rotation_matrix_transpose(&dc, &mut push);
        let lhs: f64 = (0..3).map(|i| push[i] * dq[i]).sum();

        let q0 = [0.1, 0.2, 0.3];
        let q1 = [q0[0] + h * dq[0], q0[1] + h * dq[1], q0[2] + h * dq[2]];
        let c0 = LinearizedRotation::rotation_matrix(&q0);
        let c1 = LinearizedRotation::rotation_matrix(&q1);
        let mut rhs = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                rhs += dc[(i, j)] * (c1[(i, j)] - c0[(i, j)]) / h;
            }
        }
        assert_relative_eq!(lhs, rhs, epsilon = 1e-6);
    }

    #[test]
    fn residual_push_is_adjoint_to_rate_map() {
        // <dd, d(d)/d(q) dq> == <residual_push(dd), dq>
        let t = [0.2, -0.4, 0.89, -0.3, 0.1, 0.95];
        let dd = [0.5, -0.1, 0.3, 0.2, 0.7, -0.6];
        let dtdot = [0.0; 6];
        let dq = [0.3, 0.1, -0.2, 0.4, -0.5, 0.6];

        let mut res = [0.0; 2 * VPN];
        LinearizedRotation::add_director_residual::<VPN, OFFSET>(
            &[0.0; 2 * VPN],
            &t,
            &dd,
            &dtdot,
            &mut res,
        );
        let mut lhs = 0.0;
        for a in 0..2 {
            for i in 0..3 {
                lhs += res[VPN * a + OFFSET + i] * dq[3 * a + i];
            }
        }

        // Direct directional derivative of d = q x n.
        let mut rhs = 0.0;
        for a in 0..2 {
            let n = Vec3::new(t[3 * a], t[3 * a + 1], t[3 * a + 2]);
            let dqa = Vec3::new(dq[3 * a], dq[3 * a + 1], dq[3 * a + 2]);
            let dir = dqa.cross(&n);
            for i in 0..3 {
                rhs += dd[3 * a + i] * dir[i];
            }
        }
        assert_relative_eq!(lhs, rhs, epsilon = 1e-13);
    }
}
