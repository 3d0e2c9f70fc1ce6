//! Shell strain measures and their derivatives
//!
//! The strain model turns the local displacement gradient blocks (`u0x`,
//! `u1x`) and the rotated tying strain (`e0ty`, symmetric storage) into the
//! 9-component shell strain `[membrane(3), bending(3), shear(2), drill(1)]`,
//! and provides the exact first and second derivative maps the element needs
//! for the residual and Jacobian. It also owns the assumed-natural-strain
//! construction: sampling the tying strain at the basis tying points and
//! pushing sensitivities and Hessians back to the nodes.

use nalgebra::SMatrix;

use crate::basis::Basis;
use crate::constitutive::TangentStiffness;
use crate::math::{Mat3, Mat6, Mat9, Vec6};
use crate::{MAX_DOF3, MAX_TYING_POINTS};

/// Second derivatives of the strain energy density with respect to the
/// kinematic inputs, in vectorized storage (`u0x`/`u1x` row-major 9, `e0ty`
/// symmetric 6)
#[derive(Debug, Clone)]
pub struct StrainHessian {
    pub d2u0x: Mat9,
    pub d2u1x: Mat9,
    pub d2u0xu1x: Mat9,
    pub d2e0ty: Mat6,
    pub d2e0ty_u0x: SMatrix<f64, 6, 9>,
    pub d2e0ty_u1x: SMatrix<f64, 6, 9>,
}

/// Strain measure policy of the shell element
pub trait StrainModel {
    /// Tying fields this model samples; checked against the basis at element
    /// construction
    const NUM_TYING_FIELDS: usize;

    /// 9-component shell strain from the local kinematic quantities.
    ///
    /// Slot 8 (drilling) is left zero; the element overwrites it with the
    /// interpolated nodal drilling strain.
    fn eval_strain(u0x: &Mat3, u1x: &Mat3, e0ty: &Vec6) -> [f64; 9];

    /// Sensitivity contraction `scale * s^T (de/d.)` of the strain map
    fn eval_strain_sens(scale: f64, s: &[f64; 9], u0x: &Mat3, u1x: &Mat3) -> (Mat3, Mat3, Vec6);

    /// Second derivative of `scale * 1/2 e^T C e` with respect to the
    /// kinematic inputs
    fn eval_strain_hessian(
        scale: f64,
        s: &[f64; 9],
        c: &TangentStiffness,
        u0x: &Mat3,
        u1x: &Mat3,
        e0ty: &Vec6,
    ) -> StrainHessian;

    /// Drilling strain: relative rotation of the displacement field about the
    /// local normal against the director rotation
    fn eval_drill_strain(u0x: &Mat3, ct: &Mat3) -> f64;

    /// Sensitivities of the drilling strain w.r.t. `u0x` and the rotation
    /// matrix (state independent for a linear model)
    fn drill_strain_sens(scale: f64) -> (Mat3, Mat3);

    /// Sample the natural-coordinate strain at every tying point of `B`
    fn compute_tying_strain<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        vars: &[f64],
        d: &[f64],
        ety: &mut [f64],
    );

    /// Push tying-sample sensitivities back onto the residual (`res`, node
    /// stride `VPN`) and the director accumulator (`dd`, node stride 3)
    fn add_tying_strain_transpose<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        dety: &[f64],
        res: &mut [f64],
        dd: &mut [f64],
    );

    /// Push a tying-sample Hessian (`d2ety`, row-major `NT x NT`) onto the
    /// element Jacobian and the director accumulators.
    ///
    /// `mat` is the full Jacobian (row length `VPN * num_nodes`); `d2d` and
    /// `d2du` are dense director blocks with row length `3 * num_nodes`
    /// (`d2du` rows are director components, columns displacements).
    fn add_tying_strain_hessian<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        d2ety: &[f64],
        mat: &mut [f64],
        d2d: &mut [f64],
        d2du: &mut [f64],
    );

    /// Push the coupling between tying samples and the nodal state onto the
    /// Jacobian, symmetrically in both orientations.
    ///
    /// `d2etyu` and `d2etyd` are row-major `NT x (3 num_nodes)` coupling
    /// blocks of each sample against nodal displacements and directors.
    fn add_coupled_tying_strain_hessian<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        d2etyu: &[f64],
        d2etyd: &[f64],
        mat: &mut [f64],
        d2d: &mut [f64],
        d2du: &mut [f64],
    );
}

/// Small-strain first-order shear deformation kinematics
pub struct LinearShellStrain;

// Bending strain rows of the vectorized u1x: e3 = u1x[0,0], e4 = u1x[1,1],
// e5 = u1x[0,1] + u1x[1,0].
fn bending_map() -> SMatrix<f64, 3, 9> {
    let mut j = SMatrix::<f64, 3, 9>::zeros();
    j[(0, 0)] = 1.0;
    j[(1, 4)] = 1.0;
    j[(2, 1)] = 1.0;
    j[(2, 3)] = 1.0;
    j
}

// Membrane strain from symmetric tying storage: e0 = g11, e1 = g22,
// e2 = 2 g12.
fn membrane_map() -> SMatrix<f64, 3, 6> {
    let mut j = SMatrix::<f64, 3, 6>::zeros();
    j[(0, 0)] = 1.0;
    j[(1, 3)] = 1.0;
    j[(2, 1)] = 2.0;
    j
}

// Transverse shear from symmetric tying storage: e6 = 2 g23, e7 = 2 g13.
fn shear_map() -> SMatrix<f64, 2, 6> {
    let mut j = SMatrix::<f64, 2, 6>::zeros();
    j[(0, 4)] = 2.0;
    j[(1, 2)] = 2.0;
    j
}

impl LinearShellStrain {
    /// Tying sample value at one point from the parametric derivatives of the
    /// displacement, the geometry tangents, the interpolated normal and the
    /// interpolated director
    #[allow(clippy::too_many_arguments)]
    fn tying_sample(
        comp: usize,
        uxi1: &[f64; 3],
        uxi2: &[f64; 3],
        xxi1: &[f64; 3],
        xxi2: &[f64; 3],
        n0: &[f64; 3],
        d0: &[f64; 3],
    ) -> f64 {
        let dot = |a: &[f64; 3], b: &[f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        match comp {
            0 => dot(uxi1, xxi1),
            3 => dot(uxi2, xxi2),
            1 => 0.5 * (dot(uxi1, xxi2) + dot(uxi2, xxi1)),
            4 => 0.5 * (dot(uxi2, n0) + dot(d0, xxi2)),
            _ => 0.5 * (dot(uxi1, n0) + dot(d0, xxi1)),
        }
    }

    /// Gradient-transpose weights (`din`, layout `[j,xi1 j,xi2 ...]`) and
    /// field weights (`dinf`, director) of one unit tying sample
    fn tying_sample_weights(
        comp: usize,
        xxi1: &[f64; 3],
        xxi2: &[f64; 3],
        n0: &[f64; 3],
    ) -> ([f64; 6], [f64; 3]) {
        let mut din = [0.0; 6];
        let mut dinf = [0.0; 3];
        match comp {
            0 => {
                for j in 0..3 {
                    din[2 * j] = xxi1[j];
                }
            }
            3 => {
                for j in 0..3 {
                    din[2 * j + 1] = xxi2[j];
                }
            }
            1 => {
                for j in 0..3 {
                    din[2 * j] = 0.5 * xxi2[j];
                    din[2 * j + 1] = 0.5 * xxi1[j];
                }
            }
            4 => {
                for j in 0..3 {
                    din[2 * j + 1] = 0.5 * n0[j];
                    dinf[j] = 0.5 * xxi2[j];
                }
            }
            _ => {
                for j in 0..3 {
                    din[2 * j] = 0.5 * n0[j];
                    dinf[j] = 0.5 * xxi1[j];
                }
            }
        }
        (din, dinf)
    }

    fn geometry_at<B: Basis>(
        pt: &[f64; 2],
        xpts: &[f64],
        normals: &[f64],
    ) -> ([f64; 3], [f64; 3], [f64; 3]) {
        let mut xxi = [0.0; 6];
        B::interp_fields_grad::<3, 3>(pt, xpts, &mut xxi);
        let mut n0 = [0.0; 3];
        B::interp_fields::<3, 3>(pt, normals, &mut n0);
        (
            [xxi[0], xxi[2], xxi[4]],
            [xxi[1], xxi[3], xxi[5]],
            n0,
        )
    }
}

impl StrainModel for LinearShellStrain {
    const NUM_TYING_FIELDS: usize = 5;

    fn eval_strain(u0x: &Mat3, u1x: &Mat3, e0ty: &Vec6) -> [f64; 9] {
        let _ = u0x;
        [
            e0ty[0],
            e0ty[3],
            2.0 * e0ty[1],
            u1x[(0, 0)],
            u1x[(1, 1)],
            u1x[(0, 1)] + u1x[(1, 0)],
            2.0 * e0ty[4],
            2.0 * e0ty[2],
            0.0,
        ]
    }

    fn eval_strain_sens(scale: f64, s: &[f64; 9], _u0x: &Mat3, _u1x: &Mat3) -> (Mat3, Mat3, Vec6) {
        let du0x = Mat3::zeros();
        let mut du1x = Mat3::zeros();
        du1x[(0, 0)] = scale * s[3];
        du1x[(1, 1)] = scale * s[4];
        du1x[(0, 1)] = scale * s[5];
        du1x[(1, 0)] = scale * s[5];
        let de0ty = scale
            * Vec6::new(
                s[0],
                2.0 * s[2],
                2.0 * s[7],
                s[1],
                2.0 * s[6],
                0.0,
            );
        (du0x, du1x, de0ty)
    }

    fn eval_strain_hessian(
        scale: f64,
        _s: &[f64; 9],
        c: &TangentStiffness,
        _u0x: &Mat3,
        _u1x: &Mat3,
        _e0ty: &Vec6,
    ) -> StrainHessian {
        let j1 = bending_map();
        let jm = membrane_map();
        let js = shear_map();

        StrainHessian {
            d2u0x: Mat9::zeros(),
            d2u1x: scale * j1.transpose() * c.d * j1,
            d2u0xu1x: Mat9::zeros(),
            d2e0ty: scale
                * (jm.transpose() * c.a * jm + js.transpose() * c.a_s * js),
            d2e0ty_u0x: SMatrix::<f64, 6, 9>::zeros(),
            d2e0ty_u1x: scale * jm.transpose() * c.b * j1,
        }
    }

    fn eval_drill_strain(u0x: &Mat3, ct: &Mat3) -> f64 {
        0.5 * (u0x[(1, 0)] - u0x[(0, 1)]) - 0.5 * (ct[(1, 0)] - ct[(0, 1)])
    }

    fn drill_strain_sens(scale: f64) -> (Mat3, Mat3) {
        let mut du0x = Mat3::zeros();
        du0x[(1, 0)] = 0.5 * scale;
        du0x[(0, 1)] = -0.5 * scale;
        let mut dct = Mat3::zeros();
        dct[(1, 0)] = -0.5 * scale;
        dct[(0, 1)] = 0.5 * scale;
        (du0x, dct)
    }

    fn compute_tying_strain<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        vars: &[f64],
        d: &[f64],
        ety: &mut [f64],
    ) {
        for t in 0..B::NUM_TYING_POINTS {
            let pt = B::tying_point(t);
            let comp = B::tying_field(t);
            let (xxi1, xxi2, n0) = Self::geometry_at::<B>(&pt, xpts, normals);

            let mut uxi = [0.0; 6];
            B::interp_fields_grad::<VPN, 3>(&pt, vars, &mut uxi);
            let uxi1 = [uxi[0], uxi[2], uxi[4]];
            let uxi2 = [uxi[1], uxi[3], uxi[5]];

            let mut d0 = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, d, &mut d0);

            ety[t] = Self::tying_sample(comp, &uxi1, &uxi2, &xxi1, &xxi2, &n0, &d0);
        }
    }

    fn add_tying_strain_transpose<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        dety: &[f64],
        res: &mut [f64],
        dd: &mut [f64],
    ) {
        for t in 0..B::NUM_TYING_POINTS {
            let pt = B::tying_point(t);
            let comp = B::tying_field(t);
            let (xxi1, xxi2, n0) = Self::geometry_at::<B>(&pt, xpts, normals);
            let (mut din, mut dinf) = Self::tying_sample_weights(comp, &xxi1, &xxi2, &n0);
            for v in din.iter_mut() {
                *v *= dety[t];
            }
            for v in dinf.iter_mut() {
                *v *= dety[t];
            }
            B::add_interp_fields_grad_transpose::<VPN, 3>(&pt, &din, res);
            B::add_interp_fields_transpose::<3, 3>(&pt, &dinf, dd);
        }
    }

    fn add_tying_strain_hessian<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        d2ety: &[f64],
        mat: &mut [f64],
        d2d: &mut [f64],
        d2du: &mut [f64],
    ) {
        let nn = B::NUM_NODES;
        let nt = B::NUM_TYING_POINTS;
        let dof3 = 3 * nn;
        let size = VPN * nn;

        // Nodal sensitivity vectors of every tying sample, node stride 3.
        let mut gu = [[0.0; MAX_DOF3]; MAX_TYING_POINTS];
        let mut gd = [[0.0; MAX_DOF3]; MAX_TYING_POINTS];
        for t in 0..nt {
            let pt = B::tying_point(t);
            let comp = B::tying_field(t);
            let (xxi1, xxi2, n0) = Self::geometry_at::<B>(&pt, xpts, normals);
            let (din, dinf) = Self::tying_sample_weights(comp, &xxi1, &xxi2, &n0);
            B::add_interp_fields_grad_transpose::<3, 3>(&pt, &din, &mut gu[t]);
            B::add_interp_fields_transpose::<3, 3>(&pt, &dinf, &mut gd[t]);
        }

        // The samples are linear in the state, so the pushed Hessian is a sum
        // of rank-one products of the sensitivity vectors.
        for t in 0..nt {
            let mut hu = [0.0; MAX_DOF3];
            let mut hd = [0.0; MAX_DOF3];
            for tp in 0..nt {
                let c = d2ety[t * nt + tp];
                if c != 0.0 {
                    for k in 0..dof3 {
                        hu[k] += c * gu[tp][k];
                        hd[k] += c * gd[tp][k];
                    }
                }
            }

            for a in 0..nn {
                for i in 0..3 {
                    let gut = gu[t][3 * a + i];
                    let gdt = gd[t][3 * a + i];
                    for b in 0..nn {
                        for j in 0..3 {
                            mat[(VPN * a + i) * size + VPN * b + j] += gut * hu[3 * b + j];
                            d2d[(3 * a + i) * dof3 + 3 * b + j] += gdt * hd[3 * b + j];
                            d2du[(3 * a + i) * dof3 + 3 * b + j] += gdt * hu[3 * b + j];
                        }
                    }
                }
            }
        }
    }

    fn add_coupled_tying_strain_hessian<const VPN: usize, B: Basis>(
        xpts: &[f64],
        normals: &[f64],
        d2etyu: &[f64],
        d2etyd: &[f64],
        mat: &mut [f64],
        d2d: &mut [f64],
        d2du: &mut [f64],
    ) {
        let nn = B::NUM_NODES;
        let nt = B::NUM_TYING_POINTS;
        let dof3 = 3 * nn;
        let size = VPN * nn;

        for t in 0..nt {
            let pt = B::tying_point(t);
            let comp = B::tying_field(t);
            let (xxi1, xxi2, n0) = Self::geometry_at::<B>(&pt, xpts, normals);
            let (din, dinf) = Self::tying_sample_weights(comp, &xxi1, &xxi2, &n0);
            let mut gu = [0.0; MAX_DOF3];
            let mut gd = [0.0; MAX_DOF3];
            B::add_interp_fields_grad_transpose::<3, 3>(&pt, &din, &mut gu);
            B::add_interp_fields_transpose::<3, 3>(&pt, &dinf, &mut gd);

            let cu = &d2etyu[t * dof3..(t + 1) * dof3];
            let cd = &d2etyd[t * dof3..(t + 1) * dof3];

            for a in 0..nn {
                for i in 0..3 {
                    let r = 3 * a + i;
                    for b in 0..nn {
                        for j in 0..3 {
                            let c = 3 * b + j;
                            mat[(VPN * a + i) * size + VPN * b + j] +=
                                gu[r] * cu[c] + cu[r] * gu[c];
                            d2d[r * dof3 + c] += gd[r] * cd[c] + cd[r] * gd[c];
                            d2du[r * dof3 + c] += gd[r] * cu[c] + cd[r] * gu[c];
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::QuadLinearBasis;
    use approx::assert_relative_eq;
    use nalgebra::Matrix2;

    const VPN: usize = 7;

    fn stiffness() -> TangentStiffness {
        // Nonzero coupling block to exercise every Hessian term.
        TangentStiffness {
            a: Mat3::new(2.0, 0.5, 0.1, 0.5, 1.8, 0.2, 0.1, 0.2, 0.9),
            b: Mat3::new(0.3, 0.1, 0.0, 0.1, 0.2, 0.05, 0.0, 0.05, 0.15),
            d: Mat3::new(1.1, 0.2, 0.0, 0.2, 1.3, 0.1, 0.0, 0.1, 0.7),
            a_s: Matrix2::new(0.8, 0.1, 0.1, 0.9),
            drill: 4.0,
        }
    }

    #[test]
    fn strain_slots_follow_the_layout() {
        let u1x = Mat3::new(0.1, 0.2, 0.0, 0.3, 0.4, 0.0, 0.0, 0.0, 0.0);
        let e0ty = Vec6::new(1.0, 2.0, 3.0, 4.0, 5.0, 0.0);
        let e = LinearShellStrain::eval_strain(&Mat3::zeros(), &u1x, &e0ty);
        assert_relative_eq!(e[0], 1.0);
        assert_relative_eq!(e[1], 4.0);
        assert_relative_eq!(e[2], 4.0); // 2 g12
        assert_relative_eq!(e[3], 0.1);
        assert_relative_eq!(e[4], 0.4);
        assert_relative_eq!(e[5], 0.5);
        assert_relative_eq!(e[6], 10.0); // 2 g23
        assert_relative_eq!(e[7], 6.0); // 2 g13
        assert_relative_eq!(e[8], 0.0);
    }

    #[test]
    fn strain_sens_matches_linear_map() {
        // The model is linear, so s . e(du1x, de0ty) must equal the
        // contraction of the sensitivities with the perturbation.
        let s = [0.4, -0.2, 0.7, 1.1, -0.6, 0.3, 0.9, -0.8, 0.0];
        let du1x = Mat3::new(0.2, -0.1, 0.0, 0.5, 0.3, 0.0, 0.0, 0.0, 0.0);
        let de0ty = Vec6::new(0.1, -0.3, 0.2, 0.4, -0.5, 0.0);

        let e = LinearShellStrain::eval_strain(&Mat3::zeros(), &du1x, &de0ty);
        let lhs: f64 = (0..9).map(|i| s[i] * e[i]).sum();

        let (du0x_s, du1x_s, de0ty_s) =
            LinearShellStrain::eval_strain_sens(1.0, &s, &Mat3::zeros(), &Mat3::zeros());
        let mut rhs = de0ty_s.dot(&de0ty);
        for i in 0..3 {
            for j in 0..3 {
                rhs += du1x_s[(i, j)] * du1x[(i, j)] + du0x_s[(i, j)] * 0.0;
            }
        }
        assert_relative_eq!(lhs, rhs, epsilon = 1e-13);
    }

    #[test]
    fn strain_hessian_matches_quadratic_energy() {
        let c = stiffness();
        let h = LinearShellStrain::eval_strain_hessian(
            1.0,
            &[0.0; 9],
            &c,
            &Mat3::zeros(),
            &Mat3::zeros(),
            &Vec6::zeros(),
        );

        let u1x = Mat3::new(0.2, -0.1, 0.0, 0.5, 0.3, 0.0, 0.0, 0.0, 0.0);
        let e0ty = Vec6::new(0.1, -0.3, 0.2, 0.4, -0.5, 0.0);
        let e = LinearShellStrain::eval_strain(&Mat3::zeros(), &u1x, &e0ty);
        let s = c.stress(&e);
        // Drop the drilling contribution; it is handled outside this map.
        let energy2: f64 = (0..8).map(|i| s[i] * e[i]).sum();

        let vu1x = crate::math::mat3_to_vec9(&u1x);
        let quad = (vu1x.transpose() * h.d2u1x * vu1x)[(0, 0)]
            + (e0ty.transpose() * h.d2e0ty * e0ty)[(0, 0)]
            + 2.0 * (e0ty.transpose() * h.d2e0ty_u1x * vu1x)[(0, 0)];
        assert_relative_eq!(quad, energy2, epsilon = 1e-12);
    }

    #[test]
    fn drill_strain_vanishes_for_consistent_rotation() {
        // In-plane rotation omega about the local normal appears both in the
        // displacement gradient and in the rotation matrix.
        let omega = 0.37;
        let mut u0x = Mat3::zeros();
        u0x[(1, 0)] = omega;
        u0x[(0, 1)] = -omega;
        let ct = crate::math::skew(&crate::math::Vec3::new(0.0, 0.0, omega));
        let et = LinearShellStrain::eval_drill_strain(&u0x, &ct);
        assert_relative_eq!(et, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn drill_strain_sens_matches_linear_map() {
        let u0x = Mat3::new(0.0, -0.2, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0);
        let ct = Mat3::new(0.0, 0.1, 0.0, -0.3, 0.0, 0.0, 0.0, 0.0, 0.0);
        let et = LinearShellStrain::eval_drill_strain(&u0x, &ct);

        let (du0x, dct) = LinearShellStrain::drill_strain_sens(1.0);
        let mut contracted = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                contracted += du0x[(i, j)] * u0x[(i, j)] + dct[(i, j)] * ct[(i, j)];
            }
        }
        assert_relative_eq!(contracted, et, epsilon = 1e-14);
    }

    fn flat_quad() -> ([f64; 12], [f64; 12]) {
        let xpts = [
            0.0, 0.0, 0.0, 1.2, 0.0, 0.0, 1.2, 0.9, 0.0, 0.0, 0.9, 0.0,
        ];
        let normals = [
            0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0,
        ];
        (xpts, normals)
    }

    #[test]
    fn tying_strain_of_rigid_translation_is_zero() {
        let (xpts, normals) = flat_quad();
        let mut vars = [0.0; 4 * VPN];
        for a in 0..4 {
            vars[VPN * a] = 0.7;
            vars[VPN * a + 1] = -0.3;
            vars[VPN * a + 2] = 0.1;
        }
        let d = [0.0; 12];
        let mut ety = [0.0; 9];
        LinearShellStrain::compute_tying_strain::<VPN, QuadLinearBasis>(
            &xpts, &normals, &vars, &d, &mut ety,
        );
        for t in 0..9 {
            assert_relative_eq!(ety[t], 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn tying_transpose_is_adjoint_to_forward_map() {
        let (xpts, normals) = flat_quad();
        let dety = [0.4, -0.2, 0.1, 0.9, -0.7, 0.3, 0.5, -0.1, 0.6];

        let mut dvars = [0.0; 4 * VPN];
        let mut dd = [0.0; 12];
        for (k, v) in dvars.iter_mut().enumerate() {
            *v = 0.1 * (k as f64) - 0.9;
        }
        for (k, v) in dd.iter_mut().enumerate() {
            *v = 0.03 * (k as f64) + 0.2;
        }

        // Forward: samples of the perturbation (the map is linear).
        let mut ety = [0.0; 9];
        LinearShellStrain::compute_tying_strain::<VPN, QuadLinearBasis>(
            &xpts, &normals, &dvars, &dd, &mut ety,
        );
        let lhs: f64 = (0..9).map(|t| dety[t] * ety[t]).sum();

        // Transpose: scatter then contract.
        let mut res = [0.0; 4 * VPN];
        let mut ddd = [0.0; 12];
        LinearShellStrain::add_tying_strain_transpose::<VPN, QuadLinearBasis>(
            &xpts, &normals, &dety, &mut res, &mut ddd,
        );
        let rhs: f64 = (0..4 * VPN).map(|k| res[k] * dvars[k]).sum::<f64>()
            + (0..12).map(|k| ddd[k] * dd[k]).sum::<f64>();
        assert_relative_eq!(lhs, rhs, epsilon = 1e-12);
    }

    #[test]
    fn tying_hessian_matches_quadratic_form() {
        let (xpts, normals) = flat_quad();

        // A symmetric sample-space Hessian.
        let mut d2ety = [0.0; 81];
        for t in 0..9 {
            for tp in 0..9 {
                let v = 0.1 * ((t * tp) as f64) + if t == tp { 1.5 } else { 0.0 };
                d2ety[t * 9 + tp] = v;
                d2ety[tp * 9 + t] = v;
            }
        }

        let size = 4 * VPN;
        let mut mat = vec![0.0; size * size];
        let mut d2d = vec![0.0; 144];
        let mut d2du = vec![0.0; 144];
        LinearShellStrain::add_tying_strain_hessian::<VPN, QuadLinearBasis>(
            &xpts, &normals, &d2ety, &mut mat, &mut d2d, &mut d2du,
        );

        let mut dvars = [0.0; 4 * VPN];
        let mut dd = [0.0; 12];
        for (k, v) in dvars.iter_mut().enumerate() {
            *v = 0.05 * (k as f64) - 0.6;
        }
        for (k, v) in dd.iter_mut().enumerate() {
            *v = -0.04 * (k as f64) + 0.3;
        }

        let mut ety = [0.0; 9];
        LinearShellStrain::compute_tying_strain::<VPN, QuadLinearBasis>(
            &xpts, &normals, &dvars, &dd, &mut ety,
        );
        let mut expect = 0.0;
        for t in 0..9 {
            for tp in 0..9 {
                expect += ety[t] * d2ety[t * 9 + tp] * ety[tp];
            }
        }

        let mut got = 0.0;
        for r in 0..size {
            for c in 0..size {
                got += dvars[r] * mat[r * size + c] * dvars[c];
            }
        }
        for r in 0..12 {
            for c in 0..12 {
                got += dd[r] * d2d[r * 12 + c] * dd[c];
            }
        }
        // Both orientations of the coupling block.
        for r in 0..12 {
            for c in 0..4 {
                for j in 0..3 {
                    got += 2.0 * dd[r] * d2du[r * 12 + 3 * c + j] * dvars[VPN * c + j];
                }
            }
        }
        assert_relative_eq!(got, expect, epsilon = 1e-11);
    }
}
