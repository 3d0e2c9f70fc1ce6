//! Shell kinematics: nodal frames, drilling strain and the local
//! displacement gradient
//!
//! The displacement gradient at a point is split into a mid-surface block
//! `u0x` and a through-thickness rate block `u1x`, both expressed in the
//! local frame. Their dependence on the nodal state is linear with fixed
//! geometric coefficient matrices, so sensitivities push back through
//! transposed products and Hessians through congruence products of the same
//! 9x9 maps.

use crate::basis::Basis;
use crate::director::Director;
use crate::math::{grad_map, Mat3, Mat9, Vec3};
use crate::strain::StrainModel;
use crate::transform::Transform;

/// Displacement gradient blocks and the geometric maps that produced them
#[derive(Debug, Clone)]
pub struct DispGrad {
    /// Mid-surface displacement gradient in the local frame
    pub u0x: Mat3,
    /// Through-thickness displacement gradient rate in the local frame
    pub u1x: Mat3,
    /// Local frame at the point
    pub t: Mat3,
    /// `Xd^{-1} T`
    pub xdinv_t: Mat3,
    /// `zXd^{-1}-rate block times T`
    pub xdinvz_t: Mat3,
    /// Determinant of the mid-surface coordinate frame (area measure)
    pub det_xd: f64,
}

/// Unit surface normal at every node from the parametric tangents
pub fn compute_node_normals<B: Basis>(xpts: &[f64], normals: &mut [f64]) {
    for a in 0..B::NUM_NODES {
        let pt = B::node_point(a);
        let mut xxi = [0.0; 6];
        B::interp_fields_grad::<3, 3>(&pt, xpts, &mut xxi);
        let t1 = Vec3::new(xxi[0], xxi[2], xxi[4]);
        let t2 = Vec3::new(xxi[1], xxi[3], xxi[5]);
        let n = t1.cross(&t2).normalize();
        for i in 0..3 {
            normals[3 * a + i] = n[i];
        }
    }
}

fn node_geometry<B: Basis>(
    a: usize,
    transform: &dyn Transform,
    xpts: &[f64],
    normals: &[f64],
) -> ([f64; 2], Mat3, Mat3) {
    let pt = B::node_point(a);
    let mut xxi = [0.0; 6];
    B::interp_fields_grad::<3, 3>(&pt, xpts, &mut xxi);
    let t1 = Vec3::new(xxi[0], xxi[2], xxi[4]);
    let t2 = Vec3::new(xxi[1], xxi[3], xxi[5]);
    let n = Vec3::new(normals[3 * a], normals[3 * a + 1], normals[3 * a + 2]);

    let t = transform.compute_transform(&t1, &t2, &n);
    let xd = Mat3::from_columns(&[t1, t2, n]);
    let xdinv_t = xd.try_inverse().unwrap_or_else(Mat3::zeros) * t;
    (pt, t, xdinv_t)
}

fn node_disp_grad<const VPN: usize, B: Basis>(
    pt: &[f64; 2],
    t: &Mat3,
    xdinv_t: &Mat3,
    vars: &[f64],
) -> Mat3 {
    let mut uxi = [0.0; 6];
    B::interp_fields_grad::<VPN, 3>(pt, vars, &mut uxi);
    let u0d = Mat3::from_columns(&[
        Vec3::new(uxi[0], uxi[2], uxi[4]),
        Vec3::new(uxi[1], uxi[3], uxi[5]),
        Vec3::zeros(),
    ]);
    t.transpose() * u0d * xdinv_t
}

/// Drilling strain at every node
pub fn compute_drill_strains<
    const VPN: usize,
    const OFFSET: usize,
    B: Basis,
    D: Director,
    M: StrainModel,
>(
    transform: &dyn Transform,
    xpts: &[f64],
    vars: &[f64],
    normals: &[f64],
    etn: &mut [f64],
) {
    for a in 0..B::NUM_NODES {
        let (pt, t, xdinv_t) = node_geometry::<B>(a, transform, xpts, normals);
        let u0x = node_disp_grad::<VPN, B>(&pt, &t, &xdinv_t, vars);

        let q = &vars[VPN * a + OFFSET..VPN * a + OFFSET + D::NUM_PARAMETERS];
        let ct = t.transpose() * D::rotation_matrix(q) * t;
        etn[a] = M::eval_drill_strain(&u0x, &ct);
    }
}

/// Drilling strains plus the full-length sensitivity vector of each.
///
/// The drilling strain is linear in the state for this composition, so the
/// same vectors serve the residual transpose push and the node-pair Hessian
/// rank updates.
pub fn compute_drill_strain_sens<
    const VPN: usize,
    const OFFSET: usize,
    B: Basis,
    D: Director,
    M: StrainModel,
>(
    transform: &dyn Transform,
    xpts: &[f64],
    vars: &[f64],
    normals: &[f64],
    etn: &mut [f64],
    bvecs: &mut [[f64; crate::MAX_VARS]],
) {
    for a in 0..B::NUM_NODES {
        let (pt, t, xdinv_t) = node_geometry::<B>(a, transform, xpts, normals);
        let u0x = node_disp_grad::<VPN, B>(&pt, &t, &xdinv_t, vars);

        let q = &vars[VPN * a + OFFSET..VPN * a + OFFSET + D::NUM_PARAMETERS];
        let ct = t.transpose() * D::rotation_matrix(q) * t;
        etn[a] = M::eval_drill_strain(&u0x, &ct);

        let (du0x, dct) = M::drill_strain_sens(1.0);

        // Displacement part: push the local sensitivity back through the
        // frame products and scatter the parametric gradient.
        let du0d = t * du0x * xdinv_t.transpose();
        let mut din = [0.0; 6];
        for j in 0..3 {
            din[2 * j] = du0d[(j, 0)];
            din[2 * j + 1] = du0d[(j, 1)];
        }
        B::add_interp_fields_grad_transpose::<VPN, 3>(&pt, &din, &mut bvecs[a]);

        // Rotation part: only this node's parameters enter.
        let dc = t * dct * t.transpose();
        D::add_rotation_matrix_transpose(&dc, &mut bvecs[a][VPN * a + OFFSET..]);
    }
}

/// Displacement gradient blocks at a quadrature point
pub fn compute_disp_grad<const VPN: usize, B: Basis>(
    pt: &[f64; 2],
    transform: &dyn Transform,
    xpts: &[f64],
    vars: &[f64],
    normals: &[f64],
    d: &[f64],
) -> DispGrad {
    let mut xxi = [0.0; 6];
    B::interp_fields_grad::<3, 3>(pt, xpts, &mut xxi);
    let t1 = Vec3::new(xxi[0], xxi[2], xxi[4]);
    let t2 = Vec3::new(xxi[1], xxi[3], xxi[5]);

    let mut n0a = [0.0; 3];
    B::interp_fields::<3, 3>(pt, normals, &mut n0a);
    let n0 = Vec3::new(n0a[0], n0a[1], n0a[2]);

    let mut nxi = [0.0; 6];
    B::interp_fields_grad::<3, 3>(pt, normals, &mut nxi);

    let xd = Mat3::from_columns(&[t1, t2, n0]);
    let det_xd = xd.determinant();
    let xdinv = xd.try_inverse().unwrap_or_else(Mat3::zeros);

    let zxd = Mat3::from_columns(&[
        Vec3::new(nxi[0], nxi[2], nxi[4]),
        Vec3::new(nxi[1], nxi[3], nxi[5]),
        Vec3::zeros(),
    ]);
    let zxdinv = -xdinv * zxd * xdinv;

    let t = transform.compute_transform(&t1, &t2, &n0);
    let xdinv_t = xdinv * t;
    let xdinvz_t = zxdinv * t;

    let mut uxi = [0.0; 6];
    B::interp_fields_grad::<VPN, 3>(pt, vars, &mut uxi);
    let mut d0a = [0.0; 3];
    B::interp_fields::<3, 3>(pt, d, &mut d0a);
    let mut dxi = [0.0; 6];
    B::interp_fields_grad::<3, 3>(pt, d, &mut dxi);

    let u0d = Mat3::from_columns(&[
        Vec3::new(uxi[0], uxi[2], uxi[4]),
        Vec3::new(uxi[1], uxi[3], uxi[5]),
        Vec3::new(d0a[0], d0a[1], d0a[2]),
    ]);
    let u1d = Mat3::from_columns(&[
        Vec3::new(dxi[0], dxi[2], dxi[4]),
        Vec3::new(dxi[1], dxi[3], dxi[5]),
        Vec3::zeros(),
    ]);

    let u0x = t.transpose() * u0d * xdinv_t;
    let u1x = t.transpose() * (u1d * xdinv_t + u0d * xdinvz_t);

    DispGrad {
        u0x,
        u1x,
        t,
        xdinv_t,
        xdinvz_t,
        det_xd,
    }
}

/// Push sensitivities w.r.t. `u0x` and `u1x` back to the nodal state.
///
/// `res` receives the displacement part (node stride `VPN`), `dd` the
/// director part (node stride 3).
pub fn add_disp_grad_sens<const VPN: usize, B: Basis>(
    pt: &[f64; 2],
    dg: &DispGrad,
    du0x: &Mat3,
    du1x: &Mat3,
    res: &mut [f64],
    dd: &mut [f64],
) {
    let du0d = dg.t * du0x * dg.xdinv_t.transpose() + dg.t * du1x * dg.xdinvz_t.transpose();
    let du1d = dg.t * du1x * dg.xdinv_t.transpose();

    // Parametric-gradient columns of u0d come from the displacement.
    let mut din = [0.0; 6];
    for j in 0..3 {
        din[2 * j] = du0d[(j, 0)];
        din[2 * j + 1] = du0d[(j, 1)];
    }
    B::add_interp_fields_grad_transpose::<VPN, 3>(pt, &din, res);

    // The third column of u0d is the interpolated director.
    let dinf = [du0d[(0, 2)], du0d[(1, 2)], du0d[(2, 2)]];
    B::add_interp_fields_transpose::<3, 3>(pt, &dinf, dd);

    // u1d is the parametric gradient of the director.
    let mut din1 = [0.0; 6];
    for j in 0..3 {
        din1[2 * j] = du1d[(j, 0)];
        din1[2 * j + 1] = du1d[(j, 1)];
    }
    B::add_interp_fields_grad_transpose::<3, 3>(pt, &din1, dd);
}

/// Push a second derivative w.r.t. the displacement gradient blocks onto the
/// element Jacobian (`mat`) and the director accumulators (`d2d`, `d2du`).
///
/// `d2u0xu1x` is indexed rows `u0x`, columns `u1x`; `d2du` rows are director
/// components, columns displacements, both with row length `3 * num_nodes`.
#[allow(clippy::too_many_arguments)]
pub fn add_disp_grad_hessian<const VPN: usize, B: Basis>(
    pt: &[f64; 2],
    dg: &DispGrad,
    d2u0x: &Mat9,
    d2u1x: &Mat9,
    d2u0xu1x: &Mat9,
    mat: &mut [f64],
    d2d: &mut [f64],
    d2du: &mut [f64],
) {
    let k0 = grad_map(&dg.t, &dg.xdinv_t);
    let kz = grad_map(&dg.t, &dg.xdinvz_t);

    // Second derivatives w.r.t. the vectorized (u0d, u1d) blocks.
    let a = k0.transpose() * d2u0x * k0
        + k0.transpose() * d2u0xu1x * kz
        + kz.transpose() * d2u0xu1x.transpose() * k0
        + kz.transpose() * d2u1x * kz;
    let b2 = k0.transpose() * d2u1x * k0;
    let c = k0.transpose() * d2u0xu1x * k0 + kz.transpose() * d2u1x * k0;

    // Displacement-displacement: gradient components of u0d on both sides.
    let mut jac_gg = [0.0; 36];
    for i in 0..3 {
        for j in 0..3 {
            for cc in 0..2 {
                for cp in 0..2 {
                    jac_gg[(2 * i + cc) * 6 + 2 * j + cp] = a[(3 * i + cc, 3 * j + cp)];
                }
            }
        }
    }
    B::add_interp_grad_outer_product::<VPN, VPN, 3, 3>(pt, &jac_gg, mat);

    // Director-director: field column of u0d, gradients of u1d, and their
    // coupling through c.
    let mut jac_ff = [0.0; 9];
    for i in 0..3 {
        for j in 0..3 {
            jac_ff[3 * i + j] = a[(3 * i + 2, 3 * j + 2)];
        }
    }
    B::add_interp_outer_product::<3, 3, 3, 3>(pt, &jac_ff, d2d);

    let mut jac_dd = [0.0; 36];
    for i in 0..3 {
        for j in 0..3 {
            for cc in 0..2 {
                for cp in 0..2 {
                    jac_dd[(2 * i + cc) * 6 + 2 * j + cp] = b2[(3 * i + cc, 3 * j + cp)];
                }
            }
        }
    }
    B::add_interp_grad_outer_product::<3, 3, 3, 3>(pt, &jac_dd, d2d);

    let mut jac_fg = [0.0; 18]; // u0d field rows, u1d gradient columns
    let mut jac_gf = [0.0; 18]; // u1d gradient rows, u0d field columns
    for i in 0..3 {
        for j in 0..3 {
            for cp in 0..2 {
                jac_fg[i * 6 + 2 * j + cp] = c[(3 * i + 2, 3 * j + cp)];
                jac_gf[(2 * j + cp) * 3 + i] = c[(3 * i + 2, 3 * j + cp)];
            }
        }
    }
    B::add_interp_grad_mixed_outer_product::<3, 3, 3, 3>(pt, Some(&jac_gf), Some(&jac_fg), d2d);

    // Director-displacement: field column of u0d against its gradients, and
    // the u1d gradients against the u0d gradients through c.
    let mut jac_du = [0.0; 18];
    for i in 0..3 {
        for j in 0..3 {
            for cp in 0..2 {
                jac_du[i * 6 + 2 * j + cp] = a[(3 * i + 2, 3 * j + cp)];
            }
        }
    }
    B::add_interp_grad_mixed_outer_product::<3, 3, 3, 3>(pt, None, Some(&jac_du), d2du);

    let mut jac_du_g = [0.0; 36];
    for i in 0..3 {
        for j in 0..3 {
            for cc in 0..2 {
                for cp in 0..2 {
                    // Rows are the u1d gradients (director side).
                    jac_du_g[(2 * i + cc) * 6 + 2 * j + cp] = c[(3 * j + cp, 3 * i + cc)];
                }
            }
        }
    }
    B::add_interp_grad_outer_product::<3, 3, 3, 3>(pt, &jac_du_g, d2du);
}
