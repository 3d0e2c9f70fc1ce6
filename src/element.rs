//! Thermally coupled shear-deformable shell element
//!
//! The element composes four compile-time policies (quadrature, basis,
//! director, strain model) with two shared collaborators (constitutive
//! response, local frame). Per-node variables are `[u, v, w, T, rotations]`,
//! so the temperature sits at offset 3 and the rotation parameters start at
//! [`OFFSET`]. Every evaluation follows the same shape: per-node
//! precomputation (normals, drilling strain, director rates, tying samples),
//! a quadrature loop over local point quantities, and node-level
//! postprocessing that folds the drilling, tying and director accumulators
//! back onto the global residual and Jacobian.

use std::marker::PhantomData;
use std::sync::Arc;

use nalgebra::Matrix2;

use crate::basis::Basis;
use crate::constitutive::Constitutive;
use crate::director::Director;
use crate::error::{ShellError, ShellResult};
use crate::kinematics::{
    add_disp_grad_hessian, add_disp_grad_sens, compute_disp_grad, compute_drill_strain_sens,
    compute_drill_strains, compute_node_normals,
};
use crate::math::{grad_map, sym_transform_matrix, Vec3, Vec6};
use crate::output::{ElementExtras, NodeOutput, OutputRequest, QuantityKind};
use crate::quadrature::Quadrature;
use crate::response::PointQuantities;
use crate::strain::StrainModel;
use crate::transform::Transform;
use crate::{MAX_DOF3, MAX_NODES, MAX_TYING_POINTS, MAX_VARS};

/// Index of the first rotation parameter within a node's variables
pub const OFFSET: usize = 4;

/// Shell element with a coupled in-surface heat conduction field.
///
/// `VPN` is the per-node variable stride; construction checks that it equals
/// `OFFSET + D::NUM_PARAMETERS`.
pub struct ThermalShell<Q, B, D, M, const VPN: usize> {
    con: Arc<dyn Constitutive>,
    transform: Arc<dyn Transform>,
    _policies: PhantomData<fn() -> (Q, B, D, M)>,
}

impl<Q, B, D, M, const VPN: usize> ThermalShell<Q, B, D, M, VPN>
where
    Q: Quadrature,
    B: Basis,
    D: Director,
    M: StrainModel,
{
    pub fn new(con: Arc<dyn Constitutive>, transform: Arc<dyn Transform>) -> ShellResult<Self> {
        if M::NUM_TYING_FIELDS != B::NUM_TYING_FIELDS {
            return Err(ShellError::TyingFieldMismatch {
                model: M::NUM_TYING_FIELDS,
                basis: B::NUM_TYING_FIELDS,
            });
        }
        if VPN != OFFSET + D::NUM_PARAMETERS {
            return Err(ShellError::InvalidInput(format!(
                "variable stride {} does not match {} displacement/temperature slots plus {} rotation parameters",
                VPN,
                OFFSET,
                D::NUM_PARAMETERS
            )));
        }
        if B::NUM_NODES > MAX_NODES
            || B::NUM_TYING_POINTS > MAX_TYING_POINTS
            || VPN * B::NUM_NODES > MAX_VARS
        {
            return Err(ShellError::CapacityExceeded(format!(
                "{} nodes with {} variables each",
                B::NUM_NODES,
                VPN
            )));
        }

        log::debug!(
            "thermal shell element: {} nodes, {} vars/node, {} quadrature points",
            B::NUM_NODES,
            VPN,
            Q::NUM_QUADRATURE_POINTS
        );
        Ok(Self {
            con,
            transform,
            _policies: PhantomData,
        })
    }

    pub fn num_nodes(&self) -> usize {
        B::NUM_NODES
    }

    pub fn vars_per_node(&self) -> usize {
        VPN
    }

    pub fn num_vars(&self) -> usize {
        VPN * B::NUM_NODES
    }

    /// Area measure of the coordinate frame at a parametric point.
    ///
    /// Non-positive or NaN for a degenerate geometry; the caller decides how
    /// to react.
    pub fn jacobian_det_at(&self, pt: &[f64; 2], xpts: &[f64]) -> f64 {
        let mut normals = [0.0; MAX_DOF3];
        compute_node_normals::<B>(xpts, &mut normals);

        let mut xxi = [0.0; 6];
        B::interp_fields_grad::<3, 3>(pt, xpts, &mut xxi);
        let t1 = Vec3::new(xxi[0], xxi[2], xxi[4]);
        let t2 = Vec3::new(xxi[1], xxi[3], xxi[5]);
        let mut n0 = [0.0; 3];
        B::interp_fields::<3, 3>(pt, &normals[..3 * B::NUM_NODES], &mut n0);
        crate::math::Mat3::from_columns(&[t1, t2, Vec3::new(n0[0], n0[1], n0[2])]).determinant()
    }

    /// Kinetic and potential energy of the current state
    pub fn compute_energies(
        &self,
        elem: usize,
        _time: f64,
        xpts: &[f64],
        vars: &[f64],
        dvars: &[f64],
    ) -> (f64, f64) {
        let nn = B::NUM_NODES;
        let dof3 = 3 * nn;

        let mut normals = [0.0; MAX_DOF3];
        compute_node_normals::<B>(xpts, &mut normals);
        let normals = &normals[..dof3];

        let mut etn = [0.0; MAX_NODES];
        compute_drill_strains::<VPN, OFFSET, B, D, M>(
            self.transform.as_ref(),
            xpts,
            vars,
            normals,
            &mut etn,
        );

        let mut d = [0.0; MAX_DOF3];
        let mut ddot = [0.0; MAX_DOF3];
        D::compute_director_rates::<VPN, OFFSET>(vars, dvars, normals, &mut d, &mut ddot);

        let mut ety = [0.0; MAX_TYING_POINTS];
        M::compute_tying_strain::<VPN, B>(xpts, normals, vars, &d[..dof3], &mut ety);

        let mut kinetic = 0.0;
        let mut potential = 0.0;

        for n in 0..Q::NUM_QUADRATURE_POINTS {
            let (pt, weight) = Q::point(n);

            let mut x0 = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, xpts, &mut x0);
            let x = Vec3::new(x0[0], x0[1], x0[2]);

            let mut et = [0.0; 1];
            B::interp_fields::<1, 1>(&pt, &etn[..nn], &mut et);

            let dg = compute_disp_grad::<VPN, B>(
                &pt,
                self.transform.as_ref(),
                xpts,
                vars,
                normals,
                &d[..dof3],
            );
            let det = weight * dg.det_xd;

            let gty = B::interp_tying_strain(&pt, &ety);
            let msym = sym_transform_matrix(&dg.xdinv_t);
            let e0ty = msym * gty;

            let mut e = M::eval_strain(&dg.u0x, &dg.u1x, &e0ty);
            e[8] = et[0];

            let s = self.con.stress(elem, &pt, &x, &e);
            potential += 0.5 * det * (0..9).map(|i| s[i] * e[i]).sum::<f64>();

            let moments = self.con.mass_moments(elem, &pt, &x);
            let mut u0dot = [0.0; 3];
            B::interp_fields::<VPN, 3>(&pt, dvars, &mut u0dot);
            let mut d0dot = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, &ddot[..dof3], &mut d0dot);

            let dot = |a: &[f64; 3], b: &[f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
            kinetic += 0.5
                * det
                * (moments[0] * dot(&u0dot, &u0dot)
                    + 2.0 * moments[1] * dot(&u0dot, &d0dot)
                    + moments[2] * dot(&d0dot, &d0dot));
        }

        (kinetic, potential)
    }

    /// Add the residual of the current state to `res`
    #[allow(clippy::too_many_arguments)]
    pub fn add_residual(
        &self,
        elem: usize,
        _time: f64,
        xpts: &[f64],
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        res: &mut [f64],
    ) {
        let nn = B::NUM_NODES;
        let dof3 = 3 * nn;

        let mut dd = [0.0; MAX_DOF3];
        let mut dtdot = [0.0; MAX_DOF3];
        let mut dety = [0.0; MAX_TYING_POINTS];
        let mut detn = [0.0; MAX_NODES];

        let mut normals = [0.0; MAX_DOF3];
        compute_node_normals::<B>(xpts, &mut normals);
        let normals = &normals[..dof3];

        let mut etn = [0.0; MAX_NODES];
        let mut bvecs = [[0.0; MAX_VARS]; MAX_NODES];
        compute_drill_strain_sens::<VPN, OFFSET, B, D, M>(
            self.transform.as_ref(),
            xpts,
            vars,
            normals,
            &mut etn,
            &mut bvecs[..nn],
        );

        let mut d = [0.0; MAX_DOF3];
        let mut ddot = [0.0; MAX_DOF3];
        let mut dddot = [0.0; MAX_DOF3];
        D::compute_director_rates_accel::<VPN, OFFSET>(
            vars, dvars, ddvars, normals, &mut d, &mut ddot, &mut dddot,
        );

        let mut ety = [0.0; MAX_TYING_POINTS];
        M::compute_tying_strain::<VPN, B>(xpts, normals, vars, &d[..dof3], &mut ety);

        for n in 0..Q::NUM_QUADRATURE_POINTS {
            let (pt, weight) = Q::point(n);

            let mut x0 = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, xpts, &mut x0);
            let x = Vec3::new(x0[0], x0[1], x0[2]);

            let mut et = [0.0; 1];
            B::interp_fields::<1, 1>(&pt, &etn[..nn], &mut et);

            let dg = compute_disp_grad::<VPN, B>(
                &pt,
                self.transform.as_ref(),
                xpts,
                vars,
                normals,
                &d[..dof3],
            );
            let det = weight * dg.det_xd;

            let gty = B::interp_tying_strain(&pt, &ety);
            let msym = sym_transform_matrix(&dg.xdinv_t);
            let e0ty = msym * gty;

            let mut e = M::eval_strain(&dg.u0x, &dg.u1x, &e0ty);
            e[8] = et[0];

            // Temperature and its local in-surface gradient.
            let mut temp = [0.0; 1];
            B::interp_fields::<VPN, 1>(&pt, &vars[3..], &mut temp);
            let mut txi = [0.0; 2];
            B::interp_fields_grad::<VPN, 1>(&pt, &vars[3..], &mut txi);

            let w2 = Matrix2::new(
                dg.xdinv_t[(0, 0)],
                dg.xdinv_t[(0, 1)],
                dg.xdinv_t[(1, 0)],
                dg.xdinv_t[(1, 1)],
            );
            let tx = [
                w2[(0, 0)] * txi[0] + w2[(0, 1)] * txi[1],
                w2[(1, 0)] * txi[0] + w2[(1, 1)] * txi[1],
            ];
            let q = self.con.heat_flux(elem, &pt, &x, &tx);
            let qxi = [
                det * (w2[(0, 0)] * q[0] + w2[(1, 0)] * q[1]),
                det * (w2[(0, 1)] * q[0] + w2[(1, 1)] * q[1]),
            ];
            B::add_interp_fields_grad_transpose::<VPN, 1>(&pt, &qxi, &mut res[3..]);

            // Mechanical strain: the stress-free thermal part carries no
            // elastic energy.
            let eth = self.con.thermal_strain(elem, &pt, &x, temp[0]);
            let mut em = [0.0; 9];
            for i in 0..9 {
                em[i] = e[i] - eth[i];
            }
            let s = self.con.stress(elem, &pt, &x, &em);

            let (du0x, du1x, de0ty) = M::eval_strain_sens(det, &s, &dg.u0x, &dg.u1x);

            let det_drill = [det * s[8]];
            B::add_interp_fields_transpose::<1, 1>(&pt, &det_drill, &mut detn[..nn]);

            add_disp_grad_sens::<VPN, B>(&pt, &dg, &du0x, &du1x, res, &mut dd[..dof3]);

            let dgty = msym.transpose() * de0ty;
            B::add_interp_tying_strain_transpose(&pt, &dgty, &mut dety);

            // Inertial terms.
            let moments = self.con.mass_moments(elem, &pt, &x);
            let mut u0ddot = [0.0; 3];
            B::interp_fields::<VPN, 3>(&pt, ddvars, &mut u0ddot);
            let mut d0ddot = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, &dddot[..dof3], &mut d0ddot);

            let mut du0dot = [0.0; 3];
            let mut dd0dot = [0.0; 3];
            for i in 0..3 {
                du0dot[i] = det * (moments[0] * u0ddot[i] + moments[1] * d0ddot[i]);
                dd0dot[i] = det * (moments[1] * u0ddot[i] + moments[2] * d0ddot[i]);
            }
            B::add_interp_fields_transpose::<VPN, 3>(&pt, &du0dot, res);
            B::add_interp_fields_transpose::<3, 3>(&pt, &dd0dot, &mut dtdot[..dof3]);
        }

        // Drilling strain contribution through the per-node sensitivity
        // vectors.
        for a in 0..nn {
            for k in 0..VPN * nn {
                res[k] += detn[a] * bvecs[a][k];
            }
        }

        M::add_tying_strain_transpose::<VPN, B>(xpts, normals, &dety, res, &mut dd[..dof3]);

        D::add_director_residual::<VPN, OFFSET>(
            vars,
            normals,
            &dd[..dof3],
            &dtdot[..dof3],
            res,
        );

        D::add_rotation_constraint::<VPN, OFFSET>(vars, res);
    }

    /// Add the residual and the Jacobian
    /// `alpha d/du + beta d/du_dot + gamma d/du_ddot` of the current state
    #[allow(clippy::too_many_arguments)]
    pub fn add_jacobian(
        &self,
        elem: usize,
        _time: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        xpts: &[f64],
        vars: &[f64],
        dvars: &[f64],
        ddvars: &[f64],
        mut res: Option<&mut [f64]>,
        mat: &mut [f64],
    ) {
        let nn = B::NUM_NODES;
        let dof3 = 3 * nn;
        let size = VPN * nn;
        let nt = B::NUM_TYING_POINTS;

        let mut dd = [0.0; MAX_DOF3];
        let mut dtdot = [0.0; MAX_DOF3];
        let mut d2d = [0.0; MAX_DOF3 * MAX_DOF3];
        let mut d2du = [0.0; MAX_DOF3 * MAX_DOF3];
        let mut d2tdotd = [0.0; MAX_DOF3 * MAX_DOF3];
        let mut d2tdotu = [0.0; MAX_DOF3 * MAX_DOF3];

        let mut dety = [0.0; MAX_TYING_POINTS];
        let mut d2ety = [0.0; MAX_TYING_POINTS * MAX_TYING_POINTS];
        let mut d2etyu = [0.0; MAX_TYING_POINTS * MAX_DOF3];
        let mut d2etyd = [0.0; MAX_TYING_POINTS * MAX_DOF3];

        let mut detn = [0.0; MAX_NODES];
        let mut d2etn = [0.0; MAX_NODES * MAX_NODES];

        let mut normals = [0.0; MAX_DOF3];
        compute_node_normals::<B>(xpts, &mut normals);
        let normals = &normals[..dof3];

        let mut etn = [0.0; MAX_NODES];
        let mut bvecs = [[0.0; MAX_VARS]; MAX_NODES];
        compute_drill_strain_sens::<VPN, OFFSET, B, D, M>(
            self.transform.as_ref(),
            xpts,
            vars,
            normals,
            &mut etn,
            &mut bvecs[..nn],
        );

        let mut d = [0.0; MAX_DOF3];
        let mut ddot = [0.0; MAX_DOF3];
        let mut dddot = [0.0; MAX_DOF3];
        D::compute_director_rates_accel::<VPN, OFFSET>(
            vars, dvars, ddvars, normals, &mut d, &mut ddot, &mut dddot,
        );

        let mut ety = [0.0; MAX_TYING_POINTS];
        M::compute_tying_strain::<VPN, B>(xpts, normals, vars, &d[..dof3], &mut ety);

        for n in 0..Q::NUM_QUADRATURE_POINTS {
            let (pt, weight) = Q::point(n);

            let mut x0 = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, xpts, &mut x0);
            let x = Vec3::new(x0[0], x0[1], x0[2]);

            let mut et = [0.0; 1];
            B::interp_fields::<1, 1>(&pt, &etn[..nn], &mut et);

            let dg = compute_disp_grad::<VPN, B>(
                &pt,
                self.transform.as_ref(),
                xpts,
                vars,
                normals,
                &d[..dof3],
            );
            let det = weight * dg.det_xd;

            let gty = B::interp_tying_strain(&pt, &ety);
            let msym = sym_transform_matrix(&dg.xdinv_t);
            let e0ty = msym * gty;

            let mut e = M::eval_strain(&dg.u0x, &dg.u1x, &e0ty);
            e[8] = et[0];

            // Temperature field: conduction residual and its stiffness block.
            let mut temp = [0.0; 1];
            B::interp_fields::<VPN, 1>(&pt, &vars[3..], &mut temp);
            let mut txi = [0.0; 2];
            B::interp_fields_grad::<VPN, 1>(&pt, &vars[3..], &mut txi);

            let w2 = Matrix2::new(
                dg.xdinv_t[(0, 0)],
                dg.xdinv_t[(0, 1)],
                dg.xdinv_t[(1, 0)],
                dg.xdinv_t[(1, 1)],
            );
            let tx = [
                w2[(0, 0)] * txi[0] + w2[(0, 1)] * txi[1],
                w2[(1, 0)] * txi[0] + w2[(1, 1)] * txi[1],
            ];
            let q = self.con.heat_flux(elem, &pt, &x, &tx);
            let qxi = [
                det * (w2[(0, 0)] * q[0] + w2[(1, 0)] * q[1]),
                det * (w2[(0, 1)] * q[0] + w2[(1, 1)] * q[1]),
            ];
            if let Some(r) = res.as_deref_mut() {
                B::add_interp_fields_grad_transpose::<VPN, 1>(&pt, &qxi, &mut r[3..]);
            }

            let kt = self.con.tangent_heat_flux(elem, &pt, &x);
            let q2 = (alpha * det) * (w2.transpose() * kt * w2);
            let q2xi = [q2[(0, 0)], q2[(0, 1)], q2[(1, 0)], q2[(1, 1)]];
            B::add_interp_grad_outer_product::<VPN, VPN, 1, 1>(
                &pt,
                &q2xi,
                &mut mat[3 * (size + 1)..],
            );

            let eth = self.con.thermal_strain(elem, &pt, &x, temp[0]);
            let mut em = [0.0; 9];
            for i in 0..9 {
                em[i] = e[i] - eth[i];
            }

            let c = self.con.tangent_stiffness(elem, &pt, &x);
            let s = c.stress(&em);

            let (du0x, du1x, de0ty) = M::eval_strain_sens(det, &s, &dg.u0x, &dg.u1x);
            let h = M::eval_strain_hessian(alpha * det, &s, &c, &dg.u0x, &dg.u1x, &e0ty);

            let det_drill = [det * s[8]];
            B::add_interp_fields_transpose::<1, 1>(&pt, &det_drill, &mut detn[..nn]);

            if let Some(r) = res.as_deref_mut() {
                add_disp_grad_sens::<VPN, B>(&pt, &dg, &du0x, &du1x, r, &mut dd[..dof3]);
            } else {
                let mut sink = [0.0; MAX_VARS];
                add_disp_grad_sens::<VPN, B>(&pt, &dg, &du0x, &du1x, &mut sink, &mut dd[..dof3]);
            }

            // Drilling stiffness accumulates in node-pair space.
            let d2et = [det * alpha * c.drill];
            B::add_interp_outer_product::<1, 1, 1, 1>(&pt, &d2et, &mut d2etn[..nn * nn]);

            add_disp_grad_hessian::<VPN, B>(
                &pt,
                &dg,
                &h.d2u0x,
                &h.d2u1x,
                &h.d2u0xu1x,
                mat,
                &mut d2d[..dof3 * dof3],
                &mut d2du[..dof3 * dof3],
            );

            // Tying strain: rotate the first and second derivatives back to
            // the symmetric natural storage through the same 6x6 matrix.
            let dgty = msym.transpose() * de0ty;
            B::add_interp_tying_strain_transpose(&pt, &dgty, &mut dety);
            let d2gty = msym.transpose() * h.d2e0ty * msym;
            B::add_interp_tying_strain_hessian(&pt, &d2gty, &mut d2ety[..nt * nt]);

            // Coupling of the tying samples with the nodal state.
            let k0 = grad_map(&dg.t, &dg.xdinv_t);
            let kz = grad_map(&dg.t, &dg.xdinvz_t);
            let d2gty_u0d = msym.transpose() * (h.d2e0ty_u0x * k0 + h.d2e0ty_u1x * kz);
            let d2gty_u1d = msym.transpose() * (h.d2e0ty_u1x * k0);

            let mut wts = [0.0; MAX_TYING_POINTS];
            B::add_interp_tying_strain_transpose(&pt, &Vec6::from_element(1.0), &mut wts);
            for t in 0..nt {
                let comp = B::tying_field(t);
                let mut din = [0.0; 6];
                let mut dinf = [0.0; 3];
                let mut din1 = [0.0; 6];
                for i in 0..3 {
                    for cc in 0..2 {
                        din[2 * i + cc] = wts[t] * d2gty_u0d[(comp, 3 * i + cc)];
                        din1[2 * i + cc] = wts[t] * d2gty_u1d[(comp, 3 * i + cc)];
                    }
                    dinf[i] = wts[t] * d2gty_u0d[(comp, 3 * i + 2)];
                }
                B::add_interp_fields_grad_transpose::<3, 3>(
                    &pt,
                    &din,
                    &mut d2etyu[t * dof3..(t + 1) * dof3],
                );
                B::add_interp_fields_transpose::<3, 3>(
                    &pt,
                    &dinf,
                    &mut d2etyd[t * dof3..(t + 1) * dof3],
                );
                B::add_interp_fields_grad_transpose::<3, 3>(
                    &pt,
                    &din1,
                    &mut d2etyd[t * dof3..(t + 1) * dof3],
                );
            }

            // Inertial terms.
            let moments = self.con.mass_moments(elem, &pt, &x);
            let mut u0ddot = [0.0; 3];
            B::interp_fields::<VPN, 3>(&pt, ddvars, &mut u0ddot);
            let mut d0ddot = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, &dddot[..dof3], &mut d0ddot);

            let mut du0dot = [0.0; 3];
            let mut dd0dot = [0.0; 3];
            for i in 0..3 {
                du0dot[i] = det * (moments[0] * u0ddot[i] + moments[1] * d0ddot[i]);
                dd0dot[i] = det * (moments[1] * u0ddot[i] + moments[2] * d0ddot[i]);
            }
            if let Some(r) = res.as_deref_mut() {
                B::add_interp_fields_transpose::<VPN, 3>(&pt, &du0dot, r);
            }
            B::add_interp_fields_transpose::<3, 3>(&pt, &dd0dot, &mut dtdot[..dof3]);

            let gm = gamma * det * moments[0];
            let d2u0dot = [gm, 0.0, 0.0, 0.0, gm, 0.0, 0.0, 0.0, gm];
            B::add_interp_outer_product::<VPN, VPN, 3, 3>(&pt, &d2u0dot, mat);

            let m2 = det * moments[2];
            let d2td = [m2, 0.0, 0.0, 0.0, m2, 0.0, 0.0, 0.0, m2];
            B::add_interp_outer_product::<3, 3, 3, 3>(&pt, &d2td, &mut d2tdotd[..dof3 * dof3]);

            let m1 = det * moments[1];
            let d2tu = [m1, 0.0, 0.0, 0.0, m1, 0.0, 0.0, 0.0, m1];
            B::add_interp_outer_product::<3, 3, 3, 3>(&pt, &d2tu, &mut d2tdotu[..dof3 * dof3]);
        }

        // Drilling strain: rank updates of the per-node sensitivity vectors.
        for a in 0..nn {
            if let Some(r) = res.as_deref_mut() {
                for k in 0..size {
                    r[k] += detn[a] * bvecs[a][k];
                }
            }
            for b in 0..nn {
                let w = d2etn[a * nn + b];
                if w != 0.0 {
                    for r in 0..size {
                        let ba = bvecs[a][r];
                        if ba != 0.0 {
                            for cc in 0..size {
                                mat[r * size + cc] += w * ba * bvecs[b][cc];
                            }
                        }
                    }
                }
            }
        }

        if let Some(r) = res.as_deref_mut() {
            M::add_tying_strain_transpose::<VPN, B>(xpts, normals, &dety, r, &mut dd[..dof3]);
        } else {
            let mut sink = [0.0; MAX_VARS];
            M::add_tying_strain_transpose::<VPN, B>(xpts, normals, &dety, &mut sink, &mut dd[..dof3]);
        }

        M::add_tying_strain_hessian::<VPN, B>(
            xpts,
            normals,
            &d2ety[..nt * nt],
            mat,
            &mut d2d[..dof3 * dof3],
            &mut d2du[..dof3 * dof3],
        );
        M::add_coupled_tying_strain_hessian::<VPN, B>(
            xpts,
            normals,
            &d2etyu[..nt * dof3],
            &d2etyd[..nt * dof3],
            mat,
            &mut d2d[..dof3 * dof3],
            &mut d2du[..dof3 * dof3],
        );

        D::add_director_jacobian::<VPN, OFFSET>(
            alpha,
            beta,
            gamma,
            vars,
            normals,
            &dd[..dof3],
            &dtdot[..dof3],
            &d2d[..dof3 * dof3],
            &d2du[..dof3 * dof3],
            &d2tdotd[..dof3 * dof3],
            &d2tdotu[..dof3 * dof3],
            res.as_deref_mut(),
            mat,
        );

        D::add_rotation_constraint_jacobian::<VPN, OFFSET>(alpha, vars, res, mat);
    }

    /// Extract per-node visualization records into `out`
    /// (`out.len() >= B::NUM_NODES`)
    pub fn get_output_data(
        &self,
        elem: usize,
        request: OutputRequest,
        xpts: &[f64],
        vars: &[f64],
        out: &mut [NodeOutput],
    ) {
        let nn = B::NUM_NODES;
        let dof3 = 3 * nn;

        let mut normals = [0.0; MAX_DOF3];
        compute_node_normals::<B>(xpts, &mut normals);
        let normals = &normals[..dof3];

        let mut etn = [0.0; MAX_NODES];
        compute_drill_strains::<VPN, OFFSET, B, D, M>(
            self.transform.as_ref(),
            xpts,
            vars,
            normals,
            &mut etn,
        );

        let zeros = [0.0; MAX_VARS];
        let mut d = [0.0; MAX_DOF3];
        let mut ddot = [0.0; MAX_DOF3];
        D::compute_director_rates::<VPN, OFFSET>(
            vars,
            &zeros[..VPN * nn],
            normals,
            &mut d,
            &mut ddot,
        );

        let mut ety = [0.0; MAX_TYING_POINTS];
        M::compute_tying_strain::<VPN, B>(xpts, normals, vars, &d[..dof3], &mut ety);

        for (index, record) in out.iter_mut().enumerate().take(nn) {
            let pt = B::node_point(index);

            let mut x0 = [0.0; 3];
            B::interp_fields::<3, 3>(&pt, xpts, &mut x0);
            let x = Vec3::new(x0[0], x0[1], x0[2]);

            let mut et = [0.0; 1];
            B::interp_fields::<1, 1>(&pt, &etn[..nn], &mut et);

            let dg = compute_disp_grad::<VPN, B>(
                &pt,
                self.transform.as_ref(),
                xpts,
                vars,
                normals,
                &d[..dof3],
            );

            let gty = B::interp_tying_strain(&pt, &ety);
            let msym = sym_transform_matrix(&dg.xdinv_t);
            let e0ty = msym * gty;

            let mut e = M::eval_strain(&dg.u0x, &dg.u1x, &e0ty);
            e[8] = et[0];

            let mut temp = [0.0; 1];
            B::interp_fields::<VPN, 1>(&pt, &vars[3..], &mut temp);
            let eth = self.con.thermal_strain(elem, &pt, &x, temp[0]);
            let mut em = [0.0; 9];
            for i in 0..9 {
                em[i] = e[i] - eth[i];
            }
            let s = self.con.stress(elem, &pt, &x, &em);

            *record = NodeOutput::default();
            if request.coordinates {
                record.coordinates = Some(x0);
            }
            if request.displacements {
                let mut disp = [0.0; 6];
                disp[..3].copy_from_slice(&vars[VPN * index..VPN * index + 3]);
                for i in 0..D::NUM_PARAMETERS.min(3) {
                    disp[3 + i] = vars[VPN * index + OFFSET + i];
                }
                record.displacements = Some(disp);
            }
            if request.strains {
                record.strain = Some(e);
            }
            if request.stresses {
                record.stress = Some(s);
            }
            if request.extras {
                record.extras = Some(ElementExtras {
                    failure_index: self.con.failure(elem, &pt, &x, &e),
                    design_fields: [
                        self.con.design_field_value(elem, &pt, &x, 0),
                        self.con.design_field_value(elem, &pt, &x, 1),
                        self.con.design_field_value(elem, &pt, &x, 2),
                    ],
                });
            }
        }
    }

    /// Full strain, mechanical strain and stress at a parametric point
    fn point_state(
        &self,
        elem: usize,
        pt: &[f64; 2],
        xpts: &[f64],
        vars: &[f64],
    ) -> ([f64; 9], [f64; 9], [f64; 9], Vec3) {
        let nn = B::NUM_NODES;
        let dof3 = 3 * nn;

        let mut normals = [0.0; MAX_DOF3];
        compute_node_normals::<B>(xpts, &mut normals);
        let normals = &normals[..dof3];

        let mut etn = [0.0; MAX_NODES];
        compute_drill_strains::<VPN, OFFSET, B, D, M>(
            self.transform.as_ref(),
            xpts,
            vars,
            normals,
            &mut etn,
        );

        let zeros = [0.0; MAX_VARS];
        let mut d = [0.0; MAX_DOF3];
        let mut ddot = [0.0; MAX_DOF3];
        D::compute_director_rates::<VPN, OFFSET>(
            vars,
            &zeros[..VPN * nn],
            normals,
            &mut d,
            &mut ddot,
        );

        let mut ety = [0.0; MAX_TYING_POINTS];
        M::compute_tying_strain::<VPN, B>(xpts, normals, vars, &d[..dof3], &mut ety);

        let mut x0 = [0.0; 3];
        B::interp_fields::<3, 3>(pt, xpts, &mut x0);
        let x = Vec3::new(x0[0], x0[1], x0[2]);

        let mut et = [0.0; 1];
        B::interp_fields::<1, 1>(pt, &etn[..nn], &mut et);

        let dg = compute_disp_grad::<VPN, B>(
            pt,
            self.transform.as_ref(),
            xpts,
            vars,
            normals,
            &d[..dof3],
        );

        let gty = B::interp_tying_strain(pt, &ety);
        let msym = sym_transform_matrix(&dg.xdinv_t);
        let e0ty = msym * gty;

        let mut e = M::eval_strain(&dg.u0x, &dg.u1x, &e0ty);
        e[8] = et[0];

        let mut temp = [0.0; 1];
        B::interp_fields::<VPN, 1>(pt, &vars[3..], &mut temp);
        let eth = self.con.thermal_strain(elem, pt, &x, temp[0]);
        let mut em = [0.0; 9];
        for i in 0..9 {
            em[i] = e[i] - eth[i];
        }
        let s = self.con.stress(elem, pt, &x, &em);

        (e, em, s, x)
    }
}

impl<Q, B, D, M, const VPN: usize> PointQuantities for ThermalShell<Q, B, D, M, VPN>
where
    Q: Quadrature,
    B: Basis,
    D: Director,
    M: StrainModel,
{
    fn num_quadrature_points(&self) -> usize {
        Q::NUM_QUADRATURE_POINTS
    }

    fn quadrature_point(&self, n: usize) -> ([f64; 2], f64) {
        Q::point(n)
    }

    fn num_variables(&self) -> usize {
        VPN * B::NUM_NODES
    }

    fn jacobian_det(&self, pt: &[f64; 2], xpts: &[f64]) -> f64 {
        self.jacobian_det_at(pt, xpts)
    }

    fn eval_point_quantity(
        &self,
        elem: usize,
        kind: QuantityKind,
        pt: &[f64; 2],
        xpts: &[f64],
        vars: &[f64],
    ) -> Option<f64> {
        match kind {
            QuantityKind::Temperature => {
                let mut temp = [0.0; 1];
                B::interp_fields::<VPN, 1>(pt, &vars[3..], &mut temp);
                Some(temp[0])
            }
            QuantityKind::FailureIndex => {
                let (e, _, _, x) = self.point_state(elem, pt, xpts, vars);
                Some(self.con.failure(elem, pt, &x, &e))
            }
            QuantityKind::StrainEnergyDensity => {
                let (_, em, s, _) = self.point_state(elem, pt, xpts, vars);
                Some(0.5 * (0..9).map(|i| s[i] * em[i]).sum::<f64>())
            }
        }
    }

    fn add_point_quantity_sv_sens(
        &self,
        _elem: usize,
        kind: QuantityKind,
        alpha: f64,
        pt: &[f64; 2],
        _xpts: &[f64],
        _vars: &[f64],
        dfdq: f64,
        dfdu: &mut [f64],
    ) {
        // Only the temperature quantity participates in adjoint studies; the
        // reporting quantities have no state sensitivity path.
        if kind == QuantityKind::Temperature {
            let seed = [alpha * dfdq];
            B::add_interp_fields_transpose::<VPN, 1>(pt, &seed, &mut dfdu[3..]);
        }
    }

    fn add_point_quantity_dv_sens(
        &self,
        _elem: usize,
        _kind: QuantityKind,
        _alpha: f64,
        _pt: &[f64; 2],
        _xpts: &[f64],
        _vars: &[f64],
        _dfdq: f64,
        _dfdx: &mut [f64],
    ) {
        // The supported quantities do not depend on the design variables of
        // the provided constitutive law through this interface.
    }
}
