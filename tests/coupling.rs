//! Derivative consistency with a fully populated section: nonzero
//! membrane-bending coupling and a nonzero first mass moment exercise the
//! cross terms that a symmetric laminate leaves dormant.

use std::sync::Arc;

use approx::assert_relative_eq;
use fea_shell::math::{Mat3, Vec3};
use fea_shell::prelude::*;
use nalgebra::Matrix2;

const SIZE: usize = 28;

/// Unsymmetric section with dense A, B and D blocks and an offset mass
/// distribution. Values are O(1) so central differences stay well
/// conditioned.
struct CoupledSection;

impl CoupledSection {
    fn blocks(&self) -> TangentStiffness {
        TangentStiffness {
            a: Mat3::new(2.0, 0.5, 0.1, 0.5, 1.8, 0.2, 0.1, 0.2, 0.9),
            b: Mat3::new(0.3, 0.1, 0.0, 0.1, 0.2, 0.05, 0.0, 0.05, 0.15),
            d: Mat3::new(1.1, 0.2, 0.0, 0.2, 1.3, 0.1, 0.0, 0.1, 0.7),
            a_s: Matrix2::new(0.8, 0.1, 0.1, 0.9),
            drill: 4.0,
        }
    }
}

impl Constitutive for CoupledSection {
    fn stress(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, strain: &[f64; 9]) -> [f64; 9] {
        self.blocks().stress(strain)
    }

    fn tangent_stiffness(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3) -> TangentStiffness {
        self.blocks()
    }

    fn mass_moments(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3) -> [f64; 3] {
        [1.0, 0.4, 0.1]
    }

    fn thermal_strain(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, _temperature: f64) -> [f64; 9] {
        [0.0; 9]
    }

    fn heat_flux(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, tgrad: &[f64; 2]) -> [f64; 2] {
        [2.0 * tgrad[0], 2.0 * tgrad[1]]
    }

    fn tangent_heat_flux(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3) -> Matrix2<f64> {
        Matrix2::new(2.0, 0.0, 0.0, 2.0)
    }

    fn failure(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, _strain: &[f64; 9]) -> f64 {
        0.0
    }

    fn design_field_value(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, _index: usize) -> f64 {
        0.0
    }
}

fn element() -> LinearQuadThermalShell {
    LinearQuadThermalShell::new(Arc::new(CoupledSection), Arc::new(NaturalFrame)).unwrap()
}

fn warped_quad() -> [f64; 12] {
    [
        0.0, 0.0, 0.0, 1.1, 0.1, 0.2, 1.2, 1.0, -0.1, -0.1, 0.9, 0.15,
    ]
}

fn random_vars(seed: usize, scale: f64) -> [f64; SIZE] {
    let mut vars = [0.0; SIZE];
    for (k, v) in vars.iter_mut().enumerate() {
        *v = scale * (((seed + 7 * k) % 23) as f64 / 23.0 - 0.5);
    }
    vars
}

#[test]
fn coupled_jacobian_is_derivative_of_residual() {
    let shell = element();
    let xpts = warped_quad();
    let vars = random_vars(3, 0.02);
    let dvars = random_vars(7, 0.01);
    let ddvars = random_vars(11, 0.01);

    let mut mat = [0.0; SIZE * SIZE];
    let mut res = [0.0; SIZE];
    shell.add_jacobian(
        0,
        0.0,
        1.0,
        0.0,
        0.0,
        &xpts,
        &vars,
        &dvars,
        &ddvars,
        Some(&mut res),
        &mut mat,
    );

    let mut res_direct = [0.0; SIZE];
    shell.add_residual(0, 0.0, &xpts, &vars, &dvars, &ddvars, &mut res_direct);
    for k in 0..SIZE {
        assert_relative_eq!(res[k], res_direct[k], epsilon = 1e-12, max_relative = 1e-12);
    }

    let h = 1e-6;
    for k in 0..SIZE {
        let mut vp = vars;
        let mut vm = vars;
        vp[k] += h;
        vm[k] -= h;
        let mut rp = [0.0; SIZE];
        let mut rm = [0.0; SIZE];
        shell.add_residual(0, 0.0, &xpts, &vp, &dvars, &ddvars, &mut rp);
        shell.add_residual(0, 0.0, &xpts, &vm, &dvars, &ddvars, &mut rm);
        for r in 0..SIZE {
            let fd = (rp[r] - rm[r]) / (2.0 * h);
            assert_relative_eq!(mat[r * SIZE + k], fd, epsilon = 1e-6, max_relative = 1e-5);
        }
    }
}

#[test]
fn coupled_jacobian_is_symmetric() {
    let shell = element();
    let xpts = warped_quad();
    let vars = random_vars(13, 0.02);
    let zero = [0.0; SIZE];

    let mut mat = [0.0; SIZE * SIZE];
    shell.add_jacobian(
        0,
        0.0,
        0.8,
        0.0,
        0.3,
        &xpts,
        &vars,
        &zero,
        &zero,
        None,
        &mut mat,
    );

    let scale = mat.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    assert!(scale > 0.0);
    for r in 0..SIZE {
        for c in 0..r {
            let asym = (mat[r * SIZE + c] - mat[c * SIZE + r]).abs();
            assert!(
                asym <= 1e-12 * scale,
                "asymmetry {} at ({}, {})",
                asym,
                r,
                c
            );
        }
    }
}

#[test]
fn coupled_mass_jacobian_is_derivative_in_ddvars() {
    let shell = element();
    let xpts = warped_quad();
    let vars = random_vars(17, 0.02);
    let dvars = random_vars(19, 0.01);
    let ddvars = random_vars(23, 0.01);

    let mut mat = [0.0; SIZE * SIZE];
    shell.add_jacobian(
        0,
        0.0,
        0.0,
        0.0,
        1.0,
        &xpts,
        &vars,
        &dvars,
        &ddvars,
        None,
        &mut mat,
    );

    let h = 1e-6;
    for k in 0..SIZE {
        let mut ap = ddvars;
        let mut am = ddvars;
        ap[k] += h;
        am[k] -= h;
        let mut rp = [0.0; SIZE];
        let mut rm = [0.0; SIZE];
        shell.add_residual(0, 0.0, &xpts, &vars, &dvars, &ap, &mut rp);
        shell.add_residual(0, 0.0, &xpts, &vars, &dvars, &am, &mut rm);
        for r in 0..SIZE {
            let fd = (rp[r] - rm[r]) / (2.0 * h);
            assert_relative_eq!(mat[r * SIZE + k], fd, epsilon = 1e-7, max_relative = 1e-6);
        }
    }
}
