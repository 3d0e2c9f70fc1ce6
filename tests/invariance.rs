//! Rigid motions and stress-free states must not generate internal forces.

use std::sync::Arc;

use approx::assert_relative_eq;
use fea_shell::prelude::*;

const SIZE: usize = 28;

fn element() -> LinearQuadThermalShell {
    let params = IsotropicShellParams::new(100.0, 0.3, 1.0, 0.1).with_thermal(0.0, 10.0, 0.0);
    let con = Arc::new(IsotropicShell::new(params).unwrap());
    LinearQuadThermalShell::new(con, Arc::new(NaturalFrame)).unwrap()
}

fn warped_quad() -> [f64; 12] {
    [
        0.0, 0.0, 0.0, 1.1, 0.1, 0.2, 1.2, 1.0, -0.1, -0.1, 0.9, 0.15,
    ]
}

#[test]
fn rigid_translation_is_stress_free() {
    let shell = element();
    let xpts = warped_quad();
    let zero = [0.0; SIZE];

    let mut vars = [0.0; SIZE];
    for a in 0..4 {
        vars[7 * a] = 0.3;
        vars[7 * a + 1] = -0.7;
        vars[7 * a + 2] = 0.5;
    }

    let (_, potential) = shell.compute_energies(0, 0.0, &xpts, &vars, &zero);
    assert_relative_eq!(potential, 0.0, epsilon = 1e-12);

    let mut res = [0.0; SIZE];
    shell.add_residual(0, 0.0, &xpts, &vars, &zero, &zero, &mut res);
    for v in res.iter() {
        assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn linearized_rigid_rotation_is_stress_free() {
    let shell = element();
    let xpts = warped_quad();
    let zero = [0.0; SIZE];

    // u = theta x X and matching rotation parameters at every node.
    let theta = [0.01, -0.02, 0.015];
    let mut vars = [0.0; SIZE];
    for a in 0..4 {
        let x = [xpts[3 * a], xpts[3 * a + 1], xpts[3 * a + 2]];
        vars[7 * a] = theta[1] * x[2] - theta[2] * x[1];
        vars[7 * a + 1] = theta[2] * x[0] - theta[0] * x[2];
        vars[7 * a + 2] = theta[0] * x[1] - theta[1] * x[0];
        vars[7 * a + 4] = theta[0];
        vars[7 * a + 5] = theta[1];
        vars[7 * a + 6] = theta[2];
    }

    let (_, potential) = shell.compute_energies(0, 0.0, &xpts, &vars, &zero);
    assert_relative_eq!(potential, 0.0, epsilon = 1e-14);

    let mut res = [0.0; SIZE];
    shell.add_residual(0, 0.0, &xpts, &vars, &zero, &zero, &mut res);
    for v in res.iter() {
        assert_relative_eq!(*v, 0.0, epsilon = 1e-12, max_relative = 1e-10);
    }
}

#[test]
fn uniform_temperature_produces_no_heat_flux() {
    let shell = element();
    let xpts = warped_quad();
    let zero = [0.0; SIZE];

    let mut vars = [0.0; SIZE];
    for a in 0..4 {
        vars[7 * a + 3] = 42.0;
    }

    let mut res = [0.0; SIZE];
    shell.add_residual(0, 0.0, &xpts, &vars, &zero, &zero, &mut res);
    for a in 0..4 {
        assert_relative_eq!(res[7 * a + 3], 0.0, epsilon = 1e-12);
    }
}
