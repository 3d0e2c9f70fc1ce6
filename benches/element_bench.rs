use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fea_shell::prelude::*;

const SIZE: usize = 28;

fn setup() -> (LinearQuadThermalShell, [f64; 12], [f64; SIZE]) {
    let params = IsotropicShellParams::new(70e9, 0.3, 2700.0, 0.01).with_thermal(23e-6, 130.0, 0.0);
    let con = Arc::new(IsotropicShell::new(params).unwrap());
    let shell = LinearQuadThermalShell::new(con, Arc::new(NaturalFrame)).unwrap();

    let xpts = [
        0.0, 0.0, 0.0, 1.1, 0.1, 0.2, 1.2, 1.0, -0.1, -0.1, 0.9, 0.15,
    ];
    let mut vars = [0.0; SIZE];
    for (k, v) in vars.iter_mut().enumerate() {
        *v = 1e-4 * ((7 * k % 13) as f64 - 6.0);
    }
    (shell, xpts, vars)
}

fn bench_residual(c: &mut Criterion) {
    let (shell, xpts, vars) = setup();
    let zero = [0.0; SIZE];
    c.bench_function("residual", |b| {
        b.iter(|| {
            let mut res = [0.0; SIZE];
            shell.add_residual(
                0,
                0.0,
                black_box(&xpts),
                black_box(&vars),
                &zero,
                &zero,
                &mut res,
            );
            res
        })
    });
}

fn bench_jacobian(c: &mut Criterion) {
    let (shell, xpts, vars) = setup();
    let zero = [0.0; SIZE];
    c.bench_function("jacobian", |b| {
        b.iter(|| {
            let mut res = [0.0; SIZE];
            let mut mat = [0.0; SIZE * SIZE];
            shell.add_jacobian(
                0,
                0.0,
                1.0,
                0.0,
                0.002,
                black_box(&xpts),
                black_box(&vars),
                &zero,
                &zero,
                Some(&mut res),
                &mut mat,
            );
            mat
        })
    });
}

criterion_group!(benches, bench_residual, bench_jacobian);
criterion_main!(benches);
