//! Parametric interpolation basis and assumed-strain tying layout
//!
//! The basis is a zero-sized policy type. Interpolation operators are
//! const-generic over the per-node stride `M` of the source/destination array
//! and the number of interpolated components `N`, so one set of operators
//! serves displacements, temperatures and director fields alike.
//!
//! Layout conventions:
//! - nodal arrays pack node `a` at `values[M * a ..]`;
//! - interpolated gradients pack `[f0,xi1  f0,xi2  f1,xi1 ...]`;
//! - Jacobian blocks are written into a row-major destination whose row
//!   length is `M2 * NUM_NODES`, at relative index
//!   `(M1 * a + i) * row + M2 * b + j`.

use crate::math::{Mat6, Vec6};

/// Interpolation and tying operators over a fixed node layout
pub trait Basis {
    const NUM_NODES: usize;
    const NUM_TYING_FIELDS: usize;
    const NUM_TYING_POINTS: usize;

    /// Parametric location of node `n`
    fn node_point(n: usize) -> [f64; 2];

    /// Interpolate `N` components with node stride `M`: `out[j] = sum_a N_a(pt) values[M a + j]`
    fn interp_fields<const M: usize, const N: usize>(pt: &[f64; 2], values: &[f64], out: &mut [f64]);

    /// Parametric gradient of the interpolation, packed `[f_j,xi1 f_j,xi2 ...]`
    fn interp_fields_grad<const M: usize, const N: usize>(
        pt: &[f64; 2],
        values: &[f64],
        out: &mut [f64],
    );

    /// Transpose of [`Basis::interp_fields`]: scatter `din[j]` to the nodes
    fn add_interp_fields_transpose<const M: usize, const N: usize>(
        pt: &[f64; 2],
        din: &[f64],
        out: &mut [f64],
    );

    /// Transpose of [`Basis::interp_fields_grad`]
    fn add_interp_fields_grad_transpose<const M: usize, const N: usize>(
        pt: &[f64; 2],
        din: &[f64],
        out: &mut [f64],
    );

    /// Rank-`N1 x N2` Jacobian contribution `N_a N_b jac` for every node pair.
    ///
    /// `jac` is row-major `N1 x N2`.
    fn add_interp_outer_product<const M1: usize, const M2: usize, const N1: usize, const N2: usize>(
        pt: &[f64; 2],
        jac: &[f64],
        mat: &mut [f64],
    );

    /// Gradient-gradient Jacobian contribution; `jac` is row-major
    /// `2 N1 x 2 N2` indexed `[(2 i + c), (2 j + c')]` over the parametric
    /// directions `c`, `c'`.
    fn add_interp_grad_outer_product<
        const M1: usize,
        const M2: usize,
        const N1: usize,
        const N2: usize,
    >(
        pt: &[f64; 2],
        jac: &[f64],
        mat: &mut [f64],
    );

    /// Mixed gradient/value Jacobian contributions.
    ///
    /// `jac_gf` (`2 N1 x N2`) weights gradient test rows against value trial
    /// columns; `jac_fg` (`N1 x 2 N2`) the reverse. Either may be absent.
    fn add_interp_grad_mixed_outer_product<
        const M1: usize,
        const M2: usize,
        const N1: usize,
        const N2: usize,
    >(
        pt: &[f64; 2],
        jac_gf: Option<&[f64]>,
        jac_fg: Option<&[f64]>,
        mat: &mut [f64],
    );

    /// Symmetric-storage component (of `[g11 g12 g13 g22 g23 g33]`) that
    /// tying point `index` samples
    fn tying_field(index: usize) -> usize;

    /// Parametric location of tying point `index`
    fn tying_point(index: usize) -> [f64; 2];

    /// Interpolate the tying samples `ety` into symmetric storage at `pt`
    fn interp_tying_strain(pt: &[f64; 2], ety: &[f64]) -> Vec6;

    /// Transpose of [`Basis::interp_tying_strain`]
    fn add_interp_tying_strain_transpose(pt: &[f64; 2], dgty: &Vec6, dety: &mut [f64]);

    /// Push a symmetric-storage Hessian onto the tying-sample Hessian
    /// (`d2ety` is row-major `NUM_TYING_POINTS x NUM_TYING_POINTS`)
    fn add_interp_tying_strain_hessian(pt: &[f64; 2], d2gty: &Mat6, d2ety: &mut [f64]);
}

/// Bilinear four-node quadrilateral with a nine-point MITC tying layout
pub struct QuadLinearBasis;

const XI: [f64; 4] = [-1.0, 1.0, 1.0, -1.0];
const ETA: [f64; 4] = [-1.0, -1.0, 1.0, 1.0];

/// Tying point locations, ordered g11(2), g22(2), g12(1), g23(2), g13(2)
const TYING_PTS: [[f64; 2]; 9] = [
    [0.0, -1.0],
    [0.0, 1.0],
    [-1.0, 0.0],
    [1.0, 0.0],
    [0.0, 0.0],
    [-1.0, 0.0],
    [1.0, 0.0],
    [0.0, -1.0],
    [0.0, 1.0],
];

/// Symmetric-storage component sampled by each tying point
const TYING_COMP: [usize; 9] = [0, 0, 3, 3, 1, 4, 4, 2, 2];

impl QuadLinearBasis {
    fn shape_functions(pt: &[f64; 2]) -> ([f64; 4], [f64; 8]) {
        let mut n = [0.0; 4];
        let mut nxi = [0.0; 8];
        for a in 0..4 {
            n[a] = 0.25 * (1.0 + XI[a] * pt[0]) * (1.0 + ETA[a] * pt[1]);
            nxi[2 * a] = 0.25 * XI[a] * (1.0 + ETA[a] * pt[1]);
            nxi[2 * a + 1] = 0.25 * ETA[a] * (1.0 + XI[a] * pt[0]);
        }
        (n, nxi)
    }

    /// Interpolation weight of every tying sample at `pt`.
    ///
    /// Each field interpolates linearly between its own samples along the
    /// direction it varies in, which reproduces every sample exactly at its
    /// tying point.
    fn tying_weights(pt: &[f64; 2]) -> [f64; 9] {
        let up_xi = 0.5 * (1.0 + pt[0]);
        let lo_xi = 0.5 * (1.0 - pt[0]);
        let up_eta = 0.5 * (1.0 + pt[1]);
        let lo_eta = 0.5 * (1.0 - pt[1]);
        [
            lo_eta, up_eta, // g11 varies in eta
            lo_xi, up_xi, // g22 varies in xi
            1.0, // g12 constant
            lo_xi, up_xi, // g23 varies in xi
            lo_eta, up_eta, // g13 varies in eta
        ]
    }
}

impl Basis for QuadLinearBasis {
    const NUM_NODES: usize = 4;
    const NUM_TYING_FIELDS: usize = 5;
    const NUM_TYING_POINTS: usize = 9;

    fn node_point(n: usize) -> [f64; 2] {
        [XI[n], ETA[n]]
    }

    fn interp_fields<const M: usize, const N: usize>(pt: &[f64; 2], values: &[f64], out: &mut [f64]) {
        let (n, _) = Self::shape_functions(pt);
        for j in 0..N {
            out[j] = 0.0;
        }
        for a in 0..4 {
            for j in 0..N {
                out[j] += n[a] * values[M * a + j];
            }
        }
    }

    fn interp_fields_grad<const M: usize, const N: usize>(
        pt: &[f64; 2],
        values: &[f64],
        out: &mut [f64],
    ) {
        let (_, nxi) = Self::shape_functions(pt);
        for j in 0..2 * N {
            out[j] = 0.0;
        }
        for a in 0..4 {
            for j in 0..N {
                out[2 * j] += nxi[2 * a] * values[M * a + j];
                out[2 * j + 1] += nxi[2 * a + 1] * values[M * a + j];
            }
        }
    }

    fn add_interp_fields_transpose<const M: usize, const N: usize>(
        pt: &[f64; 2],
        din: &[f64],
        out: &mut [f64],
    ) {
        let (n, _) = Self::shape_functions(pt);
        for a in 0..4 {
            for j in 0..N {
                out[M * a + j] += n[a] * din[j];
            }
        }
    }

    fn add_interp_fields_grad_transpose<const M: usize, const N: usize>(
        pt: &[f64; 2],
        din: &[f64],
        out: &mut [f64],
    ) {
        let (_, nxi) = Self::shape_functions(pt);
        for a in 0..4 {
            for j in 0..N {
                out[M * a + j] += nxi[2 * a] * din[2 * j] + nxi[2 * a + 1] * din[2 * j + 1];
            }
        }
    }

    fn add_interp_outer_product<const M1: usize, const M2: usize, const N1: usize, const N2: usize>(
        pt: &[f64; 2],
        jac: &[f64],
        mat: &mut [f64],
    ) {
        let (n, _) = Self::shape_functions(pt);
        let row = M2 * Self::NUM_NODES;
        for a in 0..4 {
            for b in 0..4 {
                let scale = n[a] * n[b];
                for i in 0..N1 {
                    for j in 0..N2 {
                        mat[(M1 * a + i) * row + M2 * b + j] += scale * jac[N2 * i + j];
                    }
                }
            }
        }
    }

    fn add_interp_grad_outer_product<
        const M1: usize,
        const M2: usize,
        const N1: usize,
        const N2: usize,
    >(
        pt: &[f64; 2],
        jac: &[f64],
        mat: &mut [f64],
    ) {
        let (_, nxi) = Self::shape_functions(pt);
        let row = M2 * Self::NUM_NODES;
        for a in 0..4 {
            for b in 0..4 {
                for i in 0..N1 {
                    for j in 0..N2 {
                        let mut val = 0.0;
                        for c in 0..2 {
                            for cp in 0..2 {
                                val += nxi[2 * a + c]
                                    * nxi[2 * b + cp]
                                    * jac[(2 * i + c) * 2 * N2 + 2 * j + cp];
                            }
                        }
                        mat[(M1 * a + i) * row + M2 * b + j] += val;
                    }
                }
            }
        }
    }

    fn add_interp_grad_mixed_outer_product<
        const M1: usize,
        const M2: usize,
        const N1: usize,
        const N2: usize,
    >(
        pt: &[f64; 2],
        jac_gf: Option<&[f64]>,
        jac_fg: Option<&[f64]>,
        mat: &mut [f64],
    ) {
        let (n, nxi) = Self::shape_functions(pt);
        let row = M2 * Self::NUM_NODES;
        if let Some(gf) = jac_gf {
            for a in 0..4 {
                for b in 0..4 {
                    for i in 0..N1 {
                        for j in 0..N2 {
                            let mut val = 0.0;
                            for c in 0..2 {
                                val += nxi[2 * a + c] * n[b] * gf[(2 * i + c) * N2 + j];
                            }
                            mat[(M1 * a + i) * row + M2 * b + j] += val;
                        }
                    }
                }
            }
        }
        if let Some(fg) = jac_fg {
            for a in 0..4 {
                for b in 0..4 {
                    for i in 0..N1 {
                        for j in 0..N2 {
                            let mut val = 0.0;
                            for cp in 0..2 {
                                val += n[a] * nxi[2 * b + cp] * fg[i * 2 * N2 + 2 * j + cp];
                            }
                            mat[(M1 * a + i) * row + M2 * b + j] += val;
                        }
                    }
                }
            }
        }
    }

    fn tying_field(index: usize) -> usize {
        TYING_COMP[index]
    }

    fn tying_point(index: usize) -> [f64; 2] {
        TYING_PTS[index]
    }

    fn interp_tying_strain(pt: &[f64; 2], ety: &[f64]) -> Vec6 {
        let w = Self::tying_weights(pt);
        let mut gty = Vec6::zeros();
        for t in 0..9 {
            gty[TYING_COMP[t]] += w[t] * ety[t];
        }
        gty
    }

    fn add_interp_tying_strain_transpose(pt: &[f64; 2], dgty: &Vec6, dety: &mut [f64]) {
        let w = Self::tying_weights(pt);
        for t in 0..9 {
            dety[t] += w[t] * dgty[TYING_COMP[t]];
        }
    }

    fn add_interp_tying_strain_hessian(pt: &[f64; 2], d2gty: &Mat6, d2ety: &mut [f64]) {
        let w = Self::tying_weights(pt);
        for t in 0..9 {
            for tp in 0..9 {
                d2ety[t * 9 + tp] += w[t] * w[tp] * d2gty[(TYING_COMP[t], TYING_COMP[tp])];
            }
        }
    }
}
