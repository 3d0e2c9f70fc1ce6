//! Quadrature rules on the biunit parametric domain

/// A fixed quadrature rule over the element's parametric domain.
///
/// Rules are zero-sized policy types; all methods are associated functions so
/// the element code monomorphizes completely.
pub trait Quadrature {
    const NUM_QUADRATURE_POINTS: usize;

    /// Location and weight of quadrature point `n`
    fn point(n: usize) -> ([f64; 2], f64);

    /// Number of element boundary faces
    const NUM_FACES: usize;

    /// Number of quadrature points on face `face`
    fn num_face_points(face: usize) -> usize;

    /// Location, in-surface tangent direction and weight of point `n` on
    /// face `face`
    fn face_point(face: usize, n: usize) -> ([f64; 2], [f64; 2], f64);
}

const GAUSS2: f64 = 0.577_350_269_189_625_8; // 1/sqrt(3)

/// 2x2 Gauss rule on the biunit quadrilateral
pub struct GaussQuad2x2;

impl Quadrature for GaussQuad2x2 {
    const NUM_QUADRATURE_POINTS: usize = 4;

    fn point(n: usize) -> ([f64; 2], f64) {
        let xi = if n % 2 == 0 { -GAUSS2 } else { GAUSS2 };
        let eta = if n / 2 == 0 { -GAUSS2 } else { GAUSS2 };
        ([xi, eta], 1.0)
    }

    const NUM_FACES: usize = 4;

    fn num_face_points(_face: usize) -> usize {
        2
    }

    fn face_point(face: usize, n: usize) -> ([f64; 2], [f64; 2], f64) {
        let s = if n == 0 { -GAUSS2 } else { GAUSS2 };
        // Faces ordered: xi = -1, xi = 1, eta = -1, eta = 1; tangents keep the
        // outward normal consistent with a counterclockwise node ordering.
        match face {
            0 => ([-1.0, s], [0.0, -1.0], 1.0),
            1 => ([1.0, s], [0.0, 1.0], 1.0),
            2 => ([s, -1.0], [1.0, 0.0], 1.0),
            _ => ([s, 1.0], [-1.0, 0.0], 1.0),
        }
    }
}
