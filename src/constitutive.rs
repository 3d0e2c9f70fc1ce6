//! Pointwise material response for shell sections

use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

use crate::error::{ShellError, ShellResult};
use crate::math::{Mat3, Vec3};

/// Scales the in-plane shear stiffness into a penalty on the drilling strain
pub const DRILLING_REGULARIZATION: f64 = 10.0;

/// Plane-stress shell stiffness blocks at a point.
///
/// The generalized stress of a 9-component shell strain
/// `[membrane(3), bending(3), shear(2), drill(1)]` is
/// `N = A em + B ek`, `M = B em + D ek`, `Q = As g`, `drill * et`.
#[derive(Debug, Clone)]
pub struct TangentStiffness {
    pub a: Mat3,
    pub b: Mat3,
    pub d: Mat3,
    pub a_s: Matrix2<f64>,
    pub drill: f64,
}

impl TangentStiffness {
    /// Generalized stress of a 9-component shell strain
    pub fn stress(&self, e: &[f64; 9]) -> [f64; 9] {
        let em = Vec3::new(e[0], e[1], e[2]);
        let ek = Vec3::new(e[3], e[4], e[5]);
        let n = self.a * em + self.b * ek;
        let m = self.b * em + self.d * ek;
        let q0 = self.a_s[(0, 0)] * e[6] + self.a_s[(0, 1)] * e[7];
        let q1 = self.a_s[(1, 0)] * e[6] + self.a_s[(1, 1)] * e[7];
        [
            n[0],
            n[1],
            n[2],
            m[0],
            m[1],
            m[2],
            q0,
            q1,
            self.drill * e[8],
        ]
    }
}

/// Pointwise material response consumed by the element.
///
/// Implementations are deterministic and side-effect free; the element holds
/// them behind `Arc<dyn Constitutive>` and calls them from the quadrature
/// loop.
pub trait Constitutive: Send + Sync {
    /// Generalized stress of a 9-component shell strain
    fn stress(&self, elem: usize, pt: &[f64; 2], x: &Vec3, strain: &[f64; 9]) -> [f64; 9];

    /// Stiffness blocks; `TangentStiffness::stress` must reproduce
    /// [`Constitutive::stress`]
    fn tangent_stiffness(&self, elem: usize, pt: &[f64; 2], x: &Vec3) -> TangentStiffness;

    /// Area density, first moment and rotational inertia per unit area
    fn mass_moments(&self, elem: usize, pt: &[f64; 2], x: &Vec3) -> [f64; 3];

    /// Strain produced by a stress-free temperature change
    fn thermal_strain(&self, elem: usize, pt: &[f64; 2], x: &Vec3, temperature: f64) -> [f64; 9];

    /// In-surface heat flux of a local temperature gradient
    fn heat_flux(&self, elem: usize, pt: &[f64; 2], x: &Vec3, tgrad: &[f64; 2]) -> [f64; 2];

    /// Symmetric tangent of [`Constitutive::heat_flux`]
    fn tangent_heat_flux(&self, elem: usize, pt: &[f64; 2], x: &Vec3) -> Matrix2<f64>;

    /// Failure index of a strain state (0 when no criterion is configured)
    fn failure(&self, elem: usize, pt: &[f64; 2], x: &Vec3, strain: &[f64; 9]) -> f64;

    /// Design field for visualization: 0 thickness, 1 density, 2 modulus
    fn design_field_value(&self, elem: usize, pt: &[f64; 2], x: &Vec3, index: usize) -> f64;
}

/// Section parameters of a homogeneous isotropic shell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsotropicShellParams {
    /// Elastic modulus
    pub e: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Density
    pub rho: f64,
    /// Shell thickness
    pub thickness: f64,
    /// Shear correction factor
    pub kcorr: f64,
    /// Coefficient of thermal expansion
    pub cte: f64,
    /// Thermal conductivity
    pub conductivity: f64,
    /// Stress-free reference temperature
    pub t_ref: f64,
    /// Yield stress for the von Mises failure index
    pub yield_stress: Option<f64>,
}

impl IsotropicShellParams {
    pub fn new(e: f64, nu: f64, rho: f64, thickness: f64) -> Self {
        Self {
            e,
            nu,
            rho,
            thickness,
            kcorr: 5.0 / 6.0,
            cte: 0.0,
            conductivity: 0.0,
            t_ref: 0.0,
            yield_stress: None,
        }
    }

    pub fn with_thermal(mut self, cte: f64, conductivity: f64, t_ref: f64) -> Self {
        self.cte = cte;
        self.conductivity = conductivity;
        self.t_ref = t_ref;
        self
    }

    pub fn with_yield_stress(mut self, ys: f64) -> Self {
        self.yield_stress = Some(ys);
        self
    }
}

/// First-order shear deformation response of a homogeneous isotropic shell
#[derive(Debug, Clone)]
pub struct IsotropicShell {
    params: IsotropicShellParams,
    /// Plane-stress modulus matrix
    q: Mat3,
}

impl IsotropicShell {
    pub fn new(params: IsotropicShellParams) -> ShellResult<Self> {
        if !(params.e > 0.0) {
            return Err(ShellError::InvalidInput(format!(
                "elastic modulus must be positive, got {}",
                params.e
            )));
        }
        if !(params.nu > -1.0 && params.nu < 0.5) {
            return Err(ShellError::InvalidInput(format!(
                "Poisson's ratio must lie in (-1, 0.5), got {}",
                params.nu
            )));
        }
        if !(params.thickness > 0.0) {
            return Err(ShellError::InvalidInput(format!(
                "thickness must be positive, got {}",
                params.thickness
            )));
        }

        let c = params.e / (1.0 - params.nu * params.nu);
        let q = Mat3::new(
            c,
            c * params.nu,
            0.0,
            c * params.nu,
            c,
            0.0,
            0.0,
            0.0,
            0.5 * c * (1.0 - params.nu),
        );

        log::debug!(
            "isotropic shell section: E = {:.3e}, nu = {}, t = {}",
            params.e,
            params.nu,
            params.thickness
        );
        Ok(Self { params, q })
    }

    pub fn params(&self) -> &IsotropicShellParams {
        &self.params
    }

    fn von_mises(s: &Vec3) -> f64 {
        (s[0] * s[0] - s[0] * s[1] + s[1] * s[1] + 3.0 * s[2] * s[2]).sqrt()
    }
}

impl Constitutive for IsotropicShell {
    fn stress(&self, elem: usize, pt: &[f64; 2], x: &Vec3, strain: &[f64; 9]) -> [f64; 9] {
        self.tangent_stiffness(elem, pt, x).stress(strain)
    }

    fn tangent_stiffness(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3) -> TangentStiffness {
        let t = self.params.thickness;
        let a = t * self.q;
        let d = (t * t * t / 12.0) * self.q;
        let gs = self.params.kcorr * 0.5 * self.params.e / (1.0 + self.params.nu) * t;
        let a_s = Matrix2::new(gs, 0.0, 0.0, gs);
        let drill = DRILLING_REGULARIZATION * 0.5 * (a_s[(0, 0)] + a_s[(1, 1)]);
        TangentStiffness {
            a,
            b: Mat3::zeros(),
            d,
            a_s,
            drill,
        }
    }

    fn mass_moments(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3) -> [f64; 3] {
        let t = self.params.thickness;
        let rho = self.params.rho;
        [rho * t, 0.0, rho * t * t * t / 12.0]
    }

    fn thermal_strain(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, temperature: f64) -> [f64; 9] {
        let mut eth = [0.0; 9];
        let dt = temperature - self.params.t_ref;
        eth[0] = self.params.cte * dt;
        eth[1] = self.params.cte * dt;
        eth
    }

    fn heat_flux(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, tgrad: &[f64; 2]) -> [f64; 2] {
        let c = self.params.conductivity * self.params.thickness;
        [c * tgrad[0], c * tgrad[1]]
    }

    fn tangent_heat_flux(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3) -> Matrix2<f64> {
        let c = self.params.conductivity * self.params.thickness;
        Matrix2::new(c, 0.0, 0.0, c)
    }

    fn failure(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, strain: &[f64; 9]) -> f64 {
        let ys = match self.params.yield_stress {
            Some(ys) => ys,
            None => return 0.0,
        };
        let ht = 0.5 * self.params.thickness;
        let em = Vec3::new(strain[0], strain[1], strain[2]);
        let ek = Vec3::new(strain[3], strain[4], strain[5]);

        // Evaluate the plane-stress criterion at the two face fibers.
        let top = self.q * (em + ht * ek);
        let bot = self.q * (em - ht * ek);
        (Self::von_mises(&top) / ys).max(Self::von_mises(&bot) / ys)
    }

    fn design_field_value(&self, _elem: usize, _pt: &[f64; 2], _x: &Vec3, index: usize) -> f64 {
        match index {
            0 => self.params.thickness,
            1 => self.params.rho,
            2 => self.params.e,
            _ => 0.0,
        }
    }
}
