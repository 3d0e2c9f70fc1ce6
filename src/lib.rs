//! Thermally coupled shear-deformable shell elements in native Rust
//!
//! This library evaluates the energies, residual and analytic Jacobian of a
//! mixed-interpolation shell element whose nodal state carries the three
//! displacements, a through-thickness averaged temperature and the rotation
//! parameters of a director field. The element is assembled from four
//! compile-time policies:
//! - a quadrature rule ([`quadrature::Quadrature`])
//! - an interpolation basis with tying points ([`basis::Basis`])
//! - a director parametrization ([`director::Director`])
//! - a strain model ([`strain::StrainModel`])
//!
//! plus two runtime collaborators, the constitutive law
//! ([`constitutive::Constitutive`]) and the local frame
//! ([`transform::Transform`]).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use fea_shell::prelude::*;
//!
//! let params = IsotropicShellParams::new(70e9, 0.3, 2700.0, 0.01);
//! let con = Arc::new(IsotropicShell::new(params).unwrap());
//! let element = LinearQuadThermalShell::new(con, Arc::new(NaturalFrame)).unwrap();
//!
//! // Unit square, flat, at rest.
//! let xpts = [
//!     0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
//! ];
//! let vars = [0.0; 28];
//! let dvars = [0.0; 28];
//! let (kinetic, potential) = element.compute_energies(0, 0.0, &xpts, &vars, &dvars);
//! assert_eq!((kinetic, potential), (0.0, 0.0));
//! ```

pub mod basis;
pub mod constitutive;
pub mod director;
pub mod element;
pub mod error;
pub mod kinematics;
pub mod math;
pub mod output;
pub mod quadrature;
pub mod response;
pub mod strain;
pub mod transform;

/// Largest node count any basis may declare
pub const MAX_NODES: usize = 9;
/// Largest tying point count any basis may declare
pub const MAX_TYING_POINTS: usize = 16;
/// Largest element state vector
pub const MAX_VARS: usize = 72;
/// Largest 3-component nodal field (directors, normals)
pub const MAX_DOF3: usize = 3 * MAX_NODES;

/// Four-node quad with linear director and linear strain, seven variables
/// per node
pub type LinearQuadThermalShell = element::ThermalShell<
    quadrature::GaussQuad2x2,
    basis::QuadLinearBasis,
    director::LinearizedRotation,
    strain::LinearShellStrain,
    7,
>;

// Re-export common types
pub mod prelude {
    pub use crate::basis::{Basis, QuadLinearBasis};
    pub use crate::constitutive::{
        Constitutive, IsotropicShell, IsotropicShellParams, TangentStiffness,
    };
    pub use crate::director::{Director, LinearizedRotation};
    pub use crate::element::{ThermalShell, OFFSET};
    pub use crate::error::{ShellError, ShellResult};
    pub use crate::output::{ElementExtras, NodeOutput, OutputRequest, QuantityKind};
    pub use crate::quadrature::{GaussQuad2x2, Quadrature};
    pub use crate::response::{AverageTemperature, Partial, PointQuantities};
    pub use crate::strain::{LinearShellStrain, StrainModel};
    pub use crate::transform::{NaturalFrame, RefAxisFrame, Transform};
    pub use crate::LinearQuadThermalShell;
}
