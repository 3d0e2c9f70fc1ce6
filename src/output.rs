//! Structured visualization output records

use serde::{Deserialize, Serialize};

/// Selects which fields the element extracts per visualization node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRequest {
    pub coordinates: bool,
    pub displacements: bool,
    pub strains: bool,
    pub stresses: bool,
    pub extras: bool,
}

impl OutputRequest {
    pub fn all() -> Self {
        Self {
            coordinates: true,
            displacements: true,
            strains: true,
            stresses: true,
            extras: true,
        }
    }
}

/// Failure index and design fields reported alongside the solution
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ElementExtras {
    pub failure_index: f64,
    /// Thickness, density and modulus at the point
    pub design_fields: [f64; 3],
}

/// Output record of one visualization node; fields not selected by the
/// request stay `None`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeOutput {
    pub coordinates: Option<[f64; 3]>,
    /// First six generalized displacements (three translations, three
    /// rotation parameters, zero-padded when the director has fewer)
    pub displacements: Option<[f64; 6]>,
    pub strain: Option<[f64; 9]>,
    pub stress: Option<[f64; 9]>,
    pub extras: Option<ElementExtras>,
}

/// Scalar quantities an element can evaluate at a quadrature point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantityKind {
    Temperature,
    FailureIndex,
    StrainEnergyDensity,
}
