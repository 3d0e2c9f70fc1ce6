//! Domain-level response quantities assembled from element point data

use serde::{Deserialize, Serialize};

use crate::output::QuantityKind;

/// Quadrature-point evaluation interface used by aggregated responses.
///
/// Object safe so that a response can walk a heterogeneous element list.
pub trait PointQuantities {
    fn num_quadrature_points(&self) -> usize;

    fn quadrature_point(&self, n: usize) -> ([f64; 2], f64);

    /// Length of the element's state vector
    fn num_variables(&self) -> usize;

    /// Area measure of the geometry at a parametric point
    fn jacobian_det(&self, pt: &[f64; 2], xpts: &[f64]) -> f64;

    /// Evaluate a scalar quantity at a point; `None` when the element does
    /// not provide it
    fn eval_point_quantity(
        &self,
        elem: usize,
        kind: QuantityKind,
        pt: &[f64; 2],
        xpts: &[f64],
        vars: &[f64],
    ) -> Option<f64>;

    /// Accumulate `alpha * dfdq * dq/du` into `dfdu`
    #[allow(clippy::too_many_arguments)]
    fn add_point_quantity_sv_sens(
        &self,
        elem: usize,
        kind: QuantityKind,
        alpha: f64,
        pt: &[f64; 2],
        xpts: &[f64],
        vars: &[f64],
        dfdq: f64,
        dfdu: &mut [f64],
    );

    /// Accumulate `alpha * dfdq * dq/dx` into `dfdx`
    #[allow(clippy::too_many_arguments)]
    fn add_point_quantity_dv_sens(
        &self,
        elem: usize,
        kind: QuantityKind,
        alpha: f64,
        pt: &[f64; 2],
        xpts: &[f64],
        vars: &[f64],
        dfdq: f64,
        dfdx: &mut [f64],
    );
}

/// Running contribution of a subset of elements to an averaged quantity.
///
/// Partials from disjoint element ranges merge exactly, so the reduction can
/// be sharded and combined in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    pub volume: f64,
    pub integral: f64,
}

impl Partial {
    pub fn merge(&mut self, other: &Partial) {
        self.volume += other.volume;
        self.integral += other.integral;
    }
}

/// Volume-weighted average temperature over a set of elements.
///
/// `value() = (sum_e sum_n w detJ T) / (sum_e sum_n w detJ)`, which weights
/// each element by its area instead of averaging per-element means.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageTemperature {
    acc: Partial,
}

impl AverageTemperature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate one element's quadrature sum
    pub fn add_element(
        &mut self,
        element: &dyn PointQuantities,
        elem: usize,
        xpts: &[f64],
        vars: &[f64],
    ) {
        self.acc.merge(&Self::element_partial(element, elem, xpts, vars));
    }

    /// One element's contribution, for sharded evaluation
    pub fn element_partial(
        element: &dyn PointQuantities,
        elem: usize,
        xpts: &[f64],
        vars: &[f64],
    ) -> Partial {
        let mut partial = Partial::default();
        for n in 0..element.num_quadrature_points() {
            let (pt, weight) = element.quadrature_point(n);
            let Some(temp) =
                element.eval_point_quantity(elem, QuantityKind::Temperature, &pt, xpts, vars)
            else {
                continue;
            };
            let det = weight * element.jacobian_det(&pt, xpts);
            partial.volume += det;
            partial.integral += det * temp;
        }
        partial
    }

    pub fn merge(&mut self, partial: &Partial) {
        self.acc.merge(partial);
    }

    pub fn partial(&self) -> Partial {
        self.acc
    }

    /// The averaged temperature; zero before any element was accumulated
    pub fn value(&self) -> f64 {
        if self.acc.volume != 0.0 {
            self.acc.integral / self.acc.volume
        } else {
            0.0
        }
    }

    /// State-variable gradient of `value()` for one element, using the
    /// already accumulated total volume
    pub fn add_element_sv_sens(
        &self,
        element: &dyn PointQuantities,
        elem: usize,
        alpha: f64,
        xpts: &[f64],
        vars: &[f64],
        dfdu: &mut [f64],
    ) {
        if self.acc.volume == 0.0 {
            log::warn!("average temperature gradient requested before accumulation");
            return;
        }
        for n in 0..element.num_quadrature_points() {
            let (pt, weight) = element.quadrature_point(n);
            let det = weight * element.jacobian_det(&pt, xpts);
            let dfdq = det / self.acc.volume;
            element.add_point_quantity_sv_sens(
                elem,
                QuantityKind::Temperature,
                alpha,
                &pt,
                xpts,
                vars,
                dfdq,
                dfdu,
            );
        }
    }

    /// Design-variable gradient hook; forwards to the element per point
    pub fn add_element_dv_sens(
        &self,
        element: &dyn PointQuantities,
        elem: usize,
        alpha: f64,
        xpts: &[f64],
        vars: &[f64],
        dfdx: &mut [f64],
    ) {
        if self.acc.volume == 0.0 {
            return;
        }
        for n in 0..element.num_quadrature_points() {
            let (pt, weight) = element.quadrature_point(n);
            let det = weight * element.jacobian_det(&pt, xpts);
            let dfdq = det / self.acc.volume;
            element.add_point_quantity_dv_sens(
                elem,
                QuantityKind::Temperature,
                alpha,
                &pt,
                xpts,
                vars,
                dfdq,
                dfdx,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_merge_is_additive() {
        let mut a = Partial {
            volume: 2.0,
            integral: 6.0,
        };
        let b = Partial {
            volume: 1.0,
            integral: 9.0,
        };
        a.merge(&b);
        assert_eq!(a.volume, 3.0);
        assert_eq!(a.integral, 15.0);

        let mut avg = AverageTemperature::new();
        avg.merge(&a);
        // Not the mean of per-partial means (3.0 and 9.0).
        assert_eq!(avg.value(), 5.0);
    }

    #[test]
    fn empty_average_is_zero() {
        assert_eq!(AverageTemperature::new().value(), 0.0);
    }
}
