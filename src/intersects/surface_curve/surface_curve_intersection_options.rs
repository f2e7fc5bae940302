use crate::{
    intersects::CurveIntersectionOptions,
    misc::{Cancellation, FloatingPoint},
};

/// Options for intersecting a surface with a curve.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceCurveIntersectionOptions<T: FloatingPoint> {
    /// Tolerance for the adaptive tessellation of the curve.
    pub sample_tolerance: T,
    /// Maximum distance between the curve & the surface to consider them as intersecting.
    pub tolerance: T,
    pub solver_max_iters: u64,
    pub cost_tolerance: T,
    pub gradient_tolerance: T,
    /// Number of divisions of the surface tessellation in the u direction.
    pub divs_u: usize,
    /// Number of divisions of the surface tessellation in the v direction.
    pub divs_v: usize,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancellation: Option<Cancellation>,
}

impl<T: FloatingPoint> Default for SurfaceCurveIntersectionOptions<T> {
    fn default() -> Self {
        let curve = CurveIntersectionOptions::<T>::default();
        Self {
            sample_tolerance: curve.sample_tolerance,
            tolerance: curve.tolerance,
            solver_max_iters: curve.solver_max_iters,
            cost_tolerance: curve.cost_tolerance,
            gradient_tolerance: curve.gradient_tolerance,
            divs_u: 32,
            divs_v: 32,
            cancellation: None,
        }
    }
}

impl<T: FloatingPoint> SurfaceCurveIntersectionOptions<T> {
    pub fn with_sample_tolerance(mut self, sample_tolerance: T) -> Self {
        self.sample_tolerance = sample_tolerance;
        self
    }

    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_solver_max_iters(mut self, solver_max_iters: u64) -> Self {
        self.solver_max_iters = solver_max_iters;
        self
    }

    pub fn with_cost_tolerance(mut self, cost_tolerance: T) -> Self {
        self.cost_tolerance = cost_tolerance;
        self
    }

    pub fn with_gradient_tolerance(mut self, gradient_tolerance: T) -> Self {
        self.gradient_tolerance = gradient_tolerance;
        self
    }

    pub fn with_divisions(mut self, divs_u: usize, divs_v: usize) -> Self {
        self.divs_u = divs_u;
        self.divs_v = divs_v;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

impl<T: FloatingPoint> From<CurveIntersectionOptions<T>> for SurfaceCurveIntersectionOptions<T> {
    fn from(options: CurveIntersectionOptions<T>) -> Self {
        Self {
            sample_tolerance: options.sample_tolerance,
            tolerance: options.tolerance,
            solver_max_iters: options.solver_max_iters,
            cost_tolerance: options.cost_tolerance,
            gradient_tolerance: options.gradient_tolerance,
            cancellation: options.cancellation,
            ..Default::default()
        }
    }
}
