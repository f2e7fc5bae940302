use crate::misc::{Cancellation, FloatingPoint};

/// Options for intersecting two curves.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurveIntersectionOptions<T: FloatingPoint> {
    /// Tolerance for the adaptive tessellation of the curves.
    pub sample_tolerance: T,
    /// Maximum distance between two points to consider them as intersecting.
    /// Polyline candidates are searched within this distance,
    /// and refined intersections whose squared distance reaches its square are discarded.
    pub tolerance: T,
    /// Maximum number of iterations of the refinement solver.
    pub solver_max_iters: u64,
    /// Tolerance for the change of the cost to determine convergence.
    pub cost_tolerance: T,
    /// Tolerance for the norm of the gradient to determine convergence.
    pub gradient_tolerance: T,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancellation: Option<Cancellation>,
}

impl<T: FloatingPoint> Default for CurveIntersectionOptions<T> {
    fn default() -> Self {
        Self {
            sample_tolerance: T::constant(1e-4),
            tolerance: T::constant(1e-4),
            solver_max_iters: 100,
            cost_tolerance: T::constant(1e-16),
            gradient_tolerance: T::constant(1e-10),
            cancellation: None,
        }
    }
}

impl<T: FloatingPoint> CurveIntersectionOptions<T> {
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

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}
