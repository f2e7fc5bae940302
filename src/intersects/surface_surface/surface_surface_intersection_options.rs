use crate::{
    intersects::MeshIntersectionOptions,
    misc::{Cancellation, FloatingPoint},
};

/// Options for intersecting two surfaces.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceSurfaceIntersectionOptions<T: FloatingPoint> {
    /// Distance used to intersect the tessellations
    /// and under which a refined point is considered to lie on both surfaces.
    pub tolerance: T,
    /// Number of divisions of each tessellation in the u direction.
    pub divs_u: usize,
    /// Number of divisions of each tessellation in the v direction.
    pub divs_v: usize,
    /// Maximum number of newton iterations per refined point.
    pub max_iters: usize,
    /// Degree of the curves fitted through the refined points.
    pub interpolation_degree: usize,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancellation: Option<Cancellation>,
}

impl<T: FloatingPoint> Default for SurfaceSurfaceIntersectionOptions<T> {
    fn default() -> Self {
        Self {
            tolerance: T::constant(1e-4),
            divs_u: 32,
            divs_v: 32,
            max_iters: 32,
            interpolation_degree: 3,
            cancellation: None,
        }
    }
}

impl<T: FloatingPoint> SurfaceSurfaceIntersectionOptions<T> {
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_divisions(mut self, divs_u: usize, divs_v: usize) -> Self {
        self.divs_u = divs_u;
        self.divs_v = divs_v;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_interpolation_degree(mut self, interpolation_degree: usize) -> Self {
        self.interpolation_degree = interpolation_degree;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Options for intersecting the tessellations of the two surfaces
    pub fn mesh_options(&self) -> MeshIntersectionOptions<T> {
        MeshIntersectionOptions {
            tolerance: self.tolerance,
            cancellation: self.cancellation.clone(),
        }
    }
}
