pub mod intersection_surface_curve;
pub mod surface_curve_intersection_options;
pub mod surface_curve_intersection_problem;

use nalgebra::Vector3;
pub use surface_curve_intersection_options::*;
pub use surface_curve_intersection_problem::*;

/// `(t, u, v)`: the curve parameter followed by the surface uv
pub type SurfaceCurveParam<T> = Vector3<T>;
pub type SurfaceCurveGradient<T> = Vector3<T>;
