pub mod curve_intersection_options;
pub mod curve_intersection_problem;
pub mod intersection_curve_curve;

pub use curve_intersection_options::*;
pub use curve_intersection_problem::*;
