pub mod intersection_surface_surface;
pub mod surface_surface_intersection_options;
pub mod surface_surface_newton;

pub use intersection_surface_surface::*;
pub use surface_surface_intersection_options::*;
pub use surface_surface_newton::*;
