pub mod curve_curve;
pub mod intersection;
pub mod intersection_bfgs;
pub mod mesh_mesh;
pub mod polyline_assembler;
pub mod polyline_mesh;
pub mod polyline_polyline;
pub mod segment_segment;
pub mod surface_curve;
pub mod surface_surface;
pub mod triangle_triangle;

pub use curve_curve::*;
pub use intersection::*;
pub use intersection_bfgs::*;
pub use mesh_mesh::*;
pub use polyline_assembler::*;
pub use polyline_mesh::*;
pub use polyline_polyline::*;
pub use segment_segment::*;
pub use surface_curve::*;
pub use surface_surface::*;
pub use triangle_triangle::*;

/// Intersection between two objects trait
pub trait Intersects<'a, T> {
    type Output;
    type Option;

    fn find_intersection(&'a self, other: T, option: Self::Option) -> Self::Output;
}
