#![allow(clippy::needless_range_loop)]

mod bounding_box;
mod curve;
mod intersects;
mod knot;
mod mesh;
mod misc;
mod polyline;
mod surface;
mod tessellation;

pub mod prelude {
    pub use crate::bounding_box::*;
    pub use crate::curve::*;
    pub use crate::intersects::*;
    pub use crate::knot::*;
    pub use crate::mesh::*;
    pub use crate::misc::*;
    pub use crate::polyline::*;
    pub use crate::surface::*;
    pub use crate::tessellation::*;
}
