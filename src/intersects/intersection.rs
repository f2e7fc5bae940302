use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint};

use crate::misc::FloatingPoint;

/// Access to both sides of an intersection record,
/// each side being a point paired with the parameter it was found at.
pub trait HasIntersection<VA, VB, A, B>: HasIntersectionParameter<A, B> {
    fn a(&self) -> &VA;
    fn b(&self) -> &VB;
}

/// Parameters of both sides of an intersection record.
pub trait HasIntersectionParameter<A, B> {
    fn a_parameter(&self) -> A;
    fn b_parameter(&self) -> B;
}

/// A struct representing the intersection of two objects.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Intersection<P, T0, T1> {
    /// The point & parameter of the first object at the intersection.
    a: (P, T0),
    /// The point & parameter of the second object at the intersection.
    b: (P, T1),
}

impl<P, T0, T1> Intersection<P, T0, T1> {
    pub fn new(a: (P, T0), b: (P, T1)) -> Self {
        Self { a, b }
    }

    pub fn as_tuple(self) -> ((P, T0), (P, T1)) {
        (self.a, self.b)
    }
}

impl<T: FloatingPoint, D: DimName, T0, T1> Intersection<OPoint<T, D>, T0, T1>
where
    DefaultAllocator: Allocator<D>,
{
    /// Squared distance between the two points,
    /// the residual left by a refined intersection.
    pub fn squared_distance(&self) -> T {
        (&self.a.0 - &self.b.0).norm_squared()
    }
}

impl<P, T0: Clone + Copy, T1: Clone + Copy> HasIntersectionParameter<T0, T1>
    for Intersection<P, T0, T1>
{
    fn a_parameter(&self) -> T0 {
        self.a.1
    }

    fn b_parameter(&self) -> T1 {
        self.b.1
    }
}

impl<P, T0: Clone + Copy, T1: Clone + Copy> HasIntersection<(P, T0), (P, T1), T0, T1>
    for Intersection<P, T0, T1>
{
    fn a(&self) -> &(P, T0) {
        &self.a
    }

    fn b(&self) -> &(P, T1) {
        &self.b
    }
}

/// A struct representing the intersection of two curves.
pub type CurveCurveIntersection<P, T> = Intersection<P, T, T>;

/// A struct representing the intersection of surface & curve.
/// The first entry carries the surface uv, the second the curve parameter.
pub type SurfaceCurveIntersection<P, T> = Intersection<P, (T, T), T>;
