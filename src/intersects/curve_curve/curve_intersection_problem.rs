use argmin::core::{CostFunction, Gradient};
use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, Vector2, U1,
};

use crate::{curve::NurbsCurve, misc::FloatingPoint};

/// Gradient & CostFunction provider for refining the intersection of two curves.
/// The parameter is `(t_a, t_b)` and the cost the squared distance between the curves.
pub struct CurveIntersectionProblem<'a, T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// The first curve to find the intersection with.
    a: &'a NurbsCurve<T, D>,
    /// The second curve to find the intersection with.
    b: &'a NurbsCurve<T, D>,
}

impl<'a, T: FloatingPoint, D: DimName> CurveIntersectionProblem<'a, T, D>
where
    DefaultAllocator: Allocator<D>,
{
    pub fn new(a: &'a NurbsCurve<T, D>, b: &'a NurbsCurve<T, D>) -> Self {
        CurveIntersectionProblem { a, b }
    }
}

impl<T: FloatingPoint, D: DimName> Gradient for CurveIntersectionProblem<'_, T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = Vector2<T>;
    type Gradient = Vector2<T>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, anyhow::Error> {
        let da = self.a.rational_derivatives(param[0], 1);
        let db = self.b.rational_derivatives(param[1], 1);
        let r = &da[0] - &db[0];
        let two = T::constant(2.);
        Ok(Vector2::new(da[1].dot(&r) * two, -db[1].dot(&r) * two))
    }
}

impl<T: FloatingPoint, D: DimName> CostFunction for CurveIntersectionProblem<'_, T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = Vector2<T>;
    type Output = T;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        let p0 = self.a.point_at(param[0]);
        let p1 = self.b.point_at(param[1]);
        Ok((p0 - p1).norm_squared())
    }
}
