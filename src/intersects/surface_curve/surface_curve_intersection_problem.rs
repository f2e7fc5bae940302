use argmin::core::{CostFunction, Gradient};

use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, Vector3, U1,
};

use crate::{curve::NurbsCurve, misc::FloatingPoint, surface::NurbsSurface};

use super::{SurfaceCurveGradient, SurfaceCurveParam};

// Gradient & CostFunction provider for refining the intersection between surface & curve.
pub struct SurfaceCurveIntersectionProblem<'a, T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// The surface to find the intersection with.
    surface: &'a NurbsSurface<T, D>,
    /// The curve to find the intersection with.
    curve: &'a NurbsCurve<T, D>,
}

impl<'a, T: FloatingPoint, D: DimName> SurfaceCurveIntersectionProblem<'a, T, D>
where
    DefaultAllocator: Allocator<D>,
{
    pub fn new(surface: &'a NurbsSurface<T, D>, curve: &'a NurbsCurve<T, D>) -> Self {
        SurfaceCurveIntersectionProblem { surface, curve }
    }
}

impl<T: FloatingPoint, D: DimName> Gradient for SurfaceCurveIntersectionProblem<'_, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = SurfaceCurveParam<T>;
    type Gradient = SurfaceCurveGradient<T>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, anyhow::Error> {
        let dc = self.curve.rational_derivatives(param.x, 1);
        let ds = self.surface.rational_derivatives(param.y, param.z, 1);
        let r = &ds[0][0] - &dc[0];
        let drdu = &ds[1][0];
        let drdv = &ds[0][1];
        let drdt = -&dc[1];
        Ok(Vector3::new(drdt.dot(&r), drdu.dot(&r), drdv.dot(&r)) * T::constant(2.))
    }
}

impl<T: FloatingPoint, D: DimName> CostFunction for SurfaceCurveIntersectionProblem<'_, T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Param = SurfaceCurveParam<T>;
    type Output = T;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, anyhow::Error> {
        let p0 = self.surface.point_at(param.y, param.z);
        let p1 = self.curve.point_at(param.x);
        Ok((p0 - p1).norm_squared())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use argmin::core::{CostFunction, Gradient};
    use nalgebra::{Point3, Vector3};

    use super::SurfaceCurveIntersectionProblem;
    use crate::{curve::NurbsCurve3D, surface::nurbs_surface::tests::bump};

    #[test]
    fn gradient_matches_finite_difference() {
        let surface = bump();
        let curve =
            NurbsCurve3D::try_polyline(&[Point3::new(0.2, 0.1, -1.), Point3::new(0.7, 0.8, 2.)])
                .unwrap();
        let problem = SurfaceCurveIntersectionProblem::new(&surface, &curve);

        let x = Vector3::new(0.3, 0.4, 0.6);
        let g = problem.gradient(&x).unwrap();
        let h = 1e-6;
        for i in 0..3 {
            let mut xp = x;
            let mut xm = x;
            xp[i] += h;
            xm[i] -= h;
            let fd = (problem.cost(&xp).unwrap() - problem.cost(&xm).unwrap()) / (2. * h);
            assert_relative_eq!(g[i], fd, epsilon = 1e-5);
        }
    }
}
