use std::cmp::Ordering;

use argmin::core::ArgminFloat;
use itertools::Itertools;
use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, Vector2, U1,
};

use crate::{
    curve::NurbsCurve,
    intersects::{
        find_polyline_polyline_intersections, minimize, CurveCurveIntersection, HasIntersection,
        IntersectionBFGS, Intersects,
    },
    misc::{check_cancelled, unique_by, FloatingPoint},
    tessellation::Tessellation,
};

use super::{CurveIntersectionOptions, CurveIntersectionProblem};

impl<'a, T, D> Intersects<'a, &'a NurbsCurve<T, D>> for NurbsCurve<T, D>
where
    T: FloatingPoint + ArgminFloat,
    D: DimName + DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Output = anyhow::Result<Vec<CurveCurveIntersection<OPoint<T, DimNameDiff<D, U1>>, T>>>;
    type Option = Option<CurveIntersectionOptions<T>>;

    /// Find the intersection points with another curve.
    /// Both curves are tessellated, the polylines are intersected
    /// and every approximate intersection is refined onto the exact curves.
    /// Refined intersections whose squared distance reaches `tolerance^2` are discarded.
    /// # Example
    /// ```
    /// use nurbs_intersection::prelude::*;
    /// use nalgebra::Point2;
    /// use approx::assert_relative_eq;
    ///
    /// let a = NurbsCurve2D::try_polyline(&[Point2::new(-1., 0.), Point2::new(1., 0.)]).unwrap();
    /// let b = NurbsCurve2D::try_polyline(&[Point2::new(0.2, -1.), Point2::new(0.2, 1.)]).unwrap();
    ///
    /// let intersections = a.find_intersection(&b, None).unwrap();
    /// assert_eq!(intersections.len(), 1);
    /// let it = &intersections[0];
    /// assert_relative_eq!(it.a().0, Point2::new(0.2, 0.), epsilon = 1e-8);
    /// assert_relative_eq!(it.a().1, 0.6, epsilon = 1e-8);
    /// assert_relative_eq!(it.b().1, 0.5, epsilon = 1e-8);
    /// ```
    fn find_intersection(
        &'a self,
        other: &'a NurbsCurve<T, D>,
        option: Self::Option,
    ) -> Self::Output {
        let options = option.unwrap_or_default();
        let tolerance = options.tolerance;
        let cancellation = options.cancellation.as_ref();

        let pa = self.tessellate(Some(options.sample_tolerance))?;
        let pb = other.tessellate(Some(options.sample_tolerance))?;
        let candidates = find_polyline_polyline_intersections(&pa, &pb, tolerance, cancellation)?;

        #[cfg(feature = "log")]
        let found = candidates.len();

        let seeds = unique_by(candidates, |x, y| {
            (&x.a().0 - &y.a().0).norm() < tolerance
                && (&x.b().0 - &y.b().0).norm() < tolerance
                && num_traits::Float::abs(x.a().1 - y.a().1) < tolerance
                && num_traits::Float::abs(x.b().1 - y.b().1) < tolerance
        });

        #[cfg(feature = "log")]
        log::debug!(
            "curve intersection: {} candidates, {} seeds after deduplication",
            found,
            seeds.len()
        );

        let domain = [self.knots_domain(), other.knots_domain()];
        let threshold = tolerance * tolerance;

        let mut refined = vec![];
        for seed in seeds {
            check_cancelled(cancellation)?;

            let solver = IntersectionBFGS::new(domain)
                .with_tolerance_cost(options.cost_tolerance)?
                .with_tolerance_grad(options.gradient_tolerance)?;
            let problem = CurveIntersectionProblem::new(self, other);
            let init = Vector2::new(seed.a().1, seed.b().1);
            let (param, cost) = minimize(problem, solver, init, options.solver_max_iters)?;

            if cost >= threshold {
                #[cfg(feature = "log")]
                log::warn!(
                    "discarded curve intersection near {:?} with squared residual {:?}",
                    init,
                    cost
                );
                continue;
            }

            refined.push(CurveCurveIntersection::new(
                (self.point_at(param[0]), param[0]),
                (other.point_at(param[1]), param[1]),
            ));
        }

        // group refined results landing on the same point & keep the closest one of each group
        let intersections = refined
            .into_iter()
            .sorted_by(|x, y| x.a().1.partial_cmp(&y.a().1).unwrap_or(Ordering::Equal))
            .map(|it| vec![it])
            .coalesce(|x, y| {
                let x0 = &x[x.len() - 1];
                let y0 = &y[0];
                if (&x0.a().0 - &y0.a().0).norm() < tolerance
                    && (&x0.b().0 - &y0.b().0).norm() < tolerance
                {
                    Ok([x, y].concat())
                } else {
                    Err((x, y))
                }
            })
            .filter_map(|group| {
                group.into_iter().min_by(|x, y| {
                    x.squared_distance()
                        .partial_cmp(&y.squared_distance())
                        .unwrap_or(Ordering::Equal)
                })
            })
            .collect_vec();

        #[cfg(feature = "log")]
        log::debug!("curve intersection: {} refined", intersections.len());

        Ok(intersections)
    }
}
