use argmin::core::ArgminFloat;
use nalgebra::{Point3, Vector3};

use crate::{
    curve::NurbsCurve3D,
    intersects::{
        find_polyline_mesh_intersections, minimize, HasIntersection, IntersectionBFGS,
        Intersects, SurfaceCurveIntersection,
    },
    misc::{check_cancelled, unique_by, FloatingPoint},
    surface::NurbsSurface3D,
    tessellation::Tessellation,
};

use super::{SurfaceCurveIntersectionOptions, SurfaceCurveIntersectionProblem};

impl<'a, T> Intersects<'a, &'a NurbsCurve3D<T>> for NurbsSurface3D<T>
where
    T: FloatingPoint + ArgminFloat,
{
    type Output = anyhow::Result<Vec<SurfaceCurveIntersection<Point3<T>, T>>>;
    type Option = Option<SurfaceCurveIntersectionOptions<T>>;

    /// Find the intersection points between the surface & a curve.
    /// The curve is tessellated adaptively and the surface regularly,
    /// the polyline is intersected with the mesh, and every approximate
    /// intersection is refined onto the exact surface & curve.
    /// Each result carries the surface point with its uv, then the curve point with its parameter.
    /// # Example
    /// ```
    /// use nurbs_intersection::prelude::*;
    /// use nalgebra::{Point3, Point4};
    /// use approx::assert_relative_eq;
    ///
    /// let plane = NurbsSurface3D::try_new(
    ///     1,
    ///     1,
    ///     vec![0., 0., 1., 1.],
    ///     vec![0., 0., 1., 1.],
    ///     vec![
    ///         vec![Point4::new(0., 0., 0., 1.), Point4::new(0., 1., 0., 1.)],
    ///         vec![Point4::new(1., 0., 0., 1.), Point4::new(1., 1., 0., 1.)],
    ///     ],
    /// ).unwrap();
    /// let line = NurbsCurve3D::try_polyline(&[
    ///     Point3::new(0.3, 0.6, -1.),
    ///     Point3::new(0.3, 0.6, 1.),
    /// ]).unwrap();
    ///
    /// let intersections = plane.find_intersection(&line, None).unwrap();
    /// assert_eq!(intersections.len(), 1);
    /// let (uv, t) = (intersections[0].a_parameter(), intersections[0].b_parameter());
    /// assert_relative_eq!(uv.0, 0.3, epsilon = 1e-6);
    /// assert_relative_eq!(uv.1, 0.6, epsilon = 1e-6);
    /// assert_relative_eq!(t, 0.5, epsilon = 1e-6);
    /// ```
    fn find_intersection(
        &'a self,
        other: &'a NurbsCurve3D<T>,
        option: Self::Option,
    ) -> Self::Output {
        let options = option.unwrap_or_default();
        let tolerance = options.tolerance;
        let cancellation = options.cancellation.as_ref();

        let polyline = other.tessellate(Some(options.sample_tolerance))?;
        let mesh = self.regular_tessellate(options.divs_u, options.divs_v);
        let faces = (0..mesh.faces().len()).collect();
        let candidates =
            find_polyline_mesh_intersections(&polyline, &mesh, faces, tolerance, cancellation)?;

        #[cfg(feature = "log")]
        let found = candidates.len();

        let seeds = unique_by(candidates, |x, y| {
            (x.point - y.point).norm() < tolerance
                && num_traits::Float::abs(x.p - y.p) < tolerance
                && (x.uv - y.uv).norm() < tolerance
        });

        #[cfg(feature = "log")]
        log::debug!(
            "surface curve intersection: {} candidates, {} seeds after deduplication",
            found,
            seeds.len()
        );

        let (u_domain, v_domain) = self.knots_domain();
        let domain = [other.knots_domain(), u_domain, v_domain];
        let threshold = tolerance * tolerance;

        let mut intersections = vec![];
        for seed in seeds {
            check_cancelled(cancellation)?;

            let solver = IntersectionBFGS::new(domain)
                .with_tolerance_cost(options.cost_tolerance)?
                .with_tolerance_grad(options.gradient_tolerance)?;
            let problem = SurfaceCurveIntersectionProblem::new(self, other);
            let init = Vector3::new(seed.p, seed.uv.x, seed.uv.y);
            let (param, cost) = minimize(problem, solver, init, options.solver_max_iters)?;

            if cost >= threshold {
                #[cfg(feature = "log")]
                log::warn!(
                    "discarded surface curve intersection at face {} with squared residual {:?}",
                    seed.face,
                    cost
                );
                continue;
            }

            let (t, u, v) = (param.x, param.y, param.z);
            intersections.push(SurfaceCurveIntersection::new(
                (self.point_at(u, v), (u, v)),
                (other.point_at(t), t),
            ));
        }

        // seeds on both sides of a shared mesh edge may converge onto the same point
        let intersections = unique_by(intersections, |x, y| {
            let (pa, (ua, va)) = x.a();
            let (pb, (ub, vb)) = y.a();
            (pa - pb).norm() < tolerance
                && num_traits::Float::abs(x.b().1 - y.b().1) < tolerance
                && num_traits::Float::abs(*ua - *ub) < tolerance
                && num_traits::Float::abs(*va - *vb) < tolerance
        });

        #[cfg(feature = "log")]
        log::debug!("surface curve intersection: {} refined", intersections.len());

        Ok(intersections)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    use crate::{
        curve::NurbsCurve3D,
        intersects::{
            HasIntersection, HasIntersectionParameter, Intersects, SurfaceCurveIntersectionOptions,
        },
        misc::Cancellation,
        surface::nurbs_surface::tests::{bump, plane_xy},
    };

    fn vertical(x: f64, y: f64) -> NurbsCurve3D<f64> {
        NurbsCurve3D::try_polyline(&[Point3::new(x, y, -1.), Point3::new(x, y, 2.)]).unwrap()
    }

    #[test]
    fn line_through_tessellation_vertex() {
        // (0, 0) is the center of the bump & a vertex of the tessellation, shared by six faces
        let surface = bump();
        let options = SurfaceCurveIntersectionOptions::default().with_divisions(8, 8);
        let tolerance = options.tolerance;
        let intersections = surface
            .find_intersection(&vertical(0., 0.), Some(options))
            .unwrap();
        assert_eq!(intersections.len(), 1);

        let it = &intersections[0];
        assert!(it.squared_distance() < tolerance * tolerance);
        assert_relative_eq!(it.a().0, Point3::new(0., 0., 0.4), epsilon = 1e-6);
        let (u, v) = it.a_parameter();
        assert_relative_eq!(u, 0.5, epsilon = 1e-6);
        assert_relative_eq!(v, 0.5, epsilon = 1e-6);
        assert_relative_eq!(it.b_parameter(), 1.4 / 3., epsilon = 1e-6);
    }

    #[test]
    fn horizontal_line_crosses_bump_twice() {
        let surface = bump();
        let line =
            NurbsCurve3D::try_polyline(&[Point3::new(-2., 0.1, 0.2), Point3::new(2., 0.1, 0.2)])
                .unwrap();
        let intersections = surface.find_intersection(&line, None).unwrap();
        assert_eq!(intersections.len(), 2);
        for it in &intersections {
            let (u, v) = it.a_parameter();
            assert_relative_eq!(it.a().0, surface.point_at(u, v), epsilon = 1e-12);
            assert_relative_eq!(it.a().0.z, 0.2, epsilon = 1e-6);
            assert_relative_eq!(it.b().0.y, 0.1, epsilon = 1e-12);
        }
        let mut xs: Vec<f64> = intersections.iter().map(|it| it.b().0.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_relative_eq!(xs[0], -xs[1], epsilon = 1e-6);
    }

    #[test]
    fn curve_above_surface() {
        let line = NurbsCurve3D::try_polyline(&[Point3::new(0., 0., 1.), Point3::new(1., 1., 1.)])
            .unwrap();
        let intersections = plane_xy(0.).find_intersection(&line, None).unwrap();
        assert!(intersections.is_empty());
    }

    #[test]
    fn cancelled_query_fails() {
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let options = SurfaceCurveIntersectionOptions::default().with_cancellation(cancellation);
        let res = plane_xy(0.).find_intersection(&vertical(0.5, 0.5), Some(options));
        assert_eq!(res.unwrap_err().to_string(), "intersection cancelled");
    }
}
