use itertools::Itertools;
use nalgebra::Point3;

use crate::{
    bounding_box::MeshBoundingBoxTree,
    curve::NurbsCurve3D,
    intersects::{find_mesh_intersection_segments, Intersects, PolylineAssembler},
    misc::FloatingPoint,
    surface::NurbsSurface3D,
};

use super::{
    SurfaceSurfaceIntersectionOptions, SurfaceSurfaceIntersectionPoint, SurfaceSurfaceNewton,
};

/// One connected branch of the intersection between two surfaces.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceSurfaceIntersection<T: FloatingPoint> {
    /// curve interpolating the refined points
    curve: NurbsCurve3D<T>,
    /// refined points in the order of the branch
    points: Vec<SurfaceSurfaceIntersectionPoint<T>>,
}

impl<T: FloatingPoint> SurfaceSurfaceIntersection<T> {
    pub fn curve(&self) -> &NurbsCurve3D<T> {
        &self.curve
    }

    pub fn points(&self) -> &[SurfaceSurfaceIntersectionPoint<T>] {
        &self.points
    }

    /// The branch is closed when its first & last points coincide
    pub fn is_closed(&self, tolerance: T) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() > 2 => {
                (first.point - last.point).norm() < tolerance
            }
            _ => false,
        }
    }
}

impl<'a, T: FloatingPoint> Intersects<'a, &'a NurbsSurface3D<T>> for NurbsSurface3D<T> {
    type Output = anyhow::Result<Vec<SurfaceSurfaceIntersection<T>>>;
    type Option = Option<SurfaceSurfaceIntersectionOptions<T>>;

    /// Find the curves along which two surfaces intersect.
    /// Both surfaces are tessellated, the meshes are intersected & the resulting segments
    /// are connected into polylines, whose points are refined onto both surfaces
    /// before a curve is interpolated through each of them.
    /// # Failures
    /// - if the refinement meets locally parallel surfaces
    /// - if the query is cancelled
    /// # Example
    /// ```
    /// use nurbs_intersection::prelude::*;
    /// use nalgebra::Point4;
    /// use approx::assert_relative_eq;
    ///
    /// let patch = |points: [[f64; 3]; 4]| {
    ///     let p = |i: usize| Point4::new(points[i][0], points[i][1], points[i][2], 1.);
    ///     NurbsSurface3D::try_new(
    ///         1,
    ///         1,
    ///         vec![0., 0., 1., 1.],
    ///         vec![0., 0., 1., 1.],
    ///         vec![vec![p(0), p(1)], vec![p(2), p(3)]],
    ///     ).unwrap()
    /// };
    /// let floor = patch([[0., 0., 0.], [0., 1., 0.], [1., 0., 0.], [1., 1., 0.]]);
    /// let wall = patch([[0.3, -1., -1.], [0.3, -1., 1.], [0.3, 2., -1.], [0.3, 2., 1.]]);
    ///
    /// let options = SurfaceSurfaceIntersectionOptions::default().with_divisions(9, 9);
    /// let intersections = floor.find_intersection(&wall, Some(options)).unwrap();
    /// assert_eq!(intersections.len(), 1);
    /// let curve = intersections[0].curve();
    /// let (start, end) = curve.knots_domain();
    /// let mid = curve.point_at((start + end) * 0.5);
    /// assert_relative_eq!(mid.x, 0.3, epsilon = 1e-6);
    /// assert_relative_eq!(mid.z, 0., epsilon = 1e-6);
    /// ```
    fn find_intersection(
        &'a self,
        other: &'a NurbsSurface3D<T>,
        option: Self::Option,
    ) -> Self::Output {
        let options = option.unwrap_or_default();
        let tolerance = options.tolerance;
        let cancellation = options.cancellation.as_ref();

        let mesh_a = self.regular_tessellate(options.divs_u, options.divs_v);
        let mesh_b = other.regular_tessellate(options.divs_u, options.divs_v);
        let tree_a = MeshBoundingBoxTree::new(&mesh_a);
        let tree_b = MeshBoundingBoxTree::new(&mesh_b);

        let segments = find_mesh_intersection_segments(
            &mesh_a,
            &tree_a,
            &mesh_b,
            &tree_b,
            &options.mesh_options(),
        )?;
        let polylines = PolylineAssembler::new(segments, tolerance).assemble();

        let newton = SurfaceSurfaceNewton::new(self, other, tolerance, options.max_iters);

        let mut intersections = vec![];
        for polyline in polylines {
            let mut points = vec![];
            for seed in polyline {
                let refined = newton.refine(seed.uv_a, seed.uv_b, cancellation)?;
                if refined.distance > tolerance {
                    #[cfg(feature = "log")]
                    log::warn!(
                        "discarded surface intersection point at {:?}, {} left after {} iterations",
                        seed.point,
                        refined.distance,
                        options.max_iters
                    );
                    continue;
                }
                points.push(refined);
            }

            let points = points
                .into_iter()
                .dedup_by(|x, y| (x.point - y.point).norm() < tolerance)
                .collect_vec();

            if points.len() < 2 {
                #[cfg(feature = "log")]
                log::warn!(
                    "discarded surface intersection branch with {} refined points",
                    points.len()
                );
                continue;
            }

            let positions: Vec<Point3<T>> = points.iter().map(|p| p.point).collect();
            let degree = options.interpolation_degree.clamp(1, positions.len() - 1);
            let curve = NurbsCurve3D::try_interpolate(&positions, degree)?;
            intersections.push(SurfaceSurfaceIntersection { curve, points });
        }

        #[cfg(feature = "log")]
        log::debug!("surface intersection: {} branches", intersections.len());

        Ok(intersections)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Point4};

    use super::super::surface_surface_newton::tests::wall;
    use crate::{
        intersects::{Intersects, SurfaceSurfaceIntersectionOptions},
        misc::Cancellation,
        surface::{
            nurbs_surface::tests::{bump, plane_xy},
            NurbsSurface3D,
        },
    };

    /// Horizontal patch covering the footprint of the bump at height `z`
    fn floor(z: f64) -> NurbsSurface3D<f64> {
        NurbsSurface3D::try_new(
            1,
            1,
            vec![0., 0., 1., 1.],
            vec![0., 0., 1., 1.],
            vec![
                vec![Point4::new(-1.5, -1.5, z, 1.), Point4::new(-1.5, 1.5, z, 1.)],
                vec![Point4::new(1.5, -1.5, z, 1.), Point4::new(1.5, 1.5, z, 1.)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn plane_crosses_wall_along_a_line() {
        let a = plane_xy(0.);
        let b = wall(0.4);
        // 17 divisions keep the cut away from the grid lines of both tessellations
        let options = SurfaceSurfaceIntersectionOptions::default().with_divisions(17, 17);
        let tolerance = options.tolerance;
        let intersections = a.find_intersection(&b, Some(options)).unwrap();
        assert_eq!(intersections.len(), 1);

        let it = &intersections[0];
        assert!(!it.is_closed(tolerance));
        assert!(it.points().len() > 17);
        for p in it.points() {
            assert!(p.distance <= tolerance);
            assert_relative_eq!(p.point.x, 0.4, epsilon = 1e-6);
            assert_relative_eq!(p.point.z, 0., epsilon = 1e-6);
            assert_relative_eq!(p.uv_a.x, 0.4, epsilon = 1e-6);
        }

        // the branch spans the plane from one side to the other
        let ys: Vec<f64> = [it.points().first().unwrap(), it.points().last().unwrap()]
            .iter()
            .map(|p| p.point.y)
            .collect();
        assert_relative_eq!(ys[0].min(ys[1]), 0., epsilon = 1e-6);
        assert_relative_eq!(ys[0].max(ys[1]), 1., epsilon = 1e-6);

        let curve = it.curve();
        assert_eq!(curve.degree(), 3);
        let (start, end) = curve.knots_domain();
        for i in 0..=10 {
            let t = start + (end - start) * i as f64 / 10.;
            let p = curve.point_at(t);
            assert_relative_eq!(p.x, 0.4, epsilon = 1e-6);
            assert_relative_eq!(p.z, 0., epsilon = 1e-6);
        }
    }

    #[test]
    fn bump_cut_by_plane_is_a_closed_loop() {
        let a = bump();
        let b = floor(0.2);
        let tolerance = 1e-6;
        let options = SurfaceSurfaceIntersectionOptions::default()
            .with_tolerance(tolerance)
            .with_divisions(24, 24);
        let intersections = a.find_intersection(&b, Some(options)).unwrap();
        assert_eq!(intersections.len(), 1);

        let it = &intersections[0];
        assert!(it.is_closed(tolerance));
        for p in it.points() {
            assert_relative_eq!(p.point.z, 0.2, epsilon = 1e-6);
            assert_relative_eq!(p.point, a.point_at(p.uv_a.x, p.uv_a.y), epsilon = 1e-12);
            assert_relative_eq!(
                p.point,
                b.point_at(p.uv_b.x, p.uv_b.y),
                epsilon = tolerance
            );
        }
    }

    #[test]
    fn separated_surfaces() {
        let intersections = plane_xy(0.)
            .find_intersection(&plane_xy(1.), None)
            .unwrap();
        assert!(intersections.is_empty());
    }

    #[test]
    fn cancelled_query_fails() {
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let options = SurfaceSurfaceIntersectionOptions::default().with_cancellation(cancellation);
        let res = plane_xy(0.).find_intersection(&wall(0.4), Some(options));
        assert_eq!(res.unwrap_err().to_string(), "intersection cancelled");
    }

    #[test]
    fn interpolation_degree_is_capped_by_point_count() {
        // two triangles per surface leave four points on the branch
        let a = plane_xy(0.);
        let b = wall(0.4);
        let options = SurfaceSurfaceIntersectionOptions::default()
            .with_divisions(1, 1)
            .with_interpolation_degree(5);
        let intersections = a.find_intersection(&b, Some(options)).unwrap();
        assert_eq!(intersections.len(), 1);
        let it = &intersections[0];
        assert!(it.curve().degree() <= it.points().len() - 1);
        assert_relative_eq!(
            it.curve().point_at(0.),
            Point3::new(0.4, it.points()[0].point.y, 0.),
            epsilon = 1e-6
        );
    }
}
