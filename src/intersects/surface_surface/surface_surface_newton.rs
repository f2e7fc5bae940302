use nalgebra::{Point3, Vector2, Vector3};

use crate::{
    misc::{check_cancelled, three_planes, Cancellation, FloatingPoint, Plane},
    surface::{NurbsSurface3D, SurfaceFrame},
};

/// A point refined onto both surfaces of an intersection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceSurfaceIntersectionPoint<T: FloatingPoint> {
    /// uv on the first surface
    pub uv_a: Vector2<T>,
    /// uv on the second surface
    pub uv_b: Vector2<T>,
    /// point on the first surface
    pub point: Point3<T>,
    /// distance between the points evaluated on both surfaces
    pub distance: T,
}

/// Newton's method moving a pair of uvs onto the intersection of two surfaces.
///
/// Each step intersects the tangent planes of both surfaces with the plane through the
/// current point of the first surface perpendicular to both of them, then projects
/// the displacement to that target onto each tangent basis to get the uv increments.
#[derive(Clone, Debug)]
pub struct SurfaceSurfaceNewton<'a, T: FloatingPoint> {
    a: &'a NurbsSurface3D<T>,
    b: &'a NurbsSurface3D<T>,
    tolerance: T,
    max_iters: usize,
}

impl<'a, T: FloatingPoint> SurfaceSurfaceNewton<'a, T> {
    pub fn new(
        a: &'a NurbsSurface3D<T>,
        b: &'a NurbsSurface3D<T>,
        tolerance: T,
        max_iters: usize,
    ) -> Self {
        Self {
            a,
            b,
            tolerance,
            max_iters,
        }
    }

    /// Refine the uvs until the surfaces are closer than the tolerance at them,
    /// or the iteration bound is reached.
    /// The result reports the distance left, which the caller may compare to the tolerance.
    /// # Failures
    /// - if a surface has no normal at the current uv, or the tangent planes are parallel
    /// - if the cancellation flag is raised
    pub fn refine(
        &self,
        uv_a: Vector2<T>,
        uv_b: Vector2<T>,
        cancellation: Option<&Cancellation>,
    ) -> anyhow::Result<SurfaceSurfaceIntersectionPoint<T>> {
        let (mut uv_a, mut uv_b) = (clamp(self.a, uv_a), clamp(self.b, uv_b));

        let mut iteration = 0;
        loop {
            check_cancelled(cancellation)?;

            let fa = self.a.frame_at(uv_a.x, uv_a.y);
            let fb = self.b.frame_at(uv_b.x, uv_b.y);
            let distance = (fa.point - fb.point).norm();

            if distance < self.tolerance || iteration >= self.max_iters {
                return Ok(SurfaceSurfaceIntersectionPoint {
                    uv_a,
                    uv_b,
                    point: fa.point,
                    distance,
                });
            }

            let (da, db) = step(&fa, &fb).ok_or_else(|| {
                anyhow::anyhow!("refinement failed: degenerate local geometry")
            })?;
            uv_a = clamp(self.a, uv_a + da);
            uv_b = clamp(self.b, uv_b + db);
            iteration += 1;
        }
    }
}

/// uv increments on both surfaces toward the common point of the three planes
fn step<T: FloatingPoint>(
    fa: &SurfaceFrame<T>,
    fb: &SurfaceFrame<T>,
) -> Option<(Vector2<T>, Vector2<T>)> {
    let na = fa.normal?;
    let nb = fb.normal?;
    let nf = na.cross(&nb).try_normalize(T::zero())?;

    let pa = Plane::new_with_point(&fa.point, na);
    let pb = Plane::new_with_point(&fb.point, nb);
    let pf = Plane::new_with_point(&fa.point, nf);
    let x = three_planes(&pa, &pb, &pf)?;

    let da = tangent_increment(fa, &na, &(x - fa.point));
    let db = tangent_increment(fb, &nb, &(x - fb.point));
    Some((da, db))
}

/// Decompose a displacement in the tangent plane along `du` & `dv`
fn tangent_increment<T: FloatingPoint>(
    frame: &SurfaceFrame<T>,
    normal: &Vector3<T>,
    displacement: &Vector3<T>,
) -> Vector2<T> {
    let ru = frame.du.cross(normal);
    let rv = frame.dv.cross(normal);
    Vector2::new(
        rv.dot(displacement) / rv.dot(&frame.du),
        ru.dot(displacement) / ru.dot(&frame.dv),
    )
}

fn clamp<T: FloatingPoint>(surface: &NurbsSurface3D<T>, uv: Vector2<T>) -> Vector2<T> {
    Vector2::new(
        surface.u_knots().clamp(surface.u_degree(), uv.x),
        surface.v_knots().clamp(surface.v_degree(), uv.y),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Point4, Vector2};

    use super::SurfaceSurfaceNewton;
    use crate::{
        misc::Cancellation,
        surface::{
            nurbs_surface::tests::{bump, plane_xy},
            NurbsSurface3D,
        },
    };

    /// Vertical patch in the plane `x = x0`, spanning y in [-1, 2] and z in [-1, 1]
    pub(crate) fn wall(x0: f64) -> NurbsSurface3D<f64> {
        NurbsSurface3D::try_new(
            1,
            1,
            vec![0., 0., 1., 1.],
            vec![0., 0., 1., 1.],
            vec![
                vec![Point4::new(x0, -1., -1., 1.), Point4::new(x0, -1., 1., 1.)],
                vec![Point4::new(x0, 2., -1., 1.), Point4::new(x0, 2., 1., 1.)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn converges_onto_crossing_planes() {
        let a = plane_xy(0.);
        let b = wall(0.4);
        let newton = SurfaceSurfaceNewton::new(&a, &b, 1e-10, 32);
        let refined = newton
            .refine(Vector2::new(0.45, 0.5), Vector2::new(0.55, 0.52), None)
            .unwrap();
        assert!(refined.distance < 1e-10);
        assert_relative_eq!(refined.point.x, 0.4, epsilon = 1e-10);
        assert_relative_eq!(refined.point.z, 0., epsilon = 1e-10);
        assert_relative_eq!(
            refined.point,
            b.point_at(refined.uv_b.x, refined.uv_b.y),
            epsilon = 1e-10
        );
    }

    #[test]
    fn converges_onto_curved_surface() {
        let a = bump();
        let b = plane_xy(0.2);
        let newton = SurfaceSurfaceNewton::new(&a, &b, 1e-10, 32);
        let refined = newton
            .refine(Vector2::new(0.7, 0.6), Vector2::new(0.3, 0.1), None)
            .unwrap();
        assert!(refined.distance < 1e-10);
        assert_relative_eq!(refined.point.z, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn exact_seed_stays_put() {
        let a = plane_xy(0.);
        let b = wall(0.4);
        let newton = SurfaceSurfaceNewton::new(&a, &b, 1e-8, 32);
        let (uv_a, uv_b) = (Vector2::new(0.4, 0.5), Vector2::new(0.5, 0.5));
        let refined = newton.refine(uv_a, uv_b, None).unwrap();
        assert_eq!(refined.uv_a, uv_a);
        assert_eq!(refined.uv_b, uv_b);
        assert_relative_eq!(refined.point, Point3::new(0.4, 0.5, 0.), epsilon = 1e-12);
    }

    #[test]
    fn parallel_planes_fail() {
        let a = plane_xy(0.);
        let b = plane_xy(0.1);
        let newton = SurfaceSurfaceNewton::new(&a, &b, 1e-8, 32);
        let err = newton
            .refine(Vector2::new(0.5, 0.5), Vector2::new(0.5, 0.5), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "refinement failed: degenerate local geometry");
    }

    #[test]
    fn iteration_bound_is_respected() {
        let a = bump();
        let b = plane_xy(0.2);
        let newton = SurfaceSurfaceNewton::new(&a, &b, 1e-14, 0);
        let seed = Vector2::new(0.7, 0.6);
        let refined = newton.refine(seed, Vector2::new(0.3, 0.1), None).unwrap();
        assert_eq!(refined.uv_a, seed);
        assert!(refined.distance > 1e-14);
    }

    #[test]
    fn cancelled_refinement_fails() {
        let a = plane_xy(0.);
        let b = wall(0.4);
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let newton = SurfaceSurfaceNewton::new(&a, &b, 1e-8, 32);
        let res = newton.refine(
            Vector2::new(0.45, 0.5),
            Vector2::new(0.5, 0.5),
            Some(&cancellation),
        );
        assert!(res.is_err());
    }
}
