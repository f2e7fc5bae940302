use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1,
};
use rand::{rngs::ThreadRng, Rng};

use crate::{
    curve::NurbsCurve,
    misc::{three_points_are_flat, FloatingPoint},
    polyline::Polyline,
};

use super::Tessellation;

impl<T: FloatingPoint, D: DimName> Tessellation<Option<T>> for NurbsCurve<T, D>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    type Output = anyhow::Result<Polyline<T, DimNameDiff<D, U1>>>;

    /// Tessellate the curve using an adaptive algorithm
    /// this `adaptive` means that the curve will be tessellated based on the curvature of the curve.
    /// Every point keeps the curve parameter it was evaluated at.
    /// A degree 1 curve is returned as its control polygon.
    fn tessellate(&self, tolerance: Option<T>) -> Self::Output {
        if self.degree() == 1 {
            let points = self.dehomogenized_control_points();
            let parameters = self.knots().as_slice()[1..=points.len()].to_vec();
            return Polyline::try_new(points, parameters);
        }

        let mut rng = rand::rng();
        let tol = tolerance.unwrap_or(T::constant(1e-3));
        let (start, end) = self.knots_domain();
        let samples = tessellate_adaptive(self, start, end, tol, &mut rng);
        let (parameters, points): (Vec<T>, Vec<_>) = samples.into_iter().unzip();
        Polyline::try_new(points, parameters)
    }
}

/// Tessellate the curve using an adaptive algorithm recursively
/// if the curve between [start ~ end] is flat enough, it will return the two end points
fn tessellate_adaptive<T: FloatingPoint, D>(
    curve: &NurbsCurve<T, D>,
    start: T,
    end: T,
    tol: T,
    rng: &mut ThreadRng,
) -> Vec<(T, OPoint<T, DimNameDiff<D, U1>>)>
where
    D: DimName + DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let p1 = curve.point_at(start);
    let delta = end - start;
    if delta < T::constant(1e-8) {
        return vec![(start, p1)];
    }

    let p3 = curve.point_at(end);

    let t = 0.5_f64 + 0.2_f64 * rng.random::<f64>();
    let mid = start + delta * T::constant(t);
    let p2 = curve.point_at(mid);

    let diff = &p1 - &p3;
    let diff2 = &p1 - &p2;
    if (diff.dot(&diff) < tol && diff2.dot(&diff2) > tol)
        || !three_points_are_flat(&p1, &p2, &p3, tol)
    {
        let exact_mid = start + delta * T::constant(0.5);
        let mut left_pts = tessellate_adaptive(curve, start, exact_mid, tol, rng);
        let right_pts = tessellate_adaptive(curve, exact_mid, end, tol, rng);
        left_pts.pop();
        [left_pts, right_pts].concat()
    } else {
        vec![(start, p1), (end, p3)]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Point4};

    use crate::{curve::NurbsCurve3D, tessellation::Tessellation};

    #[test]
    fn samples_lie_on_curve_in_order() {
        let curve = NurbsCurve3D::try_new(
            3,
            vec![
                Point4::new(0., 0., 0., 1.),
                Point4::new(1., 2., 0., 1.),
                Point4::new(2., -2., 1., 1.),
                Point4::new(3., 0., 0., 1.),
            ],
            vec![0., 0., 0., 0., 1., 1., 1., 1.],
        )
        .unwrap();
        let polyline = curve.tessellate(Some(1e-4)).unwrap();
        assert!(polyline.len() > 4);
        assert!(polyline.parameters().windows(2).all(|w| w[0] < w[1]));
        assert_relative_eq!(polyline.parameters()[0], 0.);
        assert_relative_eq!(*polyline.parameters().last().unwrap(), 1.);
        for (p, t) in polyline.points().iter().zip(polyline.parameters()) {
            assert_relative_eq!(*p, curve.point_at(*t), epsilon = 1e-12);
        }
    }

    #[test]
    fn degree_one_uses_control_polygon() {
        let pts = vec![
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(1., 1., 0.),
        ];
        let curve = NurbsCurve3D::try_polyline(&pts).unwrap();
        let polyline = curve.tessellate(None).unwrap();
        assert_eq!(polyline.points(), &pts[..]);
        assert_eq!(polyline.parameters(), &[0., 0.5, 1.]);
    }
}
