use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint};

use crate::misc::{FloatingPoint, Ray};

use super::CurveCurveIntersection;

/// Intersect the segments `a0 -> a1` and `b0 -> b1`.
///
/// The closest approach of the two supporting lines is clamped into both segments,
/// and accepted if the clamped points lie within `tolerance` of each other.
/// The parameters of the result are normalized to `[0, 1]` along each segment.
/// Returns `None` for parallel or zero-length segments.
///
/// # Example
/// ```
/// use nalgebra::Point3;
/// use approx::assert_relative_eq;
/// use nurbs_intersection::prelude::*;
///
/// let it = find_segment_segment_intersection(
///     &Point3::new(0., 0., 0.),
///     &Point3::new(1., 0., 0.),
///     &Point3::new(0.5, -1., 0.),
///     &Point3::new(0.5, 1., 0.),
///     1e-6,
/// ).unwrap();
/// assert_relative_eq!(it.a_parameter(), 0.5);
/// assert_relative_eq!(it.a().0, Point3::new(0.5, 0., 0.));
/// ```
pub fn find_segment_segment_intersection<T: FloatingPoint, D: DimName>(
    a0: &OPoint<T, D>,
    a1: &OPoint<T, D>,
    b0: &OPoint<T, D>,
    b1: &OPoint<T, D>,
    tolerance: T,
) -> Option<CurveCurveIntersection<OPoint<T, D>, T>>
where
    DefaultAllocator: Allocator<D>,
{
    let da = a1 - a0;
    let db = b1 - b0;
    let la = da.norm();
    let lb = db.norm();
    if la < T::default_epsilon() || lb < T::default_epsilon() {
        return None;
    }

    let ra = Ray::new(a0.clone(), &da / la);
    let rb = Ray::new(b0.clone(), &db / lb);
    let (t, w) = ra.find_intersection(&rb)?.parameters();

    let u0 = (t / la).clamp(T::zero(), T::one());
    let u1 = (w / lb).clamp(T::zero(), T::one());
    let pa = a0 + &da * u0;
    let pb = b0 + &db * u1;

    if (&pa - &pb).norm_squared() < tolerance * tolerance {
        Some(CurveCurveIntersection::new((pa, u0), (pb, u1)))
    } else {
        None
    }
}
