use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint};

use crate::{
    misc::{check_cancelled, Cancellation, FloatingPoint},
    polyline::Polyline,
};

use super::{find_segment_segment_intersection, CurveCurveIntersection};

/// Find the intersections between two parameterized polylines.
///
/// Both polylines are bisected until a pair of single segments remains,
/// pruning every pair of ranges whose bounding boxes are farther apart than `tolerance`.
/// The resulting parameters are mapped back to the parameterization of each polyline.
/// Intersections found on a vertex shared by two segments are reported once per segment pair.
pub fn find_polyline_polyline_intersections<T: FloatingPoint, D: DimName>(
    a: &Polyline<T, D>,
    b: &Polyline<T, D>,
    tolerance: T,
    cancellation: Option<&Cancellation>,
) -> anyhow::Result<Vec<CurveCurveIntersection<OPoint<T, D>, T>>>
where
    DefaultAllocator: Allocator<D>,
{
    let mut intersections = vec![];
    let mut pending = vec![(a.full_range(), b.full_range())];

    while let Some((ra, rb)) = pending.pop() {
        check_cancelled(cancellation)?;

        if !a
            .bounding_box(&ra)
            .intersects(&b.bounding_box(&rb), Some(tolerance))
        {
            continue;
        }

        match (ra.is_irreducible(), rb.is_irreducible()) {
            (true, true) => {
                let ((a0, s0), (a1, s1)) = a.segment(&ra);
                let ((b0, t0), (b1, t1)) = b.segment(&rb);
                if let Some(it) = find_segment_segment_intersection(a0, a1, b0, b1, tolerance) {
                    let ((pa, u0), (pb, u1)) = it.as_tuple();
                    intersections.push(CurveCurveIntersection::new(
                        (pa, s0 + (s1 - s0) * u0),
                        (pb, t0 + (t1 - t0) * u1),
                    ));
                }
            }
            (true, false) => {
                let (l, r) = rb.bisect();
                pending.push((ra, r));
                pending.push((ra, l));
            }
            (false, true) => {
                let (l, r) = ra.bisect();
                pending.push((r, rb));
                pending.push((l, rb));
            }
            (false, false) => {
                let (al, ar) = ra.bisect();
                let (bl, br) = rb.bisect();
                pending.push((ar, br));
                pending.push((ar, bl));
                pending.push((al, br));
                pending.push((al, bl));
            }
        }
    }

    Ok(intersections)
}
