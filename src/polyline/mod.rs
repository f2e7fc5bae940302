use std::ops::Range;

use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint};

use crate::{bounding_box::BoundingBox, misc::FloatingPoint};

/// Ordered sequence of points paired with the parameters they were sampled at.
#[derive(Clone, Debug)]
pub struct Polyline<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    points: Vec<OPoint<T, D>>,
    parameters: Vec<T>,
}

impl<T: FloatingPoint, D: DimName> Polyline<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a polyline
    /// # Failures
    /// - if the points and parameters differ in length
    /// - if there are fewer than two points
    pub fn try_new(points: Vec<OPoint<T, D>>, parameters: Vec<T>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            points.len() == parameters.len(),
            "Points and parameters must have the same length, got {} and {}",
            points.len(),
            parameters.len()
        );
        anyhow::ensure!(points.len() >= 2, "Too few points for polyline");
        Ok(Self { points, parameters })
    }

    pub fn points(&self) -> &[OPoint<T, D>] {
        &self.points
    }

    pub fn parameters(&self) -> &[T] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The range covering the whole polyline
    pub fn full_range(&self) -> PolylineRange {
        PolylineRange::new(0, self.points.len())
    }

    /// Bounding box enclosing the points of a range
    pub fn bounding_box(&self, range: &PolylineRange) -> BoundingBox<T, D> {
        BoundingBox::new_with_points(self.points[range.as_range()].iter().cloned())
    }

    /// The single segment of an irreducible range as `((p0, t0), (p1, t1))`
    pub fn segment(&self, range: &PolylineRange) -> ((&OPoint<T, D>, T), (&OPoint<T, D>, T)) {
        let i = range.start;
        (
            (&self.points[i], self.parameters[i]),
            (&self.points[i + 1], self.parameters[i + 1]),
        )
    }
}

/// Half-open index range `[start, end)` over the points of a shared polyline.
///
/// A range always holds at least two points, i.e. one segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PolylineRange {
    start: usize,
    end: usize,
}

impl PolylineRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end >= start + 2);
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of points in the range
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// A range holding a single segment cannot be split further
    pub fn is_irreducible(&self) -> bool {
        self.len() == 2
    }

    /// Split into two halves that share the pivot point at `start + ceil(n / 2) - 1`,
    /// so that every segment of the range belongs to exactly one half.
    /// # Example
    /// ```
    /// use nurbs_intersection::prelude::PolylineRange;
    /// let (l, r) = PolylineRange::new(0, 5).bisect();
    /// assert_eq!((l.start(), l.end()), (0, 3));
    /// assert_eq!((r.start(), r.end()), (2, 5));
    /// ```
    pub fn bisect(&self) -> (Self, Self) {
        let mid = self.start + self.len().div_ceil(2);
        (Self::new(self.start, mid), Self::new(mid - 1, self.end))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use super::{Polyline, PolylineRange};

    #[test]
    fn bisect_keeps_every_segment_once() {
        for n in 3..12 {
            let (l, r) = PolylineRange::new(0, n).bisect();
            assert_eq!(l.end() - 1, r.start());
            // segments in left + segments in right == segments in whole
            assert_eq!((l.len() - 1) + (r.len() - 1), n - 1);
            assert!(l.len() >= 2 && r.len() >= 2);
        }
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let points = vec![Point3::new(0., 0., 0.), Point3::new(1., 0., 0.)];
        assert!(Polyline::try_new(points.clone(), vec![0.]).is_err());
        assert!(Polyline::try_new(points, vec![0., 1.]).is_ok());
    }

    #[test]
    fn segment_of_irreducible_range() {
        let points = vec![
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(2., 1., 0.),
        ];
        let polyline = Polyline::try_new(points, vec![0., 0.5, 1.]).unwrap();
        let (_, r) = polyline.full_range().bisect();
        assert!(r.is_irreducible());
        let ((p0, t0), (p1, t1)) = polyline.segment(&r);
        assert_eq!(*p0, Point3::new(1., 0., 0.));
        assert_eq!(*p1, Point3::new(2., 1., 0.));
        assert_eq!((t0, t1), (0.5, 1.));
    }
}
