use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, OVector};

use crate::misc::FloatingPoint;

/// Represents a ray in D dimensions.
#[derive(Clone, Debug)]
pub struct Ray<T: FloatingPoint, D>
where
    D: DimName,
    DefaultAllocator: Allocator<D>,
{
    pub(crate) origin: OPoint<T, D>,
    pub(crate) direction: OVector<T, D>,
}

/// Closest approach of two rays: the point & ray parameter on each of them.
#[derive(Clone, Debug)]
pub struct RayIntersection<T: FloatingPoint, D>
where
    D: DimName,
    DefaultAllocator: Allocator<D>,
{
    pub(crate) intersection0: (OPoint<T, D>, T),
    pub(crate) intersection1: (OPoint<T, D>, T),
}

impl<T: FloatingPoint, D> RayIntersection<T, D>
where
    D: DimName,
    DefaultAllocator: Allocator<D>,
{
    pub fn intersection0(&self) -> &(OPoint<T, D>, T) {
        &self.intersection0
    }

    pub fn intersection1(&self) -> &(OPoint<T, D>, T) {
        &self.intersection1
    }

    /// Ray parameters `(t, w)` at the closest approach
    pub fn parameters(&self) -> (T, T) {
        (self.intersection0.1, self.intersection1.1)
    }

    /// Distance between the two closest points
    pub fn distance(&self) -> T {
        (&self.intersection0.0 - &self.intersection1.0).norm()
    }
}

impl<T: FloatingPoint, D> Ray<T, D>
where
    D: DimName,
    DefaultAllocator: Allocator<D>,
{
    pub fn new(origin: OPoint<T, D>, direction: OVector<T, D>) -> Self {
        Self { origin, direction }
    }

    pub fn origin(&self) -> &OPoint<T, D> {
        &self.origin
    }

    pub fn direction(&self) -> &OVector<T, D> {
        &self.direction
    }

    pub fn point_at(&self, t: T) -> OPoint<T, D> {
        &self.origin + &self.direction * t
    }

    /// Finds the closest approach between two rays.
    /// see http://geomalgorithms.com/a07-_distance.html
    ///
    /// Returns `None` when the directions are parallel,
    /// otherwise the parameters satisfy `a0 + t * a ~ b0 + w * b` at minimum separation
    /// (the two points coincide only if the rays actually meet).
    pub fn find_intersection(&self, other: &Self) -> Option<RayIntersection<T, D>> {
        let dab = self.direction.dot(other.direction());
        let daa = self.direction.dot(&self.direction);
        let dbb = other.direction().dot(&other.direction);
        let div = daa * dbb - dab * dab;

        // The rays are parallel.
        if div.abs() < T::default_epsilon() {
            return None;
        }

        let dab0 = self.direction.dot(&other.origin().coords);
        let daa0 = self.direction.dot(&self.origin().coords);
        let dbb0 = other.direction().dot(&other.origin().coords);
        let dba0 = other.direction().dot(&self.origin().coords);

        let num = dab * (dab0 - daa0) - daa * (dbb0 - dba0);
        let w = num / div;
        let t = (dab0 - daa0 + w * dab) / daa;

        Some(RayIntersection {
            intersection0: (self.point_at(t), t),
            intersection1: (other.point_at(w), w),
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    use super::Ray;

    #[test]
    fn parallel_rays_have_no_closest_approach() {
        let a = Ray::new(Point3::new(0., 0., 0.), Vector3::new(1., 0., 0.));
        let b = Ray::new(Point3::new(0., 1., 0.), Vector3::new(2., 0., 0.));
        assert!(a.find_intersection(&b).is_none());
    }

    #[test]
    fn crossing_rays_meet() {
        let a = Ray::new(Point3::new(0., 0., 0.), Vector3::new(1., 0., 0.));
        let b = Ray::new(Point3::new(0.5, -1., 0.), Vector3::new(0., 1., 0.));
        let it = a.find_intersection(&b).unwrap();
        let (t, w) = it.parameters();
        assert_relative_eq!(t, 0.5, epsilon = 1e-12);
        assert_relative_eq!(w, 1.0, epsilon = 1e-12);
        assert_relative_eq!(a.point_at(t), b.point_at(w), epsilon = 1e-12);
    }

    #[test]
    fn skew_rays_report_minimum_separation() {
        let a = Ray::new(Point3::new(0., 0., 0.), Vector3::new(1., 0., 0.));
        let b = Ray::new(Point3::new(2., -3., 1.), Vector3::new(0., 1., 0.));
        let it = a.find_intersection(&b).unwrap();
        let (t, w) = it.parameters();
        assert_relative_eq!(t, 2.0, epsilon = 1e-12);
        assert_relative_eq!(w, 3.0, epsilon = 1e-12);
        assert_relative_eq!(it.distance(), 1.0, epsilon = 1e-12);

        // the connecting vector is perpendicular to both directions
        let d = it.intersection1().0 - it.intersection0().0;
        assert_relative_eq!(d.dot(a.direction()), 0.0, epsilon = 1e-12);
        assert_relative_eq!(d.dot(b.direction()), 0.0, epsilon = 1e-12);
    }
}
