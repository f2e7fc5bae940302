use nalgebra::{Point3, Vector3, U3};

use crate::misc::{FloatingPoint, Ray};

/// A plane in 3D space, the set of points `p` with `normal . p + constant = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T: FloatingPoint> {
    normal: Vector3<T>,
    constant: T,
}

impl<T: FloatingPoint> Plane<T> {
    pub fn new(normal: Vector3<T>, constant: T) -> Self {
        Self { normal, constant }
    }

    /// Create a plane passing through `origin` with the given normal.
    pub fn new_with_point(origin: &Point3<T>, normal: Vector3<T>) -> Self {
        let constant = -normal.dot(&origin.coords);
        Self { normal, constant }
    }

    pub fn normal(&self) -> Vector3<T> {
        self.normal
    }

    pub fn constant(&self) -> T {
        self.constant
    }

    /// Intersect two planes, returning the line shared by both as a ray with a unit direction.
    /// The ray origin lies on the coordinate plane orthogonal to the dominant axis of the line direction,
    /// which keeps the 2x2 solve away from a vanishing determinant.
    /// Returns `None` when the planes are parallel.
    pub fn find_intersection(&self, other: &Self) -> Option<Ray<T, U3>> {
        let n1 = &self.normal;
        let n2 = &other.normal;
        let d = n1.cross(n2);
        if d.norm_squared() < T::default_epsilon() {
            return None;
        }

        let (m0, m1, m2) = (d.x.abs(), d.y.abs(), d.z.abs());
        let li = if m1 > m0 && m1 >= m2 {
            1
        } else if m2 > m0 && m2 > m1 {
            2
        } else {
            0
        };
        let (i, j) = match li {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };

        let (a1, b1) = (n1[i], n1[j]);
        let (a2, b2) = (n2[i], n2[j]);
        let (d1, d2) = (self.constant, other.constant);

        let den = a1 * b2 - b1 * a2;
        let x = (b1 * d2 - d1 * b2) / den;
        let y = (d1 * a2 - a1 * d2) / den;

        let mut origin = Point3::origin();
        origin[i] = x;
        origin[j] = y;

        Some(Ray::new(origin, d.normalize()))
    }
}

/// Find the single point shared by three planes.
/// Returns `None` when the system is singular (two or more of the planes are parallel).
pub fn three_planes<T: FloatingPoint>(
    p0: &Plane<T>,
    p1: &Plane<T>,
    p2: &Plane<T>,
) -> Option<Point3<T>> {
    let (n0, n1, n2) = (p0.normal, p1.normal, p2.normal);
    let (d0, d1, d2) = (-p0.constant, -p1.constant, -p2.constant);

    let u = n1.cross(&n2);
    let den = n0.dot(&u);
    if den.abs() < T::default_epsilon() {
        return None;
    }

    let num = u * d0 + n0.cross(&(n1 * d2 - n2 * d1));
    Some(Point3::from(num / den))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    use super::{three_planes, Plane};

    #[test]
    fn parallel_planes_do_not_intersect() {
        let a = Plane::new_with_point(&Point3::new(0., 0., 0.), Vector3::z());
        let b = Plane::new_with_point(&Point3::new(0., 0., 1.), Vector3::z() * 2.);
        assert!(a.find_intersection(&b).is_none());
    }

    #[test]
    fn plane_plane_line_lies_on_both() {
        let a = Plane::new_with_point(&Point3::new(0., 0., 0.3), Vector3::new(0.1, 0.2, 1.0));
        let b = Plane::new_with_point(&Point3::new(1., -2., 0.), Vector3::new(1.0, -0.5, 0.2));
        let ray = a.find_intersection(&b).unwrap();
        assert_relative_eq!(ray.direction().norm(), 1.0, epsilon = 1e-12);
        for t in [-2.0, 0.0, 3.5] {
            let p = ray.point_at(t);
            for plane in [&a, &b] {
                let d = plane.normal().dot(&p.coords) + plane.constant();
                assert_relative_eq!(d, 0.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn three_axis_planes_meet_at_offsets() {
        let x = Plane::new_with_point(&Point3::new(1., 0., 0.), Vector3::x());
        let y = Plane::new_with_point(&Point3::new(0., 2., 0.), Vector3::y());
        let z = Plane::new_with_point(&Point3::new(0., 0., 3.), Vector3::z());
        let p = three_planes(&x, &y, &z).unwrap();
        assert_relative_eq!(p, Point3::new(1., 2., 3.), epsilon = 1e-12);

        let z2 = Plane::new_with_point(&Point3::new(0., 0., 3.), Vector3::x());
        assert!(three_planes(&x, &y, &z2).is_none());
    }
}
