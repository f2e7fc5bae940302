use nalgebra::{Point3, Vector2, Vector3, U3};

use crate::{bounding_box::BoundingBox, misc::FloatingPoint};

/// A single mesh face, its corners and their uvs.
#[derive(Clone, Debug, PartialEq)]
pub struct Triangle<T: FloatingPoint> {
    points: [Point3<T>; 3],
    uvs: [Vector2<T>; 3],
}

/// Intersection of a segment with a triangle
#[derive(Clone, Debug)]
pub struct SegmentTriangleIntersection<T: FloatingPoint> {
    /// point of intersection
    pub point: Point3<T>,
    /// normalized parameter along the segment, in [0, 1]
    pub p: T,
    /// parametric coordinate along the first triangle edge
    pub s: T,
    /// parametric coordinate along the second triangle edge
    pub t: T,
}

impl<T: FloatingPoint> Triangle<T> {
    pub fn new(points: [Point3<T>; 3], uvs: [Vector2<T>; 3]) -> Self {
        Self { points, uvs }
    }

    pub fn points(&self) -> &[Point3<T>; 3] {
        &self.points
    }

    pub fn uvs(&self) -> &[Vector2<T>; 3] {
        &self.uvs
    }

    pub fn centroid(&self) -> Point3<T> {
        let [a, b, c] = &self.points;
        Point3::from((a.coords + b.coords + c.coords) / T::constant(3.))
    }

    /// Unit normal following the winding order, `None` for a zero-area triangle
    pub fn normal(&self) -> Option<Vector3<T>> {
        let [a, b, c] = &self.points;
        (b - a).cross(&(c - a)).try_normalize(T::zero())
    }

    pub fn bounding_box(&self) -> BoundingBox<T, U3> {
        self.points.iter().cloned().collect()
    }

    /// Recover the uv of a point lying on the triangle from the area ratios of the
    /// three sub-triangles it spans with the corners.
    /// The result is undefined for a zero-area triangle.
    pub fn uv_from_point(&self, point: &Point3<T>) -> Vector2<T> {
        let [p1, p2, p3] = &self.points;
        let [uv1, uv2, uv3] = &self.uvs;

        let f1 = p1 - point;
        let f2 = p2 - point;
        let f3 = p3 - point;

        let a = (p1 - p2).cross(&(p1 - p3)).norm();
        let a1 = f2.cross(&f3).norm() / a;
        let a2 = f3.cross(&f1).norm() / a;
        let a3 = f1.cross(&f2).norm() / a;

        uv1 * a1 + uv2 * a2 + uv3 * a3
    }

    /// Map edge coordinates `(s, t)` of [`SegmentTriangleIntersection`] to a uv
    pub fn uv_at(&self, s: T, t: T) -> Vector2<T> {
        let [uv0, uv1, uv2] = &self.uvs;
        uv0 + (uv1 - uv0) * s + (uv2 - uv0) * t
    }

    /// Intersect the segment `p0 -> p1` with the triangle.
    /// Returns `None` if the segment is parallel to the triangle plane (including the coplanar case),
    /// does not reach the plane, or meets the plane outside the triangle.
    /// see http://geomalgorithms.com/a06-_intersect-2.html
    pub fn find_segment_intersection(
        &self,
        p0: &Point3<T>,
        p1: &Point3<T>,
    ) -> Option<SegmentTriangleIntersection<T>> {
        let eps = T::default_epsilon();
        let [v0, v1, v2] = &self.points;

        let u = v1 - v0;
        let v = v2 - v0;
        let n = u.cross(&v);

        let dir = p1 - p0;
        let w0 = p0 - v0;

        let a = -n.dot(&w0);
        let b = n.dot(&dir);

        // parallel to the plane
        if b.abs() < eps {
            return None;
        }

        let r = a / b;
        if r < -eps || r > T::one() + eps {
            return None;
        }

        let point = p0 + dir * r;

        let uv = u.dot(&v);
        let uu = u.dot(&u);
        let vv = v.dot(&v);

        let w = point - v0;
        let wu = w.dot(&u);
        let wv = w.dot(&v);

        let denom = uv * uv - uu * vv;
        if denom.abs() < eps {
            return None;
        }

        let s = (uv * wv - vv * wu) / denom;
        if s < -eps || s > T::one() + eps {
            return None;
        }

        let t = (uv * wu - uu * wv) / denom;
        if t < -eps || s + t > T::one() + eps {
            return None;
        }

        Some(SegmentTriangleIntersection { point, p: r, s, t })
    }
}
