use nalgebra::{Point3, Vector2, U3};

use crate::{
    mesh::{Triangle, TriangleMesh},
    misc::{FloatingPoint, Plane, Ray},
};

/// Slack allowed when testing clip parameters against edge lengths and interval ends
const CLIP_EPSILON: f64 = 1e-10;

/// One end of a ray clipped by a triangle.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPoint<T: FloatingPoint> {
    /// parameter along the clipped ray
    pub u: T,
    pub point: Point3<T>,
    /// uv interpolated along the triangle edge that produced the point
    pub uv: Vector2<T>,
}

/// The part of a ray lying inside a triangle.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipInterval<T: FloatingPoint> {
    pub min: ClipPoint<T>,
    pub max: ClipPoint<T>,
}

/// An end of the segment shared by two intersecting faces,
/// with its uv on both faces.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshIntersectionPoint<T: FloatingPoint> {
    pub point: Point3<T>,
    /// uv on the face of the first mesh
    pub uv_a: Vector2<T>,
    /// uv on the face of the second mesh
    pub uv_b: Vector2<T>,
    /// face index in the first mesh
    pub face_a: usize,
    /// face index in the second mesh
    pub face_b: usize,
}

/// Clip a ray lying in the plane of a triangle against the triangle's edges.
///
/// Each edge is intersected with the ray, and the smallest and largest ray parameters
/// among the edges hit within their length are kept.
/// Returns `None` if fewer than two edges are hit.
pub fn clip_ray_in_coplanar_triangle<T: FloatingPoint>(
    ray: &Ray<T, U3>,
    triangle: &Triangle<T>,
) -> Option<ClipInterval<T>> {
    let eps = T::constant(CLIP_EPSILON);
    let points = triangle.points();
    let uvs = triangle.uvs();

    let mut hits = 0;
    let mut min: Option<ClipPoint<T>> = None;
    let mut max: Option<ClipPoint<T>> = None;

    for i in 0..3 {
        let j = (i + 1) % 3;
        let edge = points[j] - points[i];
        let length = edge.norm();
        let Some(direction) = edge.try_normalize(T::zero()) else {
            continue;
        };

        let Some(it) = Ray::new(points[i], direction).find_intersection(ray) else {
            continue;
        };
        let (useg, uray) = it.parameters();

        if useg < -eps || useg > length + eps {
            continue;
        }
        hits += 1;

        let clip = ClipPoint {
            u: uray,
            point: ray.point_at(uray),
            uv: uvs[i] + (uvs[j] - uvs[i]) * (useg / length),
        };
        if min.as_ref().map_or(true, |m| uray < m.u) {
            min = Some(clip.clone());
        }
        if max.as_ref().map_or(true, |m| uray > m.u) {
            max = Some(clip);
        }
    }

    if hits < 2 {
        return None;
    }

    Some(ClipInterval {
        min: min?,
        max: max?,
    })
}

/// Intersect two triangles.
///
/// The line shared by both triangle planes is clipped by each triangle
/// and the overlap of the two intervals is returned as a segment
/// whose ends carry their uv on both triangles.
/// Returns `None` for parallel (including coplanar) or disjoint triangles.
/// The two ends coincide when the triangles only touch at a point.
pub fn find_triangle_triangle_intersection<T: FloatingPoint>(
    a: &Triangle<T>,
    b: &Triangle<T>,
) -> Option<[(Point3<T>, Vector2<T>, Vector2<T>); 2]> {
    let na = a.normal()?;
    let nb = b.normal()?;
    let pa = Plane::new_with_point(&a.points()[0], na);
    let pb = Plane::new_with_point(&b.points()[0], nb);

    let ray = pa.find_intersection(&pb)?;

    let clip_a = clip_ray_in_coplanar_triangle(&ray, a)?;
    let clip_b = clip_ray_in_coplanar_triangle(&ray, b)?;

    merge_clip_intervals(&clip_a, &clip_b, a, b)
}

/// Overlap of the intervals clipped by triangles `a` and `b` on the same ray.
/// The uv on the triangle which did not produce an end is recovered from the point.
fn merge_clip_intervals<T: FloatingPoint>(
    clip_a: &ClipInterval<T>,
    clip_b: &ClipInterval<T>,
    a: &Triangle<T>,
    b: &Triangle<T>,
) -> Option<[(Point3<T>, Vector2<T>, Vector2<T>); 2]> {
    let eps = T::constant(CLIP_EPSILON);
    if clip_b.min.u > clip_a.max.u + eps || clip_a.min.u > clip_b.max.u + eps {
        return None;
    }

    let start = if clip_a.min.u > clip_b.min.u {
        (clip_a.min.point, clip_a.min.uv, b.uv_from_point(&clip_a.min.point))
    } else {
        (clip_b.min.point, a.uv_from_point(&clip_b.min.point), clip_b.min.uv)
    };

    let end = if clip_a.max.u < clip_b.max.u {
        (clip_a.max.point, clip_a.max.uv, b.uv_from_point(&clip_a.max.point))
    } else {
        (clip_b.max.point, a.uv_from_point(&clip_b.max.point), clip_b.max.uv)
    };

    Some([start, end])
}

/// Intersect face `face_a` of mesh `a` with face `face_b` of mesh `b`.
pub fn find_face_intersection<T: FloatingPoint>(
    a: &TriangleMesh<T>,
    face_a: usize,
    b: &TriangleMesh<T>,
    face_b: usize,
) -> Option<[MeshIntersectionPoint<T>; 2]> {
    let ends = find_triangle_triangle_intersection(&a.triangle(face_a), &b.triangle(face_b))?;
    Some(ends.map(|(point, uv_a, uv_b)| MeshIntersectionPoint {
        point,
        uv_a,
        uv_b,
        face_a,
        face_b,
    }))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector2, Vector3};

    use super::{clip_ray_in_coplanar_triangle, find_triangle_triangle_intersection};
    use crate::{mesh::Triangle, misc::Ray};

    fn triangle(points: [Point3<f64>; 3]) -> Triangle<f64> {
        Triangle::new(
            points,
            [
                Vector2::new(0., 0.),
                Vector2::new(1., 0.),
                Vector2::new(0., 1.),
            ],
        )
    }

    #[test]
    fn ray_through_triangle() {
        let t = triangle([
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(0., 1., 0.),
        ]);
        let ray = Ray::new(Point3::new(-1., 0.25, 0.), Vector3::x());
        let clip = clip_ray_in_coplanar_triangle(&ray, &t).unwrap();
        assert_relative_eq!(clip.min.u, 1.0, epsilon = 1e-12);
        assert_relative_eq!(clip.max.u, 1.75, epsilon = 1e-12);
        assert_relative_eq!(clip.min.point, Point3::new(0., 0.25, 0.), epsilon = 1e-12);
        assert_relative_eq!(clip.max.uv, Vector2::new(0.75, 0.25), epsilon = 1e-12);

        let missing = Ray::new(Point3::new(-1., 2., 0.), Vector3::x());
        assert!(clip_ray_in_coplanar_triangle(&missing, &t).is_none());
    }

    #[test]
    fn crossing_triangles() {
        let a = triangle([
            Point3::new(0., 0., 0.),
            Point3::new(2., 0., 0.),
            Point3::new(0., 2., 0.),
        ]);
        // vertical triangle standing on the line y = 0.5
        let b = triangle([
            Point3::new(-1., 0.5, -1.),
            Point3::new(3., 0.5, -1.),
            Point3::new(-1., 0.5, 3.),
        ]);
        let [s, e] = find_triangle_triangle_intersection(&a, &b).unwrap();
        let (mut p0, mut p1) = (s.0, e.0);
        if p0.x > p1.x {
            std::mem::swap(&mut p0, &mut p1);
        }
        assert_relative_eq!(p0, Point3::new(0., 0.5, 0.), epsilon = 1e-9);
        assert_relative_eq!(p1, Point3::new(1.5, 0.5, 0.), epsilon = 1e-9);

        // uv on `a` is x / 2, y / 2
        for (p, uv_a, _) in [s, e] {
            assert_relative_eq!(uv_a, Vector2::new(p.x / 2., p.y / 2.), epsilon = 1e-9);
        }
    }

    #[test]
    fn coplanar_triangles_are_reported_as_parallel() {
        let a = triangle([
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(0., 1., 0.),
        ]);
        let b = triangle([
            Point3::new(0.2, 0.2, 0.),
            Point3::new(1.2, 0.2, 0.),
            Point3::new(0.2, 1.2, 0.),
        ]);
        assert!(find_triangle_triangle_intersection(&a, &b).is_none());
    }

    #[test]
    fn triangles_touching_at_a_point() {
        let a = triangle([
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(0., 1., 0.),
        ]);
        let b = triangle([
            Point3::new(0.2, 0.2, 0.),
            Point3::new(0.2, 0., 1.),
            Point3::new(0.2, 0.4, 1.),
        ]);
        let [s, e] = find_triangle_triangle_intersection(&a, &b).unwrap();
        assert!((s.0 - e.0).norm() < 1e-9);
        assert_relative_eq!(s.0, Point3::new(0.2, 0.2, 0.), epsilon = 1e-9);
    }

    #[test]
    fn separated_triangles() {
        let a = triangle([
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(0., 1., 0.),
        ]);
        let b = triangle([
            Point3::new(5., 0.5, -1.),
            Point3::new(6., 0.5, -1.),
            Point3::new(5., 0.5, 1.),
        ]);
        assert!(find_triangle_triangle_intersection(&a, &b).is_none());
    }
}
