use std::cmp::Ordering;

use nalgebra::{Point3, Vector2, U3};

use crate::{
    mesh::TriangleMesh,
    misc::{check_cancelled, Cancellation, FloatingPoint},
    polyline::{Polyline, PolylineRange},
};

/// Intersection of a parameterized polyline with a mesh face.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolylineMeshIntersection<T: FloatingPoint> {
    /// point of intersection
    pub point: Point3<T>,
    /// parameter on the polyline
    pub p: T,
    /// uv on the mesh, interpolated from the face corners
    pub uv: Vector2<T>,
    /// the face where the intersection took place
    pub face: usize,
}

/// Find the intersections between a parameterized polyline and the given faces of a mesh.
///
/// The polyline is bisected and the faces are split at the median of their centroids
/// along the longest axis of their bounding box, until a single segment faces a single triangle.
/// Results may contain duplicates where the polyline crosses a shared edge or vertex.
pub fn find_polyline_mesh_intersections<T: FloatingPoint>(
    polyline: &Polyline<T, U3>,
    mesh: &TriangleMesh<T>,
    faces: Vec<usize>,
    tolerance: T,
    cancellation: Option<&Cancellation>,
) -> anyhow::Result<Vec<PolylineMeshIntersection<T>>> {
    if faces.is_empty() {
        return Ok(vec![]);
    }

    let centroids: Vec<Point3<T>> = (0..mesh.faces().len())
        .map(|f| mesh.triangle(f).centroid())
        .collect();

    let mut intersections = vec![];
    let mut pending: Vec<(PolylineRange, Vec<usize>)> = vec![(polyline.full_range(), faces)];

    while let Some((range, faces)) = pending.pop() {
        check_cancelled(cancellation)?;

        let mesh_box = mesh.faces_bounding_box(&faces);
        if !polyline
            .bounding_box(&range)
            .intersects(&mesh_box, Some(tolerance))
        {
            continue;
        }

        match (range.is_irreducible(), faces.len() == 1) {
            (true, true) => {
                let face = faces[0];
                let triangle = mesh.triangle(face);
                let ((p0, t0), (p1, t1)) = polyline.segment(&range);
                if let Some(it) = triangle.find_segment_intersection(p0, p1) {
                    intersections.push(PolylineMeshIntersection {
                        point: it.point,
                        p: t0 + (t1 - t0) * it.p,
                        uv: triangle.uv_at(it.s, it.t),
                        face,
                    });
                }
            }
            (false, true) => {
                let (l, r) = range.bisect();
                pending.push((r, faces.clone()));
                pending.push((l, faces));
            }
            (true, false) => {
                let (fl, fr) = split_faces(faces, &centroids, mesh_box.longest_axis());
                pending.push((range, fr));
                pending.push((range, fl));
            }
            (false, false) => {
                let (fl, fr) = split_faces(faces, &centroids, mesh_box.longest_axis());
                let (l, r) = range.bisect();
                pending.push((r, fr.clone()));
                pending.push((r, fl.clone()));
                pending.push((l, fr));
                pending.push((l, fl));
            }
        }
    }

    Ok(intersections)
}

/// Split faces at the median of their centroids along `axis`, the left half taking the extra face.
fn split_faces<T: FloatingPoint>(
    mut faces: Vec<usize>,
    centroids: &[Point3<T>],
    axis: usize,
) -> (Vec<usize>, Vec<usize>) {
    let mid = faces.len().div_ceil(2);
    faces.select_nth_unstable_by(mid, |a, b| {
        centroids[*a][axis]
            .partial_cmp(&centroids[*b][axis])
            .unwrap_or(Ordering::Equal)
    });
    let right = faces.split_off(mid);
    (faces, right)
}
