use crate::{
    bounding_box::{MeshBoundingBoxTraversal, MeshBoundingBoxTree},
    mesh::TriangleMesh,
    misc::{unique_by, Cancellation, FloatingPoint},
};

use super::{find_face_intersection, Intersects, MeshIntersectionPoint, PolylineAssembler};

/// Options for intersecting two triangle meshes.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshIntersectionOptions<T: FloatingPoint> {
    /// Distance under which bounding boxes overlap, segments are too short to keep,
    /// and segment ends are welded together.
    pub tolerance: T,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancellation: Option<Cancellation>,
}

impl<T: FloatingPoint> Default for MeshIntersectionOptions<T> {
    fn default() -> Self {
        Self {
            tolerance: T::constant(1e-6),
            cancellation: None,
        }
    }
}

impl<T: FloatingPoint> MeshIntersectionOptions<T> {
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

/// Find the segments along which two meshes cross, using prebuilt trees of their faces.
///
/// Segments shorter than the tolerance are dropped,
/// and segments found twice (the same ends in either order) are kept once.
pub fn find_mesh_intersection_segments<T: FloatingPoint>(
    a: &TriangleMesh<T>,
    tree_a: &MeshBoundingBoxTree<T>,
    b: &TriangleMesh<T>,
    tree_b: &MeshBoundingBoxTree<T>,
    options: &MeshIntersectionOptions<T>,
) -> anyhow::Result<Vec<[MeshIntersectionPoint<T>; 2]>> {
    let tolerance = options.tolerance;
    let traversed = MeshBoundingBoxTraversal::try_traverse(
        tree_a,
        tree_b,
        Some(tolerance),
        options.cancellation.as_ref(),
    )?;

    let segments: Vec<_> = traversed
        .into_pairs()
        .into_iter()
        .filter_map(|(fa, fb)| find_face_intersection(a, fa, b, fb))
        .filter(|[s, e]| (s.point - e.point).norm() >= tolerance)
        .collect();

    #[cfg(feature = "log")]
    let found = segments.len();

    let same = |p: &MeshIntersectionPoint<T>, q: &MeshIntersectionPoint<T>| {
        (p.point - q.point).norm() < tolerance
    };
    let segments = unique_by(segments, |[a0, a1], [b0, b1]| {
        (same(a0, b0) && same(a1, b1)) || (same(a0, b1) && same(a1, b0))
    });

    #[cfg(feature = "log")]
    log::debug!(
        "mesh intersection: {} segments, {} after deduplication",
        found,
        segments.len()
    );

    Ok(segments)
}

impl<'a, T: FloatingPoint> Intersects<'a, &'a TriangleMesh<T>> for TriangleMesh<T> {
    type Output = anyhow::Result<Vec<Vec<MeshIntersectionPoint<T>>>>;
    type Option = Option<MeshIntersectionOptions<T>>;

    /// Find the polylines along which two meshes cross.
    /// Each point carries its uv on both meshes and the pair of faces it was found on.
    ///
    /// # Example
    /// ```
    /// use nalgebra::{Point3, Vector2};
    /// use nurbs_intersection::prelude::*;
    ///
    /// let uvs = vec![Vector2::new(0., 0.), Vector2::new(1., 0.), Vector2::new(0., 1.)];
    /// let a = TriangleMesh::try_new(
    ///     vec![Point3::new(0., 0., 0.), Point3::new(2., 0., 0.), Point3::new(0., 2., 0.)],
    ///     vec![[0, 1, 2]],
    ///     uvs.clone(),
    /// ).unwrap();
    /// let b = TriangleMesh::try_new(
    ///     vec![Point3::new(-1., 0.5, -1.), Point3::new(3., 0.5, -1.), Point3::new(-1., 0.5, 3.)],
    ///     vec![[0, 1, 2]],
    ///     uvs,
    /// ).unwrap();
    /// let polylines = a.find_intersection(&b, None).unwrap();
    /// assert_eq!(polylines.len(), 1);
    /// assert_eq!(polylines[0].len(), 2);
    /// ```
    fn find_intersection(
        &'a self,
        other: &'a TriangleMesh<T>,
        option: Self::Option,
    ) -> Self::Output {
        let options = option.unwrap_or_default();
        let tree_a = MeshBoundingBoxTree::new(self);
        let tree_b = MeshBoundingBoxTree::new(other);
        let segments = find_mesh_intersection_segments(self, &tree_a, other, &tree_b, &options)?;
        Ok(PolylineAssembler::new(segments, options.tolerance).assemble())
    }
}
