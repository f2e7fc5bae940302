pub mod triangle;
pub use triangle::*;

use nalgebra::{Point3, Vector2};

use crate::{bounding_box::BoundingBox, misc::FloatingPoint};

/// Triangle mesh with a parameter-space coordinate attached to every vertex.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriangleMesh<T: FloatingPoint> {
    points: Vec<Point3<T>>,
    faces: Vec<[usize; 3]>,
    uvs: Vec<Vector2<T>>,
}

impl<T: FloatingPoint> TriangleMesh<T> {
    /// Create a mesh
    /// # Failures
    /// - if the number of uvs differs from the number of points
    /// - if a face refers to a point out of range
    pub fn try_new(
        points: Vec<Point3<T>>,
        faces: Vec<[usize; 3]>,
        uvs: Vec<Vector2<T>>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            points.len() == uvs.len(),
            "Each point needs a uv, got {} points and {} uvs",
            points.len(),
            uvs.len()
        );
        if let Some((i, face)) = faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.iter().any(|idx| *idx >= points.len()))
        {
            anyhow::bail!("Face {} has an invalid index: {:?}", i, face);
        }
        Ok(Self { points, faces, uvs })
    }

    /// Assemble a mesh whose consistency is guaranteed by the caller
    pub(crate) fn from_parts(
        points: Vec<Point3<T>>,
        faces: Vec<[usize; 3]>,
        uvs: Vec<Vector2<T>>,
    ) -> Self {
        debug_assert_eq!(points.len(), uvs.len());
        Self { points, faces, uvs }
    }

    pub fn points(&self) -> &[Point3<T>] {
        &self.points
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn uvs(&self) -> &[Vector2<T>] {
        &self.uvs
    }

    /// Gather the corners & uvs of a face
    pub fn triangle(&self, face: usize) -> Triangle<T> {
        let [a, b, c] = self.faces[face];
        Triangle::new(
            [self.points[a], self.points[b], self.points[c]],
            [self.uvs[a], self.uvs[b], self.uvs[c]],
        )
    }

    /// Bounding box enclosing the given faces
    pub fn faces_bounding_box(&self, faces: &[usize]) -> BoundingBox<T, nalgebra::U3> {
        faces
            .iter()
            .flat_map(|f| self.faces[*f].iter().map(|i| self.points[*i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{Point3, Vector2};

    use super::TriangleMesh;

    #[test]
    fn face_indices_are_validated() {
        let points = vec![
            Point3::new(0., 0., 0.),
            Point3::new(1., 0., 0.),
            Point3::new(0., 1., 0.),
        ];
        let uvs = vec![Vector2::new(0., 0.), Vector2::new(1., 0.), Vector2::new(0., 1.)];
        assert!(TriangleMesh::try_new(points.clone(), vec![[0, 1, 2]], uvs.clone()).is_ok());
        assert!(TriangleMesh::try_new(points.clone(), vec![[0, 1, 3]], uvs.clone()).is_err());
        assert!(TriangleMesh::try_new(points, vec![[0, 1, 2]], uvs[..2].to_vec()).is_err());
    }
}
