use std::cmp::Ordering;

use nalgebra::{Point3, U3};

use crate::{bounding_box::BoundingBox, mesh::TriangleMesh, misc::FloatingPoint};

/// A node of [`MeshBoundingBoxTree`].
#[derive(Clone, Debug)]
pub enum MeshBoundingBoxNode<T: FloatingPoint> {
    /// A single face and its bounding box
    Leaf {
        face: usize,
        bounding_box: BoundingBox<T, U3>,
    },
    /// Two children (indices into the tree's node arena) and the box enclosing both
    Branch {
        left: usize,
        right: usize,
        bounding_box: BoundingBox<T, U3>,
    },
}

impl<T: FloatingPoint> MeshBoundingBoxNode<T> {
    pub fn bounding_box(&self) -> &BoundingBox<T, U3> {
        match self {
            Self::Leaf { bounding_box, .. } => bounding_box,
            Self::Branch { bounding_box, .. } => bounding_box,
        }
    }
}

/// Bounding volume hierarchy over the faces of a triangle mesh.
///
/// Built top-down: every set of faces is split at the median of the face centroids
/// along the longest axis of its box. The tree is immutable once built.
#[derive(Clone, Debug)]
pub struct MeshBoundingBoxTree<T: FloatingPoint> {
    nodes: Vec<MeshBoundingBoxNode<T>>,
}

impl<T: FloatingPoint> MeshBoundingBoxTree<T> {
    pub fn new(mesh: &TriangleMesh<T>) -> Self {
        let faces: Vec<usize> = (0..mesh.faces().len()).collect();
        Self::new_with_faces(mesh, faces)
    }

    /// Build a tree over a subset of the mesh faces
    pub fn new_with_faces(mesh: &TriangleMesh<T>, faces: Vec<usize>) -> Self {
        if faces.is_empty() {
            return Self { nodes: vec![] };
        }

        let boxes: Vec<_> = (0..mesh.faces().len())
            .map(|f| mesh.triangle(f).bounding_box())
            .collect();
        let centroids: Vec<Point3<T>> = (0..mesh.faces().len())
            .map(|f| mesh.triangle(f).centroid())
            .collect();

        // every slot is filled before the build loop ends
        let mut slots: Vec<Option<MeshBoundingBoxNode<T>>> = vec![None];
        let mut pending = vec![(0, faces)];

        while let Some((slot, mut faces)) = pending.pop() {
            if faces.len() == 1 {
                let face = faces[0];
                slots[slot] = Some(MeshBoundingBoxNode::Leaf {
                    face,
                    bounding_box: boxes[face].clone(),
                });
                continue;
            }

            let bounding_box = faces
                .iter()
                .skip(1)
                .fold(boxes[faces[0]].clone(), |acc, f| acc.union(&boxes[*f]));
            let axis = bounding_box.longest_axis();

            let mid = faces.len().div_ceil(2);
            faces.select_nth_unstable_by(mid, |a, b| {
                centroids[*a][axis]
                    .partial_cmp(&centroids[*b][axis])
                    .unwrap_or(Ordering::Equal)
            });
            let right_faces = faces.split_off(mid);

            let left = slots.len();
            let right = left + 1;
            slots.push(None);
            slots.push(None);
            slots[slot] = Some(MeshBoundingBoxNode::Branch {
                left,
                right,
                bounding_box,
            });

            pending.push((left, faces));
            pending.push((right, right_faces));
        }

        Self {
            nodes: slots.into_iter().flatten().collect(),
        }
    }

    /// Index of the root node, `None` for an empty mesh
    pub fn root(&self) -> Option<usize> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn node(&self, index: usize) -> &MeshBoundingBoxNode<T> {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[MeshBoundingBoxNode<T>] {
        &self.nodes
    }
}
