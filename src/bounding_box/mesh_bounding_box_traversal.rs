use crate::misc::{check_cancelled, Cancellation, FloatingPoint};

use super::{MeshBoundingBoxNode, MeshBoundingBoxTree};

/// Candidate face pairs found by descending two mesh trees at once.
#[derive(Clone, Debug)]
pub struct MeshBoundingBoxTraversal {
    pairs: Vec<(usize, usize)>,
    bounding_box_tests: usize,
}

impl MeshBoundingBoxTraversal {
    /// Traverse both trees to find the pairs of faces whose boxes overlap within `tolerance`.
    /// Disjoint node pairs are never descended.
    pub fn try_traverse<T: FloatingPoint>(
        a: &MeshBoundingBoxTree<T>,
        b: &MeshBoundingBoxTree<T>,
        tolerance: Option<T>,
        cancellation: Option<&Cancellation>,
    ) -> anyhow::Result<Self> {
        let mut pairs = vec![];
        let mut bounding_box_tests = 0;

        let mut trees = match (a.root(), b.root()) {
            (Some(ra), Some(rb)) => vec![(ra, rb)],
            _ => vec![],
        };

        while let Some((ia, ib)) = trees.pop() {
            check_cancelled(cancellation)?;

            let na = a.node(ia);
            let nb = b.node(ib);

            bounding_box_tests += 1;
            if !na.bounding_box().intersects(nb.bounding_box(), tolerance) {
                continue;
            }

            match (na, nb) {
                (
                    MeshBoundingBoxNode::Leaf { face: fa, .. },
                    MeshBoundingBoxNode::Leaf { face: fb, .. },
                ) => {
                    pairs.push((*fa, *fb));
                }
                (MeshBoundingBoxNode::Branch { left, right, .. }, MeshBoundingBoxNode::Leaf { .. }) => {
                    trees.push((*left, ib));
                    trees.push((*right, ib));
                }
                (MeshBoundingBoxNode::Leaf { .. }, MeshBoundingBoxNode::Branch { left, right, .. }) => {
                    trees.push((ia, *left));
                    trees.push((ia, *right));
                }
                (
                    MeshBoundingBoxNode::Branch {
                        left: a0,
                        right: a1,
                        ..
                    },
                    MeshBoundingBoxNode::Branch {
                        left: b0,
                        right: b1,
                        ..
                    },
                ) => {
                    trees.push((*a0, *b0));
                    trees.push((*a1, *b0));
                    trees.push((*a0, *b1));
                    trees.push((*a1, *b1));
                }
            }
        }

        #[cfg(feature = "log")]
        log::debug!(
            "mesh traversal: {} candidate pairs after {} box tests",
            pairs.len(),
            bounding_box_tests
        );

        Ok(Self {
            pairs,
            bounding_box_tests,
        })
    }

    /// Face index pairs `(face in a, face in b)`
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<(usize, usize)> {
        self.pairs
    }

    /// Number of node pairs whose boxes were compared
    pub fn bounding_box_tests(&self) -> usize {
        self.bounding_box_tests
    }
}
