pub mod mesh_bounding_box_traversal;
pub mod mesh_bounding_box_tree;

pub use mesh_bounding_box_traversal::*;
pub use mesh_bounding_box_tree::*;

use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, OVector};

use crate::misc::FloatingPoint;

/// A struct representing a bounding box in D space.
#[derive(Clone, Debug)]
pub struct BoundingBox<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    min: OVector<T, D>,
    max: OVector<T, D>,
}

impl<T: FloatingPoint, D: DimName> BoundingBox<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new bounding box from two corners in any order.
    pub fn new(a: OVector<T, D>, b: OVector<T, D>) -> Self {
        let min = a.zip_map(&b, |x, y| x.min(y));
        let max = a.zip_map(&b, |x, y| x.max(y));
        BoundingBox { min, max }
    }

    /// Create a new bounding box from point iterator.
    /// An empty iterator yields a degenerate box at the origin.
    pub fn new_with_points<I: IntoIterator<Item = OPoint<T, D>>>(iter: I) -> Self {
        let mut iter = iter.into_iter();
        let Some(first) = iter.next() else {
            return Self {
                min: OVector::<T, D>::zeros(),
                max: OVector::<T, D>::zeros(),
            };
        };

        let mut min = first.coords.clone();
        let mut max = first.coords;

        for point in iter {
            for i in 0..D::dim() {
                min[i] = min[i].min(point[i]);
                max[i] = max[i].max(point[i]);
            }
        }

        Self { min, max }
    }

    pub fn min(&self) -> &OVector<T, D> {
        &self.min
    }

    pub fn max(&self) -> &OVector<T, D> {
        &self.max
    }

    pub fn size(&self) -> OVector<T, D> {
        &self.max - &self.min
    }

    /// Index of the axis along which the box is widest
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        let mut axis = 0;
        for i in 1..D::dim() {
            if size[i] > size[axis] {
                axis = i;
            }
        }
        axis
    }

    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.zip_map(&other.min, |x, y| x.min(y)),
            max: self.max.zip_map(&other.max, |x, y| x.max(y)),
        }
    }

    /// Check if the bounding box intersects with another bounding box,
    /// after expanding both of them by `tolerance` on every side.
    ///
    /// # Examples
    /// ```
    /// use nalgebra::Vector3;
    /// use nurbs_intersection::prelude::BoundingBox;
    ///
    /// let b0 = BoundingBox::new(Vector3::from_element(0.), Vector3::from_element(1.));
    /// assert!(b0.intersects(&b0, None));
    ///
    /// let eps = 1e-6;
    /// let b1 = BoundingBox::new(Vector3::from_element(0.5), Vector3::from_element(1.5));
    /// assert!(b0.intersects(&b1, None));
    ///
    /// let b2 = BoundingBox::new(Vector3::from_element(1. + eps), Vector3::from_element(2. + eps));
    /// assert!(!b0.intersects(&b2, None));
    /// assert!(b0.intersects(&b2, Some(eps)));
    /// ```
    pub fn intersects(&self, other: &Self, tolerance: Option<T>) -> bool {
        let tolerance = tolerance.unwrap_or(T::default_epsilon());
        for i in 0..D::dim() {
            let a0 = self.min[i] - tolerance;
            let a1 = self.max[i] + tolerance;
            let b0 = other.min[i] - tolerance;
            let b1 = other.max[i] + tolerance;

            let d0 = b0 - a1;
            let d1 = b1 - a0;

            // If the intervals are disjoint,
            // there is no intersection.
            if d0 * d1 > T::zero() {
                return false;
            }
        }

        true
    }

    /// Check if the bounding box contains a point.
    pub fn contains(&self, point: &OPoint<T, D>) -> bool {
        (0..D::dim()).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }
}

impl<T: FloatingPoint, D: DimName> FromIterator<OPoint<T, D>> for BoundingBox<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    fn from_iter<I: IntoIterator<Item = OPoint<T, D>>>(iter: I) -> Self {
        Self::new_with_points(iter)
    }
}
