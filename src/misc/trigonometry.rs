use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OPoint, RealField};

/// Check whether three points are collinear within `tolerance`
/// (squared parallelogram area in 3D, signed area in 2D).
pub fn three_points_are_flat<T: RealField + Copy, D: DimName>(
    p1: &OPoint<T, D>,
    p2: &OPoint<T, D>,
    p3: &OPoint<T, D>,
    tolerance: T,
) -> bool
where
    DefaultAllocator: Allocator<D>,
{
    let p21 = p2 - p1;
    let p31 = p3 - p1;
    match D::dim() {
        2 => (p21[0] * p31[1] - p21[1] * p31[0]).abs() < tolerance,
        3 => {
            let norm = p21.cross(&p31);
            norm.dot(&norm) < tolerance
        }
        _ => {
            // Gram determinant: |a|^2 |b|^2 - (a.b)^2 is the squared area in any dimension
            let ab = p21.dot(&p31);
            p21.dot(&p21) * p31.dot(&p31) - ab * ab < tolerance
        }
    }
}
