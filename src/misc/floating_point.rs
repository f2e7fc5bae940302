use nalgebra::RealField;
use num_traits::ToPrimitive;
use simba::scalar::SupersetOf;

/// Trait for floating point types (f32, f64)
/// Every point, parameter and tolerance in the crate is expressed with this scalar
pub trait FloatingPoint: RealField + ToPrimitive + Copy {
    /// Convert an `f64` constant into the scalar type
    fn constant(value: f64) -> Self {
        Self::from_subset(&value)
    }
}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}
