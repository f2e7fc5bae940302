pub mod binomial;
pub mod cancellation;
pub mod floating_point;
pub mod plane;
pub mod ray;
pub mod trigonometry;
pub mod unique;

pub use binomial::*;
pub use cancellation::*;
pub use floating_point::*;
pub use plane::*;
pub use ray::*;
pub use trigonometry::*;
pub use unique::*;
