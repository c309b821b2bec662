pub mod distance_2d;
pub mod intersect_2d;
pub mod polygon_2d;
pub mod scale;

/// 2D point type (physical cross-section coordinates, y pointing up).
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;
