pub mod aabb;
pub mod intersect_3d;
pub mod polygon_2d;

pub use aabb::Aabb;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global numeric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Geometric tolerance given to shapes built without an explicit one.
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Angular tolerance (radians) under which two directions are considered equal.
pub const ANGULAR_TOLERANCE: f64 = 1e-9;
