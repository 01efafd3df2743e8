use crate::error::{GeometryError, Result};
use crate::math::{Point2, Vector2, TOLERANCE};

/// A line in a surface's parameter plane, used as a pcurve.
///
/// `P(t) = origin + t * direction`, with the same parametrisation as the 3D
/// curve it shadows.
#[derive(Debug, Clone, PartialEq)]
pub struct Line2d {
    origin: Point2,
    direction: Vector2,
}

impl Line2d {
    /// Creates a 2D line; `direction` keeps its length.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vector is zero-length.
    pub fn new(origin: Point2, direction: Vector2) -> Result<Self> {
        if direction.norm() < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self { origin, direction })
    }

    /// Returns the origin point.
    #[must_use]
    pub fn origin(&self) -> &Point2 {
        &self.origin
    }

    /// Returns the direction (derivative) of the line.
    #[must_use]
    pub fn direction(&self) -> &Vector2 {
        &self.direction
    }

    /// Evaluates the line at `t`.
    #[must_use]
    pub fn evaluate(&self, t: f64) -> Point2 {
        self.origin + self.direction * t
    }
}
