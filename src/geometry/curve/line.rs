use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// An infinite line defined by an origin point and a unit direction.
///
/// The parametric form is `P(t) = origin + t * direction`, so `t` measures
/// arc length from the origin.
#[derive(Debug, Clone)]
pub struct Line {
    origin: Point3,
    direction: Vector3,
}

impl Line {
    /// Creates a new line from an origin and direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vector is zero-length.
    pub fn new(origin: Point3, direction: Vector3) -> Result<Self> {
        let len = direction.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            origin,
            direction: direction / len,
        })
    }

    /// Creates the line through `a` and `b`, parametrised so that `a` is at 0
    /// and `b` at `|b - a|`.
    ///
    /// # Errors
    ///
    /// Returns an error if the points coincide.
    pub fn through(a: &Point3, b: &Point3) -> Result<Self> {
        Self::new(*a, b - a)
    }

    /// Returns the origin point of the line.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit direction vector of the line.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// Unbounded parameter of the orthogonal projection of `point`.
    #[must_use]
    pub fn parameter_of(&self, point: &Point3) -> f64 {
        (point - self.origin).dot(&self.direction)
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.origin + self.direction * t)
    }

    fn tangent(&self, _t: f64) -> Result<Vector3> {
        Ok(self.direction)
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn speed(&self) -> f64 {
        1.0
    }

    fn closest_parameter(&self, point: &Point3, t_min: f64, t_max: f64) -> f64 {
        self.parameter_of(point).clamp(t_min, t_max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn through_points_is_arc_length_parametrised() {
        let a = Point3::new(1.0, 1.0, 0.0);
        let b = Point3::new(4.0, 5.0, 0.0);
        let line = Line::through(&a, &b).unwrap();
        let end = line.evaluate(5.0).unwrap();
        assert_relative_eq!(end, b, epsilon = 1e-12);
    }

    #[test]
    fn closest_parameter_is_clamped() {
        let line = Line::new(Point3::origin(), Vector3::x()).unwrap();
        let p = Point3::new(7.0, 2.0, 0.0);
        assert_relative_eq!(line.closest_parameter(&p, 0.0, 10.0), 7.0);
        assert_relative_eq!(line.closest_parameter(&p, 0.0, 5.0), 5.0);
    }

    #[test]
    fn zero_direction_is_rejected() {
        assert!(Line::new(Point3::origin(), Vector3::zeros()).is_err());
    }
}
