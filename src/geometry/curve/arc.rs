use std::f64::consts::TAU;

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// A circular arc in 3D space.
///
/// Defined by a center, radius, normal axis, and a reference direction
/// for the zero-angle. The parameter is the angle in radians, swept
/// counter-clockwise around the normal from `start_angle` to `end_angle`.
#[derive(Debug, Clone)]
pub struct Arc {
    center: Point3,
    radius: f64,
    normal: Vector3,
    ref_dir: Vector3,
    start_angle: f64,
    end_angle: f64,
}

impl Arc {
    /// Creates a new arc.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the arc circle
    /// * `radius` - Radius (must be positive)
    /// * `normal` - Normal vector defining the arc plane
    /// * `ref_dir` - Reference direction for angle = 0 (must be perpendicular to normal)
    /// * `start_angle` - Start angle in radians
    /// * `end_angle` - End angle in radians, greater than `start_angle`
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, the normal is zero-length,
    /// the reference direction is not perpendicular to the normal, or the
    /// sweep is empty or exceeds a full turn.
    pub fn new(
        center: Point3,
        radius: f64,
        normal: Vector3,
        ref_dir: Vector3,
        start_angle: f64,
        end_angle: f64,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(GeometryError::Degenerate("arc radius must be positive".into()).into());
        }

        let normal_len = normal.norm();
        if normal_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / normal_len;

        let ref_len = ref_dir.norm();
        if ref_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let ref_dir = ref_dir / ref_len;

        if normal.dot(&ref_dir).abs() > 1e-9 {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to normal".into(),
            )
            .into());
        }

        let sweep = end_angle - start_angle;
        if sweep <= TOLERANCE || sweep > TAU + TOLERANCE {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "sweep",
                value: sweep,
                min: 0.0,
                max: TAU,
            }
            .into());
        }

        Ok(Self {
            center,
            radius,
            normal,
            ref_dir,
            start_angle,
            end_angle,
        })
    }

    /// Returns the center of the arc.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius of the arc.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the normal vector of the arc plane.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Returns the zero-angle direction.
    #[must_use]
    pub fn ref_dir(&self) -> &Vector3 {
        &self.ref_dir
    }

    /// Computes the second axis direction (perpendicular to both normal and `ref_dir`).
    #[must_use]
    pub fn binormal(&self) -> Vector3 {
        self.normal.cross(&self.ref_dir)
    }

    /// Angle of the projection of `point` onto the arc plane, in `[t_min, t_min + 2π)`.
    #[must_use]
    pub fn angle_of(&self, point: &Point3, t_min: f64) -> f64 {
        let d = point - self.center;
        let angle = d.dot(&self.binormal()).atan2(d.dot(&self.ref_dir));
        t_min + (angle - t_min).rem_euclid(TAU)
    }
}

impl Curve for Arc {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let x = self.radius * t.cos();
        let y = self.radius * t.sin();
        Ok(self.center + self.ref_dir * x + binormal * y)
    }

    fn tangent(&self, t: f64) -> Result<Vector3> {
        let binormal = self.binormal();
        let tangent = self.ref_dir * -t.sin() + binormal * t.cos();
        let len = tangent.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(tangent / len)
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(self.start_angle, self.end_angle)
    }

    fn is_closed(&self) -> bool {
        (self.end_angle - self.start_angle - TAU).abs() < TOLERANCE
    }

    fn speed(&self) -> f64 {
        self.radius
    }

    fn closest_parameter(&self, point: &Point3, t_min: f64, t_max: f64) -> f64 {
        let d = point - self.center;
        let in_plane = d - self.normal * d.dot(&self.normal);
        if in_plane.norm() < TOLERANCE {
            return t_min;
        }
        let angle = self.angle_of(point, t_min);
        if angle <= t_max {
            return angle;
        }
        // Outside the sweep: snap to the nearer end.
        if angle - t_max < t_min + TAU - angle {
            t_max
        } else {
            t_min
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn quarter() -> Arc {
        Arc::new(Point3::origin(), 2.0, Vector3::z(), Vector3::x(), 0.0, FRAC_PI_2).unwrap()
    }

    #[test]
    fn evaluates_counter_clockwise() {
        let arc = quarter();
        assert_relative_eq!(
            arc.evaluate(0.0).unwrap(),
            Point3::new(2.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            arc.evaluate(FRAC_PI_2).unwrap(),
            Point3::new(0.0, 2.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(arc.tangent(0.0).unwrap(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn closest_parameter_inside_and_outside_sweep() {
        let arc = quarter();
        let t = arc.closest_parameter(&Point3::new(1.0, 1.0, 3.0), 0.0, FRAC_PI_2);
        assert_relative_eq!(t, PI / 4.0, epsilon = 1e-12);
        let t = arc.closest_parameter(&Point3::new(1.0, -0.1, 0.0), 0.0, FRAC_PI_2);
        assert_relative_eq!(t, 0.0);
        let t = arc.closest_parameter(&Point3::new(-0.1, 1.0, 0.0), 0.0, FRAC_PI_2);
        assert_relative_eq!(t, FRAC_PI_2);
    }

    #[test]
    fn rejects_bad_sweep_and_radius() {
        assert!(Arc::new(Point3::origin(), 1.0, Vector3::z(), Vector3::x(), 1.0, 1.0).is_err());
        assert!(Arc::new(Point3::origin(), 0.0, Vector3::z(), Vector3::x(), 0.0, 1.0).is_err());
        assert!(Arc::new(Point3::origin(), 1.0, Vector3::z(), Vector3::z(), 0.0, 1.0).is_err());
    }
}
