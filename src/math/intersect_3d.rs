use crate::geometry::surface::Plane;

use super::{Point3, Vector3, ANGULAR_TOLERANCE, TOLERANCE};

/// Relationship between two planes.
#[derive(Debug)]
pub enum PlanePairRelation {
    /// Planes intersect along a line.
    IntersectionLine {
        origin: Point3,
        direction: Vector3,
    },
    /// Planes are parallel but not coincident.
    Parallel { distance: f64 },
    /// Planes are the same (coincident).
    Coincident,
}

/// Computes the intersection of two planes.
///
/// `tolerance` is the distance under which parallel planes are coincident.
/// The returned `direction` is unit length and its origin is the point of
/// the line closest to `a`'s origin.
#[must_use]
pub fn plane_plane_intersect(a: &Plane, b: &Plane, tolerance: f64) -> PlanePairRelation {
    let na = a.plane_normal();
    let nb = b.plane_normal();

    let dir = na.cross(nb);
    let dir_len = dir.norm();

    if dir_len < ANGULAR_TOLERANCE {
        let dist = (b.origin() - a.origin()).dot(na).abs();
        return if dist <= tolerance {
            PlanePairRelation::Coincident
        } else {
            PlanePairRelation::Parallel { distance: dist }
        };
    }
    let dir = dir / dir_len;

    // p = oa + s * na + t * nb satisfies both plane equations.
    let d2 = nb.dot(&(b.origin() - a.origin()));
    let dot_nn = na.dot(nb);
    let denom = 1.0 - dot_nn * dot_nn;
    let s = -dot_nn * d2 / denom;
    let t = d2 / denom;
    let origin = a.origin() + na * s + nb * t;
    // Slide the origin next to a's origin along the line.
    let origin = origin + dir * (a.origin() - origin).dot(&dir);

    PlanePairRelation::IntersectionLine {
        origin,
        direction: dir,
    }
}

/// Relationship of a line with a plane.
#[derive(Debug)]
pub enum LinePlaneRelation {
    /// Line intersects the plane at a single point.
    Point { point: Point3, t: f64 },
    /// Line is parallel to the plane (does not intersect).
    Parallel,
    /// Line lies in the plane, within tolerance.
    OnPlane,
}

/// Computes the intersection of the line `origin + t * dir` with a plane.
#[must_use]
pub fn line_plane_intersect(
    origin: &Point3,
    dir: &Vector3,
    plane: &Plane,
    tolerance: f64,
) -> LinePlaneRelation {
    let normal = plane.plane_normal();
    let denom = normal.dot(dir);
    let numer = normal.dot(&(plane.origin() - origin));

    if denom.abs() < TOLERANCE * dir.norm().max(1.0) {
        if numer.abs() <= tolerance {
            LinePlaneRelation::OnPlane
        } else {
            LinePlaneRelation::Parallel
        }
    } else {
        let t = numer / denom;
        LinePlaneRelation::Point {
            point: origin + dir * t,
            t,
        }
    }
}

/// Signed distance from a point to a plane; positive on the normal side.
#[must_use]
pub fn signed_distance_to_plane(point: &Point3, plane: &Plane) -> f64 {
    plane.plane_normal().dot(&(point - plane.origin()))
}

/// Closest points between two infinite lines `p1 + s * d1` and `p2 + t * d2`.
///
/// Returns `(s, t)`, or `None` when the lines are parallel.
#[must_use]
pub fn line_line_closest(
    p1: &Point3,
    d1: &Vector3,
    p2: &Point3,
    d2: &Vector3,
) -> Option<(f64, f64)> {
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let b = d1.dot(d2);
    let c = d1.dot(&r);
    let f = d2.dot(&r);
    let denom = a * e - b * b;
    if denom.abs() < TOLERANCE * a.max(e).max(1.0) {
        return None;
    }
    let s = (b * f - c * e) / denom;
    let t = (a * f - b * c) / denom;
    Some((s, t))
}
