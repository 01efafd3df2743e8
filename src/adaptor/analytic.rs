use std::f64::consts::TAU;

use crate::error::Result;
use crate::geometry::curve::{Arc, Curve, Line};
use crate::geometry::curve2d::Line2d;
use crate::geometry::surface::Plane;
use crate::math::intersect_3d::{
    line_line_closest, line_plane_intersect, plane_plane_intersect, signed_distance_to_plane,
    LinePlaneRelation, PlanePairRelation,
};
use crate::math::polygon_2d::{distance_to_loops, point_in_loops};
use crate::math::{Point2, Point3, Vector3, ANGULAR_TOLERANCE, TOLERANCE};
use crate::topology::{EdgeCurve, EdgeData, FaceData};

use super::{
    CurveHit, CurveProjection, CurveSurfaceHit, GeometryAdaptor, PointState, SectionGeometry,
    SurfaceHit,
};

/// Closed-form intersections for lines, arcs and planes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticAdaptor;

/// Clamps `t` into the edge range when it lies within `ptol` of it.
fn clamp_to_edge(edge: &EdgeData, t: f64, ptol: f64) -> Option<f64> {
    (t >= edge.t_start - ptol && t <= edge.t_end + ptol).then(|| t.clamp(edge.t_start, edge.t_end))
}

/// Angle of `point` on an arc edge, if it falls inside the edge's sweep.
fn arc_parameter(edge: &EdgeData, arc: &Arc, point: &Point3, ptol: f64) -> Option<f64> {
    let angle = arc.angle_of(point, edge.t_start);
    if angle <= edge.t_end + ptol {
        Some(angle.min(edge.t_end))
    } else if edge.t_start + TAU - angle <= ptol {
        Some(edge.t_start)
    } else {
        None
    }
}

/// Parameter of `point` on the edge curve, if inside the bounded range.
fn edge_parameter(edge: &EdgeData, point: &Point3, tolerance: f64) -> Option<f64> {
    let ptol = edge.parametric_tolerance(tolerance);
    match &edge.curve {
        EdgeCurve::Line(line) => clamp_to_edge(edge, line.parameter_of(point), ptol),
        EdgeCurve::Arc(arc) => arc_parameter(edge, arc, point, ptol),
    }
}

/// Parameters along the unit-speed line `origin + t * dir` where it meets
/// the full circle of `arc`.
fn circle_line(arc: &Arc, origin: &Point3, dir: &Vector3, tolerance: f64) -> Vec<f64> {
    let n = arc.normal();
    let c = arc.center();
    let r = arc.radius();
    let off = origin - c;
    let denom = n.dot(dir);

    if denom.abs() < ANGULAR_TOLERANCE {
        if n.dot(&off).abs() > tolerance {
            return Vec::new();
        }
        let b = off.dot(dir);
        let dist = (off.norm_squared() - b * b).max(0.0).sqrt();
        if dist > r + tolerance {
            return Vec::new();
        }
        let half = (r * r - dist * dist).max(0.0).sqrt();
        if half <= tolerance {
            vec![-b]
        } else {
            vec![-b - half, -b + half]
        }
    } else {
        let t = n.dot(&(c - origin)) / denom;
        let p = origin + dir * t;
        if ((p - c).norm() - r).abs() <= tolerance {
            vec![t]
        } else {
            Vec::new()
        }
    }
}

fn point_hit(
    a: &EdgeData,
    t1: f64,
    b: &EdgeData,
    t2: f64,
    tolerance: f64,
) -> Result<Option<CurveHit>> {
    let pa = a.point_at(t1)?;
    let pb = b.point_at(t2)?;
    if (pa - pb).norm() > tolerance {
        return Ok(None);
    }
    Ok(Some(CurveHit::Point {
        t1,
        t2,
        point: nalgebra::center(&pa, &pb),
    }))
}

fn push_unique(hits: &mut Vec<CurveHit>, hit: CurveHit, tolerance: f64) {
    let duplicate = hits.iter().any(|h| match (h, &hit) {
        (CurveHit::Point { point: p, .. }, CurveHit::Point { point: q, .. }) => {
            (p - q).norm() <= tolerance
        }
        _ => false,
    });
    if !duplicate {
        hits.push(hit);
    }
}

impl AnalyticAdaptor {
    fn line_line(
        a: &EdgeData,
        la: &Line,
        b: &EdgeData,
        lb: &Line,
        tolerance: f64,
    ) -> Result<Vec<CurveHit>> {
        let da = la.direction();
        let db = lb.direction();
        let pa_tol = a.parametric_tolerance(tolerance);
        let pb_tol = b.parametric_tolerance(tolerance);

        if da.cross(db).norm() < ANGULAR_TOLERANCE {
            let off = lb.origin() - la.origin();
            if (off - da * off.dot(da)).norm() > tolerance {
                return Ok(Vec::new());
            }
            let s0 = la.parameter_of(&b.point_at(b.t_start)?);
            let s1 = la.parameter_of(&b.point_at(b.t_end)?);
            let lo = a.t_start.max(s0.min(s1));
            let hi = a.t_end.min(s0.max(s1));
            if hi - lo > pa_tol {
                let u0 = lb.parameter_of(&a.point_at(lo)?);
                let u1 = lb.parameter_of(&a.point_at(hi)?);
                return Ok(vec![CurveHit::Overlap {
                    range1: (lo, hi),
                    range2: (u0.min(u1).max(b.t_start), u0.max(u1).min(b.t_end)),
                }]);
            }
            if hi - lo >= -pa_tol {
                let t1 = (0.5 * (lo + hi)).clamp(a.t_start, a.t_end);
                let t2 = lb.parameter_of(&a.point_at(t1)?).clamp(b.t_start, b.t_end);
                return Ok(point_hit(a, t1, b, t2, tolerance)?.into_iter().collect());
            }
            return Ok(Vec::new());
        }

        let Some((s, t)) = line_line_closest(la.origin(), da, lb.origin(), db) else {
            return Ok(Vec::new());
        };
        let (Some(s), Some(t)) = (clamp_to_edge(a, s, pa_tol), clamp_to_edge(b, t, pb_tol)) else {
            return Ok(Vec::new());
        };
        Ok(point_hit(a, s, b, t, tolerance)?.into_iter().collect())
    }

    /// Hits between a line edge `a` and an arc edge `b`, parameters in that order.
    fn line_arc(
        a: &EdgeData,
        line: &Line,
        b: &EdgeData,
        arc: &Arc,
        tolerance: f64,
    ) -> Result<Vec<CurveHit>> {
        let pa_tol = a.parametric_tolerance(tolerance);
        let pb_tol = b.parametric_tolerance(tolerance);
        let mut hits = Vec::new();
        for t in circle_line(arc, line.origin(), line.direction(), tolerance) {
            let Some(t1) = clamp_to_edge(a, t, pa_tol) else {
                continue;
            };
            let p = a.point_at(t1)?;
            let Some(t2) = arc_parameter(b, arc, &p, pb_tol) else {
                continue;
            };
            if let Some(hit) = point_hit(a, t1, b, t2, tolerance)? {
                push_unique(&mut hits, hit, tolerance);
            }
        }
        Ok(hits)
    }

    fn arc_arc(
        a: &EdgeData,
        ca: &Arc,
        b: &EdgeData,
        cb: &Arc,
        tolerance: f64,
    ) -> Result<Vec<CurveHit>> {
        let na = ca.normal();
        let nb = cb.normal();
        let mut candidates: Vec<Point3> = Vec::new();

        if na.cross(nb).norm() < ANGULAR_TOLERANCE {
            if na.dot(&(cb.center() - ca.center())).abs() > tolerance {
                return Ok(Vec::new());
            }
            let axis = cb.center() - ca.center();
            let d = axis.norm();
            let (ra, rb) = (ca.radius(), cb.radius());
            if d <= tolerance && (ra - rb).abs() <= tolerance {
                return Self::arc_overlap(a, ca, b, cb, tolerance);
            }
            if d < TOLERANCE || d > ra + rb + tolerance || d < (ra - rb).abs() - tolerance {
                return Ok(Vec::new());
            }
            let u = axis / d;
            let w = na.cross(&u);
            let x = (ra * ra - rb * rb + d * d) / (2.0 * d);
            let h = (ra * ra - x * x).max(0.0).sqrt();
            let foot = ca.center() + u * x;
            candidates.push(foot - w * h);
            if h > tolerance {
                candidates.push(foot + w * h);
            }
        } else {
            let pa = Plane::from_normal(*ca.center(), *na)?;
            let pb = Plane::from_normal(*cb.center(), *nb)?;
            if let PlanePairRelation::IntersectionLine { origin, direction } =
                plane_plane_intersect(&pa, &pb, tolerance)
            {
                for t in circle_line(ca, &origin, &direction, tolerance) {
                    let p = origin + direction * t;
                    if ((p - cb.center()).norm() - cb.radius()).abs() <= tolerance {
                        candidates.push(p);
                    }
                }
            }
        }

        let pa_tol = a.parametric_tolerance(tolerance);
        let pb_tol = b.parametric_tolerance(tolerance);
        let mut hits = Vec::new();
        for p in candidates {
            let (Some(t1), Some(t2)) = (
                arc_parameter(a, ca, &p, pa_tol),
                arc_parameter(b, cb, &p, pb_tol),
            ) else {
                continue;
            };
            if let Some(hit) = point_hit(a, t1, b, t2, tolerance)? {
                push_unique(&mut hits, hit, tolerance);
            }
        }
        Ok(hits)
    }

    /// Common stretches of two arcs on the same circle.
    fn arc_overlap(
        a: &EdgeData,
        ca: &Arc,
        b: &EdgeData,
        cb: &Arc,
        tolerance: f64,
    ) -> Result<Vec<CurveHit>> {
        let sweep_b = b.t_end - b.t_start;
        // Where b's sweep starts when walked in a's direction.
        let entry = if ca.normal().dot(cb.normal()) > 0.0 {
            b.point_at(b.t_start)?
        } else {
            b.point_at(b.t_end)?
        };
        let s = ca.angle_of(&entry, a.t_start);
        let pa_tol = a.parametric_tolerance(tolerance);

        let mut hits = Vec::new();
        for k in [-1.0, 0.0] {
            let lo = a.t_start.max(s + k * TAU);
            let hi = a.t_end.min(s + sweep_b + k * TAU);
            if hi - lo <= pa_tol {
                continue;
            }
            let u0 = cb.closest_parameter(&a.point_at(lo)?, b.t_start, b.t_end);
            let u1 = cb.closest_parameter(&a.point_at(hi)?, b.t_start, b.t_end);
            hits.push(CurveHit::Overlap {
                range1: (lo, hi),
                range2: (u0.min(u1), u0.max(u1)),
            });
        }
        Ok(hits)
    }
}

impl GeometryAdaptor for AnalyticAdaptor {
    fn intersect_curves(
        &self,
        a: &EdgeData,
        b: &EdgeData,
        tolerance: f64,
    ) -> Result<Vec<CurveHit>> {
        match (&a.curve, &b.curve) {
            (EdgeCurve::Line(la), EdgeCurve::Line(lb)) => Self::line_line(a, la, b, lb, tolerance),
            (EdgeCurve::Line(line), EdgeCurve::Arc(arc)) => {
                Self::line_arc(a, line, b, arc, tolerance)
            }
            (EdgeCurve::Arc(arc), EdgeCurve::Line(line)) => {
                let swapped = Self::line_arc(b, line, a, arc, tolerance)?;
                Ok(swapped
                    .into_iter()
                    .map(|hit| match hit {
                        CurveHit::Point { t1, t2, point } => CurveHit::Point {
                            t1: t2,
                            t2: t1,
                            point,
                        },
                        CurveHit::Overlap { range1, range2 } => CurveHit::Overlap {
                            range1: range2,
                            range2: range1,
                        },
                    })
                    .collect())
            }
            (EdgeCurve::Arc(ca), EdgeCurve::Arc(cb)) => Self::arc_arc(a, ca, b, cb, tolerance),
        }
    }

    fn project_point(&self, curve: &EdgeData, point: &Point3) -> Result<CurveProjection> {
        let parameter = curve
            .curve
            .as_curve()
            .closest_parameter(point, curve.t_start, curve.t_end);
        let distance = (point - curve.point_at(parameter)?).norm();
        Ok(CurveProjection { parameter, distance })
    }

    fn intersect_surfaces(&self, a: &FaceData, b: &FaceData, tolerance: f64) -> Result<SurfaceHit> {
        match plane_plane_intersect(a.surface.plane(), b.surface.plane(), tolerance) {
            PlanePairRelation::Parallel { .. } => Ok(SurfaceHit::Disjoint),
            PlanePairRelation::Coincident => Ok(SurfaceHit::Coincident),
            PlanePairRelation::IntersectionLine { origin, direction } => {
                let curve = Line::new(origin, direction)?;
                let pcurve_a = Line2d::new(a.to_frame(&origin), a.direction_to_frame(&direction))?;
                let pcurve_b = Line2d::new(b.to_frame(&origin), b.direction_to_frame(&direction))?;
                Ok(SurfaceHit::Curves(vec![SectionGeometry {
                    curve,
                    pcurve_a,
                    pcurve_b,
                }]))
            }
        }
    }

    fn intersect_curve_surface(
        &self,
        curve: &EdgeData,
        surface: &FaceData,
        tolerance: f64,
    ) -> Result<CurveSurfaceHit> {
        let plane = surface.surface.plane();
        match &curve.curve {
            EdgeCurve::Line(line) => {
                let d0 = signed_distance_to_plane(&curve.point_at(curve.t_start)?, plane);
                let d1 = signed_distance_to_plane(&curve.point_at(curve.t_end)?, plane);
                if d0.abs() <= tolerance && d1.abs() <= tolerance {
                    return Ok(CurveSurfaceHit::OnSurface);
                }
                let t = if d0.abs() <= tolerance {
                    curve.t_start
                } else if d1.abs() <= tolerance {
                    curve.t_end
                } else if d0.signum() != d1.signum() {
                    match line_plane_intersect(line.origin(), line.direction(), plane, tolerance) {
                        LinePlaneRelation::Point { t, .. } => t.clamp(curve.t_start, curve.t_end),
                        LinePlaneRelation::Parallel | LinePlaneRelation::OnPlane => {
                            return Ok(CurveSurfaceHit::Points(Vec::new()));
                        }
                    }
                } else {
                    return Ok(CurveSurfaceHit::Points(Vec::new()));
                };
                Ok(CurveSurfaceHit::Points(vec![(t, curve.point_at(t)?)]))
            }
            EdgeCurve::Arc(arc) => {
                if arc.normal().cross(plane.plane_normal()).norm() < ANGULAR_TOLERANCE {
                    return Ok(if signed_distance_to_plane(arc.center(), plane).abs() <= tolerance {
                        CurveSurfaceHit::OnSurface
                    } else {
                        CurveSurfaceHit::Points(Vec::new())
                    });
                }
                let arc_plane = Plane::from_normal(*arc.center(), *arc.normal())?;
                let PlanePairRelation::IntersectionLine { origin, direction } =
                    plane_plane_intersect(&arc_plane, plane, tolerance)
                else {
                    return Ok(CurveSurfaceHit::Points(Vec::new()));
                };
                let mut points: Vec<(f64, Point3)> = Vec::new();
                for s in circle_line(arc, &origin, &direction, tolerance) {
                    let p = origin + direction * s;
                    if let Some(t) = edge_parameter(curve, &p, tolerance) {
                        let ptol = curve.parametric_tolerance(tolerance);
                        if points.iter().all(|(u, _)| (u - t).abs() > ptol) {
                            points.push((t, curve.point_at(t)?));
                        }
                    }
                }
                points.sort_by(|x, y| x.0.total_cmp(&y.0));
                Ok(CurveSurfaceHit::Points(points))
            }
        }
    }

    fn classify_2d(&self, point: &Point2, boundary: &[Vec<Point2>], tolerance: f64) -> PointState {
        if distance_to_loops(point, boundary) <= tolerance {
            PointState::On
        } else if point_in_loops(point, boundary) {
            PointState::In
        } else {
            PointState::Out
        }
    }
}
