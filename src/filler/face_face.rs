use tracing::{debug, instrument};

use crate::adaptor::{GeometryAdaptor, PointState, SectionGeometry, SurfaceHit};
use crate::error::Result;
use crate::geometry::curve::Line;
use crate::geometry::curve2d::Line2d;
use crate::interference::{CommonRegion, FaceFaceGeometry, Interference, SectionCurve};
use crate::math::polygon_2d::{
    clip_polygon_convex, clip_segment_to_loops, is_convex, segment_segment_intersect, signed_area,
};
use crate::math::intersect_3d::line_line_closest;
use crate::math::{Point2, Point3};
use crate::pave::{Pave, PaveOrigin};
use crate::pool::{Operand, ShapeIndex, ShapePool};
use crate::topology::{FaceData, ShapeKind, TopologyStore};

use super::{map_pairs, FillerState};

struct TrimmedSection {
    geometry: SectionGeometry,
    range: (f64, f64),
    is_new: bool,
}

enum FaceFaceHit {
    SameDomain(Option<CommonRegion>),
    Sections(Vec<TrimmedSection>, f64),
}

/// Boundary loops of `face` expressed in the frame of `frame`.
fn loops_in_frame(
    store: &TopologyStore,
    frame: &FaceData,
    face: &FaceData,
) -> Result<Vec<Vec<Point2>>> {
    std::iter::once(face.outer_wire)
        .chain(face.inner_wires.iter().copied())
        .map(|w| Ok(store.wire_polyline(w)?.iter().map(|p| frame.to_frame(p)).collect()))
        .collect()
}

/// Points strictly inside the polygon `outline`, as seen from `loops`.
fn interior_samples<'a, A: GeometryAdaptor>(
    adaptor: &'a A,
    outline: &'a [Point2],
    loops: &'a [Vec<Point2>],
    tolerance: f64,
) -> impl Iterator<Item = Point2> + 'a {
    let n = outline.len();
    (0..n)
        .map(move |i| nalgebra::center(&outline[(i + n - 1) % n], &outline[(i + 1) % n]))
        .filter(move |p| adaptor.classify_2d(p, loops, tolerance) == PointState::In)
}

/// Overlap of two coplanar faces, in the frame of `a`.
///
/// Returns `None` when the faces only touch.
fn coplanar_overlap<A: GeometryAdaptor>(
    adaptor: &A,
    store: &TopologyStore,
    a: &FaceData,
    b: &FaceData,
    tolerance: f64,
) -> Result<Option<FaceFaceHit>> {
    let loops_a = loops_in_frame(store, a, a)?;
    let loops_b = loops_in_frame(store, a, b)?;
    let (outer_a, outer_b) = (&loops_a[0], &loops_b[0]);

    if loops_a.len() == 1 && loops_b.len() == 1 && is_convex(outer_a) && is_convex(outer_b) {
        let clipped = clip_polygon_convex(outer_a, outer_b);
        let area = signed_area(&clipped).abs();
        if area <= tolerance {
            return Ok(None);
        }
        let boundary = clipped.iter().map(|p| a.from_frame(p)).collect();
        return Ok(Some(FaceFaceHit::SameDomain(Some(CommonRegion { boundary, area }))));
    }

    let strictly_in = |p: &Point2, loops: &[Vec<Point2>]| {
        adaptor.classify_2d(p, loops, tolerance) == PointState::In
    };
    let vertex_inside = outer_a.iter().any(|p| strictly_in(p, &loops_b))
        || outer_b.iter().any(|p| strictly_in(p, &loops_a));
    let crossing = outer_a.iter().enumerate().any(|(i, a0)| {
        let a1 = &outer_a[(i + 1) % outer_a.len()];
        outer_b.iter().enumerate().any(|(j, b0)| {
            let b1 = &outer_b[(j + 1) % outer_b.len()];
            segment_segment_intersect(a0, a1, b0, b1)
                .is_some_and(|(t, u)| t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0)
        })
    });
    let sample_inside =
        interior_samples(adaptor, outer_a, &loops_a, tolerance).any(|p| strictly_in(&p, &loops_b));
    Ok((vertex_inside || crossing || sample_inside).then_some(FaceFaceHit::SameDomain(None)))
}

/// Parameter intervals of the section line inside both faces.
fn trim_section(
    store: &TopologyStore,
    (a, loops_a): (&FaceData, &[Vec<Point2>]),
    (b, loops_b): (&FaceData, &[Vec<Point2>]),
    section: &SectionGeometry,
    tolerance: f64,
) -> Result<Vec<(f64, f64)>> {
    let line = &section.curve;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for wire in [a.outer_wire, b.outer_wire] {
        for p in store.wire_polyline(wire)? {
            let s = line.parameter_of(&p);
            lo = lo.min(s);
            hi = hi.max(s);
        }
    }
    lo -= 1.0;
    hi += 1.0;
    let span = hi - lo;

    let clip = |pcurve: &Line2d, loops: &[Vec<Point2>]| -> Vec<(f64, f64)> {
        clip_segment_to_loops(&pcurve.evaluate(lo), &pcurve.evaluate(hi), loops)
            .into_iter()
            .map(|(f0, f1)| (lo + f0 * span, lo + f1 * span))
            .collect()
    };
    let in_a = clip(&section.pcurve_a, loops_a);
    let in_b = clip(&section.pcurve_b, loops_b);

    let mut ranges = Vec::new();
    for &(a0, a1) in &in_a {
        for &(b0, b1) in &in_b {
            let (s0, s1) = (a0.max(b0), a1.min(b1));
            if s1 - s0 > tolerance {
                ranges.push((s0, s1));
            }
        }
    }
    Ok(ranges)
}

/// Returns `true` if every point lies on some edge of the two faces.
fn runs_along_edges<A: GeometryAdaptor>(
    adaptor: &A,
    store: &TopologyStore,
    pool: &ShapePool,
    faces: (ShapeIndex, ShapeIndex),
    points: &[Point3],
    tolerance: f64,
) -> Result<bool> {
    let mut edges = pool.face_edges(faces.0);
    edges.extend(pool.face_edges(faces.1));
    for p in points {
        let mut on_edge = false;
        for &e in &edges {
            let ed = store.edge(pool.edge_id(e)?)?;
            if adaptor.project_point(ed, p)?.distance <= tolerance + ed.tolerance {
                on_edge = true;
                break;
            }
        }
        if !on_edge {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Paves of a new section: vertices already found on either face that lie
/// on the section, plus new vertices at its ends when none is there.
fn section_paves(
    state: &mut FillerState,
    store: &mut TopologyStore,
    (f1, f2): (ShapeIndex, ShapeIndex),
    section: &TrimmedSection,
    tolerance: f64,
) -> Result<Vec<Pave>> {
    let pool = &state.pool;
    let mut candidates: Vec<ShapeIndex> = Vec::new();
    for face in [f1, f2] {
        for e in pool.face_edges(face) {
            if let Some(set) = state.pave_sets.get(&e) {
                candidates.extend(set.paves().iter().map(|p| pool.real_vertex(p.vertex)));
            }
        }
    }
    candidates.extend(state.interferences.iter().filter_map(|i| match *i {
        Interference::VertexFace { vertex, face, .. } if face == f1 || face == f2 => {
            Some(pool.real_vertex(vertex))
        }
        _ => None,
    }));
    candidates.sort_unstable();
    candidates.dedup();

    let line = &section.geometry.curve;
    let (s0, s1) = section.range;
    let mut paves: Vec<Pave> = Vec::new();
    for v in candidates {
        let vd = store.vertex(pool.vertex_id(v)?)?;
        let s = line.parameter_of(&vd.point);
        if s < s0 - tolerance || s > s1 + tolerance {
            continue;
        }
        let foot = line.origin() + line.direction() * s;
        if (vd.point - foot).norm() <= vd.tolerance + tolerance {
            paves.push(Pave::new(v, s.clamp(s0, s1), PaveOrigin::FaceFace));
        }
    }
    paves.sort_by(Pave::order);
    paves.dedup_by(|later, kept| later.parameter - kept.parameter <= tolerance);

    let operand = state.pool.operand(f1).merge(state.pool.operand(f2));
    let starts_at_vertex = paves.first().is_some_and(|p| p.parameter - s0 <= tolerance);
    if !starts_at_vertex {
        let v = state.new_vertex(store, line.origin() + line.direction() * s0, tolerance, operand);
        paves.insert(0, Pave::new(v, s0, PaveOrigin::FaceFace));
    }
    let ends_at_vertex = paves
        .last()
        .is_some_and(|p| s1 - p.parameter <= tolerance && paves.len() > 1);
    if !ends_at_vertex {
        let v = state.new_vertex(store, line.origin() + line.direction() * s1, tolerance, operand);
        paves.push(Pave::new(v, s1, PaveOrigin::FaceFace));
    }
    Ok(paves)
}

/// A new section of a face/face record, by record and curve position.
struct SectionRef {
    record: usize,
    curve: usize,
    faces: (ShapeIndex, ShapeIndex),
    line: Line,
    range: (f64, f64),
}

impl SectionRef {
    fn shares_face(&self, other: &SectionRef) -> bool {
        let (a, b) = self.faces;
        a == other.faces.0 || a == other.faces.1 || b == other.faces.0 || b == other.faces.1
    }

    fn contains(&self, s: f64, tolerance: f64) -> bool {
        s >= self.range.0 - tolerance && s <= self.range.1 + tolerance
    }
}

fn section_curve<'a>(state: &'a FillerState, r: &SectionRef) -> Option<&'a SectionCurve> {
    match state.interferences.get(r.record)? {
        Interference::FaceFace {
            geometry: FaceFaceGeometry::Curves(curves),
            ..
        } => curves.get(r.curve),
        _ => None,
    }
}

fn section_curve_mut<'a>(
    state: &'a mut FillerState,
    r: &SectionRef,
) -> Option<&'a mut SectionCurve> {
    match state.interferences.get_mut(r.record)? {
        Interference::FaceFace {
            geometry: FaceFaceGeometry::Curves(curves),
            ..
        } => curves.get_mut(r.curve),
        _ => None,
    }
}

/// Resolved vertex paved on the section within `tolerance` of `s`.
fn section_vertex_near(
    state: &FillerState,
    r: &SectionRef,
    s: f64,
    tolerance: f64,
) -> Option<ShapeIndex> {
    section_curve(state, r)?
        .paves
        .iter()
        .find(|p| (p.parameter - s).abs() <= tolerance)
        .map(|p| state.pool.real_vertex(p.vertex))
}

fn insert_section_pave(state: &mut FillerState, r: &SectionRef, pave: Pave) {
    if let Some(curve) = section_curve_mut(state, r) {
        let at = curve.paves.partition_point(|p| p.order(&pave) == std::cmp::Ordering::Less);
        curve.paves.insert(at, pave);
    }
}

/// Splits new sections that cross inside a face they share.
///
/// Sections of different face pairs meet inside a face where no edge
/// passes, so the crossing vertex is added to the paves of both.
fn split_crossing_sections(
    state: &mut FillerState,
    store: &mut TopologyStore,
    first_record: usize,
) -> Result<()> {
    let mut sections = Vec::new();
    for (record, interference) in state.interferences.iter().enumerate().skip(first_record) {
        let Interference::FaceFace {
            face1,
            face2,
            geometry: FaceFaceGeometry::Curves(curves),
        } = interference
        else {
            continue;
        };
        for (curve, c) in curves.iter().enumerate().filter(|(_, c)| c.is_new) {
            sections.push(SectionRef {
                record,
                curve,
                faces: (*face1, *face2),
                line: c.curve.clone(),
                range: c.range,
            });
        }
    }

    let fuzzy = state.config.fuzzy_value;
    let mut crossings = 0usize;
    for (i, a) in sections.iter().enumerate() {
        for b in sections.iter().skip(i + 1).filter(|b| a.shares_face(b)) {
            let Some((s, t)) = line_line_closest(
                a.line.origin(),
                a.line.direction(),
                b.line.origin(),
                b.line.direction(),
            ) else {
                continue;
            };
            let mut tolerance = 0.0f64;
            for f in [a.faces.0, a.faces.1, b.faces.0, b.faces.1] {
                tolerance = tolerance.max(store.face(state.pool.face_id(f)?)?.tolerance);
            }
            tolerance += fuzzy;
            if !a.contains(s, tolerance) || !b.contains(t, tolerance) {
                continue;
            }
            let on_a = a.line.origin() + a.line.direction() * s;
            let on_b = b.line.origin() + b.line.direction() * t;
            if (on_a - on_b).norm() > tolerance {
                continue;
            }
            let (s, t) = (s.clamp(a.range.0, a.range.1), t.clamp(b.range.0, b.range.1));

            let vertex = match (
                section_vertex_near(state, a, s, tolerance),
                section_vertex_near(state, b, t, tolerance),
            ) {
                (Some(va), Some(vb)) => {
                    if va != vb {
                        state.pool.set_same_domain(vb, va);
                    }
                    continue;
                }
                (Some(va), None) => va,
                (None, Some(vb)) => vb,
                (None, None) => {
                    let operand = [a.faces.0, a.faces.1, b.faces.0, b.faces.1]
                        .into_iter()
                        .map(|f| state.pool.operand(f))
                        .reduce(Operand::merge)
                        .unwrap_or(Operand::Both);
                    state.new_vertex(store, nalgebra::center(&on_a, &on_b), tolerance, operand)
                }
            };
            let gap = (store.vertex(state.pool.vertex_id(vertex)?)?.point - on_a).norm();
            state.cover_distance(store, vertex, gap)?;
            if section_vertex_near(state, a, s, tolerance).is_none() {
                insert_section_pave(state, a, Pave::new(vertex, s, PaveOrigin::FaceFace));
            }
            if section_vertex_near(state, b, t, tolerance).is_none() {
                insert_section_pave(state, b, Pave::new(vertex, t, PaveOrigin::FaceFace));
            }
            crossings += 1;
        }
    }
    debug!(sections = sections.len(), crossings, "crossing sections split");
    Ok(())
}

/// Intersects faces: trimmed section lines for crossing planes, common
/// regions for overlapping coplanar faces.
#[instrument(skip_all)]
pub(super) fn run<A: GeometryAdaptor>(
    state: &mut FillerState,
    store: &mut TopologyStore,
    adaptor: &A,
) -> Result<()> {
    let pairs = state.candidate_pairs(ShapeKind::Face, ShapeKind::Face);
    let fuzzy = state.config.fuzzy_value;
    let (hits, failures) = {
        let pool = &state.pool;
        let store = &*store;
        map_pairs(state.config.run_parallel, &pairs, |f1, f2| {
            let id1 = pool.face_id(f1)?;
            let id2 = pool.face_id(f2)?;
            let a = store.face(id1)?;
            let b = store.face(id2)?;
            let tolerance = a.tolerance.max(b.tolerance) + fuzzy;

            match adaptor.intersect_surfaces(a, b, tolerance)? {
                SurfaceHit::Disjoint => Ok(None),
                SurfaceHit::Coincident => coplanar_overlap(adaptor, store, a, b, tolerance),
                SurfaceHit::Curves(curves) => {
                    let loops_a = store.face_loops(id1)?;
                    let loops_b = store.face_loops(id2)?;
                    let mut sections = Vec::new();
                    for geometry in curves {
                        let ranges = trim_section(
                            store,
                            (a, &loops_a),
                            (b, &loops_b),
                            &geometry,
                            tolerance,
                        )?;
                        for range in ranges {
                            let line = &geometry.curve;
                            let points: Vec<Point3> = [range.0, 0.5 * (range.0 + range.1), range.1]
                                .iter()
                                .map(|s| line.origin() + line.direction() * *s)
                                .collect();
                            let along = runs_along_edges(
                                adaptor,
                                store,
                                pool,
                                (f1, f2),
                                &points,
                                tolerance,
                            )?;
                            let is_new = !along;
                            sections.push(TrimmedSection {
                                geometry: geometry.clone(),
                                range,
                                is_new,
                            });
                        }
                    }
                    let any_new = sections.iter().any(|s| s.is_new);
                    Ok(any_new.then_some(FaceFaceHit::Sections(sections, tolerance)))
                }
            }
        })
    };
    state.warnings.extend(failures);
    debug!(candidates = pairs.len(), hits = hits.len(), "face/face");

    let first_record = state.interferences.len();
    for ((face1, face2), hit) in hits {
        let geometry = match hit {
            FaceFaceHit::SameDomain(region) => FaceFaceGeometry::SameDomain { region },
            FaceFaceHit::Sections(sections, tolerance) => {
                let mut curves = Vec::with_capacity(sections.len());
                for section in sections {
                    let paves = if section.is_new {
                        section_paves(state, store, (face1, face2), &section, tolerance)?
                    } else {
                        Vec::new()
                    };
                    curves.push(SectionCurve {
                        curve: section.geometry.curve,
                        pcurve_a: section.geometry.pcurve_a,
                        pcurve_b: section.geometry.pcurve_b,
                        range: section.range,
                        paves,
                        is_new: section.is_new,
                    });
                }
                FaceFaceGeometry::Curves(curves)
            }
        };
        state.record(Interference::FaceFace { face1, face2, geometry });
    }
    split_crossing_sections(state, store, first_record)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filler::PaveFiller;
    use crate::interference::{EdgeFaceGeometry, InterferenceKind};
    use crate::operations::creation::{MakeCompound, MakeFace, MakeWire};
    use crate::topology::Shape;
    use approx::assert_relative_eq;

    fn face(store: &mut TopologyStore, points: Vec<Point3>) -> Shape {
        let w = MakeWire::new(points, true).execute(store).unwrap();
        Shape::Face(MakeFace::new(w, vec![]).execute(store).unwrap())
    }

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn face_records(state: &FillerState) -> Vec<&Interference> {
        state.interferences_of(InterferenceKind::FaceFace).collect()
    }

    #[test]
    fn crossing_squares_get_one_section() {
        let mut store = TopologyStore::new();
        let horizontal = face(
            &mut store,
            vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0), p(0.0, 2.0, 0.0)],
        );
        let vertical = face(
            &mut store,
            vec![p(1.0, -1.0, -1.0), p(1.0, 3.0, -1.0), p(1.0, 3.0, 1.0), p(1.0, -1.0, 1.0)],
        );
        let state = PaveFiller::default().perform(&mut store, horizontal, vertical).unwrap();

        let records = face_records(&state);
        assert_eq!(records.len(), 1);
        let Interference::FaceFace {
            geometry: FaceFaceGeometry::Curves(curves),
            ..
        } = records[0]
        else {
            panic!("expected sections, got {:?}", records[0]);
        };
        assert_eq!(curves.len(), 1);
        let section = &curves[0];
        assert!(section.is_new);
        assert_relative_eq!(section.range.1 - section.range.0, 2.0, epsilon = 1e-9);
        assert_eq!(section.paves.len(), 2);
        // Both ends sit on the vertices where the horizontal face's edges
        // pierce the vertical one.
        let pierced: Vec<ShapeIndex> = state
            .interferences_of(InterferenceKind::EdgeFace)
            .filter_map(|r| match r {
                Interference::EdgeFace {
                    geometry: EdgeFaceGeometry::Point { vertex, .. },
                    ..
                } => Some(*vertex),
                _ => None,
            })
            .collect();
        assert_eq!(pierced.len(), 2);
        for pave in &section.paves {
            assert!(pierced.contains(&pave.vertex));
        }
        let a = section.start_point();
        let b = section.end_point();
        assert_relative_eq!(a.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(b.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(a.y.min(b.y), 0.0, epsilon = 1e-9);
        assert_relative_eq!(a.y.max(b.y), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn crossing_sections_share_a_vertex() {
        let mut store = TopologyStore::new();
        let floor = face(
            &mut store,
            vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0), p(0.0, 2.0, 0.0)],
        );
        let wall_x = face(
            &mut store,
            vec![p(1.0, -1.0, -1.0), p(1.0, 3.0, -1.0), p(1.0, 3.0, 1.0), p(1.0, -1.0, 1.0)],
        );
        let wall_y = face(
            &mut store,
            vec![p(-1.0, 1.0, -1.0), p(3.0, 1.0, -1.0), p(3.0, 1.0, 1.0), p(-1.0, 1.0, 1.0)],
        );
        let walls = Shape::Compound(
            MakeCompound::new(vec![wall_x, wall_y])
                .execute(&mut store)
                .unwrap(),
        );
        let state = PaveFiller::default().perform(&mut store, floor, walls).unwrap();

        let sections: Vec<&SectionCurve> = face_records(&state)
            .into_iter()
            .filter_map(|r| match r {
                Interference::FaceFace {
                    geometry: FaceFaceGeometry::Curves(curves),
                    ..
                } => Some(curves),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(sections.len(), 2);
        let crossing_of = |c: &SectionCurve| {
            c.paves
                .iter()
                .map(|pv| state.pool().real_vertex(pv.vertex))
                .find(|&v| {
                    let at = store.vertex(state.pool().vertex_id(v).unwrap()).unwrap().point;
                    (at - p(1.0, 1.0, 0.0)).norm() < 1e-9
                })
        };
        for section in &sections {
            assert_eq!(section.paves.len(), 3);
            assert!(section.paves.windows(2).all(|w| w[0].parameter < w[1].parameter));
        }
        let first = crossing_of(sections[0]).unwrap();
        assert_eq!(crossing_of(sections[1]), Some(first));
    }

    #[test]
    fn overlapping_coplanar_squares_share_a_region() {
        let mut store = TopologyStore::new();
        let a = face(
            &mut store,
            vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0), p(0.0, 2.0, 0.0)],
        );
        let b = face(
            &mut store,
            vec![p(1.0, 1.0, 0.0), p(3.0, 1.0, 0.0), p(3.0, 3.0, 0.0), p(1.0, 3.0, 0.0)],
        );
        let state = PaveFiller::default().perform(&mut store, a, b).unwrap();
        let records = face_records(&state);
        assert_eq!(records.len(), 1);
        let Interference::FaceFace {
            geometry: FaceFaceGeometry::SameDomain { region: Some(region) },
            ..
        } = records[0]
        else {
            panic!("expected a common region, got {:?}", records[0]);
        };
        assert_relative_eq!(region.area, 1.0, epsilon = 1e-9);
        assert_eq!(region.boundary.len(), 4);
    }

    #[test]
    fn non_convex_coplanar_overlap_has_no_region() {
        let mut store = TopologyStore::new();
        let l_shape = face(
            &mut store,
            vec![
                p(0.0, 0.0, 0.0),
                p(2.0, 0.0, 0.0),
                p(2.0, 1.0, 0.0),
                p(1.0, 1.0, 0.0),
                p(1.0, 2.0, 0.0),
                p(0.0, 2.0, 0.0),
            ],
        );
        let square = face(
            &mut store,
            vec![p(0.5, 0.5, 0.0), p(1.5, 0.5, 0.0), p(1.5, 1.5, 0.0), p(0.5, 1.5, 0.0)],
        );
        let state = PaveFiller::default().perform(&mut store, l_shape, square).unwrap();
        assert!(face_records(&state).iter().any(|r| matches!(
            r,
            Interference::FaceFace {
                geometry: FaceFaceGeometry::SameDomain { region: None },
                ..
            }
        )));
    }

    #[test]
    fn squares_touching_along_an_edge_do_not_interfere() {
        let mut store = TopologyStore::new();
        let a = face(
            &mut store,
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)],
        );
        let b = face(
            &mut store,
            vec![p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 1.0, 1.0), p(1.0, 0.0, 1.0)],
        );
        let state = PaveFiller::default().perform(&mut store, a, b).unwrap();
        assert!(face_records(&state).is_empty());
    }
}
