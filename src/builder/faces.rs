use std::collections::BTreeMap;
use std::f64::consts::TAU;

use tracing::{debug, warn};

use crate::error::{Result, Warning};
use crate::math::polygon_2d::{cross_2d, point_in_loops, signed_area};
use crate::math::{Point2, Vector2, ANGULAR_TOLERANCE, TOLERANCE};
use crate::pool::{ShapeIndex, ShapePool};
use crate::topology::{
    EdgeCurve, EdgeId, FaceData, FaceId, OrientedEdge, Shape, TopologyStore, WireData,
};

use super::edges::{InternalEdge, Piece};

/// A directed use of an edge inside a face.
#[derive(Debug, Clone, Copy)]
struct HalfEdge {
    edge: EdgeId,
    forward: bool,
    from: ShapeIndex,
    to: ShapeIndex,
    internal: bool,
}

/// Geometry of a half-edge in the face frame.
struct Arm {
    leaving: Vector2,
    arriving: Vector2,
    /// Points from `from` up to, not including, `to`.
    points: Vec<Point2>,
}

/// Outcome of rebuilding one face.
pub(super) enum Rebuilt {
    /// Nothing splits the face after dropping dangling edges.
    Unchanged,
    Faces(Vec<FaceId>),
    Failed(String),
}

/// Clockwise angle swept from `from` to `to`, in `[0, 2π)`.
fn clockwise_angle(from: &Vector2, to: &Vector2) -> f64 {
    let ccw = cross_2d(from.x, from.y, to.x, to.y).atan2(from.dot(to));
    (-ccw).rem_euclid(TAU)
}

fn arm(store: &TopologyStore, face: &FaceData, h: &HalfEdge) -> Result<Arm> {
    let data = store.edge(h.edge)?;
    let (t0, t1, sign) = if h.forward {
        (data.t_start, data.t_end, 1.0)
    } else {
        (data.t_end, data.t_start, -1.0)
    };
    let mut ts = data.sample_parameters();
    if !h.forward {
        ts.reverse();
    }
    ts.pop();
    let points = ts
        .into_iter()
        .map(|t| Ok(face.to_frame(&data.point_at(t)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Arm {
        leaving: face.direction_to_frame(&(data.tangent_at(t0)? * sign)),
        arriving: face.direction_to_frame(&(data.tangent_at(t1)? * sign)),
        points,
    })
}

/// Boundary half-edges of `face`, every wire oriented so the face lies on
/// its left.
fn boundary_half_edges(
    store: &TopologyStore,
    pool: &ShapePool,
    face_id: FaceId,
    pieces: &BTreeMap<ShapeIndex, Vec<Piece>>,
) -> Result<Vec<HalfEdge>> {
    let face = store.face(face_id)?;
    let loops = store.face_loops(face_id)?;
    let wires = std::iter::once(face.outer_wire).chain(face.inner_wires.iter().copied());
    let mut half_edges = Vec::new();

    for (i, (wire, outline)) in wires.zip(&loops).enumerate() {
        let ccw = signed_area(outline) > 0.0;
        let flip = if i == 0 { !ccw } else { ccw };
        let mut uses: Vec<OrientedEdge> = store.wire(wire)?.edges.clone();
        if flip {
            uses.reverse();
            for oe in &mut uses {
                oe.forward = !oe.forward;
            }
        }
        for oe in uses {
            let Some(edge) = pool.index_of(Shape::Edge(oe.edge)) else {
                continue;
            };
            let split = pieces.get(&edge).map_or(&[][..], Vec::as_slice);
            let mut directed: Vec<HalfEdge> = split
                .iter()
                .map(|p| HalfEdge {
                    edge: p.edge,
                    forward: p.forward == oe.forward,
                    from: if oe.forward { p.start } else { p.end },
                    to: if oe.forward { p.end } else { p.start },
                    internal: false,
                })
                .collect();
            if !oe.forward {
                directed.reverse();
            }
            for h in directed {
                let degenerate =
                    h.from == h.to && matches!(store.edge(h.edge)?.curve, EdgeCurve::Line(_));
                if !degenerate {
                    half_edges.push(h);
                }
            }
        }
    }
    Ok(half_edges)
}

/// Drops internal edges with an end touching nothing else.
fn prune_dangling(half_edges: &mut Vec<HalfEdge>) {
    loop {
        let mut degree: BTreeMap<ShapeIndex, usize> = BTreeMap::new();
        for h in half_edges.iter() {
            // Internal edges come as two half-edges; count each once.
            if !h.internal || h.forward {
                *degree.entry(h.from).or_default() += 1;
                *degree.entry(h.to).or_default() += 1;
            }
        }
        let before = half_edges.len();
        let degree_of = |v: ShapeIndex| degree.get(&v).copied().unwrap_or(0);
        half_edges.retain(|h| !h.internal || (degree_of(h.from) > 1 && degree_of(h.to) > 1));
        if half_edges.len() == before {
            break;
        }
    }
}

/// Picks the continuation after arriving at `h.to` along `arm`.
///
/// Returns the chosen half-edge and whether another one was equally good.
fn next_half_edge(
    half_edges: &[HalfEdge],
    arms: &[Arm],
    outgoing: &BTreeMap<ShapeIndex, Vec<usize>>,
    current: usize,
) -> Option<(usize, bool)> {
    let h = &half_edges[current];
    let candidates = outgoing.get(&h.to)?;
    let is_twin = |i: usize| half_edges[i].edge == h.edge && half_edges[i].forward != h.forward;
    let back = -arms[current].arriving;

    let mut scored: Vec<(f64, usize)> = candidates
        .iter()
        .filter(|&&i| !is_twin(i))
        .map(|&i| (clockwise_angle(&back, &arms[i].leaving), i))
        .collect();
    if scored.is_empty() {
        return candidates.first().map(|&i| (i, false));
    }
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let best = scored[0].0;
    let tied: Vec<usize> = scored
        .iter()
        .take_while(|(angle, _)| angle - best <= ANGULAR_TOLERANCE)
        .map(|&(_, i)| i)
        .collect();
    tied.iter().min().map(|&i| (i, tied.len() > 1))
}

/// Walks closed loops through the half-edges.
fn walk_loops(
    face: ShapeIndex,
    half_edges: &[HalfEdge],
    arms: &[Arm],
    warnings: &mut Vec<Warning>,
) -> std::result::Result<Vec<Vec<usize>>, String> {
    let mut outgoing: BTreeMap<ShapeIndex, Vec<usize>> = BTreeMap::new();
    for (i, h) in half_edges.iter().enumerate() {
        outgoing.entry(h.from).or_default().push(i);
    }

    let mut used = vec![false; half_edges.len()];
    let mut loops = Vec::new();
    for start in 0..half_edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut cycle = vec![start];
        let mut current = start;
        loop {
            let Some((next, ambiguous)) = next_half_edge(half_edges, arms, &outgoing, current)
            else {
                return Err(format!("wire walk stopped at vertex {}", half_edges[current].to));
            };
            if ambiguous {
                let vertex = half_edges[current].to;
                warn!(face = %face, vertex = %vertex, "ambiguous wire walk");
                let warning = Warning::AmbiguousReconstruction { face, vertex };
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
            }
            if next == start {
                break;
            }
            if used[next] {
                return Err(format!("wire walk re-entered vertex {}", half_edges[next].from));
            }
            used[next] = true;
            cycle.push(next);
            current = next;
        }
        loops.push(cycle);
    }
    Ok(loops)
}

/// A point just left of the first segment of `outline`.
fn left_sample(outline: &[Point2]) -> Option<Point2> {
    let (a, b) = (outline.first()?, outline.get(1).or_else(|| outline.first())?);
    let d = b - a;
    let normal = Vector2::new(-d.y, d.x);
    Some(nalgebra::center(a, b) + normal * 1e-4)
}

/// Splits `face` along its split boundary and internal edges.
pub(super) fn rebuild_face(
    store: &mut TopologyStore,
    pool: &ShapePool,
    face: ShapeIndex,
    pieces: &BTreeMap<ShapeIndex, Vec<Piece>>,
    internal: &[InternalEdge],
    boundary_changed: bool,
    warnings: &mut Vec<Warning>,
) -> Result<Rebuilt> {
    let face_id = pool.face_id(face)?;
    let mut half_edges = boundary_half_edges(store, pool, face_id, pieces)?;
    let mut seen: Vec<EdgeId> = half_edges.iter().map(|h| h.edge).collect();
    for e in internal {
        if seen.contains(&e.edge) {
            continue;
        }
        seen.push(e.edge);
        for (forward, from, to) in [(true, e.start, e.end), (false, e.end, e.start)] {
            half_edges.push(HalfEdge {
                edge: e.edge,
                forward,
                from,
                to,
                internal: true,
            });
        }
    }
    prune_dangling(&mut half_edges);
    if !boundary_changed && half_edges.iter().all(|h| !h.internal) {
        return Ok(Rebuilt::Unchanged);
    }

    let data = store.face(face_id)?.clone();
    let arms = half_edges
        .iter()
        .map(|h| arm(store, &data, h))
        .collect::<Result<Vec<_>>>()?;
    let loops = match walk_loops(face, &half_edges, &arms, warnings) {
        Ok(loops) => loops,
        Err(reason) => return Ok(Rebuilt::Failed(reason)),
    };

    let outlines: Vec<(Vec<Point2>, f64)> = loops
        .iter()
        .map(|cycle| {
            let outline: Vec<Point2> = cycle
                .iter()
                .flat_map(|&i| arms[i].points.iter().copied())
                .collect();
            let area = signed_area(&outline);
            (outline, area)
        })
        .collect();

    let outers: Vec<usize> = (0..loops.len()).filter(|&i| outlines[i].1 > TOLERANCE).collect();
    if outers.is_empty() {
        return Ok(Rebuilt::Failed("no loop encloses area".into()));
    }
    let mut holes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for hole in (0..loops.len()).filter(|&i| outlines[i].1 < -TOLERANCE) {
        let Some(sample) = left_sample(&outlines[hole].0) else {
            continue;
        };
        let owner = outers
            .iter()
            .copied()
            .filter(|&o| point_in_loops(&sample, std::slice::from_ref(&outlines[o].0)))
            .min_by(|&a, &b| outlines[a].1.total_cmp(&outlines[b].1));
        match owner {
            Some(o) => holes.entry(o).or_default().push(hole),
            None => return Ok(Rebuilt::Failed("hole outside every outer loop".into())),
        }
    }

    let add_wire = |store: &mut TopologyStore, cycle: &[usize]| {
        store.add_wire(WireData {
            edges: cycle
                .iter()
                .map(|&i| OrientedEdge::new(half_edges[i].edge, half_edges[i].forward))
                .collect(),
            is_closed: true,
        })
    };
    let mut faces = Vec::with_capacity(outers.len());
    for o in outers {
        let outer_wire = add_wire(store, &loops[o]);
        let inner_wires = holes
            .get(&o)
            .into_iter()
            .flatten()
            .map(|&h| add_wire(store, &loops[h]))
            .collect();
        faces.push(store.add_face(FaceData {
            outer_wire,
            inner_wires,
            ..data.clone()
        }));
    }
    debug!(face = %face, images = faces.len(), "face rebuilt");
    Ok(Rebuilt::Faces(faces))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn clockwise_angle_measures_right_turns() {
        let down = Vector2::new(0.0, -1.0);
        let left = Vector2::new(-1.0, 0.0);
        let right = Vector2::new(1.0, 0.0);
        assert_relative_eq!(clockwise_angle(&down, &left), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(clockwise_angle(&down, &right), 3.0 * FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(clockwise_angle(&down, &Vector2::new(0.0, 1.0)), PI, epsilon = 1e-12);
        assert!(clockwise_angle(&down, &down).abs() < 1e-12);
    }

    #[test]
    fn sample_sits_left_of_the_first_segment() {
        let clockwise = [Point2::new(0.0, 0.0), Point2::new(0.0, 1.0), Point2::new(1.0, 1.0)];
        let sample = left_sample(&clockwise).unwrap();
        assert!(sample.x < 0.0);
        assert_relative_eq!(sample.y, 0.5);
    }

    fn straight_arm(from: Point2, to: Point2) -> Arm {
        let d = (to - from).normalize();
        Arm {
            leaving: d,
            arriving: d,
            points: vec![from],
        }
    }

    #[test]
    fn tangent_loops_report_an_ambiguous_turn() {
        // Two slivers leave vertex 0 along +x and come back to it; the
        // turn after either return is tied between both departures.
        let mut keys: slotmap::SlotMap<EdgeId, ()> = slotmap::SlotMap::with_key();
        let o = Point2::new(0.0, 0.0);
        let (a, b) = (Point2::new(1.0, 0.0), Point2::new(2.0, 0.0));
        let legs = [(0, 1, o, a), (1, 0, a, o), (0, 2, o, b), (2, 0, b, o)];
        let half_edges: Vec<HalfEdge> = legs
            .iter()
            .map(|&(from, to, _, _)| HalfEdge {
                edge: keys.insert(()),
                forward: true,
                from: ShapeIndex(from),
                to: ShapeIndex(to),
                internal: false,
            })
            .collect();
        let arms: Vec<Arm> = legs.iter().map(|&(_, _, p, q)| straight_arm(p, q)).collect();

        let face = ShapeIndex(9);
        let mut warnings = Vec::new();
        let walked = walk_loops(face, &half_edges, &arms, &mut warnings);
        assert!(walked.is_err());
        assert_eq!(
            warnings,
            vec![Warning::AmbiguousReconstruction {
                face,
                vertex: ShapeIndex(0),
            }]
        );
    }
}
