use tracing::{debug, instrument};

use crate::adaptor::{CurveSurfaceHit, GeometryAdaptor, PointState};
use crate::error::Result;
use crate::interference::{BlockState, EdgeFaceGeometry, Interference};
use crate::math::{Point2, Point3};
use crate::pave::PaveOrigin;
use crate::topology::{ShapeKind, TopologyStore};

use super::{map_pairs, FillerState};

enum EdgeFaceHit {
    Piercings(Vec<(f64, Point3)>),
    InPlane(Vec<BlockState>),
}

/// Paves edges where they pierce face interiors and classifies edges lying
/// in a face's plane.
#[instrument(skip_all)]
pub(super) fn run<A: GeometryAdaptor>(
    state: &mut FillerState,
    store: &mut TopologyStore,
    adaptor: &A,
) -> Result<()> {
    let pairs = state.candidate_pairs(ShapeKind::Edge, ShapeKind::Face);
    let fuzzy = state.config.fuzzy_value;
    let (hits, failures) = {
        let shared = &*state;
        let store = &*store;
        map_pairs(state.config.run_parallel, &pairs, |e, f| {
            let pool = &shared.pool;
            let ed = store.edge(pool.edge_id(e)?)?;
            let face_id = pool.face_id(f)?;
            let fd = store.face(face_id)?;
            let tolerance = ed.tolerance + fd.tolerance + fuzzy;
            let classify = |p: &Point3, loops: &[Vec<Point2>]| {
                adaptor.classify_2d(&fd.to_frame(p), loops, tolerance)
            };

            match adaptor.intersect_curve_surface(ed, fd, tolerance)? {
                CurveSurfaceHit::Points(points) => {
                    let ptol = ed.parametric_tolerance(tolerance);
                    let interior: Vec<_> = points
                        .into_iter()
                        .filter(|(t, _)| {
                            (t - ed.t_start).abs() > ptol && (t - ed.t_end).abs() > ptol
                        })
                        .collect();
                    if interior.is_empty() {
                        return Ok(None);
                    }
                    let loops = store.face_loops(face_id)?;
                    // Hits on the face boundary belong to the edge/edge pass.
                    let inside: Vec<_> = interior
                        .into_iter()
                        .filter(|(_, p)| classify(p, &loops) == PointState::In)
                        .collect();
                    Ok((!inside.is_empty()).then_some(EdgeFaceHit::Piercings(inside)))
                }
                CurveSurfaceHit::OnSurface => {
                    let Some(set) = shared.pave_set(e) else {
                        return Ok(None);
                    };
                    let loops = store.face_loops(face_id)?;
                    let mut states = Vec::new();
                    for block in set.blocks(|v| pool.real_vertex(v)) {
                        let mid = ed.point_at(block.mid_parameter())?;
                        states.push(BlockState {
                            range: block.range(),
                            state: classify(&mid, &loops),
                        });
                    }
                    let touches = states.iter().any(|s| s.state != PointState::Out);
                    Ok(touches.then_some(EdgeFaceHit::InPlane(states)))
                }
            }
        })
    };
    state.warnings.extend(failures);
    debug!(candidates = pairs.len(), hits = hits.len(), "edge/face");

    for ((edge, face), hit) in hits {
        match hit {
            EdgeFaceHit::Piercings(points) => {
                for (parameter, point) in points {
                    let near = state.paved_vertex_near(edge, parameter);
                    let (vertex, is_new) = if let Some(v) = near {
                        (v, false)
                    } else {
                        let tolerance = {
                            let ed = store.edge(state.pool.edge_id(edge)?)?;
                            let fd = store.face(state.pool.face_id(face)?)?;
                            ed.tolerance.max(fd.tolerance)
                        };
                        let operand = state.pool.operand(edge).merge(state.pool.operand(face));
                        (state.new_vertex(store, point, tolerance, operand), true)
                    };
                    state.add_pave(edge, vertex, parameter, PaveOrigin::EdgeFace)?;
                    state.record(Interference::EdgeFace {
                        edge,
                        face,
                        geometry: EdgeFaceGeometry::Point {
                            parameter,
                            vertex,
                            is_new,
                        },
                    });
                }
            }
            EdgeFaceHit::InPlane(states) => state.record(Interference::EdgeFace {
                edge,
                face,
                geometry: EdgeFaceGeometry::InPlane(states),
            }),
        }
    }
    Ok(())
}
