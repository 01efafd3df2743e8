use tracing::{debug, instrument};

use crate::adaptor::{GeometryAdaptor, PointState};
use crate::error::Result;
use crate::interference::Interference;
use crate::topology::{ShapeKind, TopologyStore};

use super::{map_pairs, FillerState};

/// Records vertices lying inside faces.
#[instrument(skip_all)]
pub(super) fn run<A: GeometryAdaptor>(
    state: &mut FillerState,
    store: &mut TopologyStore,
    adaptor: &A,
) -> Result<()> {
    let pairs = state.candidate_pairs(ShapeKind::Vertex, ShapeKind::Face);
    let fuzzy = state.config.fuzzy_value;
    let (hits, failures) = {
        let shared = &*state;
        let store = &*store;
        map_pairs(state.config.run_parallel, &pairs, |v, f| {
            let pool = &shared.pool;
            let vertex = pool.real_vertex(v);
            if pool.face_vertices(f).contains(&vertex) {
                return Ok(None);
            }
            // Vertices on the boundary were paved by the vertex/edge pass.
            let on_boundary = pool.face_edges(f).into_iter().any(|e| {
                shared.pave_set(e).is_some_and(|set| {
                    set.paves()
                        .iter()
                        .any(|p| pool.real_vertex(p.vertex) == vertex)
                })
            });
            if on_boundary {
                return Ok(None);
            }

            let vd = store.vertex(pool.vertex_id(v)?)?;
            let face_id = pool.face_id(f)?;
            let fd = store.face(face_id)?;
            let distance = fd.surface.plane().distance(&vd.point);
            let tolerance = vd.tolerance + fd.tolerance + fuzzy;
            if distance > tolerance {
                return Ok(None);
            }
            let uv = fd.to_frame(&vd.point);
            let loops = store.face_loops(face_id)?;
            let inside = adaptor.classify_2d(&uv, &loops, tolerance) == PointState::In;
            Ok(inside.then_some((uv, distance)))
        })
    };
    state.warnings.extend(failures);
    debug!(candidates = pairs.len(), hits = hits.len(), "vertex/face");

    for ((vertex, face), (uv, distance)) in hits {
        state.cover_distance(store, vertex, distance)?;
        state.record(Interference::VertexFace { vertex, face, uv });
    }
    Ok(())
}
