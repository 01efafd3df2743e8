use tracing::{debug, instrument};

use crate::adaptor::{CurveHit, GeometryAdaptor};
use crate::error::Result;
use crate::interference::{EdgeEdgeGeometry, Interference};
use crate::math::Point3;
use crate::pave::PaveOrigin;
use crate::pool::ShapeIndex;
use crate::topology::{ShapeKind, TopologyStore};

use super::{map_pairs, FillerState};

/// Puts one vertex at `t1` on `e1` and `t2` on `e2`.
///
/// An already paved vertex is reused; otherwise a new one is created at
/// `point`. Returns `None` when both edges already carry the same vertex
/// there, i.e. the edges merely touch.
fn pave_common_point(
    state: &mut FillerState,
    store: &mut TopologyStore,
    (e1, t1): (ShapeIndex, f64),
    (e2, t2): (ShapeIndex, f64),
    point: Point3,
    tolerance: f64,
) -> Result<Option<(ShapeIndex, bool)>> {
    let near = (
        state.paved_vertex_near(e1, t1),
        state.paved_vertex_near(e2, t2),
    );
    let (vertex, is_new) = match near {
        (Some(a), Some(b)) if a == b => return Ok(None),
        (Some(a), _) => (a, false),
        (None, Some(b)) => (b, false),
        (None, None) => {
            let operand = state.pool.operand(e1).merge(state.pool.operand(e2));
            (state.new_vertex(store, point, tolerance, operand), true)
        }
    };
    state.add_pave(e1, vertex, t1, PaveOrigin::EdgeEdge)?;
    state.add_pave(e2, vertex, t2, PaveOrigin::EdgeEdge)?;
    Ok(Some((vertex, is_new)))
}

/// Paves crossing edges and records common blocks of overlapping ones.
#[instrument(skip_all)]
pub(super) fn run<A: GeometryAdaptor>(
    state: &mut FillerState,
    store: &mut TopologyStore,
    adaptor: &A,
) -> Result<()> {
    let pairs = state.candidate_pairs(ShapeKind::Edge, ShapeKind::Edge);
    let fuzzy = state.config.fuzzy_value;
    let (hits, failures) = {
        let pool = &state.pool;
        let store = &*store;
        map_pairs(state.config.run_parallel, &pairs, |e1, e2| {
            let a = store.edge(pool.edge_id(e1)?)?;
            let b = store.edge(pool.edge_id(e2)?)?;
            let tolerance = a.tolerance.max(b.tolerance) + fuzzy;
            let found = adaptor.intersect_curves(a, b, tolerance)?;
            Ok((!found.is_empty()).then_some((found, tolerance)))
        })
    };
    state.warnings.extend(failures);
    debug!(candidates = pairs.len(), hits = hits.len(), "edge/edge");

    for ((e1, e2), (found, tolerance)) in hits {
        for hit in found {
            match hit {
                CurveHit::Point { t1, t2, point } => {
                    let Some((vertex, is_new)) =
                        pave_common_point(state, store, (e1, t1), (e2, t2), point, tolerance)?
                    else {
                        continue;
                    };
                    let gap = (store.vertex(state.pool.vertex_id(vertex)?)?.point - point).norm();
                    state.cover_distance(store, vertex, gap)?;
                    state.record(Interference::EdgeEdge {
                        edge1: e1,
                        edge2: e2,
                        geometry: EdgeEdgeGeometry::Point { t1, t2, vertex, is_new },
                    });
                }
                CurveHit::Overlap { range1, range2 } => {
                    let (a, b) = {
                        let a = store.edge(state.pool.edge_id(e1)?)?;
                        let b = store.edge(state.pool.edge_id(e2)?)?;
                        (a.clone(), b.clone())
                    };
                    for t1 in [range1.0, range1.1] {
                        let point = a.point_at(t1)?;
                        let d0 = (b.point_at(range2.0)? - point).norm();
                        let d1 = (b.point_at(range2.1)? - point).norm();
                        let t2 = if d0 <= d1 { range2.0 } else { range2.1 };
                        pave_common_point(state, store, (e1, t1), (e2, t2), point, tolerance)?;
                    }
                    state.record(Interference::EdgeEdge {
                        edge1: e1,
                        edge2: e2,
                        geometry: EdgeEdgeGeometry::Overlap { range1, range2 },
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::config::{FillerConfig, LevelOfCheck};
    use crate::filler::PaveFiller;
    use crate::interference::{EdgeEdgeGeometry, Interference, InterferenceKind};
    use crate::math::Point3;
    use crate::operations::creation::{MakeEdge, MakeWire};
    use crate::topology::{Shape, TopologyStore, VertexData};

    fn line(store: &mut TopologyStore, a: Point3, b: Point3) -> Shape {
        let va = store.add_vertex(VertexData::new(a));
        let vb = store.add_vertex(VertexData::new(b));
        Shape::Edge(MakeEdge::line(va, vb).execute(store).unwrap())
    }

    #[test]
    fn collinear_edges_form_a_common_block() {
        let mut store = TopologyStore::new();
        let a = line(&mut store, Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let b = line(&mut store, Point3::new(3.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let config = FillerConfig::default().with_level(LevelOfCheck::new(2).unwrap());
        let state = PaveFiller::new(config).perform(&mut store, a, b).unwrap();

        let records: Vec<_> = state.interferences_of(InterferenceKind::EdgeEdge).collect();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0],
            Interference::EdgeEdge {
                geometry: EdgeEdgeGeometry::Overlap { .. },
                ..
            }
        ));
        // Each edge is split where the other one ends.
        let pool = state.pool();
        for shape in [a, b] {
            let edge = pool.index_of(shape).unwrap();
            assert_eq!(state.pave_set(edge).unwrap().paves().len(), 3);
        }
        let edge_a = pool.index_of(a).unwrap();
        let edge_b = pool.index_of(b).unwrap();
        let blocks_a = state.pave_set(edge_a).unwrap().blocks(|v| pool.real_vertex(v));
        let blocks_b = state.pave_set(edge_b).unwrap().blocks(|v| pool.real_vertex(v));
        let shared_a = (blocks_a[1].start.vertex, blocks_a[1].end.vertex);
        let shared_b = (blocks_b[1].end.vertex, blocks_b[1].start.vertex);
        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn bowtie_self_check_finds_the_crossing() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let shape = Shape::Wire(wire);
        let config = FillerConfig::default().with_level(LevelOfCheck::new(2).unwrap());
        let state = PaveFiller::new(config).perform(&mut store, shape, shape).unwrap();

        let records: Vec<_> = state.interferences_of(InterferenceKind::EdgeEdge).collect();
        assert_eq!(records.len(), 1);
        let Interference::EdgeEdge {
            geometry: EdgeEdgeGeometry::Point { t1, t2, is_new, .. },
            ..
        } = records[0]
        else {
            panic!("expected a crossing, got {:?}", records[0]);
        };
        assert!(*is_new);
        assert!((t1 - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
        assert!((t2 - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
        assert_eq!(state.interferences_of(InterferenceKind::VertexFace).count(), 0);
    }
}
