use tracing::{debug, instrument};

use crate::adaptor::GeometryAdaptor;
use crate::error::Result;
use crate::interference::Interference;
use crate::pave::PaveOrigin;
use crate::topology::{ShapeKind, TopologyStore};

use super::{map_pairs, FillerState};

/// Paves edges at the vertices lying on them.
#[instrument(skip_all)]
pub(super) fn run<A: GeometryAdaptor>(
    state: &mut FillerState,
    store: &mut TopologyStore,
    adaptor: &A,
) -> Result<()> {
    let pairs = state.candidate_pairs(ShapeKind::Vertex, ShapeKind::Edge);
    let fuzzy = state.config.fuzzy_value;
    let (hits, failures) = {
        let pool = &state.pool;
        let store = &*store;
        map_pairs(state.config.run_parallel, &pairs, |v, e| {
            let (first, last) = pool.edge_vertices(e);
            let vertex = pool.real_vertex(v);
            if vertex == first || vertex == last {
                return Ok(None);
            }
            let vd = store.vertex(pool.vertex_id(v)?)?;
            let ed = store.edge(pool.edge_id(e)?)?;
            let projection = adaptor.project_point(ed, &vd.point)?;
            Ok((projection.distance <= vd.tolerance + ed.tolerance + fuzzy).then_some(projection))
        })
    };
    state.warnings.extend(failures);
    debug!(candidates = pairs.len(), hits = hits.len(), "vertex/edge");

    for ((vertex, edge), projection) in hits {
        state.cover_distance(store, vertex, projection.distance)?;
        state.add_pave(edge, vertex, projection.parameter, PaveOrigin::VertexEdge)?;
        state.record(Interference::VertexEdge {
            vertex,
            edge,
            parameter: projection.parameter,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::config::{FillerConfig, LevelOfCheck};
    use crate::filler::PaveFiller;
    use crate::interference::{Interference, InterferenceKind};
    use crate::math::Point3;
    use crate::operations::creation::MakeEdge;
    use crate::topology::{Shape, TopologyStore, VertexData};

    #[test]
    fn vertex_near_edge_gets_its_tolerance_raised() {
        let mut store = TopologyStore::new();
        let a = store.add_vertex(VertexData::new(Point3::new(0.0, 0.0, 0.0)));
        let b = store.add_vertex(VertexData::new(Point3::new(2.0, 0.0, 0.0)));
        let edge = MakeEdge::line(a, b).execute(&mut store).unwrap();
        store.edge_mut(edge).unwrap().tolerance = 0.02;
        let v = store.add_vertex(VertexData::with_tolerance(Point3::new(0.5, 0.01, 0.0), 0.005));

        let config = FillerConfig::default().with_level(LevelOfCheck::new(1).unwrap());
        let state = PaveFiller::new(config)
            .perform(&mut store, Shape::Edge(edge), Shape::Vertex(v))
            .unwrap();

        let records: Vec<_> = state.interferences_of(InterferenceKind::VertexEdge).collect();
        assert_eq!(records.len(), 1);
        let Interference::VertexEdge { parameter, .. } = records[0] else {
            panic!("unexpected record");
        };
        assert!((parameter - 0.5).abs() < 1e-9);
        assert!((store.vertex(v).unwrap().tolerance - 0.01).abs() < 1e-12);
    }

    #[test]
    fn vertex_tolerance_decides_contact() {
        let mut store = TopologyStore::new();
        let a = store.add_vertex(VertexData::new(Point3::new(0.0, 0.0, 0.0)));
        let b = store.add_vertex(VertexData::new(Point3::new(2.0, 0.0, 0.0)));
        let edge = MakeEdge::line(a, b).execute(&mut store).unwrap();
        let v = store.add_vertex(VertexData::with_tolerance(Point3::new(0.5, 0.2, 0.0), 0.25));
        let state = PaveFiller::default()
            .perform(&mut store, Shape::Edge(edge), Shape::Vertex(v))
            .unwrap();
        assert_eq!(state.interferences_of(InterferenceKind::VertexEdge).count(), 1);

        let w = store.add_vertex(VertexData::with_tolerance(Point3::new(0.5, 0.2, 0.0), 0.1));
        let state = PaveFiller::default()
            .perform(&mut store, Shape::Edge(edge), Shape::Vertex(w))
            .unwrap();
        assert_eq!(state.interferences_of(InterferenceKind::VertexEdge).count(), 0);
    }
}
