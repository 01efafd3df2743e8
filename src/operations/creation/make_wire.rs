use crate::error::{OperationError, Result, TopologyError};
use crate::math::Point3;
use crate::topology::{OrientedEdge, TopologyStore, VertexData, VertexId, WireData, WireId};

use super::MakeEdge;

enum WireSource {
    Points { points: Vec<Point3>, close: bool },
    Edges(Vec<OrientedEdge>),
}

/// Creates a wire from a polyline or from existing edges.
pub struct MakeWire {
    source: WireSource,
}

impl MakeWire {
    /// A polyline wire through `points`; `close` joins the last point back
    /// to the first.
    #[must_use]
    pub fn new(points: Vec<Point3>, close: bool) -> Self {
        Self {
            source: WireSource::Points { points, close },
        }
    }

    /// A wire chaining existing oriented edges.
    #[must_use]
    pub fn from_edges(edges: Vec<OrientedEdge>) -> Self {
        Self {
            source: WireSource::Edges(edges),
        }
    }

    /// Executes the operation, creating the wire in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two points (or no edges) are given,
    /// consecutive points coincide, or the edges do not chain.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<WireId> {
        match &self.source {
            WireSource::Points { points, close } => polyline(store, points, *close),
            WireSource::Edges(edges) => chain(store, edges),
        }
    }
}

fn polyline(store: &mut TopologyStore, points: &[Point3], close: bool) -> Result<WireId> {
    if points.len() < 2 || (close && points.len() < 3) {
        return Err(OperationError::InvalidInput("not enough points for a wire".into()).into());
    }
    let vertices: Vec<_> = points
        .iter()
        .map(|p| store.add_vertex(VertexData::new(*p)))
        .collect();
    let n = vertices.len();
    let count = if close { n } else { n - 1 };
    let mut edges = Vec::with_capacity(count);
    for i in 0..count {
        let edge = MakeEdge::line(vertices[i], vertices[(i + 1) % n]).execute(store)?;
        edges.push(OrientedEdge::new(edge, true));
    }
    Ok(store.add_wire(WireData {
        edges,
        is_closed: close,
    }))
}

fn oriented_ends(store: &TopologyStore, oe: &OrientedEdge) -> Result<(VertexId, VertexId)> {
    let e = store.edge(oe.edge)?;
    Ok(if oe.forward { (e.start, e.end) } else { (e.end, e.start) })
}

fn chain(store: &mut TopologyStore, edges: &[OrientedEdge]) -> Result<WireId> {
    let Some(first) = edges.first() else {
        return Err(OperationError::InvalidInput("wire without edges".into()).into());
    };
    let (head, mut tail) = oriented_ends(store, first)?;
    for oe in &edges[1..] {
        let (s, e) = oriented_ends(store, oe)?;
        if s != tail {
            let reason = "wire edges are not connected".into();
            return Err(TopologyError::InvalidTopology(reason).into());
        }
        tail = e;
    }
    Ok(store.add_wire(WireData {
        edges: edges.to_vec(),
        is_closed: head == tail,
    }))
}
