use crate::error::Result;
use crate::math::Point3;

use super::edge::EdgeId;
use super::TopologyStore;

slotmap::new_key_type! {
    /// Unique identifier for a wire in the topology store.
    pub struct WireId;
}

/// An edge with orientation information within a wire.
#[derive(Debug, Clone, Copy)]
pub struct OrientedEdge {
    /// The edge identifier.
    pub edge: EdgeId,
    /// If `true`, the edge is traversed in its natural direction (start → end).
    /// If `false`, the edge is traversed in reverse (end → start).
    pub forward: bool,
}

impl OrientedEdge {
    /// Creates a new oriented edge.
    #[must_use]
    pub fn new(edge: EdgeId, forward: bool) -> Self {
        Self { edge, forward }
    }
}

/// Data associated with a topological wire.
///
/// A wire is an ordered sequence of oriented edges forming a connected path.
/// It may be open or closed.
#[derive(Debug, Clone)]
pub struct WireData {
    /// The ordered sequence of oriented edges.
    pub edges: Vec<OrientedEdge>,
    /// Whether this wire forms a closed loop.
    pub is_closed: bool,
}

impl TopologyStore {
    /// Points along `wire` in traversal order, arcs sampled.
    ///
    /// For closed wires the starting point is not repeated at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire or one of its edges is not found.
    pub fn wire_polyline(&self, wire: WireId) -> Result<Vec<Point3>> {
        let data = self.wire(wire)?;
        let mut points: Vec<Point3> = Vec::new();
        for oe in &data.edges {
            let edge = self.edge(oe.edge)?;
            let mut ts = edge.sample_parameters();
            if !oe.forward {
                ts.reverse();
            }
            let skip = usize::from(!points.is_empty());
            for t in ts.into_iter().skip(skip) {
                points.push(edge.point_at(t)?);
            }
        }
        if data.is_closed && points.len() > 1 {
            points.pop();
        }
        Ok(points)
    }
}
