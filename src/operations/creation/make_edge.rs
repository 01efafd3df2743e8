use crate::error::{OperationError, Result};
use crate::geometry::curve::{Arc, Curve, Line};
use crate::topology::{EdgeCurve, EdgeData, EdgeId, TopologyStore, VertexId};

/// Creates an edge between two existing vertices.
pub struct MakeEdge {
    start: VertexId,
    end: VertexId,
    arc: Option<Arc>,
}

impl MakeEdge {
    /// A straight edge from `start` to `end`.
    #[must_use]
    pub fn line(start: VertexId, end: VertexId) -> Self {
        Self {
            start,
            end,
            arc: None,
        }
    }

    /// An edge along `arc`, bounded by its domain.
    ///
    /// `start` and `end` must sit on the arc's ends; they may be the same
    /// vertex for a full circle.
    #[must_use]
    pub fn arc(start: VertexId, end: VertexId, arc: Arc) -> Self {
        Self {
            start,
            end,
            arc: Some(arc),
        }
    }

    /// Executes the operation, creating the edge in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex is missing, a line edge has zero length,
    /// or the vertices do not lie on the arc's ends.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<EdgeId> {
        let p0 = store.vertex(self.start)?.point;
        let p1 = store.vertex(self.end)?.point;
        let tol = store.vertex(self.start)?.tolerance.max(store.vertex(self.end)?.tolerance);

        let data = match &self.arc {
            None => {
                let length = (p1 - p0).norm();
                if length <= tol {
                    return Err(OperationError::InvalidInput("zero-length line edge".into()).into());
                }
                let line = Line::through(&p0, &p1)?;
                EdgeData::new(self.start, self.end, EdgeCurve::Line(line), 0.0, length)
            }
            Some(arc) => {
                let domain = arc.domain();
                let a = arc.evaluate(domain.t_min)?;
                let b = arc.evaluate(domain.t_max)?;
                if (a - p0).norm() > tol || (b - p1).norm() > tol {
                    return Err(OperationError::InvalidInput(
                        "arc ends do not match the edge vertices".into(),
                    )
                    .into());
                }
                EdgeData::new(
                    self.start,
                    self.end,
                    EdgeCurve::Arc(arc.clone()),
                    domain.t_min,
                    domain.t_max,
                )
            }
        };
        Ok(store.add_edge(data))
    }
}
