use std::f64::consts::PI;

use crate::error::Result;
use crate::geometry::curve::{Arc, Curve, Line};
use crate::math::{Point3, Vector3, DEFAULT_TOLERANCE};

use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology store.
    pub struct EdgeId;
}

/// The geometric curve associated with an edge.
#[derive(Debug, Clone)]
pub enum EdgeCurve {
    /// A line segment.
    Line(Line),
    /// A circular arc.
    Arc(Arc),
}

impl EdgeCurve {
    /// Borrows the curve behind the [`Curve`] trait.
    #[must_use]
    pub fn as_curve(&self) -> &dyn Curve {
        match self {
            Self::Line(line) => line,
            Self::Arc(arc) => arc,
        }
    }
}

/// Data associated with a topological edge.
///
/// An edge connects two vertices and carries a geometric curve
/// that defines the shape of the edge between them.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// The geometric curve defining this edge's shape.
    pub curve: EdgeCurve,
    /// Parameter on the curve corresponding to the start vertex.
    pub t_start: f64,
    /// Parameter on the curve corresponding to the end vertex.
    pub t_end: f64,
    /// Maximum distance between the curve and the edge it stands for.
    pub tolerance: f64,
}

impl EdgeData {
    /// Creates an edge with the default tolerance.
    #[must_use]
    pub fn new(start: VertexId, end: VertexId, curve: EdgeCurve, t_start: f64, t_end: f64) -> Self {
        Self {
            start,
            end,
            curve,
            t_start,
            t_end,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Evaluates the edge curve at `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if curve evaluation fails.
    pub fn point_at(&self, t: f64) -> Result<Point3> {
        self.curve.as_curve().evaluate(t)
    }

    /// Unit tangent of the edge curve at `t`, in the direction of increasing `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tangent is degenerate.
    pub fn tangent_at(&self, t: f64) -> Result<Vector3> {
        self.curve.as_curve().tangent(t)
    }

    /// Length of the bounded edge.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.t_end - self.t_start).abs() * self.curve.as_curve().speed()
    }

    /// Parameters at which the edge is sampled for polylines and boxes.
    ///
    /// Lines need only their ends; arcs get one sample per sixteenth of a
    /// half turn.
    #[must_use]
    pub fn sample_parameters(&self) -> Vec<f64> {
        match &self.curve {
            EdgeCurve::Line(_) => vec![self.t_start, self.t_end],
            EdgeCurve::Arc(_) => {
                let sweep = self.t_end - self.t_start;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = ((sweep.abs() / (PI / 16.0)).ceil() as usize).max(2);
                #[allow(clippy::cast_precision_loss)]
                (0..=n)
                    .map(|i| self.t_start + sweep * (i as f64) / (n as f64))
                    .collect()
            }
        }
    }

    /// Converts a 3D distance into a parameter distance on this edge.
    #[must_use]
    pub fn parametric_tolerance(&self, tolerance: f64) -> f64 {
        tolerance / self.curve.as_curve().speed()
    }
}
