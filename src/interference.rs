//! Interference records produced by the filler passes.

use std::fmt;

use crate::adaptor::PointState;
use crate::config::LevelOfCheck;
use crate::geometry::curve::Line;
use crate::geometry::curve2d::Line2d;
use crate::math::{Point2, Point3};
use crate::pave::Pave;
use crate::pool::ShapeIndex;

/// Kind of an interference, in pass order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InterferenceKind {
    VertexVertex,
    VertexEdge,
    EdgeEdge,
    VertexFace,
    EdgeFace,
    FaceFace,
}

impl InterferenceKind {
    pub const ALL: [InterferenceKind; 6] = [
        Self::VertexVertex,
        Self::VertexEdge,
        Self::EdgeEdge,
        Self::VertexFace,
        Self::EdgeFace,
        Self::FaceFace,
    ];

    /// Level of check at which the pass producing this kind runs.
    #[must_use]
    pub fn level(self) -> LevelOfCheck {
        let n = match self {
            Self::VertexVertex => 0,
            Self::VertexEdge => 1,
            Self::EdgeEdge => 2,
            Self::VertexFace => 3,
            Self::EdgeFace => 4,
            Self::FaceFace => 5,
        };
        LevelOfCheck::clamped(n)
    }
}

impl fmt::Display for InterferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VertexVertex => "vertex/vertex",
            Self::VertexEdge => "vertex/edge",
            Self::EdgeEdge => "edge/edge",
            Self::VertexFace => "vertex/face",
            Self::EdgeFace => "edge/face",
            Self::FaceFace => "face/face",
        };
        f.write_str(s)
    }
}

/// Geometry shared by two edges.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeEdgeGeometry {
    /// The edges cross at `vertex`.
    Point {
        t1: f64,
        t2: f64,
        vertex: ShapeIndex,
        is_new: bool,
    },
    /// Common block: the edges share the given parameter ranges.
    Overlap { range1: (f64, f64), range2: (f64, f64) },
}

/// State of one pave block of an edge lying in a face's surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockState {
    pub range: (f64, f64),
    pub state: PointState,
}

/// Geometry shared by an edge and a face.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeFaceGeometry {
    /// The edge pierces the face interior at `vertex`.
    Point {
        parameter: f64,
        vertex: ShapeIndex,
        is_new: bool,
    },
    /// The edge lies in the face surface; each pave block is classified
    /// against the face boundary.
    InPlane(Vec<BlockState>),
}

/// One trimmed section curve of two faces.
///
/// The pcurves share the 3D line's parametrisation; `paves` are ascending
/// and start and end at `range`.
#[derive(Debug, Clone)]
pub struct SectionCurve {
    pub curve: Line,
    pub pcurve_a: Line2d,
    pub pcurve_b: Line2d,
    pub range: (f64, f64),
    pub paves: Vec<Pave>,
    /// `false` when the section runs along an existing edge.
    pub is_new: bool,
}

impl SectionCurve {
    #[must_use]
    pub fn start_point(&self) -> Point3 {
        self.curve.origin() + self.curve.direction() * self.range.0
    }

    #[must_use]
    pub fn end_point(&self) -> Point3 {
        self.curve.origin() + self.curve.direction() * self.range.1
    }
}

/// Overlap of two coplanar faces.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonRegion {
    pub boundary: Vec<Point3>,
    pub area: f64,
}

/// Geometry shared by two faces.
#[derive(Debug, Clone)]
pub enum FaceFaceGeometry {
    Curves(Vec<SectionCurve>),
    /// Coplanar faces overlapping with positive area. The region is only
    /// computed when both faces are convex. Nothing is created for it.
    SameDomain { region: Option<CommonRegion> },
}

/// A detected interference between two sub-shapes.
///
/// Only vertex/vertex merges and point or section geometry can bring new
/// vertices into the pool; those carry their own `is_new` flag. Vertex/edge,
/// vertex/face and coplanar face/face records relate existing shapes and
/// never create topology, so [`Interference::is_new`] is always `false` for
/// them.
#[derive(Debug, Clone)]
pub enum Interference {
    VertexVertex {
        v1: ShapeIndex,
        v2: ShapeIndex,
        /// The vertex both were merged into.
        merged: ShapeIndex,
    },
    /// An existing vertex lying on an edge at `parameter`.
    VertexEdge {
        vertex: ShapeIndex,
        edge: ShapeIndex,
        parameter: f64,
    },
    EdgeEdge {
        edge1: ShapeIndex,
        edge2: ShapeIndex,
        geometry: EdgeEdgeGeometry,
    },
    /// An existing vertex lying inside a face at `uv`.
    VertexFace {
        vertex: ShapeIndex,
        face: ShapeIndex,
        uv: Point2,
    },
    EdgeFace {
        edge: ShapeIndex,
        face: ShapeIndex,
        geometry: EdgeFaceGeometry,
    },
    FaceFace {
        face1: ShapeIndex,
        face2: ShapeIndex,
        geometry: FaceFaceGeometry,
    },
}

impl Interference {
    #[must_use]
    pub fn kind(&self) -> InterferenceKind {
        match self {
            Self::VertexVertex { .. } => InterferenceKind::VertexVertex,
            Self::VertexEdge { .. } => InterferenceKind::VertexEdge,
            Self::EdgeEdge { .. } => InterferenceKind::EdgeEdge,
            Self::VertexFace { .. } => InterferenceKind::VertexFace,
            Self::EdgeFace { .. } => InterferenceKind::EdgeFace,
            Self::FaceFace { .. } => InterferenceKind::FaceFace,
        }
    }

    /// The two participating shapes.
    #[must_use]
    pub fn indices(&self) -> (ShapeIndex, ShapeIndex) {
        match *self {
            Self::VertexVertex { v1, v2, .. } => (v1, v2),
            Self::VertexEdge { vertex, edge, .. } => (vertex, edge),
            Self::EdgeEdge { edge1, edge2, .. } => (edge1, edge2),
            Self::VertexFace { vertex, face, .. } => (vertex, face),
            Self::EdgeFace { edge, face, .. } => (edge, face),
            Self::FaceFace { face1, face2, .. } => (face1, face2),
        }
    }

    /// Returns `true` if the record created a new vertex or section.
    #[must_use]
    pub fn is_new(&self) -> bool {
        match self {
            Self::VertexVertex { .. } => true,
            Self::VertexEdge { .. } | Self::VertexFace { .. } => false,
            Self::EdgeEdge { geometry, .. } => match geometry {
                EdgeEdgeGeometry::Point { is_new, .. } => *is_new,
                EdgeEdgeGeometry::Overlap { .. } => false,
            },
            Self::EdgeFace { geometry, .. } => match geometry {
                EdgeFaceGeometry::Point { is_new, .. } => *is_new,
                EdgeFaceGeometry::InPlane(_) => false,
            },
            Self::FaceFace { geometry, .. } => match geometry {
                FaceFaceGeometry::Curves(curves) => curves.iter().any(|c| c.is_new),
                FaceFaceGeometry::SameDomain { .. } => false,
            },
        }
    }
}

impl fmt::Display for Interference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.indices();
        write!(f, "{} {a} {b}", self.kind())?;
        match self {
            Self::VertexVertex { merged, .. } => write!(f, " -> {merged}"),
            Self::VertexEdge { parameter, .. } => write!(f, " t={parameter:.6}"),
            Self::EdgeEdge { geometry, .. } => match geometry {
                EdgeEdgeGeometry::Point { t1, t2, vertex, is_new } => {
                    write!(f, " point {vertex} t1={t1:.6} t2={t2:.6} new={is_new}")
                }
                EdgeEdgeGeometry::Overlap { range1, range2 } => write!(
                    f,
                    " overlap [{:.6}, {:.6}] [{:.6}, {:.6}]",
                    range1.0, range1.1, range2.0, range2.1
                ),
            },
            Self::VertexFace { uv, .. } => write!(f, " uv=({:.6}, {:.6})", uv.x, uv.y),
            Self::EdgeFace { geometry, .. } => match geometry {
                EdgeFaceGeometry::Point {
                    parameter,
                    vertex,
                    is_new,
                } => write!(f, " point {vertex} t={parameter:.6} new={is_new}"),
                EdgeFaceGeometry::InPlane(blocks) => {
                    write!(f, " in plane, {} blocks", blocks.len())
                }
            },
            Self::FaceFace { geometry, .. } => match geometry {
                FaceFaceGeometry::Curves(curves) => {
                    write!(f, " {} sections", curves.len())?;
                    for c in curves {
                        write!(
                            f,
                            "; [{:.6}, {:.6}] paves={} new={}",
                            c.range.0,
                            c.range.1,
                            c.paves.len(),
                            c.is_new
                        )?;
                    }
                    Ok(())
                }
                FaceFaceGeometry::SameDomain { region } => match region {
                    Some(r) => write!(f, " same domain, area={:.6}", r.area),
                    None => write!(f, " same domain"),
                },
            },
        }
    }
}
