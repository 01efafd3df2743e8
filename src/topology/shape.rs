use std::fmt;

use super::{CompoundId, EdgeId, FaceId, ShellId, SolidId, VertexId, WireId};

/// A handle to any topological entity of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Vertex(VertexId),
    Edge(EdgeId),
    Wire(WireId),
    Face(FaceId),
    Shell(ShellId),
    Solid(SolidId),
    Compound(CompoundId),
}

/// The type of a [`Shape`], ordered from lowest to highest dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Vertex,
    Edge,
    Wire,
    Face,
    Shell,
    Solid,
    Compound,
}

impl Shape {
    /// Returns the kind of the shape.
    #[must_use]
    pub fn kind(self) -> ShapeKind {
        match self {
            Self::Vertex(_) => ShapeKind::Vertex,
            Self::Edge(_) => ShapeKind::Edge,
            Self::Wire(_) => ShapeKind::Wire,
            Self::Face(_) => ShapeKind::Face,
            Self::Shell(_) => ShapeKind::Shell,
            Self::Solid(_) => ShapeKind::Solid,
            Self::Compound(_) => ShapeKind::Compound,
        }
    }

    #[must_use]
    pub fn as_vertex(self) -> Option<VertexId> {
        match self {
            Self::Vertex(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_edge(self) -> Option<EdgeId> {
        match self {
            Self::Edge(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_face(self) -> Option<FaceId> {
        match self {
            Self::Face(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertex => "vertex",
            Self::Edge => "edge",
            Self::Wire => "wire",
            Self::Face => "face",
            Self::Shell => "shell",
            Self::Solid => "solid",
            Self::Compound => "compound",
        };
        f.write_str(name)
    }
}

impl From<VertexId> for Shape {
    fn from(id: VertexId) -> Self {
        Self::Vertex(id)
    }
}

impl From<EdgeId> for Shape {
    fn from(id: EdgeId) -> Self {
        Self::Edge(id)
    }
}

impl From<WireId> for Shape {
    fn from(id: WireId) -> Self {
        Self::Wire(id)
    }
}

impl From<FaceId> for Shape {
    fn from(id: FaceId) -> Self {
        Self::Face(id)
    }
}

impl From<ShellId> for Shape {
    fn from(id: ShellId) -> Self {
        Self::Shell(id)
    }
}

impl From<SolidId> for Shape {
    fn from(id: SolidId) -> Self {
        Self::Solid(id)
    }
}

impl From<CompoundId> for Shape {
    fn from(id: CompoundId) -> Self {
        Self::Compound(id)
    }
}
