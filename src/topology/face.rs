use crate::error::Result;
use crate::geometry::surface::Plane;
use crate::math::{Point2, Point3, Vector2, Vector3, DEFAULT_TOLERANCE};

use super::wire::WireId;
use super::TopologyStore;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// The geometric surface associated with a face.
#[derive(Debug, Clone)]
pub enum FaceSurface {
    /// A planar surface.
    Plane(Plane),
}

impl FaceSurface {
    /// Returns the supporting plane.
    #[must_use]
    pub fn plane(&self) -> &Plane {
        match self {
            Self::Plane(plane) => plane,
        }
    }
}

/// Data associated with a topological face.
///
/// A face is a bounded region on a surface, defined by an outer wire
/// and optionally inner wires (holes).
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The geometric surface on which this face lies.
    pub surface: FaceSurface,
    /// The outer boundary wire.
    pub outer_wire: WireId,
    /// Inner boundary wires (holes).
    pub inner_wires: Vec<WireId>,
    /// If `true`, the face normal agrees with the surface normal.
    pub same_sense: bool,
    /// Maximum distance between the surface and the face it stands for.
    pub tolerance: f64,
}

impl FaceData {
    /// Creates a face with the default tolerance.
    #[must_use]
    pub fn new(
        surface: FaceSurface,
        outer_wire: WireId,
        inner_wires: Vec<WireId>,
        same_sense: bool,
    ) -> Self {
        Self {
            surface,
            outer_wire,
            inner_wires,
            same_sense,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Outward normal of the face.
    #[must_use]
    pub fn normal(&self) -> Vector3 {
        let n = *self.surface.plane().plane_normal();
        if self.same_sense {
            n
        } else {
            -n
        }
    }

    /// Coordinates of `point` in the face frame.
    ///
    /// The frame is the surface (u, v) frame with v flipped when the face
    /// opposes its surface, so outer boundaries run counter-clockwise.
    #[must_use]
    pub fn to_frame(&self, point: &Point3) -> Point2 {
        let uv = self.surface.plane().project(point);
        if self.same_sense {
            uv
        } else {
            Point2::new(uv.x, -uv.y)
        }
    }

    /// Inverse of [`FaceData::to_frame`] for points on the surface.
    #[must_use]
    pub fn from_frame(&self, point: &Point2) -> Point3 {
        let uv = if self.same_sense {
            *point
        } else {
            Point2::new(point.x, -point.y)
        };
        self.surface.plane().point_at(&uv)
    }

    /// Maps a 3D direction into the face frame.
    #[must_use]
    pub fn direction_to_frame(&self, dir: &Vector3) -> Vector2 {
        let plane = self.surface.plane();
        let v = dir.dot(plane.v_dir());
        Vector2::new(dir.dot(plane.u_dir()), if self.same_sense { v } else { -v })
    }
}

impl TopologyStore {
    /// Boundary loops of `face` in its frame, outer loop first.
    ///
    /// Arcs are sampled; each loop is implicitly closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its wires is not found.
    pub fn face_loops(&self, face: FaceId) -> Result<Vec<Vec<Point2>>> {
        let data = self.face(face)?;
        std::iter::once(data.outer_wire)
            .chain(data.inner_wires.iter().copied())
            .map(|w| {
                Ok(self
                    .wire_polyline(w)?
                    .iter()
                    .map(|p| data.to_frame(p))
                    .collect())
            })
            .collect()
    }
}
