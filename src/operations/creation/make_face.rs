use crate::error::{GeometryError, Result, TopologyError};
use crate::geometry::surface::Plane;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{FaceData, FaceId, FaceSurface, TopologyStore, WireId};

/// Deviation from the fitted plane accepted for a boundary point.
const PLANARITY_TOLERANCE: f64 = 1e-6;

/// Creates a planar face bounded by closed wires.
///
/// The plane is fitted to the outer wire with Newell's method; the face
/// normal follows the outer wire's counter-clockwise orientation.
pub struct MakeFace {
    outer_wire: WireId,
    inner_wires: Vec<WireId>,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(outer_wire: WireId, inner_wires: Vec<WireId>) -> Self {
        Self {
            outer_wire,
            inner_wires,
        }
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a wire is open or missing, the outer wire encloses
    /// no area, or a boundary point lies off the fitted plane.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        for &w in std::iter::once(&self.outer_wire).chain(&self.inner_wires) {
            if !store.wire(w)?.is_closed {
                return Err(TopologyError::WireNotClosed.into());
            }
        }

        let outer = store.wire_polyline(self.outer_wire)?;
        let normal = newell_normal(&outer);
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::Degenerate("outer wire encloses no area".into()).into());
        }
        #[allow(clippy::cast_precision_loss)]
        let centroid = Point3::from(
            outer.iter().map(|p| p.coords).sum::<Vector3>() / outer.len() as f64,
        );
        let plane = Plane::from_normal(centroid, normal / len)?;

        for &w in std::iter::once(&self.outer_wire).chain(&self.inner_wires) {
            for p in store.wire_polyline(w)? {
                if plane.distance(&p) > PLANARITY_TOLERANCE {
                    let reason = "face boundary is not planar".into();
                    return Err(GeometryError::Degenerate(reason).into());
                }
            }
        }

        Ok(store.add_face(FaceData::new(
            FaceSurface::Plane(plane),
            self.outer_wire,
            self.inner_wires.clone(),
            true,
        )))
    }
}

/// Newell's polygon normal; its length is twice the enclosed area.
fn newell_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}
