use std::collections::HashMap;

use crate::error::{OperationError, Result};
use crate::math::{Point3, TOLERANCE};
use crate::topology::{OrientedEdge, ShellData, SolidId, TopologyStore, VertexData};

use super::{MakeEdge, MakeFace, MakeSolid, MakeWire};

/// Corner indices of each face, counter-clockwise seen from outside.
///
/// Corner `i` has x from bit 0, y from bit 1, z from bit 2.
const FACES: [[usize; 4]; 6] = [
    [0, 2, 3, 1],
    [4, 5, 7, 6],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 4, 6, 2],
    [1, 3, 7, 5],
];

/// Creates an axis-aligned box solid from two corner points.
///
/// The box has 8 vertices, 12 edges shared between adjacent faces, and 6
/// outward-oriented faces in one closed shell.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
        }
    }

    /// Executes the operation, creating the box in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the box is flat along any axis.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let (lo, hi) = (self.min_corner, self.max_corner);
        if (hi - lo).iter().any(|d| *d < TOLERANCE) {
            return Err(OperationError::InvalidInput("box extents must be positive".into()).into());
        }

        let corners: Vec<_> = (0..8)
            .map(|i| {
                let pick = |bit: usize, a: f64, b: f64| if i & bit == 0 { a } else { b };
                let p = Point3::new(pick(1, lo.x, hi.x), pick(2, lo.y, hi.y), pick(4, lo.z, hi.z));
                store.add_vertex(VertexData::new(p))
            })
            .collect();

        let mut edges = HashMap::new();
        let mut faces = Vec::with_capacity(6);
        for quad in FACES {
            let mut oriented = Vec::with_capacity(4);
            for k in 0..4 {
                let (a, b) = (quad[k], quad[(k + 1) % 4]);
                let key = (a.min(b), a.max(b));
                let edge = match edges.get(&key) {
                    Some(&e) => e,
                    None => {
                        let e = MakeEdge::line(corners[key.0], corners[key.1]).execute(store)?;
                        edges.insert(key, e);
                        e
                    }
                };
                oriented.push(OrientedEdge::new(edge, a < b));
            }
            let wire = MakeWire::from_edges(oriented).execute(store)?;
            faces.push(MakeFace::new(wire, vec![]).execute(store)?);
        }

        let shell = store.add_shell(ShellData {
            faces,
            is_closed: true,
        });
        MakeSolid::new(shell, vec![]).execute(store)
    }
}
