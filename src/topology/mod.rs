pub mod compound;
pub mod edge;
pub mod face;
pub mod shape;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use compound::{CompoundData, CompoundId};
pub use edge::{EdgeCurve, EdgeData, EdgeId};
pub use face::{FaceData, FaceId, FaceSurface};
pub use shape::{Shape, ShapeKind};
pub use shell::{ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId};
pub use wire::{OrientedEdge, WireData, WireId};

use std::collections::{HashMap, HashSet};

use crate::error::TopologyError;
use slotmap::SlotMap;

/// Central arena that owns all topological entities.
///
/// Entities reference each other via typed IDs (generational indices),
/// avoiding self-referential structures and enabling safe mutation.
#[derive(Debug, Default)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
    compounds: SlotMap<CompoundId, CompoundData>,
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex operations ---

    /// Inserts a vertex and returns its ID.
    pub fn add_vertex(&mut self, data: VertexData) -> VertexId {
        self.vertices.insert(data)
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, TopologyError> {
        self.vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    /// Returns a mutable reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexData, TopologyError> {
        self.vertices
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    // --- Edge operations ---

    /// Inserts an edge and returns its ID.
    pub fn add_edge(&mut self, data: EdgeData) -> EdgeId {
        self.edges.insert(data)
    }

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    /// Returns a mutable reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge_mut(&mut self, id: EdgeId) -> Result<&mut EdgeData, TopologyError> {
        self.edges
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    // --- Wire operations ---

    /// Inserts a wire and returns its ID.
    pub fn add_wire(&mut self, data: WireData) -> WireId {
        self.wires.insert(data)
    }

    /// Returns a reference to the wire data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn wire(&self, id: WireId) -> Result<&WireData, TopologyError> {
        self.wires
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("wire".into()))
    }

    // --- Face operations ---

    /// Inserts a face and returns its ID.
    pub fn add_face(&mut self, data: FaceData) -> FaceId {
        self.faces.insert(data)
    }

    /// Returns a reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face(&self, id: FaceId) -> Result<&FaceData, TopologyError> {
        self.faces
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()))
    }

    /// Returns a mutable reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face_mut(&mut self, id: FaceId) -> Result<&mut FaceData, TopologyError> {
        self.faces
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()))
    }

    // --- Shell operations ---

    /// Inserts a shell and returns its ID.
    pub fn add_shell(&mut self, data: ShellData) -> ShellId {
        self.shells.insert(data)
    }

    /// Returns a reference to the shell data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn shell(&self, id: ShellId) -> Result<&ShellData, TopologyError> {
        self.shells
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("shell".into()))
    }

    // --- Solid operations ---

    /// Inserts a solid and returns its ID.
    pub fn add_solid(&mut self, data: SolidData) -> SolidId {
        self.solids.insert(data)
    }

    /// Returns a reference to the solid data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn solid(&self, id: SolidId) -> Result<&SolidData, TopologyError> {
        self.solids
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("solid".into()))
    }

    // --- Compound operations ---

    /// Inserts a compound and returns its ID.
    pub fn add_compound(&mut self, data: CompoundData) -> CompoundId {
        self.compounds.insert(data)
    }

    /// Returns a reference to the compound data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn compound(&self, id: CompoundId) -> Result<&CompoundData, TopologyError> {
        self.compounds
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("compound".into()))
    }

    // --- Shape-level access ---

    /// Returns `true` if the handle refers to a live entity.
    #[must_use]
    pub fn contains(&self, shape: Shape) -> bool {
        match shape {
            Shape::Vertex(id) => self.vertices.contains_key(id),
            Shape::Edge(id) => self.edges.contains_key(id),
            Shape::Wire(id) => self.wires.contains_key(id),
            Shape::Face(id) => self.faces.contains_key(id),
            Shape::Shell(id) => self.shells.contains_key(id),
            Shape::Solid(id) => self.solids.contains_key(id),
            Shape::Compound(id) => self.compounds.contains_key(id),
        }
    }

    /// Direct children of `shape`, in stable order.
    ///
    /// An edge lists its start then end vertex (once if they coincide), a
    /// face its outer wire then its inner wires, a solid its outer shell
    /// then its voids.
    ///
    /// # Errors
    ///
    /// Returns an error if `shape` or a referenced entity is not found.
    pub fn sub_shapes(&self, shape: Shape) -> Result<Vec<Shape>, TopologyError> {
        Ok(match shape {
            Shape::Vertex(id) => {
                self.vertex(id)?;
                Vec::new()
            }
            Shape::Edge(id) => {
                let e = self.edge(id)?;
                if e.start == e.end {
                    vec![Shape::Vertex(e.start)]
                } else {
                    vec![Shape::Vertex(e.start), Shape::Vertex(e.end)]
                }
            }
            Shape::Wire(id) => self.wire(id)?.edges.iter().map(|oe| Shape::Edge(oe.edge)).collect(),
            Shape::Face(id) => {
                let f = self.face(id)?;
                std::iter::once(f.outer_wire)
                    .chain(f.inner_wires.iter().copied())
                    .map(Shape::Wire)
                    .collect()
            }
            Shape::Shell(id) => self.shell(id)?.faces.iter().copied().map(Shape::Face).collect(),
            Shape::Solid(id) => {
                let s = self.solid(id)?;
                std::iter::once(s.outer_shell)
                    .chain(s.inner_shells.iter().copied())
                    .map(Shape::Shell)
                    .collect()
            }
            Shape::Compound(id) => self.compound(id)?.children.clone(),
        })
    }

    /// Every distinct sub-shape of `kind` reachable from `shape`, depth-first,
    /// `shape` itself included when it has that kind.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is not found.
    pub fn explore(&self, shape: Shape, kind: ShapeKind) -> Result<Vec<Shape>, TopologyError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.explore_into(shape, kind, &mut seen, &mut out)?;
        Ok(out)
    }

    fn explore_into(
        &self,
        shape: Shape,
        kind: ShapeKind,
        seen: &mut HashSet<Shape>,
        out: &mut Vec<Shape>,
    ) -> Result<(), TopologyError> {
        if !seen.insert(shape) {
            return Ok(());
        }
        if shape.kind() == kind {
            out.push(shape);
            return Ok(());
        }
        if shape.kind() < kind {
            return Ok(());
        }
        for child in self.sub_shapes(shape)? {
            self.explore_into(child, kind, seen, out)?;
        }
        Ok(())
    }

    /// Distinct vertices of `shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is not found.
    pub fn vertices_of(&self, shape: Shape) -> Result<Vec<VertexId>, TopologyError> {
        Ok(self
            .explore(shape, ShapeKind::Vertex)?
            .into_iter()
            .filter_map(Shape::as_vertex)
            .collect())
    }

    /// Distinct edges of `shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is not found.
    pub fn edges_of(&self, shape: Shape) -> Result<Vec<EdgeId>, TopologyError> {
        Ok(self.explore(shape, ShapeKind::Edge)?.into_iter().filter_map(Shape::as_edge).collect())
    }

    /// Distinct faces of `shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is not found.
    pub fn faces_of(&self, shape: Shape) -> Result<Vec<FaceId>, TopologyError> {
        Ok(self.explore(shape, ShapeKind::Face)?.into_iter().filter_map(Shape::as_face).collect())
    }

    /// Copies `shape` and everything below it.
    ///
    /// Shared sub-shapes stay shared in the copy. Returns the copy and the map
    /// from every original sub-shape to its copy.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is not found.
    pub fn deep_copy(
        &mut self,
        shape: Shape,
    ) -> Result<(Shape, HashMap<Shape, Shape>), TopologyError> {
        let mut map = HashMap::new();
        let copy = self.copy_into(shape, &mut map)?;
        Ok((copy, map))
    }

    fn copy_into(
        &mut self,
        shape: Shape,
        map: &mut HashMap<Shape, Shape>,
    ) -> Result<Shape, TopologyError> {
        if let Some(&done) = map.get(&shape) {
            return Ok(done);
        }
        let copy = match shape {
            Shape::Vertex(id) => {
                let data = self.vertex(id)?.clone();
                Shape::Vertex(self.add_vertex(data))
            }
            Shape::Edge(id) => {
                let mut data = self.edge(id)?.clone();
                data.start = self.copy_vertex(data.start, map)?;
                data.end = self.copy_vertex(data.end, map)?;
                Shape::Edge(self.add_edge(data))
            }
            Shape::Wire(id) => {
                let mut data = self.wire(id)?.clone();
                for oe in &mut data.edges {
                    if let Shape::Edge(e) = self.copy_into(Shape::Edge(oe.edge), map)? {
                        oe.edge = e;
                    }
                }
                Shape::Wire(self.add_wire(data))
            }
            Shape::Face(id) => {
                let mut data = self.face(id)?.clone();
                if let Shape::Wire(w) = self.copy_into(Shape::Wire(data.outer_wire), map)? {
                    data.outer_wire = w;
                }
                for inner in &mut data.inner_wires {
                    if let Shape::Wire(w) = self.copy_into(Shape::Wire(*inner), map)? {
                        *inner = w;
                    }
                }
                Shape::Face(self.add_face(data))
            }
            Shape::Shell(id) => {
                let mut data = self.shell(id)?.clone();
                for face in &mut data.faces {
                    if let Shape::Face(f) = self.copy_into(Shape::Face(*face), map)? {
                        *face = f;
                    }
                }
                Shape::Shell(self.add_shell(data))
            }
            Shape::Solid(id) => {
                let mut data = self.solid(id)?.clone();
                if let Shape::Shell(s) = self.copy_into(Shape::Shell(data.outer_shell), map)? {
                    data.outer_shell = s;
                }
                for inner in &mut data.inner_shells {
                    if let Shape::Shell(s) = self.copy_into(Shape::Shell(*inner), map)? {
                        *inner = s;
                    }
                }
                Shape::Solid(self.add_solid(data))
            }
            Shape::Compound(id) => {
                let mut data = self.compound(id)?.clone();
                for child in &mut data.children {
                    *child = self.copy_into(*child, map)?;
                }
                Shape::Compound(self.add_compound(data))
            }
        };
        map.insert(shape, copy);
        Ok(copy)
    }

    fn copy_vertex(
        &mut self,
        id: VertexId,
        map: &mut HashMap<Shape, Shape>,
    ) -> Result<VertexId, TopologyError> {
        match self.copy_into(Shape::Vertex(id), map)? {
            Shape::Vertex(v) => Ok(v),
            _ => Err(TopologyError::InvalidTopology("vertex copied to another kind".into())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;

    #[test]
    fn box_enumeration_counts() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let shape = Shape::Solid(solid);
        assert_eq!(store.vertices_of(shape).unwrap().len(), 8);
        assert_eq!(store.edges_of(shape).unwrap().len(), 12);
        assert_eq!(store.faces_of(shape).unwrap().len(), 6);
    }

    #[test]
    fn deep_copy_keeps_sharing_and_maps_every_sub_shape() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let (copy, map) = store.deep_copy(Shape::Solid(solid)).unwrap();
        assert_ne!(copy, Shape::Solid(solid));
        assert_eq!(store.edges_of(copy).unwrap().len(), 12);
        assert_eq!(store.vertices_of(copy).unwrap().len(), 8);
        for v in store.vertices_of(Shape::Solid(solid)).unwrap() {
            let Some(Shape::Vertex(c)) = map.get(&Shape::Vertex(v)) else {
                panic!("vertex not mapped");
            };
            assert_eq!(store.vertex(v).unwrap().point, store.vertex(*c).unwrap().point);
        }
    }

    #[test]
    fn sub_shapes_of_missing_entity_fail() {
        let mut other = TopologyStore::new();
        let v = other.add_vertex(VertexData::new(Point3::origin()));
        let store = TopologyStore::new();
        assert!(!store.contains(Shape::Vertex(v)));
        assert!(store.sub_shapes(Shape::Vertex(v)).is_err());
    }
}
