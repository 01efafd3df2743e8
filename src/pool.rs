//! Flat index over every sub-shape of the operation's arguments.
//!
//! Each distinct shape gets one stable [`ShapeIndex`]; interference data
//! downstream refers to shapes only through these indices.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, instrument};

use crate::error::{OperationError, Result, TopologyError};
use crate::math::{Aabb, Point3};
use crate::topology::{
    EdgeCurve, EdgeId, FaceId, Shape, ShapeKind, TopologyStore, VertexData, VertexId,
};

/// Stable identity of a shape within one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeIndex(pub usize);

impl fmt::Display for ShapeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which argument of the operation a shape belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    First,
    Second,
    /// Shared by both arguments, or a vertex merged across them.
    Both,
    /// The single argument of a self-interference check.
    SelfCheck,
}

impl Operand {
    /// Tag of a shape reached from both `self` and `other`.
    #[must_use]
    pub fn merge(self, other: Operand) -> Operand {
        if self == other {
            self
        } else {
            Operand::Both
        }
    }

    /// Returns `true` if shapes tagged `self` and `other` come from
    /// different arguments.
    #[must_use]
    pub fn crosses(self, other: Operand) -> bool {
        match (self, other) {
            (Operand::SelfCheck, Operand::SelfCheck) => true,
            (Operand::First, Operand::First) | (Operand::Second, Operand::Second) => false,
            (Operand::SelfCheck, _) | (_, Operand::SelfCheck) => false,
            _ => true,
        }
    }
}

/// One indexed shape.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub shape: Shape,
    pub kind: ShapeKind,
    pub aabb: Aabb,
    pub operand: Operand,
    /// Direct children, in the store's order.
    pub sub_shapes: Vec<ShapeIndex>,
    /// Created during interference detection.
    pub is_new: bool,
}

/// The shape pool and its bounding-box index.
#[derive(Debug, Default)]
pub struct ShapePool {
    entries: Vec<PoolEntry>,
    index: HashMap<Shape, ShapeIndex>,
    same_domain: HashMap<ShapeIndex, ShapeIndex>,
    operands: Vec<ShapeIndex>,
}

impl ShapePool {
    /// Indexes every sub-shape of `operands`.
    ///
    /// One operand (or the same shape twice) builds a self-check pool.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MalformedInput`] when an operand references a
    /// missing entity or contains a degenerate sub-shape.
    #[instrument(skip(store))]
    pub fn build(store: &TopologyStore, operands: &[Shape]) -> Result<ShapePool> {
        let mut pool = ShapePool::default();
        let self_check = operands.len() == 1 || operands.windows(2).all(|w| w[0] == w[1]);
        for (i, &shape) in operands.iter().enumerate() {
            let operand = match (self_check, i) {
                (true, _) => Operand::SelfCheck,
                (false, 0) => Operand::First,
                (false, _) => Operand::Second,
            };
            let root = pool.add(store, shape, operand)?;
            if !pool.operands.contains(&root) {
                pool.operands.push(root);
            }
        }
        debug!(entries = pool.entries.len(), self_check, "shape pool built");
        Ok(pool)
    }

    /// Indexes `shape` and its sub-shapes; returns the existing index when the
    /// shape is already known.
    ///
    /// Indices are assigned depth-first, parents before children; bounding
    /// boxes are computed bottom-up.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MalformedInput`] on a missing or degenerate
    /// sub-shape.
    pub fn add(
        &mut self,
        store: &TopologyStore,
        shape: Shape,
        operand: Operand,
    ) -> Result<ShapeIndex> {
        if let Some(&existing) = self.index.get(&shape) {
            self.retag(existing, operand);
            return Ok(existing);
        }
        check_well_formed(store, shape)?;

        let idx = ShapeIndex(self.entries.len());
        self.entries.push(PoolEntry {
            shape,
            kind: shape.kind(),
            aabb: Aabb::empty(),
            operand,
            sub_shapes: Vec::new(),
            is_new: false,
        });
        self.index.insert(shape, idx);

        let children = store.sub_shapes(shape).map_err(malformed)?;
        let mut subs = Vec::with_capacity(children.len());
        for child in children {
            subs.push(self.add(store, child, operand)?);
        }

        let aabb = self.compute_box(store, shape, &subs)?;
        let entry = &mut self.entries[idx.0];
        entry.sub_shapes = subs;
        entry.aabb = aabb;
        Ok(idx)
    }

    fn retag(&mut self, idx: ShapeIndex, operand: Operand) {
        let entry = &mut self.entries[idx.0];
        let merged = entry.operand.merge(operand);
        if merged == entry.operand {
            return;
        }
        entry.operand = merged;
        let subs = entry.sub_shapes.clone();
        for sub in subs {
            self.retag(sub, operand);
        }
    }

    fn compute_box(
        &self,
        store: &TopologyStore,
        shape: Shape,
        subs: &[ShapeIndex],
    ) -> Result<Aabb> {
        let mut aabb = Aabb::empty();
        match shape {
            Shape::Vertex(id) => {
                let v = store.vertex(id)?;
                aabb.add_point(&v.point);
                aabb.enlarge(v.tolerance);
            }
            Shape::Edge(id) => {
                let e = store.edge(id)?;
                let ts = e.sample_parameters();
                for &t in &ts {
                    aabb.add_point(&e.point_at(t)?);
                }
                let mut gap = e.tolerance;
                if let EdgeCurve::Arc(arc) = &e.curve {
                    // Chords between samples stay within the sagitta of the arc.
                    #[allow(clippy::cast_precision_loss)]
                    let step = (e.t_end - e.t_start).abs() / (ts.len().max(2) - 1) as f64;
                    gap += arc.radius() * (1.0 - (0.5 * step).cos());
                }
                aabb.enlarge(gap);
                for s in subs {
                    aabb.add_box(&self.entries[s.0].aabb);
                }
            }
            Shape::Face(id) => {
                for s in subs {
                    aabb.add_box(&self.entries[s.0].aabb);
                }
                aabb.enlarge(store.face(id)?.tolerance);
            }
            _ => {
                for s in subs {
                    aabb.add_box(&self.entries[s.0].aabb);
                }
            }
        }
        Ok(aabb)
    }

    /// Adds a vertex created during interference detection.
    pub fn append_new_vertex(
        &mut self,
        store: &mut TopologyStore,
        point: Point3,
        tolerance: f64,
        operand: Operand,
    ) -> ShapeIndex {
        let id = store.add_vertex(VertexData::with_tolerance(point, tolerance));
        let shape = Shape::Vertex(id);
        let idx = ShapeIndex(self.entries.len());
        let mut aabb = Aabb::from_points([&point]);
        aabb.enlarge(tolerance);
        self.entries.push(PoolEntry {
            shape,
            kind: ShapeKind::Vertex,
            aabb,
            operand,
            sub_shapes: Vec::new(),
            is_new: true,
        });
        self.index.insert(shape, idx);
        idx
    }

    /// Re-reads a vertex's point and tolerance after it changed in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if `idx` is not a vertex of the store.
    pub fn refresh_vertex_box(&mut self, store: &TopologyStore, idx: ShapeIndex) -> Result<()> {
        let v = store.vertex(self.vertex_id(idx)?)?;
        let mut aabb = Aabb::from_points([&v.point]);
        aabb.enlarge(v.tolerance);
        self.entries[idx.0].aabb = aabb;
        Ok(())
    }

    /// Number of indexed shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Root indices of the operands, in argument order.
    #[must_use]
    pub fn operands(&self) -> &[ShapeIndex] {
        &self.operands
    }

    /// Returns `true` if the pool indexes a single argument.
    #[must_use]
    pub fn is_self_check(&self) -> bool {
        self.operands.len() == 1
    }

    #[must_use]
    pub fn entry(&self, idx: ShapeIndex) -> &PoolEntry {
        &self.entries[idx.0]
    }

    #[must_use]
    pub fn bounding_box(&self, idx: ShapeIndex) -> &Aabb {
        &self.entries[idx.0].aabb
    }

    #[must_use]
    pub fn shape(&self, idx: ShapeIndex) -> Shape {
        self.entries[idx.0].shape
    }

    #[must_use]
    pub fn kind(&self, idx: ShapeIndex) -> ShapeKind {
        self.entries[idx.0].kind
    }

    #[must_use]
    pub fn operand(&self, idx: ShapeIndex) -> Operand {
        self.entries[idx.0].operand
    }

    #[must_use]
    pub fn sub_shapes(&self, idx: ShapeIndex) -> &[ShapeIndex] {
        &self.entries[idx.0].sub_shapes
    }

    #[must_use]
    pub fn index_of(&self, shape: Shape) -> Option<ShapeIndex> {
        self.index.get(&shape).copied()
    }

    /// All indices of one kind, ascending.
    #[must_use]
    pub fn indices_of_kind(&self, kind: ShapeKind) -> Vec<ShapeIndex> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == kind)
            .map(|(i, _)| ShapeIndex(i))
            .collect()
    }

    /// Returns `true` if a pair of these shapes may interfere: they come from
    /// different arguments (or the pool is a self check) and neither is a
    /// sub-shape of the other.
    #[must_use]
    pub fn is_candidate_pair(&self, a: ShapeIndex, b: ShapeIndex) -> bool {
        a != b
            && self.operand(a).crosses(self.operand(b))
            && !self.is_sub_shape(a, b)
            && !self.is_sub_shape(b, a)
    }

    /// Maps `from` onto `to`; both are resolved first so chains stay acyclic.
    pub fn set_same_domain(&mut self, from: ShapeIndex, to: ShapeIndex) {
        let from = self.real_vertex(from);
        let to = self.real_vertex(to);
        if from != to {
            self.same_domain.insert(from, to);
        }
    }

    /// Follows the same-domain map to the surviving vertex.
    #[must_use]
    pub fn real_vertex(&self, idx: ShapeIndex) -> ShapeIndex {
        let mut current = idx;
        while let Some(&next) = self.same_domain.get(&current) {
            current = next;
        }
        current
    }

    /// Returns `true` if `idx` was mapped onto another vertex.
    #[must_use]
    pub fn has_same_domain(&self, idx: ShapeIndex) -> bool {
        self.same_domain.contains_key(&idx)
    }

    /// Returns `true` if `sub` is reachable from `of` through sub-shape lists.
    #[must_use]
    pub fn is_sub_shape(&self, sub: ShapeIndex, of: ShapeIndex) -> bool {
        let mut stack: Vec<ShapeIndex> = self.sub_shapes(of).to_vec();
        while let Some(s) = stack.pop() {
            if s == sub {
                return true;
            }
            if self.kind(s) > self.kind(sub) {
                stack.extend_from_slice(self.sub_shapes(s));
            }
        }
        false
    }

    /// Resolved start and end vertices of an edge.
    #[must_use]
    pub fn edge_vertices(&self, edge: ShapeIndex) -> (ShapeIndex, ShapeIndex) {
        let subs = self.sub_shapes(edge);
        let first = subs.first().copied().unwrap_or(edge);
        let last = subs.last().copied().unwrap_or(first);
        (self.real_vertex(first), self.real_vertex(last))
    }

    /// Distinct edges of a face, in wire order.
    #[must_use]
    pub fn face_edges(&self, face: ShapeIndex) -> Vec<ShapeIndex> {
        let mut edges = Vec::new();
        for &wire in self.sub_shapes(face) {
            for &edge in self.sub_shapes(wire) {
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }

    /// Distinct resolved vertices of a face, ascending.
    #[must_use]
    pub fn face_vertices(&self, face: ShapeIndex) -> Vec<ShapeIndex> {
        let mut vertices: Vec<ShapeIndex> = self
            .face_edges(face)
            .into_iter()
            .flat_map(|e| {
                let (a, b) = self.edge_vertices(e);
                [a, b]
            })
            .collect();
        vertices.sort_unstable();
        vertices.dedup();
        vertices
    }

    /// Store key of a vertex entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `idx` is not a vertex.
    pub fn vertex_id(&self, idx: ShapeIndex) -> Result<VertexId> {
        self.shape(idx).as_vertex().ok_or_else(|| wrong_kind(idx, ShapeKind::Vertex))
    }

    /// Store key of an edge entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `idx` is not an edge.
    pub fn edge_id(&self, idx: ShapeIndex) -> Result<EdgeId> {
        self.shape(idx).as_edge().ok_or_else(|| wrong_kind(idx, ShapeKind::Edge))
    }

    /// Store key of a face entry.
    ///
    /// # Errors
    ///
    /// Returns an error if `idx` is not a face.
    pub fn face_id(&self, idx: ShapeIndex) -> Result<FaceId> {
        self.shape(idx).as_face().ok_or_else(|| wrong_kind(idx, ShapeKind::Face))
    }
}

fn wrong_kind(idx: ShapeIndex, expected: ShapeKind) -> crate::error::BopError {
    TopologyError::InvalidTopology(format!("pool entry {idx} is not a {expected}")).into()
}

fn malformed(err: TopologyError) -> crate::error::BopError {
    OperationError::MalformedInput(err.to_string()).into()
}

fn check_well_formed(store: &TopologyStore, shape: Shape) -> Result<()> {
    if !store.contains(shape) {
        return Err(OperationError::MalformedInput(format!("null {} handle", shape.kind())).into());
    }
    match shape {
        Shape::Edge(id) => {
            let e = store.edge(id)?;
            if e.length() <= e.tolerance {
                return Err(OperationError::MalformedInput("zero-length edge".into()).into());
            }
        }
        Shape::Wire(id) => {
            if store.wire(id)?.edges.is_empty() {
                return Err(OperationError::MalformedInput("wire without edges".into()).into());
            }
        }
        Shape::Face(id) => {
            let outer = store.face(id)?.outer_wire;
            if store.wire(outer).map_err(malformed)?.edges.is_empty() {
                return Err(
                    OperationError::MalformedInput("face without outer boundary".into()).into(),
                );
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::BopError;
    use crate::geometry::curve::Line;
    use crate::math::Vector3;
    use crate::operations::creation::{MakeBox, MakeWire};
    use crate::topology::{EdgeData, WireData};

    fn unit_box(store: &mut TopologyStore, x: f64) -> Shape {
        Shape::Solid(
            MakeBox::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0))
                .execute(store)
                .unwrap(),
        )
    }

    #[test]
    fn box_indexes_every_sub_shape_once() {
        let mut store = TopologyStore::new();
        let solid = unit_box(&mut store, 0.0);
        let pool = ShapePool::build(&store, &[solid]).unwrap();
        // solid + shell + 6 faces + 6 wires + 12 edges + 8 vertices
        assert_eq!(pool.len(), 34);
        assert_eq!(pool.indices_of_kind(ShapeKind::Edge).len(), 12);
        assert_eq!(pool.indices_of_kind(ShapeKind::Vertex).len(), 8);
        assert!(pool.is_self_check());
    }

    #[test]
    fn parents_come_before_children() {
        let mut store = TopologyStore::new();
        let solid = unit_box(&mut store, 0.0);
        let pool = ShapePool::build(&store, &[solid]).unwrap();
        assert_eq!(pool.index_of(solid), Some(ShapeIndex(0)));
        for j in 1..pool.len() {
            let has_earlier_parent =
                (0..j).any(|i| pool.sub_shapes(ShapeIndex(i)).contains(&ShapeIndex(j)));
            assert!(has_earlier_parent, "entry {j} indexed before its parent");
        }
    }

    #[test]
    fn adding_twice_is_idempotent() {
        let mut store = TopologyStore::new();
        let solid = unit_box(&mut store, 0.0);
        let mut pool = ShapePool::build(&store, &[solid]).unwrap();
        let len = pool.len();
        let again = pool.add(&store, solid, Operand::SelfCheck).unwrap();
        assert_eq!(again, ShapeIndex(0));
        assert_eq!(pool.len(), len);
    }

    #[test]
    fn boxes_nest_and_include_tolerance() {
        let mut store = TopologyStore::new();
        let solid = unit_box(&mut store, 0.0);
        let pool = ShapePool::build(&store, &[solid]).unwrap();
        for i in 0..pool.len() {
            let idx = ShapeIndex(i);
            for &s in pool.sub_shapes(idx) {
                assert!(pool.bounding_box(idx).contains_box(pool.bounding_box(s)));
            }
        }
        let root = pool.bounding_box(ShapeIndex(0));
        assert!(root.min.x < 0.0 && root.max.x > 1.0);
    }

    #[test]
    fn two_operands_are_tagged_apart() {
        let mut store = TopologyStore::new();
        let a = unit_box(&mut store, 0.0);
        let b = unit_box(&mut store, 1.0);
        let pool = ShapePool::build(&store, &[a, b]).unwrap();
        assert_eq!(pool.operands().len(), 2);
        let fa = pool.indices_of_kind(ShapeKind::Face);
        assert_eq!(pool.operand(fa[0]), Operand::First);
        assert_eq!(pool.operand(fa[6]), Operand::Second);
        assert!(pool.is_candidate_pair(fa[0], fa[6]));
        assert!(!pool.is_candidate_pair(fa[0], fa[1]));
    }

    #[test]
    fn shared_sub_shapes_belong_to_both() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
            false,
        )
        .execute(&mut store)
        .unwrap();
        let edges = store.wire(wire).unwrap().edges.clone();
        let other = store.add_wire(WireData {
            edges: vec![edges[1]],
            is_closed: false,
        });
        let pool = ShapePool::build(&store, &[Shape::Wire(wire), Shape::Wire(other)]).unwrap();
        let shared = pool.index_of(Shape::Edge(edges[1].edge)).unwrap();
        let own = pool.index_of(Shape::Edge(edges[0].edge)).unwrap();
        assert_eq!(pool.operand(shared), Operand::Both);
        assert_eq!(pool.operand(own), Operand::First);
    }

    #[test]
    fn self_check_excludes_sub_shape_pairs() {
        let mut store = TopologyStore::new();
        let solid = unit_box(&mut store, 0.0);
        let pool = ShapePool::build(&store, &[solid]).unwrap();
        let face = pool.indices_of_kind(ShapeKind::Face)[0];
        let own_edge = pool.face_edges(face)[0];
        assert!(!pool.is_candidate_pair(face, own_edge));
        let foreign = pool
            .indices_of_kind(ShapeKind::Edge)
            .into_iter()
            .find(|e| !pool.is_sub_shape(*e, face))
            .unwrap();
        assert!(pool.is_candidate_pair(face, foreign));
    }

    #[test]
    fn same_domain_resolves_transitively() {
        let mut store = TopologyStore::new();
        let solid = unit_box(&mut store, 0.0);
        let mut pool = ShapePool::build(&store, &[solid]).unwrap();
        let v = pool.indices_of_kind(ShapeKind::Vertex);
        pool.set_same_domain(v[0], v[1]);
        pool.set_same_domain(v[1], v[2]);
        pool.set_same_domain(v[2], v[0]);
        assert_eq!(pool.real_vertex(v[0]), v[2]);
        assert_eq!(pool.real_vertex(v[1]), v[2]);
        assert_eq!(pool.real_vertex(v[2]), v[2]);
    }

    #[test]
    fn new_vertices_are_appended() {
        let mut store = TopologyStore::new();
        let solid = unit_box(&mut store, 0.0);
        let mut pool = ShapePool::build(&store, &[solid]).unwrap();
        let before = pool.len();
        let v = pool.append_new_vertex(
            &mut store,
            Point3::new(0.5, 0.5, 0.5),
            1e-6,
            Operand::SelfCheck,
        );
        assert_eq!(v, ShapeIndex(before));
        assert!(pool.entry(v).is_new);
        assert_eq!(pool.index_of(pool.shape(v)), Some(v));
    }

    #[test]
    fn zero_length_edge_is_malformed() {
        let mut store = TopologyStore::new();
        let a = store.add_vertex(VertexData::new(Point3::origin()));
        let line = Line::new(Point3::origin(), Vector3::x()).unwrap();
        let e = store.add_edge(EdgeData::new(a, a, EdgeCurve::Line(line), 0.0, 0.0));
        let err = ShapePool::build(&store, &[Shape::Edge(e)]).unwrap_err();
        assert!(matches!(err, BopError::Operation(OperationError::MalformedInput(_))));
    }

    #[test]
    fn missing_handle_is_malformed() {
        let mut other = TopologyStore::new();
        let v = other.add_vertex(VertexData::new(Point3::origin()));
        let store = TopologyStore::new();
        let err = ShapePool::build(&store, &[Shape::Vertex(v)]).unwrap_err();
        assert!(matches!(err, BopError::Operation(OperationError::MalformedInput(_))));
    }
}
