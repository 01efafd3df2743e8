//! Reconstruction of split topology from the detected interferences.
//!
//! The builder turns a [`FillerState`] into the general fuse of its
//! arguments: edges split at their paves, new edges along face/face
//! sections, faces rebuilt by walking their split boundaries, and a
//! compound collecting every piece.

mod edges;
mod faces;

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{info, instrument, warn};

use crate::error::{Result, Warning};
use crate::filler::FillerState;
use crate::interference::{FaceFaceGeometry, Interference};
use crate::operations::creation::MakeCompound;
use crate::pool::{ShapeIndex, ShapePool};
use crate::topology::{FaceId, Shape, ShapeKind, TopologyStore, VertexId};

use self::edges::{internal_edges, split_edges, Piece};
use self::faces::{rebuild_face, Rebuilt};

/// The general fuse of two shapes and the history of how it was built.
#[derive(Debug, Clone)]
pub struct BuildResult {
    shape: Shape,
    images: HashMap<Shape, Vec<Shape>>,
    warnings: Vec<Warning>,
}

impl BuildResult {
    /// The result compound.
    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Pieces that replace `shape` in the result.
    ///
    /// An unmodified shape is its own image; shapes that were not part of
    /// the arguments, and wires, shells and solids, have none.
    #[must_use]
    pub fn images(&self, shape: Shape) -> &[Shape] {
        self.images.get(&shape).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Builds the general fuse from a completed [`FillerState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Builder;

impl Builder {
    /// Splits and rebuilds the arguments indexed in `state`.
    ///
    /// # Errors
    ///
    /// Returns an error when the state references shapes missing from
    /// `store` or pave data contradicts the pool. Faces that cannot be
    /// rebuilt are kept whole and reported as warnings.
    #[instrument(skip_all)]
    pub fn perform(store: &mut TopologyStore, state: &FillerState) -> Result<BuildResult> {
        let pool = state.pool();
        let mut warnings = Vec::new();
        let mut images: HashMap<Shape, Vec<Shape>> = HashMap::new();

        for v in pool.indices_of_kind(ShapeKind::Vertex) {
            let real = pool.real_vertex(v);
            images.insert(pool.shape(v), vec![Shape::Vertex(pool.vertex_id(real)?)]);
        }

        let pieces = split_edges(store, state)?;
        for (&edge, list) in &pieces {
            images.insert(pool.shape(edge), list.iter().map(|p| Shape::Edge(p.edge)).collect());
        }
        let internal = internal_edges(store, state, &pieces)?;

        let mut face_images: BTreeMap<ShapeIndex, Vec<FaceId>> = BTreeMap::new();
        for face in pool.indices_of_kind(ShapeKind::Face) {
            let id = pool.face_id(face)?;
            let inside = internal.get(&face).map_or(&[][..], Vec::as_slice);
            let changed = boundary_changed(pool, face, &pieces);
            if inside.is_empty() && !changed {
                face_images.insert(face, vec![id]);
                continue;
            }
            match rebuild_face(store, pool, face, &pieces, inside, changed, &mut warnings)? {
                Rebuilt::Unchanged => {
                    face_images.insert(face, vec![id]);
                }
                Rebuilt::Faces(list) => {
                    face_images.insert(face, list);
                }
                Rebuilt::Failed(reason) => {
                    warn!(face = %face, reason = %reason, "face kept unsplit");
                    warnings.push(Warning::FaceNotRebuilt { face, reason });
                    face_images.insert(face, vec![id]);
                }
            }
        }
        merge_same_domain_faces(store, state, &mut face_images)?;
        for (&face, list) in &face_images {
            images.insert(pool.shape(face), list.iter().map(|&f| Shape::Face(f)).collect());
        }

        let children = collect_result(store, pool, &face_images, &pieces)?;
        let shape = Shape::Compound(MakeCompound::new(children).execute(store)?);
        info!(faces = face_images.len(), warnings = warnings.len(), "general fuse built");
        Ok(BuildResult {
            shape,
            images,
            warnings,
        })
    }
}

fn boundary_changed(
    pool: &ShapePool,
    face: ShapeIndex,
    pieces: &BTreeMap<ShapeIndex, Vec<Piece>>,
) -> bool {
    pool.face_edges(face).into_iter().any(|edge| match pieces.get(&edge).map(Vec::as_slice) {
        Some([piece]) => pool.shape(edge) != Shape::Edge(piece.edge),
        _ => true,
    })
}

/// Vertices of a face after merging, ascending.
fn resolved_vertices(
    store: &TopologyStore,
    pool: &ShapePool,
    face: FaceId,
) -> Result<Vec<VertexId>> {
    let mut vertices = Vec::new();
    for v in store.vertices_of(Shape::Face(face))? {
        let resolved = match pool.index_of(Shape::Vertex(v)) {
            Some(idx) => pool.vertex_id(pool.real_vertex(idx))?,
            None => v,
        };
        vertices.push(resolved);
    }
    vertices.sort_unstable();
    vertices.dedup();
    Ok(vertices)
}

/// Images of the second face of a same-domain pair that bound the same
/// vertices as an image of the first are replaced by that image.
fn merge_same_domain_faces(
    store: &TopologyStore,
    state: &FillerState,
    face_images: &mut BTreeMap<ShapeIndex, Vec<FaceId>>,
) -> Result<()> {
    let pool = state.pool();
    for record in state.interferences() {
        let Interference::FaceFace {
            face1,
            face2,
            geometry: FaceFaceGeometry::SameDomain { .. },
        } = *record
        else {
            continue;
        };
        let kept: Vec<(FaceId, Vec<VertexId>)> = face_images
            .get(&face1)
            .into_iter()
            .flatten()
            .map(|&f| Ok((f, resolved_vertices(store, pool, f)?)))
            .collect::<Result<_>>()?;
        let Some(others) = face_images.get_mut(&face2) else {
            continue;
        };
        for image in others.iter_mut() {
            let vertices = resolved_vertices(store, pool, *image)?;
            if let Some((twin, _)) = kept.iter().find(|(_, vs)| *vs == vertices) {
                *image = *twin;
            }
        }
    }
    Ok(())
}

/// Face images, free edge images and free vertices, in pool order and
/// without repeats.
fn collect_result(
    store: &TopologyStore,
    pool: &ShapePool,
    face_images: &BTreeMap<ShapeIndex, Vec<FaceId>>,
    pieces: &BTreeMap<ShapeIndex, Vec<Piece>>,
) -> Result<Vec<Shape>> {
    let mut children: Vec<Shape> = Vec::new();
    let mut emitted: HashSet<Shape> = HashSet::new();
    let mut push = |children: &mut Vec<Shape>, shape: Shape| {
        if emitted.insert(shape) {
            children.push(shape);
        }
    };

    let faces = pool.indices_of_kind(ShapeKind::Face);
    let bounded: HashSet<ShapeIndex> = faces.iter().flat_map(|&f| pool.face_edges(f)).collect();
    for face in &faces {
        for &image in face_images.get(face).into_iter().flatten() {
            push(&mut children, Shape::Face(image));
        }
    }
    for edge in pool.indices_of_kind(ShapeKind::Edge) {
        if bounded.contains(&edge) {
            continue;
        }
        for piece in pieces.get(&edge).into_iter().flatten() {
            push(&mut children, Shape::Edge(piece.edge));
        }
    }

    let mut used: HashSet<VertexId> = HashSet::new();
    for child in &children {
        used.extend(store.vertices_of(*child)?);
    }
    for v in pool.indices_of_kind(ShapeKind::Vertex) {
        if pool.entry(v).is_new {
            continue;
        }
        let id = pool.vertex_id(pool.real_vertex(v))?;
        if !used.contains(&id) {
            push(&mut children, Shape::Vertex(id));
        }
    }
    Ok(children)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::FillerConfig;
    use crate::filler::PaveFiller;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeEdge, MakeFace, MakeWire};
    use crate::topology::VertexData;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn fuse(store: &mut TopologyStore, a: Shape, b: Shape) -> (FillerState, BuildResult) {
        let state = PaveFiller::new(FillerConfig::default()).perform(store, a, b).unwrap();
        let result = Builder::perform(store, &state).unwrap();
        (state, result)
    }

    fn children(store: &TopologyStore, result: &BuildResult) -> Vec<Shape> {
        let Shape::Compound(c) = result.shape() else {
            panic!("result is not a compound");
        };
        store.compound(c).unwrap().children.clone()
    }

    fn count(shapes: &[Shape], kind: ShapeKind) -> usize {
        shapes.iter().filter(|s| s.kind() == kind).count()
    }

    #[test]
    fn disjoint_boxes_are_returned_unchanged() {
        let mut store = TopologyStore::new();
        let a = Shape::Solid(
            MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
                .execute(&mut store)
                .unwrap(),
        );
        let b = Shape::Solid(
            MakeBox::new(p(5.0, 0.0, 0.0), p(6.0, 1.0, 1.0))
                .execute(&mut store)
                .unwrap(),
        );
        let (_, result) = fuse(&mut store, a, b);
        let shapes = children(&store, &result);
        assert_eq!(count(&shapes, ShapeKind::Face), 12);
        for face in store.faces_of(a).unwrap() {
            assert_eq!(result.images(Shape::Face(face)), &[Shape::Face(face)]);
        }
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn crossing_squares_are_split_in_two_each() {
        let mut store = TopologyStore::new();
        let horizontal = MakeWire::new(
            vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0), p(0.0, 2.0, 0.0)],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let vertical = MakeWire::new(
            vec![p(1.0, -1.0, -1.0), p(1.0, 3.0, -1.0), p(1.0, 3.0, 1.0), p(1.0, -1.0, 1.0)],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let h = Shape::Face(MakeFace::new(horizontal, vec![]).execute(&mut store).unwrap());
        let v = Shape::Face(MakeFace::new(vertical, vec![]).execute(&mut store).unwrap());
        let (_, result) = fuse(&mut store, h, v);

        // The horizontal square is cut along x = 1 from edge to edge; the
        // section ends inside the vertical one, which stays whole.
        assert_eq!(result.images(h).len(), 2);
        assert_eq!(result.images(v), &[v]);
        assert!(result.warnings().is_empty());
        let shapes = children(&store, &result);
        assert_eq!(count(&shapes, ShapeKind::Face), 3);
    }

    #[test]
    fn crossing_sections_cut_a_face_in_four() {
        let mut store = TopologyStore::new();
        let square = |store: &mut TopologyStore, pts: Vec<Point3>| {
            let w = MakeWire::new(pts, true).execute(store).unwrap();
            Shape::Face(MakeFace::new(w, vec![]).execute(store).unwrap())
        };
        let floor = square(
            &mut store,
            vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0), p(0.0, 2.0, 0.0)],
        );
        let wall_x = square(
            &mut store,
            vec![p(1.0, -1.0, -1.0), p(1.0, 3.0, -1.0), p(1.0, 3.0, 1.0), p(1.0, -1.0, 1.0)],
        );
        let wall_y = square(
            &mut store,
            vec![p(-1.0, 1.0, -1.0), p(3.0, 1.0, -1.0), p(3.0, 1.0, 1.0), p(-1.0, 1.0, 1.0)],
        );
        let walls = Shape::Compound(
            MakeCompound::new(vec![wall_x, wall_y])
                .execute(&mut store)
                .unwrap(),
        );
        let (_, result) = fuse(&mut store, floor, walls);

        let images = result.images(floor);
        assert_eq!(images.len(), 4);
        assert!(result.warnings().is_empty());
        for &image in images {
            let Shape::Face(f) = image else {
                panic!("face image is not a face");
            };
            let loops = store.face_loops(f).unwrap();
            assert_eq!(loops.len(), 1);
            assert!((crate::math::polygon_2d::signed_area(&loops[0]).abs() - 1.0).abs() < 1e-9);
        }
        // Sections end inside the walls, which stay whole.
        assert_eq!(result.images(wall_x), &[wall_x]);
        assert_eq!(result.images(wall_y), &[wall_y]);
    }

    #[test]
    fn crossing_free_edges_split_at_the_crossing() {
        let mut store = TopologyStore::new();
        let va = store.add_vertex(VertexData::new(p(0.0, 0.0, 0.0)));
        let vb = store.add_vertex(VertexData::new(p(2.0, 0.0, 0.0)));
        let vc = store.add_vertex(VertexData::new(p(1.0, -1.0, 0.0)));
        let vd = store.add_vertex(VertexData::new(p(1.0, 1.0, 0.0)));
        let a = Shape::Edge(MakeEdge::line(va, vb).execute(&mut store).unwrap());
        let b = Shape::Edge(MakeEdge::line(vc, vd).execute(&mut store).unwrap());
        let (_, result) = fuse(&mut store, a, b);
        assert_eq!(result.images(a).len(), 2);
        assert_eq!(result.images(b).len(), 2);
        let shapes = children(&store, &result);
        assert_eq!(count(&shapes, ShapeKind::Edge), 4);
        assert_eq!(count(&shapes, ShapeKind::Vertex), 0);
    }

    #[test]
    fn free_vertex_off_everything_is_kept() {
        let mut store = TopologyStore::new();
        let va = store.add_vertex(VertexData::new(p(0.0, 0.0, 0.0)));
        let vb = store.add_vertex(VertexData::new(p(2.0, 0.0, 0.0)));
        let a = Shape::Edge(MakeEdge::line(va, vb).execute(&mut store).unwrap());
        let lonely = Shape::Vertex(store.add_vertex(VertexData::new(p(0.0, 3.0, 0.0))));
        let on_edge = Shape::Vertex(store.add_vertex(VertexData::new(p(1.0, 0.0, 0.0))));
        let extra = Shape::Compound(
            MakeCompound::new(vec![lonely, on_edge])
                .execute(&mut store)
                .unwrap(),
        );
        let (_, result) = fuse(&mut store, a, extra);
        let shapes = children(&store, &result);
        assert_eq!(count(&shapes, ShapeKind::Edge), 2);
        assert_eq!(shapes.iter().filter(|s| **s == lonely).count(), 1);
        assert!(!shapes.contains(&on_edge));
    }
}
