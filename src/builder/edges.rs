use std::collections::BTreeMap;

use tracing::debug;

use crate::adaptor::PointState;
use crate::error::{OperationError, Result};
use crate::filler::FillerState;
use crate::interference::{EdgeEdgeGeometry, EdgeFaceGeometry, FaceFaceGeometry, Interference};
use crate::math::Point3;
use crate::pave::PaveBlock;
use crate::pool::ShapeIndex;
use crate::topology::{EdgeCurve, EdgeData, EdgeId, TopologyStore};

/// One split piece of an original edge.
///
/// `start` and `end` are resolved vertices in the direction of the original
/// edge; `forward` tells whether the piece's own curve runs that way too,
/// which is not the case for a common block taken from a reversed partner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Piece {
    pub edge: EdgeId,
    pub forward: bool,
    pub start: ShapeIndex,
    pub end: ShapeIndex,
    pub range: (f64, f64),
}

impl Piece {
    /// Resolved vertices in the direction of the piece's own curve.
    pub fn curve_ends(&self) -> (ShapeIndex, ShapeIndex) {
        if self.forward {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }
}

/// An edge lying inside a face, stored in its curve direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct InternalEdge {
    pub edge: EdgeId,
    pub start: ShapeIndex,
    pub end: ShapeIndex,
}

fn overlap_partners(state: &FillerState) -> BTreeMap<ShapeIndex, Vec<ShapeIndex>> {
    let mut partners: BTreeMap<ShapeIndex, Vec<ShapeIndex>> = BTreeMap::new();
    for record in state.interferences() {
        if let Interference::EdgeEdge {
            edge1,
            edge2,
            geometry: EdgeEdgeGeometry::Overlap { .. },
        } = *record
        {
            partners.entry(edge1).or_default().push(edge2);
            partners.entry(edge2).or_default().push(edge1);
        }
    }
    partners
}

/// A piece of an already split partner edge covering the same block.
fn common_piece(
    store: &TopologyStore,
    candidates: &[Piece],
    block: &PaveBlock,
    mid: &Point3,
    tolerance: f64,
) -> Result<Option<Piece>> {
    let ends = (block.start.vertex, block.end.vertex);
    for other in candidates {
        let same_ends = (other.start, other.end) == ends || (other.end, other.start) == ends;
        if !same_ends {
            continue;
        }
        let data = store.edge(other.edge)?;
        let other_mid = data.point_at(0.5 * (data.t_start + data.t_end))?;
        if (other_mid - mid).norm() <= tolerance + data.tolerance {
            return Ok(Some(*other));
        }
    }
    Ok(None)
}

/// Splits every edge of the pool at its paves.
///
/// Blocks of overlapping edges that share both ends and run through the
/// same midpoint become one edge.
pub(super) fn split_edges(
    store: &mut TopologyStore,
    state: &FillerState,
) -> Result<BTreeMap<ShapeIndex, Vec<Piece>>> {
    let pool = state.pool();
    let partners = overlap_partners(state);
    let fuzzy = state.config().fuzzy_value;
    let mut pieces: BTreeMap<ShapeIndex, Vec<Piece>> = BTreeMap::new();

    for set in state.pave_sets() {
        let edge = set.edge();
        let id = pool.edge_id(edge)?;
        let data = store.edge(id)?.clone();
        let blocks = set.blocks(|v| pool.real_vertex(v));
        let raw = pool.sub_shapes(edge);
        let (Some(&raw_start), Some(&raw_end)) = (raw.first(), raw.last()) else {
            let reason = format!("edge {edge} lost its vertices");
            return Err(OperationError::InconsistentInterference(reason).into());
        };

        if let [block] = blocks.as_slice() {
            if block.start.vertex == raw_start && block.end.vertex == raw_end {
                pieces.insert(
                    edge,
                    vec![Piece {
                        edge: id,
                        forward: true,
                        start: raw_start,
                        end: raw_end,
                        range: block.range(),
                    }],
                );
                continue;
            }
        }

        let mut list = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let mid = data.point_at(block.mid_parameter())?;
            let mut shared = None;
            for partner in partners.get(&edge).into_iter().flatten() {
                if let Some(done) = pieces.get(partner) {
                    shared = common_piece(store, done, block, &mid, data.tolerance + fuzzy)?;
                    if shared.is_some() {
                        break;
                    }
                }
            }
            let piece = if let Some(other) = shared {
                let (curve_start, _) = other.curve_ends();
                Piece {
                    edge: other.edge,
                    forward: block.start.vertex == block.end.vertex
                        || curve_start == block.start.vertex,
                    start: block.start.vertex,
                    end: block.end.vertex,
                    range: block.range(),
                }
            } else {
                let mut split = data.clone();
                split.start = pool.vertex_id(block.start.vertex)?;
                split.end = pool.vertex_id(block.end.vertex)?;
                split.t_start = block.start.parameter;
                split.t_end = block.end.parameter;
                Piece {
                    edge: store.add_edge(split),
                    forward: true,
                    start: block.start.vertex,
                    end: block.end.vertex,
                    range: block.range(),
                }
            };
            list.push(piece);
        }
        debug!(edge = %edge, pieces = list.len(), "edge split");
        pieces.insert(edge, list);
    }
    Ok(pieces)
}

/// New edges along face/face sections and in-plane edges lying inside
/// faces, grouped by the face that receives them.
pub(super) fn internal_edges(
    store: &mut TopologyStore,
    state: &FillerState,
    pieces: &BTreeMap<ShapeIndex, Vec<Piece>>,
) -> Result<BTreeMap<ShapeIndex, Vec<InternalEdge>>> {
    let pool = state.pool();
    let mut internal: BTreeMap<ShapeIndex, Vec<InternalEdge>> = BTreeMap::new();

    for record in state.interferences() {
        match record {
            Interference::FaceFace {
                face1,
                face2,
                geometry: FaceFaceGeometry::Curves(curves),
            } => {
                let tolerance = store
                    .face(pool.face_id(*face1)?)?
                    .tolerance
                    .max(store.face(pool.face_id(*face2)?)?.tolerance);
                for curve in curves.iter().filter(|c| c.is_new) {
                    for pair in curve.paves.windows(2) {
                        let start = pool.real_vertex(pair[0].vertex);
                        let end = pool.real_vertex(pair[1].vertex);
                        if start == end || pair[1].parameter - pair[0].parameter <= tolerance {
                            continue;
                        }
                        let mut data = EdgeData::new(
                            pool.vertex_id(start)?,
                            pool.vertex_id(end)?,
                            EdgeCurve::Line(curve.curve.clone()),
                            pair[0].parameter,
                            pair[1].parameter,
                        );
                        data.tolerance = tolerance;
                        let section = InternalEdge {
                            edge: store.add_edge(data),
                            start,
                            end,
                        };
                        internal.entry(*face1).or_default().push(section);
                        internal.entry(*face2).or_default().push(section);
                    }
                }
            }
            Interference::EdgeFace {
                edge,
                face,
                geometry: EdgeFaceGeometry::InPlane(states),
            } => {
                for piece in pieces.get(edge).into_iter().flatten() {
                    let mid = 0.5 * (piece.range.0 + piece.range.1);
                    let inside = states
                        .iter()
                        .any(|s| s.state == PointState::In && s.range.0 <= mid && mid <= s.range.1);
                    if inside {
                        let (start, end) = piece.curve_ends();
                        internal.entry(*face).or_default().push(InternalEdge {
                            edge: piece.edge,
                            start,
                            end,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    Ok(internal)
}
