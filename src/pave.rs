//! Paves and pave blocks.
//!
//! A pave marks the parameter at which a vertex splits an edge. Every edge
//! of the pool owns one [`PaveSet`], seeded with its two end vertices.

use std::cmp::Ordering;

use crate::error::{OperationError, Result};
use crate::pool::ShapeIndex;

/// What put a pave on its edge.
///
/// The declaration order is the merge precedence: when two paves coalesce
/// the one with the smaller origin survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaveOrigin {
    /// An end vertex of the edge.
    Boundary,
    /// An existing vertex lying on the edge.
    VertexEdge,
    EdgeEdge,
    EdgeFace,
    FaceFace,
}

/// A vertex at a parameter of an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pave {
    pub vertex: ShapeIndex,
    pub parameter: f64,
    pub origin: PaveOrigin,
}

impl Pave {
    #[must_use]
    pub fn new(vertex: ShapeIndex, parameter: f64, origin: PaveOrigin) -> Self {
        Self {
            vertex,
            parameter,
            origin,
        }
    }

    /// Total order: ascending parameter, then vertex index.
    #[must_use]
    pub fn order(&self, other: &Pave) -> Ordering {
        self.parameter
            .total_cmp(&other.parameter)
            .then(self.vertex.cmp(&other.vertex))
    }
}

/// Outcome of [`PaveSet::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaveInsert {
    /// A new pave was added.
    Inserted,
    /// The vertex was already paved at that parameter.
    Existing,
    /// The new pave fell on an existing one; `dropped` must be mapped
    /// same-domain onto `kept`.
    Coalesced { kept: ShapeIndex, dropped: ShapeIndex },
}

/// Part of an edge between two consecutive paves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaveBlock {
    pub edge: ShapeIndex,
    pub start: Pave,
    pub end: Pave,
}

impl PaveBlock {
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        (self.start.parameter, self.end.parameter)
    }

    #[must_use]
    pub fn mid_parameter(&self) -> f64 {
        0.5 * (self.start.parameter + self.end.parameter)
    }
}

/// Ordered paves of one edge.
#[derive(Debug, Clone)]
pub struct PaveSet {
    edge: ShapeIndex,
    paves: Vec<Pave>,
    t_start: f64,
    t_end: f64,
    param_tolerance: f64,
}

impl PaveSet {
    /// Creates the set of `edge` holding its end vertices.
    #[must_use]
    pub fn new(
        edge: ShapeIndex,
        (start, end): (ShapeIndex, ShapeIndex),
        (t_start, t_end): (f64, f64),
        param_tolerance: f64,
    ) -> Self {
        Self {
            edge,
            paves: vec![
                Pave::new(start, t_start, PaveOrigin::Boundary),
                Pave::new(end, t_end, PaveOrigin::Boundary),
            ],
            t_start,
            t_end,
            param_tolerance,
        }
    }

    #[must_use]
    pub fn edge(&self) -> ShapeIndex {
        self.edge
    }

    /// Paves in ascending order; the first and last are the edge ends.
    #[must_use]
    pub fn paves(&self) -> &[Pave] {
        &self.paves
    }

    #[must_use]
    pub fn param_tolerance(&self) -> f64 {
        self.param_tolerance
    }

    /// Returns `true` if some pave besides the ends was added.
    #[must_use]
    pub fn has_interior(&self) -> bool {
        self.paves.len() > 2
    }

    /// The pave lying within the parametric tolerance of `parameter`.
    #[must_use]
    pub fn pave_near(&self, parameter: f64) -> Option<&Pave> {
        self.paves
            .iter()
            .filter(|p| (p.parameter - parameter).abs() <= self.param_tolerance)
            .min_by(|a, b| {
                (a.parameter - parameter)
                    .abs()
                    .total_cmp(&(b.parameter - parameter).abs())
            })
    }

    /// Adds a pave, coalescing it with an existing pave at the same
    /// parameter. Parameters within tolerance of the edge range are clamped
    /// into it.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InconsistentInterference`] when the
    /// parameter lies outside the edge range.
    pub fn insert(&mut self, pave: Pave) -> Result<PaveInsert> {
        let tol = self.param_tolerance;
        if pave.parameter < self.t_start - tol || pave.parameter > self.t_end + tol {
            return Err(OperationError::InconsistentInterference(format!(
                "pave of vertex {} at {} outside edge {} range [{}, {}]",
                pave.vertex, pave.parameter, self.edge, self.t_start, self.t_end
            ))
            .into());
        }
        let pave = Pave {
            parameter: pave.parameter.clamp(self.t_start, self.t_end),
            ..pave
        };

        let near = self
            .paves
            .iter()
            .enumerate()
            .filter(|(_, p)| (p.parameter - pave.parameter).abs() <= tol)
            .min_by(|(_, a), (_, b)| {
                (a.parameter - pave.parameter)
                    .abs()
                    .total_cmp(&(b.parameter - pave.parameter).abs())
            })
            .map(|(i, _)| i);

        let Some(i) = near else {
            let at = self
                .paves
                .partition_point(|p| p.order(&pave) == Ordering::Less);
            self.paves.insert(at, pave);
            return Ok(PaveInsert::Inserted);
        };

        let existing = self.paves[i];
        if existing.vertex == pave.vertex {
            return Ok(PaveInsert::Existing);
        }
        if (pave.origin, pave.vertex) < (existing.origin, existing.vertex) {
            // The newcomer takes the slot; parameters never move.
            self.paves[i] = Pave {
                parameter: existing.parameter,
                ..pave
            };
            Ok(PaveInsert::Coalesced {
                kept: pave.vertex,
                dropped: existing.vertex,
            })
        } else {
            Ok(PaveInsert::Coalesced {
                kept: existing.vertex,
                dropped: pave.vertex,
            })
        }
    }

    /// Blocks between consecutive paves, with vertices mapped by `resolve`.
    ///
    /// Blocks shorter than the parametric tolerance are skipped.
    pub fn blocks(&self, resolve: impl Fn(ShapeIndex) -> ShapeIndex) -> Vec<PaveBlock> {
        self.paves
            .windows(2)
            .filter(|w| w[1].parameter - w[0].parameter > self.param_tolerance)
            .map(|w| PaveBlock {
                edge: self.edge,
                start: Pave {
                    vertex: resolve(w[0].vertex),
                    ..w[0]
                },
                end: Pave {
                    vertex: resolve(w[1].vertex),
                    ..w[1]
                },
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::BopError;

    fn set() -> PaveSet {
        PaveSet::new(ShapeIndex(0), (ShapeIndex(1), ShapeIndex(2)), (0.0, 4.0), 1e-6)
    }

    #[test]
    fn paves_stay_sorted() {
        let mut s = set();
        for (v, t) in [(10, 3.0), (11, 1.0), (12, 2.0)] {
            assert_eq!(
                s.insert(Pave::new(ShapeIndex(v), t, PaveOrigin::EdgeEdge)).unwrap(),
                PaveInsert::Inserted
            );
        }
        let params: Vec<f64> = s.paves().iter().map(|p| p.parameter).collect();
        assert_eq!(params, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(s.paves().windows(2).all(|w| w[0].order(&w[1]) == Ordering::Less));
    }

    #[test]
    fn inserting_twice_changes_nothing() {
        let mut s = set();
        let pave = Pave::new(ShapeIndex(7), 2.0, PaveOrigin::EdgeFace);
        s.insert(pave).unwrap();
        let before = s.paves().to_vec();
        assert_eq!(s.insert(pave).unwrap(), PaveInsert::Existing);
        assert_eq!(s.paves(), &before[..]);
    }

    #[test]
    fn coalescing_keeps_higher_precedence() {
        let mut s = set();
        s.insert(Pave::new(ShapeIndex(7), 2.0, PaveOrigin::FaceFace)).unwrap();
        let r = s
            .insert(Pave::new(ShapeIndex(8), 2.0 + 1e-7, PaveOrigin::VertexEdge))
            .unwrap();
        assert_eq!(
            r,
            PaveInsert::Coalesced {
                kept: ShapeIndex(8),
                dropped: ShapeIndex(7)
            }
        );
        assert_eq!(s.paves().len(), 3);
        assert_eq!(s.paves()[1].vertex, ShapeIndex(8));

        let r = s.insert(Pave::new(ShapeIndex(9), 2.0, PaveOrigin::EdgeEdge)).unwrap();
        assert_eq!(
            r,
            PaveInsert::Coalesced {
                kept: ShapeIndex(8),
                dropped: ShapeIndex(9)
            }
        );
    }

    #[test]
    fn pave_at_end_coincides_with_endpoint() {
        let mut s = set();
        let r = s
            .insert(Pave::new(ShapeIndex(5), 4.0 + 5e-7, PaveOrigin::EdgeEdge))
            .unwrap();
        assert_eq!(
            r,
            PaveInsert::Coalesced {
                kept: ShapeIndex(2),
                dropped: ShapeIndex(5)
            }
        );
        assert!(!s.has_interior());
        assert_eq!(s.paves()[1].parameter, 4.0);
    }

    #[test]
    fn out_of_range_parameter_is_fatal() {
        let mut s = set();
        let err = s
            .insert(Pave::new(ShapeIndex(5), 4.5, PaveOrigin::EdgeEdge))
            .unwrap_err();
        assert!(matches!(
            err,
            BopError::Operation(OperationError::InconsistentInterference(_))
        ));
    }

    #[test]
    fn three_paves_make_four_blocks() {
        let mut s = set();
        for (v, t) in [(10, 1.0), (11, 2.0), (12, 3.0)] {
            s.insert(Pave::new(ShapeIndex(v), t, PaveOrigin::EdgeEdge)).unwrap();
        }
        let blocks = s.blocks(|v| v);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].start.vertex, ShapeIndex(1));
        assert_eq!(blocks[3].end.vertex, ShapeIndex(2));
        assert!(blocks.windows(2).all(|w| w[0].end.vertex == w[1].start.vertex));
        assert!((blocks[1].mid_parameter() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn blocks_resolve_vertices() {
        let s = set();
        let blocks = s.blocks(|v| if v == ShapeIndex(2) { ShapeIndex(9) } else { v });
        assert_eq!(blocks[0].end.vertex, ShapeIndex(9));
    }
}
