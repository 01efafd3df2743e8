//! Interference detection.
//!
//! [`PaveFiller`] indexes both arguments in a [`ShapePool`] and runs the
//! detection passes in order: vertex/vertex, vertex/edge, edge/edge,
//! vertex/face, edge/face and face/face. Each pass selects candidate pairs
//! with a [`Bvh`], computes the exact interferences through the
//! [`GeometryAdaptor`], then applies the results sequentially in candidate
//! order so that parallel and sequential runs produce the same state.

mod edge_edge;
mod edge_face;
mod face_face;
mod vertex_edge;
mod vertex_face;
mod vertex_vertex;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::adaptor::{AnalyticAdaptor, GeometryAdaptor};
use crate::bvh::Bvh;
use crate::config::FillerConfig;
use crate::error::{OperationError, Result, Warning};
use crate::interference::{Interference, InterferenceKind};
use crate::math::Point3;
use crate::pave::{Pave, PaveInsert, PaveOrigin, PaveSet};
use crate::pool::{Operand, ShapeIndex, ShapePool};
use crate::topology::{Shape, ShapeKind, TopologyStore};

/// Everything the detection passes found.
#[derive(Debug)]
pub struct FillerState {
    pool: ShapePool,
    pave_sets: BTreeMap<ShapeIndex, PaveSet>,
    interferences: Vec<Interference>,
    warnings: Vec<Warning>,
    config: FillerConfig,
}

impl FillerState {
    fn new(store: &TopologyStore, pool: ShapePool, config: FillerConfig) -> Result<Self> {
        let mut pave_sets = BTreeMap::new();
        for edge in pool.indices_of_kind(ShapeKind::Edge) {
            let data = store.edge(pool.edge_id(edge)?)?;
            let subs = pool.sub_shapes(edge);
            let (Some(&start), Some(&end)) = (subs.first(), subs.last()) else {
                return Err(
                    OperationError::MalformedInput(format!("edge {edge} has no vertices")).into(),
                );
            };
            let ptol = data.parametric_tolerance(data.tolerance + config.fuzzy_value);
            pave_sets.insert(
                edge,
                PaveSet::new(edge, (start, end), (data.t_start, data.t_end), ptol),
            );
        }
        Ok(Self {
            pool,
            pave_sets,
            interferences: Vec::new(),
            warnings: Vec::new(),
            config,
        })
    }

    #[must_use]
    pub fn pool(&self) -> &ShapePool {
        &self.pool
    }

    #[must_use]
    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    /// Paves of an edge of the pool.
    #[must_use]
    pub fn pave_set(&self, edge: ShapeIndex) -> Option<&PaveSet> {
        self.pave_sets.get(&edge)
    }

    /// Pave sets of every edge, by ascending edge index.
    pub fn pave_sets(&self) -> impl Iterator<Item = &PaveSet> {
        self.pave_sets.values()
    }

    /// All records, in pass order then candidate order.
    #[must_use]
    pub fn interferences(&self) -> &[Interference] {
        &self.interferences
    }

    pub fn interferences_of(&self, kind: InterferenceKind) -> impl Iterator<Item = &Interference> {
        self.interferences.iter().filter(move |i| i.kind() == kind)
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Resolved vertex paved on `edge` within tolerance of `parameter`.
    #[must_use]
    pub fn paved_vertex_near(&self, edge: ShapeIndex, parameter: f64) -> Option<ShapeIndex> {
        self.pave_sets
            .get(&edge)
            .and_then(|set| set.pave_near(parameter))
            .map(|p| self.pool.real_vertex(p.vertex))
    }

    fn add_pave(
        &mut self,
        edge: ShapeIndex,
        vertex: ShapeIndex,
        parameter: f64,
        origin: PaveOrigin,
    ) -> Result<()> {
        let set = self.pave_sets.get_mut(&edge).ok_or_else(|| {
            let reason = format!("pave on {edge}, which is not an edge");
            OperationError::InconsistentInterference(reason)
        })?;
        let inserted = set.insert(Pave::new(vertex, parameter, origin))?;
        if let PaveInsert::Coalesced { kept, dropped } = inserted {
            self.pool.set_same_domain(dropped, kept);
        }
        Ok(())
    }

    fn new_vertex(
        &mut self,
        store: &mut TopologyStore,
        point: Point3,
        tolerance: f64,
        operand: Operand,
    ) -> ShapeIndex {
        let v = self.pool.append_new_vertex(store, point, tolerance, operand);
        debug!(vertex = %v, "new vertex");
        v
    }

    /// Grows the tolerance of `vertex` to `distance` when it is smaller.
    fn cover_distance(
        &mut self,
        store: &mut TopologyStore,
        vertex: ShapeIndex,
        distance: f64,
    ) -> Result<()> {
        let data = store.vertex_mut(self.pool.vertex_id(vertex)?)?;
        if distance > data.tolerance {
            debug!(
                vertex = %vertex,
                from = data.tolerance,
                to = distance,
                "vertex tolerance raised"
            );
            data.tolerance = distance;
            self.pool.refresh_vertex_box(store, vertex)?;
        }
        Ok(())
    }

    /// Vertices that were not merged into another one.
    fn live_vertices(&self) -> Vec<ShapeIndex> {
        self.pool
            .indices_of_kind(ShapeKind::Vertex)
            .into_iter()
            .filter(|&v| !self.pool.has_same_domain(v))
            .collect()
    }

    /// Candidate pairs `(a, b)` with `a` of kind `first` and `b` of kind
    /// `second` whose boxes overlap, ascending.
    fn candidate_pairs(
        &self,
        first: ShapeKind,
        second: ShapeKind,
    ) -> Vec<(ShapeIndex, ShapeIndex)> {
        let of_kind = |kind| {
            if kind == ShapeKind::Vertex {
                self.live_vertices()
            } else {
                self.pool.indices_of_kind(kind)
            }
        };
        let items: Vec<_> = of_kind(second)
            .into_iter()
            .map(|i| (i, *self.pool.bounding_box(i)))
            .collect();
        let bvh = Bvh::build(&items);
        let mut pairs = Vec::new();
        for a in of_kind(first) {
            for b in bvh.select(self.pool.bounding_box(a), self.config.fuzzy_value) {
                if (first != second || a < b) && self.pool.is_candidate_pair(a, b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    fn record(&mut self, interference: Interference) {
        self.interferences.push(interference);
    }
}

/// Runs `compute` on every pair, in parallel when asked.
///
/// Results come back in pair order with the pair attached; pairs whose
/// computation failed are turned into warnings.
fn map_pairs<T, F>(
    run_parallel: bool,
    pairs: &[(ShapeIndex, ShapeIndex)],
    compute: F,
) -> (Vec<((ShapeIndex, ShapeIndex), T)>, Vec<Warning>)
where
    T: Send,
    F: Fn(ShapeIndex, ShapeIndex) -> Result<Option<T>> + Sync,
{
    let failures = Mutex::new(Vec::new());
    let run = |&(a, b): &(ShapeIndex, ShapeIndex)| match compute(a, b) {
        Ok(found) => found.map(|t| ((a, b), t)),
        Err(err) => {
            warn!(first = %a, second = %b, error = %err, "local geometry failure");
            failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Warning::LocalGeometryFailure {
                    first: a,
                    second: b,
                    reason: err.to_string(),
                });
            None
        }
    };
    let results = if run_parallel {
        pairs.par_iter().filter_map(run).collect()
    } else {
        pairs.iter().filter_map(run).collect()
    };
    let mut failures = failures.into_inner().unwrap_or_else(PoisonError::into_inner);
    failures.sort_by_key(|w| match w {
        Warning::LocalGeometryFailure { first, second, .. } => (*first, *second),
        _ => (ShapeIndex(0), ShapeIndex(0)),
    });
    (results, failures)
}

/// The interference detector.
///
/// One filler handles both two-argument runs and self checks (the same
/// shape passed twice).
#[derive(Debug, Clone)]
pub struct PaveFiller<A = AnalyticAdaptor> {
    adaptor: A,
    config: FillerConfig,
}

impl PaveFiller<AnalyticAdaptor> {
    /// A filler using the analytic adaptor.
    #[must_use]
    pub fn new(config: FillerConfig) -> Self {
        Self {
            adaptor: AnalyticAdaptor,
            config,
        }
    }
}

impl Default for PaveFiller<AnalyticAdaptor> {
    fn default() -> Self {
        Self::new(FillerConfig::default())
    }
}

impl<A: GeometryAdaptor> PaveFiller<A> {
    #[must_use]
    pub fn with_adaptor(adaptor: A, config: FillerConfig) -> Self {
        Self { adaptor, config }
    }

    #[must_use]
    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    /// Detects every interference between `a` and `b` allowed by the level
    /// of check. Passing the same shape twice runs a self check.
    ///
    /// New vertices are added to `store`, and tolerances of existing
    /// vertices may grow.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::MalformedInput`] when an argument is not a
    /// valid shape and [`OperationError::InconsistentInterference`] when the
    /// interference data contradicts itself. Failures of single candidate
    /// pairs are warnings of the returned state instead.
    #[instrument(
        skip(self, store),
        fields(level = %self.config.level, parallel = self.config.run_parallel)
    )]
    pub fn perform(&self, store: &mut TopologyStore, a: Shape, b: Shape) -> Result<FillerState> {
        let pool = ShapePool::build(store, &[a, b])?;
        let mut state = FillerState::new(store, pool, self.config)?;

        for kind in InterferenceKind::ALL {
            if !self.config.level.includes(kind) {
                break;
            }
            let before = state.interferences.len();
            match kind {
                InterferenceKind::VertexVertex => vertex_vertex::run(&mut state, store)?,
                InterferenceKind::VertexEdge => vertex_edge::run(&mut state, store, &self.adaptor)?,
                InterferenceKind::EdgeEdge => edge_edge::run(&mut state, store, &self.adaptor)?,
                InterferenceKind::VertexFace => vertex_face::run(&mut state, store, &self.adaptor)?,
                InterferenceKind::EdgeFace => edge_face::run(&mut state, store, &self.adaptor)?,
                InterferenceKind::FaceFace => face_face::run(&mut state, store, &self.adaptor)?,
            }
            debug!(pass = %kind, records = state.interferences.len() - before, "pass done");
        }

        info!(
            interferences = state.interferences.len(),
            warnings = state.warnings.len(),
            "interference detection finished"
        );
        Ok(state)
    }
}
