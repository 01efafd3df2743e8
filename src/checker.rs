//! Self-interference checking of a single shape.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::adaptor::{AnalyticAdaptor, GeometryAdaptor};
use crate::config::{FillerConfig, LevelOfCheck};
use crate::error::{BopError, Result, Warning};
use crate::filler::{FillerState, PaveFiller};
use crate::interference::Interference;
use crate::topology::{Shape, TopologyStore};

/// Finds the places where a shape touches or crosses itself.
///
/// By default the check runs on a deep copy so the argument is left alone,
/// except that tolerances grown during the check are copied back.
#[derive(Debug)]
pub struct SelfInterferenceChecker<A = AnalyticAdaptor> {
    adaptor: A,
    config: FillerConfig,
    non_destructive: bool,
    working: Option<Shape>,
    copies: HashMap<Shape, Shape>,
    state: Option<FillerState>,
    error: Option<BopError>,
}

impl Default for SelfInterferenceChecker<AnalyticAdaptor> {
    fn default() -> Self {
        Self::with_adaptor(AnalyticAdaptor)
    }
}

impl SelfInterferenceChecker<AnalyticAdaptor> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: GeometryAdaptor + Clone> SelfInterferenceChecker<A> {
    #[must_use]
    pub fn with_adaptor(adaptor: A) -> Self {
        Self {
            adaptor,
            config: FillerConfig::default(),
            non_destructive: true,
            working: None,
            copies: HashMap::new(),
            state: None,
            error: None,
        }
    }

    /// Sets how many passes run; values above 5 run them all.
    pub fn set_level_of_check(&mut self, level: u8) {
        if LevelOfCheck::new(level).is_none() {
            warn!(level, "level of check out of range, using {}", LevelOfCheck::ALL);
        }
        self.config.level = LevelOfCheck::clamped(level);
    }

    #[must_use]
    pub fn level_of_check(&self) -> LevelOfCheck {
        self.config.level
    }

    /// When `true` (the default) the argument is copied before checking.
    pub fn set_non_destructive(&mut self, non_destructive: bool) {
        self.non_destructive = non_destructive;
    }

    #[must_use]
    pub fn is_non_destructive(&self) -> bool {
        self.non_destructive
    }

    pub fn set_run_parallel(&mut self, run_parallel: bool) {
        self.config.run_parallel = run_parallel;
    }

    pub fn set_fuzzy_value(&mut self, fuzzy_value: f64) {
        self.config = self.config.with_fuzzy_value(fuzzy_value);
    }

    /// Checks `shape` against itself.
    ///
    /// A fatal error is kept and reported by [`Self::error`]; local failures
    /// become warnings and the check still completes.
    #[instrument(
        skip(self, store),
        fields(level = %self.config.level, non_destructive = self.non_destructive)
    )]
    pub fn perform(&mut self, store: &mut TopologyStore, shape: Shape) {
        self.working = None;
        self.copies.clear();
        self.state = None;
        self.error = None;
        if let Err(err) = self.run(store, shape) {
            warn!(error = %err, "self-interference check failed");
            self.error = Some(err);
        }
    }

    fn run(&mut self, store: &mut TopologyStore, shape: Shape) -> Result<()> {
        let working = if self.non_destructive {
            let (copy, copies) = store.deep_copy(shape)?;
            self.copies = copies;
            copy
        } else {
            shape
        };
        self.working = Some(working);

        let filler = PaveFiller::with_adaptor(self.adaptor.clone(), self.config);
        let state = filler.perform(store, working, working)?;
        if self.non_destructive {
            self.post_treat(store)?;
        }
        info!(
            interferences = state.interferences().len(),
            warnings = state.warnings().len(),
            "self-interference check done"
        );
        self.state = Some(state);
        Ok(())
    }

    /// Copies tolerances that grew on the working copy back to the argument.
    fn post_treat(&self, store: &mut TopologyStore) -> Result<()> {
        let mut raised = 0usize;
        for (&original, &copy) in &self.copies {
            let grown = match (original, copy) {
                (Shape::Vertex(o), Shape::Vertex(c)) => {
                    let t = store.vertex(c)?.tolerance;
                    raise(&mut store.vertex_mut(o)?.tolerance, t)
                }
                (Shape::Edge(o), Shape::Edge(c)) => {
                    let t = store.edge(c)?.tolerance;
                    raise(&mut store.edge_mut(o)?.tolerance, t)
                }
                (Shape::Face(o), Shape::Face(c)) => {
                    let t = store.face(c)?.tolerance;
                    raise(&mut store.face_mut(o)?.tolerance, t)
                }
                _ => false,
            };
            raised += usize::from(grown);
        }
        debug!(raised, "tolerances copied back");
        Ok(())
    }

    /// `true` once a check finished without a fatal error.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.is_some()
    }

    #[must_use]
    pub fn error(&self) -> Option<&BopError> {
        self.error.as_ref()
    }

    /// Detected interferences; indices refer to [`Self::state`]'s pool.
    #[must_use]
    pub fn interferences(&self) -> &[Interference] {
        self.state.as_ref().map_or(&[], FillerState::interferences)
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        self.state.as_ref().map_or(&[], FillerState::warnings)
    }

    /// `true` if the shape interferes with itself anywhere.
    #[must_use]
    pub fn has_faulty(&self) -> bool {
        !self.interferences().is_empty()
    }

    #[must_use]
    pub fn state(&self) -> Option<&FillerState> {
        self.state.as_ref()
    }

    /// The shape that was actually checked in place of `original`.
    ///
    /// This is `original` itself for destructive checks and its copy
    /// otherwise; `None` before any check or for shapes outside the
    /// checked argument.
    #[must_use]
    pub fn working_shape(&self, original: Shape) -> Option<Shape> {
        self.working?;
        if self.non_destructive {
            self.copies.get(&original).copied()
        } else {
            Some(original)
        }
    }
}

fn raise(slot: &mut f64, to: f64) -> bool {
    let grown = to > *slot;
    if grown {
        *slot = to;
    }
    grown
}
