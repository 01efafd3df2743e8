//! The general fuse of two shapes.

use tracing::{instrument, warn};

use crate::adaptor::{AnalyticAdaptor, GeometryAdaptor};
use crate::builder::{BuildResult, Builder};
use crate::config::FillerConfig;
use crate::error::{BopError, Result, Warning};
use crate::filler::{FillerState, PaveFiller};
use crate::interference::Interference;
use crate::topology::{Shape, TopologyStore};

/// Intersects two shapes and splits them against each other.
///
/// ```
/// use pavefill::fuse::GeneralFuse;
/// use pavefill::math::Point3;
/// use pavefill::operations::creation::MakeBox;
/// use pavefill::topology::{Shape, TopologyStore};
///
/// let mut store = TopologyStore::new();
/// let a = MakeBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
///     .execute(&mut store)?;
/// let b = MakeBox::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0))
///     .execute(&mut store)?;
///
/// let mut fuse = GeneralFuse::default();
/// fuse.perform(&mut store, Shape::Solid(a), Shape::Solid(b));
/// assert!(fuse.is_done());
/// let result = fuse.shape().expect("fuse is done");
/// // The shared side is emitted once.
/// assert_eq!(store.faces_of(result)?.len(), 11);
/// # Ok::<(), pavefill::error::BopError>(())
/// ```
#[derive(Debug)]
pub struct GeneralFuse<A = AnalyticAdaptor> {
    filler: PaveFiller<A>,
    state: Option<FillerState>,
    result: Option<BuildResult>,
    warnings: Vec<Warning>,
    error: Option<BopError>,
}

impl Default for GeneralFuse<AnalyticAdaptor> {
    fn default() -> Self {
        Self::new(FillerConfig::default())
    }
}

impl GeneralFuse<AnalyticAdaptor> {
    #[must_use]
    pub fn new(config: FillerConfig) -> Self {
        Self::with_filler(PaveFiller::new(config))
    }
}

impl<A: GeometryAdaptor> GeneralFuse<A> {
    #[must_use]
    pub fn with_adaptor(adaptor: A, config: FillerConfig) -> Self {
        Self::with_filler(PaveFiller::with_adaptor(adaptor, config))
    }

    fn with_filler(filler: PaveFiller<A>) -> Self {
        Self {
            filler,
            state: None,
            result: None,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Runs interference detection on `a` and `b`, then builds the fuse.
    ///
    /// A fatal error is kept and reported by [`Self::error`]; the fuse is
    /// then not done and has no shape.
    #[instrument(skip(self, store))]
    pub fn perform(&mut self, store: &mut TopologyStore, a: Shape, b: Shape) {
        self.state = None;
        self.result = None;
        self.warnings.clear();
        self.error = None;
        if let Err(err) = self.run(store, a, b) {
            warn!(error = %err, "general fuse failed");
            self.error = Some(err);
        }
    }

    fn run(&mut self, store: &mut TopologyStore, a: Shape, b: Shape) -> Result<()> {
        let state = self.filler.perform(store, a, b)?;
        self.warnings.extend_from_slice(state.warnings());
        let state = self.state.insert(state);
        let result = Builder::perform(store, state)?;
        self.warnings.extend_from_slice(result.warnings());
        self.result = Some(result);
        Ok(())
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.result.is_some()
    }

    /// The result compound, when the fuse is done.
    #[must_use]
    pub fn shape(&self) -> Option<Shape> {
        self.result.as_ref().map(BuildResult::shape)
    }

    #[must_use]
    pub fn interferences(&self) -> &[Interference] {
        self.state.as_ref().map_or(&[], FillerState::interferences)
    }

    /// Warnings of detection followed by those of reconstruction.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Pieces of `shape` in the result.
    #[must_use]
    pub fn images(&self, shape: Shape) -> &[Shape] {
        self.result.as_ref().map_or(&[], |r| r.images(shape))
    }

    #[must_use]
    pub fn state(&self) -> Option<&FillerState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&BopError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;
    use crate::topology::VertexData;

    #[test]
    fn fatal_error_leaves_no_shape() {
        let mut other = TopologyStore::new();
        let dangling = Shape::Vertex(other.add_vertex(VertexData::new(Point3::origin())));
        let mut store = TopologyStore::new();
        let a = Shape::Solid(
            MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
                .execute(&mut store)
                .unwrap(),
        );
        let mut fuse = GeneralFuse::default();
        fuse.perform(&mut store, a, dangling);
        assert!(!fuse.is_done());
        assert!(fuse.shape().is_none());
        assert!(fuse.images(a).is_empty());
        assert!(fuse.error().is_some());
    }

    #[test]
    fn overlapping_boxes_report_their_interferences() {
        let mut store = TopologyStore::new();
        let a = Shape::Solid(
            MakeBox::new(Point3::origin(), Point3::new(2.0, 2.0, 2.0))
                .execute(&mut store)
                .unwrap(),
        );
        let b = Shape::Solid(
            MakeBox::new(Point3::new(1.0, 1.0, 1.0), Point3::new(3.0, 3.0, 3.0))
                .execute(&mut store)
                .unwrap(),
        );
        let mut fuse = GeneralFuse::default();
        fuse.perform(&mut store, a, b);
        assert!(fuse.is_done());
        assert!(!fuse.interferences().is_empty());
        for face in store.faces_of(a).unwrap() {
            assert!(!fuse.images(Shape::Face(face)).is_empty());
        }
    }
}
