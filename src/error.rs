use std::fmt;

use thiserror::Error;

use crate::pool::ShapeIndex;

/// Top-level error type for the pave filler engine.
#[derive(Debug, Error)]
pub enum BopError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to topological operations.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("wire is not closed")]
    WireNotClosed,

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors that abort an intersection or reconstruction run.
#[derive(Debug, Error)]
pub enum OperationError {
    /// A null or degenerate sub-shape was met while building the shape pool.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// An invariant of the interference data was violated.
    #[error("inconsistent interference: {0}")]
    InconsistentInterference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for results using [`BopError`].
pub type Result<T> = std::result::Result<T, BopError>;

/// Non-fatal problems collected while an operation runs.
///
/// Warnings never abort a run; they are exposed next to the result so callers
/// can decide whether the output is good enough.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The exact intersection of one candidate pair could not be computed.
    LocalGeometryFailure {
        first: ShapeIndex,
        second: ShapeIndex,
        reason: String,
    },
    /// Wire walking met several equally valid continuations at a vertex.
    AmbiguousReconstruction { face: ShapeIndex, vertex: ShapeIndex },
    /// A face could not be rebuilt from its split edges and was kept whole.
    FaceNotRebuilt { face: ShapeIndex, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalGeometryFailure {
                first,
                second,
                reason,
            } => write!(f, "local failure on pair ({first}, {second}): {reason}"),
            Self::AmbiguousReconstruction { face, vertex } => {
                write!(f, "ambiguous wire walk on face {face} at vertex {vertex}")
            }
            Self::FaceNotRebuilt { face, reason } => {
                write!(f, "face {face} kept unsplit: {reason}")
            }
        }
    }
}
