//! Intersection and reconstruction engine for boundary-representation
//! Boolean operations.
//!
//! [`PaveFiller`] finds every interference between two shapes and records
//! it against a [`ShapePool`]; [`Builder`] turns the result into the
//! general fuse of both arguments. [`GeneralFuse`] chains the two and
//! [`SelfInterferenceChecker`] runs detection on a single shape.

pub mod adaptor;
pub mod builder;
pub mod bvh;
pub mod checker;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filler;
pub mod fuse;
pub mod geometry;
pub mod interference;
pub mod math;
pub mod operations;
pub mod pave;
pub mod pool;
pub mod topology;

pub use builder::{BuildResult, Builder};
pub use checker::SelfInterferenceChecker;
pub use config::{FillerConfig, LevelOfCheck};
pub use error::{BopError, Result, Warning};
pub use filler::{FillerState, PaveFiller};
pub use fuse::GeneralFuse;
pub use interference::{Interference, InterferenceKind};
pub use pool::{ShapeIndex, ShapePool};
