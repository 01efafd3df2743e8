//! Settings of an intersection run.

use std::fmt;

use crate::interference::InterferenceKind;

/// How many detection passes run: level `n` runs every pass of level `<= n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LevelOfCheck(u8);

impl LevelOfCheck {
    /// Vertex/vertex only.
    pub const VERTEX_VERTEX: Self = Self(0);
    /// Every pass up to face/face.
    pub const ALL: Self = Self(5);

    /// Returns `None` when `level` is above [`LevelOfCheck::ALL`].
    #[must_use]
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::ALL.0).then_some(Self(level))
    }

    /// Like [`LevelOfCheck::new`], but out-of-range values become
    /// [`LevelOfCheck::ALL`].
    #[must_use]
    pub fn clamped(level: u8) -> Self {
        Self::new(level).unwrap_or(Self::ALL)
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Returns `true` if the pass producing `kind` runs at this level.
    #[must_use]
    pub fn includes(self, kind: InterferenceKind) -> bool {
        kind.level() <= self
    }
}

impl Default for LevelOfCheck {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for LevelOfCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration of the pave filler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillerConfig {
    /// Run the exact tests of each pass on the rayon thread pool.
    pub run_parallel: bool,
    /// Extra distance added to every tolerance comparison.
    pub fuzzy_value: f64,
    /// Last pass to run.
    pub level: LevelOfCheck,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            run_parallel: false,
            fuzzy_value: 0.0,
            level: LevelOfCheck::ALL,
        }
    }
}

impl FillerConfig {
    /// All passes, sequential.
    #[must_use]
    pub fn sequential() -> Self {
        Self::default()
    }

    /// All passes, parallel.
    #[must_use]
    pub fn parallel() -> Self {
        Self {
            run_parallel: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(self, level: LevelOfCheck) -> Self {
        Self { level, ..self }
    }

    /// Negative values are treated as zero.
    #[must_use]
    pub fn with_fuzzy_value(self, fuzzy_value: f64) -> Self {
        Self {
            fuzzy_value: fuzzy_value.max(0.0),
            ..self
        }
    }
}
