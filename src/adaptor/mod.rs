//! Narrow interface to the exact geometric computations.
//!
//! The filler never inspects curve or surface equations itself; every
//! exact test goes through a [`GeometryAdaptor`]. [`AnalyticAdaptor`] covers
//! the line, arc and plane geometry of this crate.

mod analytic;

pub use analytic::AnalyticAdaptor;

use crate::error::Result;
use crate::geometry::curve::Line;
use crate::geometry::curve2d::Line2d;
use crate::math::{Point2, Point3};
use crate::topology::{EdgeData, FaceData};

/// One intersection between two bounded curves.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveHit {
    /// The curves cross or touch at a single point.
    Point { t1: f64, t2: f64, point: Point3 },
    /// The curves share a stretch of geometry; ranges are ascending.
    Overlap {
        range1: (f64, f64),
        range2: (f64, f64),
    },
}

/// Closest point of a bounded curve to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveProjection {
    pub parameter: f64,
    pub distance: f64,
}

/// An untrimmed section curve of two surfaces with its images in both
/// face frames.
///
/// The pcurves share the 3D curve's parametrisation.
#[derive(Debug, Clone)]
pub struct SectionGeometry {
    pub curve: Line,
    pub pcurve_a: Line2d,
    pub pcurve_b: Line2d,
}

/// Result of a surface/surface intersection.
#[derive(Debug, Clone)]
pub enum SurfaceHit {
    Disjoint,
    /// The surfaces are the same within tolerance.
    Coincident,
    Curves(Vec<SectionGeometry>),
}

/// Result of a bounded curve/surface intersection.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveSurfaceHit {
    /// Isolated crossings as `(curve parameter, point)`, ascending.
    Points(Vec<(f64, Point3)>),
    /// The curve lies in the surface.
    OnSurface,
}

/// Position of a 2D point relative to a face boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointState {
    In,
    Out,
    On,
}

/// Exact geometry needed by the pave filler.
///
/// Implementations must be usable from several threads at once.
pub trait GeometryAdaptor: Sync {
    /// Intersections of two bounded edge curves within `tolerance`.
    ///
    /// # Errors
    ///
    /// Returns an error when the intersection cannot be computed.
    fn intersect_curves(&self, a: &EdgeData, b: &EdgeData, tolerance: f64) -> Result<Vec<CurveHit>>;

    /// Projection of `point` on the bounded edge curve.
    ///
    /// # Errors
    ///
    /// Returns an error when the projection cannot be computed.
    fn project_point(&self, curve: &EdgeData, point: &Point3) -> Result<CurveProjection>;

    /// Section of the two face surfaces, untrimmed.
    ///
    /// # Errors
    ///
    /// Returns an error when the intersection cannot be computed.
    fn intersect_surfaces(&self, a: &FaceData, b: &FaceData, tolerance: f64) -> Result<SurfaceHit>;

    /// Crossings of the bounded edge curve with the face surface.
    ///
    /// # Errors
    ///
    /// Returns an error when the intersection cannot be computed.
    fn intersect_curve_surface(
        &self,
        curve: &EdgeData,
        surface: &FaceData,
        tolerance: f64,
    ) -> Result<CurveSurfaceHit>;

    /// Classifies `point` against closed boundary loops given in the same frame.
    fn classify_2d(&self, point: &Point2, boundary: &[Vec<Point2>], tolerance: f64) -> PointState;
}
