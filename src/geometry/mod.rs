pub mod curve;
pub mod curve2d;
pub mod surface;

pub use curve::{Arc, Curve, CurveDomain, Line};
pub use curve2d::Line2d;
pub use surface::{Plane, Surface, SurfaceDomain};
