use super::{Point3, Vector3};

/// An axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis; enlarging or uniting with an
/// empty box leaves the other operand unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Creates a box from its two corners.
    #[must_use]
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Creates an empty (inverted) box suitable for expansion.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Creates the smallest box containing all `points`.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.add_point(p);
        }
        aabb
    }

    /// Returns `true` if the box contains no point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expands the box to include a point.
    pub fn add_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expands the box to include another box.
    pub fn add_box(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.add_point(&other.min);
        self.add_point(&other.max);
    }

    /// Enlarges the box by `gap` in every direction.
    pub fn enlarge(&mut self, gap: f64) {
        if self.is_empty() {
            return;
        }
        let g = Vector3::new(gap, gap, gap);
        self.min -= g;
        self.max += g;
    }

    /// Returns an enlarged copy of the box.
    #[must_use]
    pub fn enlarged(&self, gap: f64) -> Self {
        let mut copy = *self;
        copy.enlarge(gap);
        copy
    }

    /// Closed-interval overlap test, inflated by `tolerance`.
    ///
    /// Touching boxes overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb, tolerance: f64) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.x <= other.max.x + tolerance
            && self.max.x + tolerance >= other.min.x
            && self.min.y <= other.max.y + tolerance
            && self.max.y + tolerance >= other.min.y
            && self.min.z <= other.max.z + tolerance
            && self.max.z + tolerance >= other.min.z
    }

    /// Returns `true` if `other` lies entirely inside this box.
    #[must_use]
    pub fn contains_box(&self, other: &Aabb) -> bool {
        !other.is_empty()
            && self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    /// Returns the center of the box.
    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the box extents along each axis.
    #[must_use]
    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }
}
