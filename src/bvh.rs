//! Static bounding volume hierarchy for the broad phase.
//!
//! Built once per filler pass from pool boxes and only read afterwards, so a
//! single tree can be queried from several threads.

use crate::math::{Aabb, Point3};
use crate::pool::ShapeIndex;

const MAX_LEAF_SIZE: usize = 4;

#[derive(Debug)]
enum BvhNode {
    Leaf {
        aabb: Aabb,
        items: Vec<(ShapeIndex, Aabb)>,
    },
    Internal {
        aabb: Aabb,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb {
        match self {
            Self::Leaf { aabb, .. } | Self::Internal { aabb, .. } => aabb,
        }
    }

    fn collect_all(&self, out: &mut Vec<ShapeIndex>) {
        match self {
            Self::Leaf { items, .. } => out.extend(items.iter().map(|(i, _)| *i)),
            Self::Internal { left, right, .. } => {
                left.collect_all(out);
                right.collect_all(out);
            }
        }
    }
}

/// Bounding volume hierarchy over indexed boxes.
#[derive(Debug, Default)]
pub struct Bvh {
    root: Option<BvhNode>,
}

fn axis_value(p: &Point3, axis: usize) -> f64 {
    match axis {
        0 => p.x,
        1 => p.y,
        _ => p.z,
    }
}

fn longest_axis(aabb: &Aabb) -> usize {
    let e = aabb.extents();
    if e.x >= e.y && e.x >= e.z {
        0
    } else if e.y >= e.z {
        1
    } else {
        2
    }
}

impl Bvh {
    /// Builds the tree top-down, splitting at the median centroid along the
    /// longest axis of the centroid bounds. Empty boxes are skipped.
    #[must_use]
    pub fn build(items: &[(ShapeIndex, Aabb)]) -> Self {
        let items: Vec<_> = items.iter().filter(|(_, b)| !b.is_empty()).copied().collect();
        if items.is_empty() {
            return Self { root: None };
        }
        Self {
            root: Some(Self::build_recursive(items)),
        }
    }

    fn build_recursive(mut items: Vec<(ShapeIndex, Aabb)>) -> BvhNode {
        let mut aabb = Aabb::empty();
        for (_, b) in &items {
            aabb.add_box(b);
        }

        if items.len() <= MAX_LEAF_SIZE {
            return BvhNode::Leaf { aabb, items };
        }

        let mut centroids = Aabb::empty();
        for (_, b) in &items {
            centroids.add_point(&b.center());
        }
        let axis = longest_axis(&centroids);
        items.sort_by(|(ia, a), (ib, b)| {
            axis_value(&a.center(), axis)
                .total_cmp(&axis_value(&b.center(), axis))
                .then(ia.cmp(ib))
        });

        let right_items = items.split_off(items.len() / 2);
        BvhNode::Internal {
            aabb,
            left: Box::new(Self::build_recursive(items)),
            right: Box::new(Self::build_recursive(right_items)),
        }
    }

    /// Indices whose boxes overlap `query` inflated by `tolerance`, ascending.
    ///
    /// Nodes missing the query are rejected; a node lying entirely inside the
    /// query has its whole subtree accepted without further box tests.
    #[must_use]
    pub fn select(&self, query: &Aabb, tolerance: f64) -> Vec<ShapeIndex> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            let inflated = query.enlarged(tolerance);
            Self::select_recursive(root, query, &inflated, tolerance, &mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    fn select_recursive(
        node: &BvhNode,
        query: &Aabb,
        inflated: &Aabb,
        tolerance: f64,
        out: &mut Vec<ShapeIndex>,
    ) {
        if !node.aabb().overlaps(query, tolerance) {
            return;
        }
        if inflated.contains_box(node.aabb()) {
            node.collect_all(out);
            return;
        }
        match node {
            BvhNode::Leaf { items, .. } => {
                out.extend(
                    items
                        .iter()
                        .filter(|(_, b)| b.overlaps(query, tolerance))
                        .map(|(i, _)| *i),
                );
            }
            BvhNode::Internal { left, right, .. } => {
                Self::select_recursive(left, query, inflated, tolerance, out);
                Self::select_recursive(right, query, inflated, tolerance, out);
            }
        }
    }

    /// Returns `true` if the tree holds no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::cast_precision_loss)]
mod tests {
    use super::*;

    fn cube(i: usize, x: f64) -> (ShapeIndex, Aabb) {
        (
            ShapeIndex(i),
            Aabb::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0)),
        )
    }

    #[test]
    fn empty_tree_selects_nothing() {
        let bvh = Bvh::build(&[]);
        assert!(bvh.is_empty());
        assert!(bvh.select(&cube(0, 0.0).1, 1.0).is_empty());
    }

    #[test]
    fn touching_boxes_are_selected() {
        let items: Vec<_> = (0..20).map(|i| cube(i, 2.0 * i as f64)).collect();
        let bvh = Bvh::build(&items);
        let query = Aabb::new(Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0));
        assert_eq!(bvh.select(&query, 0.0), vec![ShapeIndex(1), ShapeIndex(2)]);
    }

    #[test]
    fn tolerance_widens_the_query() {
        let items: Vec<_> = (0..10).map(|i| cube(i, 2.0 * i as f64)).collect();
        let bvh = Bvh::build(&items);
        let query = Aabb::new(Point3::new(1.4, 0.0, 0.0), Point3::new(1.6, 1.0, 1.0));
        assert!(bvh.select(&query, 0.1).is_empty());
        assert_eq!(bvh.select(&query, 0.5), vec![ShapeIndex(0), ShapeIndex(1)]);
    }

    #[test]
    fn enclosing_query_takes_everything_sorted() {
        let items: Vec<_> = (0..13).rev().map(|i| cube(i, i as f64)).collect();
        let bvh = Bvh::build(&items);
        let query = Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(100.0, 2.0, 2.0));
        let all: Vec<_> = (0..13).map(ShapeIndex).collect();
        assert_eq!(bvh.select(&query, 0.0), all);
    }
}
