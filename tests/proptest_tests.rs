//! Property-based tests for the broad phase, pave sets and the shape pool.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use pavefill::bvh::Bvh;
use pavefill::math::{Aabb, Point3};
use pavefill::operations::creation::MakeBox;
use pavefill::pave::{Pave, PaveOrigin, PaveSet};
use pavefill::pool::{Operand, ShapeIndex, ShapePool};
use pavefill::topology::{Shape, TopologyStore};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// A box with its min corner in [-100, 100]^3 and sides up to 10.
fn arb_box() -> impl Strategy<Value = Aabb> {
    (
        (-100.0f64..100.0, -100.0f64..100.0, -100.0f64..100.0),
        (0.0f64..10.0, 0.0f64..10.0, 0.0f64..10.0),
    )
        .prop_map(|((x, y, z), (dx, dy, dz))| {
            Aabb::new(Point3::new(x, y, z), Point3::new(x + dx, y + dy, z + dz))
        })
}

fn arb_origin() -> impl Strategy<Value = PaveOrigin> {
    prop_oneof![
        Just(PaveOrigin::VertexEdge),
        Just(PaveOrigin::EdgeEdge),
        Just(PaveOrigin::EdgeFace),
        Just(PaveOrigin::FaceFace),
    ]
}

fn indexed(boxes: &[Aabb]) -> Vec<(ShapeIndex, Aabb)> {
    boxes.iter().enumerate().map(|(i, b)| (ShapeIndex(i), *b)).collect()
}

// ---------------------------------------------------------------------------
// 1. The BVH finds every box a brute-force scan finds, and nothing else.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bvh_matches_brute_force(
        boxes in prop::collection::vec(arb_box(), 0..1000),
        queries in prop::collection::vec(arb_box(), 1..20),
        tolerance in 0.0f64..1.0,
    ) {
        let items = indexed(&boxes);
        let bvh = Bvh::build(&items);
        for query in &queries {
            let expected: Vec<ShapeIndex> = items
                .iter()
                .filter(|(_, b)| b.overlaps(query, tolerance))
                .map(|(i, _)| *i)
                .collect();
            prop_assert_eq!(bvh.select(query, tolerance), expected);
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Paves stay sorted by parameter whatever the insertion order.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn paves_stay_ordered(
        parameters in prop::collection::vec((0.0f64..10.0, arb_origin()), 0..40),
    ) {
        let mut set = PaveSet::new(
            ShapeIndex(0),
            (ShapeIndex(1), ShapeIndex(2)),
            (0.0, 10.0),
            1e-6,
        );
        for (i, (t, origin)) in parameters.iter().enumerate() {
            set.insert(Pave::new(ShapeIndex(3 + i), *t, *origin)).unwrap();
        }
        let paves = set.paves();
        prop_assert_eq!(paves.first().map(|p| p.vertex), Some(ShapeIndex(1)));
        prop_assert_eq!(paves.last().map(|p| p.vertex), Some(ShapeIndex(2)));
        for w in paves.windows(2) {
            prop_assert!(w[1].parameter - w[0].parameter > set.param_tolerance());
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Inserting the same paves twice changes nothing.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn pave_insertion_is_idempotent(
        parameters in prop::collection::vec((0.0f64..10.0, arb_origin()), 1..20),
    ) {
        let mut set = PaveSet::new(
            ShapeIndex(0),
            (ShapeIndex(1), ShapeIndex(2)),
            (0.0, 10.0),
            1e-3,
        );
        let paves: Vec<Pave> = parameters
            .iter()
            .enumerate()
            .map(|(i, (t, origin))| Pave::new(ShapeIndex(3 + i), *t, *origin))
            .collect();
        for pave in &paves {
            set.insert(*pave).unwrap();
        }
        let once = set.paves().to_vec();
        for pave in &paves {
            set.insert(*pave).unwrap();
        }
        prop_assert_eq!(set.paves(), once.as_slice());
    }
}

// ---------------------------------------------------------------------------
// 4. Adding a shape twice to the pool returns the same index.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pool_add_is_idempotent(
        (x, y, z) in (-50.0f64..50.0, -50.0f64..50.0, -50.0f64..50.0),
        size in 0.1f64..20.0,
    ) {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::new(x, y, z), Point3::new(x + size, y + size, z + size))
            .execute(&mut store)
            .unwrap();
        let shape = Shape::Solid(solid);
        let mut pool = ShapePool::build(&store, &[shape]).unwrap();
        let len = pool.len();
        let again = pool.add(&store, shape, Operand::First).unwrap();
        prop_assert_eq!(Some(again), pool.index_of(shape));
        for face in store.faces_of(shape).unwrap() {
            let idx = pool.index_of(Shape::Face(face)).unwrap();
            prop_assert_eq!(pool.add(&store, Shape::Face(face), Operand::First).unwrap(), idx);
        }
        prop_assert_eq!(pool.len(), len);
    }
}
