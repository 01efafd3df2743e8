//! Human-readable dumps of interference data.

use std::fmt::Write;

use crate::filler::FillerState;
use crate::pool::{ShapeIndex, ShapePool};

/// `face` and everything below it.
fn family(pool: &ShapePool, face: ShapeIndex) -> Vec<ShapeIndex> {
    let mut members = vec![face];
    let mut i = 0;
    while let Some(&idx) = members.get(i) {
        for &sub in pool.sub_shapes(idx) {
            if !members.contains(&sub) {
                members.push(sub);
            }
        }
        i += 1;
    }
    members
}

/// Renders the interference records touching two faces or their
/// sub-shapes, in record order.
///
/// Each line names the record's position in [`FillerState::interferences`]
/// and whether it involves the first face's side, the second's, or both.
#[must_use]
pub fn dump_face_pair(state: &FillerState, face1: ShapeIndex, face2: ShapeIndex) -> String {
    let pool = state.pool();
    let first = family(pool, face1);
    let second = family(pool, face2);
    let touches = |family: &[ShapeIndex], idx: ShapeIndex| {
        family.contains(&idx) || family.contains(&pool.real_vertex(idx))
    };

    let mut out = String::new();
    let _ = writeln!(out, "faces {face1} {face2}");
    for (n, record) in state.interferences().iter().enumerate() {
        let (a, b) = record.indices();
        let on_first = touches(&first, a) || touches(&first, b);
        let on_second = touches(&second, a) || touches(&second, b);
        let side = match (on_first, on_second) {
            (true, true) => "both",
            (true, false) => "first",
            (false, true) => "second",
            (false, false) => continue,
        };
        let _ = writeln!(out, "  [{n}] {side}: {record}");
    }
    out
}
