use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::interference::Interference;
use crate::math::{Point3, Vector3};
use crate::pool::ShapeIndex;
use crate::topology::{ShapeKind, TopologyStore};

use super::{map_pairs, FillerState};

fn find(parent: &mut BTreeMap<ShapeIndex, ShapeIndex>, v: ShapeIndex) -> ShapeIndex {
    let mut root = v;
    while let Some(&p) = parent.get(&root) {
        if p == root {
            break;
        }
        root = p;
    }
    let mut cur = v;
    while cur != root {
        let next = parent.get(&cur).copied().unwrap_or(root);
        parent.insert(cur, root);
        cur = next;
    }
    root
}

/// Merges groups of coincident vertices into one new vertex each.
#[instrument(skip_all)]
pub(super) fn run(state: &mut FillerState, store: &mut TopologyStore) -> Result<()> {
    let pairs = state.candidate_pairs(ShapeKind::Vertex, ShapeKind::Vertex);
    let fuzzy = state.config.fuzzy_value;
    let (hits, failures) = {
        let pool = &state.pool;
        let store = &*store;
        map_pairs(state.config.run_parallel, &pairs, |a, b| {
            let va = store.vertex(pool.vertex_id(a)?)?;
            let vb = store.vertex(pool.vertex_id(b)?)?;
            let distance = (va.point - vb.point).norm();
            Ok((distance <= va.tolerance.max(vb.tolerance) + fuzzy).then_some(()))
        })
    };
    state.warnings.extend(failures);
    debug!(candidates = pairs.len(), hits = hits.len(), "vertex/vertex");

    let mut parent = BTreeMap::new();
    for &((a, b), ()) in &hits {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent.insert(hi, lo);
            parent.entry(lo).or_insert(lo);
        }
    }

    let mut groups: BTreeMap<ShapeIndex, Vec<ShapeIndex>> = BTreeMap::new();
    let members: Vec<ShapeIndex> = parent.keys().copied().collect();
    for v in members {
        let root = find(&mut parent, v);
        groups.entry(root).or_default().push(v);
    }

    let mut merged_into = BTreeMap::new();
    for members in groups.values() {
        let mut points = Vec::with_capacity(members.len());
        for &m in members {
            let data = store.vertex(state.pool.vertex_id(m)?)?;
            points.push((data.point, data.tolerance));
        }
        #[allow(clippy::cast_precision_loss)]
        let n = points.len() as f64;
        let center = Point3::from(points.iter().map(|(p, _)| p.coords).sum::<Vector3>() / n);
        let tolerance = points
            .iter()
            .map(|(p, tol)| (p - center).norm() + tol)
            .fold(0.0, f64::max);
        let operand = members
            .iter()
            .skip(1)
            .fold(state.pool.operand(members[0]), |acc, &m| acc.merge(state.pool.operand(m)));

        let merged = state.new_vertex(store, center, tolerance, operand);
        for &m in members {
            state.pool.set_same_domain(m, merged);
            merged_into.insert(m, merged);
        }
    }

    for ((v1, v2), ()) in hits {
        if let Some(&merged) = merged_into.get(&v1) {
            state.record(Interference::VertexVertex { v1, v2, merged });
        }
    }
    Ok(())
}
