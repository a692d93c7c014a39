use std::collections::HashSet;

use brep_kernel::{
    EdgeGeometry, FaceGeometry, KernelId, KernelIntrospect, KernelSolidHandle, ShapeHistory,
};
use tnp_types::math;

/// Candidates scoring at or below this are not considered the same entity.
const MATCH_THRESHOLD: f64 = 0.7;

/// Centers farther apart than this contribute nothing to similarity.
const CENTER_FALLOFF: f64 = 10.0;

/// Geometry of every face and edge of a solid at one point in time.
#[derive(Debug, Clone, Default)]
pub struct TopoSnapshot {
    pub faces: Vec<(KernelId, FaceGeometry)>,
    pub edges: Vec<(KernelId, EdgeGeometry)>,
}

impl TopoSnapshot {
    /// Concatenate two snapshots (e.g. both operands of a boolean).
    pub fn merged(mut self, other: &TopoSnapshot) -> Self {
        self.faces.extend(other.faces.iter().cloned());
        self.edges.extend(other.edges.iter().cloned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.edges.is_empty()
    }
}

/// Take a topology snapshot of a solid for diffing.
/// Entities whose geometry cannot be queried are left out.
pub fn snapshot(introspect: &dyn KernelIntrospect, solid: &KernelSolidHandle) -> TopoSnapshot {
    TopoSnapshot {
        faces: introspect
            .list_faces(solid)
            .into_iter()
            .filter_map(|id| introspect.face_geometry(id).ok().map(|g| (id, g)))
            .collect(),
        edges: introspect
            .list_edges(solid)
            .into_iter()
            .filter_map(|id| introspect.edge_geometry(id).ok().map(|g| (id, g)))
            .collect(),
    }
}

/// Derive lineage between two snapshots by geometric similarity.
///
/// Each `before` entity is greedily paired with its most similar unpaired
/// `after` entity of the same kind; pairs go to `modified`, unpaired
/// `before` entities to `deleted`. Unpaired `after` entities are recorded
/// as `generated` from each of `seeds` (the entities the operation acted
/// on). With no seeds they are simply new.
pub fn diff(before: &TopoSnapshot, after: &TopoSnapshot, seeds: &[KernelId]) -> ShapeHistory {
    let mut history = ShapeHistory::default();
    let mut fresh = Vec::new();

    diff_kind(&before.faces, &after.faces, face_similarity, &mut history, &mut fresh);
    diff_kind(&before.edges, &after.edges, edge_similarity, &mut history, &mut fresh);

    if !fresh.is_empty() {
        for seed in seeds {
            history.generated.push((*seed, fresh.clone()));
        }
    }
    history
}

/// Lineage for operations that keep topology order (rigid transforms):
/// the i-th face and edge before map to the i-th face and edge after.
pub fn positional(before: &TopoSnapshot, after: &TopoSnapshot) -> ShapeHistory {
    let mut history = ShapeHistory::default();
    if before.faces.len() != after.faces.len() || before.edges.len() != after.edges.len() {
        return diff(before, after, &[]);
    }
    for ((old, _), (new, _)) in before.faces.iter().zip(after.faces.iter()) {
        history.modified.push((*old, vec![*new]));
    }
    for ((old, _), (new, _)) in before.edges.iter().zip(after.edges.iter()) {
        history.modified.push((*old, vec![*new]));
    }
    history
}

fn diff_kind<G>(
    before: &[(KernelId, G)],
    after: &[(KernelId, G)],
    similarity: fn(&G, &G) -> f64,
    history: &mut ShapeHistory,
    fresh: &mut Vec<KernelId>,
) {
    let mut matched_after: HashSet<KernelId> = HashSet::new();

    for (gone_id, gone_geom) in before {
        let mut best_match: Option<(KernelId, f64)> = None;
        for (new_id, new_geom) in after {
            if matched_after.contains(new_id) {
                continue;
            }
            let score = similarity(gone_geom, new_geom);
            if score > MATCH_THRESHOLD && best_match.map_or(true, |(_, best)| score > best) {
                best_match = Some((*new_id, score));
            }
        }

        match best_match {
            Some((matched_id, _)) => {
                history.modified.push((*gone_id, vec![matched_id]));
                matched_after.insert(matched_id);
            }
            None => history.deleted.push(*gone_id),
        }
    }

    fresh.extend(
        after
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !matched_after.contains(id)),
    );
}

/// Similarity between two faces (0.0 to 1.0).
pub fn face_similarity(a: &FaceGeometry, b: &FaceGeometry) -> f64 {
    let mut score = 0.0;
    let mut weight = 0.0;

    // Surface type match (high weight)
    weight += 3.0;
    if a.surface.surface_type() == b.surface.surface_type() {
        score += 3.0;
    }

    weight += 2.0;
    score += 2.0 * ratio(a.area, b.area);

    weight += 2.0;
    score += 2.0 * proximity(a.center, b.center);

    if let (Some(na), Some(nb)) = (a.normal, b.normal) {
        weight += 2.0;
        // 1.0 parallel, 0.0 anti-parallel
        score += 2.0 * ((math::dot(na, nb) + 1.0) / 2.0).max(0.0);
    }

    score / weight
}

/// Similarity between two edges (0.0 to 1.0). Directions are compared
/// without sign.
pub fn edge_similarity(a: &EdgeGeometry, b: &EdgeGeometry) -> f64 {
    let mut score = 0.0;
    let mut weight = 0.0;

    weight += 3.0;
    if a.curve.surface_type() == b.curve.surface_type() {
        score += 3.0;
    }

    weight += 2.0;
    score += 2.0 * ratio(a.length, b.length);

    weight += 2.0;
    score += 2.0 * proximity(a.midpoint, b.midpoint);

    if let (Some(da), Some(db)) = (a.direction, b.direction) {
        weight += 2.0;
        score += 2.0 * math::dot(da, db).abs().min(1.0);
    }

    score / weight
}

fn ratio(a: f64, b: f64) -> f64 {
    let max = a.abs().max(b.abs());
    if max > 1e-12 {
        1.0 - ((a - b).abs() / max).min(1.0)
    } else {
        1.0 // Both effectively zero
    }
}

fn proximity(a: [f64; 3], b: [f64; 3]) -> f64 {
    1.0 - (math::distance(a, b) / CENTER_FALLOFF).min(1.0)
}
