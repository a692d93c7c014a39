//! Verification oracles: pure functions returning pass/fail verdicts.
//!
//! Each oracle returns an [`OracleVerdict`] with diagnostic detail rather
//! than panicking, so a test can collect every failure in one pass.

use brep_kernel::{KernelIntrospect, KernelSolidHandle, RenderMesh};
use feature_engine::{HealthReport, HealthStatus, SolidSignature};
use shape_naming::ShapeRegistry;
use tess_cache::CacheStats;
use tnp_types::math;
use uuid::Uuid;

use crate::helpers::{
    edge_use_counts, mesh_bounding_box, mesh_triangles, triangle_area, triangle_corners,
};

/// The result of a single oracle check.
#[derive(Debug, Clone)]
pub struct OracleVerdict {
    pub oracle_name: String,
    pub passed: bool,
    pub detail: String,
    pub value: Option<f64>,
}

impl OracleVerdict {
    fn verdict(name: &str, passed: bool, detail: String, value: Option<f64>) -> Self {
        Self {
            oracle_name: name.to_string(),
            passed,
            detail,
            value,
        }
    }

    fn pass(name: &str, detail: String) -> Self {
        Self::verdict(name, true, detail, None)
    }

    fn fail(name: &str, detail: String) -> Self {
        Self::verdict(name, false, detail, None)
    }
}

// ── Topology Oracles ────────────────────────────────────────────────────────

/// V - E + F = 2 for a genus-0 solid.
pub fn check_euler_formula(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
) -> OracleVerdict {
    let v = introspect.list_vertices(solid).len() as i64;
    let e = introspect.list_edges(solid).len() as i64;
    let f = introspect.list_faces(solid).len() as i64;
    let euler = v - e + f;
    OracleVerdict::verdict(
        "euler_formula",
        euler == 2,
        format!("V({v}) - E({e}) + F({f}) = {euler}"),
        Some(euler as f64),
    )
}

/// Every edge bounds exactly two faces.
pub fn check_manifold_edges(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
) -> OracleVerdict {
    let edges = introspect.list_edges(solid);
    let bad: Vec<_> = edges
        .iter()
        .map(|e| (*e, introspect.edge_faces(*e).len()))
        .filter(|(_, n)| *n != 2)
        .collect();
    if bad.is_empty() {
        OracleVerdict::pass(
            "manifold_edges",
            format!("all {} edges have exactly 2 faces", edges.len()),
        )
    } else {
        OracleVerdict::fail(
            "manifold_edges",
            format!(
                "{} non-manifold edges: {:?}",
                bad.len(),
                &bad[..bad.len().min(5)]
            ),
        )
    }
}

/// Exact vertex, edge and face counts.
pub fn check_topology_counts(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    expected: (usize, usize, usize),
) -> OracleVerdict {
    let actual = (
        introspect.list_vertices(solid).len(),
        introspect.list_edges(solid).len(),
        introspect.list_faces(solid).len(),
    );
    OracleVerdict::verdict(
        "topology_counts",
        actual == expected,
        format!(
            "expected V={} E={} F={}, got V={} E={} F={}",
            expected.0, expected.1, expected.2, actual.0, actual.1, actual.2
        ),
        None,
    )
}

/// Volume from the kernel's mass properties.
pub fn check_volume(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    expected: f64,
    tolerance: f64,
) -> OracleVerdict {
    match introspect.mass_properties(solid) {
        Ok(props) => OracleVerdict::verdict(
            "volume",
            (props.volume - expected).abs() <= tolerance,
            format!("expected {expected:.4}, got {:.4} (tol={tolerance})", props.volume),
            Some(props.volume),
        ),
        Err(err) => OracleVerdict::fail("volume", format!("mass properties failed: {err}")),
    }
}

// ── Mesh Oracles ────────────────────────────────────────────────────────────

/// Every triangle edge is shared by exactly two triangles, matched by
/// position so per-face vertex copies count as shared.
pub fn check_watertight_mesh(mesh: &RenderMesh) -> OracleVerdict {
    let counts = edge_use_counts(mesh);
    let unpaired = counts.values().filter(|&&c| c != 2).count();
    OracleVerdict::verdict(
        "watertight_mesh",
        unpaired == 0 && !counts.is_empty(),
        format!("{unpaired} unpaired edges out of {}", counts.len()),
        None,
    )
}

pub fn check_no_degenerate_triangles(mesh: &RenderMesh) -> OracleVerdict {
    let total = mesh.indices.len() / 3;
    let degenerate = mesh_triangles(mesh)
        .filter(|t| triangle_area(t) < 1e-12)
        .count();
    OracleVerdict::verdict(
        "no_degenerate_triangles",
        degenerate == 0,
        format!("{degenerate} of {total} triangles are degenerate"),
        None,
    )
}

/// Stored normals agree with triangle winding and have unit length.
pub fn check_normals(mesh: &RenderMesh) -> OracleVerdict {
    let normal = |i: u32| {
        let i = i as usize * 3;
        mesh.normals
            .get(i..i + 3)
            .map(|n| [n[0] as f64, n[1] as f64, n[2] as f64])
    };
    let mut reversed = 0;
    let mut not_unit = 0;
    for tri in mesh.indices.chunks_exact(3) {
        let Some(corners) = triangle_corners(mesh, tri) else {
            continue;
        };
        let geometric = math::cross(
            math::sub(corners[1], corners[0]),
            math::sub(corners[2], corners[0]),
        );
        for n in tri.iter().filter_map(|i| normal(*i)) {
            if (math::norm(n) - 1.0).abs() > 0.01 {
                not_unit += 1;
            }
            if math::dot(geometric, n) < 0.0 {
                reversed += 1;
            }
        }
    }
    OracleVerdict::verdict(
        "normals",
        reversed == 0 && not_unit == 0,
        format!("{reversed} reversed, {not_unit} not unit length"),
        None,
    )
}

/// Index values within the vertex array.
pub fn check_valid_indices(mesh: &RenderMesh) -> OracleVerdict {
    let vertex_count = mesh.vertices.len() / 3;
    let bad = mesh
        .indices
        .iter()
        .filter(|i| **i as usize >= vertex_count)
        .count();
    OracleVerdict::verdict(
        "valid_indices",
        bad == 0,
        format!("{bad} indices >= vertex count {vertex_count}"),
        None,
    )
}

/// Face ranges tile the index buffer with no gaps or overlaps.
pub fn check_face_range_coverage(mesh: &RenderMesh) -> OracleVerdict {
    if mesh.face_ranges.is_empty() {
        return OracleVerdict::fail("face_range_coverage", "no face ranges".to_string());
    }
    let mut expected_start = 0u32;
    for (i, range) in mesh.face_ranges.iter().enumerate() {
        if range.start_index != expected_start || range.end_index <= range.start_index {
            return OracleVerdict::fail(
                "face_range_coverage",
                format!(
                    "range {i} is [{}, {}), expected start {expected_start}",
                    range.start_index, range.end_index
                ),
            );
        }
        expected_start = range.end_index;
    }
    OracleVerdict::verdict(
        "face_range_coverage",
        expected_start as usize == mesh.indices.len(),
        format!(
            "{} ranges end at {expected_start} of {} indices",
            mesh.face_ranges.len(),
            mesh.indices.len()
        ),
        None,
    )
}

/// The mesh's bounding box agrees with the solid's within `tolerance`.
pub fn check_mesh_matches_solid(
    mesh: &RenderMesh,
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    tolerance: f64,
) -> OracleVerdict {
    let (Some(mesh_box), Ok(solid_box)) = (mesh_bounding_box(mesh), introspect.bounding_box(solid))
    else {
        return OracleVerdict::fail("mesh_matches_solid", "missing bounding box".to_string());
    };
    let worst = (0..3)
        .flat_map(|i| {
            [
                (mesh_box.min[i] - solid_box.min[i]).abs(),
                (mesh_box.max[i] - solid_box.max[i]).abs(),
            ]
        })
        .fold(0.0, f64::max);
    OracleVerdict::verdict(
        "mesh_matches_solid",
        worst <= tolerance,
        format!("largest bounding box deviation {worst:.6} (tol={tolerance})"),
        Some(worst),
    )
}

// ── Naming Oracles ──────────────────────────────────────────────────────────

/// No feature of the body is broken.
pub fn check_body_health(report: &HealthReport) -> OracleVerdict {
    let broken: Vec<&str> = report
        .features
        .iter()
        .filter(|f| f.status == HealthStatus::Broken)
        .map(|f| f.name.as_str())
        .collect();
    OracleVerdict::verdict(
        "body_health",
        broken.is_empty(),
        if broken.is_empty() {
            format!("all {} features healthy", report.features.len())
        } else {
            format!("broken features: {}", broken.join(", "))
        },
        Some(report.broken_total() as f64),
    )
}

/// Every face and edge of the solid has a registered shape of `feature`.
pub fn check_shapes_registered(
    registry: &ShapeRegistry,
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    feature_id: Uuid,
) -> OracleVerdict {
    let expected = introspect.list_faces(solid).len() + introspect.list_edges(solid).len();
    let registered = registry.shapes_of_feature(feature_id).len();
    OracleVerdict::verdict(
        "shapes_registered",
        registered == expected,
        format!("{registered} shapes registered for {expected} faces and edges"),
        Some(registered as f64),
    )
}

/// Two signatures describe the same solid within `tolerance`.
pub fn check_signature_restored(
    expected: &SolidSignature,
    actual: &SolidSignature,
    tolerance: f64,
) -> OracleVerdict {
    OracleVerdict::verdict(
        "signature_restored",
        expected.approx_eq(actual, tolerance),
        format!(
            "expected F={} E={} vol={:.4}, got F={} E={} vol={:.4}",
            expected.face_count,
            expected.edge_count,
            expected.volume,
            actual.face_count,
            actual.edge_count,
            actual.volume
        ),
        Some(actual.volume),
    )
}

// ── Cache Oracles ───────────────────────────────────────────────────────────

/// At least `min_hits` mesh lookups were served from cache.
pub fn check_cache_reuse(stats: &CacheStats, min_hits: u64) -> OracleVerdict {
    OracleVerdict::verdict(
        "cache_reuse",
        stats.mesh_hits >= min_hits,
        format!(
            "{} mesh hits, {} misses (need >= {min_hits} hits)",
            stats.mesh_hits, stats.mesh_misses
        ),
        Some(stats.mesh_hits as f64),
    )
}

// ── Composite ───────────────────────────────────────────────────────────────

pub fn run_all_mesh_checks(mesh: &RenderMesh) -> Vec<OracleVerdict> {
    vec![
        check_watertight_mesh(mesh),
        check_no_degenerate_triangles(mesh),
        check_normals(mesh),
        check_valid_indices(mesh),
        check_face_range_coverage(mesh),
    ]
}

pub fn run_topology_checks(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
) -> Vec<OracleVerdict> {
    vec![
        check_euler_formula(introspect, solid),
        check_manifold_edges(introspect, solid),
    ]
}
