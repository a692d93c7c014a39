//! Helper functions: error type, face and edge pickers, mesh math.

use std::collections::HashMap;

use brep_kernel::{KernelId, KernelIntrospect, KernelSolidHandle, RenderMesh};
use feature_engine::EngineError;
use file_format::{ExportError, LoadError, SaveError};
use shape_naming::topology_index::{edge_index_of, face_index_of};
use shape_naming::{NamingError, ShapeReference};
use tnp_types::math::{self, Vec3};
use tnp_types::BoundingBox;

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("feature not found: {name}")]
    FeatureNotFound { name: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("body has no solid")]
    NoSolid,

    #[error("no face facing {direction:?}")]
    NoFace { direction: Vec3 },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("oracle failure ({oracle}): {detail}")]
    OracleFailure { oracle: String, detail: String },

    #[error("tessellation produced no mesh")]
    NoMesh,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

// ── Face and Edge Pickers ───────────────────────────────────────────────────

/// The planar face whose normal points along `direction` and that lies
/// furthest that way. Think "top face" for `[0, 0, 1]`.
pub fn extreme_face(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    direction: Vec3,
) -> Option<KernelId> {
    let dir = math::normalize(direction)?;
    introspect
        .list_faces(solid)
        .into_iter()
        .filter_map(|f| {
            let geom = introspect.face_geometry(f).ok()?;
            let normal = geom.normal?;
            (math::dot(normal, dir) > 0.999).then(|| (f, math::dot(geom.center, dir)))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(f, _)| f)
}

/// Reference plus positional fallback for a face, ready for a feature.
pub fn face_selection(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    face: KernelId,
) -> Result<(ShapeReference, Option<usize>), HarnessError> {
    Ok((
        ShapeReference::from_face(introspect, face)?,
        face_index_of(introspect, solid, face),
    ))
}

/// References and positional fallbacks for every edge bounding `face`.
pub fn face_loop_selection(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    face: KernelId,
) -> Result<(Vec<ShapeReference>, Vec<usize>), HarnessError> {
    let mut refs = Vec::new();
    let mut indices = Vec::new();
    for edge in introspect.face_edges(face) {
        refs.push(ShapeReference::from_edge(introspect, edge)?);
        if let Some(i) = edge_index_of(introspect, solid, edge) {
            indices.push(i);
        }
    }
    Ok((refs, indices))
}

// ── Mesh Math ───────────────────────────────────────────────────────────────

fn mesh_point(mesh: &RenderMesh, index: u32) -> Option<Vec3> {
    let i = index as usize * 3;
    let p = mesh.vertices.get(i..i + 3)?;
    Some([p[0] as f64, p[1] as f64, p[2] as f64])
}

/// Corner positions of one index triple. `None` if any index is out of range.
pub fn triangle_corners(mesh: &RenderMesh, tri: &[u32]) -> Option<[Vec3; 3]> {
    Some([
        mesh_point(mesh, *tri.first()?)?,
        mesh_point(mesh, *tri.get(1)?)?,
        mesh_point(mesh, *tri.get(2)?)?,
    ])
}

/// Corner positions of every triangle whose indices are in range.
pub fn mesh_triangles(mesh: &RenderMesh) -> impl Iterator<Item = [Vec3; 3]> + '_ {
    mesh.indices
        .chunks_exact(3)
        .filter_map(|t| triangle_corners(mesh, t))
}

pub fn triangle_area(t: &[Vec3; 3]) -> f64 {
    math::norm(math::cross(math::sub(t[1], t[0]), math::sub(t[2], t[0]))) / 2.0
}

/// Bounding box of all mesh vertices. `None` for an empty mesh.
pub fn mesh_bounding_box(mesh: &RenderMesh) -> Option<BoundingBox> {
    let points: Vec<Vec3> = mesh
        .vertices
        .chunks_exact(3)
        .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
        .collect();
    BoundingBox::from_points(&points)
}

/// Enclosed volume by the divergence theorem. Meaningless for open meshes.
pub fn mesh_volume(mesh: &RenderMesh) -> f64 {
    let signed: f64 = mesh_triangles(mesh)
        .map(|t| math::dot(t[0], math::cross(t[1], t[2])))
        .sum();
    (signed / 6.0).abs()
}

pub fn mesh_surface_area(mesh: &RenderMesh) -> f64 {
    mesh_triangles(mesh).map(|t| triangle_area(&t)).sum()
}

pub(crate) type PositionKey = [i64; 3];

/// Position quantized to 1e-4, so per-face vertex copies compare equal.
pub(crate) fn position_key(p: Vec3) -> PositionKey {
    [
        (p[0] * 1e4).round() as i64,
        (p[1] * 1e4).round() as i64,
        (p[2] * 1e4).round() as i64,
    ]
}

/// How many triangles use each edge, matched by position.
pub(crate) fn edge_use_counts(mesh: &RenderMesh) -> HashMap<(PositionKey, PositionKey), usize> {
    let mut counts = HashMap::new();
    for t in mesh_triangles(mesh) {
        let k = [position_key(t[0]), position_key(t[1]), position_key(t[2])];
        for (a, b) in [(k[0], k[1]), (k[1], k[2]), (k[2], k[0])] {
            let key = if a <= b { (a, b) } else { (b, a) };
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// `(total_edges, boundary_edges)`, matched by position. A watertight
/// mesh has no boundary edges.
pub fn count_mesh_edges(mesh: &RenderMesh) -> (usize, usize) {
    let counts = edge_use_counts(mesh);
    let boundary = counts.values().filter(|&&c| c == 1).count();
    (counts.len(), boundary)
}
