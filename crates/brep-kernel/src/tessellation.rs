//! Tessellation and mesh-based measurement of truck solids.
//!
//! Wraps truck-meshalgo to produce RenderMesh with FaceRange entries that
//! map triangle index ranges to logical faces. truck exposes no analytic
//! area or volume, so face and solid measurements are taken from the same
//! triangulation.

use crate::types::*;
use crate::types::BoundingBox;
use tnp_types::math::{self, Vec3};
use truck_meshalgo::prelude::*;
use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};

type TruckSolid = truck_modeling::Solid;

/// Chord tolerance used for measurements (face area, volume).
pub(crate) const MEASURE_TOLERANCE: f64 = 0.01;

/// Face id scheme shared with introspection: `handle * 10000 + index`.
pub(crate) fn face_kernel_id(handle: &KernelSolidHandle, index: usize) -> KernelId {
    KernelId(handle.id() * 10000 + index as u64)
}

pub(crate) fn edge_kernel_id(handle: &KernelSolidHandle, index: usize) -> KernelId {
    KernelId(handle.id() * 10000 + 1000 + index as u64)
}

pub(crate) fn vertex_kernel_id(handle: &KernelSolidHandle, index: usize) -> KernelId {
    KernelId(handle.id() * 10000 + 2000 + index as u64)
}

/// Per-face meshes in face iteration order, orientation applied.
/// `None` where truck could not mesh a face.
pub(crate) fn face_meshes(solid: &TruckSolid, tolerance: f64) -> Vec<Option<PolygonMesh>> {
    let meshed = solid.triangulation(tolerance);
    let mut out = Vec::new();
    for shell in meshed.boundaries().iter() {
        for face in shell.face_iter() {
            let maybe_mesh: Option<PolygonMesh> = face.surface();
            out.push(maybe_mesh.map(|mut m| {
                if !face.orientation() {
                    m.invert();
                }
                m
            }));
        }
    }
    out
}

/// Tessellate a truck Solid into a RenderMesh with one range per face.
pub(crate) fn tessellate_solid(
    solid: &TruckSolid,
    handle: &KernelSolidHandle,
    tolerance: f64,
) -> std::result::Result<RenderMesh, KernelError> {
    let mut all_vertices: Vec<f32> = Vec::new();
    let mut all_normals: Vec<f32> = Vec::new();
    let mut all_indices: Vec<u32> = Vec::new();
    let mut face_ranges: Vec<FaceRange> = Vec::new();

    for (index, maybe_mesh) in face_meshes(solid, tolerance).into_iter().enumerate() {
        let Some(face_mesh) = maybe_mesh else {
            continue;
        };

        let start_index = all_indices.len() as u32;
        let base_vertex = (all_vertices.len() / 3) as u32;

        let positions = face_mesh.positions();
        let normals = face_mesh.normals();

        for pos in positions {
            all_vertices.extend([pos[0] as f32, pos[1] as f32, pos[2] as f32]);
        }
        if normals.len() == positions.len() {
            for norm in normals {
                all_normals.extend([norm[0] as f32, norm[1] as f32, norm[2] as f32]);
            }
        } else {
            for _ in 0..positions.len() {
                all_normals.extend([0.0, 0.0, 1.0]);
            }
        }

        for tri in face_mesh.tri_faces() {
            for v in tri.iter() {
                all_indices.push(v.pos as u32 + base_vertex);
            }
        }

        let end_index = all_indices.len() as u32;
        if end_index > start_index {
            face_ranges.push(FaceRange {
                face_id: face_kernel_id(handle, index),
                start_index,
                end_index,
            });
        }
    }

    if all_indices.is_empty() {
        return Err(KernelError::TessellationFailed {
            reason: "no face could be meshed".to_string(),
        });
    }

    Ok(RenderMesh {
        vertices: all_vertices,
        normals: all_normals,
        indices: all_indices,
        face_ranges,
    })
}

/// Merge everything into a single PolygonMesh with one range.
pub(crate) fn tessellate_solid_merged(
    solid: &TruckSolid,
    handle: &KernelSolidHandle,
    tolerance: f64,
) -> std::result::Result<RenderMesh, KernelError> {
    let mesh = solid.triangulation(tolerance).to_polygon();

    let positions = mesh.positions();
    let normals = mesh.normals();

    let mut vertices = Vec::with_capacity(positions.len() * 3);
    let mut norms = Vec::with_capacity(positions.len() * 3);
    let mut indices = Vec::new();

    for pos in positions {
        vertices.extend([pos[0] as f32, pos[1] as f32, pos[2] as f32]);
    }
    for norm in normals {
        norms.extend([norm[0] as f32, norm[1] as f32, norm[2] as f32]);
    }
    for tri in mesh.tri_faces() {
        for v in tri.iter() {
            indices.push(v.pos as u32);
        }
    }
    if indices.is_empty() {
        return Err(KernelError::TessellationFailed {
            reason: "merged triangulation is empty".to_string(),
        });
    }

    let face_ranges = vec![FaceRange {
        face_id: face_kernel_id(handle, 0),
        start_index: 0,
        end_index: indices.len() as u32,
    }];

    Ok(RenderMesh {
        vertices,
        normals: norms,
        indices,
        face_ranges,
    })
}

fn triangles(mesh: &PolygonMesh) -> impl Iterator<Item = [Vec3; 3]> + '_ {
    let positions = mesh.positions();
    mesh.tri_faces().iter().map(move |tri| {
        let p = |i: usize| {
            let q = positions[tri[i].pos];
            [q[0], q[1], q[2]]
        };
        [p(0), p(1), p(2)]
    })
}

/// Area, area-weighted center and bounding box of a face mesh.
pub(crate) fn mesh_area_center(mesh: &PolygonMesh) -> Option<(f64, Vec3, BoundingBox)> {
    let mut area = 0.0;
    let mut weighted = [0.0; 3];
    for [a, b, c] in triangles(mesh) {
        let t = 0.5 * math::norm(math::cross(math::sub(b, a), math::sub(c, a)));
        let centroid = math::scale(math::add(math::add(a, b), c), 1.0 / 3.0);
        area += t;
        weighted = math::add(weighted, math::scale(centroid, t));
    }
    let points: Vec<Vec3> = mesh.positions().iter().map(|q| [q[0], q[1], q[2]]).collect();
    let bbox = BoundingBox::from_points(points.iter())?;
    if area <= 0.0 {
        return None;
    }
    Some((area, math::scale(weighted, 1.0 / area), bbox))
}

/// Volume, surface area and center of mass of a closed mesh
/// (divergence theorem over signed tetrahedra).
pub(crate) fn mesh_mass_properties(mesh: &PolygonMesh) -> MassProperties {
    let mut volume = 0.0;
    let mut area = 0.0;
    let mut weighted = [0.0; 3];
    for [a, b, c] in triangles(mesh) {
        let v = math::dot(a, math::cross(b, c)) / 6.0;
        volume += v;
        area += 0.5 * math::norm(math::cross(math::sub(b, a), math::sub(c, a)));
        weighted = math::add(weighted, math::scale(math::add(math::add(a, b), c), v / 4.0));
    }
    let center_of_mass = if volume.abs() > 1e-12 {
        math::scale(weighted, 1.0 / volume)
    } else {
        [0.0; 3]
    };
    MassProperties {
        volume,
        area,
        center_of_mass,
    }
}

/// Whole-solid measurement mesh.
pub(crate) fn solid_mesh(solid: &TruckSolid) -> PolygonMesh {
    solid.triangulation(MEASURE_TOLERANCE).to_polygon()
}
