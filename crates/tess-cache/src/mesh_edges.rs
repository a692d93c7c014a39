//! Feature edges recovered from a triangle mesh, for kernels that cannot
//! report B-Rep edges.

use std::collections::HashMap;

use brep_kernel::{EdgeRange, EdgeRenderData, KernelId, RenderMesh};
use tnp_types::math::{self, Vec3};

/// Grid used to weld coincident vertices that belong to different faces.
const WELD: f64 = 1e-5;

type VertexKey = [i64; 3];

fn position(mesh: &RenderMesh, index: u32) -> Option<Vec3> {
    let i = index as usize * 3;
    let p = mesh.vertices.get(i..i + 3)?;
    Some([p[0] as f64, p[1] as f64, p[2] as f64])
}

fn shading_normal(mesh: &RenderMesh, index: u32) -> Vec3 {
    let i = index as usize * 3;
    match mesh.normals.get(i..i + 3) {
        Some(n) => [n[0] as f64, n[1] as f64, n[2] as f64],
        None => [0.0; 3],
    }
}

fn weld(p: Vec3) -> VertexKey {
    [
        (p[0] / WELD).round() as i64,
        (p[1] / WELD).round() as i64,
        (p[2] / WELD).round() as i64,
    ]
}

/// Triangle normal, flipped to agree with the shading normals when the
/// winding disagrees with them.
fn triangle_normal(mesh: &RenderMesh, tri: [u32; 3], p: [Vec3; 3]) -> Option<Vec3> {
    let n = math::normalize(math::cross(math::sub(p[1], p[0]), math::sub(p[2], p[0])))?;
    let shading = tri
        .iter()
        .fold([0.0; 3], |acc, i| math::add(acc, shading_normal(mesh, *i)));
    if math::dot(n, shading) < 0.0 {
        Some(math::scale(n, -1.0))
    } else {
        Some(n)
    }
}

struct Adjacent {
    ends: [Vec3; 2],
    normals: Vec<Vec3>,
}

/// Boundary edges plus edges whose two triangles meet at more than
/// `angle_threshold_deg`. Each edge is a two-vertex range with
/// `KernelId(0)`, in first-seen order.
pub fn mesh_feature_edges(mesh: &RenderMesh, angle_threshold_deg: f64) -> EdgeRenderData {
    let cos_threshold = angle_threshold_deg.to_radians().cos();
    let mut order: Vec<(VertexKey, VertexKey)> = Vec::new();
    let mut edges: HashMap<(VertexKey, VertexKey), Adjacent> = HashMap::new();

    for tri in mesh.indices.chunks_exact(3) {
        let tri = [tri[0], tri[1], tri[2]];
        let (Some(a), Some(b), Some(c)) = (
            position(mesh, tri[0]),
            position(mesh, tri[1]),
            position(mesh, tri[2]),
        ) else {
            continue;
        };
        let Some(normal) = triangle_normal(mesh, tri, [a, b, c]) else {
            continue;
        };
        for (p, q) in [(a, b), (b, c), (c, a)] {
            let (kp, kq) = (weld(p), weld(q));
            if kp == kq {
                continue;
            }
            let key = if kp < kq { (kp, kq) } else { (kq, kp) };
            let entry = edges.entry(key).or_insert_with(|| {
                order.push(key);
                Adjacent {
                    ends: [p, q],
                    normals: Vec::new(),
                }
            });
            entry.normals.push(normal);
        }
    }

    let mut data = EdgeRenderData::default();
    for key in order {
        let Some(edge) = edges.get(&key) else {
            continue;
        };
        let sharp = match edge.normals.as_slice() {
            [a, b] => math::dot(*a, *b) < cos_threshold,
            _ => true,
        };
        if !sharp {
            continue;
        }
        let start_vertex = (data.vertices.len() / 3) as u32;
        for p in edge.ends {
            data.vertices.extend(p.iter().map(|c| *c as f32));
        }
        data.edge_ranges.push(EdgeRange {
            edge_id: KernelId(0),
            start_vertex,
            end_vertex: start_vertex + 2,
        });
    }
    data
}
