//! TruckIntrospect: KernelIntrospect implementation wrapping truck topology queries.
//!
//! Entity ids are positional: `handle * 10000 + index` for faces, with
//! `+1000` for edges and `+2000` for vertices. Shared edges and vertices
//! are deduplicated in shell iteration order.

use std::collections::{HashMap, HashSet};

use crate::tessellation::{self, edge_kernel_id, face_kernel_id, vertex_kernel_id};
use crate::traits::KernelIntrospect;
use crate::truck_kernel::TruckKernel;
use crate::types::*;

use tnp_types::math;
use truck_modeling::geometry::Surface;
use truck_modeling::topology::{Edge, Face, Solid, Vertex};
use truck_topology::shell::ShellCondition;

/// KernelIntrospect implementation that borrows a TruckKernel.
pub struct TruckIntrospect<'a> {
    kernel: &'a TruckKernel,
}

impl<'a> TruckIntrospect<'a> {
    pub fn new(kernel: &'a TruckKernel) -> Self {
        Self { kernel }
    }
}

impl KernelIntrospect for TruckIntrospect<'_> {
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.kernel.list_faces(solid)
    }

    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.kernel.list_edges(solid)
    }

    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.kernel.list_vertices(solid)
    }

    fn face_edges(&self, face: KernelId) -> Vec<KernelId> {
        self.kernel.face_edges(face)
    }

    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId> {
        self.kernel.edge_faces(edge)
    }

    fn face_geometry(&self, face: KernelId) -> Result<FaceGeometry, KernelError> {
        self.kernel.face_geometry(face)
    }

    fn edge_geometry(&self, edge: KernelId) -> Result<EdgeGeometry, KernelError> {
        self.kernel.edge_geometry(edge)
    }

    fn mass_properties(&self, solid: &KernelSolidHandle) -> Result<MassProperties, KernelError> {
        self.kernel.mass_properties(solid)
    }

    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<BoundingBox, KernelError> {
        self.kernel.bounding_box(solid)
    }

    fn validate(&self, solid: &KernelSolidHandle) -> Result<(), KernelError> {
        self.kernel.validate(solid)
    }

    fn feature_edges(
        &self,
        solid: &KernelSolidHandle,
        angle_threshold_deg: f64,
    ) -> Result<EdgeRenderData, KernelError> {
        self.kernel.feature_edges(solid, angle_threshold_deg)
    }
}

/// Direct KernelIntrospect implementation on TruckKernel, so it satisfies
/// the combined Kernel + KernelIntrospect bound on its own.
impl KernelIntrospect for TruckKernel {
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        let Some(s) = self.get_solid(solid) else {
            return Vec::new();
        };
        (0..faces_of(s).len())
            .map(|i| face_kernel_id(solid, i))
            .collect()
    }

    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        let Some(s) = self.get_solid(solid) else {
            return Vec::new();
        };
        (0..unique_edges(s).len())
            .map(|i| edge_kernel_id(solid, i))
            .collect()
    }

    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        let Some(s) = self.get_solid(solid) else {
            return Vec::new();
        };
        (0..unique_vertices(s).len())
            .map(|i| vertex_kernel_id(solid, i))
            .collect()
    }

    fn face_edges(&self, face: KernelId) -> Vec<KernelId> {
        let (handle, index) = split_id(face, 0);
        let Some(s) = self.get_solid(&handle) else {
            return Vec::new();
        };
        let faces = faces_of(s);
        let Some(target) = faces.get(index) else {
            return Vec::new();
        };
        let positions: HashMap<_, usize> = unique_edges(s)
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id(), i))
            .collect();
        let mut out = Vec::new();
        for wire in target.boundaries() {
            for edge in wire.edge_iter() {
                if let Some(&i) = positions.get(&edge.id()) {
                    let id = edge_kernel_id(&handle, i);
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId> {
        let (handle, index) = split_id(edge, 1000);
        let Some(s) = self.get_solid(&handle) else {
            return Vec::new();
        };
        let Some(target) = unique_edges(s).get(index).map(|e| e.id()) else {
            return Vec::new();
        };
        faces_of(s)
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                f.boundaries()
                    .iter()
                    .flat_map(|w| w.edge_iter())
                    .any(|e| e.id() == target)
            })
            .map(|(fi, _)| face_kernel_id(&handle, fi))
            .collect()
    }

    fn face_geometry(&self, face: KernelId) -> Result<FaceGeometry, KernelError> {
        let (handle, index) = split_id(face, 0);
        let s = self
            .get_solid(&handle)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let faces = faces_of(s);
        let target = faces
            .get(index)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let mesh = tessellation::face_meshes(s, tessellation::MEASURE_TOLERANCE)
            .into_iter()
            .nth(index)
            .flatten()
            .ok_or_else(|| KernelError::TessellationFailed {
                reason: format!("face {:?} could not be meshed", face),
            })?;
        let (area, center, bbox) =
            tessellation::mesh_area_center(&mesh).ok_or_else(|| KernelError::InvalidGeometry {
                reason: format!("face {:?} has zero area", face),
            })?;
        let (surface, normal) = classify_surface(target);
        Ok(FaceGeometry {
            surface,
            area,
            center,
            bbox,
            normal,
        })
    }

    fn edge_geometry(&self, edge: KernelId) -> Result<EdgeGeometry, KernelError> {
        let (handle, index) = split_id(edge, 1000);
        let s = self
            .get_solid(&handle)
            .ok_or(KernelError::EntityNotFound { id: edge })?;
        let edges = unique_edges(s);
        let target = edges
            .get(index)
            .ok_or(KernelError::EntityNotFound { id: edge })?;
        Ok(line_geometry(target))
    }

    fn mass_properties(&self, solid: &KernelSolidHandle) -> Result<MassProperties, KernelError> {
        let s = self
            .get_solid(solid)
            .ok_or(KernelError::SolidNotFound { handle: solid.id() })?;
        Ok(tessellation::mesh_mass_properties(&tessellation::solid_mesh(s)))
    }

    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<BoundingBox, KernelError> {
        let s = self
            .get_solid(solid)
            .ok_or(KernelError::SolidNotFound { handle: solid.id() })?;
        let mesh = tessellation::solid_mesh(s);
        let points: Vec<[f64; 3]> = mesh
            .positions()
            .iter()
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        BoundingBox::from_points(points.iter())
            .ok_or_else(|| KernelError::invalid("solid has no vertices"))
    }

    fn validate(&self, solid: &KernelSolidHandle) -> Result<(), KernelError> {
        let s = self
            .get_solid(solid)
            .ok_or(KernelError::SolidNotFound { handle: solid.id() })?;
        for (i, shell) in s.boundaries().iter().enumerate() {
            if shell.shell_condition() != ShellCondition::Closed {
                return Err(KernelError::invalid(format!("shell {} is not closed", i)));
            }
        }
        let props = self.mass_properties(solid)?;
        if props.volume <= 1e-9 {
            return Err(KernelError::invalid("solid has zero volume"));
        }
        Ok(())
    }

    fn feature_edges(
        &self,
        solid: &KernelSolidHandle,
        angle_threshold_deg: f64,
    ) -> Result<EdgeRenderData, KernelError> {
        use truck_modeling::{BoundedCurve, ParameterDivision1D};

        let s = self
            .get_solid(solid)
            .ok_or(KernelError::SolidNotFound { handle: solid.id() })?;
        let faces = faces_of(s);
        let normals: Vec<Option<[f64; 3]>> = faces.iter().map(|f| classify_surface(f).1).collect();

        let mut data = EdgeRenderData::default();
        for (index, edge) in unique_edges(s).iter().enumerate() {
            let adjacent: Vec<usize> = faces
                .iter()
                .enumerate()
                .filter(|(_, f)| {
                    f.boundaries()
                        .iter()
                        .flat_map(|w| w.edge_iter())
                        .any(|e| e.id() == edge.id())
                })
                .map(|(fi, _)| fi)
                .collect();

            // seam: both sides belong to the same smooth face
            if adjacent.len() == 1 {
                continue;
            }
            if let [a, b] = adjacent.as_slice() {
                if let (Some(na), Some(nb)) = (normals[*a], normals[*b]) {
                    let cos = math::dot(na, nb).clamp(-1.0, 1.0);
                    if cos.acos().to_degrees() <= angle_threshold_deg {
                        continue;
                    }
                }
            }

            let curve = edge.oriented_curve();
            let (_params, points) =
                curve.parameter_division(curve.range_tuple(), tessellation::MEASURE_TOLERANCE);
            let start_vertex = (data.vertices.len() / 3) as u32;
            for pt in &points {
                data.vertices
                    .extend([pt[0] as f32, pt[1] as f32, pt[2] as f32]);
            }
            let end_vertex = (data.vertices.len() / 3) as u32;
            if end_vertex > start_vertex {
                data.edge_ranges.push(EdgeRange {
                    edge_id: edge_kernel_id(solid, index),
                    start_vertex,
                    end_vertex,
                });
            }
        }
        Ok(data)
    }
}

// ── Shared helpers ──────────────────────────────────────────────────────

fn split_id(id: KernelId, base: u64) -> (KernelSolidHandle, usize) {
    let handle = KernelSolidHandle(id.0 / 10000);
    let index = (id.0 % 10000).saturating_sub(base) as usize;
    (handle, index)
}

fn faces_of(solid: &Solid) -> Vec<&Face> {
    solid
        .boundaries()
        .iter()
        .flat_map(|shell| shell.face_iter())
        .collect()
}

fn unique_edges(solid: &Solid) -> Vec<Edge> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for shell in solid.boundaries().iter() {
        for edge in shell.edge_iter() {
            if seen.insert(edge.id()) {
                out.push(edge);
            }
        }
    }
    out
}

fn unique_vertices(solid: &Solid) -> Vec<Vertex> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for shell in solid.boundaries().iter() {
        for v in shell.vertex_iter() {
            if seen.insert(v.id()) {
                out.push(v);
            }
        }
    }
    out
}

fn classify_surface(face: &Face) -> (SurfaceGeometry, Option<[f64; 3]>) {
    match face.oriented_surface() {
        Surface::Plane(plane) => {
            let n = plane.normal();
            let normal = [n[0], n[1], n[2]];
            (SurfaceGeometry::Plane { normal }, Some(normal))
        }
        Surface::RevolutedCurve(_) => (SurfaceGeometry::Other, None),
        Surface::BSplineSurface(_) | Surface::NurbsSurface(_) => (SurfaceGeometry::Bspline, None),
    }
}

fn line_geometry(edge: &Edge) -> EdgeGeometry {
    let front = edge.front().point();
    let back = edge.back().point();
    let a = [front[0], front[1], front[2]];
    let b = [back[0], back[1], back[2]];
    let bbox = BoundingBox {
        min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
        max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
    };
    EdgeGeometry {
        curve: CurveGeometry::Line,
        length: math::distance(a, b),
        midpoint: math::scale(math::add(a, b), 0.5),
        bbox,
        direction: math::normalize(math::sub(b, a)).map(math::canonical_direction),
    }
}
