//! MockKernel: deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Solids are lists of interior-disjoint convex cells (see [`crate::halfspace`]).
//! Cells are never fused: two cells glued along a face both keep reporting
//! that face. Within that limit every measurement is exact, every id is
//! allocated from counters, and the same call sequence always yields the
//! same face and edge order.
//!
//! Approximations:
//! - cylinders are 24-sided prisms whose side facets report a cylindrical surface;
//! - a fillet is a single facet tangent to the rolling ball, reported as cylindrical;
//! - a loft is the convex hull of its sections.

use std::collections::HashMap;

use tnp_types::math::{self, Vec3};
use tnp_types::BoundingBox;
use tracing::debug;

use crate::halfspace::{
    self, face_plane_ids, take_id, Cell, CellTopology, FacetKind, HalfSpace, VOLUME_EPS,
};
use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;

const CYLINDER_SEGMENTS: usize = 24;

/// Location of an entity inside a stored solid.
#[derive(Debug, Clone, Copy)]
struct Slot {
    cell: usize,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
enum EntityRef {
    Face { solid: u64, slot: usize },
    Edge { solid: u64, slot: usize },
    Vertex,
}

#[derive(Debug, Clone)]
struct MockSolid {
    cells: Vec<Cell>,
    topo: Vec<CellTopology>,
    faces: Vec<(KernelId, Slot)>,
    edges: Vec<(KernelId, Slot)>,
    vertices: Vec<(KernelId, Slot)>,
}

impl MockSolid {
    fn face_id(&self, cell: usize, index: usize) -> Option<KernelId> {
        self.faces
            .iter()
            .find(|(_, s)| s.cell == cell && s.index == index)
            .map(|(id, _)| *id)
    }

    fn edge_id(&self, cell: usize, index: usize) -> Option<KernelId> {
        self.edges
            .iter()
            .find(|(_, s)| s.cell == cell && s.index == index)
            .map(|(id, _)| *id)
    }

    fn face_key(&self, slot: Slot) -> (usize, u64) {
        let face = &self.topo[slot.cell].faces[slot.index];
        (slot.cell, self.cells[slot.cell].planes[face.plane].id)
    }

    fn edge_key(&self, slot: Slot) -> (usize, u64, u64) {
        let topo = &self.topo[slot.cell];
        let edge = &topo.edges[slot.index];
        let planes = &self.cells[slot.cell].planes;
        let a = planes[topo.faces[edge.faces.0].plane].id;
        let b = planes[topo.faces[edge.faces.1].plane].id;
        (slot.cell, a.min(b), a.max(b))
    }
}

/// Which local edge modifier to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeBlend {
    Chamfer,
    Fillet,
}

impl EdgeBlend {
    fn error(self, reason: String) -> KernelError {
        match self {
            EdgeBlend::Chamfer => KernelError::ChamferFailed { reason },
            EdgeBlend::Fillet => KernelError::FilletFailed { reason },
        }
    }
}

/// Failures a test can arm before calling into the kernel.
#[derive(Debug, Clone, Default)]
struct Faults {
    next_operation: Option<String>,
    corrupt_next_result: bool,
    primary_tessellation: bool,
    brep_edges: bool,
}

/// Deterministic test double for the geometry kernel.
/// Implements both Kernel and KernelIntrospect.
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    next_plane: u64,
    solids: HashMap<u64, MockSolid>,
    entities: HashMap<KernelId, EntityRef>,
    faults: Faults,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            next_plane: 1,
            solids: HashMap::new(),
            entities: HashMap::new(),
            faults: Faults::default(),
        }
    }

    /// Make the next modeling operation fail with `reason`.
    pub fn fail_next_operation(&mut self, reason: &str) {
        self.faults.next_operation = Some(reason.to_string());
    }

    /// Make the next modeling operation "succeed" with a zero-volume solid.
    pub fn corrupt_next_result(&mut self) {
        self.faults.corrupt_next_result = true;
    }

    /// Make per-face tessellation fail so callers exercise the merged fallback.
    pub fn set_primary_tessellation_failure(&mut self, fail: bool) {
        self.faults.primary_tessellation = fail;
    }

    /// Make B-Rep feature-edge extraction fail.
    pub fn set_brep_edge_failure(&mut self, fail: bool) {
        self.faults.brep_edges = fail;
    }

    /// Number of stored solids (every operation adds one).
    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn alloc_handle(&mut self) -> KernelSolidHandle {
        let h = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn begin(&mut self, operation: &str) -> Result<(), KernelError> {
        if let Some(message) = self.faults.next_operation.take() {
            debug!(operation, %message, "injected kernel failure");
            return Err(KernelError::Other { message });
        }
        Ok(())
    }

    fn finish(&mut self, cells: Vec<Cell>) -> Result<KernelSolidHandle, KernelError> {
        if std::mem::take(&mut self.faults.corrupt_next_result) {
            let flat = self.flat_cell();
            let topo = vec![flat.topology()];
            return Ok(self.insert(vec![flat], topo));
        }
        self.store(cells)
    }

    fn store(&mut self, cells: Vec<Cell>) -> Result<KernelSolidHandle, KernelError> {
        let mut kept = Vec::new();
        let mut topo = Vec::new();
        for cell in cells {
            let t = cell.topology();
            if t.volume > VOLUME_EPS {
                kept.push(cell);
                topo.push(t);
            }
        }
        if kept.is_empty() {
            return Err(KernelError::invalid("operation produced an empty solid"));
        }
        Ok(self.insert(kept, topo))
    }

    fn insert(&mut self, cells: Vec<Cell>, topo: Vec<CellTopology>) -> KernelSolidHandle {
        let handle = self.alloc_handle();
        let mut faces = Vec::new();
        let mut edges = Vec::new();
        let mut vertices = Vec::new();

        for (cell, t) in topo.iter().enumerate() {
            for index in 0..t.faces.len() {
                let id = self.alloc_id();
                self.entities.insert(
                    id,
                    EntityRef::Face {
                        solid: handle.id(),
                        slot: faces.len(),
                    },
                );
                faces.push((id, Slot { cell, index }));
            }
        }
        for (cell, t) in topo.iter().enumerate() {
            for index in 0..t.edges.len() {
                let id = self.alloc_id();
                self.entities.insert(
                    id,
                    EntityRef::Edge {
                        solid: handle.id(),
                        slot: edges.len(),
                    },
                );
                edges.push((id, Slot { cell, index }));
            }
        }
        for (cell, t) in topo.iter().enumerate() {
            for index in 0..t.vertices.len() {
                let id = self.alloc_id();
                self.entities.insert(id, EntityRef::Vertex);
                vertices.push((id, Slot { cell, index }));
            }
        }

        debug!(
            handle = handle.id(),
            cells = cells.len(),
            faces = faces.len(),
            edges = edges.len(),
            "stored mock solid"
        );

        self.solids.insert(
            handle.id(),
            MockSolid {
                cells,
                topo,
                faces,
                edges,
                vertices,
            },
        );
        handle
    }

    /// A zero-thickness square: the shape `corrupt_next_result` hands back.
    fn flat_cell(&mut self) -> Cell {
        let specs: [(Vec3, f64); 6] = [
            ([0.0, 0.0, -1.0], 0.0),
            ([0.0, 0.0, 1.0], 0.0),
            ([0.0, -1.0, 0.0], 0.0),
            ([0.0, 1.0, 0.0], 1.0),
            ([-1.0, 0.0, 0.0], 0.0),
            ([1.0, 0.0, 0.0], 1.0),
        ];
        let planes = specs
            .iter()
            .map(|(normal, offset)| HalfSpace {
                id: take_id(&mut self.next_plane),
                normal: *normal,
                offset: *offset,
                kind: FacetKind::Plane,
            })
            .collect();
        Cell::new(planes)
    }

    fn solid(&self, handle: &KernelSolidHandle) -> Result<&MockSolid, KernelError> {
        self.solids
            .get(&handle.id())
            .ok_or(KernelError::SolidNotFound { handle: handle.id() })
    }

    fn face_lookup(&self, face: KernelId) -> Result<(&MockSolid, u64, Slot), KernelError> {
        match self.entities.get(&face) {
            Some(EntityRef::Face { solid, slot }) => {
                let s = self
                    .solids
                    .get(solid)
                    .ok_or(KernelError::EntityNotFound { id: face })?;
                Ok((s, *solid, s.faces[*slot].1))
            }
            _ => Err(KernelError::EntityNotFound { id: face }),
        }
    }

    fn edge_lookup(&self, edge: KernelId) -> Result<(&MockSolid, u64, Slot), KernelError> {
        match self.entities.get(&edge) {
            Some(EntityRef::Edge { solid, slot }) => {
                let s = self
                    .solids
                    .get(solid)
                    .ok_or(KernelError::EntityNotFound { id: edge })?;
                Ok((s, *solid, s.edges[*slot].1))
            }
            _ => Err(KernelError::EntityNotFound { id: edge }),
        }
    }

    /// Face slot, checked to belong to `solid`.
    fn face_in(&self, solid: &KernelSolidHandle, face: KernelId) -> Result<Slot, KernelError> {
        let (_, owner, slot) = self.face_lookup(face)?;
        if owner != solid.id() {
            return Err(KernelError::EntityNotFound { id: face });
        }
        Ok(slot)
    }

    fn edge_in(&self, solid: &KernelSolidHandle, edge: KernelId) -> Result<Slot, KernelError> {
        let (_, owner, slot) = self.edge_lookup(edge)?;
        if owner != solid.id() {
            return Err(KernelError::EntityNotFound { id: edge });
        }
        Ok(slot)
    }

    /// Lineage between two solids, matching faces and edges by plane identity.
    /// New entities with no predecessor are attributed to `origin`.
    fn plane_history(
        &self,
        before: &MockSolid,
        after: &KernelSolidHandle,
        origin: KernelId,
    ) -> ShapeHistory {
        let mut history = ShapeHistory::default();
        let Some(after) = self.solids.get(&after.id()) else {
            return history;
        };

        let new_faces: HashMap<(usize, u64), KernelId> = after
            .faces
            .iter()
            .map(|(id, slot)| (after.face_key(*slot), *id))
            .collect();
        let mut matched = Vec::new();
        for (old_id, slot) in &before.faces {
            match new_faces.get(&before.face_key(*slot)) {
                Some(new_id) => {
                    history.modified.push((*old_id, vec![*new_id]));
                    matched.push(*new_id);
                }
                None => history.deleted.push(*old_id),
            }
        }

        let new_edges: HashMap<(usize, u64, u64), KernelId> = after
            .edges
            .iter()
            .map(|(id, slot)| (after.edge_key(*slot), *id))
            .collect();
        for (old_id, slot) in &before.edges {
            match new_edges.get(&before.edge_key(*slot)) {
                Some(new_id) => {
                    history.modified.push((*old_id, vec![*new_id]));
                    matched.push(*new_id);
                }
                None => history.deleted.push(*old_id),
            }
        }

        let generated: Vec<KernelId> = after
            .faces
            .iter()
            .chain(after.edges.iter())
            .map(|(id, _)| *id)
            .filter(|id| !matched.contains(id))
            .collect();
        if !generated.is_empty() {
            history.generated.push((origin, generated));
        }
        history
    }

    fn blend_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        size: f64,
        blend: EdgeBlend,
    ) -> Result<KernelSolidHandle, KernelError> {
        let name = match blend {
            EdgeBlend::Chamfer => "chamfer distance",
            EdgeBlend::Fillet => "fillet radius",
        };
        if size.is_nan() || size <= 0.0 {
            return Err(blend.error(format!("{} must be positive", name)));
        }
        if edges.is_empty() {
            return Err(blend.error("no edges selected".to_string()));
        }

        let mut unique: Vec<KernelId> = Vec::new();
        for e in edges {
            if !unique.contains(e) {
                unique.push(*e);
            }
        }

        let src = self.solid(solid)?.clone();
        let mut additions: Vec<(usize, HalfSpace)> = Vec::new();
        for edge in unique {
            let slot = self
                .edge_in(solid, edge)
                .map_err(|_| blend.error(format!("edge {:?} not found in solid", edge)))?;
            let topo = &src.topo[slot.cell];
            let cell = &src.cells[slot.cell];
            let e = &topo.edges[slot.index];
            let fa = &topo.faces[e.faces.0];
            let fb = &topo.faces[e.faces.1];
            let na = cell.planes[fa.plane].normal;
            let nb = cell.planes[fb.plane].normal;
            let p0 = topo.vertices[e.vertices.0];
            let p1 = topo.vertices[e.vertices.1];
            let dir = math::normalize(math::sub(p1, p0))
                .ok_or_else(|| blend.error("degenerate edge".to_string()))?;
            let bisector = math::normalize(math::add(na, nb))
                .ok_or_else(|| blend.error("edge faces are opposite".to_string()))?;

            let plane = match blend {
                EdgeBlend::Chamfer => {
                    let ua = inward(dir, na, fa.center, p0);
                    let pa = math::add(p0, math::scale(ua, size));
                    HalfSpace {
                        id: take_id(&mut self.next_plane),
                        normal: bisector,
                        offset: math::dot(bisector, pa),
                        kind: FacetKind::Plane,
                    }
                }
                EdgeBlend::Fillet => {
                    let denom = 1.0 + math::dot(na, nb);
                    if denom < 1e-9 {
                        return Err(blend.error("edge faces are opposite".to_string()));
                    }
                    let center = math::sub(p0, math::scale(math::add(na, nb), size / denom));
                    HalfSpace {
                        id: take_id(&mut self.next_plane),
                        normal: bisector,
                        offset: math::dot(bisector, center) + size,
                        kind: FacetKind::Cylinder {
                            radius: size,
                            axis: math::canonical_direction(dir),
                        },
                    }
                }
            };
            additions.push((slot.cell, plane));
        }

        let mut cells = src.cells.clone();
        for (ci, plane) in &additions {
            cells[*ci].planes.push(plane.clone());
        }

        for (ci, cell) in cells.iter().enumerate() {
            let before = face_plane_ids(&src.cells[ci], &src.topo[ci]);
            let topo = cell.topology();
            let after = face_plane_ids(cell, &topo);
            if before.difference(&after).next().is_some() {
                return Err(blend.error(format!("{} consumes an adjacent face", name)));
            }
            for (_, plane) in additions.iter().filter(|(c, _)| *c == ci) {
                if !after.contains(&plane.id) {
                    return Err(blend.error("blend does not cut the edge".to_string()));
                }
            }
        }

        self.finish(cells)
    }

    fn build_mesh(&self, solid: &MockSolid, merged: bool) -> RenderMesh {
        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut indices = Vec::new();
        let mut face_ranges = Vec::new();

        for (face_id, slot) in &solid.faces {
            let topo = &solid.topo[slot.cell];
            let face = &topo.faces[slot.index];
            let n = solid.cells[slot.cell].planes[face.plane].normal;
            let start_index = indices.len() as u32;
            let base = (vertices.len() / 3) as u32;
            for &vi in &face.boundary {
                let p = topo.vertices[vi];
                vertices.extend(p.iter().map(|c| *c as f32));
                normals.extend(n.iter().map(|c| *c as f32));
            }
            for i in 1..face.boundary.len() as u32 - 1 {
                indices.extend([base, base + i, base + i + 1]);
            }
            if !merged {
                face_ranges.push(FaceRange {
                    face_id: *face_id,
                    start_index,
                    end_index: indices.len() as u32,
                });
            }
        }

        if merged {
            if let Some((first, _)) = solid.faces.first() {
                face_ranges.push(FaceRange {
                    face_id: *first,
                    start_index: 0,
                    end_index: indices.len() as u32,
                });
            }
        }

        RenderMesh {
            vertices,
            normals,
            indices,
            face_ranges,
        }
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// In-face direction perpendicular to an edge, pointing into the face.
fn inward(edge_dir: Vec3, face_normal: Vec3, face_center: Vec3, on_edge: Vec3) -> Vec3 {
    let u = math::cross(face_normal, edge_dir);
    if math::dot(u, math::sub(face_center, on_edge)) < 0.0 {
        math::scale(u, -1.0)
    } else {
        u
    }
}

impl Kernel for MockKernel {
    fn make_box(
        &mut self,
        corner: [f64; 3],
        size: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("make_box")?;
        if size.iter().any(|s| s.is_nan() || *s <= 0.0) {
            return Err(KernelError::invalid("box dimensions must be positive"));
        }
        let [x0, y0, z0] = corner;
        let [x1, y1, z1] = [x0 + size[0], y0 + size[1], z0 + size[2]];
        // bottom, top, front, back, left, right
        let specs: [(Vec3, f64); 6] = [
            ([0.0, 0.0, -1.0], -z0),
            ([0.0, 0.0, 1.0], z1),
            ([0.0, -1.0, 0.0], -y0),
            ([0.0, 1.0, 0.0], y1),
            ([-1.0, 0.0, 0.0], -x0),
            ([1.0, 0.0, 0.0], x1),
        ];
        let planes = specs
            .iter()
            .map(|(normal, offset)| HalfSpace {
                id: take_id(&mut self.next_plane),
                normal: *normal,
                offset: *offset,
                kind: FacetKind::Plane,
            })
            .collect();
        self.finish(vec![Cell::new(planes)])
    }

    fn make_cylinder(
        &mut self,
        base_center: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("make_cylinder")?;
        if radius.is_nan() || radius <= 0.0 || height.is_nan() || height <= 0.0 {
            return Err(KernelError::invalid(
                "cylinder radius and height must be positive",
            ));
        }
        let axis =
            math::normalize(axis).ok_or_else(|| KernelError::invalid("cylinder axis is zero"))?;
        let u = math::any_perpendicular(axis);
        let w = math::cross(axis, u);
        let profile: Vec<Vec3> = (0..CYLINDER_SEGMENTS)
            .map(|k| {
                let t = std::f64::consts::TAU * k as f64 / CYLINDER_SEGMENTS as f64;
                math::add(
                    base_center,
                    math::add(math::scale(u, radius * t.cos()), math::scale(w, radius * t.sin())),
                )
            })
            .collect();
        let cell = halfspace::prism_cell(
            &profile,
            math::scale(axis, height),
            &mut self.next_plane,
            FacetKind::Cylinder {
                radius,
                axis: math::canonical_direction(axis),
            },
        )?;
        self.finish(vec![cell])
    }

    fn extrude_polygon(
        &mut self,
        profile: &[[f64; 3]],
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("extrude_polygon")?;
        if depth.is_nan() || depth.abs() < 1e-12 {
            return Err(KernelError::invalid("extrude depth must be non-zero"));
        }
        let dir = math::normalize(direction)
            .ok_or_else(|| KernelError::invalid("extrude direction has zero length"))?;
        let cell = halfspace::prism_cell(
            profile,
            math::scale(dir, depth),
            &mut self.next_plane,
            FacetKind::Plane,
        )?;
        self.finish(vec![cell])
    }

    fn push_pull_face(
        &mut self,
        solid: &KernelSolidHandle,
        face: KernelId,
        distance: f64,
    ) -> Result<(KernelSolidHandle, ShapeHistory), KernelError> {
        self.begin("push_pull_face")?;
        if distance.is_nan() {
            return Err(KernelError::invalid("push/pull distance is NaN"));
        }
        let src = self.solid(solid)?.clone();
        let slot = self.face_in(solid, face)?;
        let plane = src.topo[slot.cell].faces[slot.index].plane;

        let mut moved = src.cells[slot.cell].clone();
        moved.planes[plane].offset += distance;
        if moved.is_empty() {
            return Err(KernelError::invalid("push/pull consumed the solid"));
        }
        for (i, other) in src.cells.iter().enumerate() {
            if i != slot.cell && moved.overlaps(other) {
                return Err(KernelError::BooleanFailed {
                    reason: "push/pull runs into another lump of the solid".to_string(),
                });
            }
        }

        let mut cells = src.cells.clone();
        cells[slot.cell] = moved;
        let handle = self.finish(cells)?;
        let history = self.plane_history(&src, &handle, face);
        Ok((handle, history))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("boolean_union")?;
        let cells_a = self.solid(a)?.cells.clone();
        let cells_b = self.solid(b)?.cells.clone();

        let mut cells = cells_a.clone();
        for tool in &cells_b {
            let mut pieces = vec![tool.clone()];
            for target in &cells_a {
                let mut next = Vec::new();
                for piece in &pieces {
                    next.extend(piece.difference(target, &mut self.next_plane));
                }
                pieces = next;
            }
            cells.extend(pieces);
        }
        self.finish(cells)
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("boolean_subtract")?;
        let cells_a = self.solid(a)?.cells.clone();
        let cells_b = self.solid(b)?.cells.clone();

        let mut cells = Vec::new();
        for target in &cells_a {
            let mut pieces = vec![target.clone()];
            for tool in &cells_b {
                let mut next = Vec::new();
                for piece in &pieces {
                    next.extend(piece.difference(tool, &mut self.next_plane));
                }
                pieces = next;
            }
            cells.extend(pieces);
        }
        if cells.iter().all(|c| c.is_empty()) {
            return Err(KernelError::BooleanFailed {
                reason: "subtraction removes the whole solid".to_string(),
            });
        }
        self.finish(cells)
    }

    fn boolean_intersect(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("boolean_intersect")?;
        let cells_a = self.solid(a)?.cells.clone();
        let cells_b = self.solid(b)?.cells.clone();

        let mut cells = Vec::new();
        for ca in &cells_a {
            for cb in &cells_b {
                let c = ca.intersection(cb);
                if !c.is_empty() {
                    cells.push(c);
                }
            }
        }
        if cells.is_empty() {
            return Err(KernelError::BooleanFailed {
                reason: "solids do not intersect".to_string(),
            });
        }
        self.finish(cells)
    }

    fn fillet_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("fillet_edges")?;
        self.blend_edges(solid, edges, radius, EdgeBlend::Fillet)
    }

    fn chamfer_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        distance: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("chamfer_edges")?;
        self.blend_edges(solid, edges, distance, EdgeBlend::Chamfer)
    }

    fn shell(
        &mut self,
        solid: &KernelSolidHandle,
        faces_to_remove: &[KernelId],
        thickness: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("shell")?;
        if thickness.is_nan() || thickness <= 0.0 {
            return Err(KernelError::ShellFailed {
                reason: "thickness must be positive".to_string(),
            });
        }
        let src = self.solid(solid)?.clone();
        if src.cells.len() != 1 {
            return Err(KernelError::not_supported("shell of a multi-lump solid"));
        }

        let mut open_planes = Vec::new();
        for face in faces_to_remove {
            let slot = self.face_in(solid, *face).map_err(|_| KernelError::ShellFailed {
                reason: format!("face {:?} not found in solid", face),
            })?;
            open_planes.push(src.topo[0].faces[slot.index].plane);
        }

        let outer = &src.cells[0];
        let mut inner_planes = Vec::new();
        for face in &src.topo[0].faces {
            if open_planes.contains(&face.plane) {
                continue;
            }
            let h = &outer.planes[face.plane];
            inner_planes.push(HalfSpace {
                id: take_id(&mut self.next_plane),
                normal: h.normal,
                offset: h.offset - thickness,
                kind: h.kind.clone(),
            });
        }
        let inner = Cell::new(inner_planes);
        if inner.intersection(outer).is_empty() {
            return Err(KernelError::ShellFailed {
                reason: "thickness leaves no cavity".to_string(),
            });
        }

        let pieces = outer.difference(&inner, &mut self.next_plane);
        self.finish(pieces)
    }

    fn transform(
        &mut self,
        solid: &KernelSolidHandle,
        transform: &Transform,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("transform")?;
        match transform {
            Transform::Scale { factor, .. } if factor.abs() < 1e-12 => {
                return Err(KernelError::invalid("scale factor is zero"));
            }
            Transform::Rotate { axis, .. } if math::normalize(*axis).is_none() => {
                return Err(KernelError::invalid("rotation axis is zero"));
            }
            Transform::Mirror { normal, .. } if math::normalize(*normal).is_none() => {
                return Err(KernelError::invalid("mirror normal is zero"));
            }
            _ => {}
        }
        let cells = self
            .solid(solid)?
            .cells
            .iter()
            .map(|c| c.transformed(transform))
            .collect();
        self.finish(cells)
    }

    fn split(
        &mut self,
        solid: &KernelSolidHandle,
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
        keep: SplitKeep,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("split")?;
        let n = math::normalize(plane_normal)
            .ok_or_else(|| KernelError::invalid("split normal is zero"))?;
        let outward = match keep {
            SplitKeep::Front => math::scale(n, -1.0),
            SplitKeep::Back => n,
        };
        let cutter = HalfSpace {
            id: take_id(&mut self.next_plane),
            normal: outward,
            offset: math::dot(outward, plane_origin),
            kind: FacetKind::Plane,
        };
        let cells: Vec<Cell> = self
            .solid(solid)?
            .cells
            .iter()
            .map(|c| c.with_plane(cutter.clone()))
            .filter(|c| !c.is_empty())
            .collect();
        if cells.is_empty() {
            return Err(KernelError::invalid(
                "split plane leaves nothing on the kept side",
            ));
        }
        self.finish(cells)
    }

    fn sweep_polygon(
        &mut self,
        profile: &[[f64; 3]],
        path: &[[f64; 3]],
    ) -> Result<KernelSolidHandle, KernelError> {
        self.begin("sweep_polygon")?;
        match path.len() {
            0 | 1 => return Err(KernelError::invalid("sweep path needs two points")),
            2 => {}
            _ => return Err(KernelError::not_supported("sweep along a multi-segment path")),
        }
        let sweep = math::sub(path[1], path[0]);
        let cell =
            halfspace::prism_cell(profile, sweep, &mut self.next_plane, FacetKind::Plane)?;
        self.finish(vec![cell])
    }

    fn loft(&mut self, sections: &[Vec<[f64; 3]>]) -> Result<KernelSolidHandle, KernelError> {
        self.begin("loft")?;
        if sections.len() < 2 {
            return Err(KernelError::invalid("loft needs at least two sections"));
        }
        let count = sections[0].len();
        if count < 3 || sections.iter().any(|s| s.len() != count) {
            return Err(KernelError::invalid(
                "loft sections must have matching vertex counts of at least 3",
            ));
        }
        let points: Vec<Vec3> = sections.iter().flatten().copied().collect();
        let cell = halfspace::hull_cell(&points, &mut self.next_plane)
            .ok_or_else(|| KernelError::invalid("loft sections are coplanar"))?;
        self.finish(vec![cell])
    }

    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        _tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        if self.faults.primary_tessellation {
            return Err(KernelError::TessellationFailed {
                reason: "per-face tessellation disabled".to_string(),
            });
        }
        let s = self.solid(solid)?;
        Ok(self.build_mesh(s, false))
    }

    fn tessellate_merged(
        &mut self,
        solid: &KernelSolidHandle,
        _tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        let s = self.solid(solid)?;
        Ok(self.build_mesh(s, true))
    }
}

impl KernelIntrospect for MockKernel {
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.solids
            .get(&solid.id())
            .map(|s| s.faces.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.solids
            .get(&solid.id())
            .map(|s| s.edges.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.solids
            .get(&solid.id())
            .map(|s| s.vertices.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default()
    }

    fn face_edges(&self, face: KernelId) -> Vec<KernelId> {
        let Ok((s, _, slot)) = self.face_lookup(face) else {
            return Vec::new();
        };
        s.topo[slot.cell]
            .face_edge_indices(slot.index)
            .into_iter()
            .filter_map(|ei| s.edge_id(slot.cell, ei))
            .collect()
    }

    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId> {
        let Ok((s, _, slot)) = self.edge_lookup(edge) else {
            return Vec::new();
        };
        let e = &s.topo[slot.cell].edges[slot.index];
        [e.faces.0, e.faces.1]
            .iter()
            .filter_map(|fi| s.face_id(slot.cell, *fi))
            .collect()
    }

    fn face_geometry(&self, face: KernelId) -> Result<FaceGeometry, KernelError> {
        let (s, _, slot) = self.face_lookup(face)?;
        let topo = &s.topo[slot.cell];
        let f = &topo.faces[slot.index];
        let plane = &s.cells[slot.cell].planes[f.plane];
        let points: Vec<Vec3> = f.boundary.iter().map(|&vi| topo.vertices[vi]).collect();
        let bbox = BoundingBox::from_points(points.iter())
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let (surface, normal) = match &plane.kind {
            FacetKind::Plane => (
                SurfaceGeometry::Plane {
                    normal: plane.normal,
                },
                Some(plane.normal),
            ),
            FacetKind::Cylinder { radius, axis } => (
                SurfaceGeometry::Cylinder {
                    radius: *radius,
                    axis: *axis,
                },
                None,
            ),
        };
        Ok(FaceGeometry {
            surface,
            area: f.area,
            center: f.center,
            bbox,
            normal,
        })
    }

    fn edge_geometry(&self, edge: KernelId) -> Result<EdgeGeometry, KernelError> {
        let (s, _, slot) = self.edge_lookup(edge)?;
        let topo = &s.topo[slot.cell];
        let e = &topo.edges[slot.index];
        let a = topo.vertices[e.vertices.0];
        let b = topo.vertices[e.vertices.1];
        let bbox = BoundingBox::from_points([a, b].iter())
            .ok_or(KernelError::EntityNotFound { id: edge })?;
        let direction = math::normalize(math::sub(b, a)).map(math::canonical_direction);
        Ok(EdgeGeometry {
            curve: CurveGeometry::Line,
            length: math::distance(a, b),
            midpoint: math::scale(math::add(a, b), 0.5),
            bbox,
            direction,
        })
    }

    fn mass_properties(&self, solid: &KernelSolidHandle) -> Result<MassProperties, KernelError> {
        let s = self.solid(solid)?;
        let mut volume = 0.0;
        let mut area = 0.0;
        let mut weighted = [0.0; 3];
        for t in &s.topo {
            volume += t.volume;
            area += t.area();
            weighted = math::add(weighted, math::scale(t.centroid, t.volume));
        }
        let center_of_mass = if volume.abs() > VOLUME_EPS {
            math::scale(weighted, 1.0 / volume)
        } else {
            s.topo.first().map(|t| t.centroid).unwrap_or([0.0; 3])
        };
        Ok(MassProperties {
            volume,
            area,
            center_of_mass,
        })
    }

    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<BoundingBox, KernelError> {
        let s = self.solid(solid)?;
        BoundingBox::from_points(s.topo.iter().flat_map(|t| t.vertices.iter())).ok_or(
            KernelError::InvalidGeometry {
                reason: "solid has no vertices".to_string(),
            },
        )
    }

    fn validate(&self, solid: &KernelSolidHandle) -> Result<(), KernelError> {
        let s = self.solid(solid)?;
        for (ci, t) in s.topo.iter().enumerate() {
            if t.volume <= VOLUME_EPS {
                return Err(KernelError::invalid(format!("lump {} has zero volume", ci)));
            }
            if t.faces.len() < 4 {
                return Err(KernelError::invalid(format!("lump {} is not closed", ci)));
            }
            let euler = t.vertices.len() as i64 - t.edges.len() as i64 + t.faces.len() as i64;
            if euler != 2 {
                return Err(KernelError::invalid(format!(
                    "lump {} is non-manifold (V - E + F = {})",
                    ci, euler
                )));
            }
        }
        for i in 0..s.cells.len() {
            for j in (i + 1)..s.cells.len() {
                if s.cells[i].overlaps(&s.cells[j]) {
                    return Err(KernelError::invalid(format!(
                        "lumps {} and {} overlap",
                        i, j
                    )));
                }
            }
        }
        Ok(())
    }

    fn feature_edges(
        &self,
        solid: &KernelSolidHandle,
        angle_threshold_deg: f64,
    ) -> Result<EdgeRenderData, KernelError> {
        if self.faults.brep_edges {
            return Err(KernelError::Other {
                message: "B-Rep edge extraction disabled".to_string(),
            });
        }
        let s = self.solid(solid)?;
        let mut data = EdgeRenderData::default();
        for (edge_id, slot) in &s.edges {
            let topo = &s.topo[slot.cell];
            let planes = &s.cells[slot.cell].planes;
            let e = &topo.edges[slot.index];
            let ha = &planes[topo.faces[e.faces.0].plane];
            let hb = &planes[topo.faces[e.faces.1].plane];

            // Facets of one cylinder meet along seams, not feature edges.
            if let (
                FacetKind::Cylinder { radius: ra, axis: aa },
                FacetKind::Cylinder { radius: rb, axis: ab },
            ) = (&ha.kind, &hb.kind)
            {
                if (ra - rb).abs() < 1e-9 && math::dot(*aa, *ab).abs() > 1.0 - 1e-9 {
                    continue;
                }
            }

            let cos = math::dot(ha.normal, hb.normal).clamp(-1.0, 1.0);
            if cos.acos().to_degrees() <= angle_threshold_deg {
                continue;
            }

            let start_vertex = (data.vertices.len() / 3) as u32;
            for vi in [e.vertices.0, e.vertices.1] {
                data.vertices
                    .extend(topo.vertices[vi].iter().map(|c| *c as f32));
            }
            data.edge_ranges.push(EdgeRange {
                edge_id: *edge_id,
                start_vertex,
                end_vertex: start_vertex + 2,
            });
        }
        Ok(data)
    }
}
