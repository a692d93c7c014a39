use crate::types::*;

/// Core geometry kernel trait. Provides all shape construction and modification operations.
/// Implemented by TruckKernel (wraps real truck) and MockKernel (deterministic test double).
///
/// Every operation leaves its inputs untouched and returns a fresh solid.
pub trait Kernel {
    /// Axis-aligned box with one corner at `corner`.
    fn make_box(
        &mut self,
        corner: [f64; 3],
        size: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Right circular cylinder standing on `base_center`, extending along `axis`.
    fn make_cylinder(
        &mut self,
        base_center: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Extrude a closed planar polygon along a direction vector.
    fn extrude_polygon(
        &mut self,
        profile: &[[f64; 3]],
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Offset a face along its outward normal (negative moves it inward),
    /// dragging the adjacent faces along. Reports the kernel's own lineage map.
    fn push_pull_face(
        &mut self,
        solid: &KernelSolidHandle,
        face: KernelId,
        distance: f64,
    ) -> Result<(KernelSolidHandle, ShapeHistory), KernelError>;

    /// Boolean union of two solids.
    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean subtraction: a minus b.
    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean intersection of two solids.
    fn boolean_intersect(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Fillet (round) the specified edges with the given radius.
    fn fillet_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Chamfer (bevel) the specified edges with the given distance.
    fn chamfer_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        distance: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Shell a solid by removing faces and offsetting remaining faces inward.
    fn shell(
        &mut self,
        solid: &KernelSolidHandle,
        faces_to_remove: &[KernelId],
        thickness: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Apply a rigid or similarity transform.
    fn transform(
        &mut self,
        solid: &KernelSolidHandle,
        transform: &Transform,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Cut a solid with a plane and keep one side.
    fn split(
        &mut self,
        solid: &KernelSolidHandle,
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
        keep: SplitKeep,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Sweep a closed planar polygon along a polyline path.
    fn sweep_polygon(
        &mut self,
        profile: &[[f64; 3]],
        path: &[[f64; 3]],
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Loft through closed sections with matching vertex counts.
    fn loft(&mut self, sections: &[Vec<[f64; 3]>]) -> Result<KernelSolidHandle, KernelError>;

    /// Tessellate a solid to a triangle mesh with one range per face.
    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<RenderMesh, KernelError>;

    /// Fallback tessellation: the whole solid as a single merged range.
    fn tessellate_merged(
        &mut self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<RenderMesh, KernelError>;
}

/// Topology introspection trait. Provides read-only queries on kernel geometry.
pub trait KernelIntrospect {
    /// List all faces of a solid, in the kernel's native iteration order.
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId>;

    /// List all edges of a solid, in the kernel's native iteration order.
    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId>;

    /// List all vertices of a solid.
    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId>;

    /// Get the edges bounding a face, in loop order.
    fn face_edges(&self, face: KernelId) -> Vec<KernelId>;

    /// Get the faces adjacent to an edge.
    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId>;

    /// Surface classification and mass properties of a face.
    fn face_geometry(&self, face: KernelId) -> Result<FaceGeometry, KernelError>;

    /// Curve classification and placement of an edge.
    fn edge_geometry(&self, edge: KernelId) -> Result<EdgeGeometry, KernelError>;

    /// Volume, surface area and center of mass of a solid.
    fn mass_properties(&self, solid: &KernelSolidHandle) -> Result<MassProperties, KernelError>;

    /// Axis-aligned bounding box of a solid.
    fn bounding_box(&self, solid: &KernelSolidHandle) -> Result<BoundingBox, KernelError>;

    /// Check a solid for zero volume, open or non-manifold shells and
    /// self-overlap. `Err` carries the first problem found.
    fn validate(&self, solid: &KernelSolidHandle) -> Result<(), KernelError>;

    /// True B-Rep feature edges: boundary edges plus edges whose adjacent
    /// face normals differ by more than `angle_threshold_deg`. Seams of
    /// smooth surfaces are left out.
    fn feature_edges(
        &self,
        solid: &KernelSolidHandle,
        angle_threshold_deg: f64,
    ) -> Result<EdgeRenderData, KernelError>;

    fn is_valid(&self, solid: &KernelSolidHandle) -> bool {
        self.validate(solid).is_ok()
    }
}
