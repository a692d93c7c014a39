use serde::{Deserialize, Serialize};

pub use tnp_types::{BoundingBox, SurfaceType, Transform};

/// Opaque handle to a solid in the geometry kernel.
/// NEVER persisted. Valid only for the current kernel session.
///
/// Kernels never mutate a stored solid: every operation returns a new
/// handle, so holding on to an old handle is enough to roll back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelSolidHandle(pub(crate) u64);

impl KernelSolidHandle {
    pub(crate) fn id(&self) -> u64 {
        self.0
    }

    /// Numeric form for logging and cache bookkeeping.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Transient kernel-internal entity identifier.
/// Stable within a single kernel session but NOT across rebuilds.
/// NEVER persisted; persistent references go through geometry hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId(pub u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("fillet failed: {reason}")]
    FilletFailed { reason: String },

    #[error("chamfer failed: {reason}")]
    ChamferFailed { reason: String },

    #[error("shell failed: {reason}")]
    ShellFailed { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: KernelId },

    #[error("solid not found: {handle}")]
    SolidNotFound { handle: u64 },

    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

impl KernelError {
    pub(crate) fn not_supported(operation: &str) -> Self {
        KernelError::NotSupported {
            operation: operation.to_string(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        KernelError::InvalidGeometry {
            reason: reason.into(),
        }
    }
}

/// Underlying surface of a face, with the type-specific parameters that
/// participate in the face hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SurfaceGeometry {
    Plane { normal: [f64; 3] },
    Cylinder { radius: f64, axis: [f64; 3] },
    Cone { semi_angle: f64 },
    Sphere { radius: f64 },
    Torus { major_radius: f64, minor_radius: f64 },
    Bspline,
    Other,
}

impl SurfaceGeometry {
    pub fn surface_type(&self) -> SurfaceType {
        match self {
            SurfaceGeometry::Plane { .. } => SurfaceType::Plane,
            SurfaceGeometry::Cylinder { .. } => SurfaceType::Cylinder,
            SurfaceGeometry::Cone { .. } => SurfaceType::Cone,
            SurfaceGeometry::Sphere { .. } => SurfaceType::Sphere,
            SurfaceGeometry::Torus { .. } => SurfaceType::Torus,
            SurfaceGeometry::Bspline => SurfaceType::Bspline,
            SurfaceGeometry::Other => SurfaceType::Other,
        }
    }
}

/// Mass properties and placement of a single face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceGeometry {
    pub surface: SurfaceGeometry,
    pub area: f64,
    /// Center of mass of the face (area-weighted).
    pub center: [f64; 3],
    pub bbox: BoundingBox,
    /// Outward unit normal for planar faces.
    pub normal: Option<[f64; 3]>,
}

/// Underlying curve of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CurveGeometry {
    Line,
    Circle { radius: f64, axis: [f64; 3] },
    Other,
}

impl CurveGeometry {
    pub fn surface_type(&self) -> SurfaceType {
        match self {
            CurveGeometry::Line => SurfaceType::Line,
            CurveGeometry::Circle { .. } => SurfaceType::Circle,
            CurveGeometry::Other => SurfaceType::Other,
        }
    }
}

/// Length and placement of a single edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeGeometry {
    pub curve: CurveGeometry,
    pub length: f64,
    pub midpoint: [f64; 3],
    pub bbox: BoundingBox,
    /// Sign-normalized unit direction for straight edges.
    pub direction: Option<[f64; 3]>,
}

/// Whole-solid mass properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub volume: f64,
    pub area: f64,
    pub center_of_mass: [f64; 3],
}

/// Kernel-reported lineage from one solid to the next.
///
/// Every list maps entities of the input solid to entities of the output
/// solid. Entities that survive unchanged appear under `modified` too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeHistory {
    pub modified: Vec<(KernelId, Vec<KernelId>)>,
    pub generated: Vec<(KernelId, Vec<KernelId>)>,
    pub deleted: Vec<KernelId>,
}

impl ShapeHistory {
    /// All output entities descending from `id`, modified first.
    pub fn successors_of(&self, id: KernelId) -> Vec<KernelId> {
        let mut out = Vec::new();
        for (from, to) in self.modified.iter().chain(self.generated.iter()) {
            if *from == id {
                out.extend(to.iter().copied());
            }
        }
        out
    }

    pub fn is_deleted(&self, id: KernelId) -> bool {
        self.deleted.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.generated.is_empty() && self.deleted.is_empty()
    }
}

/// Which side of a splitting plane to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitKeep {
    /// The side the plane normal points into.
    Front,
    Back,
}

/// Tessellated triangle mesh for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderMesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Flat array of vertex normals [nx0, ny0, nz0, nx1, ny1, nz1, ...].
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
    /// Mapping from triangle ranges to logical faces.
    pub face_ranges: Vec<FaceRange>,
}

impl RenderMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Maps a contiguous range of triangles to a logical face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRange {
    /// The KernelId of the face this range belongs to.
    pub face_id: KernelId,
    /// Start index in the indices array (inclusive).
    pub start_index: u32,
    /// End index in the indices array (exclusive).
    pub end_index: u32,
}

/// Feature-edge polylines for rendering edge overlays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeRenderData {
    /// Flat array of edge vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Mapping from vertex ranges to logical edges.
    pub edge_ranges: Vec<EdgeRange>,
}

/// Maps a contiguous run of polyline vertices to a logical edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRange {
    /// The KernelId of the edge this range belongs to. Mesh-derived
    /// edges have no kernel identity and carry `KernelId(0)`.
    pub edge_id: KernelId,
    /// First vertex (inclusive), counted in vertices, not floats.
    pub start_vertex: u32,
    /// Last vertex (exclusive).
    pub end_vertex: u32,
}

impl Serialize for KernelId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KernelId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(KernelId)
    }
}
