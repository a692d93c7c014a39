use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brep_kernel::SplitKeep;
use modeling_ops::{BooleanKind, OpError, PatternSpec};
use shape_naming::{NamingError, OperationType, ShapeReference};
use tnp_types::{status_codes, FeatureStatus, StatusDetails, Transform};

use crate::resolve::ResolutionStats;

/// A single feature in a body's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub status: FeatureStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub status_details: Option<StatusDetails>,
    pub kind: FeatureKind,
    /// How this feature's references resolved on its last application.
    #[serde(skip)]
    pub resolution: ResolutionStats,
}

impl Feature {
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: FeatureStatus::Ok,
            status_message: None,
            status_details: None,
            kind,
            resolution: ResolutionStats::default(),
        }
    }

    pub(crate) fn mark_ok(&mut self) {
        self.status = FeatureStatus::Ok;
        self.status_message = None;
        self.status_details = None;
    }

    pub(crate) fn mark_error(&mut self, code: &str, message: String) {
        self.status = FeatureStatus::Error;
        self.status_details = Some(StatusDetails::new(code, message.clone()));
        self.status_message = Some(message);
    }
}

/// Parameters and references of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeatureKind {
    Primitive {
        shape: PrimitiveShape,
        #[serde(default)]
        mode: CombineMode,
    },
    Extrude {
        profile: Vec<[f64; 3]>,
        direction: [f64; 3],
        depth: f64,
        #[serde(default)]
        mode: CombineMode,
    },
    PushPull {
        face: ShapeReference,
        /// Face index at selection time, the last-resort fallback.
        #[serde(default)]
        face_index: Option<usize>,
        distance: f64,
    },
    Fillet {
        edges: Vec<ShapeReference>,
        #[serde(default)]
        edge_indices: Vec<usize>,
        radius: f64,
    },
    Chamfer {
        edges: Vec<ShapeReference>,
        #[serde(default)]
        edge_indices: Vec<usize>,
        distance: f64,
    },
    Shell {
        opening_faces: Vec<ShapeReference>,
        #[serde(default)]
        face_indices: Vec<usize>,
        thickness: f64,
    },
    Transform {
        transform: Transform,
    },
    Split {
        plane_origin: [f64; 3],
        plane_normal: [f64; 3],
        keep: SplitKeep,
    },
    Pattern {
        pattern: PatternSpec,
    },
    Sweep {
        profile: Vec<[f64; 3]>,
        path: Vec<[f64; 3]>,
        #[serde(default)]
        mode: CombineMode,
    },
    Loft {
        sections: Vec<Vec<[f64; 3]>>,
        #[serde(default)]
        mode: CombineMode,
    },
}

impl FeatureKind {
    /// Name used in health reports and operation metadata.
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureKind::Primitive { .. } => "Primitive",
            FeatureKind::Extrude { .. } => "Extrude",
            FeatureKind::PushPull { .. } => "PushPull",
            FeatureKind::Fillet { .. } => "Fillet",
            FeatureKind::Chamfer { .. } => "Chamfer",
            FeatureKind::Shell { .. } => "Shell",
            FeatureKind::Transform { .. } => "Transform",
            FeatureKind::Split { .. } => "Split",
            FeatureKind::Pattern { .. } => "Pattern",
            FeatureKind::Sweep { .. } => "Sweep",
            FeatureKind::Loft { .. } => "Loft",
        }
    }

    /// Fillet and chamfer only touch the neighborhood of their edges.
    pub fn local_modifier_magnitude(&self) -> Option<f64> {
        match self {
            FeatureKind::Fillet { radius, .. } => Some(*radius),
            FeatureKind::Chamfer { distance, .. } => Some(*distance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PrimitiveShape {
    Box {
        corner: [f64; 3],
        size: [f64; 3],
    },
    Cylinder {
        base: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    },
}

/// How a newly built tool solid joins the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineMode {
    #[default]
    Join,
    Cut,
    Intersect,
}

impl CombineMode {
    pub fn boolean_kind(self) -> BooleanKind {
        match self {
            CombineMode::Join => BooleanKind::Union,
            CombineMode::Cut => BooleanKind::Subtract,
            CombineMode::Intersect => BooleanKind::Intersect,
        }
    }

    pub fn operation_type(self) -> OperationType {
        match self {
            CombineMode::Join => OperationType::BooleanFuse,
            CombineMode::Cut => OperationType::BooleanCut,
            CombineMode::Intersect => OperationType::BooleanCommon,
        }
    }
}

/// Why a single feature application failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FeatureError {
    #[error("could not resolve {what}")]
    ReferenceUnresolved { what: String },

    #[error(transparent)]
    Op(#[from] OpError),

    #[error("{feature_type} needs an existing solid")]
    NoSolid { feature_type: &'static str },

    #[error("{reason}")]
    Regression { code: &'static str, reason: String },

    #[error("shape registration failed: {0}")]
    Naming(#[from] NamingError),
}

impl FeatureError {
    /// The `StatusDetails::code` this failure is reported under.
    pub fn code(&self) -> &'static str {
        match self {
            FeatureError::ReferenceUnresolved { .. } => status_codes::REFERENCE_UNRESOLVED,
            FeatureError::Op(OpError::Kernel(_)) | FeatureError::Naming(_) => {
                status_codes::KERNEL_OPERATION_FAILED
            }
            FeatureError::Op(_) | FeatureError::NoSolid { .. } => status_codes::INVALID_PARAMETER,
            FeatureError::Regression { code, .. } => *code,
        }
    }

    pub fn is_drift(&self) -> bool {
        status_codes::DRIFT_CODES.contains(&self.code())
    }
}

/// Errors from document-level operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("feature not found: {id}")]
    FeatureNotFound { id: Uuid },

    #[error("body not found: {id}")]
    BodyNotFound { id: Uuid },

    #[error("body {id} has no features")]
    EmptyBody { id: Uuid },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    /// The feature was not added; it is returned marked `Error`.
    #[error("feature '{}' failed: {source}", .feature.name)]
    FeatureFailed {
        feature: Box<Feature>,
        #[source]
        source: FeatureError,
    },

    #[error("edit of '{name}' rolled back: {reason}")]
    EditRolledBack { name: String, reason: String },

    #[error(transparent)]
    Feature(#[from] FeatureError),
}
