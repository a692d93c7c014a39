//! Dispatch from a feature's parameters to the modeling operation that
//! realizes it.

use std::collections::BTreeMap;

use brep_kernel::{KernelId, KernelSolidHandle};
use modeling_ops::{
    execute_box, execute_chamfer, execute_combine, execute_cylinder, execute_extrude,
    execute_fillet, execute_loft, execute_pattern, execute_push_pull, execute_shell,
    execute_split, execute_sweep, execute_transform, KernelBundle, OpResult,
};
use shape_naming::{OperationType, ShapeReference, ShapeRegistry};
use tnp_types::FeatureStatus;
use uuid::Uuid;

use crate::resolve::{resolve_selection, ResolutionStats};
use crate::types::{CombineMode, Feature, FeatureError, FeatureKind, PrimitiveShape};

/// Everything a feature needs to run against a body.
pub struct ApplyContext<'a> {
    pub kb: &'a mut dyn KernelBundle,
    pub registry: &'a ShapeRegistry,
    /// The body's solid before this feature, if it has one yet.
    pub solid: Option<KernelSolidHandle>,
    pub stats: ResolutionStats,
}

impl<'a> ApplyContext<'a> {
    pub fn new(
        kb: &'a mut dyn KernelBundle,
        registry: &'a ShapeRegistry,
        solid: Option<KernelSolidHandle>,
    ) -> Self {
        Self {
            kb,
            registry,
            solid,
            stats: ResolutionStats::default(),
        }
    }

    fn require_solid(&self, feature_type: &'static str) -> Result<KernelSolidHandle, FeatureError> {
        self.solid
            .clone()
            .ok_or(FeatureError::NoSolid { feature_type })
    }

    fn resolve(
        &mut self,
        solid: &KernelSolidHandle,
        references: &[ShapeReference],
        indices: &[usize],
    ) -> Result<Vec<KernelId>, FeatureError> {
        resolve_selection(
            self.kb.as_introspect(),
            self.registry,
            solid,
            references,
            indices,
            &mut self.stats,
        )
    }

    fn combine(
        &mut self,
        tool: OpResult,
        mode: CombineMode,
        own_type: OperationType,
    ) -> Result<Applied, FeatureError> {
        let operation_type = match self.solid {
            Some(_) => mode.operation_type(),
            None => own_type,
        };
        let result = execute_combine(self.kb, self.solid.as_ref(), tool, mode.boolean_kind())?;
        Ok(Applied::new(result, operation_type))
    }
}

/// Output of a successful feature run, before health checks.
#[derive(Debug, Clone)]
pub struct Applied {
    pub result: OpResult,
    pub operation_type: OperationType,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Applied {
    fn new(result: OpResult, operation_type: OperationType) -> Self {
        Self {
            result,
            operation_type,
            metadata: BTreeMap::new(),
        }
    }
}

pub trait ModelingFeature {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn status(&self) -> FeatureStatus;
    /// Run the feature against the context's solid. Leaves the registry
    /// and the input solid untouched.
    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<Applied, FeatureError>;
}

impl ModelingFeature for Feature {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> FeatureStatus {
        self.status
    }

    fn apply(&self, ctx: &mut ApplyContext<'_>) -> Result<Applied, FeatureError> {
        let mut applied = match &self.kind {
            FeatureKind::Primitive { shape, mode } => {
                let tool = match shape {
                    PrimitiveShape::Box { corner, size } => execute_box(ctx.kb, *corner, *size)?,
                    PrimitiveShape::Cylinder {
                        base,
                        axis,
                        radius,
                        height,
                    } => execute_cylinder(ctx.kb, *base, *axis, *radius, *height)?,
                };
                ctx.combine(tool, *mode, OperationType::Primitive)?
            }
            FeatureKind::Extrude {
                profile,
                direction,
                depth,
                mode,
            } => {
                let tool = execute_extrude(ctx.kb, profile, *direction, *depth)?;
                ctx.combine(tool, *mode, OperationType::Extrude)?
            }
            FeatureKind::PushPull {
                face,
                face_index,
                distance,
            } => {
                let solid = ctx.require_solid("push/pull")?;
                let indices: Vec<usize> = face_index.iter().copied().collect();
                let target = ctx.resolve(&solid, std::slice::from_ref(face), &indices)?;
                let result = execute_push_pull(ctx.kb, &solid, target[0], *distance)?;
                Applied::new(result, OperationType::BrepfeatPrism)
            }
            FeatureKind::Fillet {
                edges,
                edge_indices,
                radius,
            } => {
                let solid = ctx.require_solid("fillet")?;
                let ids = ctx.resolve(&solid, edges, edge_indices)?;
                Applied::new(execute_fillet(ctx.kb, &solid, &ids, *radius)?, OperationType::Fillet)
            }
            FeatureKind::Chamfer {
                edges,
                edge_indices,
                distance,
            } => {
                let solid = ctx.require_solid("chamfer")?;
                let ids = ctx.resolve(&solid, edges, edge_indices)?;
                Applied::new(
                    execute_chamfer(ctx.kb, &solid, &ids, *distance)?,
                    OperationType::Chamfer,
                )
            }
            FeatureKind::Shell {
                opening_faces,
                face_indices,
                thickness,
            } => {
                let solid = ctx.require_solid("shell")?;
                let ids = ctx.resolve(&solid, opening_faces, face_indices)?;
                Applied::new(execute_shell(ctx.kb, &solid, &ids, *thickness)?, OperationType::Shell)
            }
            FeatureKind::Transform { transform } => {
                let solid = ctx.require_solid("transform")?;
                Applied::new(
                    execute_transform(ctx.kb, &solid, transform)?,
                    OperationType::Transform,
                )
            }
            FeatureKind::Split {
                plane_origin,
                plane_normal,
                keep,
            } => {
                let solid = ctx.require_solid("split")?;
                Applied::new(
                    execute_split(ctx.kb, &solid, *plane_origin, *plane_normal, *keep)?,
                    OperationType::Split,
                )
            }
            FeatureKind::Pattern { pattern } => {
                let solid = ctx.require_solid("pattern")?;
                Applied::new(execute_pattern(ctx.kb, &solid, pattern)?, OperationType::Pattern)
            }
            FeatureKind::Sweep {
                profile,
                path,
                mode,
            } => {
                let tool = execute_sweep(ctx.kb, profile, path)?;
                ctx.combine(tool, *mode, OperationType::Sweep)?
            }
            FeatureKind::Loft { sections, mode } => {
                let tool = execute_loft(ctx.kb, sections)?;
                ctx.combine(tool, *mode, OperationType::Loft)?
            }
        };

        applied.metadata.insert(
            "feature_type".to_string(),
            self.kind.type_name().into(),
        );
        applied.metadata.insert("feature_name".to_string(), self.name.clone().into());
        applied.metadata.insert(
            "kernel_time_ms".to_string(),
            applied.result.diagnostics.kernel_time_ms.into(),
        );
        Ok(applied)
    }
}
