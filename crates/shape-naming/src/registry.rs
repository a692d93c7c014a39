//! The shape registry: which feature produced which faces and edges, and
//! how shapes descend from one another across operations.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use brep_kernel::{KernelId, KernelIntrospect, KernelSolidHandle, ShapeHistory};
use serde::{Deserialize, Serialize};
use tnp_types::ShapeType;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ResolveConfig;
use crate::error::NamingError;
use crate::reference::ShapeReference;

static NEXT_SESSION: AtomicU32 = AtomicU32::new(1);

/// Registry-assigned shape identity. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShapeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Primitive,
    Extrude,
    BrepfeatPrism,
    BooleanFuse,
    BooleanCut,
    BooleanCommon,
    Fillet,
    Chamfer,
    Shell,
    Transform,
    Split,
    Pattern,
    Sweep,
    Loft,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Primitive => "PRIMITIVE",
            OperationType::Extrude => "EXTRUDE",
            OperationType::BrepfeatPrism => "BREPFEAT_PRISM",
            OperationType::BooleanFuse => "BOOLEAN_FUSE",
            OperationType::BooleanCut => "BOOLEAN_CUT",
            OperationType::BooleanCommon => "BOOLEAN_COMMON",
            OperationType::Fillet => "FILLET",
            OperationType::Chamfer => "CHAMFER",
            OperationType::Shell => "SHELL",
            OperationType::Transform => "TRANSFORM",
            OperationType::Split => "SPLIT",
            OperationType::Pattern => "PATTERN",
            OperationType::Sweep => "SWEEP",
            OperationType::Loft => "LOFT",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    pub shape_type: ShapeType,
    pub owning_feature_id: Uuid,
    pub local_index_at_registration: usize,
    pub geometry: ShapeReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationRecord {
    pub operation_type: OperationType,
    pub feature_id: Uuid,
    pub predecessor_shape_ids: Vec<ShapeId>,
    pub successor_shape_ids: Vec<ShapeId>,
    pub kernel_history: Option<ShapeHistory>,
    /// Predecessor shape to the successor shapes it became.
    pub lineage: Vec<(ShapeId, Vec<ShapeId>)>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Everything [`ShapeRegistry::record_operation`] needs to know about one
/// kernel operation.
#[derive(Debug, Clone)]
pub struct OperationInput {
    pub operation_type: OperationType,
    pub feature_id: Uuid,
    /// Entities of the input solid and the shapes they are registered as.
    pub predecessors: Vec<(KernelId, ShapeId)>,
    /// Entities of the output solid and the shapes they are registered as.
    pub successors: Vec<(KernelId, ShapeId)>,
    /// Lineage as reported by the kernel, if it reports any.
    pub kernel_history: Option<ShapeHistory>,
    /// Lineage recovered by topology diff; used when the kernel has none.
    pub derived_history: ShapeHistory,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Opaque saved state for transaction rollback.
#[derive(Debug, Clone)]
pub struct RegistryCheckpoint {
    shapes: BTreeMap<ShapeId, ShapeRecord>,
    operations: Vec<OperationRecord>,
    next_id: u64,
}

#[derive(Debug, Clone)]
pub struct ShapeRegistry {
    config: ResolveConfig,
    session_id: u32,
    next_id: u64,
    shapes: BTreeMap<ShapeId, ShapeRecord>,
    operations: Vec<OperationRecord>,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new(ResolveConfig::default())
    }
}

impl ShapeRegistry {
    pub fn new(config: ResolveConfig) -> Self {
        Self {
            config,
            session_id: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            next_id: 1,
            shapes: BTreeMap::new(),
            operations: Vec::new(),
        }
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn get(&self, id: ShapeId) -> Option<&ShapeRecord> {
        self.shapes.get(&id)
    }

    pub fn operations(&self) -> &[OperationRecord] {
        &self.operations
    }

    pub fn shapes_of_feature(&self, feature_id: Uuid) -> Vec<ShapeId> {
        self.shapes
            .iter()
            .filter(|(_, r)| r.owning_feature_id == feature_id)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Register one face or edge under a feature. Registering the same
    /// geometry twice for the same feature returns the existing id.
    pub fn register_shape(
        &mut self,
        introspect: &dyn KernelIntrospect,
        shape: KernelId,
        shape_type: ShapeType,
        feature_id: Uuid,
        local_index: usize,
    ) -> Result<ShapeId, NamingError> {
        let geometry = ShapeReference::from_entity(introspect, shape, shape_type)?;
        Ok(self.insert(geometry, feature_id, local_index))
    }

    /// Register every face, then every edge, of `solid`. Nothing is
    /// inserted unless every entity could be described.
    #[instrument(skip(self, introspect))]
    pub fn register_solid(
        &mut self,
        introspect: &dyn KernelIntrospect,
        solid: &KernelSolidHandle,
        feature_id: Uuid,
    ) -> Result<Vec<(KernelId, ShapeId)>, NamingError> {
        let mut pending = Vec::new();
        for (index, face) in introspect.list_faces(solid).into_iter().enumerate() {
            pending.push((face, index, ShapeReference::from_face(introspect, face)?));
        }
        for (index, edge) in introspect.list_edges(solid).into_iter().enumerate() {
            pending.push((edge, index, ShapeReference::from_edge(introspect, edge)?));
        }

        let before = self.shapes.len();
        let registered: Vec<(KernelId, ShapeId)> = pending
            .into_iter()
            .map(|(kernel_id, index, geometry)| (kernel_id, self.insert(geometry, feature_id, index)))
            .collect();
        debug!(
            entities = registered.len(),
            new_shapes = self.shapes.len() - before,
            "registered solid"
        );
        Ok(registered)
    }

    fn insert(&mut self, geometry: ShapeReference, feature_id: Uuid, local_index: usize) -> ShapeId {
        let tolerance = self.config.identity_tolerance;
        if let Some((id, _)) = self.shapes.iter().find(|(_, r)| {
            r.owning_feature_id == feature_id && r.geometry.same_geometry(&geometry, tolerance)
        }) {
            return *id;
        }
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.shapes.insert(
            id,
            ShapeRecord {
                shape_type: geometry.shape_type,
                owning_feature_id: feature_id,
                local_index_at_registration: local_index,
                geometry: geometry.with_session(self.session_id),
            },
        );
        id
    }

    /// Registered face matching `face`'s hash, newest registration first.
    /// Without `require_exact` the most similar registered face above the
    /// threshold is accepted too.
    pub fn find_shape_id_by_face(
        &self,
        introspect: &dyn KernelIntrospect,
        face: KernelId,
        require_exact: bool,
    ) -> Option<ShapeId> {
        let reference = ShapeReference::from_face(introspect, face).ok()?;
        let faces = || {
            self.shapes
                .iter()
                .rev()
                .filter(|(_, r)| r.shape_type == ShapeType::Face)
        };
        if let Some((id, _)) = faces().find(|(_, r)| r.geometry.geometry_hash.matches(&reference.geometry_hash)) {
            return Some(*id);
        }
        if require_exact {
            return None;
        }
        reference
            .best_match(faces().map(|(id, r)| (*id, &r.geometry)), &self.config)
            .map(|(id, _)| id)
    }

    /// Drop every shape and operation the feature owns. Returns the number
    /// of shapes removed.
    pub fn invalidate_feature(&mut self, feature_id: Uuid) -> usize {
        let before = self.shapes.len();
        self.shapes.retain(|_, r| r.owning_feature_id != feature_id);
        self.operations.retain(|op| op.feature_id != feature_id);
        let removed = before - self.shapes.len();
        if removed > 0 {
            debug!(%feature_id, removed, "invalidated feature shapes");
        }
        removed
    }

    /// Record an operation. A record with the same feature and operation
    /// type is replaced, so replaying a feature does not duplicate it.
    pub fn record_operation(&mut self, input: OperationInput) {
        let history = input.kernel_history.as_ref().unwrap_or(&input.derived_history);
        let lineage = lineage_from(history, &input.predecessors, &input.successors);

        let record = OperationRecord {
            operation_type: input.operation_type,
            feature_id: input.feature_id,
            predecessor_shape_ids: input.predecessors.iter().map(|(_, s)| *s).collect(),
            successor_shape_ids: input.successors.iter().map(|(_, s)| *s).collect(),
            lineage,
            kernel_history: input.kernel_history,
            metadata: input.metadata,
        };

        match self.operations.iter_mut().find(|op| {
            op.feature_id == record.feature_id && op.operation_type == record.operation_type
        }) {
            Some(existing) => *existing = record,
            None => self.operations.push(record),
        }
    }

    /// Find a registered shape in `solid`: its own reference first, then
    /// the newest shapes it turned into.
    pub fn resolve_shape_id(
        &self,
        introspect: &dyn KernelIntrospect,
        solid: &KernelSolidHandle,
        id: ShapeId,
    ) -> Option<KernelId> {
        let record = self.shapes.get(&id)?;
        record
            .geometry
            .resolve(introspect, solid, &self.config)
            .or_else(|| self.resolve_descendants(introspect, solid, id))
    }

    /// Resolve a reference through lineage. Meant for references whose
    /// direct resolution already failed: every registered shape with the
    /// reference's geometry is followed to its newest successors.
    pub fn resolve_with_history(
        &self,
        introspect: &dyn KernelIntrospect,
        solid: &KernelSolidHandle,
        reference: &ShapeReference,
    ) -> Option<KernelId> {
        let tolerance = self.config.identity_tolerance;
        let origins: Vec<ShapeId> = self
            .shapes
            .iter()
            .rev()
            .filter(|(_, r)| r.geometry.same_geometry(reference, tolerance))
            .map(|(id, _)| *id)
            .collect();
        origins
            .into_iter()
            .find_map(|origin| self.resolve_descendants(introspect, solid, origin))
    }

    fn resolve_descendants(
        &self,
        introspect: &dyn KernelIntrospect,
        solid: &KernelSolidHandle,
        id: ShapeId,
    ) -> Option<KernelId> {
        self.newest_successors(id).into_iter().find_map(|leaf| {
            let found = self
                .shapes
                .get(&leaf)?
                .geometry
                .resolve(introspect, solid, &self.config)?;
            debug!(origin = id.0, via = leaf.0, "resolved through lineage");
            Some(found)
        })
    }

    /// Live descendants of `id` that have no further successors, newest
    /// first.
    pub fn newest_successors(&self, id: ShapeId) -> Vec<ShapeId> {
        let mut seen = BTreeSet::from([id]);
        let mut frontier = vec![id];
        let mut leaves = Vec::new();
        while let Some(current) = frontier.pop() {
            let next: Vec<ShapeId> = self
                .operations
                .iter()
                .flat_map(|op| op.lineage.iter())
                .filter(|(from, _)| *from == current)
                .flat_map(|(_, to)| to.iter().copied())
                .filter(|s| self.shapes.contains_key(s))
                .collect();
            if next.is_empty() {
                if current != id {
                    leaves.push(current);
                }
                continue;
            }
            for s in next {
                if seen.insert(s) {
                    frontier.push(s);
                }
            }
        }
        leaves.sort_by(|a, b| b.cmp(a));
        leaves
    }

    pub fn checkpoint(&self) -> RegistryCheckpoint {
        RegistryCheckpoint {
            shapes: self.shapes.clone(),
            operations: self.operations.clone(),
            next_id: self.next_id,
        }
    }

    /// Roll back to a checkpoint. Ids allocated since stay retired.
    pub fn restore(&mut self, checkpoint: RegistryCheckpoint) {
        self.shapes = checkpoint.shapes;
        self.operations = checkpoint.operations;
        self.next_id = self.next_id.max(checkpoint.next_id);
    }
}

fn lineage_from(
    history: &ShapeHistory,
    predecessors: &[(KernelId, ShapeId)],
    successors: &[(KernelId, ShapeId)],
) -> Vec<(ShapeId, Vec<ShapeId>)> {
    let before: BTreeMap<KernelId, ShapeId> = predecessors.iter().copied().collect();
    let after: BTreeMap<KernelId, ShapeId> = successors.iter().copied().collect();

    let mut lineage: BTreeMap<ShapeId, Vec<ShapeId>> = BTreeMap::new();
    for (from, to) in history.modified.iter().chain(history.generated.iter()) {
        let Some(origin) = before.get(from) else {
            continue;
        };
        let targets = lineage.entry(*origin).or_default();
        for t in to.iter().filter_map(|k| after.get(k)) {
            if t != origin && !targets.contains(t) {
                targets.push(*t);
            }
        }
    }
    lineage.into_iter().filter(|(_, to)| !to.is_empty()).collect()
}
