use std::collections::BTreeSet;

use brep_kernel::{KernelId, KernelSolidHandle};
use modeling_ops::KernelBundle;
use shape_naming::{ShapeId, ShapeRegistry};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::health::{get_health_report, has_transaction_regression, HealthReport, PreState, SolidSignature};
use crate::rebuild::{rebuild_body, RebuildOutcome};
use crate::transaction::{run_feature, BodySnapshot};
use crate::types::{EngineError, Feature, FeatureKind};
use crate::undo::{Command, UndoStack};

/// One solid and the feature history that builds it.
#[derive(Debug, Clone)]
pub struct Body {
    pub id: Uuid,
    pub name: String,
    /// Ordered history. Index 0 runs first.
    pub features: Vec<Feature>,
    /// Current result. Runtime only.
    pub solid: Option<KernelSolidHandle>,
    /// Bumped once per successfully applied feature.
    pub generation: u64,
    /// Bumped whenever `solid` changes; tessellation consumers compare it.
    pub mesh_generation: u64,
    /// Features that failed on the last rebuild.
    pub error_feature_ids: BTreeSet<Uuid>,
    /// Entities of `solid` and the shapes they are registered as.
    pub(crate) shape_map: Vec<(KernelId, ShapeId)>,
}

impl Body {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_features(Uuid::new_v4(), name, Vec::new())
    }

    /// A body with a history that has not been built yet.
    pub fn with_features(id: Uuid, name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            id,
            name: name.into(),
            features,
            solid: None,
            generation: 0,
            mesh_generation: 0,
            error_feature_ids: BTreeSet::new(),
            shape_map: Vec::new(),
        }
    }

    pub fn feature(&self, id: Uuid) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn feature_index(&self, id: Uuid) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }

    pub fn shape_ids(&self) -> &[(KernelId, ShapeId)] {
        &self.shape_map
    }
}

/// Bodies plus the naming registry and undo history shared by them.
#[derive(Debug)]
pub struct Document {
    pub bodies: Vec<Body>,
    pub active_body: Option<Uuid>,
    pub(crate) registry: ShapeRegistry,
    pub(crate) undo: UndoStack,
    pub(crate) config: EngineConfig,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Document {
    pub fn new(config: EngineConfig) -> Self {
        Self::from_bodies(Vec::new(), None, config)
    }

    /// Wrap unbuilt bodies (e.g. freshly loaded). Call
    /// [`Document::rebuild_all`] before use.
    pub fn from_bodies(bodies: Vec<Body>, active_body: Option<Uuid>, config: EngineConfig) -> Self {
        Self {
            bodies,
            active_body,
            registry: ShapeRegistry::new(config.resolve),
            undo: UndoStack::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Add an empty body; the first one becomes active.
    pub fn add_body(&mut self, name: impl Into<String>) -> Uuid {
        let body = Body::new(name);
        let id = body.id;
        self.bodies.push(body);
        if self.active_body.is_none() {
            self.active_body = Some(id);
        }
        id
    }

    pub fn body(&self, id: Uuid) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn active_body(&self) -> Option<&Body> {
        self.active_body.and_then(|id| self.body(id))
    }

    pub(crate) fn parts(&mut self, body_id: Uuid) -> Result<(&mut Body, &mut ShapeRegistry), EngineError> {
        let body = self
            .bodies
            .iter_mut()
            .find(|b| b.id == body_id)
            .ok_or(EngineError::BodyNotFound { id: body_id })?;
        Ok((body, &mut self.registry))
    }

    /// Apply a new feature at the end of a body's history. On failure the
    /// body is untouched and the feature comes back in the error.
    pub fn add_feature(
        &mut self,
        kb: &mut dyn KernelBundle,
        body_id: Uuid,
        name: impl Into<String>,
        kind: FeatureKind,
    ) -> Result<Uuid, EngineError> {
        let feature = Feature::new(name, kind);
        let id = feature.id;
        let applied = self.append_feature(kb, body_id, feature)?;
        self.undo.push(Command::AddFeature {
            body_id,
            feature: Box::new(applied),
        });
        Ok(id)
    }

    pub(crate) fn append_feature(
        &mut self,
        kb: &mut dyn KernelBundle,
        body_id: Uuid,
        mut feature: Feature,
    ) -> Result<Feature, EngineError> {
        let config = self.config;
        let (body, registry) = self.parts(body_id)?;
        registry.invalidate_feature(feature.id);
        match run_feature(kb, registry, body, &mut feature, &config) {
            Ok(()) => {
                body.features.push(feature.clone());
                Ok(feature)
            }
            Err(source) => Err(EngineError::FeatureFailed {
                feature: Box::new(feature),
                source,
            }),
        }
    }

    /// Drop the last feature of a body and rebuild what remains.
    pub fn remove_last_feature(
        &mut self,
        kb: &mut dyn KernelBundle,
        body_id: Uuid,
    ) -> Result<Feature, EngineError> {
        let feature = self.pop_feature(kb, body_id, None)?;
        self.undo.push(Command::RemoveFeature {
            body_id,
            feature: Box::new(feature.clone()),
        });
        Ok(feature)
    }

    /// Change a feature's parameters and rebuild. If the rebuild leaves the
    /// body worse off, everything is rolled back.
    pub fn edit_feature(
        &mut self,
        kb: &mut dyn KernelBundle,
        body_id: Uuid,
        feature_id: Uuid,
        kind: FeatureKind,
    ) -> Result<(), EngineError> {
        let old_kind = self.replace_kind(kb, body_id, feature_id, kind.clone())?;
        self.undo.push(Command::EditFeature {
            body_id,
            feature_id,
            old_kind: Box::new(old_kind),
            new_kind: Box::new(kind),
        });
        Ok(())
    }

    #[instrument(skip(self, kb, kind))]
    pub(crate) fn replace_kind(
        &mut self,
        kb: &mut dyn KernelBundle,
        body_id: Uuid,
        feature_id: Uuid,
        kind: FeatureKind,
    ) -> Result<FeatureKind, EngineError> {
        let config = self.config;
        let (body, registry) = self.parts(body_id)?;
        let index = body
            .feature_index(feature_id)
            .ok_or(EngineError::FeatureNotFound { id: feature_id })?;

        let snapshot = BodySnapshot::capture(body, registry);
        let pre = PreState::capture(body, kb.as_introspect());
        let old_kind = std::mem::replace(&mut body.features[index].kind, kind);
        rebuild_body(kb, registry, body, &config);

        if let Some(reason) =
            has_transaction_regression(body, &pre, kb.as_introspect(), config.validate_results)
        {
            let name = body.features[index].name.clone();
            snapshot.restore(body, registry);
            warn!(feature = %name, %reason, "edit rolled back");
            return Err(EngineError::EditRolledBack { name, reason });
        }
        Ok(old_kind)
    }

    /// Replay a body's whole history from nothing.
    pub fn rebuild_body(
        &mut self,
        kb: &mut dyn KernelBundle,
        body_id: Uuid,
    ) -> Result<RebuildOutcome, EngineError> {
        let config = self.config;
        let (body, registry) = self.parts(body_id)?;
        Ok(rebuild_body(kb, registry, body, &config))
    }

    pub fn rebuild_all(&mut self, kb: &mut dyn KernelBundle) -> Vec<(Uuid, RebuildOutcome)> {
        let config = self.config;
        self.bodies
            .iter_mut()
            .map(|body| (body.id, rebuild_body(kb, &mut self.registry, body, &config)))
            .collect()
    }

    pub fn health_report(&self, body_id: Uuid) -> Result<HealthReport, EngineError> {
        self.body(body_id)
            .map(get_health_report)
            .ok_or(EngineError::BodyNotFound { id: body_id })
    }

    pub fn signature(&self, kb: &dyn KernelBundle, body_id: Uuid) -> Option<SolidSignature> {
        let solid = self.body(body_id)?.solid.as_ref()?;
        SolidSignature::capture(kb.as_introspect(), solid)
    }
}
