//! ModelBuilder: a fluent API for scripting modeling sessions in tests.
//!
//! Drives a real [`Document`] against a kernel, so every step goes through
//! the same transaction, naming and undo paths as an application would.
//! Features are addressed by name instead of UUID.

use std::collections::HashMap;
use std::sync::Arc;

use brep_kernel::{
    EdgeRenderData, Kernel, KernelIntrospect, KernelSolidHandle, MockKernel, RenderMesh,
    TruckKernel,
};
use feature_engine::{
    CombineMode, Document, EngineConfig, FeatureKind, HealthReport, PrimitiveShape, RebuildOutcome,
    SolidSignature,
};
use file_format::{open_project, save_project, spawn_stl_export, ProjectMetadata};
use tess_cache::{CacheConfig, TessellationCache};
use tnp_types::math::Vec3;
use tnp_types::Transform;
use uuid::Uuid;

use crate::helpers::{extreme_face, face_loop_selection, face_selection, HarnessError};
use crate::oracle::{self, OracleVerdict};

/// Chordal tolerance used by [`ModelBuilder::tessellate`].
pub const DEFAULT_QUALITY: f64 = 0.1;
const DEFAULT_ANGULAR_TOLERANCE: f64 = 0.5;

/// A single-body modeling session over kernel `K`.
pub struct ModelBuilder<K = MockKernel> {
    pub doc: Document,
    pub kernel: K,
    pub cache: TessellationCache,
    body: Uuid,
    named_features: HashMap<String, Uuid>,
    history: Vec<(String, String)>,
    auto_check: bool,
}

impl ModelBuilder<MockKernel> {
    /// Deterministic, fast, and able to inject faults.
    pub fn mock() -> Self {
        Self::with_kernel(MockKernel::new(), EngineConfig::default())
    }
}

impl ModelBuilder<TruckKernel> {
    /// Real B-Rep geometry. Local modifiers are not available.
    pub fn truck() -> Self {
        Self::with_kernel(TruckKernel::new(), EngineConfig::default())
    }
}

impl<K: Kernel + KernelIntrospect> ModelBuilder<K> {
    pub fn with_kernel(kernel: K, config: EngineConfig) -> Self {
        let mut doc = Document::new(config);
        let body = doc.add_body("Body");
        Self {
            doc,
            kernel,
            cache: TessellationCache::new(CacheConfig::default()),
            body,
            named_features: HashMap::new(),
            history: Vec::new(),
            auto_check: false,
        }
    }

    /// After every feature, fail unless the body is healthy.
    pub fn with_auto_check(mut self) -> Self {
        self.auto_check = true;
        self
    }

    pub fn body_id(&self) -> Uuid {
        self.body
    }

    pub fn feature_count(&self) -> usize {
        self.doc.body(self.body).map_or(0, |b| b.features.len())
    }

    pub fn feature_id(&self, name: &str) -> Result<Uuid, HarnessError> {
        self.named_features
            .get(name)
            .copied()
            .ok_or_else(|| HarnessError::FeatureNotFound {
                name: name.to_string(),
            })
    }

    /// Operations performed so far, as `(operation, detail)` pairs.
    pub fn history(&self) -> &[(String, String)] {
        &self.history
    }

    // ── Features ────────────────────────────────────────────────────────

    /// Add a feature of any kind under `name`.
    pub fn add(&mut self, name: &str, kind: FeatureKind) -> Result<Uuid, HarnessError> {
        if self.named_features.contains_key(name) {
            return Err(HarnessError::DuplicateName {
                name: name.to_string(),
            });
        }
        let type_name = kind.type_name();
        let id = self.doc.add_feature(&mut self.kernel, self.body, name, kind)?;
        self.named_features.insert(name.to_string(), id);
        self.history.push((type_name.to_string(), name.to_string()));
        self.after_change()?;
        Ok(id)
    }

    pub fn add_box(&mut self, name: &str, corner: Vec3, size: Vec3) -> Result<Uuid, HarnessError> {
        self.add_primitive(name, corner, size, CombineMode::Join)
    }

    pub fn cut_box(&mut self, name: &str, corner: Vec3, size: Vec3) -> Result<Uuid, HarnessError> {
        self.add_primitive(name, corner, size, CombineMode::Cut)
    }

    fn add_primitive(
        &mut self,
        name: &str,
        corner: Vec3,
        size: Vec3,
        mode: CombineMode,
    ) -> Result<Uuid, HarnessError> {
        self.add(
            name,
            FeatureKind::Primitive {
                shape: PrimitiveShape::Box { corner, size },
                mode,
            },
        )
    }

    /// Push or pull the outermost face facing `direction`.
    pub fn push_pull(
        &mut self,
        name: &str,
        direction: Vec3,
        distance: f64,
    ) -> Result<Uuid, HarnessError> {
        let kind = self.push_pull_kind(direction, distance)?;
        self.add(name, kind)
    }

    pub fn push_pull_kind(&self, direction: Vec3, distance: f64) -> Result<FeatureKind, HarnessError> {
        let solid = self.solid()?;
        let face = extreme_face(&self.kernel, &solid, direction)
            .ok_or(HarnessError::NoFace { direction })?;
        let (face, face_index) = face_selection(&self.kernel, &solid, face)?;
        Ok(FeatureKind::PushPull {
            face,
            face_index,
            distance,
        })
    }

    /// Chamfer every edge around the outermost face facing `direction`.
    pub fn chamfer_face_loop(
        &mut self,
        name: &str,
        direction: Vec3,
        distance: f64,
    ) -> Result<Uuid, HarnessError> {
        let solid = self.solid()?;
        let face = extreme_face(&self.kernel, &solid, direction)
            .ok_or(HarnessError::NoFace { direction })?;
        let (edges, edge_indices) = face_loop_selection(&self.kernel, &solid, face)?;
        self.add(
            name,
            FeatureKind::Chamfer {
                edges,
                edge_indices,
                distance,
            },
        )
    }

    pub fn translate(&mut self, name: &str, vector: Vec3) -> Result<Uuid, HarnessError> {
        self.add(
            name,
            FeatureKind::Transform {
                transform: Transform::Translate { vector },
            },
        )
    }

    /// Replace a named feature's parameters and rebuild.
    pub fn edit(&mut self, name: &str, kind: FeatureKind) -> Result<(), HarnessError> {
        let id = self.feature_id(name)?;
        self.doc.edit_feature(&mut self.kernel, self.body, id, kind)?;
        self.history.push(("Edit".to_string(), name.to_string()));
        self.after_change()
    }

    pub fn undo(&mut self) -> Result<(), HarnessError> {
        self.doc.undo(&mut self.kernel)?;
        self.history.push(("Undo".to_string(), String::new()));
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), HarnessError> {
        self.doc.redo(&mut self.kernel)?;
        self.history.push(("Redo".to_string(), String::new()));
        Ok(())
    }

    pub fn rebuild(&mut self) -> Result<RebuildOutcome, HarnessError> {
        Ok(self.doc.rebuild_body(&mut self.kernel, self.body)?)
    }

    fn after_change(&mut self) -> Result<(), HarnessError> {
        self.cache.notify_body_changed();
        if !self.auto_check {
            return Ok(());
        }
        let verdict = oracle::check_body_health(&self.health()?);
        if verdict.passed {
            Ok(())
        } else {
            Err(HarnessError::OracleFailure {
                oracle: verdict.oracle_name,
                detail: verdict.detail,
            })
        }
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn solid(&self) -> Result<KernelSolidHandle, HarnessError> {
        self.doc
            .body(self.body)
            .and_then(|b| b.solid.clone())
            .ok_or(HarnessError::NoSolid)
    }

    pub fn signature(&self) -> Result<SolidSignature, HarnessError> {
        self.doc
            .signature(&self.kernel, self.body)
            .ok_or(HarnessError::NoSolid)
    }

    pub fn volume(&self) -> Result<f64, HarnessError> {
        Ok(self.signature()?.volume)
    }

    pub fn health(&self) -> Result<HealthReport, HarnessError> {
        Ok(self.doc.health_report(self.body)?)
    }

    /// Mesh and edge overlay of the current solid, through the cache.
    pub fn tessellate_with_edges(
        &mut self,
        quality: f64,
    ) -> Result<(Arc<RenderMesh>, Option<Arc<EdgeRenderData>>), HarnessError> {
        let solid = self.solid()?;
        let (mesh, edges) =
            self.cache
                .tessellate(&mut self.kernel, &solid, quality, DEFAULT_ANGULAR_TOLERANCE);
        Ok((mesh.ok_or(HarnessError::NoMesh)?, edges))
    }

    pub fn tessellate(&mut self) -> Result<Arc<RenderMesh>, HarnessError> {
        Ok(self.tessellate_with_edges(DEFAULT_QUALITY)?.0)
    }

    /// Topology and mesh oracles for the current solid.
    pub fn check_all(&mut self) -> Result<Vec<OracleVerdict>, HarnessError> {
        let solid = self.solid()?;
        let mut verdicts = oracle::run_topology_checks(&self.kernel, &solid);
        let mesh = self.tessellate()?;
        verdicts.extend(oracle::run_all_mesh_checks(&mesh));
        verdicts.push(oracle::check_mesh_matches_solid(
            &mesh,
            &self.kernel,
            &solid,
            1e-4,
        ));
        verdicts.push(oracle::check_body_health(&self.health()?));
        Ok(verdicts)
    }

    // ── Files ───────────────────────────────────────────────────────────

    pub fn save(&self, project_name: &str) -> Result<String, HarnessError> {
        Ok(save_project(&self.doc, &ProjectMetadata::new(project_name))?)
    }

    /// Binary STL of the current solid, written on a worker thread.
    pub fn export_stl(&mut self, name: &str) -> Result<Vec<u8>, HarnessError> {
        let mesh = self.tessellate()?;
        Ok(spawn_stl_export(mesh, name).wait()?)
    }
}

impl<K: Kernel + KernelIntrospect + Default> ModelBuilder<K> {
    /// Save, then open the result on a brand new kernel. Feature names
    /// carry over; undo history does not.
    pub fn reload(&self) -> Result<ModelBuilder<K>, HarnessError> {
        let json = self.save("reload")?;
        let mut kernel = K::default();
        let opened = open_project(&json, &mut kernel, *self.doc.config())?;
        let body = opened.document.active_body.unwrap_or(self.body);
        Ok(ModelBuilder {
            doc: opened.document,
            kernel,
            cache: TessellationCache::new(*self.cache.config()),
            body,
            named_features: self.named_features.clone(),
            history: vec![("Reload".to_string(), String::new())],
            auto_check: self.auto_check,
        })
    }
}
