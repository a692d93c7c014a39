//! Structured text reports of a modeling session.
//!
//! Plain text rather than JSON: a failing test prints it, and a person
//! reads it.

use std::fmt;

use brep_kernel::{Kernel, KernelIntrospect};
use feature_engine::{HealthStatus, ResolutionStats};
use tess_cache::CacheStats;
use tnp_types::{BoundingBox, FeatureStatus};

use crate::helpers::HarnessError;
use crate::oracle::{self, OracleVerdict};
use crate::workflow::ModelBuilder;

/// A complete model report.
pub struct ModelReport {
    pub feature_entries: Vec<FeatureEntry>,
    /// `(V, E, F)` of the body's solid.
    pub topology: Option<(usize, usize, usize)>,
    pub volume: Option<f64>,
    pub bounding_box: Option<BoundingBox>,
    pub mesh: Option<MeshSummary>,
    pub shape_count: usize,
    pub operation_count: usize,
    pub cache: CacheStats,
    pub oracle_results: Vec<OracleVerdict>,
}

/// One feature of the body's history.
pub struct FeatureEntry {
    pub index: usize,
    pub name: String,
    pub feature_type: String,
    pub status: FeatureStatus,
    pub health: HealthStatus,
    pub resolution: ResolutionStats,
    pub message: Option<String>,
}

pub struct MeshSummary {
    pub triangle_count: usize,
    pub vertex_count: usize,
    pub face_range_count: usize,
}

impl ModelReport {
    pub fn broken_features(&self) -> impl Iterator<Item = &FeatureEntry> {
        self.feature_entries
            .iter()
            .filter(|e| e.health == HealthStatus::Broken)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== TNP Model Report ===\n\n");

        let broken = self.broken_features().count();
        out.push_str(&format!(
            "Feature History ({} features, {} broken):\n",
            self.feature_entries.len(),
            broken,
        ));
        for entry in &self.feature_entries {
            let flag = match entry.health {
                HealthStatus::Ok => "",
                HealthStatus::Broken => " [BROKEN]",
            };
            out.push_str(&format!(
                "  [{}] {} \"{}\" {:?}{}\n",
                entry.index, entry.feature_type, entry.name, entry.status, flag,
            ));
            let r = &entry.resolution;
            if r.by_reference + r.by_history + r.by_index + r.unresolved > 0 {
                out.push_str(&format!(
                    "      References: {} direct, {} history, {} index, {} unresolved\n",
                    r.by_reference, r.by_history, r.by_index, r.unresolved,
                ));
            }
            if let Some(msg) = &entry.message {
                out.push_str(&format!("      Error: {msg}\n"));
            }
        }

        match self.topology {
            Some((v, e, f)) => {
                let euler = v as i64 - e as i64 + f as i64;
                out.push_str(&format!(
                    "\nSolid: V={v} E={e} F={f} | Euler V-E+F={euler} ({})\n",
                    if euler == 2 { "OK" } else { "WARN" },
                ));
            }
            None => out.push_str("\nSolid: none\n"),
        }
        if let Some(volume) = self.volume {
            out.push_str(&format!("Volume: {volume:.3}\n"));
        }
        if let Some(b) = &self.bounding_box {
            out.push_str(&format!(
                "Bounding Box: ({:.1}, {:.1}, {:.1}) -> ({:.1}, {:.1}, {:.1})\n",
                b.min[0], b.min[1], b.min[2], b.max[0], b.max[1], b.max[2],
            ));
        }
        if let Some(m) = &self.mesh {
            out.push_str(&format!(
                "Mesh: {} triangles, {} vertices, {} face ranges\n",
                m.triangle_count, m.vertex_count, m.face_range_count,
            ));
        }

        out.push_str(&format!(
            "\nRegistry: {} shapes, {} operations\n",
            self.shape_count, self.operation_count,
        ));
        out.push_str(&format!(
            "Cache: {} mesh hits, {} misses, {} evictions\n",
            self.cache.mesh_hits, self.cache.mesh_misses, self.cache.evictions,
        ));

        if !self.oracle_results.is_empty() {
            out.push_str(&format!(
                "\nOracle Results ({} checks):\n",
                self.oracle_results.len()
            ));
            for v in &self.oracle_results {
                let status = if v.passed { "PASS" } else { "FAIL" };
                out.push_str(&format!("  [{status}] {}: {}\n", v.oracle_name, v.detail));
            }
        }
        out
    }
}

impl fmt::Display for ModelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl<K: Kernel + KernelIntrospect> ModelBuilder<K> {
    /// Snapshot of the body, its solid and the caches, with oracle results.
    pub fn report(&mut self) -> Result<ModelReport, HarnessError> {
        let health = self.health()?;
        let body = self
            .doc
            .body(self.body_id())
            .ok_or(HarnessError::NoSolid)?;
        let feature_entries = body
            .features
            .iter()
            .zip(&health.features)
            .enumerate()
            .map(|(index, (feature, h))| FeatureEntry {
                index,
                name: feature.name.clone(),
                feature_type: h.feature_type.clone(),
                status: feature.status,
                health: h.status,
                resolution: feature.resolution,
                message: feature.status_message.clone(),
            })
            .collect();

        let mut report = ModelReport {
            feature_entries,
            topology: None,
            volume: None,
            bounding_box: None,
            mesh: None,
            shape_count: self.doc.registry().shape_count(),
            operation_count: self.doc.registry().operation_count(),
            cache: self.cache.stats(),
            oracle_results: Vec::new(),
        };

        let Ok(solid) = self.solid() else {
            return Ok(report);
        };
        let introspect: &dyn KernelIntrospect = &self.kernel;
        report.topology = Some((
            introspect.list_vertices(&solid).len(),
            introspect.list_edges(&solid).len(),
            introspect.list_faces(&solid).len(),
        ));
        report.volume = introspect.mass_properties(&solid).ok().map(|p| p.volume);
        report.bounding_box = introspect.bounding_box(&solid).ok();

        report.oracle_results = self.check_all()?;
        let mesh = self.tessellate()?;
        report.mesh = Some(MeshSummary {
            triangle_count: mesh.triangle_count(),
            vertex_count: mesh.vertices.len() / 3,
            face_range_count: mesh.face_ranges.len(),
        });
        report.oracle_results.push(oracle::check_cache_reuse(&self.cache.stats(), 1));
        report.cache = self.cache.stats();
        Ok(report)
    }
}
