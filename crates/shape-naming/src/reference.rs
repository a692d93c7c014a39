//! Selection-time references to faces and edges.

use brep_kernel::{EdgeGeometry, FaceGeometry, KernelId, KernelIntrospect, KernelSolidHandle};
use serde::{Deserialize, Serialize};
use tnp_types::{math, GeometryHash, ShapeType, SurfaceType};
use tracing::debug;

use crate::config::ResolveConfig;
use crate::error::NamingError;
use crate::face_hash::{hash_edge_geometry, hash_face_geometry};

/// What a feature remembers about a face or edge it selected.
///
/// For edges `center` is the midpoint, `normal` the sign-normalized
/// direction and `area` the length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeReference {
    #[serde(default)]
    pub shape_type: ShapeType,
    pub geometry_hash: GeometryHash,
    pub center: [f64; 3],
    #[serde(default)]
    pub normal: Option<[f64; 3]>,
    #[serde(default)]
    pub area: Option<f64>,
    pub surface_type: SurfaceType,
    /// Registry session that produced this reference. Runtime only.
    #[serde(skip)]
    pub session_id: Option<u32>,
}

impl ShapeReference {
    pub fn from_face(introspect: &dyn KernelIntrospect, face: KernelId) -> Result<Self, NamingError> {
        introspect
            .face_geometry(face)
            .map(|g| Self::from_face_geometry(&g))
            .map_err(|source| NamingError::Geometry { id: face, source })
    }

    pub fn from_edge(introspect: &dyn KernelIntrospect, edge: KernelId) -> Result<Self, NamingError> {
        introspect
            .edge_geometry(edge)
            .map(|g| Self::from_edge_geometry(&g))
            .map_err(|source| NamingError::Geometry { id: edge, source })
    }

    /// Build a reference to whichever kind of entity `shape_type` names.
    pub fn from_entity(
        introspect: &dyn KernelIntrospect,
        id: KernelId,
        shape_type: ShapeType,
    ) -> Result<Self, NamingError> {
        match shape_type {
            ShapeType::Face => Self::from_face(introspect, id),
            ShapeType::Edge => Self::from_edge(introspect, id),
        }
    }

    pub fn from_face_geometry(geometry: &FaceGeometry) -> Self {
        Self {
            shape_type: ShapeType::Face,
            geometry_hash: hash_face_geometry(geometry),
            center: geometry.center,
            normal: geometry.normal,
            area: Some(geometry.area),
            surface_type: geometry.surface.surface_type(),
            session_id: None,
        }
    }

    pub fn from_edge_geometry(geometry: &EdgeGeometry) -> Self {
        Self {
            shape_type: ShapeType::Edge,
            geometry_hash: hash_edge_geometry(geometry),
            center: geometry.midpoint,
            normal: geometry.direction,
            area: Some(geometry.length),
            surface_type: geometry.curve.surface_type(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: u32) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Find the entity this reference names in `solid`.
    ///
    /// An exact hash hit wins outright (first in kernel order). Otherwise
    /// the most similar candidate is taken if it scores above the
    /// configured threshold.
    pub fn resolve(
        &self,
        introspect: &dyn KernelIntrospect,
        solid: &KernelSolidHandle,
        config: &ResolveConfig,
    ) -> Option<KernelId> {
        let ids = match self.shape_type {
            ShapeType::Face => introspect.list_faces(solid),
            ShapeType::Edge => introspect.list_edges(solid),
        };
        let candidates: Vec<(KernelId, ShapeReference)> = ids
            .into_iter()
            .filter_map(|id| {
                Self::from_entity(introspect, id, self.shape_type)
                    .ok()
                    .map(|r| (id, r))
            })
            .collect();

        if let Some((id, _)) = candidates
            .iter()
            .find(|(_, c)| c.geometry_hash.matches(&self.geometry_hash))
        {
            return Some(*id);
        }

        self.best_match(candidates.iter().map(|(id, c)| (*id, c)), config)
            .map(|(id, score)| {
                debug!(
                    hash = %self.geometry_hash,
                    matched = id.0,
                    score,
                    "reference resolved by similarity"
                );
                id
            })
    }

    /// Highest-scoring candidate above the threshold. Ties keep the
    /// earlier candidate.
    pub fn best_match<'a, K: Copy>(
        &self,
        candidates: impl IntoIterator<Item = (K, &'a ShapeReference)>,
        config: &ResolveConfig,
    ) -> Option<(K, f64)> {
        let mut best: Option<(K, f64)> = None;
        for (key, candidate) in candidates {
            if candidate.shape_type != self.shape_type {
                continue;
            }
            let score = self.similarity(candidate, config);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((key, score));
            }
        }
        best.filter(|(_, score)| *score > config.similarity_threshold)
    }

    /// Weighted similarity in `[0, 1]`. Terms that either side lacks are
    /// left out of the weighting.
    pub fn similarity(&self, other: &ShapeReference, config: &ResolveConfig) -> f64 {
        let w = &config.weights;
        let mut score = 0.0;
        let mut total = 0.0;

        total += w.center;
        if config.center_falloff > 0.0 {
            let d = math::distance(self.center, other.center);
            score += w.center * (1.0 - d / config.center_falloff).max(0.0);
        } else if self.center == other.center {
            score += w.center;
        }

        if let (Some(a), Some(b)) = (self.normal, other.normal) {
            total += w.normal;
            let mut dot = math::dot(a, b);
            if self.shape_type == ShapeType::Edge {
                dot = dot.abs();
            }
            score += w.normal * dot.clamp(0.0, 1.0);
        }

        if let (Some(a), Some(b)) = (self.area, other.area) {
            total += w.area;
            let max = a.abs().max(b.abs());
            let ratio = if max > 1e-12 { a.abs().min(b.abs()) / max } else { 1.0 };
            score += w.area * ratio;
        }

        total += w.surface_type;
        if self.surface_type == other.surface_type {
            score += w.surface_type;
        }

        if total > 0.0 {
            score / total
        } else {
            0.0
        }
    }

    /// Same shape for registry purposes: equal hashes, or when either hash
    /// is the sentinel, equal center and area within `tolerance`.
    pub fn same_geometry(&self, other: &ShapeReference, tolerance: f64) -> bool {
        if self.shape_type != other.shape_type {
            return false;
        }
        if self.geometry_hash.matches(&other.geometry_hash) {
            return true;
        }
        if !self.geometry_hash.is_sentinel() && !other.geometry_hash.is_sentinel() {
            return false;
        }
        let areas_equal = match (self.area, other.area) {
            (Some(a), Some(b)) => (a - b).abs() <= tolerance,
            (None, None) => true,
            _ => false,
        };
        math::distance(self.center, other.center) <= tolerance && areas_equal
    }
}
