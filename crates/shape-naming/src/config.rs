//! Tunables for reference resolution.

use serde::{Deserialize, Serialize};

/// Relative weight of each similarity term. Terms missing on either side
/// are dropped from both numerator and denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub center: f64,
    pub normal: f64,
    pub area: f64,
    pub surface_type: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            center: 0.40,
            normal: 0.30,
            area: 0.20,
            surface_type: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// A similarity match must score strictly above this.
    pub similarity_threshold: f64,
    /// Center distance (mm) at which the center term reaches zero.
    pub center_falloff: f64,
    pub weights: SimilarityWeights,
    /// Center/area tolerance for treating two sentinel-hashed
    /// registrations as the same shape.
    pub identity_tolerance: f64,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.70,
            center_falloff: 10.0,
            weights: SimilarityWeights::default(),
            identity_tolerance: 1e-6,
        }
    }
}

impl ResolveConfig {
    /// Only exact hash matches resolve.
    pub fn exact_only() -> Self {
        Self {
            similarity_threshold: f64::INFINITY,
            ..Self::default()
        }
    }

    /// Similarity matches need near-identical placement.
    pub fn strict() -> Self {
        Self {
            similarity_threshold: 0.90,
            center_falloff: 2.0,
            ..Self::default()
        }
    }
}
