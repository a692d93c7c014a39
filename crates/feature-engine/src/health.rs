//! Post-operation health checks and the per-feature health report.

use std::collections::BTreeSet;

use brep_kernel::{BoundingBox, KernelIntrospect, KernelSolidHandle};
use serde::{Deserialize, Serialize};
use tnp_types::{math, FeatureStatus};
use uuid::Uuid;

use crate::config::LocalModifierLimits;
use crate::document::Body;

/// Coarse fingerprint of a solid, enough to tell whether two rebuilds
/// produced the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolidSignature {
    pub volume: f64,
    pub face_count: usize,
    pub edge_count: usize,
    pub bbox: BoundingBox,
}

impl SolidSignature {
    pub fn capture(introspect: &dyn KernelIntrospect, solid: &KernelSolidHandle) -> Option<Self> {
        let volume = introspect.mass_properties(solid).ok()?.volume;
        let bbox = introspect.bounding_box(solid).ok()?;
        Some(Self {
            volume,
            face_count: introspect.list_faces(solid).len(),
            edge_count: introspect.list_edges(solid).len(),
            bbox,
        })
    }

    /// Same topology counts, volume and bbox within `tolerance`.
    pub fn approx_eq(&self, other: &SolidSignature, tolerance: f64) -> bool {
        self.face_count == other.face_count
            && self.edge_count == other.edge_count
            && (self.volume - other.volume).abs() <= tolerance
            && math::distance(self.bbox.min, other.bbox.min) <= tolerance
            && math::distance(self.bbox.max, other.bbox.max) <= tolerance
    }
}

/// Body health before a transaction.
#[derive(Debug, Clone)]
pub struct PreState {
    pub error_feature_ids: BTreeSet<Uuid>,
    pub had_solid: bool,
    pub was_valid: bool,
    pub signature: Option<SolidSignature>,
}

impl PreState {
    pub fn capture(body: &Body, introspect: &dyn KernelIntrospect) -> Self {
        let solid = body.solid.as_ref();
        Self {
            error_feature_ids: body.error_feature_ids.clone(),
            had_solid: solid.is_some(),
            was_valid: solid.map_or(false, |s| introspect.is_valid(s)),
            signature: solid.and_then(|s| SolidSignature::capture(introspect, s)),
        }
    }
}

/// `Some(reason)` when the body got worse since `pre`: features newly in
/// error, a solid that disappeared, or a valid solid turned invalid.
/// `check_validity` off skips the last rule.
pub fn has_transaction_regression(
    body: &Body,
    pre: &PreState,
    introspect: &dyn KernelIntrospect,
    check_validity: bool,
) -> Option<String> {
    let new_errors: Vec<String> = body
        .error_feature_ids
        .difference(&pre.error_feature_ids)
        .map(|id| {
            body.feature(*id)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| id.to_string())
        })
        .collect();
    if !new_errors.is_empty() {
        return Some(format!("features newly in error: {}", new_errors.join(", ")));
    }

    let solid = body
        .solid
        .as_ref()
        .filter(|s| !introspect.list_faces(s).is_empty());
    match solid {
        None if pre.had_solid => Some("body solid disappeared".to_string()),
        Some(s) if check_validity && pre.was_valid && !introspect.is_valid(s) => {
            Some("body solid became invalid".to_string())
        }
        _ => None,
    }
}

/// `Some(reason)` when a local modifier of size `magnitude` moved the
/// bounding box more than such an operation plausibly can.
pub fn check_local_modifier_scale(
    pre: &BoundingBox,
    post: &BoundingBox,
    magnitude: f64,
    limits: &LocalModifierLimits,
) -> Option<String> {
    let grow = limits.max_growth(magnitude);
    let shrink = limits.max_shrink(magnitude);

    let pre_ext = pre.extent();
    let post_ext = post.extent();
    let pre_center = pre.center();
    let post_center = post.center();
    let axes = ["x", "y", "z"];

    let mut measures: Vec<(String, f64, f64)> = Vec::new();
    for i in 0..3 {
        measures.push((format!("{} extent", axes[i]), pre_ext[i], post_ext[i]));
    }
    measures.push(("diagonal".to_string(), pre.diagonal(), post.diagonal()));
    for i in 0..3 {
        measures.push((format!("{} center", axes[i]), pre_center[i], post_center[i]));
    }

    for (what, before, after) in measures {
        let delta = after - before;
        if delta > grow {
            return Some(format!("{what} grew by {delta:.3} (limit {grow:.3})"));
        }
        if -delta > shrink {
            return Some(format!("{what} shrank by {:.3} (limit {shrink:.3})", -delta));
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Broken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureHealth {
    pub name: String,
    pub feature_type: String,
    pub status: HealthStatus,
    pub broken_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub features: Vec<FeatureHealth>,
}

impl HealthReport {
    pub fn broken_total(&self) -> usize {
        self.features.iter().map(|f| f.broken_count).sum()
    }

    pub fn is_healthy(&self) -> bool {
        self.features.iter().all(|f| f.status == HealthStatus::Ok)
    }
}

/// One entry per feature, in history order. A feature is broken if it is
/// in error, carries a drift code, or needed the positional fallback.
pub fn get_health_report(body: &Body) -> HealthReport {
    let features = body
        .features
        .iter()
        .map(|f| {
            let broken_count = f.resolution.broken_count();
            let drift = f.status_details.as_ref().map_or(false, |d| d.is_drift());
            let broken = f.status == FeatureStatus::Error || drift || broken_count > 0;
            FeatureHealth {
                name: f.name.clone(),
                feature_type: f.kind.type_name().to_string(),
                status: if broken {
                    HealthStatus::Broken
                } else {
                    HealthStatus::Ok
                },
                broken_count,
            }
        })
        .collect();
    HealthReport { features }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(min: [f64; 3], max: [f64; 3]) -> BoundingBox {
        BoundingBox { min, max }
    }

    #[test]
    fn small_local_change_passes() {
        let limits = LocalModifierLimits::default();
        let pre = bbox([0.0; 3], [40.0, 28.0, 18.0]);
        let post = bbox([0.0; 3], [40.0, 28.0, 18.0]);
        assert_eq!(check_local_modifier_scale(&pre, &post, 0.7, &limits), None);
    }

    #[test]
    fn growth_beyond_limit_is_drift() {
        let limits = LocalModifierLimits::default();
        let pre = bbox([0.0; 3], [10.0; 3]);
        // limit is max(0.2, 0.6 * 0.5) = 0.3
        let post = bbox([0.0; 3], [10.0, 10.0, 10.5]);
        let reason = check_local_modifier_scale(&pre, &post, 0.5, &limits).unwrap();
        assert!(reason.contains("z extent grew"), "{reason}");
    }

    #[test]
    fn shrink_limit_scales_with_magnitude() {
        let limits = LocalModifierLimits::default();
        let pre = bbox([0.0; 3], [10.0; 3]);
        let post = bbox([0.0; 3], [10.0, 10.0, 7.0]);
        // 3mm shrink: over max(1.8, 7*0.2)=1.8, under 7*0.5=3.5
        assert!(check_local_modifier_scale(&pre, &post, 0.2, &limits).is_some());
        assert!(check_local_modifier_scale(&pre, &post, 0.5, &limits).is_none());
    }
}
