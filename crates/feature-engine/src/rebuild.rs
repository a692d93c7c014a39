use modeling_ops::KernelBundle;
use shape_naming::ShapeRegistry;
use tnp_types::status_codes;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::document::Body;
use crate::transaction::run_feature;

/// What a full replay did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildOutcome {
    pub applied: usize,
    /// Features left in error, in history order.
    pub failed: Vec<Uuid>,
    /// Subset of `failed` rolled back for geometric drift.
    pub drifted: Vec<Uuid>,
}

/// Replay every feature of `body` from an empty solid, re-registering
/// shapes as it goes. A failing feature stays in the history marked
/// `Error` and the replay continues from the last good solid.
#[instrument(skip_all, fields(body = %body.id, features = body.features.len()))]
pub fn rebuild_body(
    kb: &mut dyn KernelBundle,
    registry: &mut ShapeRegistry,
    body: &mut Body,
    config: &EngineConfig,
) -> RebuildOutcome {
    body.solid = None;
    body.shape_map.clear();
    body.error_feature_ids.clear();

    let mut outcome = RebuildOutcome::default();
    let mut features = std::mem::take(&mut body.features);
    for feature in features.iter_mut() {
        registry.invalidate_feature(feature.id);
        match run_feature(kb, registry, body, feature, config) {
            Ok(()) => outcome.applied += 1,
            Err(err) => {
                if err.is_drift() {
                    feature.mark_error(
                        status_codes::SELF_HEAL_ROLLBACK_GEOMETRY_DRIFT,
                        format!("rolled back during replay: {err}"),
                    );
                    outcome.drifted.push(feature.id);
                }
                body.error_feature_ids.insert(feature.id);
                outcome.failed.push(feature.id);
            }
        }
    }
    body.features = features;
    body.mesh_generation += 1;

    info!(
        applied = outcome.applied,
        failed = outcome.failed.len(),
        drifted = outcome.drifted.len(),
        "body rebuilt"
    );
    outcome
}
