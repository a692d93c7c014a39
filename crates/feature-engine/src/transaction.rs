//! Applying one feature atomically.
//!
//! A feature either lands completely (new solid, registered shapes,
//! recorded operation, bumped generation) or leaves the body and the
//! registry exactly as they were.

use brep_kernel::KernelIntrospect;
use modeling_ops::KernelBundle;
use shape_naming::{OperationInput, RegistryCheckpoint, ShapeRegistry};
use tnp_types::status_codes;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::document::Body;
use crate::feature::{ApplyContext, ModelingFeature};
use crate::health::{check_local_modifier_scale, has_transaction_regression, PreState};
use crate::resolve::ResolutionStats;
use crate::types::{Feature, FeatureError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Pending,
    Applying,
    Ok,
    Error,
}

/// Saved body and naming state for rollback.
#[derive(Debug, Clone)]
pub struct BodySnapshot {
    body: Body,
    naming: RegistryCheckpoint,
}

impl BodySnapshot {
    pub fn capture(body: &Body, registry: &ShapeRegistry) -> Self {
        Self {
            body: body.clone(),
            naming: registry.checkpoint(),
        }
    }

    pub fn restore(self, body: &mut Body, registry: &mut ShapeRegistry) {
        *body = self.body;
        registry.restore(self.naming);
    }
}

/// Run `feature` against `body` inside a transaction. Updates the
/// feature's status either way; the caller decides whether it joins the
/// body's history.
pub fn run_feature(
    kb: &mut dyn KernelBundle,
    registry: &mut ShapeRegistry,
    body: &mut Body,
    feature: &mut Feature,
    config: &EngineConfig,
) -> Result<(), FeatureError> {
    let mut state = TransactionState::Pending;
    debug!(feature = %feature.name, ?state, "transaction opened");
    let snapshot = BodySnapshot::capture(body, registry);
    let pre = PreState::capture(body, kb.as_introspect());

    state = TransactionState::Applying;
    debug!(feature = %feature.name, ?state, "applying feature");
    let outcome = apply_and_commit(kb, registry, body, feature, &pre, config);

    match outcome {
        Ok(stats) => {
            state = TransactionState::Ok;
            feature.resolution = stats;
            feature.mark_ok();
            info!(
                feature = %feature.name,
                ?state,
                generation = body.generation,
                by_history = stats.by_history,
                by_index = stats.by_index,
                "feature applied"
            );
            Ok(())
        }
        Err((err, stats)) => {
            state = TransactionState::Error;
            snapshot.restore(body, registry);
            feature.resolution = stats;
            feature.mark_error(err.code(), err.to_string());
            warn!(feature = %feature.name, ?state, code = err.code(), %err, "feature rolled back");
            Err(err)
        }
    }
}

type Failure = (FeatureError, ResolutionStats);

fn apply_and_commit(
    kb: &mut dyn KernelBundle,
    registry: &mut ShapeRegistry,
    body: &mut Body,
    feature: &Feature,
    pre: &PreState,
    config: &EngineConfig,
) -> Result<ResolutionStats, Failure> {
    let mut ctx = ApplyContext::new(kb, registry, body.solid.clone());
    let applied = feature.apply(&mut ctx);
    let stats = ctx.stats;
    let applied = applied.map_err(|e| (e, stats))?;

    let new_solid = applied.result.handle.clone();
    body.solid = Some(new_solid.clone());

    let introspect: &dyn KernelIntrospect = kb.as_introspect();
    if let Some(reason) =
        has_transaction_regression(body, pre, introspect, config.validate_results)
    {
        return Err((
            FeatureError::Regression {
                code: status_codes::TRANSACTION_REGRESSION,
                reason,
            },
            stats,
        ));
    }

    if let (Some(magnitude), Some(before)) = (feature.kind.local_modifier_magnitude(), pre.signature)
    {
        let after = introspect
            .bounding_box(&new_solid)
            .map_err(|e| (FeatureError::Op(e.into()), stats))?;
        if let Some(reason) =
            check_local_modifier_scale(&before.bbox, &after, magnitude, &config.local_modifier)
        {
            return Err((
                FeatureError::Regression {
                    code: status_codes::LOCAL_MODIFIER_SCALE_DRIFT,
                    reason,
                },
                stats,
            ));
        }
    }

    let successors = registry
        .register_solid(introspect, &new_solid, feature.id)
        .map_err(|e| (FeatureError::from(e), stats))?;
    registry.record_operation(OperationInput {
        operation_type: applied.operation_type,
        feature_id: feature.id,
        predecessors: body.shape_map.clone(),
        successors: successors.clone(),
        kernel_history: applied.result.kernel_history().cloned(),
        derived_history: applied.result.history,
        metadata: applied.metadata,
    });

    body.shape_map = successors;
    body.generation += 1;
    body.mesh_generation += 1;
    Ok(stats)
}
