//! Turning a feature's stored references into kernel entities of the
//! current solid.

use brep_kernel::{KernelId, KernelIntrospect, KernelSolidHandle};
use shape_naming::topology_index::{edge_from_index, face_from_index};
use shape_naming::{ShapeReference, ShapeRegistry};
use tnp_types::ShapeType;
use tracing::debug;

use crate::types::FeatureError;

/// Which stage of the cascade resolved a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Reference,
    History,
    Index,
}

/// Per-application tally of how references resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub by_reference: usize,
    pub by_history: usize,
    pub by_index: usize,
    pub unresolved: usize,
}

impl ResolutionStats {
    /// References that needed the positional fallback or failed outright.
    pub fn broken_count(&self) -> usize {
        self.by_index + self.unresolved
    }

    fn record(&mut self, via: ResolvedVia) {
        match via {
            ResolvedVia::Reference => self.by_reference += 1,
            ResolvedVia::History => self.by_history += 1,
            ResolvedVia::Index => self.by_index += 1,
        }
    }
}

/// Resolve one reference: the reference itself, then the registry's
/// lineage, then the stored topology index.
pub fn resolve_reference(
    introspect: &dyn KernelIntrospect,
    registry: &ShapeRegistry,
    solid: &KernelSolidHandle,
    reference: &ShapeReference,
    index: Option<usize>,
) -> Option<(KernelId, ResolvedVia)> {
    if let Some(id) = reference.resolve(introspect, solid, registry.config()) {
        return Some((id, ResolvedVia::Reference));
    }
    if let Some(id) = registry.resolve_with_history(introspect, solid, reference) {
        debug!(hash = %reference.geometry_hash, "reference resolved through history");
        return Some((id, ResolvedVia::History));
    }
    let positional = index.and_then(|i| match reference.shape_type {
        ShapeType::Face => face_from_index(introspect, solid, i),
        ShapeType::Edge => edge_from_index(introspect, solid, i),
    });
    if let Some(id) = positional {
        debug!(hash = %reference.geometry_hash, ?index, "reference fell back to topology index");
        return Some((id, ResolvedVia::Index));
    }
    None
}

/// Resolve a selection, tallying into `stats`. Fails on the first
/// reference nothing can resolve.
pub(crate) fn resolve_selection(
    introspect: &dyn KernelIntrospect,
    registry: &ShapeRegistry,
    solid: &KernelSolidHandle,
    references: &[ShapeReference],
    indices: &[usize],
    stats: &mut ResolutionStats,
) -> Result<Vec<KernelId>, FeatureError> {
    let mut out = Vec::with_capacity(references.len());
    for (i, reference) in references.iter().enumerate() {
        match resolve_reference(introspect, registry, solid, reference, indices.get(i).copied()) {
            Some((id, via)) => {
                stats.record(via);
                out.push(id);
            }
            None => {
                stats.unresolved += 1;
                let what = match reference.shape_type {
                    ShapeType::Face => "face",
                    ShapeType::Edge => "edge",
                };
                return Err(FeatureError::ReferenceUnresolved {
                    what: format!("{what} {} ({})", i, reference.geometry_hash),
                });
            }
        }
    }
    Ok(out)
}
