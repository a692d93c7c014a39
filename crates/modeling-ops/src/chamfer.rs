use brep_kernel::{KernelId, KernelSolidHandle};

use crate::diff;
use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

/// Execute a chamfer operation on specified edges of a solid.
pub fn execute_chamfer(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    edges: &[KernelId],
    distance: f64,
) -> Result<OpResult, OpError> {
    if !distance.is_finite() || distance <= 0.0 {
        return Err(OpError::invalid("chamfer distance must be positive"));
    }
    if edges.is_empty() {
        return Err(OpError::empty("edges"));
    }

    let before = diff::snapshot(kb.as_introspect(), solid);
    let (result, ms) = timed(|| kb.chamfer_edges(solid, edges, distance));
    let handle = result?;
    let after = diff::snapshot(kb.as_introspect(), &handle);

    Ok(OpResult::derived(handle, diff::diff(&before, &after, edges), ms))
}
