use brep_kernel::{KernelId, KernelSolidHandle};

use crate::diff;
use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

/// Execute a fillet operation on specified edges of a solid.
/// New blend faces are recorded as generated from the selected edges.
pub fn execute_fillet(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    edges: &[KernelId],
    radius: f64,
) -> Result<OpResult, OpError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(OpError::invalid("fillet radius must be positive"));
    }
    if edges.is_empty() {
        return Err(OpError::empty("edges"));
    }

    let before = diff::snapshot(kb.as_introspect(), solid);
    let (result, ms) = timed(|| kb.fillet_edges(solid, edges, radius));
    let handle = result?;
    let after = diff::snapshot(kb.as_introspect(), &handle);

    Ok(OpResult::derived(handle, diff::diff(&before, &after, edges), ms))
}
