use brep_kernel::{KernelId, KernelSolidHandle};
use tracing::debug;

use crate::diff;
use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

/// Offset one face of a solid along its normal.
///
/// Uses the kernel's history when it reports one; an empty kernel history
/// falls back to a snapshot diff seeded with the pushed face.
pub fn execute_push_pull(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    face: KernelId,
    distance: f64,
) -> Result<OpResult, OpError> {
    if !distance.is_finite() {
        return Err(OpError::invalid("push/pull distance must be finite"));
    }
    let before = diff::snapshot(kb.as_introspect(), solid);
    let (result, ms) = timed(|| kb.push_pull_face(solid, face, distance));
    let (handle, history) = result?;

    if history.is_empty() {
        debug!(?face, "kernel reported no push/pull history, diffing");
        let after = diff::snapshot(kb.as_introspect(), &handle);
        let derived = diff::diff(&before, &after, &[face]);
        return Ok(OpResult::derived(handle, derived, ms));
    }
    Ok(OpResult::from_kernel(handle, history, ms))
}
