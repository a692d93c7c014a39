use brep_kernel::{KernelId, KernelSolidHandle};

use crate::diff;
use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

/// Hollow a solid, removing `faces_to_remove` as openings.
/// Inner faces are recorded as generated from the opening faces.
pub fn execute_shell(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    faces_to_remove: &[KernelId],
    thickness: f64,
) -> Result<OpResult, OpError> {
    if !thickness.is_finite() || thickness <= 0.0 {
        return Err(OpError::invalid("shell thickness must be positive"));
    }

    let before = diff::snapshot(kb.as_introspect(), solid);
    let (result, ms) = timed(|| kb.shell(solid, faces_to_remove, thickness));
    let handle = result?;
    let after = diff::snapshot(kb.as_introspect(), &handle);

    Ok(OpResult::derived(
        handle,
        diff::diff(&before, &after, faces_to_remove),
        ms,
    ))
}
