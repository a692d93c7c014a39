use brep_kernel::{KernelSolidHandle, SplitKeep};
use tnp_types::{math, Transform};

use crate::diff;
use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

/// Apply a rigid or similarity transform. Lineage is positional.
pub fn execute_transform(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    transform: &Transform,
) -> Result<OpResult, OpError> {
    if transform.inverse().is_none() {
        return Err(OpError::invalid(format!(
            "{} transform is degenerate",
            transform.kind_name()
        )));
    }
    let before = diff::snapshot(kb.as_introspect(), solid);
    let (result, ms) = timed(|| kb.transform(solid, transform));
    let handle = result?;
    let after = diff::snapshot(kb.as_introspect(), &handle);
    Ok(OpResult::derived(handle, diff::positional(&before, &after), ms))
}

/// Cut a solid by a plane, keeping one side.
pub fn execute_split(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    plane_origin: [f64; 3],
    plane_normal: [f64; 3],
    keep: SplitKeep,
) -> Result<OpResult, OpError> {
    if math::normalize(plane_normal).is_none() {
        return Err(OpError::invalid("split plane normal is zero"));
    }
    let before = diff::snapshot(kb.as_introspect(), solid);
    let (result, ms) = timed(|| kb.split(solid, plane_origin, plane_normal, keep));
    let handle = result?;
    let after = diff::snapshot(kb.as_introspect(), &handle);
    Ok(OpResult::derived(handle, diff::diff(&before, &after, &[]), ms))
}
