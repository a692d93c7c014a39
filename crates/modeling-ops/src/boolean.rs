use brep_kernel::KernelSolidHandle;
use serde::{Deserialize, Serialize};

use crate::diff;
use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanKind {
    Union,
    Subtract,
    Intersect,
}

/// Execute a boolean operation between two solids.
/// Lineage is diffed against both operands.
pub fn execute_boolean(
    kb: &mut dyn KernelBundle,
    body_a: &KernelSolidHandle,
    body_b: &KernelSolidHandle,
    kind: BooleanKind,
) -> Result<OpResult, OpError> {
    let snap_a = diff::snapshot(kb.as_introspect(), body_a);
    let snap_b = diff::snapshot(kb.as_introspect(), body_b);
    let before = snap_a.merged(&snap_b);

    let (result, ms) = timed(|| match kind {
        BooleanKind::Union => kb.boolean_union(body_a, body_b),
        BooleanKind::Subtract => kb.boolean_subtract(body_a, body_b),
        BooleanKind::Intersect => kb.boolean_intersect(body_a, body_b),
    });
    let handle = result?;

    let after = diff::snapshot(kb.as_introspect(), &handle);
    Ok(OpResult::derived(handle, diff::diff(&before, &after, &[]), ms))
}

/// Combine a freshly built tool solid with a body's current solid.
///
/// An empty body takes a union tool as-is; cutting or intersecting
/// nothing is an error.
pub fn execute_combine(
    kb: &mut dyn KernelBundle,
    body: Option<&KernelSolidHandle>,
    tool: OpResult,
    kind: BooleanKind,
) -> Result<OpResult, OpError> {
    let Some(target) = body else {
        return match kind {
            BooleanKind::Union => Ok(tool),
            BooleanKind::Subtract | BooleanKind::Intersect => Err(OpError::invalid(
                "body has no solid to cut or intersect",
            )),
        };
    };
    let mut result = execute_boolean(kb, target, &tool.handle, kind)?;
    result.diagnostics.kernel_time_ms += tool.diagnostics.kernel_time_ms;
    result.diagnostics.warnings.extend(tool.diagnostics.warnings);
    Ok(result)
}
