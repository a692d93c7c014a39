use brep_kernel::ShapeHistory;

use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

/// Axis-aligned box from `corner` spanning `size`.
pub fn execute_box(
    kb: &mut dyn KernelBundle,
    corner: [f64; 3],
    size: [f64; 3],
) -> Result<OpResult, OpError> {
    if size.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(OpError::invalid("box dimensions must be positive"));
    }
    let (result, ms) = timed(|| kb.make_box(corner, size));
    Ok(OpResult::derived(result?, ShapeHistory::default(), ms))
}

/// Right circular cylinder on `base` along `axis`.
pub fn execute_cylinder(
    kb: &mut dyn KernelBundle,
    base: [f64; 3],
    axis: [f64; 3],
    radius: f64,
    height: f64,
) -> Result<OpResult, OpError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(OpError::invalid("cylinder radius must be positive"));
    }
    if !height.is_finite() || height <= 0.0 {
        return Err(OpError::invalid("cylinder height must be positive"));
    }
    let (result, ms) = timed(|| kb.make_cylinder(base, axis, radius, height));
    Ok(OpResult::derived(result?, ShapeHistory::default(), ms))
}
