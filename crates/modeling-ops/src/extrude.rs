//! Profile-driven solids: extrude, sweep, loft.

use brep_kernel::ShapeHistory;

use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult};

fn check_profile(profile: &[[f64; 3]]) -> Result<(), OpError> {
    if profile.len() < 3 {
        return Err(OpError::invalid("profile needs at least 3 points"));
    }
    if profile.iter().flatten().any(|c| !c.is_finite()) {
        return Err(OpError::invalid("profile has non-finite coordinates"));
    }
    Ok(())
}

/// Extrude a closed planar polygon along `direction` by `depth`.
pub fn execute_extrude(
    kb: &mut dyn KernelBundle,
    profile: &[[f64; 3]],
    direction: [f64; 3],
    depth: f64,
) -> Result<OpResult, OpError> {
    check_profile(profile)?;
    if !depth.is_finite() || depth == 0.0 {
        return Err(OpError::invalid("extrude depth must be non-zero"));
    }
    let (result, ms) = timed(|| kb.extrude_polygon(profile, direction, depth));
    Ok(OpResult::derived(result?, ShapeHistory::default(), ms))
}

/// Sweep a closed planar polygon along a path.
pub fn execute_sweep(
    kb: &mut dyn KernelBundle,
    profile: &[[f64; 3]],
    path: &[[f64; 3]],
) -> Result<OpResult, OpError> {
    check_profile(profile)?;
    if path.len() < 2 {
        return Err(OpError::invalid("sweep path needs at least 2 points"));
    }
    let (result, ms) = timed(|| kb.sweep_polygon(profile, path));
    Ok(OpResult::derived(result?, ShapeHistory::default(), ms))
}

/// Loft through two or more closed sections.
pub fn execute_loft(
    kb: &mut dyn KernelBundle,
    sections: &[Vec<[f64; 3]>],
) -> Result<OpResult, OpError> {
    if sections.len() < 2 {
        return Err(OpError::invalid("loft needs at least 2 sections"));
    }
    for section in sections {
        check_profile(section)?;
    }
    let (result, ms) = timed(|| kb.loft(sections));
    Ok(OpResult::derived(result?, ShapeHistory::default(), ms))
}
