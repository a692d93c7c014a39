use std::f64::consts::TAU;

use brep_kernel::KernelSolidHandle;
use tnp_types::{math, Transform};
use tracing::debug;

use crate::diff;
use crate::kernel_ext::{timed, KernelBundle};
use crate::types::{OpError, OpResult, PatternSpec};

/// Placement of each copy (the original, at index 0, is not listed).
fn copy_transforms(spec: &PatternSpec) -> Result<Vec<Transform>, OpError> {
    match spec {
        PatternSpec::Linear {
            direction,
            spacing,
            count,
        } => {
            if *count < 2 {
                return Err(OpError::invalid("pattern needs at least 2 instances"));
            }
            let dir = math::normalize(*direction)
                .ok_or_else(|| OpError::invalid("pattern direction is zero"))?;
            if !spacing.is_finite() || *spacing == 0.0 {
                return Err(OpError::invalid("pattern spacing must be non-zero"));
            }
            Ok((1..*count)
                .map(|i| Transform::Translate {
                    vector: math::scale(dir, spacing * i as f64),
                })
                .collect())
        }
        PatternSpec::Circular {
            axis_origin,
            axis_dir,
            count,
            angle,
        } => {
            if *count < 2 {
                return Err(OpError::invalid("pattern needs at least 2 instances"));
            }
            if math::normalize(*axis_dir).is_none() {
                return Err(OpError::invalid("pattern axis is zero"));
            }
            if !angle.is_finite() || *angle == 0.0 {
                return Err(OpError::invalid("pattern angle must be non-zero"));
            }
            let step = if (angle.abs() - TAU).abs() < 1e-9 {
                angle / *count as f64
            } else {
                angle / (*count - 1) as f64
            };
            Ok((1..*count)
                .map(|i| Transform::Rotate {
                    origin: *axis_origin,
                    axis: *axis_dir,
                    angle: step * i as f64,
                })
                .collect())
        }
    }
}

/// Replicate a solid and union every copy into it.
pub fn execute_pattern(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    spec: &PatternSpec,
) -> Result<OpResult, OpError> {
    let transforms = copy_transforms(spec)?;
    let before = diff::snapshot(kb.as_introspect(), solid);

    let mut current = solid.clone();
    let mut total_ms = 0.0;
    for t in &transforms {
        let (result, ms) = timed(|| -> Result<KernelSolidHandle, OpError> {
            let copy = kb.transform(solid, t)?;
            Ok(kb.boolean_union(&current, &copy)?)
        });
        current = result?;
        total_ms += ms;
    }
    debug!(copies = transforms.len(), "pattern applied");

    let after = diff::snapshot(kb.as_introspect(), &current);
    Ok(OpResult::derived(
        current,
        diff::diff(&before, &after, &[]),
        total_ms,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_full_turn_does_not_double_first() {
        let spec = PatternSpec::Circular {
            axis_origin: [0.0; 3],
            axis_dir: [0.0, 0.0, 1.0],
            count: 4,
            angle: TAU,
        };
        let ts = copy_transforms(&spec).unwrap();
        assert_eq!(ts.len(), 3);
        match &ts[2] {
            Transform::Rotate { angle, .. } => assert!((angle - 1.5 * std::f64::consts::PI).abs() < 1e-12),
            other => panic!("expected rotation, got {:?}", other),
        }
    }

    #[test]
    fn circular_partial_ends_at_angle() {
        let spec = PatternSpec::Circular {
            axis_origin: [0.0; 3],
            axis_dir: [0.0, 0.0, 1.0],
            count: 3,
            angle: 1.0,
        };
        let ts = copy_transforms(&spec).unwrap();
        match ts.last() {
            Some(Transform::Rotate { angle, .. }) => assert!((angle - 1.0).abs() < 1e-12),
            other => panic!("expected rotation, got {:?}", other),
        }
    }

    #[test]
    fn linear_rejects_single_instance() {
        let spec = PatternSpec::Linear {
            direction: [1.0, 0.0, 0.0],
            spacing: 2.0,
            count: 1,
        };
        assert!(copy_transforms(&spec).is_err());
    }
}
