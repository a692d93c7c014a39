use serde::{Deserialize, Serialize};

use crate::math::{self, Vec3};

/// A rigid or similarity transform applied to a whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Transform {
    Translate {
        vector: Vec3,
    },
    /// Rotation by `angle` radians about the axis through `origin`.
    Rotate {
        origin: Vec3,
        axis: Vec3,
        angle: f64,
    },
    /// Uniform scale about `center`.
    Scale {
        center: Vec3,
        factor: f64,
    },
    /// Reflection across the plane through `origin` with normal `normal`.
    Mirror {
        origin: Vec3,
        normal: Vec3,
    },
}

impl Transform {
    /// Algebraic inverse, when one exists.
    ///
    /// Translation is negated, rotation angle negated, scale factor
    /// inverted, and a mirror is its own inverse. Degenerate transforms
    /// (zero scale, zero-length axis or normal) have none.
    pub fn inverse(&self) -> Option<Transform> {
        match self {
            Transform::Translate { vector } => Some(Transform::Translate {
                vector: math::scale(*vector, -1.0),
            }),
            Transform::Rotate {
                origin,
                axis,
                angle,
            } => {
                math::normalize(*axis)?;
                Some(Transform::Rotate {
                    origin: *origin,
                    axis: *axis,
                    angle: -angle,
                })
            }
            Transform::Scale { center, factor } => {
                if factor.abs() < 1e-12 {
                    None
                } else {
                    Some(Transform::Scale {
                        center: *center,
                        factor: 1.0 / factor,
                    })
                }
            }
            Transform::Mirror { origin, normal } => {
                math::normalize(*normal)?;
                Some(Transform::Mirror {
                    origin: *origin,
                    normal: *normal,
                })
            }
        }
    }

    /// Apply to a point. Degenerate axes and normals leave the point unchanged.
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        match self {
            Transform::Translate { vector } => math::add(p, *vector),
            Transform::Rotate {
                origin,
                axis,
                angle,
            } => match math::normalize(*axis) {
                Some(axis) => math::rotate_about(p, *origin, axis, *angle),
                None => p,
            },
            Transform::Scale { center, factor } => {
                math::add(*center, math::scale(math::sub(p, *center), *factor))
            }
            Transform::Mirror { origin, normal } => match math::normalize(*normal) {
                Some(n) => {
                    let dist = math::dot(math::sub(p, *origin), n);
                    math::sub(p, math::scale(n, 2.0 * dist))
                }
                None => p,
            },
        }
    }

    /// Apply to a direction (no translation part; scale keeps the sign).
    pub fn apply_direction(&self, d: Vec3) -> Vec3 {
        match self {
            Transform::Translate { .. } => d,
            Transform::Rotate { axis, angle, .. } => match math::normalize(*axis) {
                Some(axis) => math::rotate_about(d, [0.0; 3], axis, *angle),
                None => d,
            },
            Transform::Scale { factor, .. } => {
                if *factor < 0.0 {
                    math::scale(d, -1.0)
                } else {
                    d
                }
            }
            Transform::Mirror { normal, .. } => match math::normalize(*normal) {
                Some(n) => math::sub(d, math::scale(n, 2.0 * math::dot(d, n))),
                None => d,
            },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Transform::Translate { .. } => "translate",
            Transform::Rotate { .. } => "rotate",
            Transform::Scale { .. } => "scale",
            Transform::Mirror { .. } => "mirror",
        }
    }
}
