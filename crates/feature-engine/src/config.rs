//! Engine tunables.

use serde::{Deserialize, Serialize};
use shape_naming::ResolveConfig;

/// How far a fillet or chamfer may move the body's bounding box, as
/// `max(floor, factor * magnitude)` in model units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalModifierLimits {
    pub grow_floor: f64,
    pub grow_factor: f64,
    pub shrink_floor: f64,
    pub shrink_factor: f64,
}

impl Default for LocalModifierLimits {
    fn default() -> Self {
        Self {
            grow_floor: 0.20,
            grow_factor: 0.60,
            shrink_floor: 1.80,
            shrink_factor: 7.0,
        }
    }
}

impl LocalModifierLimits {
    pub fn max_growth(&self, magnitude: f64) -> f64 {
        self.grow_floor.max(self.grow_factor * magnitude)
    }

    pub fn max_shrink(&self, magnitude: f64) -> f64 {
        self.shrink_floor.max(self.shrink_factor * magnitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Used for every reference this engine resolves.
    pub resolve: ResolveConfig,
    pub local_modifier: LocalModifierLimits,
    /// Run the kernel's validity check after each operation.
    pub validate_results: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolve: ResolveConfig::default(),
            local_modifier: LocalModifierLimits::default(),
            validate_results: true,
        }
    }
}

impl EngineConfig {
    /// Skip validity checks, for kernels whose `validate` is slow or
    /// unreliable.
    pub fn unchecked() -> Self {
        Self {
            validate_results: false,
            ..Self::default()
        }
    }

    /// Exact references only; similarity matches count as unresolved.
    pub fn exact_references() -> Self {
        Self {
            resolve: ResolveConfig::exact_only(),
            ..Self::default()
        }
    }
}
