use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Mesh pool cap (entries).
    pub max_mesh_entries: usize,
    /// Edge pool cap (entries).
    pub max_edge_entries: usize,
    /// A pool over its cap is evicted down to `cap * evict_ratio`.
    pub evict_ratio: f64,
    /// Dihedral angle (degrees) above which an edge is drawn.
    pub feature_edge_angle_deg: f64,
    /// Part of every key. Bumping it invalidates everything.
    pub cache_version: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_mesh_entries: 64,
            max_edge_entries: 64,
            evict_ratio: 0.75,
            feature_edge_angle_deg: 30.0,
            cache_version: 1,
        }
    }
}

impl CacheConfig {
    /// Both pools capped at `entries`.
    pub fn with_capacity(entries: usize) -> Self {
        Self {
            max_mesh_entries: entries,
            max_edge_entries: entries,
            ..Self::default()
        }
    }

    /// Size a pool is trimmed to once it exceeds `cap`.
    pub(crate) fn eviction_target(&self, cap: usize) -> usize {
        let ratio = self.evict_ratio.clamp(0.0, 1.0);
        ((cap as f64) * ratio).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_target_is_three_quarters() {
        let config = CacheConfig::with_capacity(8);
        assert_eq!(config.eviction_target(8), 6);
        assert_eq!(config.eviction_target(1), 0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"max_mesh_entries": 4}"#).unwrap();
        assert_eq!(config.max_mesh_entries, 4);
        assert_eq!(config.max_edge_entries, 64);
        assert_eq!(config.cache_version, 1);
    }
}
