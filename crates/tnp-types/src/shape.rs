use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of topological entity a reference or registry record names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeType {
    Face,
    Edge,
}

impl Default for ShapeType {
    fn default() -> Self {
        ShapeType::Face
    }
}

/// Surface (for faces) or curve (for edges) classification tag.
///
/// The string form is part of the face hash input, so the tags must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceType {
    Plane,
    Cylinder,
    Cone,
    Sphere,
    Torus,
    Bspline,
    Line,
    Circle,
    Other,
}

impl SurfaceType {
    pub fn as_tag(&self) -> &'static str {
        match self {
            SurfaceType::Plane => "plane",
            SurfaceType::Cylinder => "cylinder",
            SurfaceType::Cone => "cone",
            SurfaceType::Sphere => "sphere",
            SurfaceType::Torus => "torus",
            SurfaceType::Bspline => "bspline",
            SurfaceType::Line => "line",
            SurfaceType::Circle => "circle",
            SurfaceType::Other => "other",
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// 16-hex-char content digest of a face or edge.
///
/// The all-zero value is the "unknown" sentinel produced when a kernel query
/// fails. A sentinel never matches anything, including another sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryHash(String);

impl GeometryHash {
    pub const SENTINEL_STR: &'static str = "0000000000000000";
    pub const LEN: usize = 16;

    pub fn sentinel() -> Self {
        GeometryHash(Self::SENTINEL_STR.to_string())
    }

    /// Wrap a digest string. Anything that is not 16 hex chars becomes the sentinel.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        let hex = hex.into();
        if hex.len() == Self::LEN && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            GeometryHash(hex.to_ascii_lowercase())
        } else {
            Self::sentinel()
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::SENTINEL_STR
    }

    /// Hash equality that treats the sentinel as matching nothing.
    pub fn matches(&self, other: &GeometryHash) -> bool {
        !self.is_sentinel() && !other.is_sentinel() && self.0 == other.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeometryHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_never_matches() {
        let a = GeometryHash::sentinel();
        let b = GeometryHash::sentinel();
        assert!(a.is_sentinel());
        assert!(!a.matches(&b));
    }

    #[test]
    fn malformed_hex_becomes_sentinel() {
        assert!(GeometryHash::from_hex("xyz").is_sentinel());
        assert!(GeometryHash::from_hex("0123456789abcdefff").is_sentinel());
        let h = GeometryHash::from_hex("0123456789ABCDEF");
        assert_eq!(h.as_str(), "0123456789abcdef");
        assert!(h.matches(&GeometryHash::from_hex("0123456789abcdef")));
    }

    #[test]
    fn surface_type_serializes_lowercase() {
        let json = serde_json::to_string(&SurfaceType::Bspline).unwrap();
        assert_eq!(json, "\"bspline\"");
        assert_eq!(SurfaceType::Cylinder.to_string(), "cylinder");
    }

    #[test]
    fn hash_serializes_as_plain_string() {
        let h = GeometryHash::from_hex("00000000000000ff");
        assert_eq!(serde_json::to_string(&h).unwrap(), "\"00000000000000ff\"");
    }
}
