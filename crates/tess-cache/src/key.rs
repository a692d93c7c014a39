//! Content-derived cache keys.
//!
//! Kernel handles change on every rebuild, so entries are keyed by what the
//! solid looks like instead: topology counts plus volume and center of mass.

use std::fmt::Write;

use brep_kernel::{KernelError, KernelIntrospect, KernelSolidHandle};
use sha2::{Digest, Sha256};
use tnp_types::math::round_to;
use tnp_types::GeometryHash;

const DECIMALS: i32 = 6;

/// Hash of a whole solid's content.
pub fn solid_content_hash(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
) -> Result<GeometryHash, KernelError> {
    let props = introspect.mass_properties(solid)?;
    let mut text = format!(
        "{}|{}|{}",
        introspect.list_faces(solid).len(),
        introspect.list_edges(solid).len(),
        introspect.list_vertices(solid).len(),
    );
    let values = [
        props.volume,
        props.center_of_mass[0],
        props.center_of_mass[1],
        props.center_of_mass[2],
    ];
    for v in values {
        if !v.is_finite() {
            return Err(KernelError::Other {
                message: "non-finite mass properties".to_string(),
            });
        }
        let _ = write!(text, "|{:.6}", round_to(v, DECIMALS));
    }

    let hex = format!("{:x}", Sha256::digest(text.as_bytes()));
    Ok(GeometryHash::from_hex(hex[..GeometryHash::LEN].to_string()))
}

/// Bit pattern of a float rounded to 6 decimals, usable as a map key.
pub(crate) fn quantize(value: f64) -> u64 {
    round_to(value, DECIMALS).to_bits()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshKey {
    pub hash: GeometryHash,
    pub quality: u64,
    pub angular_tolerance: u64,
    pub cache_version: u32,
}

impl MeshKey {
    pub fn new(hash: GeometryHash, quality: f64, angular_tolerance: f64, cache_version: u32) -> Self {
        Self {
            hash,
            quality: quantize(quality),
            angular_tolerance: quantize(angular_tolerance),
            cache_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub hash: GeometryHash,
    pub cache_version: u32,
}
