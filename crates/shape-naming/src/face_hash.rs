//! Content hashes of faces and edges.
//!
//! A hash is the first 8 bytes of the SHA-256 of a canonical string built
//! from the entity's classification and measurements, every number rounded
//! to 3 decimals. Identical geometry in two kernel sessions hashes the same.

use std::fmt::Write as _;

use brep_kernel::{
    CurveGeometry, EdgeGeometry, FaceGeometry, KernelId, KernelIntrospect, SurfaceGeometry,
};
use sha2::{Digest, Sha256};
use tnp_types::math::round_to;
use tnp_types::GeometryHash;
use tracing::debug;

const DECIMALS: i32 = 3;

/// Hash of a face, or the sentinel when the kernel cannot describe it.
pub fn compute_face_hash(introspect: &dyn KernelIntrospect, face: KernelId) -> GeometryHash {
    match introspect.face_geometry(face) {
        Ok(geometry) => hash_face_geometry(&geometry),
        Err(err) => {
            debug!(face = face.0, %err, "face geometry unavailable, using sentinel hash");
            GeometryHash::sentinel()
        }
    }
}

/// Hash of an edge, or the sentinel when the kernel cannot describe it.
pub fn compute_edge_hash(introspect: &dyn KernelIntrospect, edge: KernelId) -> GeometryHash {
    match introspect.edge_geometry(edge) {
        Ok(geometry) => hash_edge_geometry(&geometry),
        Err(err) => {
            debug!(edge = edge.0, %err, "edge geometry unavailable, using sentinel hash");
            GeometryHash::sentinel()
        }
    }
}

pub fn hash_face_geometry(geometry: &FaceGeometry) -> GeometryHash {
    let mut canon = Canonical::new(geometry.surface.surface_type().as_tag());
    canon.push(geometry.area);
    canon.push_all(&geometry.center);
    canon.push_all(&geometry.bbox.min);
    canon.push_all(&geometry.bbox.max);
    match &geometry.surface {
        SurfaceGeometry::Plane { normal } => canon.push_all(normal),
        SurfaceGeometry::Cylinder { radius, axis } => {
            canon.push(*radius);
            canon.push_all(axis);
        }
        SurfaceGeometry::Cone { semi_angle } => canon.push(*semi_angle),
        SurfaceGeometry::Sphere { radius } => canon.push(*radius),
        SurfaceGeometry::Torus {
            major_radius,
            minor_radius,
        } => {
            canon.push(*major_radius);
            canon.push(*minor_radius);
        }
        SurfaceGeometry::Bspline | SurfaceGeometry::Other => {}
    }
    canon.finish()
}

pub fn hash_edge_geometry(geometry: &EdgeGeometry) -> GeometryHash {
    let mut canon = Canonical::new(geometry.curve.surface_type().as_tag());
    canon.push(geometry.length);
    canon.push_all(&geometry.midpoint);
    canon.push_all(&geometry.bbox.min);
    canon.push_all(&geometry.bbox.max);
    if let Some(direction) = geometry.direction {
        canon.push_all(&direction);
    }
    if let CurveGeometry::Circle { radius, axis } = &geometry.curve {
        canon.push(*radius);
        canon.push_all(axis);
    }
    canon.finish()
}

/// Accumulates the `|`-separated canonical string.
struct Canonical {
    text: String,
    finite: bool,
}

impl Canonical {
    fn new(tag: &str) -> Self {
        Self {
            text: tag.to_string(),
            finite: true,
        }
    }

    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            self.finite = false;
            return;
        }
        let _ = write!(self.text, "|{:.3}", round_to(value, DECIMALS));
    }

    fn push_all(&mut self, values: &[f64]) {
        for v in values {
            self.push(*v);
        }
    }

    fn finish(self) -> GeometryHash {
        if !self.finite {
            debug!(canonical = %self.text, "non-finite geometry, using sentinel hash");
            return GeometryHash::sentinel();
        }
        let hex = format!("{:x}", Sha256::digest(self.text.as_bytes()));
        GeometryHash::from_hex(hex[..GeometryHash::LEN].to_string())
    }
}
