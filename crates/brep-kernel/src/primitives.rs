//! Higher-level primitive builders on top of truck's sweep API.
//!
//! truck has no built-in box or cylinder, so everything is successive sweeps.

use std::f64::consts::PI;
use truck_modeling::builder;
use truck_modeling::topology::{Edge, Face, Solid, Wire};
use truck_modeling::{EuclideanSpace, InnerSpace, Point3, Rad, Vector3};

use crate::types::KernelError;

/// Box via successive translational sweeps, from `corner` to `corner + size`.
pub fn make_box(corner: [f64; 3], size: [f64; 3]) -> Solid {
    let v = builder::vertex(Point3::new(corner[0], corner[1], corner[2]));
    let edge = builder::tsweep(&v, Vector3::new(size[0], 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, size[1], 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, size[2]))
}

/// Cylinder: circle wire → face → translational sweep.
/// Base centered at the origin in the XY plane, extending along +Z.
pub fn make_cylinder(radius: f64, height: f64) -> Result<Solid, KernelError> {
    let v = builder::vertex(Point3::new(radius, 0.0, 0.0));
    let wire = builder::rsweep(&v, Point3::origin(), Vector3::unit_z(), Rad(2.0 * PI));
    let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::Other {
        message: format!("failed to create circular face: {}", e),
    })?;
    Ok(builder::tsweep(&face, Vector3::new(0.0, 0.0, height)))
}

/// Planar face bounded by a closed polygon. Consecutive edges share vertices.
pub fn polygon_face(points: &[[f64; 3]]) -> Result<Face, KernelError> {
    if points.len() < 3 {
        return Err(KernelError::invalid("profile needs at least 3 points"));
    }
    let pts: Vec<Point3> = points
        .iter()
        .map(|p| Point3::new(p[0], p[1], p[2]))
        .collect();
    let vertices: Vec<_> = pts.iter().map(|&p| builder::vertex(p)).collect();
    let n = pts.len();
    let edges: Vec<Edge> = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            Edge::new(
                &vertices[i],
                &vertices[j],
                truck_modeling::geometry::Curve::Line(truck_modeling::geometry::Line(
                    pts[i], pts[j],
                )),
            )
        })
        .collect();
    let wire = Wire::from_iter(edges);
    builder::try_attach_plane(&[wire]).map_err(|e| KernelError::Other {
        message: format!("failed to create planar face: {}", e),
    })
}

/// Rotation taking +Z onto `axis`, as (rotation axis, angle).
/// `None` when no rotation is needed.
pub fn align_z_to(axis: Vector3) -> Option<(Vector3, f64)> {
    let axis = axis.normalize();
    let z = Vector3::unit_z();
    let cos = z.dot(axis).clamp(-1.0, 1.0);
    if cos > 1.0 - 1e-12 {
        return None;
    }
    if cos < -1.0 + 1e-12 {
        return Some((Vector3::unit_x(), PI));
    }
    Some((z.cross(axis).normalize(), cos.acos()))
}
