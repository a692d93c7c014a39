//! TruckKernel: real geometry kernel wrapping truck's API.
//!
//! truck covers primitives, extrusion, straight sweeps, booleans and rigid
//! transforms. Local modifiers (push/pull, fillet, chamfer, shell), split,
//! loft and mirroring report `NotSupported`.

use crate::primitives;
use crate::tessellation;
use crate::traits::Kernel;
use crate::types::*;
use std::collections::HashMap;
use tracing::debug;

// Import truck types selectively to avoid shadowing std::result::Result
use truck_modeling::builder;
use truck_modeling::topology::Solid;
use truck_modeling::{InnerSpace, Point3, Rad, Vector3};

/// Tolerance handed to truck's boolean operations.
const BOOLEAN_TOLERANCE: f64 = 0.05;

/// Real geometry kernel backed by the truck BREP library.
pub struct TruckKernel {
    next_handle: u64,
    solids: HashMap<u64, Solid>,
}

fn vec3(v: [f64; 3]) -> Vector3 {
    Vector3::new(v[0], v[1], v[2])
}

fn point3(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            solids: HashMap::new(),
        }
    }

    fn alloc_handle(&mut self) -> KernelSolidHandle {
        let h = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    pub(crate) fn store_solid(&mut self, solid: Solid) -> KernelSolidHandle {
        let handle = self.alloc_handle();
        debug!(handle = handle.id(), "stored truck solid");
        self.solids.insert(handle.id(), solid);
        handle
    }

    pub(crate) fn get_solid(&self, handle: &KernelSolidHandle) -> Option<&Solid> {
        self.solids.get(&handle.id())
    }

    fn cloned(&self, handle: &KernelSolidHandle) -> Result<Solid, KernelError> {
        self.get_solid(handle)
            .cloned()
            .ok_or(KernelError::SolidNotFound { handle: handle.id() })
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for TruckKernel {
    fn make_box(
        &mut self,
        corner: [f64; 3],
        size: [f64; 3],
    ) -> Result<KernelSolidHandle, KernelError> {
        if size.iter().any(|s| s.is_nan() || *s <= 0.0) {
            return Err(KernelError::invalid("box dimensions must be positive"));
        }
        Ok(self.store_solid(primitives::make_box(corner, size)))
    }

    fn make_cylinder(
        &mut self,
        base_center: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        if radius.is_nan() || radius <= 0.0 || height.is_nan() || height <= 0.0 {
            return Err(KernelError::invalid(
                "cylinder radius and height must be positive",
            ));
        }
        let axis = vec3(axis);
        if axis.magnitude() < 1e-12 {
            return Err(KernelError::invalid("cylinder axis is zero"));
        }
        let mut solid = primitives::make_cylinder(radius, height)?;
        if let Some((rot_axis, angle)) = primitives::align_z_to(axis) {
            solid = builder::rotated(&solid, Point3::new(0.0, 0.0, 0.0), rot_axis, Rad(angle));
        }
        solid = builder::translated(&solid, vec3(base_center));
        Ok(self.store_solid(solid))
    }

    fn extrude_polygon(
        &mut self,
        profile: &[[f64; 3]],
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let dir = vec3(direction);
        if dir.magnitude() < 1e-12 {
            return Err(KernelError::invalid("extrude direction has zero length"));
        }
        if depth.is_nan() || depth.abs() < 1e-12 {
            return Err(KernelError::invalid("extrude depth must be non-zero"));
        }
        let face = primitives::polygon_face(profile)?;
        let solid = builder::tsweep(&face, dir.normalize() * depth);
        Ok(self.store_solid(solid))
    }

    fn push_pull_face(
        &mut self,
        _solid: &KernelSolidHandle,
        _face: KernelId,
        _distance: f64,
    ) -> Result<(KernelSolidHandle, ShapeHistory), KernelError> {
        Err(KernelError::not_supported("push_pull_face"))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.cloned(a)?;
        let solid_b = self.cloned(b)?;
        let result = truck_shapeops::or(&solid_a, &solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck or() returned None".to_string(),
            }
        })?;
        Ok(self.store_solid(result))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.cloned(a)?;
        let mut solid_b = self.cloned(b)?;

        // Subtraction = A ∩ ¬B. not() mutates in place.
        solid_b.not();
        let result = truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck and() returned None for subtraction".to_string(),
            }
        })?;
        Ok(self.store_solid(result))
    }

    fn boolean_intersect(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.cloned(a)?;
        let solid_b = self.cloned(b)?;
        let result = truck_shapeops::and(&solid_a, &solid_b, BOOLEAN_TOLERANCE).ok_or_else(|| {
            KernelError::BooleanFailed {
                reason: "truck and() returned None".to_string(),
            }
        })?;
        Ok(self.store_solid(result))
    }

    fn fillet_edges(
        &mut self,
        _solid: &KernelSolidHandle,
        _edges: &[KernelId],
        _radius: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        Err(KernelError::not_supported("fillet_edges"))
    }

    fn chamfer_edges(
        &mut self,
        _solid: &KernelSolidHandle,
        _edges: &[KernelId],
        _distance: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        Err(KernelError::not_supported("chamfer_edges"))
    }

    fn shell(
        &mut self,
        _solid: &KernelSolidHandle,
        _faces_to_remove: &[KernelId],
        _thickness: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        Err(KernelError::not_supported("shell"))
    }

    fn transform(
        &mut self,
        solid: &KernelSolidHandle,
        transform: &Transform,
    ) -> Result<KernelSolidHandle, KernelError> {
        let source = self.cloned(solid)?;
        let result = match transform {
            Transform::Translate { vector } => builder::translated(&source, vec3(*vector)),
            Transform::Rotate {
                origin,
                axis,
                angle,
            } => {
                let axis = vec3(*axis);
                if axis.magnitude() < 1e-12 {
                    return Err(KernelError::invalid("rotation axis is zero"));
                }
                builder::rotated(&source, point3(*origin), axis.normalize(), Rad(*angle))
            }
            Transform::Scale { center, factor } => {
                if factor.is_nan() || *factor <= 0.0 {
                    return Err(KernelError::invalid("scale factor must be positive"));
                }
                builder::scaled(
                    &source,
                    point3(*center),
                    Vector3::new(*factor, *factor, *factor),
                )
            }
            Transform::Mirror { .. } => return Err(KernelError::not_supported("mirror")),
        };
        Ok(self.store_solid(result))
    }

    fn split(
        &mut self,
        _solid: &KernelSolidHandle,
        _plane_origin: [f64; 3],
        _plane_normal: [f64; 3],
        _keep: SplitKeep,
    ) -> Result<KernelSolidHandle, KernelError> {
        Err(KernelError::not_supported("split"))
    }

    fn sweep_polygon(
        &mut self,
        profile: &[[f64; 3]],
        path: &[[f64; 3]],
    ) -> Result<KernelSolidHandle, KernelError> {
        match path.len() {
            0 | 1 => Err(KernelError::invalid("sweep path needs two points")),
            2 => {
                let face = primitives::polygon_face(profile)?;
                let sweep = vec3(path[1]) - vec3(path[0]);
                if sweep.magnitude() < 1e-12 {
                    return Err(KernelError::invalid("sweep path has zero length"));
                }
                Ok(self.store_solid(builder::tsweep(&face, sweep)))
            }
            _ => Err(KernelError::not_supported("sweep along a multi-segment path")),
        }
    }

    fn loft(&mut self, _sections: &[Vec<[f64; 3]>]) -> Result<KernelSolidHandle, KernelError> {
        Err(KernelError::not_supported("loft"))
    }

    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        let truck_solid = self
            .get_solid(solid)
            .ok_or(KernelError::SolidNotFound { handle: solid.id() })?;
        tessellation::tessellate_solid(truck_solid, solid, tolerance)
    }

    fn tessellate_merged(
        &mut self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        let truck_solid = self
            .get_solid(solid)
            .ok_or(KernelError::SolidNotFound { handle: solid.id() })?;
        tessellation::tessellate_solid_merged(truck_solid, solid, tolerance)
    }
}
