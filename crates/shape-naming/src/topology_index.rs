//! Positional lookup of faces and edges.
//!
//! Indices follow the kernel's enumeration order and mean nothing outside
//! the solid they were taken from. They are the last resort when a
//! reference and its history both fail.

use brep_kernel::{KernelId, KernelIntrospect, KernelSolidHandle};

pub fn face_count(introspect: &dyn KernelIntrospect, solid: &KernelSolidHandle) -> usize {
    introspect.list_faces(solid).len()
}

pub fn edge_count(introspect: &dyn KernelIntrospect, solid: &KernelSolidHandle) -> usize {
    introspect.list_edges(solid).len()
}

pub fn face_from_index(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    index: usize,
) -> Option<KernelId> {
    introspect.list_faces(solid).get(index).copied()
}

pub fn edge_from_index(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    index: usize,
) -> Option<KernelId> {
    introspect.list_edges(solid).get(index).copied()
}

pub fn face_index_of(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    face: KernelId,
) -> Option<usize> {
    introspect.list_faces(solid).iter().position(|f| *f == face)
}

pub fn edge_index_of(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    edge: KernelId,
) -> Option<usize> {
    introspect.list_edges(solid).iter().position(|e| *e == edge)
}
