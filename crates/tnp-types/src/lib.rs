//! Shared value types for the topological-naming workspace.
//!
//! Everything here is plain data: no kernel handles, no registry state.
//! Kernel-facing crates and the feature engine both depend on it.

pub mod bbox;
pub mod math;
pub mod shape;
pub mod status;
pub mod transform;

pub use bbox::BoundingBox;
pub use shape::*;
pub use status::*;
pub use transform::*;
