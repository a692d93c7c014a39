//! Persistent naming for BREP faces and edges.
//!
//! Kernel entity ids do not survive regeneration. This crate gives faces
//! and edges identities that do: content hashes of their geometry
//! ([`face_hash`]), selection-time references that re-find an entity in
//! a rebuilt solid ([`reference`]), positional indexing as a last resort
//! ([`topology_index`]) and a registry recording which feature produced
//! which shapes and how they descend from one another ([`registry`]).

pub mod config;
pub mod error;
pub mod face_hash;
pub mod reference;
pub mod registry;
pub mod topology_index;

pub use config::{ResolveConfig, SimilarityWeights};
pub use error::NamingError;
pub use face_hash::{compute_edge_hash, compute_face_hash, hash_edge_geometry, hash_face_geometry};
pub use reference::ShapeReference;
pub use registry::{
    OperationInput, OperationRecord, OperationType, RegistryCheckpoint, ShapeId, ShapeRecord,
    ShapeRegistry,
};
