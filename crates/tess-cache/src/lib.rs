//! Content-keyed tessellation cache.
//!
//! Meshes and feature-edge overlays are cached under a hash of the solid's
//! content rather than its kernel handle, so a rebuild that reproduces the
//! same solid reuses the old mesh and a changed solid never sees a stale
//! one.

pub mod cache;
pub mod config;
pub mod key;
pub mod lru;
pub mod mesh_edges;

pub use cache::{CacheStats, SharedTessellationCache, TessellationCache};
pub use config::CacheConfig;
pub use key::{solid_content_hash, EdgeKey, MeshKey};
pub use lru::LruPool;
pub use mesh_edges::mesh_feature_edges;
