use std::sync::Arc;

use brep_kernel::{EdgeRenderData, KernelIntrospect, KernelSolidHandle, RenderMesh};
use modeling_ops::KernelBundle;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tnp_types::GeometryHash;
use tracing::{debug, instrument, warn};

use crate::config::CacheConfig;
use crate::key::{solid_content_hash, EdgeKey, MeshKey};
use crate::lru::LruPool;
use crate::mesh_edges::mesh_feature_edges;

/// Counters since construction or the last [`TessellationCache::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub mesh_hits: u64,
    pub mesh_misses: u64,
    pub edge_hits: u64,
    pub edge_misses: u64,
    pub evictions: u64,
}

/// A cached value and every solid handle it has been served to.
#[derive(Debug, Clone)]
struct Entry<T> {
    data: Arc<T>,
    served: Vec<u64>,
}

impl<T> Entry<T> {
    fn new(data: &Arc<T>, solid: u64) -> Self {
        Self {
            data: Arc::clone(data),
            served: vec![solid],
        }
    }

    /// Hand out the data to `solid`, remembering the handle.
    fn serve(&mut self, solid: u64) -> Arc<T> {
        if !self.served.contains(&solid) {
            self.served.push(solid);
        }
        Arc::clone(&self.data)
    }

    fn served_to(&self, solid: u64) -> bool {
        self.served.contains(&solid)
    }
}

/// Meshes and edge overlays keyed by solid content.
///
/// Two independent LRU pools: a mesh may be cached while its edges are
/// not, and the reverse. Lookups never fail loudly; anything the kernel
/// cannot produce comes back as `None`.
#[derive(Debug)]
pub struct TessellationCache {
    config: CacheConfig,
    meshes: LruPool<MeshKey, Entry<RenderMesh>>,
    edges: LruPool<EdgeKey, Entry<EdgeRenderData>>,
    stats: CacheStats,
}

pub type SharedTessellationCache = Arc<Mutex<TessellationCache>>;

impl Default for TessellationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl TessellationCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            meshes: LruPool::new(),
            edges: LruPool::new(),
            stats: CacheStats::default(),
        }
    }

    /// Wrap in a mutex for callers on other threads.
    pub fn shared(config: CacheConfig) -> SharedTessellationCache {
        Arc::new(Mutex::new(Self::new(config)))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn cache_version(&self) -> u32 {
        self.config.cache_version
    }

    /// Mesh and feature edges of `solid`, from cache where possible.
    ///
    /// Faces come from per-face tessellation, falling back to the merged
    /// tessellation. Edges come from the kernel's B-Rep edges, falling
    /// back to edges recovered from the mesh.
    ///
    /// The kernel tessellators take a single chordal tolerance, so only
    /// `quality` reaches them. `angular_tolerance` partitions the mesh
    /// pool: requests differing only in it get separate entries holding
    /// equal meshes.
    #[instrument(skip(self, kb, solid), fields(solid = solid.raw()))]
    pub fn tessellate(
        &mut self,
        kb: &mut dyn KernelBundle,
        solid: &KernelSolidHandle,
        quality: f64,
        angular_tolerance: f64,
    ) -> (Option<Arc<RenderMesh>>, Option<Arc<EdgeRenderData>>) {
        let hash = match solid_content_hash(kb.as_introspect(), solid) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(%err, "cannot key solid for tessellation");
                return (None, None);
            }
        };
        let version = self.config.cache_version;
        let mesh_key = MeshKey::new(hash.clone(), quality, angular_tolerance, version);
        let edge_key = EdgeKey {
            hash: hash.clone(),
            cache_version: version,
        };

        let raw = solid.raw();
        let cached_mesh = self.meshes.get_mut(&mesh_key).map(|e| e.serve(raw));
        let cached_edges = self.edges.get_mut(&edge_key).map(|e| e.serve(raw));
        match (&cached_mesh, &cached_edges) {
            (Some(_), Some(_)) => debug!(%hash, "tessellation cache hit"),
            (Some(_), None) => debug!(%hash, "partial hit: mesh cached, edges missing"),
            (None, Some(_)) => debug!(%hash, "partial hit: edges cached, mesh missing"),
            (None, None) => debug!(%hash, "tessellation cache miss"),
        }

        let mesh = match cached_mesh {
            Some(mesh) => {
                self.stats.mesh_hits += 1;
                Some(mesh)
            }
            None => {
                self.stats.mesh_misses += 1;
                let built = build_mesh(kb, solid, quality).map(Arc::new);
                if let Some(mesh) = &built {
                    self.meshes.insert(mesh_key, Entry::new(mesh, raw));
                }
                built
            }
        };

        let edges = match cached_edges {
            Some(edges) => {
                self.stats.edge_hits += 1;
                Some(edges)
            }
            None => {
                self.stats.edge_misses += 1;
                let angle = self.config.feature_edge_angle_deg;
                let built = build_edges(kb.as_introspect(), solid, angle, mesh.as_deref())
                    .map(Arc::new);
                if let Some(edges) = &built {
                    self.edges.insert(edge_key, Entry::new(edges, raw));
                }
                built
            }
        };

        self.enforce_caps();
        (mesh, edges)
    }

    /// Whether a mesh for this content and quality is cached. Does not
    /// touch recency.
    pub fn contains_mesh(&self, hash: &GeometryHash, quality: f64, angular_tolerance: f64) -> bool {
        self.meshes.contains(&MeshKey::new(
            hash.clone(),
            quality,
            angular_tolerance,
            self.config.cache_version,
        ))
    }

    /// Drop every entry produced for or served to `solid`, including
    /// entries it shares with other solids of the same content. Returns
    /// how many went.
    pub fn clear_cache_for_shape(&mut self, solid: &KernelSolidHandle) -> usize {
        let raw = solid.raw();
        let removed = self.meshes.retain(|_, e| !e.served_to(raw))
            + self.edges.retain(|_, e| !e.served_to(raw));
        if removed > 0 {
            debug!(solid = raw, removed, "cleared cache entries for shape");
        }
        removed
    }

    /// A body's solid was replaced. Content keys already keep stale
    /// entries from being served, so this only trims pools over their cap.
    pub fn notify_body_changed(&mut self) {
        self.enforce_caps();
    }

    /// Invalidate everything by moving to a new cache version.
    pub fn bump_version(&mut self) -> u32 {
        self.config.cache_version = self.config.cache_version.wrapping_add(1);
        let dropped = self.meshes.len() + self.edges.len();
        self.meshes.clear();
        self.edges.clear();
        debug!(version = self.config.cache_version, dropped, "cache version bumped");
        self.config.cache_version
    }

    fn enforce_caps(&mut self) {
        let mut evicted = 0;
        if self.meshes.len() > self.config.max_mesh_entries {
            let target = self.config.eviction_target(self.config.max_mesh_entries);
            evicted += self.meshes.evict_to(target);
        }
        if self.edges.len() > self.config.max_edge_entries {
            let target = self.config.eviction_target(self.config.max_edge_entries);
            evicted += self.edges.evict_to(target);
        }
        if evicted > 0 {
            self.stats.evictions += evicted as u64;
            debug!(
                evicted,
                meshes = self.meshes.len(),
                edges = self.edges.len(),
                "evicted tessellation entries"
            );
        }
    }
}

fn build_mesh(kb: &mut dyn KernelBundle, solid: &KernelSolidHandle, quality: f64) -> Option<RenderMesh> {
    match kb.tessellate(solid, quality) {
        Ok(mesh) => return Some(mesh),
        Err(err) => debug!(%err, "per-face tessellation failed, trying merged"),
    }
    match kb.tessellate_merged(solid, quality) {
        Ok(mesh) => Some(mesh),
        Err(err) => {
            warn!(%err, "tessellation failed");
            None
        }
    }
}

fn build_edges(
    introspect: &dyn KernelIntrospect,
    solid: &KernelSolidHandle,
    angle: f64,
    mesh: Option<&RenderMesh>,
) -> Option<EdgeRenderData> {
    match introspect.feature_edges(solid, angle) {
        Ok(edges) => return Some(edges),
        Err(err) => debug!(%err, "B-Rep edge extraction failed, using mesh edges"),
    }
    mesh.map(|m| mesh_feature_edges(m, angle))
}
