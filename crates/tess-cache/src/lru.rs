//! Least-recently-used pool with bulk eviction.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    last_used: u64,
}

/// Map that remembers when each entry was last touched. It never evicts
/// on its own; the owner calls [`LruPool::evict_to`].
#[derive(Debug, Clone)]
pub struct LruPool<K, V> {
    slots: HashMap<K, Slot<V>>,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V> LruPool<K, V> {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            clock: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Look up and mark as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.tick();
        let slot = self.slots.get_mut(key)?;
        slot.last_used = now;
        Some(&slot.value)
    }

    /// Like [`LruPool::get`], with mutable access to the value.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let now = self.tick();
        let slot = self.slots.get_mut(key)?;
        slot.last_used = now;
        Some(&mut slot.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        let last_used = self.tick();
        self.slots.insert(key, Slot { value, last_used });
    }

    /// Drop least recently used entries until at most `target` remain.
    /// Returns how many were dropped.
    pub fn evict_to(&mut self, target: usize) -> usize {
        if self.slots.len() <= target {
            return 0;
        }
        let mut by_age: Vec<(u64, K)> = self
            .slots
            .iter()
            .map(|(k, s)| (s.last_used, k.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(t, _)| *t);
        let excess = self.slots.len() - target;
        for (_, key) in by_age.into_iter().take(excess) {
            self.slots.remove(&key);
        }
        excess
    }

    /// Keep only entries for which `keep` returns true. Returns how many
    /// were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) -> usize {
        let before = self.slots.len();
        self.slots.retain(|k, s| keep(k, &s.value));
        before - self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl<K: Eq + Hash + Clone, V> Default for LruPool<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
