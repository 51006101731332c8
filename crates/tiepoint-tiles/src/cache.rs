//! In-memory caches for generators and encoded tiles
//!
//! Both caches are bounded LRUs behind a `parking_lot::Mutex`. Values are
//! built outside the lock, so two racing misses may both build; the last
//! insert wins and either value is correct.

use crate::error::TileResult;
use crate::generator::{QuadTreeGenerator, Tile};
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

/// Cache key of a tile, stable across processes.
pub fn tile_cache_key(quad_tree_id: u64, zoom: u32, x: u64, y: u64) -> String {
    format!("tiepoint.tile.{quad_tree_id}.{zoom}.{x}.{y}")
}

fn generator_cache_key(quad_tree_id: u64) -> String {
    format!("tiepoint.generator.{quad_tree_id}")
}

/// Least-recently-used map with a fixed capacity.
///
/// Every use stamps the entry with a fresh tick and queues `(key, tick)`.
/// Queue records whose tick no longer matches the entry are stale and are
/// skipped on eviction, so a hit costs O(1) amortized.
#[derive(Debug)]
struct Lru<K, V> {
    capacity: usize,
    tick: u64,
    map: HashMap<K, (V, u64)>,
    /// Uses from oldest to newest, possibly stale
    order: VecDeque<(K, u64)>,
}

impl<K: Hash + Eq + Clone, V: Clone> Lru<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn is_current(&self, key: &K, tick: u64) -> bool {
        self.map.get(key).is_some_and(|(_, t)| *t == tick)
    }

    /// Drop stale records once they outnumber live entries.
    fn compact(&mut self) {
        if self.order.len() > 2 * self.map.len() + 16 {
            let order = std::mem::take(&mut self.order);
            self.order = order
                .into_iter()
                .filter(|(k, t)| self.is_current(k, *t))
                .collect();
        }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.next_tick();
        let (value, stamp) = self.map.get_mut(key)?;
        *stamp = tick;
        let value = value.clone();
        self.order.push_back((key.clone(), tick));
        self.compact();
        Some(value)
    }

    fn insert(&mut self, key: K, value: V) {
        let tick = self.next_tick();
        self.order.push_back((key.clone(), tick));
        self.map.insert(key, (value, tick));
        while self.map.len() > self.capacity {
            match self.order.pop_front() {
                Some((old, t)) => {
                    if self.is_current(&old, t) {
                        self.map.remove(&old);
                    }
                }
                None => break,
            }
        }
        self.compact();
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(value, _)| value)
    }

    fn retain<F: Fn(&K) -> bool>(&mut self, keep: F) -> usize {
        let before = self.map.len();
        self.map.retain(|k, _| keep(k));
        self.order.retain(|(k, _)| keep(k));
        before - self.map.len()
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Bounded cache of generators keyed by quadtree id.
#[derive(Debug)]
pub struct GeneratorCache {
    inner: Mutex<Lru<u64, Arc<QuadTreeGenerator>>>,
}

impl GeneratorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru::new(capacity)),
        }
    }

    pub fn get(&self, quad_tree_id: u64) -> Option<Arc<QuadTreeGenerator>> {
        self.inner.lock().get(&quad_tree_id)
    }

    pub fn insert(&self, generator: QuadTreeGenerator) -> Arc<QuadTreeGenerator> {
        let generator = Arc::new(generator);
        self.inner.lock().insert(generator.id(), generator.clone());
        generator
    }

    /// Cached generator, or one built by `load` and cached.
    pub fn get_or_load<F>(&self, quad_tree_id: u64, load: F) -> TileResult<Arc<QuadTreeGenerator>>
    where
        F: FnOnce() -> TileResult<QuadTreeGenerator>,
    {
        let key = generator_cache_key(quad_tree_id);
        if let Some(generator) = self.get(quad_tree_id) {
            debug!("generator cache hit {key}");
            return Ok(generator);
        }
        debug!("generator cache miss {key}");
        Ok(self.insert(load()?))
    }

    pub fn remove(&self, quad_tree_id: u64) -> Option<Arc<QuadTreeGenerator>> {
        self.inner.lock().remove(&quad_tree_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub quad_tree_id: u64,
    pub zoom: u32,
    pub x: u64,
    pub y: u64,
}

impl TileKey {
    pub fn new(quad_tree_id: u64, zoom: u32, x: u64, y: u64) -> Self {
        Self {
            quad_tree_id,
            zoom,
            x,
            y,
        }
    }

    pub fn cache_key(&self) -> String {
        tile_cache_key(self.quad_tree_id, self.zoom, self.x, self.y)
    }
}

/// Bounded cache of encoded tiles.
#[derive(Debug)]
pub struct TileCache {
    inner: Mutex<Lru<TileKey, Tile>>,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru::new(capacity)),
        }
    }

    pub fn get(&self, key: &TileKey) -> Option<Tile> {
        let tile = self.inner.lock().get(key);
        match &tile {
            Some(_) => debug!("tile cache hit {}", key.cache_key()),
            None => debug!("tile cache miss {}", key.cache_key()),
        }
        tile
    }

    pub fn insert(&self, key: TileKey, tile: Tile) {
        self.inner.lock().insert(key, tile);
    }

    /// Drop every tile of one quadtree; returns how many were dropped.
    pub fn evict_quad_tree(&self, quad_tree_id: u64) -> usize {
        let evicted = self
            .inner
            .lock()
            .retain(|k| k.quad_tree_id != quad_tree_id);
        debug!("evicted {evicted} tiles of quadtree {quad_tree_id}");
        evicted
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
