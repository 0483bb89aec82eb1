/*!
# Tile Cache

Concurrent store of rendered tiles for a single overlay. Every entry carries the
epoch it was rendered under; bumping the epoch invalidates everything at once,
and an entry from an older epoch is never handed out again.
*/

use crate::bitmap::Bitmap;
use crate::types::{Epoch, TileKey};
use dashmap::DashMap;
use log::{debug, trace};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tiles kept per overlay unless configured otherwise.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// A rendered bitmap tagged with the epoch it was produced under.
#[derive(Debug, Clone)]
pub struct RenderedTile {
    pub key: TileKey,
    pub bitmap: Arc<Bitmap>,
    pub generation: Epoch,
}

impl RenderedTile {
    pub fn new(key: TileKey, bitmap: Arc<Bitmap>, generation: Epoch) -> Self {
        Self {
            key,
            bitmap,
            generation,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    tile: RenderedTile,
    last_access: AtomicU64,
}

/// Epoch-checked tile store with LRU eviction.
#[derive(Debug)]
pub struct TileCache {
    tiles: DashMap<TileKey, CacheEntry>,
    capacity: usize,
    epoch: AtomicU64,
    clock: AtomicU64,

    // Performance metrics
    hits: AtomicU64,
    misses: AtomicU64,
    stale_puts: AtomicU64,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Cache holding at most `capacity` tiles (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tiles: DashMap::new(),
            capacity: capacity.max(1),
            epoch: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_puts: AtomicU64::new(0),
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch.load(Ordering::Acquire)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Tile for `key` rendered under the current epoch.
    pub fn get(&self, key: &TileKey) -> Option<RenderedTile> {
        let epoch = self.epoch();
        let found = self.tiles.get(key).map(|entry| {
            entry.last_access.store(self.tick(), Ordering::Relaxed);
            entry.tile.clone()
        });

        match found {
            Some(tile) if tile.generation == epoch => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!("Cache hit for tile {} (epoch {})", key, epoch);
                Some(tile)
            }
            Some(tile) => {
                self.remove_if_stale(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "Evicted stale tile {} (generation {}, epoch {})",
                    key,
                    tile.generation,
                    epoch
                );
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `tile` if it belongs to the current epoch. Returns `false` when
    /// the tile is stale and was discarded.
    pub fn put(&self, tile: RenderedTile) -> bool {
        let epoch = self.epoch();
        if tile.generation != epoch {
            self.stale_puts.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Discarded tile {} rendered under epoch {} (current {})",
                tile.key, tile.generation, epoch
            );
            return false;
        }

        let key = tile.key;
        if !self.tiles.contains_key(&key) && self.tiles.len() >= self.capacity {
            self.make_room();
        }
        self.tiles.insert(
            key,
            CacheEntry {
                tile,
                last_access: AtomicU64::new(self.tick()),
            },
        );

        // An invalidation may have landed between the check and the insert.
        let current = self.epoch();
        if current != epoch {
            self.tiles.remove_if(&key, |_, entry| entry.tile.generation != current);
            self.stale_puts.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Drop the entry for `key` if it predates the epoch current at removal
    /// time. A tile stored under a newer epoch survives.
    fn remove_if_stale(&self, key: &TileKey) -> bool {
        self.tiles
            .remove_if(key, |_, entry| entry.tile.generation < self.epoch())
            .is_some()
    }

    /// Bump the epoch and drop every stored tile. Returns the new epoch.
    pub fn invalidate_all(&self) -> Epoch {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let dropped = self.tiles.len();
        self.tiles.clear();
        debug!("Cache invalidated: epoch {} ({} tiles dropped)", epoch, dropped);
        epoch
    }

    /// Free entries from older epochs. Returns how many were removed.
    pub fn evict_stale(&self) -> usize {
        let epoch = self.epoch();
        let before = self.tiles.len();
        self.tiles.retain(|_, entry| entry.tile.generation == epoch);
        before.saturating_sub(self.tiles.len())
    }

    fn make_room(&self) {
        if self.evict_stale() > 0 && self.tiles.len() < self.capacity {
            return;
        }
        let oldest = self
            .tiles
            .iter()
            .min_by_key(|entry| entry.value().last_access.load(Ordering::Relaxed))
            .map(|entry| *entry.key());
        if let Some(key) = oldest {
            self.tiles.remove(&key);
            trace!("Evicted least recently used tile {}", key);
        }
    }

    /// Drop all tiles without touching the epoch.
    pub fn clear(&self) {
        self.tiles.clear();
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };

        CacheStats {
            entries: self.tiles.len(),
            capacity: self.capacity,
            epoch: self.epoch(),
            hits,
            misses,
            stale_puts: self.stale_puts.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}

/// Tile cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub epoch: Epoch,
    pub hits: u64,
    pub misses: u64,
    pub stale_puts: u64,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(key: TileKey, generation: Epoch) -> RenderedTile {
        RenderedTile::new(key, Arc::new(Bitmap::transparent(4, 4)), generation)
    }

    #[test]
    fn test_put_then_get() {
        let cache = TileCache::new();
        let key = TileKey::new(3, 1, 2);
        assert!(cache.get(&key).is_none());
        assert!(cache.put(tile(key, 0)));

        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.key, key);
        assert_eq!(hit.generation, 0);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
        assert!((stats.hit_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stale_removal_spares_newer_generation() {
        let cache = TileCache::new();
        let key = TileKey::new(5, 3, 3);
        cache.invalidate_all();

        // Stored under the current epoch: a reader holding an older epoch must not drop it.
        assert!(cache.put(tile(key, 1)));
        assert!(!cache.remove_if_stale(&key));
        assert_eq!(cache.get(&key).map(|t| t.generation), Some(1));

        cache.tiles.insert(
            key,
            CacheEntry {
                tile: tile(key, 0),
                last_access: AtomicU64::new(0),
            },
        );
        assert!(cache.remove_if_stale(&key));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_rejects_old_generation() {
        let cache = TileCache::new();
        let key = TileKey::new(3, 1, 2);
        cache.put(tile(key, 0));

        assert_eq!(cache.invalidate_all(), 1);
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());

        // A render that started before the invalidation finishes late.
        assert!(!cache.put(tile(key, 0)));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.stats().stale_puts, 1);

        assert!(cache.put(tile(key, 1)));
        assert_eq!(cache.get(&key).map(|t| t.generation), Some(1));
    }

    #[test]
    fn test_evict_stale_keeps_current() {
        let cache = TileCache::new();
        cache.put(tile(TileKey::new(1, 0, 0), 0));
        cache.epoch.store(1, Ordering::Release);
        cache.put(tile(TileKey::new(1, 1, 0), 1));

        assert_eq!(cache.evict_stale(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&TileKey::new(1, 1, 0)).is_some());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = TileCache::with_capacity(2);
        let (a, b, c) = (TileKey::new(2, 0, 0), TileKey::new(2, 1, 0), TileKey::new(2, 2, 0));
        cache.put(tile(a, 0));
        cache.put(tile(b, 0));
        assert!(cache.get(&a).is_some());

        cache.put(tile(c, 0));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let cache = TileCache::with_capacity(1);
        let key = TileKey::new(0, 0, 0);
        cache.put(tile(key, 0));
        cache.put(tile(key, 0));
        assert_eq!(cache.len(), 1);
    }
}
