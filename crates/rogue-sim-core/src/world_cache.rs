// SPDX-License-Identifier: Apache-2.0
//! Chunk streaming and the general-purpose three-tier cache.
//!
//! Two independent facilities live here: [`ChunkStreamManager`], which turns
//! chunk coordinate requests into lazily-generated, LRU-evicted 32×32 tile
//! chunks, and [`MultiLevelCache`], a byte-oriented L1/L2/L3 cache with
//! RLE compression above a size threshold. Neither depends on the other;
//! a caller wanting compressed chunk storage composes them explicitly.

use rustc_hash::FxHashMap;

use crate::error::CacheError;
use crate::rng::chunk_seed;
use crate::tilemap::TileMap;
use crate::world_gen::{generate, WorldGenConfig};

/// Fixed chunk edge length in tiles.
pub const CHUNK_SIZE: i32 = 32;

/// One streamed world chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk-space x coordinate.
    pub chunk_x: i32,
    /// Chunk-space y coordinate.
    pub chunk_y: i32,
    /// The chunk's tile map, fixed at [`CHUNK_SIZE`] x [`CHUNK_SIZE`].
    pub tiles: TileMap,
    /// Tile-hash at construction time; never recomputed afterward.
    pub hash: u64,
    /// Tick of last access, used for LRU eviction.
    pub last_access_tick: u64,
}

/// Tunables for a [`ChunkStreamManager`].
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Base world generation config; per-chunk seed overrides `seed`.
    pub base_config: WorldGenConfig,
    /// Maximum queued requests processed per [`ChunkStreamManager::update`]
    /// call.
    pub budget_per_tick: u32,
    /// Maximum resident chunks before LRU eviction kicks in.
    pub capacity: usize,
}

#[derive(Debug, Default, Clone, Copy)]
/// Running counters for a [`ChunkStreamManager`].
pub struct StreamStats {
    /// Requests satisfied from resident chunks.
    pub cache_hits: u64,
    /// Requests that had to be queued for generation.
    pub cache_misses: u64,
    /// Chunks evicted to make room for a newly generated one.
    pub evictions: u64,
}

/// Generates and caches world chunks on demand with LRU eviction.
#[derive(Debug)]
pub struct ChunkStreamManager {
    config: StreamConfig,
    resident: FxHashMap<(i32, i32), Chunk>,
    queue: Vec<(i32, i32)>,
    tick: u64,
    stats: StreamStats,
}

const MAX_QUEUE: usize = 512;

impl ChunkStreamManager {
    /// Creates a manager with no resident chunks and an empty queue.
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            resident: FxHashMap::default(),
            queue: Vec::new(),
            tick: 0,
            stats: StreamStats::default(),
        }
    }

    /// Running statistics.
    #[must_use]
    pub const fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Requests chunk `(cx, cy)`. Hits touch last-access and count as a hit;
    /// misses enqueue the coordinate (deduplicated) unless the queue is
    /// full.
    ///
    /// # Errors
    /// Returns [`CacheError::QueueFull`] if the coordinate is not already
    /// resident or queued and the queue has reached [`MAX_QUEUE`].
    pub fn request(&mut self, cx: i32, cy: i32) -> Result<(), CacheError> {
        if self.resident.contains_key(&(cx, cy)) {
            self.stats.cache_hits += 1;
            if let Some(chunk) = self.resident.get_mut(&(cx, cy)) {
                chunk.last_access_tick = self.tick;
            }
            return Ok(());
        }
        self.stats.cache_misses += 1;
        if self.queue.contains(&(cx, cy)) {
            return Ok(());
        }
        if self.queue.len() >= MAX_QUEUE {
            return Err(CacheError::QueueFull { capacity: MAX_QUEUE });
        }
        self.queue.push((cx, cy));
        Ok(())
    }

    /// Processes up to `budget_per_tick` queued requests: generates each
    /// chunk via the world pipeline seeded by [`chunk_seed`], evicting the
    /// least-recently-accessed resident chunk if at capacity.
    pub fn update(&mut self) {
        self.tick += 1;
        let budget = self.config.budget_per_tick as usize;
        let mut processed = 0;
        while processed < budget {
            let Some((cx, cy)) = self.queue.first().copied() else {
                break;
            };
            self.queue.remove(0);
            processed += 1;

            if self.resident.len() >= self.config.capacity {
                self.evict_lru();
            }

            let chunk = self.generate_chunk(cx, cy);
            self.resident.insert((cx, cy), chunk);
        }
    }

    fn generate_chunk(&self, cx: i32, cy: i32) -> Chunk {
        let seed = chunk_seed(self.config.base_config.seed, cx, cy);
        let mut chunk_config = self.config.base_config.clone();
        chunk_config.seed = seed;
        chunk_config.width = CHUNK_SIZE;
        chunk_config.height = CHUNK_SIZE;
        #[allow(clippy::expect_used)] // CHUNK_SIZE is a fixed positive constant; this can only fail if it is misconfigured
        let result = generate(&chunk_config).map_or_else(
            |_| TileMap::init(CHUNK_SIZE, CHUNK_SIZE).expect("fixed positive chunk dims"),
            |r| r.map,
        );
        let hash = result.hash();
        Chunk { chunk_x: cx, chunk_y: cy, tiles: result, hash, last_access_tick: self.tick }
    }

    fn evict_lru(&mut self) {
        let victim = self
            .resident
            .iter()
            .min_by_key(|(_, chunk)| chunk.last_access_tick)
            .map(|(&key, _)| key);
        if let Some(key) = victim {
            self.resident.remove(&key);
            self.stats.evictions += 1;
        }
    }

    /// Returns the resident chunk at `(cx, cy)`, touching its last-access
    /// tick on hit.
    pub fn get(&mut self, cx: i32, cy: i32) -> Option<&Chunk> {
        if let Some(chunk) = self.resident.get_mut(&(cx, cy)) {
            chunk.last_access_tick = self.tick;
            Some(&*chunk)
        } else {
            None
        }
    }
}

/// Cache level identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Smallest, hottest tier.
    L1,
    /// Mid-size tier.
    L2,
    /// Largest tier.
    L3,
}

/// One slot in a [`MultiLevelCache`] level.
#[derive(Debug, Clone)]
struct Entry {
    key: u64,
    version: u32,
    raw_size: usize,
    data: Vec<u8>,
    compressed: bool,
    tombstone: bool,
}

/// Per-level running counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct LevelStats {
    /// Live (non-tombstoned) entries.
    pub entries: usize,
    /// Hits serviced at this level.
    pub hits: u64,
    /// Misses recorded at this level.
    pub misses: u64,
    /// Evictions performed at this level.
    pub evictions: u64,
    /// Invalidations recorded at this level.
    pub invalidations: u64,
    /// Promotions into this level.
    pub promotions: u64,
}

#[derive(Debug)]
struct CacheLevel {
    slots: Vec<Option<Entry>>,
    capacity: usize,
    stats: LevelStats,
}

impl CacheLevel {
    fn new(capacity: usize) -> Self {
        let table_size = (capacity * 2).next_power_of_two().max(1);
        Self { slots: vec![None; table_size], capacity, stats: LevelStats::default() }
    }

    fn slot_for(&self, key: u64) -> usize {
        (key as usize) & (self.slots.len() - 1)
    }

    fn find(&self, key: u64) -> Option<usize> {
        let start = self.slot_for(key);
        for i in 0..self.slots.len() {
            let idx = (start + i) % self.slots.len();
            match &self.slots[idx] {
                Some(e) if e.key == key && !e.tombstone => return Some(idx),
                None => return None,
                _ => {}
            }
        }
        None
    }

    fn find_insert_slot(&self, key: u64) -> (Option<usize>, Option<usize>) {
        let start = self.slot_for(key);
        let mut first_tombstone = None;
        for i in 0..self.slots.len() {
            let idx = (start + i) % self.slots.len();
            match &self.slots[idx] {
                Some(e) if e.key == key && !e.tombstone => return (Some(idx), None),
                Some(e) if e.tombstone && first_tombstone.is_none() => first_tombstone = Some(idx),
                None => return (None, first_tombstone.or(Some(idx))),
                _ => {}
            }
        }
        (None, first_tombstone)
    }
}

/// Minimum size at which RLE compression is attempted.
pub const COMPRESS_THRESHOLD: usize = 64;

fn rle_encode(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        let mut run = 1usize;
        while i + run < data.len() && data[i + run] == byte && run < 255 {
            run += 1;
        }
        out.push(byte);
        out.push(run as u8);
        i += run;
    }
    if out.len() < data.len() - data.len() / 8 {
        Some(out)
    } else {
        None
    }
}

fn rle_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < data.len() {
        let byte = data[i];
        let run = data[i + 1] as usize;
        out.extend(std::iter::repeat(byte).take(run));
        i += 2;
    }
    out
}

/// Suggests a placement level by payload size: `L1` for `<= 256` bytes,
/// `L2` for `<= 4096`, otherwise `L3`.
#[must_use]
pub fn placement_hint(size: usize) -> Level {
    if size <= 256 {
        Level::L1
    } else if size <= 4096 {
        Level::L2
    } else {
        Level::L3
    }
}

/// A three-tier (L1/L2/L3) byte cache with RLE compression and
/// promotion-on-hit semantics.
#[derive(Debug)]
pub struct MultiLevelCache {
    l1: CacheLevel,
    l2: CacheLevel,
    l3: CacheLevel,
    compressed_entries: u64,
    saved_bytes: u64,
}

impl Default for MultiLevelCache {
    fn default() -> Self {
        Self::new(256, 512, 1024)
    }
}

impl MultiLevelCache {
    /// Creates a cache with the given per-level capacities.
    #[must_use]
    pub fn new(l1_capacity: usize, l2_capacity: usize, l3_capacity: usize) -> Self {
        Self {
            l1: CacheLevel::new(l1_capacity),
            l2: CacheLevel::new(l2_capacity),
            l3: CacheLevel::new(l3_capacity),
            compressed_entries: 0,
            saved_bytes: 0,
        }
    }

    fn level_mut(&mut self, level: Level) -> &mut CacheLevel {
        match level {
            Level::L1 => &mut self.l1,
            Level::L2 => &mut self.l2,
            Level::L3 => &mut self.l3,
        }
    }

    fn level(&self, level: Level) -> &CacheLevel {
        match level {
            Level::L1 => &self.l1,
            Level::L2 => &self.l2,
            Level::L3 => &self.l3,
        }
    }

    /// Inserts or updates `key` at `level` with `data`, applying RLE
    /// compression when `data.len() >= COMPRESS_THRESHOLD` and it saves at
    /// least `1/8` of the payload.
    ///
    /// # Errors
    /// Returns [`CacheError::AllocFailed`] if the level's hash table has no
    /// free or tombstoned slot and no live entry can be evicted (the table
    /// is fully occupied by entries this call would not otherwise touch,
    /// which cannot happen at the configured load factor but is guarded for
    /// a corrupted capacity configuration).
    pub fn put(&mut self, level: Level, key: u64, version: u32, data: &[u8]) -> Result<(), CacheError> {
        let (compressed, stored, raw_size) = if data.len() >= COMPRESS_THRESHOLD {
            rle_encode(data).map_or_else(
                || (false, data.to_vec(), data.len()),
                |enc| (true, enc, data.len()),
            )
        } else {
            (false, data.to_vec(), data.len())
        };

        let lvl = self.level_mut(level);
        let (existing, free) = lvl.find_insert_slot(key);
        let under_capacity = lvl.stats.entries < lvl.capacity;
        let slot = if let Some(idx) = existing {
            idx
        } else if let Some(idx) = free.filter(|_| under_capacity) {
            idx
        } else {
            let victim = lvl.slots.iter().position(|s| matches!(s, Some(e) if !e.tombstone));
            match victim {
                Some(idx) => {
                    lvl.stats.evictions += 1;
                    idx
                }
                None => return Err(CacheError::AllocFailed { reason: "level table has no usable slot" }),
            }
        };

        let was_occupied = lvl.slots[slot].as_ref().is_some_and(|e| !e.tombstone);
        lvl.slots[slot] =
            Some(Entry { key, version, raw_size, data: stored.clone(), compressed, tombstone: false });
        if !was_occupied {
            lvl.stats.entries += 1;
        }

        if compressed {
            self.compressed_entries += 1;
            self.saved_bytes += (raw_size - stored.len()) as u64;
        }
        Ok(())
    }

    /// Looks up `key` starting at L1 and falling through to L3. A hit below
    /// L1 is promoted into L1 and recorded as a promotion on both levels.
    pub fn get(&mut self, key: u64) -> Option<Vec<u8>> {
        for level in [Level::L1, Level::L2, Level::L3] {
            let lvl = self.level_mut(level);
            if let Some(idx) = lvl.find(key) {
                lvl.stats.hits += 1;
                let Some(entry) = lvl.slots[idx].clone() else { continue };
                let data = if entry.compressed { rle_decode(&entry.data) } else { entry.data.clone() };
                if level != Level::L1 {
                    self.promote_to_l1(key, &entry);
                }
                return Some(data);
            }
            lvl.stats.misses += 1;
        }
        None
    }

    fn promote_to_l1(&mut self, key: u64, entry: &Entry) {
        let data = if entry.compressed { rle_decode(&entry.data) } else { entry.data.clone() };
        if self.put(Level::L1, key, entry.version, &data).is_ok() {
            self.l1.stats.promotions += 1;
        }
    }

    /// Marks `key` as a tombstone at every level it is present in, without
    /// reclaiming its slot.
    pub fn invalidate(&mut self, key: u64) {
        for level in [Level::L1, Level::L2, Level::L3] {
            let lvl = self.level_mut(level);
            if let Some(idx) = lvl.find(key) {
                if let Some(e) = &mut lvl.slots[idx] {
                    e.tombstone = true;
                    e.data.clear();
                }
                lvl.stats.entries = lvl.stats.entries.saturating_sub(1);
                lvl.stats.invalidations += 1;
            }
        }
    }

    /// Bulk-inserts `(key, data)` pairs into `level` (L2 by default for
    /// callers with no stronger preference).
    ///
    /// # Errors
    /// Propagates the first [`CacheError`] encountered from [`Self::put`].
    pub fn preload(&mut self, level: Level, items: &[(u64, Vec<u8>)]) -> Result<(), CacheError> {
        for (key, data) in items {
            self.put(level, *key, 0, data)?;
        }
        Ok(())
    }

    /// Moves `key` from its current level toward L1 by one level (L3 → L2,
    /// L2 → L1). A no-op if the key is not resident or already in L1.
    pub fn promote(&mut self, key: u64) {
        let source = if self.l3.find(key).is_some() {
            Some(Level::L3)
        } else if self.l2.find(key).is_some() {
            Some(Level::L2)
        } else {
            None
        };
        let Some(source) = source else { return };
        let target = if source == Level::L3 { Level::L2 } else { Level::L1 };

        let lvl = self.level_mut(source);
        let Some(idx) = lvl.find(key) else { return };
        let Some(entry) = lvl.slots[idx].clone() else { return };
        let data = if entry.compressed { rle_decode(&entry.data) } else { entry.data };

        if self.put(target, key, entry.version, &data).is_ok() {
            let target_lvl = self.level_mut(target);
            target_lvl.stats.promotions += 1;
        }
    }

    /// Returns the running stats for `level`.
    #[must_use]
    pub fn level_stats(&self, level: Level) -> LevelStats {
        self.level(level).stats
    }

    /// Total entries compressed across all levels over the cache's
    /// lifetime.
    #[must_use]
    pub const fn compressed_entries(&self) -> u64 {
        self.compressed_entries
    }

    /// Cumulative bytes saved by compression.
    #[must_use]
    pub const fn saved_bytes(&self) -> u64 {
        self.saved_bytes
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_then_update_populates_the_chunk() {
        let mut mgr = ChunkStreamManager::new(StreamConfig {
            base_config: WorldGenConfig::default(),
            budget_per_tick: 4,
            capacity: 16,
        });
        mgr.request(0, 0).expect("queue has room");
        assert_eq!(mgr.stats().cache_misses, 1);
        mgr.update();
        assert!(mgr.get(0, 0).is_some());
        assert_eq!(mgr.stats().cache_hits, 1);
    }

    #[test]
    fn chunk_hash_is_deterministic_across_managers() {
        let cfg = StreamConfig { base_config: WorldGenConfig::default(), budget_per_tick: 4, capacity: 16 };
        let mut a = ChunkStreamManager::new(cfg.clone());
        let mut b = ChunkStreamManager::new(cfg);
        a.request(3, -2).expect("queue has room");
        b.request(3, -2).expect("queue has room");
        a.update();
        b.update();
        assert_eq!(a.get(3, -2).map(|c| c.hash), b.get(3, -2).map(|c| c.hash));
    }

    #[test]
    fn eviction_reclaims_the_least_recently_used_chunk() {
        let mut mgr = ChunkStreamManager::new(StreamConfig {
            base_config: WorldGenConfig::default(),
            budget_per_tick: 8,
            capacity: 1,
        });
        mgr.request(0, 0).expect("room");
        mgr.update();
        mgr.request(1, 0).expect("room");
        mgr.update();
        assert!(mgr.get(0, 0).is_none());
        assert!(mgr.get(1, 0).is_some());
        assert_eq!(mgr.stats().evictions, 1);
    }

    #[test]
    fn multi_level_cache_put_then_get_round_trips() {
        let mut cache = MultiLevelCache::default();
        cache.put(Level::L1, 42, 1, b"hello world").expect("fits");
        assert_eq!(cache.get(42), Some(b"hello world".to_vec()));
    }

    #[test]
    fn hit_below_l1_is_promoted() {
        let mut cache = MultiLevelCache::default();
        cache.put(Level::L3, 7, 1, b"payload").expect("fits");
        assert_eq!(cache.get(7), Some(b"payload".to_vec()));
        assert!(cache.l1.find(7).is_some());
        assert_eq!(cache.level_stats(Level::L1).promotions, 1);
    }

    #[test]
    fn invalidate_tombstones_without_reclaiming_immediately() {
        let mut cache = MultiLevelCache::default();
        cache.put(Level::L1, 9, 1, b"data").expect("fits");
        cache.invalidate(9);
        assert_eq!(cache.get(9), None);
        assert_eq!(cache.level_stats(Level::L1).invalidations, 1);
    }

    #[test]
    fn highly_repetitive_payload_is_compressed() {
        let mut cache = MultiLevelCache::default();
        let data = vec![7u8; 256];
        cache.put(Level::L2, 1, 1, &data).expect("fits");
        assert_eq!(cache.compressed_entries(), 1);
        assert!(cache.saved_bytes() > 0);
        assert_eq!(cache.get(1), Some(data));
    }

    #[test]
    fn placement_hint_buckets_by_size() {
        assert_eq!(placement_hint(10), Level::L1);
        assert_eq!(placement_hint(1000), Level::L2);
        assert_eq!(placement_hint(10_000), Level::L3);
    }
}
