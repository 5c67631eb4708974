// SPDX-License-Identifier: Apache-2.0
//! Async loadout optimizer contract: one outstanding hill-climb job at a
//! time, joinable but not cancellable, backed by a bounded hash cache of
//! previously evaluated snapshots.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use rustc_hash::FxHashSet;

use crate::error::LoadoutError;
use crate::hash::{fold_fingerprint, Fingerprint};

/// A point-in-time snapshot of the stats a candidate loadout would produce,
/// evaluated by the optimizer's hill-climb search.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadoutSnapshot {
    /// Mobility metric the candidate would produce.
    pub mobility: f32,
    /// Effective-health-pool metric the candidate would produce.
    pub ehp: f32,
    /// Sum of primary-stat totals, used as the hill-climb's improvement
    /// score.
    pub stat_total: f32,
}

/// Folds a snapshot's three fields into a stable fingerprint, matching
/// `rogue_loadout_hash`: inputs are scaled to fixed-point before folding so
/// bit-identical floats always hash identically regardless of NaN payload
/// bits or signed-zero representation.
#[must_use]
pub fn loadout_hash(snapshot: &LoadoutSnapshot) -> Fingerprint {
    let scaled = |v: f32| (v * 1000.0).round() as i64;
    fold_fingerprint(&[scaled(snapshot.mobility), scaled(snapshot.ehp), scaled(snapshot.stat_total)])
}

/// Used/capacity/hits/inserts counters for the optimizer's evaluation cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Number of distinct snapshot hashes currently cached.
    pub used: usize,
    /// Configured maximum number of cached hashes.
    pub capacity: usize,
    /// Number of evaluations skipped because the hash was already cached.
    pub hits: u64,
    /// Number of new entries inserted since the last reset.
    pub inserts: u64,
}

struct EvalCache {
    seen: FxHashSet<Fingerprint>,
    capacity: usize,
    hits: u64,
    inserts: u64,
}

impl EvalCache {
    fn new(capacity: usize) -> Self {
        Self { seen: FxHashSet::default(), capacity, hits: 0, inserts: 0 }
    }

    /// Returns `true` if `hash` was already cached (a hit); otherwise
    /// inserts it, evicting nothing since the cache is cleared wholesale on
    /// `cache_reset` rather than per-entry.
    fn probe(&mut self, hash: Fingerprint) -> bool {
        if self.seen.contains(&hash) {
            self.hits += 1;
            return true;
        }
        if self.seen.len() < self.capacity {
            self.seen.insert(hash);
            self.inserts += 1;
        }
        false
    }

    fn stats(&self) -> CacheStats {
        CacheStats { used: self.seen.len(), capacity: self.capacity, hits: self.hits, inserts: self.inserts }
    }

    fn reset(&mut self) {
        self.seen.clear();
        self.hits = 0;
        self.inserts = 0;
    }
}

/// Default capacity of the optimizer's evaluation-hash cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Hill-climbs a list of candidate snapshots toward higher `stat_total`,
/// counting only candidates that clear both floors and were not already
/// seen in the cache.
fn hill_climb(
    candidates: &[LoadoutSnapshot],
    min_mobility: f32,
    min_ehp: f32,
    cache: &Mutex<EvalCache>,
) -> u64 {
    let mut best_score = f32::MIN;
    let mut improvements = 0u64;
    for snapshot in candidates {
        if snapshot.mobility < min_mobility || snapshot.ehp < min_ehp {
            continue;
        }
        let hash = loadout_hash(snapshot);
        let already_seen = cache.lock().unwrap_or_else(|e| e.into_inner()).probe(hash);
        if already_seen {
            continue;
        }
        if snapshot.stat_total > best_score {
            best_score = snapshot.stat_total;
            improvements += 1;
        }
    }
    improvements
}

/// Runs the async loadout optimizer contract: `launch` spawns a hill-climb
/// over a candidate list and fails if a job is already outstanding; `join`
/// blocks for the result. Only one job may be outstanding at a time.
pub struct LoadoutOptimizer {
    handle: Option<JoinHandle<u64>>,
    cache: Arc<Mutex<EvalCache>>,
}

impl Default for LoadoutOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl LoadoutOptimizer {
    /// Creates an optimizer whose evaluation cache holds at most `capacity`
    /// distinct snapshot hashes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { handle: None, cache: Arc::new(Mutex::new(EvalCache::new(capacity))) }
    }

    /// Returns `true` if a job is currently outstanding.
    #[must_use]
    pub fn running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Launches a hill-climb over `candidates`, keeping only those meeting
    /// `min_mobility`/`min_ehp`.
    ///
    /// # Errors
    /// Returns [`LoadoutError::AlreadyRunning`] if a job is already
    /// outstanding; the existing job is left untouched.
    pub fn launch(
        &mut self,
        candidates: Vec<LoadoutSnapshot>,
        min_mobility: f32,
        min_ehp: f32,
    ) -> Result<(), LoadoutError> {
        if self.running() {
            return Err(LoadoutError::AlreadyRunning);
        }
        let cache = Arc::clone(&self.cache);
        self.handle =
            Some(std::thread::spawn(move || hill_climb(&candidates, min_mobility, min_ehp, &cache)));
        log::debug!("loadout optimizer job launched");
        Ok(())
    }

    /// Blocks until the outstanding job completes and returns the number of
    /// improving candidates it found.
    ///
    /// # Errors
    /// Returns [`LoadoutError::NotRunning`] if no job is outstanding.
    ///
    /// # Panics
    /// Re-panics on the calling thread if the worker thread itself panicked.
    pub fn join(&mut self) -> Result<u64, LoadoutError> {
        let Some(handle) = self.handle.take() else {
            return Err(LoadoutError::NotRunning);
        };
        match handle.join() {
            Ok(improvements) => {
                log::debug!("loadout optimizer job finished, {improvements} improvement(s)");
                Ok(improvements)
            }
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    /// Clears the evaluation cache and its hit/insert counters.
    pub fn cache_reset(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).reset();
    }

    /// Snapshot of the evaluation cache's used/capacity/hits/inserts
    /// counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).stats()
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn snap(mobility: f32, ehp: f32, stat_total: f32) -> LoadoutSnapshot {
        LoadoutSnapshot { mobility, ehp, stat_total }
    }

    #[test]
    fn loadout_hash_is_stable_for_identical_snapshots() {
        let a = snap(120.0, 5000.0, 800.0);
        let b = snap(120.0, 5000.0, 800.0);
        assert_eq!(loadout_hash(&a), loadout_hash(&b));
    }

    #[test]
    fn loadout_hash_changes_when_any_field_changes() {
        let a = snap(120.0, 5000.0, 800.0);
        let b = snap(120.0, 5000.0, 801.0);
        assert_ne!(loadout_hash(&a), loadout_hash(&b));
    }

    #[test]
    fn launch_fails_while_a_job_is_outstanding() {
        let mut opt = LoadoutOptimizer::new(16);
        let candidates = vec![snap(100.0, 100.0, 1.0)];
        opt.launch(candidates.clone(), 0.0, 0.0).expect("first launch succeeds");
        let second = opt.launch(candidates, 0.0, 0.0);
        assert_eq!(second, Err(LoadoutError::AlreadyRunning));
        opt.join().expect("drain the first job");
    }

    #[test]
    fn join_without_a_launch_reports_not_running() {
        let mut opt = LoadoutOptimizer::new(16);
        assert_eq!(opt.join(), Err(LoadoutError::NotRunning));
    }

    #[test]
    fn join_counts_only_candidates_that_clear_both_floors() {
        let mut opt = LoadoutOptimizer::new(16);
        let candidates = vec![
            snap(50.0, 50.0, 10.0),   // below floors, excluded
            snap(120.0, 5000.0, 20.0),
            snap(120.0, 5000.0, 50.0), // improves over the previous
            snap(120.0, 5000.0, 30.0), // does not improve
        ];
        opt.launch(candidates, 100.0, 1000.0).expect("launch succeeds");
        let improvements = opt.join().expect("job completes");
        assert_eq!(improvements, 2);
    }

    #[test]
    fn repeated_identical_snapshots_are_cached_after_the_first_evaluation() {
        let mut opt = LoadoutOptimizer::new(16);
        let candidates = vec![snap(120.0, 5000.0, 20.0), snap(120.0, 5000.0, 20.0)];
        opt.launch(candidates, 0.0, 0.0).expect("launch succeeds");
        opt.join().expect("job completes");
        let stats = opt.cache_stats();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn cache_reset_clears_used_and_counters() {
        let mut opt = LoadoutOptimizer::new(16);
        opt.launch(vec![snap(120.0, 5000.0, 20.0)], 0.0, 0.0).expect("launch succeeds");
        opt.join().expect("job completes");
        assert!(opt.cache_stats().used > 0);
        opt.cache_reset();
        let stats = opt.cache_stats();
        assert_eq!(stats.used, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.inserts, 0);
    }

    #[test]
    fn running_is_false_before_launch_and_after_join() {
        let mut opt = LoadoutOptimizer::new(16);
        assert!(!opt.running());
        opt.launch(vec![snap(1.0, 1.0, 1.0)], 0.0, 0.0).expect("launch succeeds");
        opt.join().expect("job completes");
        assert!(!opt.running());
    }
}
