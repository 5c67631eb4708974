// SPDX-License-Identifier: Apache-2.0
//! Deterministic simulation core for an action-RPG.
//!
//! This crate turns a single integer seed plus a sequence of player actions
//! into reproducible game state: a procedurally generated world, a streamed
//! and cached set of chunks, a layered equipment/stat model, and an
//! independent crafting RNG with a replayable journal. Every subsystem here
//! is pure with respect to its inputs — given the same seed and the same
//! call sequence within the documented contracts, it produces bit-identical
//! output, regardless of process, platform, or call order outside those
//! contracts.
//!
//! Rendering, audio, input, networking, and AI behavior are explicitly out
//! of scope; this crate only computes the state those systems would read.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::many_single_char_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

/// Transient bump allocator with frame-reset semantics.
pub mod arena;
/// Crafting RNG streams and the append-only crafting journal.
pub mod crafting;
/// Error taxonomy shared by all fallible operations in this crate.
pub mod error;
/// Fixed equipment slot model, item instances, and durability.
pub mod equipment;
/// FNV-1a tile hashing, the stat fingerprint fold, and the cache mixer.
pub mod hash;
/// Integrity auditors: proc rate, banned affix pairs, equip-chain, duplicate GUIDs.
pub mod integrity;
/// Async loadout optimizer contract and its evaluation cache.
pub mod loadout;
/// Value noise and fractional Brownian motion.
pub mod noise;
/// Seeded xorshift/LCG RNG channels and seed derivation.
pub mod rng;
/// Layered stat cache: eight origin layers, soft caps, fingerprinting.
pub mod stat_cache;
/// Telemetry: biome metrics, anomaly flags, heatmap export.
pub mod telemetry;
/// 2D tile grid with bounds-checked access.
pub mod tilemap;
/// Three-tier cache with RLE compression and per-chunk streaming.
pub mod world_cache;
/// The ten-phase procedural world generation pipeline.
pub mod world_gen;

pub use crafting::{CraftJournal, CraftRngContext, CraftStream, JournalEntry};
pub use equipment::{EquipSlot, EquipmentSlots, ItemInstance};
pub use error::{CacheError, CraftError, EquipError, IntegrityError, LoadoutError, WorldGenError};
pub use hash::Fingerprint;
pub use loadout::{CacheStats, LoadoutOptimizer, LoadoutSnapshot};
pub use rng::RngChannel;
pub use stat_cache::{PrimaryStat, StatCache};
pub use telemetry::BiomeMetrics;
pub use tilemap::{TileMap, TileType};
pub use world_cache::{ChunkStreamManager, MultiLevelCache};
pub use world_gen::{generate, WorldGenConfig, WorldGenResult};
