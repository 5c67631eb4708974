// SPDX-License-Identifier: Apache-2.0
//! Error taxonomy for the simulation core.
//!
//! Each operation family gets its own sum type rather than a shared
//! catch-all, so the code-to-meaning mapping documented in the spec stays
//! stable as the crate grows. Variants map 1:1 onto the error kinds the
//! original C implementation returned as negative codes.

use thiserror::Error;

/// Errors raised while running the world generation pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldGenError {
    /// A dimension (width/height) was zero or negative.
    #[error("invalid world dimensions: width={width}, height={height}")]
    InvalidDimensions {
        /// Requested width.
        width: i64,
        /// Requested height.
        height: i64,
    },
    /// Allocating the tile map or an auxiliary field failed.
    #[error("allocation failed for a {field} field of {cells} cells")]
    AllocFailed {
        /// Name of the field that failed to allocate.
        field: &'static str,
        /// Number of cells requested.
        cells: usize,
    },
}

/// Errors raised by the chunk stream manager and multi-level cache.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The request/generation queue was full.
    #[error("chunk stream queue is at capacity ({capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },
    /// No key was found for a lookup operation.
    #[error("no cache entry for key {key}")]
    NotFound {
        /// The key that was looked up.
        key: u64,
    },
    /// A cache/arena allocation failed.
    #[error("cache allocation failed: {reason}")]
    AllocFailed {
        /// Human-readable reason.
        reason: &'static str,
    },
}

/// Errors raised by crafting and item-enhancement operations.
///
/// All crafting operations are transactional: on `ValidationFailed` or
/// `InsufficientResources`, no resources are consumed and no affix state is
/// written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CraftError {
    /// Gold, catalyst material, or item quantity was short.
    #[error("insufficient resources: needed {needed}, have {available}")]
    InsufficientResources {
        /// Amount required.
        needed: u64,
        /// Amount available.
        available: u64,
    },
    /// The operation would exceed the item's affix budget, target a locked
    /// affix, or produce a banned affix pair.
    #[error("validation failed: {reason}")]
    ValidationFailed {
        /// Human-readable reason.
        reason: &'static str,
    },
    /// The crafting journal is at its fixed capacity.
    #[error("crafting journal is full ({capacity} entries)")]
    JournalFull {
        /// Configured journal capacity.
        capacity: usize,
    },
    /// The item instance table has no free slots.
    #[error("item instance table is full ({capacity} entries)")]
    CapacityExhausted {
        /// Configured instance table capacity.
        capacity: usize,
    },
}

/// Errors raised by equipment slot operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EquipError {
    /// The offhand slot was targeted while a two-handed weapon is equipped.
    #[error("offhand is occupied by a two-handed weapon")]
    OffhandBlocked,
    /// No item instance occupies the targeted slot.
    #[error("slot is empty")]
    SlotEmpty,
    /// Gold was insufficient to repair the targeted slot.
    #[error("insufficient gold: needed {needed}, have {available}")]
    InsufficientGold {
        /// Gold required.
        needed: u64,
        /// Gold available.
        available: u64,
    },
}

/// Errors raised by integrity auditors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    /// An item's equip-chain hash did not match the recomputed expectation.
    #[error("equip-chain hash mismatch for guid {guid}: expected {expected:#x}, found {found:#x}")]
    ChainMismatch {
        /// The item's GUID.
        guid: u64,
        /// Recomputed expected hash.
        expected: u64,
        /// Hash stored on the instance.
        found: u64,
    },
}

/// Errors raised by the async loadout optimizer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadoutError {
    /// `launch` was called while a job was already outstanding.
    #[error("a loadout optimization job is already running")]
    AlreadyRunning,
    /// `join` was called with no job outstanding.
    #[error("no loadout optimization job is running")]
    NotRunning,
}

