// SPDX-License-Identifier: Apache-2.0
//! Crafting RNG streams and the append-only crafting journal.
//!
//! Crafting draws from four independent channels rather than a single
//! shared stream, so adding a draw to one operation family (say,
//! enhancement) never perturbs another (gathering) for a fixed seed.

use crate::error::CraftError;
use crate::hash::{fnv1a_byte, Fingerprint};
use crate::rng::RngChannel;

/// One of the four independent crafting RNG channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CraftStream {
    /// Resource gathering rolls.
    Gathering,
    /// Material refinement rolls.
    Refinement,
    /// Crafted-item quality rolls.
    CraftQuality,
    /// Enhancement/enchantment rolls.
    Enhancement,
}

const fn stream_id(stream: CraftStream) -> u32 {
    match stream {
        CraftStream::Gathering => 0,
        CraftStream::Refinement => 1,
        CraftStream::CraftQuality => 2,
        CraftStream::Enhancement => 3,
    }
}

const NUM_STREAMS: usize = 4;

/// Four independent RNG channels for crafting, seeded from one session
/// seed so each stream advances without affecting the others.
#[derive(Debug, Clone, Copy)]
pub struct CraftRngContext {
    channels: [RngChannel; NUM_STREAMS],
}

impl CraftRngContext {
    /// Derives the four channels from `session_seed`: each is seeded from
    /// `session_seed xor (0x9E3779B9 * (stream_id + 1))`, non-zero-ensured.
    #[must_use]
    pub fn from_seed(session_seed: u32) -> Self {
        let mut channels = [RngChannel::seeded(0); NUM_STREAMS];
        for (i, ch) in channels.iter_mut().enumerate() {
            let mixed = session_seed ^ 0x9E37_79B9u32.wrapping_mul(i as u32 + 1);
            *ch = RngChannel::seeded(mixed);
        }
        Self { channels }
    }

    /// Advances `stream` by one draw and returns the raw value.
    pub fn rng_next(&mut self, stream: CraftStream) -> u32 {
        self.channels[stream_id(stream) as usize].next_u32()
    }

    /// Returns a mutable reference to `stream`'s channel, for callers that
    /// need range/chance draws rather than a raw `u32`.
    pub fn channel_mut(&mut self, stream: CraftStream) -> &mut RngChannel {
        &mut self.channels[stream_id(stream) as usize]
    }
}

/// One entry in the crafting journal: `(op_id, item_guid, pre_budget,
/// post_budget, stream_id, outcome_hash)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JournalEntry {
    /// Position of this entry in the journal; equal to the entry count at
    /// the time it was appended.
    pub op_id: u64,
    /// GUID of the item the operation acted on.
    pub item_guid: u64,
    /// Affix budget before the operation.
    pub pre_budget: f32,
    /// Affix budget after the operation.
    pub post_budget: f32,
    /// Which crafting RNG stream produced the operation's rolls.
    pub stream_id: u32,
    /// Hash of the operation's outcome, for replay verification.
    pub outcome_hash: u64,
}

/// Default capacity of a [`CraftJournal`], matching `ROGUE_CRAFT_JOURNAL_CAP`.
pub const DEFAULT_JOURNAL_CAP: usize = 4096;

/// An append-only ring of crafting operations with a running accumulated
/// hash over every field ever appended.
#[derive(Debug, Clone)]
pub struct CraftJournal {
    entries: Vec<JournalEntry>,
    capacity: usize,
    accumulated_hash: Fingerprint,
}

impl Default for CraftJournal {
    fn default() -> Self {
        Self::new(DEFAULT_JOURNAL_CAP)
    }
}

impl CraftJournal {
    /// Creates an empty journal holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: Vec::new(), capacity, accumulated_hash: crate::hash::fnv1a(&[]) }
    }

    /// Appends a new entry, assigning `op_id` as the current entry count,
    /// and folds all six fields into the running accumulated hash.
    ///
    /// # Errors
    /// Returns [`CraftError::JournalFull`] if the journal is already at
    /// capacity; the journal is left unchanged.
    pub fn append(
        &mut self,
        item_guid: u64,
        pre_budget: f32,
        post_budget: f32,
        stream_id: u32,
        outcome_hash: u64,
    ) -> Result<u64, CraftError> {
        if self.entries.len() >= self.capacity {
            return Err(CraftError::JournalFull { capacity: self.capacity });
        }
        let op_id = self.entries.len() as u64;
        let entry = JournalEntry { op_id, item_guid, pre_budget, post_budget, stream_id, outcome_hash };

        let mut h = self.accumulated_hash;
        for b in entry.op_id.to_le_bytes() {
            h = fnv1a_byte(h, b);
        }
        for b in entry.item_guid.to_le_bytes() {
            h = fnv1a_byte(h, b);
        }
        for b in entry.pre_budget.to_le_bytes() {
            h = fnv1a_byte(h, b);
        }
        for b in entry.post_budget.to_le_bytes() {
            h = fnv1a_byte(h, b);
        }
        for b in entry.stream_id.to_le_bytes() {
            h = fnv1a_byte(h, b);
        }
        for b in entry.outcome_hash.to_le_bytes() {
            h = fnv1a_byte(h, b);
        }
        self.accumulated_hash = h;

        self.entries.push(entry);
        Ok(op_id)
    }

    /// Clears all entries and reinitializes the accumulated hash to the
    /// FNV offset basis.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.accumulated_hash = crate::hash::fnv1a(&[]);
    }

    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the journal has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured maximum capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reads the entry at `op_id`, if it is still present.
    #[must_use]
    pub fn get(&self, op_id: u64) -> Option<&JournalEntry> {
        self.entries.get(op_id as usize)
    }

    /// The running FNV-1a accumulated hash over every appended entry.
    #[must_use]
    pub fn accumulated_hash(&self) -> Fingerprint {
        self.accumulated_hash
    }
}
