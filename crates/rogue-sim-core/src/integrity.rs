// SPDX-License-Identifier: Apache-2.0
//! Integrity auditors: proc-rate anomalies, banned affix pairs, equip-chain
//! verification, and duplicate GUID detection.
//!
//! None of these mutate state; each takes a read-only view of the records
//! it audits and reports findings as plain data for the caller to act on.

use crate::equipment::{fold_equip_chain, EquipmentSlots};
use crate::error::IntegrityError;

/// A tracked proc with its rolling trigger rate.
#[derive(Debug, Clone, Copy)]
pub struct ProcRecord {
    /// Stable proc identifier.
    pub id: u32,
    /// Rolling triggers-per-minute observed for this proc.
    pub triggers_per_minute: f32,
}

/// Returns the ids of every proc in `registry` whose rolling rate exceeds
/// `max_tpm`.
#[must_use]
pub fn proc_rate_anomalies(registry: &[ProcRecord], max_tpm: f32) -> Vec<u32> {
    registry.iter().filter(|p| p.triggers_per_minute > max_tpm).map(|p| p.id).collect()
}

/// An unordered pair of affix indices that must never co-occur on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannedAffixPair(pub u32, pub u32);

impl BannedAffixPair {
    fn matches(self, a: u32, b: u32) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }
}

/// Returns `true` if `prefix_index` and `suffix_index` together form a
/// registered banned pair.
#[must_use]
pub fn is_banned_pair(registry: &[BannedAffixPair], prefix_index: u32, suffix_index: u32) -> bool {
    registry.iter().any(|pair| pair.matches(prefix_index, suffix_index))
}

/// Recomputes and checks the equip-chain hash for every item currently
/// equipped in `slots`, returning a mismatch error for each item whose
/// stored hash does not match the recomputed expectation.
#[must_use]
pub fn audit_equip_chains(slots: &EquipmentSlots) -> Vec<IntegrityError> {
    let occupied: Vec<(usize, u64)> = slots.occupied().map(|(i, item)| (i, item.guid)).collect();
    let mut mismatches = Vec::new();
    for (_, item) in slots.occupied() {
        let own_slots: Vec<usize> =
            occupied.iter().filter(|(_, guid)| *guid == item.guid).map(|(i, _)| *i).collect();
        let expected = fold_equip_chain(item.guid, &own_slots);
        if expected != item.equip_hash_chain {
            mismatches.push(IntegrityError::ChainMismatch {
                guid: item.guid,
                expected,
                found: item.equip_hash_chain,
            });
        }
    }
    mismatches
}

/// Scans `guids` for duplicates via a linear pairwise comparison, returning
/// the index of every entry whose GUID was already seen at an earlier
/// index.
#[must_use]
pub fn duplicate_guid_indices(guids: &[u64]) -> Vec<usize> {
    let mut duplicates = Vec::new();
    for (i, &guid) in guids.iter().enumerate() {
        if guids[..i].contains(&guid) {
            duplicates.push(i);
        }
    }
    duplicates
}
