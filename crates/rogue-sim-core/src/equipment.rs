// SPDX-License-Identifier: Apache-2.0
//! Fixed equipment slot model, item instances, and durability/repair.

use crate::error::EquipError;
use crate::hash::mix_u64;

/// Fixed equipment slot enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EquipSlot {
    /// Main hand weapon.
    Weapon,
    /// Off hand, empty if the weapon is two-handed.
    Offhand,
    /// Head armor.
    ArmorHead,
    /// Chest armor.
    ArmorChest,
    /// Leg armor.
    ArmorLegs,
    /// Hand armor.
    ArmorHands,
    /// Foot armor.
    ArmorFeet,
    /// First ring slot.
    Ring1,
    /// Second ring slot.
    Ring2,
    /// Amulet.
    Amulet,
    /// Belt.
    Belt,
    /// Cloak.
    Cloak,
    /// First charm slot.
    Charm1,
    /// Second charm slot.
    Charm2,
}

/// All fourteen equipment slots, in the fixed enumeration order.
pub const ALL_SLOTS: [EquipSlot; 14] = [
    EquipSlot::Weapon,
    EquipSlot::Offhand,
    EquipSlot::ArmorHead,
    EquipSlot::ArmorChest,
    EquipSlot::ArmorLegs,
    EquipSlot::ArmorHands,
    EquipSlot::ArmorFeet,
    EquipSlot::Ring1,
    EquipSlot::Ring2,
    EquipSlot::Amulet,
    EquipSlot::Belt,
    EquipSlot::Cloak,
    EquipSlot::Charm1,
    EquipSlot::Charm2,
];

/// A prefix or suffix affix roll.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AffixRoll {
    /// Affix definition index.
    pub index: u32,
    /// Rolled value.
    pub value: f32,
    /// Whether a reforge/crafting operation has locked this affix.
    pub locked: bool,
}

/// Current/max durability, with a fracture flag once durability hits zero.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Durability {
    /// Current durability points.
    pub cur: u32,
    /// Maximum durability points.
    pub max: u32,
    /// Set once `cur` reaches zero; cleared only by a repair.
    pub fractured: bool,
}

/// A single item socket: either empty or holding a gem definition index.
pub type Socket = Option<u32>;

/// Item rarity tier, coarsely driving affix budget and repair cost scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rarity {
    /// No affixes.
    Common,
    /// One affix.
    Magic,
    /// Two to three affixes.
    Rare,
    /// Fixed affix set defined on the item.
    Unique,
    /// Requires a complete set to activate bonuses.
    Set,
}

impl Rarity {
    /// Repair-cost-per-missing-durability-point multiplier.
    #[must_use]
    pub const fn repair_rate(self) -> f32 {
        match self {
            Self::Common => 1.0,
            Self::Magic => 1.5,
            Self::Rare => 2.0,
            Self::Unique => 3.0,
            Self::Set => 2.5,
        }
    }
}

/// A unique live item instance.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemInstance {
    /// Globally unique identifier.
    pub guid: u64,
    /// Item definition index.
    pub def_index: u32,
    /// Stack quantity.
    pub quantity: u32,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Item level, used for affix budget.
    pub item_level: u32,
    /// Prefix affix, if rolled.
    pub prefix: Option<AffixRoll>,
    /// Suffix affix, if rolled.
    pub suffix: Option<AffixRoll>,
    /// Durability state.
    pub durability: Durability,
    /// Sockets, at most 6.
    pub sockets: Vec<Socket>,
    /// Quality roll, `0..=20`.
    pub quality: u8,
    /// Owning player id.
    pub owner_player_id: u64,
    /// Whether this item occupies both weapon hands.
    pub two_handed: bool,
    /// Running fold of `(slot_index << 56) ^ guid ^ 0xE11AFB` over every
    /// slot currently holding this instance; recomputed on every equip
    /// state change.
    pub equip_hash_chain: u64,
}

impl ItemInstance {
    fn affix_value_sum(&self) -> f32 {
        self.prefix.map_or(0.0, |a| a.value) + self.suffix.map_or(0.0, |a| a.value)
    }

    /// Returns `true` if the combined prefix+suffix value does not exceed
    /// `budget`.
    #[must_use]
    pub fn within_affix_budget(&self, budget: f32) -> bool {
        self.affix_value_sum() <= budget
    }
}

/// Capability port for spending a player's currency, injected so equipment
/// logic never reaches into a concrete economy/wallet implementation.
pub trait EconomyPort {
    /// Current spendable currency.
    fn gold(&self) -> u64;
    /// Attempts to deduct `amount`; returns `false` if insufficient.
    fn spend(&mut self, amount: u64) -> bool;
}

/// The fourteen equipment slots for one character.
#[derive(Debug, Clone, Default)]
pub struct EquipmentSlots {
    slots: [Option<ItemInstance>; 14],
    /// Cosmetic transmog override per slot, independent of the item
    /// actually equipped there.
    transmog: [Option<u32>; 14],
    /// Set whenever a slot changes; the stat cache consumes and clears this.
    pub equipment_dirty: bool,
}

const fn slot_index(slot: EquipSlot) -> usize {
    match slot {
        EquipSlot::Weapon => 0,
        EquipSlot::Offhand => 1,
        EquipSlot::ArmorHead => 2,
        EquipSlot::ArmorChest => 3,
        EquipSlot::ArmorLegs => 4,
        EquipSlot::ArmorHands => 5,
        EquipSlot::ArmorFeet => 6,
        EquipSlot::Ring1 => 7,
        EquipSlot::Ring2 => 8,
        EquipSlot::Amulet => 9,
        EquipSlot::Belt => 10,
        EquipSlot::Cloak => 11,
        EquipSlot::Charm1 => 12,
        EquipSlot::Charm2 => 13,
    }
}

pub(crate) fn fold_equip_chain(guid: u64, occupied_slots: &[usize]) -> u64 {
    let mut h = 0u64;
    for &idx in occupied_slots {
        h ^= ((idx as u64) << 56) ^ guid ^ 0x00E1_1AFB;
    }
    h
}

impl EquipmentSlots {
    /// Creates an empty slot set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the instance currently in `slot`, if any.
    #[must_use]
    pub fn get(&self, slot: EquipSlot) -> Option<&ItemInstance> {
        self.slots[slot_index(slot)].as_ref()
    }

    /// Iterates every occupied `(slot index, item)` pair, for auditors that
    /// need to walk the whole slot set rather than query one slot at a
    /// time.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &ItemInstance)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|item| (i, item)))
    }

    fn recompute_chain(&mut self, guid: u64) {
        let occupied: Vec<usize> =
            self.slots.iter().enumerate().filter(|(_, s)| s.as_ref().is_some_and(|i| i.guid == guid)).map(|(i, _)| i).collect();
        for slot in &mut self.slots {
            if let Some(item) = slot {
                if item.guid == guid {
                    item.equip_hash_chain = fold_equip_chain(guid, &occupied);
                }
            }
        }
    }

    /// Equips `instance` into `slot`.
    ///
    /// If `instance` is two-handed and `slot` is `Weapon`, `Offhand` is
    /// cleared. Equipping a two-handed weapon's partner into `Offhand`
    /// while a two-handed weapon already occupies `Weapon` fails.
    ///
    /// # Errors
    /// Returns [`EquipError::OffhandBlocked`] if `slot` is `Offhand` and a
    /// two-handed weapon is equipped.
    pub fn equip_try(&mut self, slot: EquipSlot, instance: ItemInstance) -> Result<Option<ItemInstance>, EquipError> {
        if slot == EquipSlot::Offhand {
            if let Some(weapon) = self.get(EquipSlot::Weapon) {
                if weapon.two_handed {
                    return Err(EquipError::OffhandBlocked);
                }
            }
        }

        let guid = instance.guid;
        let idx = slot_index(slot);
        let previous = self.slots[idx].take();
        self.slots[idx] = Some(instance);

        if slot == EquipSlot::Weapon && self.slots[idx].as_ref().is_some_and(|i| i.two_handed) {
            let off_idx = slot_index(EquipSlot::Offhand);
            self.slots[off_idx] = None;
        }

        self.recompute_chain(guid);
        self.equipment_dirty = true;
        Ok(previous)
    }

    /// Removes and returns the instance in `slot`, if any.
    pub fn unequip(&mut self, slot: EquipSlot) -> Option<ItemInstance> {
        let idx = slot_index(slot);
        let removed = self.slots[idx].take();
        self.equipment_dirty = true;
        removed
    }

    /// Sets a cosmetic transmog override for `slot`, independent of stat
    /// computation.
    pub fn transmog_set(&mut self, slot: EquipSlot, def_index: Option<u32>) {
        self.transmog[slot_index(slot)] = def_index;
    }

    /// Reads the cosmetic transmog override for `slot`.
    #[must_use]
    pub fn transmog_get(&self, slot: EquipSlot) -> Option<u32> {
        self.transmog[slot_index(slot)]
    }

    /// Repairs `slot` to full durability, spending
    /// `missing_durability * rarity.repair_rate()` gold via `economy`.
    ///
    /// # Errors
    /// Returns [`EquipError::SlotEmpty`] if nothing is equipped, or
    /// [`EquipError::InsufficientGold`] if `economy` cannot cover the cost.
    pub fn repair_slot(&mut self, slot: EquipSlot, economy: &mut dyn EconomyPort) -> Result<(), EquipError> {
        let idx = slot_index(slot);
        let Some(item) = self.slots[idx].as_mut() else {
            return Err(EquipError::SlotEmpty);
        };
        let missing = item.durability.max.saturating_sub(item.durability.cur);
        if missing == 0 {
            item.durability.fractured = false;
            return Ok(());
        }
        let cost = (f64::from(missing) * f64::from(item.rarity.repair_rate())).round() as u64;
        if economy.gold() < cost {
            return Err(EquipError::InsufficientGold { needed: cost, available: economy.gold() });
        }
        if !economy.spend(cost) {
            return Err(EquipError::InsufficientGold { needed: cost, available: economy.gold() });
        }
        item.durability.cur = item.durability.max;
        item.durability.fractured = false;
        Ok(())
    }

    /// Folds a stat-relevant summary of every equipped slot into `seed`
    /// using the cache mixer, for callers building a combined fingerprint
    /// input.
    #[must_use]
    pub fn fold_into(&self, mut seed: u64) -> u64 {
        for slot in &self.slots {
            if let Some(item) = slot {
                seed = mix_u64(seed, item.guid);
            }
        }
        seed
    }
}
