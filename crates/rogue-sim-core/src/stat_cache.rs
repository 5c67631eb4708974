// SPDX-License-Identifier: Apache-2.0
//! The layered stat cache: eight additive origin layers per primary stat,
//! rating diminishing-returns curves, resistance soft caps, and a
//! deterministic fingerprint.
//!
//! Equipment aggregation writes directly into the equipment-origin layers
//! (implicit/unique/set/runeword/affix) before [`StatCache::recompute`]
//! runs; this module only owns the attribute/passive/buff layers and the
//! downstream derived values.

use crate::hash::{fold_fingerprint, Fingerprint};

/// One of the four primary character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimaryStat {
    /// Strength.
    Strength,
    /// Dexterity.
    Dexterity,
    /// Vitality.
    Vitality,
    /// Intelligence.
    Intelligence,
}

/// All four primary stats, in the fixed enumeration order.
pub const ALL_PRIMARY_STATS: [PrimaryStat; 4] =
    [PrimaryStat::Strength, PrimaryStat::Dexterity, PrimaryStat::Vitality, PrimaryStat::Intelligence];

const fn stat_index(stat: PrimaryStat) -> usize {
    match stat {
        PrimaryStat::Strength => 0,
        PrimaryStat::Dexterity => 1,
        PrimaryStat::Vitality => 2,
        PrimaryStat::Intelligence => 3,
    }
}

/// One of the eight additive origin layers for a primary stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatLayer {
    /// Raw attribute points from leveling/allocation.
    Base,
    /// An item's built-in implicit bonus.
    Implicit,
    /// A unique item's fixed bonus.
    Unique,
    /// A set item's partial/full-set bonus.
    Set,
    /// A runeword's bonus.
    Runeword,
    /// A rolled prefix/suffix affix bonus.
    Affix,
    /// Passive progression-tree bonus.
    Passive,
    /// Active buff bonus.
    Buff,
}

const fn layer_index(layer: StatLayer) -> usize {
    match layer {
        StatLayer::Base => 0,
        StatLayer::Implicit => 1,
        StatLayer::Unique => 2,
        StatLayer::Set => 3,
        StatLayer::Runeword => 4,
        StatLayer::Affix => 5,
        StatLayer::Passive => 6,
        StatLayer::Buff => 7,
    }
}

const NUM_STATS: usize = 4;
const NUM_LAYERS: usize = 8;

/// One of the six resistance channels, each independently soft-capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resistance {
    /// Physical resistance.
    Physical,
    /// Fire resistance.
    Fire,
    /// Cold resistance.
    Cold,
    /// Lightning resistance.
    Lightning,
    /// Poison resistance.
    Poison,
    /// Status-effect resistance.
    Status,
}

const fn resistance_index(res: Resistance) -> usize {
    match res {
        Resistance::Physical => 0,
        Resistance::Fire => 1,
        Resistance::Cold => 2,
        Resistance::Lightning => 3,
        Resistance::Poison => 4,
        Resistance::Status => 5,
    }
}

const NUM_RESISTANCES: usize = 6;

/// Raw attribute point totals supplied by the caller's player/character
/// record, consumed by the attribute dirty bit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerBaseStats {
    /// Raw strength points.
    pub strength: f32,
    /// Raw dexterity points.
    pub dexterity: f32,
    /// Raw vitality points.
    pub vitality: f32,
    /// Raw intelligence points.
    pub intelligence: f32,
}

impl PlayerBaseStats {
    const fn value(&self, stat: PrimaryStat) -> f32 {
        match stat {
            PrimaryStat::Strength => self.strength,
            PrimaryStat::Dexterity => self.dexterity,
            PrimaryStat::Vitality => self.vitality,
            PrimaryStat::Intelligence => self.intelligence,
        }
    }
}

/// Capability port querying passive-progression stat totals, injected so
/// the stat cache never reaches into a concrete progression system.
pub trait ProgressionPort {
    /// Returns the current passive-tree bonus for `stat`.
    fn passive_total(&self, stat: PrimaryStat) -> f32;
}

/// Capability port querying active buff stat bonuses.
pub trait BuffPort {
    /// Returns the current active-buff bonus for `stat`.
    fn buff_total(&self, stat: PrimaryStat) -> f32;
}

/// Dirty bit set on an attribute (base stat) change.
pub const DIRTY_ATTR: u8 = 1 << 0;
/// Dirty bit set on a passive-tree change.
pub const DIRTY_PASSIVE: u8 = 1 << 1;
/// Dirty bit set on a buff application/expiry.
pub const DIRTY_BUFF: u8 = 1 << 2;
/// Dirty bit set on an equipment slot change.
pub const DIRTY_EQUIPMENT: u8 = 1 << 3;

struct RatingBand {
    /// Width of this band in rating points; `None` for the final open band.
    width: Option<f32>,
    scale: f32,
    k: f32,
}

const CRIT_BANDS: [RatingBand; 5] = [
    RatingBand { width: Some(200.0), scale: 0.065, k: 180.0 },
    RatingBand { width: Some(400.0), scale: 0.040, k: 320.0 },
    RatingBand { width: Some(800.0), scale: 0.022, k: 640.0 },
    RatingBand { width: Some(1200.0), scale: 0.012, k: 1200.0 },
    RatingBand { width: None, scale: 0.008, k: 2000.0 },
];
const CRIT_HARD_CAP: f32 = 75.0;

const HASTE_BANDS: [RatingBand; 5] = [
    RatingBand { width: Some(200.0), scale: 0.050, k: 220.0 },
    RatingBand { width: Some(400.0), scale: 0.030, k: 420.0 },
    RatingBand { width: Some(800.0), scale: 0.018, k: 780.0 },
    RatingBand { width: Some(1200.0), scale: 0.010, k: 1400.0 },
    RatingBand { width: None, scale: 0.007, k: 2400.0 },
];
const HASTE_HARD_CAP: f32 = 55.0;

const AVOIDANCE_BANDS: [RatingBand; 5] = [
    RatingBand { width: Some(200.0), scale: 0.055, k: 200.0 },
    RatingBand { width: Some(400.0), scale: 0.034, k: 360.0 },
    RatingBand { width: Some(800.0), scale: 0.020, k: 700.0 },
    RatingBand { width: Some(1200.0), scale: 0.011, k: 1300.0 },
    RatingBand { width: None, scale: 0.0075, k: 2200.0 },
];
const AVOIDANCE_HARD_CAP: f32 = 65.0;

/// Converts a rating to its diminishing-returns effective percent: a
/// tax-bracket walk over `bands`, each contributing `dr * scale / (1 +
/// dr/k)` for the portion `dr` of `rating` falling within it, summed and
/// clamped to `hard_cap`.
fn effective_percent(rating: f32, bands: &[RatingBand; 5], hard_cap: f32) -> f32 {
    let mut remaining = rating.max(0.0);
    let mut total = 0.0;
    for band in bands {
        if remaining <= 0.0 {
            break;
        }
        let dr = band.width.map_or(remaining, |w| remaining.min(w));
        total += dr * band.scale / (1.0 + dr / band.k);
        remaining -= dr;
    }
    total.min(hard_cap)
}

const RESIST_SOFT_CAP: f32 = 75.0;
const RESIST_HARD_CAP: f32 = 90.0;
const RESIST_SOFTNESS: f32 = 0.85;

/// Applies the resistance soft cap: values at or above the hard cap clamp
/// to it (idempotently); values above the soft cap compress through
/// `soft_cap + (v - soft_cap) / (1 + (v - soft_cap)/(soft_cap * softness))^2`,
/// then clamp to the hard cap; negative values clamp to zero.
fn soft_cap_resistance(raw: f32) -> f32 {
    if raw >= RESIST_HARD_CAP {
        return RESIST_HARD_CAP;
    }
    if raw > RESIST_SOFT_CAP {
        let over = raw - RESIST_SOFT_CAP;
        let denom = 1.0 + over / (RESIST_SOFT_CAP * RESIST_SOFTNESS);
        return (RESIST_SOFT_CAP + over / (denom * denom)).min(RESIST_HARD_CAP);
    }
    raw.max(0.0)
}

fn scaled(v: f32) -> i64 {
    (f64::from(v) * 1000.0).round() as i64
}

/// The process's one layered stat cache.
///
/// Holds the eight origin layers per primary stat, every derived/defensive
/// field the recompute pass produces, and the dirty-tracking/fingerprint
/// machinery. Equipment aggregation writes equipment-origin layers and the
/// externally-sourced scalar inputs (armor, max health, raw resistances)
/// directly via the `pub` fields and [`StatCache::set_layer`] before calling
/// [`StatCache::recompute`].
#[derive(Debug, Clone)]
pub struct StatCache {
    layers: [[f32; NUM_LAYERS]; NUM_STATS],
    totals: [f32; NUM_STATS],
    last_base: [f32; NUM_STATS],
    last_total: [f32; NUM_STATS],

    /// Externally-populated max health input (equipment + base).
    pub max_health: f32,
    /// Externally-populated summed armor value.
    pub armor_total: f32,
    /// Externally-populated base weapon damage.
    pub base_weapon_damage: f32,

    /// Raw (pre-soft-cap) resistance values, written externally.
    pub resistances_raw: [f32; NUM_RESISTANCES],
    /// Soft-capped resistance values, written by [`StatCache::recompute`].
    resistances: [f32; NUM_RESISTANCES],

    /// Chance to block an attack, in percent.
    pub block_chance: f32,
    /// Damage absorbed by a successful block.
    pub block_value: f32,
    /// Percent of guard recovery speed.
    pub guard_recovery_pct: f32,
    /// Thorns damage reflected, in percent of damage taken.
    pub thorns_percent: f32,
    /// Maximum thorns damage reflected per hit.
    pub thorns_cap: f32,

    /// Percent of physical damage converted to fire.
    pub phys_to_fire_pct: f32,
    /// Percent of physical damage converted to frost.
    pub phys_to_frost_pct: f32,
    /// Percent of physical damage converted to arcane.
    pub phys_to_arcane_pct: f32,

    /// Raw crit rating.
    pub crit_rating: f32,
    /// Raw haste rating.
    pub haste_rating: f32,
    /// Raw avoidance rating.
    pub avoidance_rating: f32,
    /// Post-curve crit effective percent, written by recompute.
    pub crit_effective_pct: f32,
    /// Post-curve haste effective percent, written by recompute.
    pub haste_effective_pct: f32,
    /// Post-curve avoidance effective percent, written by recompute.
    pub avoidance_effective_pct: f32,

    /// Estimated damage per second, written by recompute.
    pub dps_estimate: f32,
    /// Estimated effective health pool, written by recompute.
    pub ehp_estimate: f32,
    /// Movement speed estimate, written by recompute.
    pub mobility: f32,
    /// Combined defensive rating, written by recompute.
    pub toughness: f32,
    /// Sustain estimate, written by recompute.
    pub sustain: f32,

    /// Current fingerprint, written by recompute.
    pub fingerprint: Fingerprint,
    /// Set by any mark-dirty call; cleared once recompute finishes.
    pub dirty: bool,
    dirty_bits: u8,
    /// Total number of completed recomputes.
    pub recompute_count: u64,
    /// Number of recomputes that touched the passive-tree layer, tracked
    /// separately since progression queries are the most expensive input.
    pub heavy_recompute_count: u64,
}

impl Default for StatCache {
    fn default() -> Self {
        Self {
            layers: [[0.0; NUM_LAYERS]; NUM_STATS],
            totals: [0.0; NUM_STATS],
            last_base: [0.0; NUM_STATS],
            last_total: [0.0; NUM_STATS],
            max_health: 0.0,
            armor_total: 0.0,
            base_weapon_damage: 0.0,
            resistances_raw: [0.0; NUM_RESISTANCES],
            resistances: [0.0; NUM_RESISTANCES],
            block_chance: 0.0,
            block_value: 0.0,
            guard_recovery_pct: 0.0,
            thorns_percent: 0.0,
            thorns_cap: 0.0,
            phys_to_fire_pct: 0.0,
            phys_to_frost_pct: 0.0,
            phys_to_arcane_pct: 0.0,
            crit_rating: 0.0,
            haste_rating: 0.0,
            avoidance_rating: 0.0,
            crit_effective_pct: 0.0,
            haste_effective_pct: 0.0,
            avoidance_effective_pct: 0.0,
            dps_estimate: 0.0,
            ehp_estimate: 0.0,
            mobility: 0.0,
            toughness: 0.0,
            sustain: 0.0,
            fingerprint: 0,
            dirty: false,
            dirty_bits: 0,
            recompute_count: 0,
            heavy_recompute_count: 0,
        }
    }
}

impl StatCache {
    /// Creates a zeroed, non-dirty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `bits` dirty, to be picked up on the next [`Self::recompute`].
    pub fn mark_dirty(&mut self, bits: u8) {
        self.dirty = true;
        self.dirty_bits |= bits;
    }

    /// Writes an equipment-origin layer value for `stat` and marks the
    /// equipment dirty bit. Equipment aggregation is expected to call this
    /// once per `(stat, layer)` pair with the full summed contribution
    /// across all equipped items, not an incremental delta.
    pub fn set_layer(&mut self, stat: PrimaryStat, layer: StatLayer, value: f32) {
        self.layers[stat_index(stat)][layer_index(layer)] = value;
        self.mark_dirty(DIRTY_EQUIPMENT);
    }

    /// Reads the current total for `stat` (sum of all eight layers as of
    /// the last recompute).
    #[must_use]
    pub fn total(&self, stat: PrimaryStat) -> f32 {
        self.totals[stat_index(stat)]
    }

    /// Reads the soft-capped value for `resistance` as of the last
    /// recompute.
    #[must_use]
    pub fn resistance(&self, resistance: Resistance) -> f32 {
        self.resistances[resistance_index(resistance)]
    }

    fn recovered_base(&self, idx: usize, input: f32) -> f32 {
        if (input - self.last_total[idx]).abs() < f32::EPSILON {
            self.last_base[idx]
        } else {
            input
        }
    }

    /// Runs the nine-step recompute pass if the cache is dirty; a no-op
    /// otherwise.
    pub fn recompute(&mut self, base: &PlayerBaseStats, progression: &dyn ProgressionPort, buffs: &dyn BuffPort) {
        if !self.dirty {
            return;
        }

        if self.dirty_bits & DIRTY_ATTR != 0 {
            for stat in ALL_PRIMARY_STATS {
                let idx = stat_index(stat);
                let recovered = self.recovered_base(idx, base.value(stat));
                self.layers[idx][layer_index(StatLayer::Base)] = recovered;
            }
        }
        if self.dirty_bits & DIRTY_PASSIVE != 0 {
            for stat in ALL_PRIMARY_STATS {
                self.layers[stat_index(stat)][layer_index(StatLayer::Passive)] = progression.passive_total(stat);
            }
            self.heavy_recompute_count += 1;
        }
        if self.dirty_bits & DIRTY_BUFF != 0 {
            for stat in ALL_PRIMARY_STATS {
                self.layers[stat_index(stat)][layer_index(StatLayer::Buff)] = buffs.buff_total(stat);
            }
        }
        // DIRTY_EQUIPMENT: the equipment-origin layers were already written
        // by set_layer before this call; nothing further to pull here.

        for (idx, total) in self.totals.iter_mut().enumerate() {
            *total = self.layers[idx].iter().sum();
        }

        self.crit_effective_pct = effective_percent(self.crit_rating, &CRIT_BANDS, CRIT_HARD_CAP);
        self.haste_effective_pct = effective_percent(self.haste_rating, &HASTE_BANDS, HASTE_HARD_CAP);
        self.avoidance_effective_pct = effective_percent(self.avoidance_rating, &AVOIDANCE_BANDS, AVOIDANCE_HARD_CAP);

        let dex_total = self.totals[stat_index(PrimaryStat::Dexterity)];
        let vit_total = self.totals[stat_index(PrimaryStat::Vitality)];
        self.dps_estimate = self.base_weapon_damage
            * (1.0 + dex_total / 50.0)
            * (1.0 + self.crit_effective_pct / 100.0);
        let ehp_floor = self.max_health + self.armor_total * 2.0;
        self.ehp_estimate = (ehp_floor * (1.0 + vit_total / 200.0)).max(ehp_floor);
        self.mobility = 100.0 + dex_total * 1.5;
        let avg_resist = self.resistances_raw.iter().copied().map(soft_cap_resistance).sum::<f32>()
            / NUM_RESISTANCES as f32;
        self.toughness = self.ehp_estimate * (1.0 + avg_resist / 100.0);
        self.sustain = vit_total * 0.1 + self.guard_recovery_pct;

        for (i, raw) in self.resistances_raw.iter().enumerate() {
            self.resistances[i] = soft_cap_resistance(*raw);
        }

        self.fingerprint = self.compute_fingerprint();

        self.dirty = false;
        self.dirty_bits = 0;
        self.last_base = std::array::from_fn(|i| self.layers[i][layer_index(StatLayer::Base)]);
        self.last_total = self.totals;
        self.recompute_count += 1;
    }

    /// Forces a full recompute of every layer regardless of the current
    /// dirty state, the single consolidated entry point for callers that
    /// need a guaranteed up-to-date cache (e.g. before a save or a
    /// replay-verification check).
    pub fn force_update(&mut self, base: &PlayerBaseStats, progression: &dyn ProgressionPort, buffs: &dyn BuffPort) {
        self.dirty = true;
        self.dirty_bits = DIRTY_ATTR | DIRTY_PASSIVE | DIRTY_BUFF | DIRTY_EQUIPMENT;
        self.recompute(base, progression, buffs);
    }

    /// Folds the stat cache's explicit output fields, in a fixed order,
    /// into a deterministic fingerprint. Never folds raw struct memory:
    /// field order and count are pinned here so padding or reordering the
    /// struct cannot perturb the result.
    fn compute_fingerprint(&self) -> Fingerprint {
        let mut fields = Vec::with_capacity(28);
        for &t in &self.totals {
            fields.push(scaled(t));
        }
        fields.push(scaled(self.dps_estimate));
        fields.push(scaled(self.ehp_estimate));
        fields.push(scaled(self.mobility));
        fields.push(scaled(self.toughness));
        fields.push(scaled(self.sustain));
        for &r in &self.resistances {
            fields.push(scaled(r));
        }
        fields.push(scaled(self.block_chance));
        fields.push(scaled(self.block_value));
        fields.push(scaled(self.guard_recovery_pct));
        fields.push(scaled(self.thorns_percent));
        fields.push(scaled(self.thorns_cap));
        fields.push(scaled(self.phys_to_fire_pct));
        fields.push(scaled(self.phys_to_frost_pct));
        fields.push(scaled(self.phys_to_arcane_pct));
        fields.push(scaled(self.crit_effective_pct));
        fields.push(scaled(self.haste_effective_pct));
        fields.push(scaled(self.avoidance_effective_pct));
        fold_fingerprint(&fields)
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct NoProgression;
    impl ProgressionPort for NoProgression {
        fn passive_total(&self, _stat: PrimaryStat) -> f32 {
            0.0
        }
    }

    struct NoBuffs;
    impl BuffPort for NoBuffs {
        fn buff_total(&self, _stat: PrimaryStat) -> f32 {
            0.0
        }
    }

    fn base(str_: f32, dex: f32, vit: f32, int_: f32) -> PlayerBaseStats {
        PlayerBaseStats { strength: str_, dexterity: dex, vitality: vit, intelligence: int_ }
    }

    #[test]
    fn recompute_is_a_no_op_when_not_dirty() {
        let mut cache = StatCache::new();
        cache.recompute(&base(10.0, 5.0, 7.0, 3.0), &NoProgression, &NoBuffs);
        assert_eq!(cache.recompute_count, 0);
    }

    #[test]
    fn equip_order_does_not_affect_fingerprint() {
        let mut a = StatCache::new();
        a.mark_dirty(DIRTY_ATTR);
        a.recompute(&base(10.0, 5.0, 7.0, 3.0), &NoProgression, &NoBuffs);
        a.set_layer(PrimaryStat::Strength, StatLayer::Affix, 5.0);
        a.set_layer(PrimaryStat::Vitality, StatLayer::Affix, 3.0);
        a.resistances_raw[resistance_index(Resistance::Physical)] = 2.0;
        a.set_layer(PrimaryStat::Dexterity, StatLayer::Affix, 4.0);
        a.resistances_raw[resistance_index(Resistance::Fire)] = 6.0;
        a.recompute(&base(10.0, 5.0, 7.0, 3.0), &NoProgression, &NoBuffs);

        let mut b = StatCache::new();
        b.mark_dirty(DIRTY_ATTR);
        b.recompute(&base(10.0, 5.0, 7.0, 3.0), &NoProgression, &NoBuffs);
        b.set_layer(PrimaryStat::Dexterity, StatLayer::Affix, 4.0);
        b.resistances_raw[resistance_index(Resistance::Fire)] = 6.0;
        b.set_layer(PrimaryStat::Strength, StatLayer::Affix, 5.0);
        b.set_layer(PrimaryStat::Vitality, StatLayer::Affix, 3.0);
        b.resistances_raw[resistance_index(Resistance::Physical)] = 2.0;
        b.recompute(&base(10.0, 5.0, 7.0, 3.0), &NoProgression, &NoBuffs);

        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn soft_cap_clamps_high_resistance_and_is_idempotent() {
        let mut cache = StatCache::new();
        cache.resistances_raw[resistance_index(Resistance::Physical)] = 120.0;
        cache.mark_dirty(DIRTY_ATTR);
        cache.recompute(&base(0.0, 0.0, 0.0, 0.0), &NoProgression, &NoBuffs);
        assert!((cache.resistance(Resistance::Physical) - 90.0).abs() < 1e-6);

        cache.force_update(&base(0.0, 0.0, 0.0, 0.0), &NoProgression, &NoBuffs);
        assert!((cache.resistance(Resistance::Physical) - 90.0).abs() < 1e-6);
    }

    #[test]
    fn crit_effective_percent_never_exceeds_hard_cap() {
        let pct = effective_percent(100_000.0, &CRIT_BANDS, CRIT_HARD_CAP);
        assert!(pct <= CRIT_HARD_CAP);
    }

    #[test]
    fn dirty_bit_scoping_only_touches_its_own_layer() {
        let mut cache = StatCache::new();
        cache.mark_dirty(DIRTY_ATTR);
        cache.recompute(&base(10.0, 0.0, 0.0, 0.0), &NoProgression, &NoBuffs);
        assert!((cache.total(PrimaryStat::Strength) - 10.0).abs() < 1e-6);
        assert_eq!(cache.heavy_recompute_count, 0);

        cache.mark_dirty(DIRTY_PASSIVE);
        cache.recompute(&base(10.0, 0.0, 0.0, 0.0), &NoProgression, &NoBuffs);
        assert_eq!(cache.heavy_recompute_count, 1);
    }

    #[test]
    fn recompute_count_increments_once_per_pass() {
        let mut cache = StatCache::new();
        cache.mark_dirty(DIRTY_ATTR);
        cache.recompute(&base(1.0, 1.0, 1.0, 1.0), &NoProgression, &NoBuffs);
        cache.recompute(&base(1.0, 1.0, 1.0, 1.0), &NoProgression, &NoBuffs);
        assert_eq!(cache.recompute_count, 1);
    }
}
