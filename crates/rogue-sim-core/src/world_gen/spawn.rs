// SPDX-License-Identifier: Apache-2.0
//! Phase 8: enemy density mapping and spawn-table sampling.
//!
//! This phase only computes a density field and samples a registry; it does
//! not itself touch the tile map, so it is exposed for callers to invoke on
//! demand (e.g. when a chunk streams in) rather than run unconditionally
//! during world generation.

use crate::rng::RngChannel;
use crate::tilemap::{TileMap, TileType};

/// One entry in a [`SpawnTable`]: a spawnable id with separate common/rare
/// weights.
#[derive(Debug, Clone, Copy)]
pub struct SpawnTableEntry {
    /// Spawnable identifier.
    pub id: u32,
    /// Weight used when rolling on the common pool.
    pub common_weight: u32,
    /// Weight used when rolling on the rare pool.
    pub rare_weight: u32,
}

/// A registry of up to 16 spawnable entries for one biome/tile key.
#[derive(Debug, Clone, Default)]
pub struct SpawnTable {
    entries: Vec<SpawnTableEntry>,
}

impl SpawnTable {
    /// Builds a table from at most 16 entries, truncating any excess.
    #[must_use]
    pub fn new(mut entries: Vec<SpawnTableEntry>) -> Self {
        entries.truncate(16);
        Self { entries }
    }

    fn pick(entries_with_weight: &[(u32, u32)], roll: u32) -> Option<u32> {
        let total: u32 = entries_with_weight.iter().map(|(_, w)| *w).sum();
        if total == 0 {
            return None;
        }
        let mut r = roll % total;
        for &(id, w) in entries_with_weight {
            if r < w {
                return Some(id);
            }
            r -= w;
        }
        None
    }

    fn pick_common(&self, micro: &mut RngChannel) -> Option<u32> {
        let weights: Vec<(u32, u32)> = self.entries.iter().map(|e| (e.id, e.common_weight)).collect();
        Self::pick(&weights, micro.next_u32())
    }

    fn pick_rare(&self, micro: &mut RngChannel) -> Option<u32> {
        let weights: Vec<(u32, u32)> = self.entries.iter().map(|e| (e.id, e.rare_weight)).collect();
        Self::pick(&weights, micro.next_u32())
    }
}

/// Per-cell base spawn density keyed by biome, before hub suppression.
#[derive(Debug, Clone)]
pub struct DensityMap {
    width: i32,
    height: i32,
    density: Vec<f32>,
}

fn base_density(tile: TileType) -> f32 {
    match tile {
        TileType::Grass => 0.6,
        TileType::Forest => 0.9,
        TileType::Swamp => 0.4,
        TileType::Snow => 0.35,
        TileType::DungeonFloor => 0.5,
        _ => 0.0,
    }
}

impl DensityMap {
    /// Computes the density field for `map`: base density by biome, reduced
    /// near water, then suppressed near `hubs` within `hub_radius`.
    #[must_use]
    pub fn build(map: &TileMap, hubs: &[(i32, i32)], hub_radius: f32) -> Self {
        let w = map.width();
        let h = map.height();
        let mut density = vec![0.0f32; w as usize * h as usize];

        for y in 0..h {
            for x in 0..w {
                let tile = map.get(x, y);
                let mut d = base_density(tile);
                if d > 0.0 {
                    let mut water_neighbors = 0;
                    for dy in -1..=1 {
                        for dx in -1..=1 {
                            if dx == 0 && dy == 0 {
                                continue;
                            }
                            if map.get(x + dx, y + dy) == TileType::Water {
                                water_neighbors += 1;
                            }
                        }
                    }
                    d *= if water_neighbors >= 3 {
                        0.35
                    } else if water_neighbors >= 1 {
                        0.7
                    } else {
                        1.0
                    };
                }
                density[(y * w + x) as usize] = d;
            }
        }

        for &(hx, hy) in hubs {
            for y in 0..h {
                for x in 0..w {
                    let dist = (f32::from((x - hx) as i16).powi(2) + f32::from((y - hy) as i16).powi(2)).sqrt();
                    let i = (y * w + x) as usize;
                    if dist <= hub_radius {
                        density[i] = 0.0;
                    } else if dist <= hub_radius * 1.2 {
                        let falloff = (dist - hub_radius) / (hub_radius * 0.2).max(1e-6);
                        density[i] *= falloff.clamp(0.0, 1.0);
                    }
                }
            }
        }

        Self { width: w, height: h, density }
    }

    /// Reads the density at `(x, y)`, or `0.0` if out of bounds.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return 0.0;
        }
        self.density[(y * self.width + x) as usize]
    }
}

/// The result of sampling a spawn table at a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRoll {
    /// The chosen spawnable id.
    pub id: u32,
    /// Whether the rare pool was rolled.
    pub is_rare: bool,
}

/// Samples a spawn at `(x, y)`: below the density floor, returns `None`;
/// otherwise rolls the rare pool with probability `rare_chance_bp / 10000`,
/// falling back to the common pool.
#[must_use]
pub fn sample(
    density: &DensityMap,
    table: &SpawnTable,
    x: i32,
    y: i32,
    rare_chance_bp: u32,
    micro: &mut RngChannel,
) -> Option<SpawnRoll> {
    if density.get(x, y) < 0.01 {
        return None;
    }
    let roll_bp = micro.next_range(0, 9999) as u32;
    if roll_bp < rare_chance_bp {
        table.pick_rare(micro).map(|id| SpawnRoll { id, is_rare: true })
    } else {
        table.pick_common(micro).map(|id| SpawnRoll { id, is_rare: false })
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_is_zero_within_hub_radius() {
        let mut map = TileMap::init(20, 20).expect("valid dims");
        for y in 0..20 {
            for x in 0..20 {
                map.set(x, y, TileType::Grass);
            }
        }
        let density = DensityMap::build(&map, &[(10, 10)], 3.0);
        assert_eq!(density.get(10, 10), 0.0);
        assert_eq!(density.get(11, 10), 0.0);
    }

    #[test]
    fn sample_returns_none_below_density_floor() {
        let map = TileMap::init(4, 4).expect("valid dims");
        let density = DensityMap::build(&map, &[], 0.0);
        let table = SpawnTable::new(vec![SpawnTableEntry { id: 1, common_weight: 1, rare_weight: 1 }]);
        let mut rng = RngChannel::seeded(1);
        assert_eq!(sample(&density, &table, 0, 0, 500, &mut rng), None);
    }

    #[test]
    fn sample_picks_a_registered_id_when_density_is_sufficient() {
        let mut map = TileMap::init(4, 4).expect("valid dims");
        for y in 0..4 {
            for x in 0..4 {
                map.set(x, y, TileType::Forest);
            }
        }
        let density = DensityMap::build(&map, &[], 0.0);
        let table = SpawnTable::new(vec![SpawnTableEntry { id: 7, common_weight: 1, rare_weight: 1 }]);
        let mut rng = RngChannel::seeded(4242);
        let roll = sample(&density, &table, 1, 1, 0, &mut rng).expect("density nonzero");
        assert_eq!(roll.id, 7);
        assert!(!roll.is_rare);
    }
}
