// SPDX-License-Identifier: Apache-2.0
//! Phase 6: surface structure placement via rejection sampling.

use super::{cell_index, Fields, WorldGenConfig};
use crate::rng::RngChannel;
use crate::tilemap::{TileMap, TileType};

/// A registered structure blueprint.
#[derive(Debug, Clone)]
pub struct StructureDef {
    /// Stable identifier.
    pub id: u32,
    /// Footprint width.
    pub width: i32,
    /// Footprint height.
    pub height: i32,
    /// Bitmask of biome tile bytes this structure is allowed to sit on.
    pub biome_mask: u32,
    /// Relative weight used during weighted random selection.
    pub rarity_weight: u32,
    /// Minimum normalized elevation allowed at the footprint center.
    pub min_elev: f32,
    /// Maximum normalized elevation allowed at the footprint center.
    pub max_elev: f32,
    /// Whether a 90-degree rotation may be applied before placement.
    pub allow_rotation: bool,
}

/// A successfully placed structure instance.
#[derive(Debug, Clone)]
pub struct Placement {
    /// The blueprint this instance was placed from.
    pub def_id: u32,
    /// Top-left corner x.
    pub x: i32,
    /// Top-left corner y.
    pub y: i32,
    /// Footprint width after any rotation.
    pub width: i32,
    /// Footprint height after any rotation.
    pub height: i32,
    /// Whether a dungeon entrance marker was placed for this structure.
    pub has_entrance: bool,
}

fn bit_for_tile(tile: TileType) -> u32 {
    1u32 << (tile as u8)
}

fn default_registry() -> Vec<StructureDef> {
    vec![
        StructureDef {
            id: 1,
            width: 5,
            height: 5,
            biome_mask: bit_for_tile(TileType::Grass) | bit_for_tile(TileType::Forest),
            rarity_weight: 10,
            min_elev: 0.0,
            max_elev: 0.6,
            allow_rotation: true,
        },
        StructureDef {
            id: 2,
            width: 7,
            height: 4,
            biome_mask: bit_for_tile(TileType::Grass),
            rarity_weight: 4,
            min_elev: 0.0,
            max_elev: 0.5,
            allow_rotation: true,
        },
        StructureDef {
            id: 3,
            width: 4,
            height: 4,
            biome_mask: bit_for_tile(TileType::Snow) | bit_for_tile(TileType::Swamp),
            rarity_weight: 2,
            min_elev: 0.0,
            max_elev: 0.6,
            allow_rotation: false,
        },
    ]
}

fn weighted_pick(registry: &[StructureDef], micro: &mut RngChannel) -> usize {
    let total: u32 = registry.iter().map(|d| d.rarity_weight).sum();
    if total == 0 {
        return 0;
    }
    let mut roll = micro.next_range(0, total as i32 - 1);
    for (i, d) in registry.iter().enumerate() {
        if roll < d.rarity_weight as i32 {
            return i;
        }
        roll -= d.rarity_weight as i32;
    }
    registry.len() - 1
}

fn footprint_clear(map: &TileMap, x: i32, y: i32, w: i32, h: i32) -> bool {
    for dy in 0..h {
        for dx in 0..w {
            match map.get(x + dx, y + dy) {
                TileType::Water | TileType::Mountain | TileType::River | TileType::RiverWide => {
                    return false;
                }
                _ => {}
            }
        }
    }
    true
}

fn spacing_ok(placed: &[Placement], avg_size: i32, min_spacing: i32, x: i32, y: i32, w: i32, h: i32) -> bool {
    let required = avg_size + min_spacing;
    let (cx, cy) = (x + w / 2, y + h / 2);
    for p in placed {
        let (pcx, pcy) = (p.x + p.width / 2, p.y + p.height / 2);
        if (cx - pcx).abs() < required && (cy - pcy).abs() < required {
            return false;
        }
    }
    true
}

/// Places up to `config.target_structures` structures via rejection
/// sampling, carving walls/floors and optionally a dungeon entrance marker.
pub(super) fn place_all(
    config: &WorldGenConfig,
    map: &mut TileMap,
    fields: &Fields,
    micro: &mut RngChannel,
) -> Vec<Placement> {
    let registry = default_registry();
    let avg_size = registry.iter().map(|d| (d.width + d.height) / 2).sum::<i32>()
        / registry.len().max(1) as i32;
    let mut placed = Vec::new();

    let max_attempts = config.target_structures * 20;
    for _ in 0..max_attempts {
        if placed.len() as u32 >= config.target_structures {
            break;
        }
        let def = &registry[weighted_pick(&registry, micro)];
        let (w, h) = if def.allow_rotation && micro.chance(0.5) {
            (def.height, def.width)
        } else {
            (def.width, def.height)
        };
        if w >= config.width || h >= config.height {
            continue;
        }
        let x = micro.next_range(1, config.width - w - 1);
        let y = micro.next_range(1, config.height - h - 1);

        let center = map.get(x + w / 2, y + h / 2);
        if def.biome_mask & bit_for_tile(center) == 0 {
            continue;
        }
        let elev = fields.elevation[cell_index(config, x + w / 2, y + h / 2)];
        if elev < def.min_elev || elev > def.max_elev {
            continue;
        }
        if !footprint_clear(map, x, y, w, h) {
            continue;
        }
        if !spacing_ok(&placed, avg_size, config.min_spacing, x, y, w, h) {
            continue;
        }

        for dy in 0..h {
            for dx in 0..w {
                let on_border = dx == 0 || dy == 0 || dx == w - 1 || dy == h - 1;
                map.set(
                    x + dx,
                    y + dy,
                    if on_border { TileType::StructureWall } else { TileType::StructureFloor },
                );
            }
        }

        let has_entrance = micro.chance(0.75);
        if has_entrance {
            let ex = x + w / 2;
            let ey = y + h;
            if map.in_bounds(ex, ey) {
                map.set(ex, ey, TileType::DungeonEntrance);
            }
        }

        placed.push(Placement {
            def_id: def.id,
            x,
            y,
            width: w,
            height: h,
            has_entrance,
        });
    }

    placed
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::WorldRngContext;

    #[test]
    fn placements_never_overlap_water_or_mountain() {
        let config = WorldGenConfig {
            width: 64,
            height: 64,
            seed: 3,
            target_structures: 6,
            ..WorldGenConfig::default()
        };
        let mut map = TileMap::init(config.width, config.height).expect("valid dims");
        for y in 0..config.height {
            for x in 0..config.width {
                map.set(x, y, TileType::Grass);
            }
        }
        let fields = Fields {
            elevation: vec![0.1; (config.width * config.height) as usize],
            continent: vec![0.1; (config.width * config.height) as usize],
            temperature: vec![0.5; (config.width * config.height) as usize],
            moisture: vec![0.2; (config.width * config.height) as usize],
        };
        let mut ctx = WorldRngContext::from_seed(config.seed, config.biome_seed_offset);
        let placed = place_all(&config, &mut map, &fields, &mut ctx.micro_ch);
        assert!(!placed.is_empty());
        for p in &placed {
            for dy in 0..p.height {
                for dx in 0..p.width {
                    let t = map.get(p.x + dx, p.y + dy);
                    assert!(matches!(
                        t,
                        TileType::StructureWall | TileType::StructureFloor | TileType::DungeonEntrance
                    ));
                }
            }
        }
    }

    #[test]
    fn structure_placement_is_deterministic() {
        let config = WorldGenConfig {
            width: 48,
            height: 48,
            seed: 41,
            target_structures: 4,
            ..WorldGenConfig::default()
        };
        let fields = Fields {
            elevation: vec![0.1; (config.width * config.height) as usize],
            continent: vec![0.1; (config.width * config.height) as usize],
            temperature: vec![0.5; (config.width * config.height) as usize],
            moisture: vec![0.2; (config.width * config.height) as usize],
        };
        let make_map = || {
            let mut m = TileMap::init(config.width, config.height).expect("valid dims");
            for y in 0..config.height {
                for x in 0..config.width {
                    m.set(x, y, TileType::Grass);
                }
            }
            m
        };
        let mut map_a = make_map();
        let mut map_b = make_map();
        let mut ctx_a = WorldRngContext::from_seed(config.seed, config.biome_seed_offset);
        let mut ctx_b = WorldRngContext::from_seed(config.seed, config.biome_seed_offset);
        let a = place_all(&config, &mut map_a, &fields, &mut ctx_a.micro_ch);
        let b = place_all(&config, &mut map_b, &fields, &mut ctx_b.micro_ch);
        assert_eq!(a.len(), b.len());
        assert_eq!(map_a.hash(), map_b.hash());
    }
}
