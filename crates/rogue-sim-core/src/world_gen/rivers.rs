// SPDX-License-Identifier: Apache-2.0
//! Phase 5: river widening, deltas, erosion, and bridge-hint scanning.

use super::{Fields, WorldGenConfig};
use crate::noise::fbm;
use crate::rng::RngChannel;
use crate::tilemap::{TileMap, TileType};

/// Runs phase 5, returning the non-mutating bridge-hint count.
pub(super) fn run(
    config: &WorldGenConfig,
    map: &mut TileMap,
    fields: &mut Fields,
    micro: &mut RngChannel,
) -> u32 {
    widen_rivers(config, map);
    mark_deltas(config, map);
    thermal_erosion(config, fields, micro);
    hydraulic_erosion(config, map, fields, micro);
    bridge_hint_count(config, map)
}

fn widen_rivers(config: &WorldGenConfig, map: &mut TileMap) {
    let mut promotions = Vec::new();
    for y in 0..config.height {
        for x in 0..config.width {
            if map.get(x, y) != TileType::River {
                continue;
            }
            let n = fbm(f32::from(x as i16) / 10.0, f32::from(y as i16) / 10.0, 3, 2.0, 0.5);
            if n <= 0.35 {
                continue;
            }
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if map.in_bounds(nx, ny) && map.get(nx, ny) == TileType::Water {
                        promotions.push((nx, ny));
                    }
                }
            }
        }
    }
    for (x, y) in promotions {
        map.set(x, y, TileType::RiverWide);
    }
}

fn mark_deltas(config: &WorldGenConfig, map: &mut TileMap) {
    let mut deltas = Vec::new();
    for y in 0..config.height {
        for x in 0..config.width {
            if map.get(x, y) != TileType::RiverWide {
                continue;
            }
            let mut water_neighbors = 0;
            for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                let (nx, ny) = (x + dx, y + dy);
                if map.get(nx, ny) == TileType::Water {
                    water_neighbors += 1;
                }
            }
            if water_neighbors >= 4 {
                deltas.push((x, y));
            }
        }
    }
    for (x, y) in deltas {
        map.set(x, y, TileType::RiverDelta);
    }
}

fn thermal_erosion(config: &WorldGenConfig, fields: &mut Fields, micro: &mut RngChannel) {
    let w = config.width;
    let h = config.height;
    for _ in 0..config.thermal_passes {
        let snapshot = fields.elevation.clone();
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) as usize;
                let mut lower = 0;
                for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    if snapshot[(ny * w + nx) as usize] < snapshot[i] {
                        lower += 1;
                    }
                }
                if lower >= 3 && micro.chance(0.35) {
                    fields.elevation[i] -= 0.02;
                }
            }
        }
    }
}

fn hydraulic_erosion(
    config: &WorldGenConfig,
    map: &mut TileMap,
    fields: &Fields,
    micro: &mut RngChannel,
) {
    let w = config.width;
    let h = config.height;
    let mut promotions = Vec::new();
    for _ in 0..config.hydraulic_passes {
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) as usize;
                for (dx, dy) in [(1, 0), (0, 1)] {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let ni = (ny * w + nx) as usize;
                    let delta = fields.elevation[i] - fields.elevation[ni];
                    if delta.abs() <= 1.0 {
                        continue;
                    }
                    if micro.chance(0.20) {
                        let (hx, hy) = if delta > 0.0 { (x, y) } else { (nx, ny) };
                        if map.get(hx, hy) == TileType::River {
                            promotions.push((hx, hy));
                        }
                    }
                }
            }
        }
    }
    for (x, y) in promotions {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if map.in_bounds(nx, ny) && map.get(nx, ny) == TileType::Water {
                    map.set(nx, ny, TileType::RiverWide);
                }
            }
        }
    }
}

/// Counts contiguous water runs per row bounded by non-water on both sides,
/// with length in `[min_gap, max_gap]`. Does not mutate the map.
#[must_use]
pub fn bridge_hint_count(config: &WorldGenConfig, map: &TileMap) -> u32 {
    let mut count = 0u32;
    for y in 0..config.height {
        let mut run_start: Option<i32> = None;
        for x in 0..=config.width {
            let is_water = x < config.width && matches!(map.get(x, y), TileType::Water);
            match (is_water, run_start) {
                (true, None) => run_start = Some(x),
                (false, Some(start)) => {
                    let len = x - start;
                    let bounded = start > 0 && x < config.width;
                    if bounded && len >= config.min_gap as i32 && len <= config.max_gap as i32 {
                        count += 1;
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
    }
    count
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_hints_count_bounded_water_runs() {
        let config = WorldGenConfig {
            width: 10,
            height: 1,
            min_gap: 2,
            max_gap: 4,
            ..WorldGenConfig::default()
        };
        let mut map = TileMap::init(config.width, config.height).expect("valid dims");
        for x in 0..10 {
            map.set(x, 0, TileType::Grass);
        }
        for x in 3..6 {
            map.set(x, 0, TileType::Water);
        }
        assert_eq!(bridge_hint_count(&config, &map), 1);
    }

    #[test]
    fn bridge_hints_ignore_runs_touching_the_map_edge() {
        let config = WorldGenConfig {
            width: 6,
            height: 1,
            min_gap: 1,
            max_gap: 6,
            ..WorldGenConfig::default()
        };
        let mut map = TileMap::init(config.width, config.height).expect("valid dims");
        for x in 0..6 {
            map.set(x, 0, TileType::Water);
        }
        assert_eq!(bridge_hint_count(&config, &map), 0);
    }
}
