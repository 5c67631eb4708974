// SPDX-License-Identifier: Apache-2.0
//! Phase 4: local terrain perturbation, caves, lava pockets, and ore veins.

use super::{Fields, WorldGenConfig};
use crate::noise::fbm;
use crate::rng::RngChannel;
use crate::tilemap::{TileMap, TileType};

/// Runs phase 4 against `map` using the micro channel only.
pub(super) fn run(config: &WorldGenConfig, map: &mut TileMap, fields: &Fields, micro: &mut RngChannel) {
    let _ = fields;
    perturb(config, map);
    carve_caves(config, map, micro);
    place_lava_pockets(config, map, micro);
    carve_ore_veins(config, map, micro);
}

fn perturb(config: &WorldGenConfig, map: &mut TileMap) {
    for y in 0..config.height {
        for x in 0..config.width {
            let n = fbm(
                f32::from(x as i16) / 12.0,
                f32::from(y as i16) / 12.0,
                3,
                2.0,
                0.5,
            );
            match map.get(x, y) {
                TileType::Grass if n > 0.6 => map.set(x, y, TileType::Forest),
                TileType::Forest if n < 0.3 => map.set(x, y, TileType::Grass),
                TileType::Mountain if n > 0.65 => map.set(x, y, TileType::Grass),
                _ => {}
            }
        }
    }
}

fn count_wall_neighbors(walls: &[bool], w: i32, h: i32, x: i32, y: i32) -> u32 {
    let mut n = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= w || ny >= h || walls[(ny * w + nx) as usize] {
                n += 1;
            }
        }
    }
    n
}

fn carve_caves(config: &WorldGenConfig, map: &mut TileMap, micro: &mut RngChannel) {
    let w = config.width;
    let h = config.height;
    let fill_chance = (config.cave_fill_chance + 0.10).min(0.90);

    let mountain_mask: Vec<bool> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| map.get(x, y) == TileType::Mountain)
        .collect();

    if !mountain_mask.iter().any(|&m| m) {
        return;
    }

    let mut walls: Vec<bool> = mountain_mask
        .iter()
        .map(|&under_mountain| under_mountain && micro.chance(fill_chance))
        .collect();

    for _ in 0..config.cave_iterations {
        let mut next = walls.clone();
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) as usize;
                if !mountain_mask[i] {
                    continue;
                }
                let wall_neighbors = count_wall_neighbors(&walls, w, h, x, y);
                next[i] = if walls[i] {
                    wall_neighbors >= 5
                } else {
                    wall_neighbors >= 6
                };
            }
        }
        walls = next;
    }

    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            if !mountain_mask[i] {
                continue;
            }
            map.set(x, y, if walls[i] { TileType::CaveWall } else { TileType::CaveFloor });
        }
    }

    shrink_open_caves(config, map, micro);
}

fn shrink_open_caves(config: &WorldGenConfig, map: &mut TileMap, micro: &mut RngChannel) {
    let w = config.width;
    let h = config.height;
    loop {
        let mut floors = Vec::new();
        let mut walls = 0usize;
        for y in 0..h {
            for x in 0..w {
                match map.get(x, y) {
                    TileType::CaveFloor => floors.push((x, y)),
                    TileType::CaveWall => walls += 1,
                    _ => {}
                }
            }
        }
        let total = floors.len() + walls;
        if total == 0 {
            return;
        }
        let ratio = floors.len() as f32 / total as f32;
        if ratio <= 0.74 || floors.is_empty() {
            return;
        }
        let pick = micro.next_range(0, floors.len() as i32 - 1);
        let (x, y) = floors[pick as usize];
        map.set(x, y, TileType::CaveWall);
    }
}

fn place_lava_pockets(config: &WorldGenConfig, map: &mut TileMap, micro: &mut RngChannel) {
    let w = config.width;
    let h = config.height;
    for _ in 0..config.target_pockets {
        let floors: Vec<(i32, i32)> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter(|&(x, y)| map.get(x, y) == TileType::CaveFloor)
            .collect();
        if floors.is_empty() {
            return;
        }
        let pick = micro.next_range(0, floors.len() as i32 - 1);
        let (cx, cy) = floors[pick as usize];
        let radius = micro.next_range(1, 3);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let (x, y) = (cx + dx, cy + dy);
                if map.in_bounds(x, y) && map.get(x, y) == TileType::CaveFloor {
                    map.set(x, y, TileType::Lava);
                }
            }
        }
    }
}

fn carve_ore_veins(config: &WorldGenConfig, map: &mut TileMap, micro: &mut RngChannel) {
    let w = config.width;
    let h = config.height;
    let starts: Vec<(i32, i32)> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .filter(|&(x, y)| map.get(x, y) == TileType::CaveWall)
        .collect();
    if starts.is_empty() {
        return;
    }

    let pick = micro.next_range(0, starts.len() as i32 - 1);
    let (mut x, mut y) = starts[pick as usize];
    let dirs = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    let mut dir_idx = micro.next_range(0, 3) as usize;

    for _ in 0..config.vein_len {
        if map.in_bounds(x, y) && map.get(x, y) == TileType::CaveWall {
            map.set(x, y, TileType::OreVein);
        }
        if micro.chance(0.3) {
            dir_idx = micro.next_range(0, 3) as usize;
        }
        x += dirs[dir_idx].0;
        y += dirs[dir_idx].1;
        if !map.in_bounds(x, y) {
            break;
        }
    }
}
