// SPDX-License-Identifier: Apache-2.0
//! Phase 7: dungeon room generation, connectivity, tagging, and secrets.

use super::WorldGenConfig;
use crate::rng::RngChannel;
use crate::tilemap::{TileMap, TileType};

/// Bit flags tagging a room's special role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomTag {
    /// Holds the dungeon's best loot.
    pub treasure: bool,
    /// Guarded by a tougher spawn table.
    pub elite: bool,
    /// Requires solving a key/lock chain to reach.
    pub puzzle: bool,
}

/// An axis-aligned dungeon room.
#[derive(Debug, Clone)]
pub struct Room {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in tiles.
    pub w: i32,
    /// Height in tiles.
    pub h: i32,
    /// Tagging computed after the connectivity tree is built.
    pub tags: RoomTag,
}

impl Room {
    fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    fn area(&self) -> i32 {
        self.w * self.h
    }

    fn overlaps(&self, other: &Room) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// The generated dungeon: its rooms, connectivity edges, keys/locks, and
/// traps, all already carved into the owning tile map.
#[derive(Debug, Clone)]
pub struct Dungeon {
    /// Rooms in placement order; room 0 is the connectivity root.
    pub rooms: Vec<Room>,
    /// Connectivity-tree and loop edges as `(room_a, room_b)` index pairs.
    pub edges: Vec<(usize, usize)>,
    /// `(locked door room index, key room index)` pairs.
    pub locks: Vec<(usize, usize)>,
}

fn squared_dist(a: (i32, i32), b: (i32, i32)) -> i64 {
    let dx = i64::from(a.0 - b.0);
    let dy = i64::from(a.1 - b.1);
    dx * dx + dy * dy
}

fn place_rooms(config: &WorldGenConfig, micro: &mut RngChannel) -> Vec<Room> {
    let mut rooms = Vec::new();
    let max_attempts = config.target_rooms * 30;
    for _ in 0..max_attempts {
        if rooms.len() as u32 >= config.target_rooms {
            break;
        }
        let w = micro.next_range(4, 10);
        let h = micro.next_range(4, 9);
        if w + 2 >= config.width || h + 2 >= config.height {
            continue;
        }
        let x = micro.next_range(1, config.width - w - 1);
        let y = micro.next_range(1, config.height - h - 1);
        let candidate = Room { x, y, w, h, tags: RoomTag::default() };
        if rooms.iter().any(|r: &Room| r.overlaps(&candidate)) {
            continue;
        }
        rooms.push(candidate);
    }
    rooms
}

fn build_connectivity_tree(rooms: &[Room], micro: &mut RngChannel) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    if rooms.is_empty() {
        return edges;
    }
    let mut connected = vec![0usize];
    let mut remaining: Vec<usize> = (1..rooms.len()).collect();

    while !remaining.is_empty() {
        let mut best: Option<(usize, usize, i64)> = None;
        for &c in &connected {
            for &r in &remaining {
                let d = squared_dist(rooms[c].center(), rooms[r].center());
                if best.is_none_or(|(_, _, bd)| d < bd) {
                    best = Some((c, r, d));
                }
            }
        }
        if let Some((c, r, _)) = best {
            edges.push((c, r));
            connected.push(r);
            remaining.retain(|&x| x != r);
        } else {
            break;
        }
    }

    let _ = micro;
    edges
}

fn add_loop_edges(
    rooms: &[Room],
    edges: &mut Vec<(usize, usize)>,
    loop_percent: f32,
    micro: &mut RngChannel,
) {
    if rooms.len() < 3 {
        return;
    }
    let target_loops = ((edges.len() as f32) * loop_percent).round() as usize;
    let mut loops_added = 0usize;
    let mut attempts = 0;
    while loops_added < target_loops && attempts < rooms.len() * 10 {
        attempts += 1;
        let a = micro.next_range(0, rooms.len() as i32 - 1) as usize;
        let b = micro.next_range(0, rooms.len() as i32 - 1) as usize;
        if a == b {
            continue;
        }
        let pair = (a.min(b), a.max(b));
        if edges.contains(&pair) {
            continue;
        }
        edges.push(pair);
        loops_added += 1;
    }
}

fn tag_rooms(rooms: &mut [Room], edges: &[(usize, usize)]) {
    if rooms.is_empty() {
        return;
    }
    let largest = rooms
        .iter()
        .enumerate()
        .max_by_key(|(_, r)| r.area())
        .map(|(i, _)| i);
    if let Some(i) = largest {
        rooms[i].tags.treasure = true;
    }

    let root_center = rooms[0].center();
    let mut by_dist: Vec<(usize, i64)> = rooms
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, r)| (i, squared_dist(root_center, r.center())))
        .collect();
    by_dist.sort_by(|a, b| b.1.cmp(&a.1));
    for &(i, _) in by_dist.iter().take(2) {
        rooms[i].tags.elite = true;
    }

    let avg_area: f32 = rooms.iter().map(|r| r.area() as f32).sum::<f32>() / rooms.len() as f32;
    let mut degree = vec![0u32; rooms.len()];
    for &(a, b) in edges {
        degree[a] += 1;
        degree[b] += 1;
    }
    for (i, room) in rooms.iter_mut().enumerate().skip(1) {
        if room.tags.treasure || room.tags.elite {
            continue;
        }
        if (room.area() as f32) < avg_area && degree[i] == 1 {
            room.tags.puzzle = true;
        }
    }
}

fn carve_rooms(map: &mut TileMap, rooms: &[Room]) {
    for room in rooms {
        for dy in 0..room.h {
            for dx in 0..room.w {
                let on_border = dx == 0 || dy == 0 || dx == room.w - 1 || dy == room.h - 1;
                map.set(
                    room.x + dx,
                    room.y + dy,
                    if on_border { TileType::DungeonWall } else { TileType::DungeonFloor },
                );
            }
        }
    }
}

fn carve_corridor(map: &mut TileMap, a: (i32, i32), b: (i32, i32)) {
    let (ax, ay) = a;
    let (bx, by) = b;
    let step_x = if bx >= ax { 1 } else { -1 };
    let mut x = ax;
    while x != bx {
        if map.get(x, ay) != TileType::DungeonWall {
            map.set(x, ay, TileType::DungeonFloor);
        }
        x += step_x;
    }
    let step_y = if by >= ay { 1 } else { -1 };
    let mut y = ay;
    while y != by {
        if map.get(bx, y) != TileType::DungeonWall {
            map.set(bx, y, TileType::DungeonFloor);
        }
        y += step_y;
    }
}

fn carve_corridors(map: &mut TileMap, rooms: &[Room], edges: &[(usize, usize)]) {
    for &(a, b) in edges {
        carve_corridor(map, rooms[a].center(), rooms[b].center());
    }
}

fn place_keys_and_locks(rooms: &[Room], micro: &mut RngChannel) -> Vec<(usize, usize)> {
    let mut locks = Vec::new();
    let max_locked = rooms.len() as u32 / 4;
    for room_idx in 1..rooms.len() {
        if locks.len() as u32 >= max_locked {
            break;
        }
        if !micro.chance(0.25) {
            continue;
        }
        let key_room = micro.next_range(0, room_idx as i32 - 1) as usize;
        locks.push((room_idx, key_room));
    }
    locks
}

fn place_traps_and_secrets(config: &WorldGenConfig, map: &mut TileMap, rooms: &[Room], micro: &mut RngChannel) {
    for room in rooms {
        if micro.chance(0.10) {
            let wall_x = room.x;
            let wall_y = room.y + room.h / 2;
            if map.get(wall_x, wall_y) == TileType::DungeonWall {
                map.set(wall_x, wall_y, TileType::DungeonSecretDoor);
            }
        }
    }
    let mut placed = 0u32;
    for room in rooms {
        if placed >= config.target_traps {
            break;
        }
        if room.w <= 2 || room.h <= 2 {
            continue;
        }
        let tx = micro.next_range(room.x + 1, room.x + room.w - 2);
        let ty = micro.next_range(room.y + 1, room.y + room.h - 2);
        if map.get(tx, ty) == TileType::DungeonFloor {
            map.set(tx, ty, TileType::DungeonTrap);
            placed += 1;
        }
    }
}

fn apply_locks(map: &mut TileMap, rooms: &[Room], locks: &[(usize, usize)]) {
    for &(room_idx, key_room) in locks {
        let room = &rooms[room_idx];
        let lock_x = room.x + room.w / 2;
        let lock_y = room.y;
        if map.in_bounds(lock_x, lock_y) {
            map.set(lock_x, lock_y, TileType::DungeonLockedDoor);
        }
        let (kx, ky) = rooms[key_room].center();
        map.set(kx, ky, TileType::DungeonKey);
    }
}

/// Runs phase 7, returning `None` if no rooms could be placed.
pub(super) fn generate(
    config: &WorldGenConfig,
    map: &mut TileMap,
    micro: &mut RngChannel,
) -> Option<Dungeon> {
    let mut rooms = place_rooms(config, micro);
    if rooms.is_empty() {
        return None;
    }

    let mut edges = build_connectivity_tree(&rooms, micro);
    add_loop_edges(&rooms, &mut edges, config.loop_percent, micro);
    tag_rooms(&mut rooms, &edges);

    carve_rooms(map, &rooms);
    carve_corridors(map, &rooms, &edges);

    let locks = place_keys_and_locks(&rooms, micro);
    apply_locks(map, &rooms, &locks);
    place_traps_and_secrets(config, map, &rooms, micro);

    Some(Dungeon { rooms, edges, locks })
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngChannel;

    fn sample_config() -> WorldGenConfig {
        WorldGenConfig {
            width: 80,
            height: 80,
            target_rooms: 10,
            target_traps: 3,
            loop_percent: 0.2,
            ..WorldGenConfig::default()
        }
    }

    #[test]
    fn every_room_is_reachable_from_room_zero() {
        let config = sample_config();
        let mut map = TileMap::init(config.width, config.height).expect("valid dims");
        let mut rng = RngChannel::seeded(123);
        let dungeon = generate(&config, &mut map, &mut rng).expect("rooms placed");

        let mut adjacency = vec![Vec::new(); dungeon.rooms.len()];
        for &(a, b) in &dungeon.edges {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        let mut visited = vec![false; dungeon.rooms.len()];
        let mut stack = vec![0usize];
        visited[0] = true;
        while let Some(n) = stack.pop() {
            for &next in &adjacency[n] {
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
        assert!(visited.iter().all(|&v| v), "not all rooms reachable from room 0");
    }

    #[test]
    fn exactly_one_largest_room_is_tagged_treasure() {
        let config = sample_config();
        let mut map = TileMap::init(config.width, config.height).expect("valid dims");
        let mut rng = RngChannel::seeded(55);
        let dungeon = generate(&config, &mut map, &mut rng).expect("rooms placed");
        let treasure_count = dungeon.rooms.iter().filter(|r| r.tags.treasure).count();
        assert_eq!(treasure_count, 1);
    }

    #[test]
    fn at_most_two_rooms_are_tagged_elite() {
        let config = sample_config();
        let mut map = TileMap::init(config.width, config.height).expect("valid dims");
        let mut rng = RngChannel::seeded(9);
        let dungeon = generate(&config, &mut map, &mut rng).expect("rooms placed");
        let elite_count = dungeon.rooms.iter().filter(|r| r.tags.elite).count();
        assert!(elite_count <= 2);
    }

    #[test]
    fn dungeon_generation_is_deterministic() {
        let config = sample_config();
        let mut map_a = TileMap::init(config.width, config.height).expect("valid dims");
        let mut map_b = TileMap::init(config.width, config.height).expect("valid dims");
        let mut rng_a = RngChannel::seeded(777);
        let mut rng_b = RngChannel::seeded(777);
        let a = generate(&config, &mut map_a, &mut rng_a).expect("rooms placed");
        let b = generate(&config, &mut map_b, &mut rng_b).expect("rooms placed");
        assert_eq!(a.rooms.len(), b.rooms.len());
        assert_eq!(map_a.hash(), map_b.hash());
    }
}
