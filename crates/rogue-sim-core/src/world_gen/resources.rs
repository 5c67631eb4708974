// SPDX-License-Identifier: Apache-2.0
//! Phase 9: resource node cluster placement.
//!
//! Like spawn ecology, resource placement does not mutate the tile map
//! directly; it is driven on demand per chunk rather than during the main
//! world generation pass.

use crate::rng::RngChannel;
use crate::tilemap::{TileMap, TileType};

/// A registered resource node type.
#[derive(Debug, Clone, Copy)]
pub struct ResourceNodeDef {
    /// Stable identifier.
    pub id: u32,
    /// Rarity tier, `0..=2`.
    pub rarity: u8,
    /// Minimum gathering tool tier required.
    pub tool_tier: u8,
    /// Minimum yield roll.
    pub yield_min: u32,
    /// Maximum yield roll (inclusive).
    pub yield_max: u32,
    /// Bitmask of tile types this node may spawn on.
    pub biome_mask: u32,
}

/// A single spawned resource node within a cluster.
#[derive(Debug, Clone, Copy)]
pub struct SpawnedNode {
    /// The node id from the originating [`ResourceNodeDef`].
    pub def_id: u32,
    /// Offset from the cluster seed tile.
    pub offset: (i32, i32),
    /// Rolled yield amount, after any upgrade multiplier.
    pub yield_amount: u32,
    /// Whether the upgrade roll succeeded.
    pub upgraded: bool,
}

/// A cluster of 2-4 nodes placed around a seed tile.
#[derive(Debug, Clone)]
pub struct ResourceCluster {
    /// The seed tile all nodes are placed relative to.
    pub seed_tile: (i32, i32),
    /// The nodes placed in this cluster.
    pub nodes: Vec<SpawnedNode>,
}

fn upgrade_probability(rarity: u8) -> f32 {
    match rarity {
        0 => 0.05,
        1 => 0.10,
        _ => 0.18,
    }
}

fn bit_for_tile(tile: TileType) -> u32 {
    1u32 << (tile as u8)
}

/// Places one cluster of 2-4 nodes around `seed_tile`, drawn from `def`,
/// each within `cluster_radius` of the seed with an independent yield and
/// upgrade roll.
#[must_use]
pub fn place_cluster(
    def: &ResourceNodeDef,
    seed_tile: (i32, i32),
    cluster_radius: i32,
    micro: &mut RngChannel,
) -> ResourceCluster {
    let count = micro.next_range(2, 4);
    let mut nodes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let ox = micro.next_range(-cluster_radius, cluster_radius);
        let oy = micro.next_range(-cluster_radius, cluster_radius);
        let base_yield = micro.next_range(def.yield_min as i32, def.yield_max as i32).max(0) as u32;
        let upgraded = micro.chance(upgrade_probability(def.rarity));
        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let yield_amount = if upgraded {
            (f64::from(base_yield) * 1.5) as u32
        } else {
            base_yield
        };
        nodes.push(SpawnedNode { def_id: def.id, offset: (ox, oy), yield_amount, upgraded });
    }
    ResourceCluster { seed_tile, nodes }
}

/// Returns `true` if `def` is allowed to spawn on `tile`.
#[must_use]
pub fn allows_tile(def: &ResourceNodeDef, tile: TileType) -> bool {
    def.biome_mask & bit_for_tile(tile) != 0
}

/// The baseline resource registry placed during world generation: one ore
/// vein on mountains, herb patches on plains and forest, and crystal
/// deposits in snow.
#[must_use]
pub fn baseline_resource_defs() -> Vec<ResourceNodeDef> {
    vec![
        ResourceNodeDef {
            id: 1,
            rarity: 0,
            tool_tier: 0,
            yield_min: 2,
            yield_max: 5,
            biome_mask: bit_for_tile(TileType::Mountain),
        },
        ResourceNodeDef {
            id: 2,
            rarity: 0,
            tool_tier: 0,
            yield_min: 1,
            yield_max: 3,
            biome_mask: bit_for_tile(TileType::Grass) | bit_for_tile(TileType::Forest),
        },
        ResourceNodeDef {
            id: 3,
            rarity: 2,
            tool_tier: 1,
            yield_min: 1,
            yield_max: 2,
            biome_mask: bit_for_tile(TileType::Snow),
        },
    ]
}

/// Drives cluster placement over the finished map: tries up to `attempts`
/// random tiles, keeping the first `def` whose biome mask matches, until
/// `target_clusters` clusters are placed or attempts run out.
#[must_use]
pub fn generate_clusters(
    map: &TileMap,
    defs: &[ResourceNodeDef],
    cluster_radius: i32,
    attempts: u32,
    target_clusters: u32,
    micro: &mut RngChannel,
) -> Vec<ResourceCluster> {
    let mut clusters = Vec::new();
    if defs.is_empty() || map.width() <= 0 || map.height() <= 0 {
        return clusters;
    }
    for _ in 0..attempts {
        if clusters.len() as u32 >= target_clusters {
            break;
        }
        let x = micro.next_range(0, map.width() - 1);
        let y = micro.next_range(0, map.height() - 1);
        let tile = map.get(x, y);
        let Some(def) = defs.iter().find(|d| allows_tile(d, tile)) else {
            continue;
        };
        clusters.push(place_cluster(def, (x, y), cluster_radius, micro));
    }
    clusters
}
