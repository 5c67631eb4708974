// SPDX-License-Identifier: Apache-2.0
//! The 2D tile grid and its closed tile-type enumeration.

use crate::error::WorldGenError;
use crate::hash::tile_hash;

/// Closed enumeration of every tile kind the world pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TileType {
    /// Out-of-bounds sentinel and default fill value.
    Empty = 0,
    /// Open water.
    Water = 1,
    /// Plains.
    Grass = 2,
    /// Forest canopy.
    Forest = 3,
    /// Mountain terrain.
    Mountain = 4,
    /// Wetland.
    Swamp = 5,
    /// Snowfield.
    Snow = 6,
    /// River channel.
    River = 7,
    /// Widened river.
    RiverWide = 8,
    /// River delta (wide river bordering open water on most sides).
    RiverDelta = 9,
    /// Cave wall.
    CaveWall = 10,
    /// Cave floor.
    CaveFloor = 11,
    /// Lava pocket.
    Lava = 12,
    /// Mineable ore vein.
    OreVein = 13,
    /// Structure perimeter wall.
    StructureWall = 14,
    /// Structure interior floor.
    StructureFloor = 15,
    /// Dungeon room/corridor floor.
    DungeonFloor = 16,
    /// Dungeon wall.
    DungeonWall = 17,
    /// Door requiring a key.
    DungeonLockedDoor = 18,
    /// Key unlocking a `DungeonLockedDoor`.
    DungeonKey = 19,
    /// Trap tile.
    DungeonTrap = 20,
    /// Hidden door revealed by a secret-room roll.
    DungeonSecretDoor = 21,
    /// Dungeon entrance marker placed near a surface structure.
    DungeonEntrance = 22,
}

impl TileType {
    /// Converts a raw byte back into a `TileType`, falling back to `Empty`
    /// for any value outside the closed enumeration. Every cell in a
    /// [`TileMap`] is guaranteed to hold a byte produced by `as u8` on a
    /// valid variant, so this is the only place an out-of-range byte would
    /// ever need to be handled.
    #[must_use]
    pub const fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::Water,
            2 => Self::Grass,
            3 => Self::Forest,
            4 => Self::Mountain,
            5 => Self::Swamp,
            6 => Self::Snow,
            7 => Self::River,
            8 => Self::RiverWide,
            9 => Self::RiverDelta,
            10 => Self::CaveWall,
            11 => Self::CaveFloor,
            12 => Self::Lava,
            13 => Self::OreVein,
            14 => Self::StructureWall,
            15 => Self::StructureFloor,
            16 => Self::DungeonFloor,
            17 => Self::DungeonWall,
            18 => Self::DungeonLockedDoor,
            19 => Self::DungeonKey,
            20 => Self::DungeonTrap,
            21 => Self::DungeonSecretDoor,
            22 => Self::DungeonEntrance,
            _ => Self::Empty,
        }
    }

    /// Stable upper-case name used by descriptor-pack keys such as
    /// `tile_weight_GRASS`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Water => "WATER",
            Self::Grass => "GRASS",
            Self::Forest => "FOREST",
            Self::Mountain => "MOUNTAIN",
            Self::Swamp => "SWAMP",
            Self::Snow => "SNOW",
            Self::River => "RIVER",
            Self::RiverWide => "RIVER_WIDE",
            Self::RiverDelta => "RIVER_DELTA",
            Self::CaveWall => "CAVE_WALL",
            Self::CaveFloor => "CAVE_FLOOR",
            Self::Lava => "LAVA",
            Self::OreVein => "ORE_VEIN",
            Self::StructureWall => "STRUCTURE_WALL",
            Self::StructureFloor => "STRUCTURE_FLOOR",
            Self::DungeonFloor => "DUNGEON_FLOOR",
            Self::DungeonWall => "DUNGEON_WALL",
            Self::DungeonLockedDoor => "DUNGEON_LOCKED_DOOR",
            Self::DungeonKey => "DUNGEON_KEY",
            Self::DungeonTrap => "DUNGEON_TRAP",
            Self::DungeonSecretDoor => "DUNGEON_SECRET_DOOR",
            Self::DungeonEntrance => "DUNGEON_ENTRANCE",
        }
    }

    /// Looks up a `TileType` by its [`name`](Self::name), case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Self::ALL.iter().copied().find(|t| t.name() == upper)
    }

    /// Every tile kind, in declaration order.
    pub const ALL: [Self; 23] = [
        Self::Empty,
        Self::Water,
        Self::Grass,
        Self::Forest,
        Self::Mountain,
        Self::Swamp,
        Self::Snow,
        Self::River,
        Self::RiverWide,
        Self::RiverDelta,
        Self::CaveWall,
        Self::CaveFloor,
        Self::Lava,
        Self::OreVein,
        Self::StructureWall,
        Self::StructureFloor,
        Self::DungeonFloor,
        Self::DungeonWall,
        Self::DungeonLockedDoor,
        Self::DungeonKey,
        Self::DungeonTrap,
        Self::DungeonSecretDoor,
        Self::DungeonEntrance,
    ];
}

/// A row-major 2D grid of tile-type bytes with bounds-checked access.
///
/// Every cell always holds a valid [`TileType`] byte. Out-of-bounds reads
/// return the `Empty` sentinel without touching state; out-of-bounds writes
/// are a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMap {
    width: i32,
    height: i32,
    tiles: Vec<u8>,
}

impl TileMap {
    /// Allocates a `width * height` grid, zero-initialized (`Empty`).
    ///
    /// # Errors
    /// Returns [`WorldGenError::InvalidDimensions`] if either dimension is
    /// not positive.
    pub fn init(width: i32, height: i32) -> Result<Self, WorldGenError> {
        if width <= 0 || height <= 0 {
            return Err(WorldGenError::InvalidDimensions {
                width: i64::from(width),
                height: i64::from(height),
            });
        }
        let cells = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            tiles: vec![0u8; cells],
        })
    }

    /// Grid width.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Raw tile bytes in row-major order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.tiles
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            None
        } else {
            Some(y as usize * self.width as usize + x as usize)
        }
    }

    /// Returns the tile at `(x, y)`, or [`TileType::Empty`] if out of
    /// bounds.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> TileType {
        self.index(x, y)
            .map_or(TileType::Empty, |i| TileType::from_byte(self.tiles[i]))
    }

    /// Sets the tile at `(x, y)`. No-op if out of bounds.
    pub fn set(&mut self, x: i32, y: i32, v: TileType) {
        if let Some(i) = self.index(x, y) {
            self.tiles[i] = v as u8;
        }
    }

    /// Returns `true` if `(x, y)` lies within the grid.
    #[must_use]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some()
    }

    /// Computes the deterministic tile-map hash (FNV-1a over tiles, folded
    /// with dimensions and avalanched).
    #[must_use]
    pub fn hash(&self) -> u64 {
        tile_hash(&self.tiles, self.width, self.height)
    }

    /// Iterates every `(x, y)` in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let w = self.width;
        let h = self.height;
        (0..h).flat_map(move |y| (0..w).map(move |x| (x, y)))
    }

    /// Counts cells equal to `ty`.
    #[must_use]
    pub fn count(&self, ty: TileType) -> usize {
        self.tiles.iter().filter(|&&b| b == ty as u8).count()
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tile_name_round_trips_through_from_name() {
        for ty in TileType::ALL {
            assert_eq!(TileType::from_name(ty.name()), Some(ty));
        }
    }

    #[test]
    fn from_name_is_case_insensitive_and_rejects_unknown_names() {
        assert_eq!(TileType::from_name("grass"), Some(TileType::Grass));
        assert_eq!(TileType::from_name("not_a_tile"), None);
    }

    #[test]
    fn zero_sized_map_fails() {
        assert!(TileMap::init(0, 10).is_err());
        assert!(TileMap::init(10, 0).is_err());
        assert!(TileMap::init(-1, 10).is_err());
    }

    #[test]
    fn out_of_bounds_get_returns_empty_and_set_is_noop() {
        let mut m = TileMap::init(4, 4).expect("valid dims");
        assert_eq!(m.get(-1, 0), TileType::Empty);
        assert_eq!(m.get(4, 0), TileType::Empty);
        m.set(-1, 0, TileType::Lava);
        m.set(4, 4, TileType::Lava);
        assert_eq!(m.hash(), TileMap::init(4, 4).expect("valid dims").hash());
    }

    #[test]
    fn get_set_round_trips_in_bounds() {
        let mut m = TileMap::init(4, 4).expect("valid dims");
        m.set(2, 3, TileType::Forest);
        assert_eq!(m.get(2, 3), TileType::Forest);
    }

    #[test]
    fn all_zero_map_hash_is_nonzero() {
        let m = TileMap::init(8, 8).expect("valid dims");
        assert_ne!(m.hash(), 0);
    }

    #[test]
    fn regenerating_identical_map_yields_identical_hash() {
        let mut a = TileMap::init(16, 16).expect("valid dims");
        let mut b = TileMap::init(16, 16).expect("valid dims");
        let coords: Vec<(i32, i32)> = a.coords().collect();
        for (x, y) in coords {
            let t = TileType::from_byte(((x * 7 + y * 13) % 5) as u8 + 1);
            a.set(x, y, t);
            b.set(x, y, t);
        }
        assert_eq!(a.hash(), b.hash());
    }
}
