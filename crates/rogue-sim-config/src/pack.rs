// SPDX-License-Identifier: Apache-2.0
//! Descriptor pack loading: `pack.meta` schema migration, `*.biome.cfg`
//! parsing, and an atomically-swapped active registry.
//!
//! The loader never touches a filesystem directly; callers inject a
//! [`PackSource`], matching the capability-injection style
//! `rogue-sim-core` uses for its own external collaborators (an
//! `EconomyPort`, a `ProgressionPort`). This keeps the parsing and
//! validation logic testable against an in-memory fixture and keeps a real
//! filesystem backend ([`FsPackSource`]) as one interchangeable
//! implementation among others.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use rogue_sim_core::TileType;
use thiserror::Error;

/// Errors raised while loading or hot-reloading a descriptor pack.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackLoadError {
    /// The pack declared a schema version with no registered migration path
    /// to the current version.
    #[error("unsupported schema version {found}, no migration from a supported version")]
    SchemaUnsupported {
        /// The schema version found in `pack.meta`.
        found: u32,
    },
    /// A descriptor file failed to parse or validate.
    #[error("failed to parse descriptor file {path}: {reason}")]
    ParseError {
        /// Path (or logical name) of the offending file.
        path: String,
        /// Human-readable reason.
        reason: String,
    },
    /// Scanning the pack directory or reading a file failed.
    #[error("I/O error reading pack: {reason}")]
    Io {
        /// Human-readable reason.
        reason: String,
    },
    /// A reload was attempted against an already-active registry without
    /// `allow_hot_reload` set.
    #[error("hot reload is disabled for this registry")]
    HotReloadDisabled,
}

/// Current schema version this loader natively understands. Packs
/// declaring an older version are migrated in a chain up to this value.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Read-only view of a pack's files. Implementations decide how `pack.meta`
/// and the descriptor files are actually stored.
pub trait PackSource {
    /// Reads the raw contents of `pack.meta`.
    ///
    /// # Errors
    /// Returns [`PackLoadError::Io`] if the file cannot be read.
    fn read_meta(&self) -> Result<String, PackLoadError>;

    /// Lists every descriptor file whose name ends with `suffix` (e.g.
    /// `.biome.cfg`), paired with its contents, in a stable order.
    ///
    /// # Errors
    /// Returns [`PackLoadError::Io`] if the directory cannot be scanned.
    fn list_descriptors(&self, suffix: &str) -> Result<Vec<(String, String)>, PackLoadError>;
}

/// A [`PackSource`] backed by a real directory on disk.
pub struct FsPackSource {
    root: PathBuf,
}

impl FsPackSource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn io_err(e: std::io::Error) -> PackLoadError {
    PackLoadError::Io { reason: e.to_string() }
}

impl PackSource for FsPackSource {
    fn read_meta(&self) -> Result<String, PackLoadError> {
        std::fs::read_to_string(self.root.join("pack.meta")).map_err(io_err)
    }

    fn list_descriptors(&self, suffix: &str) -> Result<Vec<(String, String)>, PackLoadError> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if name.ends_with(suffix) {
                let contents = std::fs::read_to_string(&path).map_err(io_err)?;
                found.push((name.to_string(), contents));
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }
}

/// Parses `key=value` lines, ignoring blank lines and surrounding whitespace.
fn parse_kv_lines(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let (k, v) = line.split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// A single schema migration step: rewrites a pack's raw key/value fields
/// from `source_version` to the next version in the chain.
pub trait SchemaMigration: Send + Sync {
    /// The schema version this migration starts from.
    fn source_version(&self) -> u32;
    /// Rewrites `fields` in place, including bumping `schema_version` to
    /// the version this migration produces.
    fn migrate(&self, fields: &mut HashMap<String, String>);
}

/// A validated biome descriptor parsed from one `*.biome.cfg` file.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeDescriptor {
    /// Display name.
    pub name: String,
    /// Relative generation weight per tile type; tiles absent from the
    /// file are not placed by this biome.
    pub tile_weights: HashMap<TileType, f32>,
    /// Vegetation decoration density, `0.0..=1.0`.
    pub vegetation_density: f32,
    /// Non-vegetation decoration density, `0.0..=1.0`.
    pub decoration_density: f32,
    /// Ambient light tint as `(r, g, b)`.
    pub ambient_color: (u8, u8, u8),
    /// Opaque music track identifier.
    pub music_track: u32,
    /// Whether surface structures may be placed in this biome.
    pub allow_structures: bool,
    /// Whether weather patterns may run over this biome.
    pub allow_weather: bool,
}

fn parse_f32_field(
    fields: &HashMap<String, String>,
    path: &str,
    key: &str,
    default: f32,
) -> Result<f32, PackLoadError> {
    fields.get(key).map_or(Ok(default), |v| {
        v.parse().map_err(|_| PackLoadError::ParseError {
            path: path.to_string(),
            reason: format!("invalid float for `{key}`: `{v}`"),
        })
    })
}

fn parse_bool_flag(
    fields: &HashMap<String, String>,
    path: &str,
    key: &str,
    default: bool,
) -> Result<bool, PackLoadError> {
    match fields.get(key).map(String::as_str) {
        None => Ok(default),
        Some("0") => Ok(false),
        Some("1") => Ok(true),
        Some(other) => Err(PackLoadError::ParseError {
            path: path.to_string(),
            reason: format!("invalid 0|1 flag for `{key}`: `{other}`"),
        }),
    }
}

fn parse_ambient_color(fields: &HashMap<String, String>, path: &str) -> Result<(u8, u8, u8), PackLoadError> {
    let Some(raw) = fields.get("ambient_color") else {
        return Ok((255, 255, 255));
    };
    let err = || PackLoadError::ParseError {
        path: path.to_string(),
        reason: format!("invalid `ambient_color` (expected R,G,B): `{raw}`"),
    };
    let mut parts = raw.split(',').map(str::trim);
    let r: u8 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let g: u8 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    let b: u8 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
    if parts.next().is_some() {
        return Err(err());
    }
    Ok((r, g, b))
}

fn parse_biome_descriptor(path: &str, text: &str) -> Result<BiomeDescriptor, PackLoadError> {
    let fields = parse_kv_lines(text);

    let name = fields.get("name").cloned().ok_or_else(|| PackLoadError::ParseError {
        path: path.to_string(),
        reason: "missing required key `name`".to_string(),
    })?;

    let mut tile_weights = HashMap::new();
    for (key, value) in &fields {
        let Some(tile_name) = key.strip_prefix("tile_weight_") else { continue };
        let tile = TileType::from_name(tile_name).ok_or_else(|| PackLoadError::ParseError {
            path: path.to_string(),
            reason: format!("unknown tile type `{tile_name}` in key `{key}`"),
        })?;
        let weight: f32 = value.parse().map_err(|_| PackLoadError::ParseError {
            path: path.to_string(),
            reason: format!("invalid float for `{key}`: `{value}`"),
        })?;
        tile_weights.insert(tile, weight);
    }

    Ok(BiomeDescriptor {
        name,
        tile_weights,
        vegetation_density: parse_f32_field(&fields, path, "vegetation_density", 0.0)?,
        decoration_density: parse_f32_field(&fields, path, "decoration_density", 0.0)?,
        ambient_color: parse_ambient_color(&fields, path)?,
        music_track: fields.get("music_track").map_or(Ok(0), |v| {
            v.parse().map_err(|_| PackLoadError::ParseError {
                path: path.to_string(),
                reason: format!("invalid integer for `music_track`: `{v}`"),
            })
        })?,
        allow_structures: parse_bool_flag(&fields, path, "allow_structures", true)?,
        allow_weather: parse_bool_flag(&fields, path, "allow_weather", true)?,
    })
}

/// A fully loaded and validated descriptor pack.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorPack {
    /// Schema version the pack was normalized to (always
    /// [`CURRENT_SCHEMA_VERSION`] for a successfully loaded pack).
    pub schema_version: u32,
    /// Every `*.biome.cfg` descriptor found in the pack, in file-name order.
    pub biomes: Vec<BiomeDescriptor>,
}

/// Loads and validates descriptor packs against a fixed chain of schema
/// migrations.
#[derive(Default)]
pub struct PackLoader {
    migrations: Vec<Box<dyn SchemaMigration>>,
}

impl PackLoader {
    /// Creates a loader with no registered migrations; packs must already
    /// declare [`CURRENT_SCHEMA_VERSION`].
    #[must_use]
    pub fn new() -> Self {
        Self { migrations: Vec::new() }
    }

    /// Registers a migration step.
    #[must_use]
    pub fn with_migration(mut self, migration: Box<dyn SchemaMigration>) -> Self {
        self.migrations.push(migration);
        self
    }

    fn migrate_to_current(&self, mut fields: HashMap<String, String>, found: u32) -> Result<HashMap<String, String>, PackLoadError> {
        let mut version = found;
        while version != CURRENT_SCHEMA_VERSION {
            let Some(step) = self.migrations.iter().find(|m| m.source_version() == version) else {
                return Err(PackLoadError::SchemaUnsupported { found });
            };
            step.migrate(&mut fields);
            version = fields
                .get("schema_version")
                .and_then(|v| v.parse().ok())
                .ok_or(PackLoadError::SchemaUnsupported { found })?;
        }
        Ok(fields)
    }

    /// Runs the full load sequence: read `pack.meta`, migrate to the
    /// current schema, scan for `*.biome.cfg` descriptors, and validate
    /// every one of them.
    ///
    /// # Errors
    /// Returns [`PackLoadError::SchemaUnsupported`] if no migration chain
    /// reaches the current version, or [`PackLoadError::ParseError`] /
    /// [`PackLoadError::Io`] if any descriptor fails to parse — in which
    /// case the whole pack is rejected and nothing is returned.
    pub fn load(&self, source: &dyn PackSource) -> Result<DescriptorPack, PackLoadError> {
        let meta_text = source.read_meta()?;
        let fields = parse_kv_lines(&meta_text);
        let found: u32 = fields
            .get("schema_version")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| PackLoadError::ParseError {
                path: "pack.meta".to_string(),
                reason: "missing required key `schema_version`".to_string(),
            })?;
        self.migrate_to_current(fields, found)?;

        let mut biomes = Vec::new();
        for (name, contents) in source.list_descriptors(".biome.cfg")? {
            biomes.push(parse_biome_descriptor(&name, &contents)?);
        }
        log::debug!("descriptor pack loaded: schema={CURRENT_SCHEMA_VERSION}, biomes={}", biomes.len());
        Ok(DescriptorPack { schema_version: CURRENT_SCHEMA_VERSION, biomes })
    }
}

/// Holds the single process-wide active pack, swapped atomically on a
/// successful (re)load.
#[derive(Default)]
pub struct PackRegistry {
    active: Mutex<Option<DescriptorPack>>,
}

impl PackRegistry {
    /// Creates a registry with no active pack.
    #[must_use]
    pub fn new() -> Self {
        Self { active: Mutex::new(None) }
    }

    /// Returns a clone of the currently active pack, if any has loaded
    /// successfully.
    #[must_use]
    pub fn active(&self) -> Option<DescriptorPack> {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Loads `source` through `loader` and, on success, swaps it in as the
    /// active pack.
    ///
    /// The first load (no pack active yet) always proceeds. Replacing an
    /// already-active pack requires `allow_hot_reload`; the new pack is
    /// fully validated before the old one is discarded, so a failed load
    /// never disturbs the active state.
    ///
    /// # Errors
    /// Returns [`PackLoadError::HotReloadDisabled`] if a pack is already
    /// active and `allow_hot_reload` is `false`, or any error `loader.load`
    /// produces.
    pub fn load(
        &self,
        loader: &PackLoader,
        source: &dyn PackSource,
        allow_hot_reload: bool,
    ) -> Result<(), PackLoadError> {
        let mut guard = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() && !allow_hot_reload {
            return Err(PackLoadError::HotReloadDisabled);
        }
        let pack = loader.load(source)?;
        log::info!("descriptor pack registry swapped in {} biome(s)", pack.biomes.len());
        *guard = Some(pack);
        Ok(())
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        meta: &'static str,
        descriptors: Vec<(&'static str, &'static str)>,
    }

    impl PackSource for FakeSource {
        fn read_meta(&self) -> Result<String, PackLoadError> {
            Ok(self.meta.to_string())
        }

        fn list_descriptors(&self, suffix: &str) -> Result<Vec<(String, String)>, PackLoadError> {
            let mut found: Vec<(String, String)> = self
                .descriptors
                .iter()
                .filter(|(name, _)| name.ends_with(suffix))
                .map(|(name, text)| ((*name).to_string(), (*text).to_string()))
                .collect();
            found.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(found)
        }
    }

    const VALID_BIOME: &str = "name=Heartwood\n\
        tile_weight_GRASS=0.7\n\
        tile_weight_FOREST=0.3\n\
        vegetation_density=0.8\n\
        decoration_density=0.2\n\
        ambient_color=20,40,20\n\
        music_track=3\n\
        allow_structures=1\n\
        allow_weather=0\n";

    #[test]
    fn loads_a_valid_pack_with_one_biome() {
        let source =
            FakeSource { meta: "schema_version=1\n", descriptors: vec![("heartwood.biome.cfg", VALID_BIOME)] };
        let pack = PackLoader::new().load(&source).expect("pack loads");
        assert_eq!(pack.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(pack.biomes.len(), 1);
        let biome = &pack.biomes[0];
        assert_eq!(biome.name, "Heartwood");
        assert_eq!(biome.tile_weights.get(&TileType::Grass), Some(&0.7));
        assert_eq!(biome.ambient_color, (20, 40, 20));
        assert!(biome.allow_structures);
        assert!(!biome.allow_weather);
    }

    #[test]
    fn missing_schema_version_is_a_parse_error() {
        let source = FakeSource { meta: "not_a_key\n", descriptors: vec![] };
        let err = PackLoader::new().load(&source).unwrap_err();
        assert!(matches!(err, PackLoadError::ParseError { path, .. } if path == "pack.meta"));
    }

    #[test]
    fn unsupported_schema_with_no_migration_fails() {
        let source = FakeSource { meta: "schema_version=0\n", descriptors: vec![] };
        let err = PackLoader::new().load(&source).unwrap_err();
        assert_eq!(err, PackLoadError::SchemaUnsupported { found: 0 });
    }

    struct BumpToOne;
    impl SchemaMigration for BumpToOne {
        fn source_version(&self) -> u32 {
            0
        }

        fn migrate(&self, fields: &mut HashMap<String, String>) {
            fields.insert("schema_version".to_string(), "1".to_string());
        }
    }

    #[test]
    fn a_registered_migration_chain_reaches_the_current_version() {
        let source = FakeSource { meta: "schema_version=0\n", descriptors: vec![] };
        let loader = PackLoader::new().with_migration(Box::new(BumpToOne));
        let pack = loader.load(&source).expect("migrates to current");
        assert_eq!(pack.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn an_invalid_descriptor_rejects_the_whole_pack() {
        let bad = "name=Bad\ntile_weight_NOT_A_TILE=1.0\n";
        let source = FakeSource {
            meta: "schema_version=1\n",
            descriptors: vec![("good.biome.cfg", VALID_BIOME), ("bad.biome.cfg", bad)],
        };
        let err = PackLoader::new().load(&source).unwrap_err();
        assert!(matches!(err, PackLoadError::ParseError { path, .. } if path == "bad.biome.cfg"));
    }

    #[test]
    fn registry_accepts_the_first_load_regardless_of_hot_reload_flag() {
        let source =
            FakeSource { meta: "schema_version=1\n", descriptors: vec![("heartwood.biome.cfg", VALID_BIOME)] };
        let registry = PackRegistry::new();
        registry.load(&PackLoader::new(), &source, false).expect("initial load succeeds");
        assert!(registry.active().is_some());
    }

    #[test]
    fn registry_rejects_a_reload_without_hot_reload_enabled() {
        let source =
            FakeSource { meta: "schema_version=1\n", descriptors: vec![("heartwood.biome.cfg", VALID_BIOME)] };
        let registry = PackRegistry::new();
        registry.load(&PackLoader::new(), &source, false).expect("initial load succeeds");
        let err = registry.load(&PackLoader::new(), &source, false).unwrap_err();
        assert_eq!(err, PackLoadError::HotReloadDisabled);
    }

    #[test]
    fn a_failed_reload_leaves_the_active_pack_untouched() {
        let good_source =
            FakeSource { meta: "schema_version=1\n", descriptors: vec![("heartwood.biome.cfg", VALID_BIOME)] };
        let bad_source = FakeSource { meta: "schema_version=99\n", descriptors: vec![] };
        let registry = PackRegistry::new();
        registry.load(&PackLoader::new(), &good_source, true).expect("initial load succeeds");
        let before = registry.active();
        let err = registry.load(&PackLoader::new(), &bad_source, true).unwrap_err();
        assert_eq!(err, PackLoadError::SchemaUnsupported { found: 99 });
        assert_eq!(registry.active(), before);
    }
}
