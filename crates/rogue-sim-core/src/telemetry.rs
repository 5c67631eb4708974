// SPDX-License-Identifier: Apache-2.0
//! World-gen metrics and anomaly detection, plus a best-effort JSON event
//! emitter behind the `telemetry` feature.
//!
//! Metrics collection never depends on the JSON encoder: `metrics_collect`
//! and friends are plain data, usable with `default-features = false`.

use crate::tilemap::{TileMap, TileType};

/// Anomaly bit raised when the land ratio falls outside `[0.30, 0.55]`.
pub const ANOMALY_LAND_RATIO: u32 = 1 << 0;
/// Anomaly bit raised when no river cells were generated at all.
pub const ANOMALY_NO_RIVERS: u32 = 1 << 1;

const LAND_RATIO_MIN: f64 = 0.30;
const LAND_RATIO_MAX: f64 = 0.55;

fn is_land(ty: TileType) -> bool {
    !matches!(ty, TileType::Empty | TileType::Water | TileType::River | TileType::RiverWide | TileType::RiverDelta)
}

fn is_river(ty: TileType) -> bool {
    matches!(ty, TileType::River | TileType::RiverWide | TileType::RiverDelta)
}

/// Biome-composition metrics for a generated map, plus an anomaly bitmask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeMetrics {
    /// Total tiles classified as land (everything but water/river/empty).
    pub land_cells: usize,
    /// Open-water tile count.
    pub water_cells: usize,
    /// River, wide-river, and delta tile count combined.
    pub river_cells: usize,
    /// `land_cells / (width * height)`.
    pub land_ratio: f64,
    /// Bitmask of [`ANOMALY_LAND_RATIO`] / [`ANOMALY_NO_RIVERS`].
    pub anomaly_bits: u32,
}

/// Counts land/water/river cells in `map`, computes the land ratio, and
/// flags anomaly bit 0 if the ratio falls outside `[0.30, 0.55]`, bit 1 if
/// no river cells exist at all.
#[must_use]
pub fn metrics_collect(map: &TileMap) -> BiomeMetrics {
    let mut land_cells = 0usize;
    let mut water_cells = 0usize;
    let mut river_cells = 0usize;
    for (x, y) in map.coords() {
        let ty = map.get(x, y);
        if is_land(ty) {
            land_cells += 1;
        } else if is_river(ty) {
            river_cells += 1;
        } else if ty == TileType::Water {
            water_cells += 1;
        }
    }

    let total = f64::from(map.width()) * f64::from(map.height());
    let land_ratio = if total > 0.0 { land_cells as f64 / total } else { 0.0 };

    let mut anomaly_bits = 0u32;
    if !(LAND_RATIO_MIN..=LAND_RATIO_MAX).contains(&land_ratio) {
        anomaly_bits |= ANOMALY_LAND_RATIO;
    }
    if river_cells == 0 {
        anomaly_bits |= ANOMALY_NO_RIVERS;
    }

    if anomaly_bits != 0 {
        log::warn!("world-gen metrics anomaly: bits={anomaly_bits:#04b}, land_ratio={land_ratio:.3}");
    }

    BiomeMetrics { land_cells, water_cells, river_cells, land_ratio, anomaly_bits }
}

/// Renders set bits in `anomaly_bits` as comma-separated tokens.
#[must_use]
pub fn anomaly_list(anomaly_bits: u32) -> String {
    let mut tokens = Vec::new();
    if anomaly_bits & ANOMALY_LAND_RATIO != 0 {
        tokens.push("land_ratio_out_of_range");
    }
    if anomaly_bits & ANOMALY_NO_RIVERS != 0 {
        tokens.push("no_rivers");
    }
    tokens.join(",")
}

/// Copies `map`'s tile bytes verbatim into `dest`.
///
/// # Errors
/// Returns `false` without writing anything if `dest` is smaller than the
/// map's cell count.
pub fn export_biome_heatmap(map: &TileMap, dest: &mut [u8]) -> bool {
    let src = map.as_bytes();
    if dest.len() < src.len() {
        return false;
    }
    dest[..src.len()].copy_from_slice(src);
    true
}

#[cfg(feature = "telemetry")]
fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_micros()
}

/// Emits a `world_gen_metrics` JSONL event to stdout when the `telemetry`
/// feature is enabled. Best-effort: write errors are swallowed and a clock
/// rollback falls back to timestamp 0.
#[cfg(feature = "telemetry")]
pub fn emit_metrics_event(seed: u32, metrics: &BiomeMetrics) {
    use serde_json::json;
    use std::io::Write as _;

    let event = json!({
        "timestamp_micros": ts_micros(),
        "event": "world_gen_metrics",
        "seed": seed,
        "land_cells": metrics.land_cells,
        "water_cells": metrics.water_cells,
        "river_cells": metrics.river_cells,
        "land_ratio": metrics.land_ratio,
        "anomalies": anomaly_list(metrics.anomaly_bits),
    });
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{event}");
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: i32, height: i32) -> TileMap {
        let mut map = TileMap::init(width, height).expect("positive dims");
        let coords: Vec<(i32, i32)> = map.coords().collect();
        for (x, y) in coords {
            let ty = if (x + y) % 2 == 0 { TileType::Grass } else { TileType::Water };
            map.set(x, y, ty);
        }
        map
    }

    #[test]
    fn metrics_collect_counts_land_and_water_separately() {
        let map = checkerboard(10, 10);
        let metrics = metrics_collect(&map);
        assert_eq!(metrics.land_cells + metrics.water_cells, 100);
        assert_eq!(metrics.river_cells, 0);
    }

    #[test]
    fn no_rivers_raises_the_no_rivers_bit() {
        let map = checkerboard(10, 10);
        let metrics = metrics_collect(&map);
        assert_ne!(metrics.anomaly_bits & ANOMALY_NO_RIVERS, 0);
    }

    #[test]
    fn a_river_cell_clears_the_no_rivers_bit() {
        let mut map = TileMap::init(4, 4).expect("positive dims");
        let coords: Vec<(i32, i32)> = map.coords().collect();
        for (x, y) in coords {
            map.set(x, y, TileType::Grass);
        }
        map.set(0, 0, TileType::River);
        let metrics = metrics_collect(&map);
        assert_eq!(metrics.anomaly_bits & ANOMALY_NO_RIVERS, 0);
    }

    #[test]
    fn land_ratio_outside_the_expected_band_raises_its_bit() {
        // All-empty: land ratio is 0, well outside [0.30, 0.55].
        let map = TileMap::init(4, 4).expect("positive dims");
        let metrics = metrics_collect(&map);
        assert_ne!(metrics.anomaly_bits & ANOMALY_LAND_RATIO, 0);
    }

    #[test]
    fn anomaly_list_renders_both_tokens_in_bit_order() {
        let bits = ANOMALY_LAND_RATIO | ANOMALY_NO_RIVERS;
        assert_eq!(anomaly_list(bits), "land_ratio_out_of_range,no_rivers");
        assert_eq!(anomaly_list(0), "");
    }

    #[test]
    fn export_biome_heatmap_copies_bytes_verbatim() {
        let map = checkerboard(4, 4);
        let mut dest = vec![0u8; 16];
        assert!(export_biome_heatmap(&map, &mut dest));
        assert_eq!(dest, map.as_bytes());
    }

    #[test]
    fn export_biome_heatmap_rejects_an_undersized_buffer() {
        let map = checkerboard(4, 4);
        let mut dest = vec![0u8; 4];
        assert!(!export_biome_heatmap(&map, &mut dest));
    }
}
