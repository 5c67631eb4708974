// SPDX-License-Identifier: Apache-2.0
//! Value noise and fractional Brownian motion.
//!
//! The noise field is a pure function of `(x, y)` coordinates — it carries
//! no RNG channel state, so any phase can sample it any number of times in
//! any order without perturbing RNG-channel determinism.

/// Hashes an integer lattice point to a value in `[0, 1)`.
#[must_use]
fn hash_corner(x: i32, y: i32) -> f32 {
    let h = (x.wrapping_mul(374_761_393).wrapping_add(y.wrapping_mul(668_265_263))) as u32;
    let h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    (h & 0x00FF_FFFF) as f32 / 0x00FF_FFFF as f32
}

#[must_use]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Samples 2D value noise at `(x, y)`: hashes the four integer corners of
/// the containing unit cell, smoothsteps the fractional parts, and
/// bilinearly interpolates.
#[must_use]
pub fn value_noise(x: f32, y: f32) -> f32 {
    let xi = x.floor();
    let yi = y.floor();
    let tx = x - xi;
    let ty = y - yi;
    #[allow(clippy::cast_possible_truncation)]
    let (xi, yi) = (xi as i32, yi as i32);

    let v00 = hash_corner(xi, yi);
    let v10 = hash_corner(xi + 1, yi);
    let v01 = hash_corner(xi, yi + 1);
    let v11 = hash_corner(xi + 1, yi + 1);

    let sx = smoothstep(tx);
    let sy = smoothstep(ty);

    let a = v00 + (v10 - v00) * sx;
    let b = v01 + (v11 - v01) * sx;
    a + (b - a) * sy
}

/// Sums `octaves` value-noise samples at geometrically scaled frequency and
/// amplitude, normalized by total amplitude so the result stays in
/// approximately `[0, 1]` regardless of octave count.
#[must_use]
pub fn fbm(x: f32, y: f32, octaves: u32, lacunarity: f32, gain: f32) -> f32 {
    let mut amp = 1.0f32;
    let mut freq = 1.0f32;
    let mut sum = 0.0f32;
    let mut norm = 0.0f32;
    for _ in 0..octaves {
        sum += value_noise(x * freq, y * freq) * amp;
        norm += amp;
        freq *= lacunarity;
        amp *= gain;
    }
    if norm > 0.0 {
        sum / norm
    } else {
        0.0
    }
}

/// Computes `fbm` for four `(x, y)` pairs at once.
///
/// This is the "optional SIMD batch path" from the spec expressed without a
/// platform-specific SIMD intrinsic: it produces bit-identical results to
/// four scalar [`fbm`] calls (determinism is the point, not instruction
/// selection), but groups the work so a caller streaming many samples can
/// amortize call overhead and so a future backend can swap in real SIMD
/// without changing this function's contract.
#[must_use]
pub fn fbm_batch4(
    xs: [f32; 4],
    ys: [f32; 4],
    octaves: u32,
    lacunarity: f32,
    gain: f32,
) -> [f32; 4] {
    [
        fbm(xs[0], ys[0], octaves, lacunarity, gain),
        fbm(xs[1], ys[1], octaves, lacunarity, gain),
        fbm(xs[2], ys[2], octaves, lacunarity, gain),
        fbm(xs[3], ys[3], octaves, lacunarity, gain),
    ]
}

/// Radial falloff used by macro continent shaping: `dist` is the normalized
/// distance from the map center.
#[must_use]
pub fn radial_falloff(dist: f32) -> f32 {
    dist.max(0.0)
}
