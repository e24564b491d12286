//! Value noise used to break up the silhouette of synthesized cloud puffs.

/// Hash a lattice point to a value in [0.0, 1.0].
#[inline]
pub fn lattice_hash(x: i32, y: i32, seed: u32) -> f32 {
    let mut h = seed.wrapping_add(x as u32).wrapping_mul(374761393);
    h = h.wrapping_add(y as u32).wrapping_mul(668265263);
    h = (h ^ (h >> 13)).wrapping_mul(1274126177);
    h ^= h >> 16;
    (h & 0x7fff) as f32 / 0x7fff as f32
}

/// Smoothstep interpolation: 3t² - 2t³
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// 2D value noise, roughly in [0.0, 1.0]
pub fn value_noise(x: f32, y: f32, seed: u32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = smoothstep(x - ix as f32);
    let fy = smoothstep(y - iy as f32);

    let c00 = lattice_hash(ix, iy, seed);
    let c10 = lattice_hash(ix + 1, iy, seed);
    let c01 = lattice_hash(ix, iy + 1, seed);
    let c11 = lattice_hash(ix + 1, iy + 1, seed);

    let top = c00 + (c10 - c00) * fx;
    let bottom = c01 + (c11 - c01) * fx;
    top + (bottom - top) * fy
}

/// Fractional Brownian motion over `octaves` layers of value noise.
/// Each octave doubles frequency and halves amplitude, so the sum stays below 1.0.
pub fn fbm(x: f32, y: f32, octaves: u32, seed: u32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    for octave in 0..octaves {
        value += amplitude * value_noise(x * frequency, y * frequency, seed.wrapping_add(octave));
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    value
}
