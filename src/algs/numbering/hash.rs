//! Coordinate hashing used as cross-rank entity identity.
//!
//! The hash is a pure function of the coordinate bit patterns, combined in
//! component order. Bit-identical coordinates hash identically on every rank;
//! nothing else (rounding, iteration order, per-process seeds) enters.

use crate::data::coordinates::Coordinates;

const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

/// SplitMix64 finalizer.
#[inline]
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Order-sensitive combine of `value` into `seed` (64-bit `hash_combine`).
#[inline]
pub fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ mix(value)
        .wrapping_add(GOLDEN)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Bit pattern of one coordinate; `-0.0` and `0.0` share one pattern.
#[inline]
pub fn coordinate_bits(x: f64) -> u64 {
    if x == 0.0 { 0 } else { x.to_bits() }
}

/// Hash one coordinate vector.
pub fn hash_coordinates(coords: &[f64]) -> u64 {
    coords
        .iter()
        .fold(0u64, |seed, &x| hash_combine(seed, coordinate_bits(x)))
}

/// Whether two coordinate vectors hash from the same bit patterns.
pub fn same_position(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(&x, &y)| coordinate_bits(x) == coordinate_bits(y))
}

/// Hash table for a coordinate table, indexed by local entity index.
#[cfg(not(feature = "rayon"))]
pub fn hash_table(coords: &Coordinates) -> Vec<u64> {
    coords.rows().map(hash_coordinates).collect()
}

/// Hash table for a coordinate table, indexed by local entity index.
#[cfg(feature = "rayon")]
pub fn hash_table(coords: &Coordinates) -> Vec<u64> {
    use rayon::prelude::*;
    coords
        .as_flat()
        .par_chunks_exact(coords.dimension())
        .map(hash_coordinates)
        .collect()
}
