//! Fixed little-endian wire records for numbering collectives.
//!
//! All multi-byte integers are stored pre-LE with `.to_le()` and decoded with
//! `.from_le()`, so mixed-endian runs agree on every payload.

use bytemuck::{Pod, Zeroable};

use crate::mesh_error::MeshNumberingError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

/// One `u64` on the wire (hash, global index, count, or `f64` bit pattern).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct WireU64 {
    pub v_le: u64,
}

impl WireU64 {
    pub fn of(v: u64) -> Self {
        Self { v_le: v.to_le() }
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.v_le)
    }
}

/// Per-rank pass status exchanged before a rank may abort.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct WireStatus {
    pub failed: u8,
}

/// Encode values as contiguous little-endian `u64` records.
pub fn encode_u64s(values: &[u64]) -> Vec<u8> {
    let wire: Vec<WireU64> = values.iter().map(|&v| WireU64::of(v)).collect();
    cast_slice(&wire).to_vec()
}

/// Decode a payload received from `neighbor` into `u64`s.
///
/// The payload may be unaligned; it is copied into a typed buffer first.
pub fn decode_u64s(raw: &[u8], neighbor: usize) -> Result<Vec<u64>, MeshNumberingError> {
    let width = std::mem::size_of::<WireU64>();
    if raw.len() % width != 0 {
        return Err(MeshNumberingError::BufferSizeMismatch {
            neighbor,
            expected: raw.len() - raw.len() % width,
            got: raw.len(),
        });
    }
    let mut wire = vec![WireU64::default(); raw.len() / width];
    cast_slice_mut(&mut wire).copy_from_slice(raw);
    Ok(wire.iter().map(WireU64::get).collect())
}

/// Encode `f64`s by bit pattern; the round trip is exact.
pub fn encode_f64s(values: &[f64]) -> Vec<u8> {
    let bits: Vec<u64> = values.iter().map(|v| v.to_bits()).collect();
    encode_u64s(&bits)
}

pub fn decode_f64s(raw: &[u8], neighbor: usize) -> Result<Vec<f64>, MeshNumberingError> {
    Ok(decode_u64s(raw, neighbor)?
        .into_iter()
        .map(f64::from_bits)
        .collect())
}
