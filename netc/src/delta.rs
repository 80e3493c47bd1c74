//! Delta pre/post-pass (spec.md §4.6): residual formation against the
//! previous packet of identical length, using a field-class-aware mapping
//! keyed by position bucket so integer, float, bitmask and ordinal-shaped
//! regions each get the residual operation that actually shrinks them.

use netc_core::ctx_bucket;

/// Minimum packet length delta is considered for (spec.md glossary
/// `NETC_DELTA_MIN_SIZE`).
pub const NETC_DELTA_MIN_SIZE: usize = 16;

/// The residual operation applied to a position bucket. Stable across
/// versions and SIMD variants: every implementation of this mapping must
/// agree byte-for-byte with the scalar reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldClass {
    /// Small integer counters, sequence numbers: wrapping arithmetic diff.
    Integer,
    /// Floating point bit patterns: XOR (arithmetic diff would scramble the exponent).
    Float,
    /// Flag/bitmask regions: XOR.
    Bitmask,
    /// Monotonic ordinal fields (timestamps, indices): wrapping subtraction.
    Ordinal,
}

/// Map a position bucket to its field class. Buckets 0-3 (offsets < 32)
/// are small header-like integer fields; 4-7 (32-127) are the
/// floating-point-heavy body typical of transform/state updates; 8-11
/// (128-511) are bitmask/flags; 12-15 (≥512) are ordinal/bulk payload.
fn field_class(bucket: usize) -> FieldClass {
    match bucket {
        0..=3 => FieldClass::Integer,
        4..=7 => FieldClass::Float,
        8..=11 => FieldClass::Bitmask,
        _ => FieldClass::Ordinal,
    }
}

#[inline]
fn residual_byte(class: FieldClass, cur: u8, prev: u8) -> u8 {
    match class {
        FieldClass::Integer => cur.wrapping_sub(prev),
        FieldClass::Float => cur ^ prev,
        FieldClass::Bitmask => cur ^ prev,
        FieldClass::Ordinal => cur.wrapping_sub(prev),
    }
}

#[inline]
fn inverse_byte(class: FieldClass, residual: u8, prev: u8) -> u8 {
    match class {
        FieldClass::Integer => residual.wrapping_add(prev),
        FieldClass::Float => residual ^ prev,
        FieldClass::Bitmask => residual ^ prev,
        FieldClass::Ordinal => residual.wrapping_add(prev),
    }
}

/// Whether delta applies to a pair of packets of lengths `cur_len` and
/// `prev_len` (spec.md §4.12 step 3 precondition).
pub fn applies(cur_len: usize, prev_len: usize) -> bool {
    cur_len == prev_len && cur_len >= NETC_DELTA_MIN_SIZE
}

/// Form the residual of `cur` against `prev` (same length) into `out`.
///
/// # Panics
/// Panics if the three slices do not all have equal length.
pub fn encode(cur: &[u8], prev: &[u8], out: &mut [u8]) {
    assert_eq!(cur.len(), prev.len());
    assert_eq!(cur.len(), out.len());
    for (offset, ((&c, &p), o)) in cur.iter().zip(prev.iter()).zip(out.iter_mut()).enumerate() {
        let class = field_class(ctx_bucket(offset));
        *o = residual_byte(class, c, p);
    }
}

/// Recover `cur` from a residual produced by [`encode`] and the same `prev`.
///
/// # Panics
/// Panics if the three slices do not all have equal length.
pub fn decode(residual: &[u8], prev: &[u8], out: &mut [u8]) {
    assert_eq!(residual.len(), prev.len());
    assert_eq!(residual.len(), out.len());
    for (offset, ((&r, &p), o)) in residual.iter().zip(prev.iter()).zip(out.iter_mut()).enumerate() {
        let class = field_class(ctx_bucket(offset));
        *o = inverse_byte(class, r, p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_across_all_field_classes() {
        let prev: Vec<u8> = (0..600u32).map(|i| (i * 37 % 251) as u8).collect();
        let cur: Vec<u8> = (0..600u32).map(|i| (i * 53 % 239) as u8).collect();
        let mut residual = vec![0u8; cur.len()];
        encode(&cur, &prev, &mut residual);
        let mut recovered = vec![0u8; cur.len()];
        decode(&residual, &prev, &mut recovered);
        assert_eq!(recovered, cur);
    }

    #[test]
    fn identical_packets_produce_all_zero_residual() {
        let data = vec![0x42u8; 64];
        let mut residual = vec![0xFFu8; 64];
        encode(&data, &data, &mut residual);
        assert!(residual.iter().all(|&b| b == 0));
    }

    #[test]
    fn applies_requires_matching_length_and_minimum_size() {
        assert!(!applies(8, 8));
        assert!(applies(16, 16));
        assert!(!applies(32, 16));
    }
}
