//! Packet header codec (spec.md §4.14): the legacy fixed 8-byte form and
//! the compact 2-4-byte form, plus the locked-in compact variant table
//! (§9 "Compact header variant table" — treated as load-bearing wire
//! format, not an open question).

use netc_core::error::{NetcError, Result};

/// Algorithm identifier. A full byte value of `0xFF` is the passthrough
/// sentinel; any other value packs a low-nibble kind and a high-nibble
/// bucket index (meaningful only for the single-region kinds: [`Kind::Tans`],
/// [`Kind::Lzp`], [`Kind::Tans10`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// No entropy coding; payload is raw (or RLE/LZ77-token) bytes.
    Passthru,
    /// Single fixed tANS table.
    Tans,
    /// Range coder (reserved, never produced by this implementation).
    Rans,
    /// Per-position table selection (PCTX), single interleaved stream.
    TansPctx,
    /// LZP-XOR filtered bytes, tANS-coded with a bucket-selected table.
    Lzp,
    /// Cross-packet LZ77 against the ring buffer; never further entropy coded.
    Lz77x,
    /// tANS rescaled to a 10-bit table (small compact packets).
    Tans10,
}

const PASSTHRU_BYTE: u8 = 0xFF;

impl Kind {
    fn low_nibble(self) -> u8 {
        match self {
            Kind::Passthru => unreachable!("passthrough uses the 0xFF sentinel, not a nibble"),
            Kind::Tans => 0x01,
            Kind::Rans => 0x02,
            Kind::TansPctx => 0x03,
            Kind::Lzp => 0x04,
            Kind::Lz77x => 0x05,
            Kind::Tans10 => 0x06,
        }
    }

    fn from_low_nibble(nibble: u8) -> Result<Self> {
        match nibble {
            0x01 => Ok(Kind::Tans),
            0x02 => Ok(Kind::Rans),
            0x03 => Ok(Kind::TansPctx),
            0x04 => Ok(Kind::Lzp),
            0x05 => Ok(Kind::Lz77x),
            0x06 => Ok(Kind::Tans10),
            _ => Err(NetcError::Unsupported { variant: nibble }),
        }
    }

    /// Whether this kind carries a winning-bucket index in the algorithm
    /// byte's high nibble (spec.md §3 "For TANS/LZP/TANS_10/PCTX
    /// single-region variants..." — PCTX here means the single-bucket
    /// best-fit trial, not [`Kind::TansPctx`]'s per-position table, so
    /// only the three truly single-table kinds qualify).
    pub fn carries_bucket(self) -> bool {
        matches!(self, Kind::Tans | Kind::Lzp | Kind::Tans10)
    }

    /// Pack this kind and an optional bucket index into the wire algorithm byte.
    pub fn to_byte(self, bucket: u8) -> u8 {
        match self {
            Kind::Passthru => PASSTHRU_BYTE,
            other => {
                let nibble = if other.carries_bucket() { bucket & 0x0F } else { 0 };
                (nibble << 4) | other.low_nibble()
            }
        }
    }

    /// Unpack a wire algorithm byte into `(kind, bucket)`. `bucket` is `0`
    /// for kinds that do not carry one.
    pub fn from_byte(byte: u8) -> Result<(Self, u8)> {
        if byte == PASSTHRU_BYTE {
            return Ok((Kind::Passthru, 0));
        }
        let kind = Self::from_low_nibble(byte & 0x0F)?;
        let bucket = if kind.carries_bucket() { (byte >> 4) & 0x0F } else { 0 };
        Ok((kind, bucket))
    }
}

/// Flag bitmask (spec.md §3). Plain `u8` constants rather than a bitflags
/// type, matching the rest of this codebase's preference for explicit
/// shift-and-mask over a macro-generated bitset type.
pub mod flags {
    /// Pre-filter was the delta residual pass.
    pub const DELTA: u8 = 0x01;
    /// Entropy tables were selected by preceding-byte bigram class.
    pub const BIGRAM: u8 = 0x02;
    /// Set whenever `algorithm == PASSTHRU`, redundantly with the algorithm
    /// byte, so compact-mode tooling can filter on flags alone.
    pub const PASSTHRU: u8 = 0x04;
    /// Packet was coded against a dictionary; `model_id` is meaningful.
    pub const DICT_ID: u8 = 0x08;
    /// Within-packet LZ77 token stream (standalone, or riding inside a
    /// `PASSTHRU` envelope per spec.md §9's flag-overload wire quirk).
    pub const LZ77: u8 = 0x10;
    /// Multi-region layout: one independent tANS stream per spanned bucket.
    pub const MREG: u8 = 0x20;
    /// Dual-interleaved tANS streams (spec.md §4.5 `X2`).
    pub const X2: u8 = 0x40;
    /// Run-length-encoded payload riding inside a `PASSTHRU` envelope.
    pub const RLE: u8 = 0x80;
}

/// A decoded (or about-to-be-encoded) packet header, independent of wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Original (uncompressed) packet size.
    pub original_size: u16,
    /// Compressed payload size (legacy form only; compact derives it from
    /// the transport length, so callers of [`write_compact`] may pass `0`).
    pub compressed_size: u16,
    /// Flag bitmask, see [`flags`].
    pub flags: u8,
    /// Packed algorithm byte (see [`Kind::to_byte`]/[`Kind::from_byte`]).
    pub algorithm: u8,
    /// Dictionary model id this packet was coded against (meaningful iff
    /// `flags & flags::DICT_ID != 0`).
    pub model_id: u8,
    /// Context sequence number at the time of encoding.
    pub context_seq: u8,
}

/// Fixed size of the legacy header form.
pub const LEGACY_HEADER_SIZE: usize = 8;

/// Write the 8-byte legacy header into `out`. Returns bytes written.
pub fn write_legacy(header: &Header, out: &mut [u8]) -> Result<usize> {
    if out.len() < LEGACY_HEADER_SIZE {
        return Err(NetcError::buf_small(LEGACY_HEADER_SIZE, out.len()));
    }
    out[0..2].copy_from_slice(&header.original_size.to_le_bytes());
    out[2..4].copy_from_slice(&header.compressed_size.to_le_bytes());
    out[4] = header.flags;
    out[5] = header.algorithm;
    out[6] = header.model_id;
    out[7] = header.context_seq;
    Ok(LEGACY_HEADER_SIZE)
}

/// Parse an 8-byte legacy header from `data`. Returns `(header, bytes_consumed)`.
pub fn read_legacy(data: &[u8]) -> Result<(Header, usize)> {
    if data.len() < LEGACY_HEADER_SIZE {
        return Err(NetcError::corrupt(0, "truncated legacy header"));
    }
    let header = Header {
        original_size: u16::from_le_bytes([data[0], data[1]]),
        compressed_size: u16::from_le_bytes([data[2], data[3]]),
        flags: data[4],
        algorithm: data[5],
        model_id: data[6],
        context_seq: data[7],
    };
    Ok((header, LEGACY_HEADER_SIZE))
}

/// One entry of the locked-in compact variant table: a specific
/// `(algorithm, flags)` combination the pipeline can actually emit, plus
/// whether its wire form carries a trailing bucket byte.
#[derive(Debug, Clone, Copy)]
struct CompactVariant {
    kind: Kind,
    flags: u8,
    carries_bucket: bool,
}

const fn v(kind: Kind, flags: u8) -> CompactVariant {
    CompactVariant {
        kind,
        flags,
        carries_bucket: false,
    }
}

const fn vb(kind: Kind, flags: u8) -> CompactVariant {
    CompactVariant {
        kind,
        flags,
        carries_bucket: true,
    }
}

/// The stable, load-bearing table of `(algorithm, flags)` combinations
/// compact headers can express. Index into this table *is* the wire
/// format; reordering or removing an entry breaks interop with anything
/// that saw an earlier version of this table (spec.md §9). New variants
/// may only be appended.
#[rustfmt::skip]
const COMPACT_VARIANTS: &[CompactVariant] = &[
    /* 0  */ v(Kind::Passthru, 0),
    /* 1  */ v(Kind::Passthru, flags::LZ77),
    /* 2  */ v(Kind::Passthru, flags::RLE),
    /* 3  */ vb(Kind::Tans, flags::DICT_ID),
    /* 4  */ vb(Kind::Tans, flags::DICT_ID | flags::DELTA),
    /* 5  */ vb(Kind::Tans, flags::DICT_ID | flags::BIGRAM),
    /* 6  */ vb(Kind::Tans, flags::DICT_ID | flags::DELTA | flags::BIGRAM),
    /* 7  */ vb(Kind::Tans, flags::DICT_ID | flags::X2),
    /* 8  */ vb(Kind::Tans, flags::DICT_ID | flags::X2 | flags::BIGRAM),
    /* 9  */ vb(Kind::Tans, flags::DICT_ID | flags::X2 | flags::DELTA),
    /* 10 */ v(Kind::TansPctx, flags::DICT_ID),
    /* 11 */ v(Kind::TansPctx, flags::DICT_ID | flags::BIGRAM),
    /* 12 */ v(Kind::TansPctx, flags::DICT_ID | flags::MREG),
    /* 13 */ v(Kind::TansPctx, flags::DICT_ID | flags::MREG | flags::BIGRAM),
    /* 14 */ vb(Kind::Lzp, flags::DICT_ID),
    /* 15 */ vb(Kind::Lzp, flags::DICT_ID | flags::BIGRAM),
    /* 16 */ vb(Kind::Tans10, flags::DICT_ID),
    /* 17 */ vb(Kind::Tans10, flags::DICT_ID | flags::BIGRAM),
    /* 18 */ v(Kind::Lz77x, 0),
    /* 19 */ v(Kind::Lz77x, flags::DICT_ID),
];

fn find_variant(kind: Kind, flags: u8) -> Option<(usize, &'static CompactVariant)> {
    COMPACT_VARIANTS
        .iter()
        .enumerate()
        .find(|(_, entry)| entry.kind == kind && entry.flags == flags)
}

/// Write a compact header (1-byte prefix, 1-2 size bytes, optional bucket
/// byte) into `out`. `header.compressed_size` is ignored (compact mode
/// derives it from the transport length); `model_id`/`context_seq` are not
/// written (compact mode infers them from the context).
pub fn write_compact(header: &Header, out: &mut [u8]) -> Result<usize> {
    let (kind, bucket) = Kind::from_byte(header.algorithm)?;
    let (index, variant) =
        find_variant(kind, header.flags).ok_or(NetcError::Unsupported { variant: header.algorithm })?;
    if index > 0x7F {
        return Err(NetcError::Unsupported { variant: header.algorithm });
    }

    let wide = header.original_size > 0xFF;
    let prefix = (index as u8) | if wide { 0x80 } else { 0x00 };

    let needed = 1 + if wide { 2 } else { 1 } + if variant.carries_bucket { 1 } else { 0 };
    if out.len() < needed {
        return Err(NetcError::buf_small(needed, out.len()));
    }

    let mut pos = 0;
    out[pos] = prefix;
    pos += 1;
    if wide {
        out[pos..pos + 2].copy_from_slice(&header.original_size.to_le_bytes());
        pos += 2;
    } else {
        out[pos] = header.original_size as u8;
        pos += 1;
    }
    if variant.carries_bucket {
        out[pos] = bucket;
        pos += 1;
    }
    Ok(pos)
}

/// Parse a compact header from `data`. `model_id`/`context_seq` are filled
/// in from the caller's context rather than the wire (compact mode never
/// carries them). Returns `(header, bytes_consumed)`.
pub fn read_compact(data: &[u8], model_id: u8, context_seq: u8) -> Result<(Header, usize)> {
    if data.is_empty() {
        return Err(NetcError::corrupt(0, "truncated compact header"));
    }
    let prefix = data[0];
    let index = (prefix & 0x7F) as usize;
    let wide = prefix & 0x80 != 0;
    let variant = COMPACT_VARIANTS
        .get(index)
        .ok_or(NetcError::Unsupported { variant: prefix })?;

    let mut pos = 1usize;
    let original_size = if wide {
        if data.len() < pos + 2 {
            return Err(NetcError::corrupt(pos, "truncated compact header size"));
        }
        let size = u16::from_le_bytes([data[pos], data[pos + 1]]);
        pos += 2;
        size
    } else {
        if data.len() < pos + 1 {
            return Err(NetcError::corrupt(pos, "truncated compact header size"));
        }
        let size = data[pos] as u16;
        pos += 1;
        size
    };

    let bucket = if variant.carries_bucket {
        if data.len() < pos + 1 {
            return Err(NetcError::corrupt(pos, "truncated compact header bucket"));
        }
        let b = data[pos];
        pos += 1;
        b
    } else {
        0
    };

    let header = Header {
        original_size,
        compressed_size: 0,
        flags: variant.flags,
        algorithm: variant.kind.to_byte(bucket),
        model_id,
        context_seq,
    };
    Ok((header, pos))
}

/// Header size in bytes this configuration would write, given whether
/// compact mode is selected and (for compact) whether `original_size`
/// needs the wide form. Used by the pipeline to size candidate buffers
/// before a winning algorithm is chosen.
pub fn max_header_size(compact: bool) -> usize {
    if compact {
        4
    } else {
        LEGACY_HEADER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_round_trips() {
        let header = Header {
            original_size: 1234,
            compressed_size: 500,
            flags: flags::DICT_ID | flags::DELTA,
            algorithm: Kind::Tans.to_byte(5),
            model_id: 7,
            context_seq: 200,
        };
        let mut buf = [0u8; LEGACY_HEADER_SIZE];
        let written = write_legacy(&header, &mut buf).unwrap();
        assert_eq!(written, LEGACY_HEADER_SIZE);
        let (parsed, consumed) = read_legacy(&buf).unwrap();
        assert_eq!(consumed, LEGACY_HEADER_SIZE);
        assert_eq!(parsed, header);
    }

    #[test]
    fn algorithm_byte_packs_and_unpacks_bucket() {
        let byte = Kind::Tans.to_byte(9);
        let (kind, bucket) = Kind::from_byte(byte).unwrap();
        assert_eq!(kind, Kind::Tans);
        assert_eq!(bucket, 9);
    }

    #[test]
    fn passthru_sentinel_ignores_bucket_nibble() {
        let byte = Kind::Passthru.to_byte(15);
        assert_eq!(byte, 0xFF);
        let (kind, bucket) = Kind::from_byte(byte).unwrap();
        assert_eq!(kind, Kind::Passthru);
        assert_eq!(bucket, 0);
    }

    #[test]
    fn compact_small_size_uses_one_byte_and_bucket() {
        let header = Header {
            original_size: 64,
            compressed_size: 0,
            flags: flags::DICT_ID,
            algorithm: Kind::Tans.to_byte(3),
            model_id: 9,
            context_seq: 1,
        };
        let mut buf = [0u8; 4];
        let written = write_compact(&header, &mut buf).unwrap();
        assert_eq!(written, 3); // prefix + 1-byte size + bucket

        let (parsed, consumed) = read_compact(&buf[..written], 9, 1).unwrap();
        assert_eq!(consumed, written);
        assert_eq!(parsed.original_size, 64);
        assert_eq!(parsed.algorithm, Kind::Tans.to_byte(3));
        assert_eq!(parsed.model_id, 9);
    }

    #[test]
    fn compact_wide_size_uses_two_bytes() {
        let header = Header {
            original_size: 4000,
            compressed_size: 0,
            flags: 0,
            algorithm: Kind::Passthru.to_byte(0),
            model_id: 0,
            context_seq: 5,
        };
        let mut buf = [0u8; 4];
        let written = write_compact(&header, &mut buf).unwrap();
        assert_eq!(written, 3); // prefix + 2-byte size, no bucket
        let (parsed, _) = read_compact(&buf[..written], 0, 5).unwrap();
        assert_eq!(parsed.original_size, 4000);
    }

    #[test]
    fn unknown_compact_variant_index_is_corrupt() {
        let buf = [0x7F, 0];
        assert!(read_compact(&buf, 0, 0).is_err());
    }

    #[test]
    fn max_header_size_matches_forms() {
        assert_eq!(max_header_size(false), 8);
        assert_eq!(max_header_size(true), 4);
    }
}
