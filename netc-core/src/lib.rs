//! # netc-core
//!
//! Dependency-light primitives shared by [`netc`](https://docs.rs/netc):
//! bounded bitstream I/O, a CRC-32 one-shot, and a circular history buffer.
//! None of these types know anything about packets, dictionaries, or tANS —
//! they are the same kind of foundation layer `oxiarc-core` provides for
//! the archive formats built on top of it.
//!
//! - [`bitstream`]: forward bit I/O for headers/LZ tokens, plus the
//!   reverse-order reader tANS decoding needs.
//! - [`crc`]: CRC-32 for dictionary blob integrity.
//! - [`ringbuffer`]: circular history buffer for cross-packet back-references.
//! - [`error`]: the crate-wide error type and taxonomy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitstream;
pub mod crc;
pub mod error;
pub mod ringbuffer;

pub use bitstream::{BitReader, BitWriter, ReverseBitReader};
pub use crc::Crc32;
pub use error::{NetcError, Result};
pub use ringbuffer::RingBuffer;

/// Largest packet netc will compress or decompress.
pub const NETC_MAX_PACKET_SIZE: usize = 65535;

/// Number of position buckets a dictionary partitions a packet into.
pub const NETC_CTX_COUNT: usize = 16;

/// Start offsets of the 16 position buckets.
pub const NETC_BUCKET_OFFSETS: [usize; NETC_CTX_COUNT] = [
    0, 8, 16, 24, 32, 48, 64, 96, 128, 192, 256, 384, 512, 1024, 4096, 16384,
];

/// Map a byte offset within a packet to its position bucket (0..16).
pub fn ctx_bucket(offset: usize) -> usize {
    match NETC_BUCKET_OFFSETS.binary_search(&offset) {
        Ok(idx) => idx,
        Err(idx) => idx.saturating_sub(1),
    }
}
