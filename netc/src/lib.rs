//! # netc
//!
//! Finite-state-entropy packet compression for short, correlated network
//! payloads. Packets this small do not carry enough internal redundancy for
//! a general-purpose compressor to exploit; netc instead leans on a
//! dictionary trained offline from representative traffic, tANS-coding each
//! packet against per-position-bucket tables built from that training set,
//! with a handful of cheap structural fallbacks (RLE, LZ77, a cross-packet
//! long-range matcher) tried alongside and the smallest result kept.
//!
//! ## Layout
//!
//! - [`config`]: per-context options ([`Config`], [`SimdLevel`]).
//! - [`context`]: per-connection mutable state ([`Context`]) that owns the
//!   ring buffer, previous-packet buffer, and optional adaptive/stats state.
//! - [`dictionary`]: offline training and the frozen, versioned blob format
//!   ([`Dictionary`]).
//! - [`stats`]: opt-in counters ([`StatsSnapshot`]).
//!
//! Everything else (`tans`, `entropy`, `freq`, `delta`, `lzp`, `lz77`,
//! `lz77x`, `rle`, `header`, `adaptive`, `pipeline`, `decompress`) is
//! internal wiring a caller never names directly; it is reached only
//! through [`Context::compress`]/[`Context::decompress`] and the free
//! functions below.
//!
//! ## Example
//!
//! ```rust,no_run
//! use netc::{Config, Context, Dictionary};
//! use std::sync::Arc;
//!
//! let corpus: Vec<Vec<u8>> = vec![b"hello world".to_vec(), b"hello there".to_vec()];
//! let refs: Vec<&[u8]> = corpus.iter().map(|p| p.as_slice()).collect();
//! let dict = Arc::new(Dictionary::train(&refs, 1, false).unwrap());
//!
//! let mut ctx = Context::create(Some(dict), Config::default()).unwrap();
//! let src = b"hello world";
//! let mut packet = vec![0u8; netc::compress_bound(src.len())];
//! let len = ctx.compress(src, &mut packet).unwrap();
//! let mut out = vec![0u8; src.len()];
//! let out_len = ctx.decompress(&packet[..len], &mut out).unwrap();
//! assert_eq!(&out[..out_len], src);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod adaptive;
pub mod config;
pub mod context;
mod decompress;
mod delta;
pub mod dictionary;
mod entropy;
mod freq;
mod header;
mod lz77;
mod lz77x;
mod lzp;
mod pipeline;
mod rle;
pub mod stats;
mod tans;

pub use config::Config;
pub use context::Context;
pub use dictionary::Dictionary;
pub use netc_core::error::{NetcError, Result};
pub use stats::StatsSnapshot;

/// Upper bound on the wire size of a compressed packet of `src_size` bytes
/// (spec.md §4.12 "callers size their destination buffer from this, never
/// from the source size alone"). The pipeline never emits more than the
/// legacy header plus the raw passthrough body, so that sum is always safe
/// regardless of which [`config::HeaderForm`] a context ends up choosing.
pub fn compress_bound(src_size: usize) -> usize {
    header::LEGACY_HEADER_SIZE + src_size
}

/// Compress one packet with no cross-packet history, for callers that don't
/// want to own a long-lived [`Context`] (spec.md §4.12 "stateless" mode).
///
/// Takes `dict` as an `Arc` rather than the bare reference a one-shot call
/// might suggest: building the transient [`Context`] this wraps still needs
/// to hold a reference-counted handle on the dictionary for its lifetime,
/// and an `Arc` clone is a refcount bump rather than a copy of the dozens of
/// tANS tables a `Dictionary` owns.
pub fn compress_stateless(dict: &std::sync::Arc<Dictionary>, src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut ctx = Context::create(Some(dict.clone()), Config::stateless())?;
    ctx.compress(src, dst)
}

/// Decompress one packet with no cross-packet history, the inverse of
/// [`compress_stateless`]. The dictionary passed here must be the same one
/// (by `model_id`) the packet was compressed against.
pub fn decompress_stateless(dict: &std::sync::Arc<Dictionary>, src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let mut ctx = Context::create(Some(dict.clone()), Config::stateless())?;
    ctx.decompress(src, dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_dict() -> Arc<Dictionary> {
        let corpus: Vec<Vec<u8>> = (0..20)
            .map(|i| format!("packet number {i} carries a short status update").into_bytes())
            .collect();
        let refs: Vec<&[u8]> = corpus.iter().map(|p| p.as_slice()).collect();
        Arc::new(Dictionary::train(&refs, 9, false).unwrap())
    }

    #[test]
    fn compress_bound_covers_worst_case_passthrough() {
        assert_eq!(compress_bound(0), header::LEGACY_HEADER_SIZE);
        assert_eq!(compress_bound(100), header::LEGACY_HEADER_SIZE + 100);
    }

    #[test]
    fn stateless_round_trip_without_dictionary() {
        let dict = sample_dict();
        let src = b"packet number 3 carries a short status update";
        let mut packet = vec![0u8; compress_bound(src.len())];
        let len = compress_stateless(&dict, src, &mut packet).unwrap();
        let mut out = vec![0u8; src.len()];
        let out_len = decompress_stateless(&dict, &packet[..len], &mut out).unwrap();
        assert_eq!(&out[..out_len], src);
    }

    #[test]
    fn stateless_calls_do_not_share_history() {
        let dict = sample_dict();
        let a = b"packet number 1 carries a short status update";
        let b = b"packet number 2 carries a short status update";

        let mut packet_a = vec![0u8; compress_bound(a.len())];
        let len_a = compress_stateless(&dict, a, &mut packet_a).unwrap();
        let mut packet_b = vec![0u8; compress_bound(b.len())];
        let len_b = compress_stateless(&dict, b, &mut packet_b).unwrap();

        let mut out_a = vec![0u8; a.len()];
        let mut out_b = vec![0u8; b.len()];
        assert_eq!(decompress_stateless(&dict, &packet_a[..len_a], &mut out_a).unwrap(), a.len());
        assert_eq!(decompress_stateless(&dict, &packet_b[..len_b], &mut out_b).unwrap(), b.len());
        assert_eq!(&out_a[..], a);
        assert_eq!(&out_b[..], b);
    }
}
