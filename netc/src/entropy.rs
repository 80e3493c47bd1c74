//! Entropy coder variants (spec.md §4.5): Single, X2, PCTX, Bigram, 10-bit.
//!
//! All five share the same table format ([`TansTable`]) and bit-packing
//! discipline; they differ only in how many interleaved streams run and
//! how the table is selected per byte. tANS state transitions must be
//! undone in the reverse of the order they were applied, so encoding walks
//! the packet back-to-front (last byte to first) writing renormalisation
//! bits into a forward [`BitWriter`], while decoding walks it forward
//! (first byte to last) with a [`ReverseBitReader`], mirroring
//! `oxiarc_zstd::fse::FseBitReader`'s "scan the tail for the sentinel,
//! then read backward" discipline. The payoff: decoding a byte always has
//! the true preceding byte already in hand, so bigram-conditioned table
//! selection can use `dst[offset - 1]` rather than a later byte.

use netc_core::bitstream::{BitWriter, ReverseBitReader};
use netc_core::error::{NetcError, Result};
use netc_core::ctx_bucket;

use crate::config::bigram_class;
use crate::tans::TansTable;

/// A table lookup strategy a caller hands to [`encode`]/[`decode`]: given
/// the byte offset within the packet and its bigram context byte, return
/// the table to use for that byte.
///
/// The context byte is the true preceding byte (`src[offset - 1]`/
/// `dst[offset - 1]`, or 0 at offset 0) per spec.md §4.5's
/// `bigram_class_map[prev_byte]` — the same convention
/// [`crate::dictionary::Trainer::observe`] trains bigram sub-tables
/// against. See the module docs for why both encode and decode can
/// always supply it.
pub trait TableSelector {
    /// Table to use when coding the byte at `offset`, given `ctx_byte` —
    /// the true preceding byte (0 at offset 0).
    fn select(&self, offset: usize, ctx_byte: u8) -> &TansTable;
}

/// Always the same table (the `Single` variant).
pub struct FixedTable<'a>(pub &'a TansTable);

impl TableSelector for FixedTable<'_> {
    fn select(&self, _offset: usize, _ctx_byte: u8) -> &TansTable {
        self.0
    }
}

/// One table per position bucket (the `PCTX` variant).
pub struct BucketTables<'a>(pub &'a [TansTable; 16]);

impl TableSelector for BucketTables<'_> {
    fn select(&self, offset: usize, _ctx_byte: u8) -> &TansTable {
        &self.0[ctx_bucket(offset)]
    }
}

/// One table per bigram class of the context byte (the `Bigram` variant,
/// single-bucket form).
pub struct BigramTables<'a>(pub &'a [TansTable; 4]);

impl TableSelector for BigramTables<'_> {
    fn select(&self, _offset: usize, ctx_byte: u8) -> &TansTable {
        &self.0[bigram_class(ctx_byte) as usize]
    }
}

/// One table per `(bucket, bigram class)` pair (combined PCTX+Bigram).
pub struct BucketBigramTables<'a>(pub &'a [[TansTable; 4]; 16]);

impl TableSelector for BucketBigramTables<'_> {
    fn select(&self, offset: usize, ctx_byte: u8) -> &TansTable {
        &self.0[ctx_bucket(offset)][bigram_class(ctx_byte) as usize]
    }
}

/// Encode `src` against `selector` into `out`, single interleaved stream.
/// Returns `(bytes_written, final_state)`; `final_state` must be stored in
/// the packet header/algorithm area for the decoder to seed from.
pub fn encode(src: &[u8], selector: &dyn TableSelector, out: &mut [u8]) -> Result<(usize, u32)> {
    if src.is_empty() {
        return Ok((0, 0));
    }
    let mut writer = BitWriter::new(out);
    let mut state = selector.select(src.len() - 1, 0).initial_state();
    for offset in (0..src.len()).rev() {
        let byte = src[offset];
        let ctx_byte = if offset > 0 { src[offset - 1] } else { 0 };
        let table = selector.select(offset, ctx_byte);
        let mut io_err = None;
        state = table.encode_symbol(state, byte, |value, nb_bits| {
            if io_err.is_none() {
                if let Err(e) = writer.write_bits(value, nb_bits) {
                    io_err = Some(e);
                }
            }
        });
        if let Some(e) = io_err {
            return Err(e);
        }
    }
    // Terminating marker bit: guarantees the final byte is never all zero,
    // which is what `ReverseBitReader` scans for to find the payload/padding
    // boundary (a packet whose last renormalisation bit happens to be 0
    // would otherwise be indistinguishable from missing/corrupt data).
    writer.write_bits(1, 1)?;
    let len = writer.flush()?;
    Ok((len, state))
}

/// Decode `len` bytes from `src` (a tANS bitstream produced by [`encode`]
/// with `final_state`), writing the original bytes in forward order into
/// `dst`. `selector` must resolve to the identical tables used to encode.
pub fn decode(src: &[u8], final_state: u32, len: usize, selector: &dyn TableSelector, dst: &mut [u8]) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    if dst.len() < len {
        return Err(NetcError::buf_small(len, dst.len()));
    }
    let mut reader = ReverseBitReader::new(src)?;
    let mut state = final_state;

    // Encode walks the packet back-to-front, so its last-coded byte is the
    // one at offset 0 — the first symbol the reverse reader recovers here.
    // Decode then proceeds forward through increasing offsets, so by the
    // time a table is needed for `offset`, `dst[offset - 1]` has already
    // been written (or `offset` is 0, the 0 sentinel).
    for offset in 0..len {
        let ctx_byte = if offset > 0 { dst[offset - 1] } else { 0 };
        let table = selector.select(offset, ctx_byte);
        let mut io_err = None;
        let mut symbol = 0u8;
        let new_state = {
            let (ns, sym) = table.decode_symbol(state, |nb_bits| match reader.read_bits(nb_bits) {
                Ok(v) => v,
                Err(e) => {
                    io_err = Some(e);
                    0
                }
            });
            symbol = sym;
            ns
        };
        if let Some(e) = io_err {
            return Err(e);
        }
        dst[offset] = symbol;
        state = new_state;
    }
    Ok(())
}

/// Dual-interleaved `X2`: even offsets go to stream A, odd to stream B,
/// both states renormalising into the same forward bitstream, independent
/// of each other (spec.md §4.5 "exposing ILP"). Both streams share
/// `selector`, called with the true packet offset so PCTX/Bigram
/// selection still reflects position, not stream index.
pub fn encode_x2(src: &[u8], selector: &dyn TableSelector, out: &mut [u8]) -> Result<(usize, u32, u32)> {
    if src.is_empty() {
        return Ok((0, 0, 0));
    }
    let mut writer = BitWriter::new(out);
    let mut state_a = selector.select(src.len() - 1, 0).initial_state();
    let mut state_b = state_a;

    for offset in (0..src.len()).rev() {
        let byte = src[offset];
        let ctx_byte = if offset > 0 { src[offset - 1] } else { 0 };
        let table = selector.select(offset, ctx_byte);
        let mut io_err = None;
        if offset % 2 == 0 {
            state_a = table.encode_symbol(state_a, byte, |value, nb_bits| {
                if io_err.is_none() {
                    if let Err(e) = writer.write_bits(value, nb_bits) {
                        io_err = Some(e);
                    }
                }
            });
        } else {
            state_b = table.encode_symbol(state_b, byte, |value, nb_bits| {
                if io_err.is_none() {
                    if let Err(e) = writer.write_bits(value, nb_bits) {
                        io_err = Some(e);
                    }
                }
            });
        }
        if let Some(e) = io_err {
            return Err(e);
        }
    }
    // See `encode`'s terminating marker bit comment.
    writer.write_bits(1, 1)?;
    let len = writer.flush()?;
    Ok((len, state_a, state_b))
}

/// Decoder for [`encode_x2`]. `final_state_a`/`final_state_b` are the
/// states returned by the matching encode call.
pub fn decode_x2(
    src: &[u8],
    final_state_a: u32,
    final_state_b: u32,
    len: usize,
    selector: &dyn TableSelector,
    dst: &mut [u8],
) -> Result<()> {
    if len == 0 {
        return Ok(());
    }
    if dst.len() < len {
        return Err(NetcError::buf_small(len, dst.len()));
    }
    let mut reader = ReverseBitReader::new(src)?;
    let mut state_a = final_state_a;
    let mut state_b = final_state_b;

    for offset in 0..len {
        let ctx_byte = if offset > 0 { dst[offset - 1] } else { 0 };
        let table = selector.select(offset, ctx_byte);
        let mut io_err = None;
        let mut symbol = 0u8;
        let on_stream_a = offset % 2 == 0;
        let state = if on_stream_a { state_a } else { state_b };
        let new_state = {
            let (ns, sym) = table.decode_symbol(state, |nb_bits| match reader.read_bits(nb_bits) {
                Ok(v) => v,
                Err(e) => {
                    io_err = Some(e);
                    0
                }
            });
            symbol = sym;
            ns
        };
        if let Some(e) = io_err {
            return Err(e);
        }
        dst[offset] = symbol;
        if on_stream_a {
            state_a = new_state;
        } else {
            state_b = new_state;
        }
    }
    Ok(())
}
