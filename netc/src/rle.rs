//! Whole-packet run-length check, the same degenerate case
//! `oxiarc_zstd`'s block writer special-cases as an RLE block: when every
//! byte in the packet is identical, the payload collapses to that one
//! byte plus the already-known `original_size` from the header.

/// If every byte of `src` is the same, return it. `src` must be non-empty.
pub fn try_compress(src: &[u8]) -> Option<u8> {
    let &first = src.first()?;
    if src.iter().all(|&b| b == first) {
        Some(first)
    } else {
        None
    }
}

/// Expand `byte` to `len` copies into `out`, returning bytes written.
pub fn decompress(byte: u8, len: usize, out: &mut [u8]) -> usize {
    let len = len.min(out.len());
    out[..len].fill(byte);
    len
}
