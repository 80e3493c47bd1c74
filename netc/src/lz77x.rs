//! Cross-packet LZ77X (spec.md §4.9): extends the within-packet LZ77
//! token stream with a long back-reference into the context's ring
//! buffer, so repetition against *previous* packets (not just within the
//! current one) can be captured.

use netc_core::error::{NetcError, Result};
use netc_core::ringbuffer::RingBuffer;

const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 66;
const HASH_TABLE_SIZE: usize = 4096;
const MIN_PACKET_SIZE: usize = 64;

#[inline]
fn hash3(data: &[u8], pos: usize) -> usize {
    let a = data[pos] as u32;
    let b = data[pos + 1] as u32;
    let c = data[pos + 2] as u32;
    let h = (a ^ (b << 8) ^ (c << 16)).wrapping_mul(0x01000193);
    (h as usize) & (HASH_TABLE_SIZE - 1)
}

/// Build a 4096-entry hash table over `haystack`, mapping a 3-byte hash
/// to the most recent position with that hash. Reseeded fresh on every
/// call rather than maintained incrementally (spec.md §4.9).
fn build_hash_table(haystack: &[u8]) -> Vec<i64> {
    let mut table = vec![-1i64; HASH_TABLE_SIZE];
    if haystack.len() < MIN_MATCH {
        return table;
    }
    for pos in 0..=haystack.len() - MIN_MATCH {
        let h = hash3(haystack, pos);
        table[h] = pos as i64;
    }
    table
}

fn match_len(a: &[u8], a_pos: usize, b: &[u8], b_pos: usize, max: usize) -> usize {
    let mut len = 0;
    while len < max && a_pos + len < a.len() && b_pos + len < b.len() && a[a_pos + len] == b[b_pos + len] {
        len += 1;
    }
    len
}

/// Whether LZ77X should even be attempted for this packet (spec.md §4.12
/// step 5 gating: stateful, long enough, and one of the heuristic
/// triggers already decided by the pipeline).
pub fn should_attempt(src_len: usize, stateful: bool) -> bool {
    stateful && src_len >= MIN_PACKET_SIZE
}

/// Encode `src` as an LZ77X token stream against `ring` (the context's
/// cross-packet history) into `out`. Token layout:
/// - literal run: `0lllllll` (spec.md §4.8, shared with plain LZ77)
/// - short back-ref: `10lllllll oooooooo` (within-packet)
/// - long back-ref: `11llllll lo hi` (into the ring buffer)
///
/// Returns bytes written, or an error if compression would not shrink the
/// packet.
pub fn compress(src: &[u8], ring: &RingBuffer, out: &mut [u8]) -> Result<usize> {
    if src.is_empty() {
        return Ok(0);
    }
    let tail_len = ring.len().min(65536);
    let tail = ring.tail(tail_len);
    let ring_hash = build_hash_table(&tail);
    let mut local_hash = vec![-1i64; HASH_TABLE_SIZE];

    let mut out_pos = 0usize;
    let mut literal_start = 0usize;
    let mut pos = 0usize;

    while pos < src.len() {
        let mut within_len = 0usize;
        let mut within_dist = 0usize;
        let mut ring_len = 0usize;
        let mut ring_dist = 0usize;

        if pos + MIN_MATCH <= src.len() {
            let h = hash3(src, pos);
            let candidate = local_hash[h];
            if candidate >= 0 {
                let candidate = candidate as usize;
                let max_len = (src.len() - pos).min(255);
                let len = match_len(src, candidate, src, pos, max_len);
                if len >= MIN_MATCH && pos > candidate {
                    within_len = len;
                    within_dist = pos - candidate;
                }
            }

            if !tail.is_empty() {
                let rh = ring_hash[h];
                if rh >= 0 {
                    let rh = rh as usize;
                    let max_len = MAX_MATCH.min(src.len() - pos);
                    let len = match_len(&tail, rh, src, pos, max_len);
                    if len >= MIN_MATCH {
                        ring_len = len;
                        ring_dist = tail.len() - rh;
                    }
                }
            }
        }

        // Within-packet wins ties (shorter token, spec.md §4.9).
        if ring_len > within_len && ring_len >= MIN_MATCH {
            flush_literals(out, &mut out_pos, src, literal_start, pos)?;
            let token = 0xC0 | ((ring_len - 3) as u8 & 0x3F);
            push(out, &mut out_pos, token)?;
            let off = ring_dist - 1;
            push(out, &mut out_pos, (off & 0xFF) as u8)?;
            push(out, &mut out_pos, ((off >> 8) & 0xFF) as u8)?;

            let end = pos + ring_len;
            while pos < end {
                if pos + MIN_MATCH <= src.len() {
                    let h = hash3(src, pos);
                    local_hash[h] = pos as i64;
                }
                pos += 1;
            }
            literal_start = pos;
        } else if within_len >= MIN_MATCH {
            flush_literals(out, &mut out_pos, src, literal_start, pos)?;
            let token = 0x80 | ((within_len - 3) as u8 & 0x3F);
            push(out, &mut out_pos, token)?;
            push(out, &mut out_pos, (within_dist - 1) as u8)?;

            let end = pos + within_len;
            while pos < end {
                if pos + MIN_MATCH <= src.len() {
                    let h = hash3(src, pos);
                    local_hash[h] = pos as i64;
                }
                pos += 1;
            }
            literal_start = pos;
        } else {
            if pos + MIN_MATCH <= src.len() {
                let h = hash3(src, pos);
                local_hash[h] = pos as i64;
            }
            pos += 1;
        }

        if out_pos >= src.len() {
            return Err(NetcError::corrupt(out_pos, "lz77x token stream did not shrink the input"));
        }
    }
    flush_literals(out, &mut out_pos, src, literal_start, src.len())?;
    if out_pos >= src.len() {
        return Err(NetcError::corrupt(out_pos, "lz77x token stream did not shrink the input"));
    }
    Ok(out_pos)
}

fn push(out: &mut [u8], out_pos: &mut usize, b: u8) -> Result<()> {
    if *out_pos >= out.len() {
        return Err(NetcError::buf_small(*out_pos + 1, out.len()));
    }
    out[*out_pos] = b;
    *out_pos += 1;
    Ok(())
}

fn flush_literals(out: &mut [u8], out_pos: &mut usize, src: &[u8], start: usize, end: usize) -> Result<()> {
    let mut i = start;
    while i < end {
        let run = (end - i).min(128);
        push(out, out_pos, (run - 1) as u8)?;
        for &b in &src[i..i + run] {
            push(out, out_pos, b)?;
        }
        i += run;
    }
    Ok(())
}

/// Decode a token stream produced by [`compress`], using `ring` as the
/// long back-reference history. Never touches the ring buffer's own
/// state; the caller appends the reconstructed packet afterward.
pub fn decompress(tokens: &[u8], ring: &RingBuffer, out: &mut [u8]) -> Result<usize> {
    let mut in_pos = 0usize;
    let mut out_pos = 0usize;

    while in_pos < tokens.len() {
        let tok = tokens[in_pos];
        in_pos += 1;
        if tok & 0x80 == 0 {
            let run = (tok & 0x7F) as usize + 1;
            if in_pos + run > tokens.len() {
                return Err(NetcError::corrupt(in_pos, "literal run overruns token stream"));
            }
            if out_pos + run > out.len() {
                return Err(NetcError::buf_small(out_pos + run, out.len()));
            }
            out[out_pos..out_pos + run].copy_from_slice(&tokens[in_pos..in_pos + run]);
            in_pos += run;
            out_pos += run;
        } else if tok & 0x40 == 0 {
            // Short (within-packet) back-reference.
            if in_pos >= tokens.len() {
                return Err(NetcError::corrupt(in_pos, "truncated back-reference token"));
            }
            let length = (tok & 0x3F) as usize + 3;
            let dist = tokens[in_pos] as usize + 1;
            in_pos += 1;
            if dist > out_pos {
                return Err(NetcError::corrupt(in_pos, "back-reference distance out of range"));
            }
            let mut src_i = out_pos - dist;
            if out_pos + length > out.len() {
                return Err(NetcError::buf_small(out_pos + length, out.len()));
            }
            for _ in 0..length {
                out[out_pos] = out[src_i];
                out_pos += 1;
                src_i += 1;
            }
        } else {
            // Long (ring-buffer) back-reference. Read-only against `ring`:
            // the context appends this packet's bytes to ring history once,
            // after a full successful decode, so this must not mutate it
            // (ring.copy_from_history's incidental write-as-you-read would
            // otherwise insert these bytes into history twice). Overlap
            // (distance < length) is instead resolved against `out` itself,
            // the same technique the short back-reference branch above uses.
            if in_pos + 2 > tokens.len() {
                return Err(NetcError::corrupt(in_pos, "truncated ring back-reference token"));
            }
            let length = (tok & 0x3F) as usize + 3;
            let offset = tokens[in_pos] as usize | ((tokens[in_pos + 1] as usize) << 8);
            in_pos += 2;
            let distance = offset + 1;
            if out_pos + length > out.len() {
                return Err(NetcError::buf_small(out_pos + length, out.len()));
            }
            for i in 0..length {
                let byte = if i < distance {
                    ring.read_at_distance(distance - i)?
                } else {
                    out[out_pos + i - distance]
                };
                out[out_pos + i] = byte;
            }
            out_pos += length;
        }
    }
    Ok(out_pos)
}
