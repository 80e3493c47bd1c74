//! Decompression state machine (spec.md §4.13): parse the header, bounds
//! check, dispatch on the algorithm byte, undo pre-filters in the reverse
//! of the order [`crate::pipeline`] applied them, and only then touch
//! cross-packet history. A failure at any step leaves the context exactly
//! as it was before the call — there is no partial/best-effort output.

use netc_core::error::{NetcError, Result};

use crate::config::HeaderForm;
use crate::context::Context;
use crate::delta;
use crate::dictionary::Dictionary;
use crate::entropy::{self, BigramTables, BucketBigramTables, BucketTables, FixedTable};
use crate::header::{self, Kind};
use crate::lz77;
use crate::lz77x;
use crate::rle;
use crate::tans::TansTable;

fn unigram_table<'a>(ctx: &'a Context, dict: &'a Dictionary, bucket: usize) -> &'a TansTable {
    match &ctx.adaptive {
        Some(adaptive) => &adaptive.tables()[bucket],
        None => dict.unigram_table(bucket),
    }
}

fn unigram_tables<'a>(ctx: &'a Context, dict: &'a Dictionary) -> &'a [TansTable; 16] {
    match &ctx.adaptive {
        Some(adaptive) => adaptive.tables(),
        None => dict.unigram_tables(),
    }
}

/// Decompress one packet from `src` into `dst` (spec.md §4.13). Returns
/// the number of original bytes written.
pub fn decompress(ctx: &mut Context, src: &[u8], dst: &mut [u8]) -> Result<usize> {
    let model_id = ctx.dictionary.as_deref().map(Dictionary::model_id).unwrap_or(0);
    let (header, hlen) = match ctx.cfg.header_form {
        HeaderForm::Legacy => header::read_legacy(src)?,
        HeaderForm::Compact => header::read_compact(src, model_id, ctx.sequence)?,
    };

    if header.flags & header::flags::DICT_ID != 0 {
        let dict = ctx.dictionary.as_deref().ok_or(NetcError::CtxNull)?;
        if dict.model_id() != header.model_id {
            return Err(NetcError::Version {
                expected: dict.model_id(),
                found: header.model_id,
            });
        }
    }

    let original_size = header.original_size as usize;
    if dst.len() < original_size {
        return Err(NetcError::buf_small(original_size, dst.len()));
    }
    let body = &src[hlen..];

    if !ctx.is_stateful() && header.flags & header::flags::DELTA != 0 {
        return Err(NetcError::corrupt(hlen, "delta-flagged packet in stateless mode"));
    }

    let (kind, bucket) = Kind::from_byte(header.algorithm)?;
    let written = match kind {
        Kind::Passthru => decode_passthru(header.flags, body, original_size, dst)?,
        Kind::Lz77x => lz77x::decompress(body, &ctx.ring, dst)?,
        Kind::Tans | Kind::TansPctx | Kind::Lzp | Kind::Tans10 => {
            decode_entropy(ctx, kind, header.flags, bucket as usize, body, original_size, dst)?
        }
        Kind::Rans => return Err(NetcError::Unsupported { variant: header.algorithm }),
    };

    if written != original_size {
        return Err(NetcError::corrupt(hlen, "decoded length does not match header"));
    }

    ctx.observe_packet(&dst[..written]);
    if let Some(stats) = &mut ctx.stats {
        stats.record_decompress();
    }

    Ok(written)
}

fn decode_passthru(flags: u8, body: &[u8], original_size: usize, dst: &mut [u8]) -> Result<usize> {
    if flags & header::flags::RLE != 0 {
        let &byte = body.first().ok_or(NetcError::corrupt(0, "truncated RLE payload"))?;
        Ok(rle::decompress(byte, original_size, dst))
    } else if flags & header::flags::LZ77 != 0 {
        lz77::decompress(body, dst)
    } else {
        if body.len() != original_size || dst.len() < body.len() {
            return Err(NetcError::corrupt(0, "passthrough payload length mismatch"));
        }
        dst[..body.len()].copy_from_slice(body);
        Ok(body.len())
    }
}

#[allow(clippy::too_many_arguments)]
fn decode_entropy(
    ctx: &Context,
    kind: Kind,
    flags: u8,
    bucket: usize,
    body: &[u8],
    original_size: usize,
    dst: &mut [u8],
) -> Result<usize> {
    let dict = ctx.dictionary.as_deref().ok_or(NetcError::CtxNull)?;

    let mut filtered = vec![0u8; original_size];
    if flags & header::flags::X2 != 0 {
        if body.len() < 8 {
            return Err(NetcError::corrupt(0, "truncated X2 state prefix"));
        }
        let state_a = u32::from_le_bytes(body[0..4].try_into().unwrap());
        let state_b = u32::from_le_bytes(body[4..8].try_into().unwrap());
        let stream = &body[8..];
        match kind {
            Kind::Tans if flags & header::flags::BIGRAM != 0 => {
                let classes = &dict.bigram_tables()[bucket];
                entropy::decode_x2(stream, state_a, state_b, original_size, &BigramTables(classes), &mut filtered)?;
            }
            Kind::Tans => {
                let table = unigram_table(ctx, dict, bucket);
                entropy::decode_x2(stream, state_a, state_b, original_size, &FixedTable(table), &mut filtered)?;
            }
            _ => return Err(NetcError::Unsupported { variant: kind.to_byte(bucket as u8) }),
        }
    } else {
        if body.len() < 4 {
            return Err(NetcError::corrupt(0, "truncated entropy state prefix"));
        }
        let state = u32::from_le_bytes(body[0..4].try_into().unwrap());
        let stream = &body[4..];

        match kind {
            Kind::Tans10 if flags & header::flags::BIGRAM != 0 => {
                let classes: [TansTable; 4] = std::array::from_fn(|c| dict.bigram_table(bucket, c as u8).rescaled(10));
                entropy::decode(stream, state, original_size, &BigramTables(&classes), &mut filtered)?;
            }
            Kind::Tans10 => {
                let table = unigram_table(ctx, dict, bucket).rescaled(10);
                entropy::decode(stream, state, original_size, &FixedTable(&table), &mut filtered)?;
            }
            Kind::Lzp if flags & header::flags::BIGRAM != 0 => {
                let classes = &dict.bigram_tables()[bucket];
                entropy::decode(stream, state, original_size, &BigramTables(classes), &mut filtered)?;
            }
            Kind::Lzp => {
                let table = unigram_table(ctx, dict, bucket);
                entropy::decode(stream, state, original_size, &FixedTable(table), &mut filtered)?;
            }
            Kind::Tans if flags & header::flags::BIGRAM != 0 => {
                let classes = &dict.bigram_tables()[bucket];
                entropy::decode(stream, state, original_size, &BigramTables(classes), &mut filtered)?;
            }
            Kind::Tans => {
                let table = unigram_table(ctx, dict, bucket);
                entropy::decode(stream, state, original_size, &FixedTable(table), &mut filtered)?;
            }
            Kind::TansPctx if flags & header::flags::BIGRAM != 0 => {
                entropy::decode(stream, state, original_size, &BucketBigramTables(dict.bigram_tables()), &mut filtered)?;
            }
            Kind::TansPctx => {
                let tables = unigram_tables(ctx, dict);
                entropy::decode(stream, state, original_size, &BucketTables(tables), &mut filtered)?;
            }
            Kind::Passthru | Kind::Lz77x | Kind::Rans => unreachable!("dispatched only for entropy kinds"),
        }
    }

    match kind {
        Kind::Lzp => {
            let lzp = dict.lzp().ok_or(NetcError::corrupt(0, "LZP algorithm with no LZP predictor in dictionary"))?;
            let seed = ctx.ring.read_at_distance(1).unwrap_or(0);
            crate::lzp::unapply(lzp, &filtered, seed, dst);
        }
        _ if flags & header::flags::DELTA != 0 => {
            let prev = ctx.prev_packet();
            if prev.len() != original_size {
                return Err(NetcError::corrupt(0, "delta packet length does not match previous packet"));
            }
            delta::decode(&filtered, prev, dst);
        }
        _ => {
            dst[..original_size].copy_from_slice(&filtered);
        }
    }

    Ok(original_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dictionary::Dictionary;
    use std::sync::Arc;

    fn sample_dict() -> Arc<Dictionary> {
        let corpus: Vec<Vec<u8>> = (0..20)
            .map(|i| format!("packet number {i} carries a short status update").into_bytes())
            .collect();
        let refs: Vec<&[u8]> = corpus.iter().map(|p| p.as_slice()).collect();
        Arc::new(Dictionary::train(&refs, 5, true).unwrap())
    }

    #[test]
    fn round_trips_without_dictionary() {
        let mut enc = Context::create(None, Config::default()).unwrap();
        let mut dec = Context::create(None, Config::default()).unwrap();
        let src = b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

        let mut packet = vec![0u8; src.len() + 16];
        let len = enc.compress(src, &mut packet).unwrap();

        let mut out = vec![0u8; src.len()];
        let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
        assert_eq!(&out[..out_len], src);
    }

    #[test]
    fn round_trips_with_dictionary_across_multiple_packets() {
        let dict = sample_dict();
        let mut enc = Context::create(Some(dict.clone()), Config::default().with_bigram(true)).unwrap();
        let mut dec = Context::create(Some(dict), Config::default().with_bigram(true)).unwrap();

        for i in 0..10 {
            let src = format!("packet number {i} carries a short status update").into_bytes();
            let mut packet = vec![0u8; src.len() + 32];
            let len = enc.compress(&src, &mut packet).unwrap();

            let mut out = vec![0u8; src.len()];
            let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
            assert_eq!(&out[..out_len], &src[..]);
        }
    }

    #[test]
    fn round_trips_with_delta_enabled_same_length_packets() {
        let dict = sample_dict();
        let cfg = Config::default().with_delta(true);
        let mut enc = Context::create(Some(dict.clone()), cfg.clone()).unwrap();
        let mut dec = Context::create(Some(dict), cfg).unwrap();

        let base = b"the status counter holds steady at zero!".to_vec();
        for tweak in 0..5u8 {
            let mut src = base.clone();
            src[0] = src[0].wrapping_add(tweak);
            let mut packet = vec![0u8; src.len() + 32];
            let len = enc.compress(&src, &mut packet).unwrap();
            let mut out = vec![0u8; src.len()];
            let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
            assert_eq!(&out[..out_len], &src[..]);
        }
    }

    #[test]
    fn rejects_model_id_mismatch() {
        let dict_a = Arc::new(Dictionary::train(&[b"abc" as &[u8]], 1, false).unwrap());
        let dict_b = Arc::new(Dictionary::train(&[b"abc" as &[u8]], 2, false).unwrap());
        let mut enc = Context::create(Some(dict_a), Config::default()).unwrap();
        let mut dec = Context::create(Some(dict_b), Config::default()).unwrap();

        let src = b"abcabcabcabcabcabcabc";
        let mut packet = vec![0u8; src.len() + 16];
        let len = enc.compress(src, &mut packet).unwrap();
        let mut out = vec![0u8; src.len()];
        let err = dec.decompress(&packet[..len], &mut out).unwrap_err();
        match err {
            NetcError::Version { .. } => {}
            other => panic!("expected Version mismatch, got {other:?}"),
        }
    }

    #[test]
    fn compact_header_round_trips() {
        let dict = sample_dict();
        let cfg = Config::default().with_compact_header(true);
        let mut enc = Context::create(Some(dict.clone()), cfg.clone()).unwrap();
        let mut dec = Context::create(Some(dict), cfg).unwrap();

        let src = b"packet number 3 carries a short status update";
        let mut packet = vec![0u8; src.len() + 32];
        let len = enc.compress(src, &mut packet).unwrap();
        let mut out = vec![0u8; src.len()];
        let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
        assert_eq!(&out[..out_len], &src[..]);
    }
}
