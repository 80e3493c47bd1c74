//! Compression pipeline (spec.md §4.12): build several candidate
//! encodings of the same packet, keep the smallest. Every candidate is
//! cheap enough to try unconditionally except the two gated by
//! `Config::fast_compress`: within-packet LZ77X against the ring buffer,
//! and the bigram/X2/PCTX entropy variants, whose trial set narrows when
//! throughput matters more than ratio (mirrors `ZstdEncoder`'s
//! raw-vs-RLE-vs-compressed block trial-and-pick, generalised to a wider
//! candidate set).

use netc_core::ctx_bucket;
use netc_core::error::{NetcError, Result};

use crate::config::HeaderForm;
use crate::context::Context;
use crate::delta;
use crate::dictionary::Dictionary;
use crate::entropy::{self, BigramTables, BucketBigramTables, BucketTables, FixedTable, TableSelector};
use crate::header::{self, Header, Kind};
use crate::lz77;
use crate::lz77x;
use crate::rle;
use crate::tans::TansTable;

/// Packets at or below this length are cheap enough to also try at a
/// 10-bit table log (spec.md §4.5 "10-bit variant ... small compact
/// packets"): a smaller table means fewer renormalisation bits wasted on
/// padding when there is very little data to amortise them over.
const TANS10_MAX_LEN: usize = 512;

struct Candidate {
    kind: Kind,
    flags: u8,
    bucket: u8,
    body: Vec<u8>,
}

impl Candidate {
    fn wire_len(&self, cfg_form: HeaderForm, original_size: usize) -> Option<usize> {
        let header = Header {
            original_size: original_size as u16,
            compressed_size: self.body.len() as u16,
            flags: self.flags,
            algorithm: self.kind.to_byte(self.bucket),
            model_id: 0,
            context_seq: 0,
        };
        let mut scratch = [0u8; header::LEGACY_HEADER_SIZE];
        let hlen = match cfg_form {
            HeaderForm::Legacy => header::write_legacy(&header, &mut scratch).ok()?,
            HeaderForm::Compact => header::write_compact(&header, &mut scratch).ok()?,
        };
        Some(hlen + self.body.len())
    }
}

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

/// The single bucket a whole-packet fixed-table trial should use: the
/// bucket covering the packet's midpoint, a cheap stand-in for "the bucket
/// most representative of this payload" without scanning every byte.
fn representative_bucket(len: usize) -> usize {
    ctx_bucket(len / 2)
}

fn encode_single(pre: &[u8], selector: &dyn TableSelector, scratch: &mut Vec<u8>) -> Result<Vec<u8>> {
    scratch.clear();
    scratch.resize(pre.len() + 64, 0);
    let (len, state) = entropy::encode(pre, selector, scratch)?;
    let mut body = Vec::with_capacity(4 + len);
    body.extend_from_slice(&state.to_le_bytes());
    body.extend_from_slice(&scratch[..len]);
    Ok(body)
}

fn encode_dual(pre: &[u8], selector: &dyn TableSelector, scratch: &mut Vec<u8>) -> Result<Vec<u8>> {
    scratch.clear();
    scratch.resize(pre.len() + 64, 0);
    let (len, state_a, state_b) = entropy::encode_x2(pre, selector, scratch)?;
    let mut body = Vec::with_capacity(8 + len);
    body.extend_from_slice(&state_a.to_le_bytes());
    body.extend_from_slice(&state_b.to_le_bytes());
    body.extend_from_slice(&scratch[..len]);
    Ok(body)
}

/// Run every applicable trial and return the candidates that actually
/// produced output (a trial that errors, typically because it would not
/// shrink the packet, is silently dropped rather than propagated).
#[allow(clippy::too_many_lines)]
fn build_candidates(ctx: &Context, src: &[u8]) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut scratch: Vec<u8> = Vec::new();

    candidates.push(Candidate {
        kind: Kind::Passthru,
        flags: 0,
        bucket: 0,
        body: src.to_vec(),
    });

    if let Some(byte) = rle::try_compress(src) {
        candidates.push(Candidate {
            kind: Kind::Passthru,
            flags: header::flags::RLE,
            bucket: 0,
            body: vec![byte],
        });
    }

    let mut lz77_buf = vec![0u8; src.len().max(1)];
    if let Ok(len) = lz77::compress(src, &mut lz77_buf) {
        candidates.push(Candidate {
            kind: Kind::Passthru,
            flags: header::flags::LZ77,
            bucket: 0,
            body: lz77_buf[..len].to_vec(),
        });
    }

    if !ctx.cfg.fast_compress && lz77x::should_attempt(src.len(), ctx.is_stateful()) {
        let mut lz77x_buf = vec![0u8; src.len()];
        if let Ok(len) = lz77x::compress(src, &ctx.ring, &mut lz77x_buf) {
            if len < src.len() {
                candidates.push(Candidate {
                    kind: Kind::Lz77x,
                    flags: 0,
                    bucket: 0,
                    body: lz77x_buf[..len].to_vec(),
                });
            }
        }
    }

    let Some(dict) = ctx.dictionary.as_deref() else {
        return candidates;
    };
    if src.is_empty() {
        return candidates;
    }

    let prev = ctx.prev_packet();
    let delta_applies = ctx.cfg.delta && delta::applies(src.len(), prev.len());
    let lzp_predictor = dict.lzp();

    if delta_applies {
        let mut residual = vec![0u8; src.len()];
        delta::encode(src, prev, &mut residual);
        let bucket = representative_bucket(residual.len());
        let table = unigram_table(ctx, dict, bucket);

        if let Ok(body) = encode_single(&residual, &FixedTable(table), &mut scratch) {
            candidates.push(Candidate {
                kind: Kind::Tans,
                flags: header::flags::DICT_ID | header::flags::DELTA,
                bucket: bucket as u8,
                body,
            });
        }
        if ctx.cfg.bigram {
            let classes = &dict.bigram_tables()[bucket];
            if let Ok(body) = encode_single(&residual, &BigramTables(classes), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::Tans,
                    flags: header::flags::DICT_ID | header::flags::DELTA | header::flags::BIGRAM,
                    bucket: bucket as u8,
                    body,
                });
            }
        }
        if !ctx.cfg.fast_compress {
            if let Ok(body) = encode_dual(&residual, &FixedTable(table), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::Tans,
                    flags: header::flags::DICT_ID | header::flags::DELTA | header::flags::X2,
                    bucket: bucket as u8,
                    body,
                });
            }
        }
    } else if let Some(lzp) = lzp_predictor {
        let seed = ctx.ring.read_at_distance(1).unwrap_or(0);
        let mut filtered = vec![0u8; src.len()];
        crate::lzp::apply(lzp, src, seed, &mut filtered);
        let bucket = representative_bucket(filtered.len());
        let table = unigram_table(ctx, dict, bucket);

        if let Ok(body) = encode_single(&filtered, &FixedTable(table), &mut scratch) {
            candidates.push(Candidate {
                kind: Kind::Lzp,
                flags: header::flags::DICT_ID,
                bucket: bucket as u8,
                body,
            });
        }
        if ctx.cfg.bigram {
            let classes = &dict.bigram_tables()[bucket];
            if let Ok(body) = encode_single(&filtered, &BigramTables(classes), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::Lzp,
                    flags: header::flags::DICT_ID | header::flags::BIGRAM,
                    bucket: bucket as u8,
                    body,
                });
            }
        }
    } else {
        let bucket = representative_bucket(src.len());
        let table = unigram_table(ctx, dict, bucket);

        if let Ok(body) = encode_single(src, &FixedTable(table), &mut scratch) {
            candidates.push(Candidate {
                kind: Kind::Tans,
                flags: header::flags::DICT_ID,
                bucket: bucket as u8,
                body,
            });
        }
        if ctx.cfg.bigram {
            let classes = &dict.bigram_tables()[bucket];
            if let Ok(body) = encode_single(src, &BigramTables(classes), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::Tans,
                    flags: header::flags::DICT_ID | header::flags::BIGRAM,
                    bucket: bucket as u8,
                    body,
                });
            }
        }
        if !ctx.cfg.fast_compress {
            if let Ok(body) = encode_dual(src, &FixedTable(table), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::Tans,
                    flags: header::flags::DICT_ID | header::flags::X2,
                    bucket: bucket as u8,
                    body,
                });
            }
            let classes = &dict.bigram_tables()[bucket];
            if let Ok(body) = encode_dual(src, &BigramTables(classes), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::Tans,
                    flags: header::flags::DICT_ID | header::flags::X2 | header::flags::BIGRAM,
                    bucket: bucket as u8,
                    body,
                });
            }
        }

        let unigram_tables = unigram_tables(ctx, dict);
        let spans_multiple_buckets = ctx_bucket(0) != ctx_bucket(src.len() - 1);
        let mreg_flag = if spans_multiple_buckets { header::flags::MREG } else { 0 };

        if let Ok(body) = encode_single(src, &BucketTables(unigram_tables), &mut scratch) {
            candidates.push(Candidate {
                kind: Kind::TansPctx,
                flags: header::flags::DICT_ID | mreg_flag,
                bucket: 0,
                body,
            });
        }
        if ctx.cfg.bigram {
            if let Ok(body) = encode_single(src, &BucketBigramTables(dict.bigram_tables()), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::TansPctx,
                    flags: header::flags::DICT_ID | mreg_flag | header::flags::BIGRAM,
                    bucket: 0,
                    body,
                });
            }
        }

        if src.len() <= TANS10_MAX_LEN {
            let table10 = table.rescaled(10);
            if let Ok(body) = encode_single(src, &FixedTable(&table10), &mut scratch) {
                candidates.push(Candidate {
                    kind: Kind::Tans10,
                    flags: header::flags::DICT_ID,
                    bucket: bucket as u8,
                    body,
                });
            }
            if ctx.cfg.bigram {
                let classes10: [TansTable; 4] =
                    std::array::from_fn(|c| dict.bigram_table(bucket, c as u8).rescaled(10));
                if let Ok(body) = encode_single(src, &BigramTables(&classes10), &mut scratch) {
                    candidates.push(Candidate {
                        kind: Kind::Tans10,
                        flags: header::flags::DICT_ID | header::flags::BIGRAM,
                        bucket: bucket as u8,
                        body,
                    });
                }
            }
        }
    }

    candidates
}

/// Compress `src` into `dst` (spec.md §4.12). Picks the smallest of every
/// applicable candidate, falling back to raw passthrough when nothing
/// beats it. Only updates cross-packet history on success.
pub fn compress(ctx: &mut Context, src: &[u8], dst: &mut [u8]) -> Result<usize> {
    if src.len() > netc_core::NETC_MAX_PACKET_SIZE {
        return Err(NetcError::too_big(src.len()));
    }

    let candidates = build_candidates(ctx, src);
    let header_form = ctx.cfg.header_form;
    let winner = candidates
        .iter()
        .filter_map(|c| c.wire_len(header_form, src.len()).map(|len| (len, c)))
        .min_by_key(|(len, _)| *len)
        .map(|(_, c)| c)
        .ok_or_else(|| NetcError::corrupt(0, "no representable candidate (this is a pipeline bug)"))?;

    let model_id = ctx.dictionary.as_deref().map(Dictionary::model_id).unwrap_or(0);
    let header = Header {
        original_size: src.len() as u16,
        compressed_size: winner.body.len() as u16,
        flags: winner.flags,
        algorithm: winner.kind.to_byte(winner.bucket),
        model_id,
        context_seq: ctx.sequence,
    };

    let hlen = match header_form {
        HeaderForm::Legacy => header::write_legacy(&header, dst)?,
        HeaderForm::Compact => header::write_compact(&header, dst)?,
    };
    let total = hlen + winner.body.len();
    if dst.len() < total {
        return Err(NetcError::buf_small(total, dst.len()));
    }
    dst[hlen..total].copy_from_slice(&winner.body);

    ctx.observe_packet(src);
    if let Some(stats) = &mut ctx.stats {
        stats.record_compress(src.len(), total);
        record_candidate_kind(stats, winner);
    }

    Ok(total)
}

fn record_candidate_kind(stats: &mut crate::stats::Stats, winner: &Candidate) {
    match winner.kind {
        Kind::Passthru if winner.flags & header::flags::LZ77 != 0 => stats.record_lz77(),
        Kind::Passthru if winner.flags & header::flags::RLE != 0 => stats.record_rle(),
        Kind::Passthru => stats.record_passthrough(),
        Kind::Lz77x => stats.record_lz77x(),
        Kind::Lzp => {
            stats.record_lzp();
            stats.record_entropy();
        }
        Kind::Tans | Kind::TansPctx | Kind::Tans10 | Kind::Rans => {
            if winner.flags & header::flags::DELTA != 0 {
                stats.record_delta();
            }
            stats.record_entropy();
        }
    }
}
