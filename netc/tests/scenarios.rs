//! Cross-module scenarios exercising dictionary training, context state,
//! the compression pipeline, and decompression together (spec.md §8's
//! synthetic game-state stream and cross-buffer reconnect scenarios).
//! Per-field unit scenarios (empty packet, random/all-zeros/alternating
//! payloads) live colocated with the modules they exercise.

use netc::{Config, Context, Dictionary};
use std::sync::Arc;

/// A small fixed-layout update: message type, sequence number, a slowly
/// incrementing tick counter, a stable health field, and a constant tail —
/// the shape of payload netc is built for.
fn game_state_packet(seq: u8, tick: u32) -> Vec<u8> {
    let mut p = vec![0u8; 40];
    p[0] = 0x02;
    p[1] = seq;
    p[2..6].copy_from_slice(&tick.to_le_bytes());
    p[6..10].copy_from_slice(&100i32.to_le_bytes());
    p[10..40].copy_from_slice(b"region=eu-west zone=stable.....");
    p
}

fn trained_dict(with_lzp: bool) -> Arc<Dictionary> {
    let corpus: Vec<Vec<u8>> = (0..64u32).map(|tick| game_state_packet((tick % 256) as u8, tick)).collect();
    let refs: Vec<&[u8]> = corpus.iter().map(|p| p.as_slice()).collect();
    Arc::new(Dictionary::train(&refs, 11, with_lzp).unwrap())
}

#[test]
fn game_state_stream_round_trips_with_shrinking_ratio() {
    let dict = trained_dict(true);
    let cfg = Config::default().with_bigram(true).with_delta(true).with_stats(true);
    let mut enc = Context::create(Some(dict.clone()), cfg.clone()).unwrap();
    let mut dec = Context::create(Some(dict), cfg).unwrap();

    let mut total_in = 0usize;
    let mut total_out = 0usize;

    for tick in 0..200u32 {
        let src = game_state_packet((tick % 256) as u8, 1000 + tick);
        let mut packet = vec![0u8; netc::compress_bound(src.len())];
        let len = enc.compress(&src, &mut packet).unwrap();

        let mut out = vec![0u8; src.len()];
        let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
        assert_eq!(&out[..out_len], &src[..], "packet {tick} did not round-trip");

        total_in += src.len();
        total_out += len;
    }

    assert!(
        total_out < total_in,
        "steady-state stream should compress overall: {total_out} >= {total_in}"
    );

    let snapshot = enc.stats().unwrap();
    assert_eq!(snapshot.packets_compressed, 200);
    assert!(snapshot.entropy_count > 0, "dictionary entropy path should win at least once");
}

#[test]
fn cross_buffer_reconnect_resets_history_without_losing_the_dictionary() {
    let dict = trained_dict(false);
    let cfg = Config::default().with_bigram(true);
    let mut enc = Context::create(Some(dict.clone()), cfg.clone()).unwrap();
    let mut dec = Context::create(Some(dict), cfg).unwrap();

    for tick in 0..10u32 {
        let src = game_state_packet(tick as u8, tick);
        let mut packet = vec![0u8; netc::compress_bound(src.len())];
        let len = enc.compress(&src, &mut packet).unwrap();
        let mut out = vec![0u8; src.len()];
        let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
        assert_eq!(&out[..out_len], &src[..]);
    }

    // Simulate a dropped connection: both sides discard cross-packet
    // history (ring buffer, previous packet, sequence) but keep the
    // dictionary, exactly like a process re-establishing a session without
    // reloading its training blob.
    enc.reset();
    dec.reset();

    for tick in 100..110u32 {
        let src = game_state_packet(tick as u8, tick);
        let mut packet = vec![0u8; netc::compress_bound(src.len())];
        let len = enc.compress(&src, &mut packet).unwrap();
        let mut out = vec![0u8; src.len()];
        let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
        assert_eq!(&out[..out_len], &src[..], "packet after reconnect did not round-trip");
    }
}

#[test]
fn adaptive_retraining_stays_in_sync_between_peers() {
    let dict = trained_dict(false);
    let cfg = Config::default().with_adaptive(true);
    let mut enc = Context::create(Some(dict.clone()), cfg.clone()).unwrap();
    let mut dec = Context::create(Some(dict), cfg).unwrap();

    // More than one rebuild interval's worth of packets, so at least one
    // retraining cycle fires identically on both sides.
    for tick in 0..300u32 {
        let src = game_state_packet((tick % 256) as u8, tick);
        let mut packet = vec![0u8; netc::compress_bound(src.len())];
        let len = enc.compress(&src, &mut packet).unwrap();
        let mut out = vec![0u8; src.len()];
        let out_len = dec.decompress(&packet[..len], &mut out).unwrap();
        assert_eq!(&out[..out_len], &src[..], "packet {tick} desynced after adaptive rebuild");
    }
}

#[test]
fn corrupted_packet_body_is_rejected_not_silently_miscorrected() {
    let dict = trained_dict(false);
    let mut enc = Context::create(Some(dict.clone()), Config::default()).unwrap();
    let mut dec = Context::create(Some(dict), Config::default()).unwrap();

    let src = game_state_packet(5, 42);
    let mut packet = vec![0u8; netc::compress_bound(src.len())];
    let len = enc.compress(&src, &mut packet).unwrap();

    // Flip a handful of bits well inside the compressed body (past the
    // header) and confirm decode either errors or, if it happens to still
    // parse, never claims success with the wrong bytes.
    for bit in [0usize, 3, 7] {
        let mut corrupted = packet[..len].to_vec();
        let idx = (corrupted.len() - 1).min(8 + bit);
        corrupted[idx] ^= 1 << (bit % 8);

        let mut out = vec![0u8; src.len()];
        if let Ok(out_len) = dec.decompress(&corrupted, &mut out) {
            assert_ne!(&out[..out_len], &src[..], "corruption silently produced the original bytes");
        }
    }
}
