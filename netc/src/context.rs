//! Per-connection mutable state (spec.md §4.11): everything a sequence of
//! `compress`/`decompress` calls needs to carry forward — cross-packet
//! history, the previous packet (for delta), a scratch arena the pipeline
//! borrows instead of allocating per call, the sequence counter, and the
//! optional adaptive/stats add-ons.

use std::sync::Arc;

use netc_core::error::{NetcError, Result};
use netc_core::ringbuffer::RingBuffer;
use netc_core::NETC_MAX_PACKET_SIZE;

use crate::adaptive::AdaptiveState;
use crate::config::{Config, Mode, SimdLevel};
use crate::dictionary::Dictionary;
use crate::stats::{Stats, StatsSnapshot};
use crate::{decompress, pipeline};

/// Per-connection state shared by every `compress`/`decompress` call that
/// should see the same cross-packet history. Not `Sync`: one context per
/// connection, used from one thread (or externally synchronised), the
/// same discipline `ZstdEncoder`/`ZstdDecoder` use for their frame state.
pub struct Context {
    pub(crate) dictionary: Option<Arc<Dictionary>>,
    pub(crate) cfg: Config,
    pub(crate) ring: RingBuffer,
    pub(crate) prev_packet: Vec<u8>,
    pub(crate) prev_len: usize,
    pub(crate) arena: Vec<u8>,
    pub(crate) sequence: u8,
    pub(crate) simd: SimdLevel,
    pub(crate) adaptive: Option<AdaptiveState>,
    pub(crate) stats: Option<Stats>,
}

impl Context {
    /// Create a context. `dict` is optional (entropy coding is unavailable
    /// without one; passthrough/LZ77/RLE still work). Fails if `cfg` is
    /// internally inconsistent, or if `cfg.adaptive` is set with no
    /// dictionary to seed retraining from.
    pub fn create(dict: Option<Arc<Dictionary>>, cfg: Config) -> Result<Self> {
        if !cfg.is_valid() {
            return Err(NetcError::InvalidArg {
                message: "adaptive retraining requires Mode::Stateful",
            });
        }
        if cfg.adaptive && dict.is_none() {
            return Err(NetcError::InvalidArg {
                message: "adaptive retraining requires a dictionary to seed from",
            });
        }

        let adaptive = if cfg.adaptive {
            Some(AdaptiveState::new(dict.as_ref().expect("checked above")))
        } else {
            None
        };
        let stats = cfg.stats.then(Stats::default);

        Ok(Self {
            dictionary: dict,
            ring: RingBuffer::new(cfg.ring_buffer_size),
            prev_packet: vec![0u8; NETC_MAX_PACKET_SIZE],
            prev_len: 0,
            arena: vec![0u8; cfg.arena_size],
            sequence: 0,
            simd: cfg.simd_level.resolve(),
            adaptive,
            stats,
            cfg,
        })
    }

    /// Drop all cross-packet history (ring buffer, previous packet,
    /// sequence counter, adaptive tables) without dropping the dictionary
    /// or configuration. A fresh context and a reset one behave identically.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.prev_len = 0;
        self.sequence = 0;
        if let Some(adaptive) = &mut self.adaptive {
            *adaptive = AdaptiveState::new(self.dictionary.as_ref().expect("adaptive requires a dictionary"));
        }
        self.stats = self.cfg.stats.then(Stats::default);
    }

    /// A snapshot of this context's counters, or `None` if `Config::stats`
    /// was not enabled at creation.
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.stats.as_ref().map(Stats::snapshot)
    }

    /// Whether this context was created with `Mode::Stateful`.
    pub fn is_stateful(&self) -> bool {
        self.cfg.mode == Mode::Stateful
    }

    /// SIMD dispatch level resolved at creation time.
    pub fn simd_level(&self) -> SimdLevel {
        self.simd
    }

    /// Compress `src` into `dst`, returning the number of bytes written.
    pub fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        pipeline::compress(self, src, dst)
    }

    /// Decompress `src` into `dst`, returning the number of original bytes
    /// written.
    pub fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        decompress::decompress(self, src, dst)
    }

    /// Record a packet's raw bytes into cross-packet history (ring buffer,
    /// previous-packet buffer, adaptive histograms). Only called on success,
    /// and only in stateful mode, per spec.md §9's "on error, neither side
    /// calls this" coupling rule.
    pub(crate) fn observe_packet(&mut self, bytes: &[u8]) {
        if !self.is_stateful() {
            return;
        }
        self.ring.append_packet(bytes);
        self.prev_packet[..bytes.len()].copy_from_slice(bytes);
        self.prev_len = bytes.len();
        self.sequence = self.sequence.wrapping_add(1);
        if let Some(adaptive) = &mut self.adaptive {
            let rebuilt = adaptive.observe(bytes);
            if rebuilt {
                if let Some(stats) = &mut self.stats {
                    stats.record_adaptive_rebuild();
                }
            }
        }
    }

    pub(crate) fn prev_packet(&self) -> &[u8] {
        &self.prev_packet[..self.prev_len]
    }
}
