//! Live dictionary retraining (spec.md §4.15): opt-in, stateful-only.
//! Every packet's raw bytes feed per-bucket histograms; every
//! [`REBUILD_INTERVAL`] packets those histograms are normalised and
//! rebuilt into fresh tANS tables with the exact same builder the
//! offline dictionary trainer uses ([`crate::freq::FreqTable::normalize`]
//! + [`crate::tans::TansTable::build`]), so an encoder and a decoder that
//! have observed the same packet sequence rebuild bit-identical tables
//! without exchanging anything.

use netc_core::ctx_bucket;

use crate::dictionary::{Dictionary, DICT_TABLE_LOG};
use crate::freq::FreqTable;
use crate::tans::TansTable;

/// Packets between rebuilds.
pub const REBUILD_INTERVAL: u32 = 128;

/// Mutable per-context retraining state. Seeded from a dictionary's
/// unigram tables and only ever used when `Config::adaptive` is set.
pub struct AdaptiveState {
    counts: Box<[[u64; 256]; 16]>,
    tables: Box<[TansTable; 16]>,
    since_rebuild: u32,
}

impl AdaptiveState {
    /// Seed from `dict`'s unigram tables; the first [`REBUILD_INTERVAL`]
    /// packets are coded against the dictionary's own tables, unmodified.
    pub fn new(dict: &Dictionary) -> Self {
        Self {
            counts: Box::new([[0u64; 256]; 16]),
            tables: Box::new(dict.unigram_tables().clone()),
            since_rebuild: 0,
        }
    }

    /// Currently active per-bucket tables (dictionary baseline until the
    /// first rebuild, then whatever was last rebuilt).
    pub fn tables(&self) -> &[TansTable; 16] {
        &self.tables
    }

    /// Fold one packet's raw bytes into the running histograms and
    /// rebuild if [`REBUILD_INTERVAL`] packets have been observed since
    /// the last one. Must be called identically (same bytes, same order)
    /// by both sides of a connection for the rebuilt tables to agree.
    /// Returns whether this call triggered a rebuild, so a caller tracking
    /// [`crate::stats::Stats`] can count it.
    pub fn observe(&mut self, packet: &[u8]) -> bool {
        for (offset, &byte) in packet.iter().enumerate() {
            self.counts[ctx_bucket(offset)][byte as usize] += 1;
        }
        self.since_rebuild += 1;
        if self.since_rebuild >= REBUILD_INTERVAL {
            self.rebuild();
            self.since_rebuild = 0;
            true
        } else {
            false
        }
    }

    fn rebuild(&mut self) {
        for bucket in 0..16 {
            let freq = FreqTable::normalize(&self.counts[bucket], DICT_TABLE_LOG);
            self.tables[bucket] = TansTable::build(&freq);
            self.counts[bucket] = [0u64; 256];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dict() -> Dictionary {
        let packets: Vec<Vec<u8>> = vec![b"the quick brown fox".to_vec(), b"jumps over lazy dogs".to_vec()];
        let refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
        Dictionary::train(&refs, 1, false).unwrap()
    }

    #[test]
    fn rebuilds_after_interval_and_resets_counter() {
        let dict = sample_dict();
        let mut state = AdaptiveState::new(&dict);
        let packet = vec![b'x'; 32];
        for _ in 0..REBUILD_INTERVAL {
            state.observe(&packet);
        }
        // After exactly one interval, bucket 0's table should now favour 'x'
        // heavily over the dictionary baseline.
        let table = &state.tables()[0];
        assert!(table.symbol_frequency(b'x') > table.symbol_frequency(b'y'));
    }

    #[test]
    fn does_not_rebuild_before_interval() {
        let dict = sample_dict();
        let mut state = AdaptiveState::new(&dict);
        state.observe(&vec![b'x'; 32]);
        assert_eq!(state.since_rebuild, 1);
    }
}
