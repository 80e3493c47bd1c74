//! Opt-in per-context counters (spec.md §7), surfaced through
//! [`crate::context::Context::stats`]. Zero-cost when disabled: a context
//! created with `Config { stats: false, .. }` never allocates a [`Stats`].

/// A point-in-time copy of a context's counters. Cheap to clone; returned
/// by value rather than borrowed, since the context keeps mutating the
/// live counters concurrently with any snapshot a caller might be holding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Packets handed to `compress`.
    pub packets_compressed: u64,
    /// Packets handed to `decompress`.
    pub packets_decompressed: u64,
    /// Sum of `src.len()` across all `compress` calls.
    pub bytes_in: u64,
    /// Sum of bytes written across all `compress` calls.
    pub bytes_out: u64,
    /// Packets whose winning candidate was raw passthrough (no flags).
    pub passthrough_count: u64,
    /// Packets whose winning candidate used a tANS entropy stream.
    pub entropy_count: u64,
    /// Packets whose winning candidate applied the delta pre-filter.
    pub delta_count: u64,
    /// Packets whose winning candidate applied the LZP-XOR pre-filter.
    pub lzp_count: u64,
    /// Packets whose winning candidate was within-packet LZ77.
    pub lz77_count: u64,
    /// Packets whose winning candidate was cross-packet LZ77X.
    pub lz77x_count: u64,
    /// Packets whose winning candidate was the whole-packet RLE case.
    pub rle_count: u64,
    /// Completed adaptive table rebuilds.
    pub adaptive_rebuilds: u64,
    /// Adaptive rebuilds that were skipped or discarded because the
    /// resulting table failed to validate. The scalar rebuild path
    /// (`FreqTable::normalize` + `TansTable::build`) cannot itself fail,
    /// so this stays at zero in this build; kept for parity with a
    /// future backend that validates rebuilt tables before swapping them in.
    pub adaptive_rebuild_failures: u64,
}

/// Live, mutable counters. Never exposed directly; callers only ever see
/// a [`StatsSnapshot`] taken from one.
#[derive(Debug, Clone, Default)]
pub(crate) struct Stats {
    snapshot: StatsSnapshot,
}

impl Stats {
    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot
    }

    pub fn record_compress(&mut self, bytes_in: usize, bytes_out: usize) {
        self.snapshot.packets_compressed += 1;
        self.snapshot.bytes_in += bytes_in as u64;
        self.snapshot.bytes_out += bytes_out as u64;
    }

    pub fn record_decompress(&mut self) {
        self.snapshot.packets_decompressed += 1;
    }

    pub fn record_passthrough(&mut self) {
        self.snapshot.passthrough_count += 1;
    }

    pub fn record_entropy(&mut self) {
        self.snapshot.entropy_count += 1;
    }

    pub fn record_delta(&mut self) {
        self.snapshot.delta_count += 1;
    }

    pub fn record_lzp(&mut self) {
        self.snapshot.lzp_count += 1;
    }

    pub fn record_lz77(&mut self) {
        self.snapshot.lz77_count += 1;
    }

    pub fn record_lz77x(&mut self) {
        self.snapshot.lz77x_count += 1;
    }

    pub fn record_rle(&mut self) {
        self.snapshot.rle_count += 1;
    }

    pub fn record_adaptive_rebuild(&mut self) {
        self.snapshot.adaptive_rebuilds += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut stats = Stats::default();
        stats.record_compress(100, 40);
        stats.record_compress(50, 20);
        stats.record_entropy();
        let snap = stats.snapshot();
        assert_eq!(snap.packets_compressed, 2);
        assert_eq!(snap.bytes_in, 150);
        assert_eq!(snap.bytes_out, 60);
        assert_eq!(snap.entropy_count, 1);
    }
}
