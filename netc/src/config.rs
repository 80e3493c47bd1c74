//! Context configuration: the options enumerated in the public API surface.

/// SIMD dispatch tag selected once at context creation (§9 "tagged variants
/// over function pointers"). Hot loops match on this tag; there is no
/// indirect/boxed dispatch, so the match is monomorphic after the first
/// branch predicts correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimdLevel {
    /// Probe the running CPU and pick the best available level.
    #[default]
    Auto,
    /// Portable scalar fallback.
    Generic,
    /// x86_64 SSE4.2.
    Sse42,
    /// x86_64 AVX2.
    Avx2,
    /// aarch64 NEON.
    Neon,
}

impl SimdLevel {
    /// Resolve [`SimdLevel::Auto`] to a concrete level for the running CPU.
    ///
    /// This build carries only the scalar reference path, so every level
    /// resolves to [`SimdLevel::Generic`]; the tag still exists so the
    /// wire-visible `simd_level` option round-trips and so a future SIMD
    /// backend has a dispatch point to slot into without touching the
    /// public API.
    pub fn resolve(self) -> SimdLevel {
        match self {
            SimdLevel::Auto => SimdLevel::Generic,
            other => other,
        }
    }
}

/// Header wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderForm {
    /// Fixed 8-byte header.
    #[default]
    Legacy,
    /// Variable 2-4 byte header; `model_id`/`context_seq` come from the context.
    Compact,
}

/// Whether the context keeps cross-packet history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Maintain ring buffer and previous-packet state across calls.
    #[default]
    Stateful,
    /// Each call is independent; no history, no sequence counter growth rules.
    Stateless,
}

/// Per-context configuration, built with `..Default::default()` or the
/// `with_*` builder methods (mirrors `ZstdEncoder::set_checksum`'s builder
/// style rather than a bitflags macro).
#[derive(Debug, Clone)]
pub struct Config {
    /// Stateful vs stateless operation.
    pub mode: Mode,
    /// Enable the delta pre-pass when the previous packet's length matches.
    pub delta: bool,
    /// Select bigram sub-tables by preceding byte.
    pub bigram: bool,
    /// Accumulate byte/packet counters retrievable via `stats()`.
    pub stats: bool,
    /// Header wire form.
    pub header_form: HeaderForm,
    /// Skip some trial passes for throughput (≈2-5% ratio cost for ≈8% speed).
    pub fast_compress: bool,
    /// Enable live retraining (requires `mode == Stateful`, bilateral).
    pub adaptive: bool,
    /// Ring buffer size in bytes (must be a power of two).
    pub ring_buffer_size: usize,
    /// Scratch arena size in bytes.
    pub arena_size: usize,
    /// Advisory compression level (0-9); does not change wire semantics.
    pub compression_level: u8,
    /// SIMD dispatch level.
    pub simd_level: SimdLevel,
}

/// Number of bigram classes a preceding byte is bucketed into.
pub const BIGRAM_CLASS_COUNT: usize = 4;

/// Map a preceding byte to its 2-bit bigram class (spec.md §4.5
/// "`bigram_class_map[prev_byte]`"). The dictionary trains one sub-table
/// per `(bucket, class)` pair rather than per individual byte value, so
/// this map has to be fixed and identical on encode and decode; using the
/// byte's top two bits keeps it a pure function of the byte with no extra
/// storage in the dictionary blob, the same way `ctx_bucket` is a pure
/// function of offset rather than a stored table.
pub fn bigram_class(prev_byte: u8) -> u8 {
    prev_byte >> 6
}

/// Default ring buffer size (64 KiB).
pub const DEFAULT_RING_BUFFER_SIZE: usize = 64 * 1024;

/// Default scratch arena size (2 * max packet + 64 bytes).
pub const DEFAULT_ARENA_SIZE: usize = 2 * netc_core::NETC_MAX_PACKET_SIZE + 64;

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Stateful,
            delta: false,
            bigram: false,
            stats: false,
            header_form: HeaderForm::Legacy,
            fast_compress: false,
            adaptive: false,
            ring_buffer_size: DEFAULT_RING_BUFFER_SIZE,
            arena_size: DEFAULT_ARENA_SIZE,
            compression_level: 5,
            simd_level: SimdLevel::Auto,
        }
    }
}

impl Config {
    /// Stateless configuration: a one-call-per-packet convenience preset.
    pub fn stateless() -> Self {
        Self {
            mode: Mode::Stateless,
            ..Default::default()
        }
    }

    /// Enable the delta pre-filter.
    pub fn with_delta(mut self, enabled: bool) -> Self {
        self.delta = enabled;
        self
    }

    /// Enable bigram-conditioned sub-tables.
    pub fn with_bigram(mut self, enabled: bool) -> Self {
        self.bigram = enabled;
        self
    }

    /// Enable statistics counters.
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats = enabled;
        self
    }

    /// Select the compact header form.
    pub fn with_compact_header(mut self, enabled: bool) -> Self {
        self.header_form = if enabled {
            HeaderForm::Compact
        } else {
            HeaderForm::Legacy
        };
        self
    }

    /// Skip some trial passes for throughput.
    pub fn with_fast_compress(mut self, enabled: bool) -> Self {
        self.fast_compress = enabled;
        self
    }

    /// Enable adaptive retraining (requires `Mode::Stateful`).
    pub fn with_adaptive(mut self, enabled: bool) -> Self {
        self.adaptive = enabled;
        self
    }

    /// Whether this configuration is internally consistent
    /// (adaptive retraining requires stateful mode).
    pub fn is_valid(&self) -> bool {
        !(self.adaptive && self.mode == Mode::Stateless)
    }
}
