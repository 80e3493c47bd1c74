//! LZP XOR filter (spec.md §4.7): a self-inverse prediction filter. Each
//! byte is XORed with a prediction derived from a small context (position
//! bucket + preceding byte); a correctly predicted byte collapses to
//! 0x00, concentrating the distribution the entropy coder sees.

use netc_core::ctx_bucket;

/// A trained predictor: one predicted byte per `(bucket, preceding byte)`.
/// Built by majority vote during dictionary training (see [`crate::dictionary`]).
#[derive(Debug, Clone)]
pub struct LzpPredictor {
    /// `table[bucket][prev_byte]` = the byte most often seen in that context.
    table: [[u8; 256]; 16],
}

impl LzpPredictor {
    /// Build a predictor directly from a prediction table (dictionary load path).
    pub fn from_table(table: [[u8; 256]; 16]) -> Self {
        Self { table }
    }

    /// Majority-vote predictor from per-context byte histograms accumulated
    /// during training: `counts[bucket][prev_byte][byte]`.
    pub fn from_counts(counts: &[[[u32; 256]; 256]; 16]) -> Self {
        let mut table = [[0u8; 256]; 16];
        for bucket in 0..16 {
            for prev in 0..256 {
                let hist = &counts[bucket][prev];
                let mut best = 0usize;
                for (symbol, &count) in hist.iter().enumerate() {
                    if count > hist[best] {
                        best = symbol;
                    }
                }
                table[bucket][prev] = best as u8;
            }
        }
        Self { table }
    }

    #[inline]
    fn predict(&self, offset: usize, prev_byte: u8) -> u8 {
        self.table[ctx_bucket(offset)][prev_byte as usize]
    }

    /// Reference table, for serialisation.
    pub fn as_table(&self) -> &[[u8; 256]; 16] {
        &self.table
    }
}

/// Apply the filter (self-inverse: the same function runs on encode and
/// decode). `prev_byte` seeds the context for offset 0; callers with no
/// cross-packet history pass 0.
pub fn apply(predictor: &LzpPredictor, data: &[u8], prev_byte_seed: u8, out: &mut [u8]) {
    assert_eq!(data.len(), out.len());
    let mut prev = prev_byte_seed;
    for (offset, (&byte, o)) in data.iter().zip(out.iter_mut()).enumerate() {
        let predicted = predictor.predict(offset, prev);
        *o = byte ^ predicted;
        prev = byte;
    }
}

/// Inverse of [`apply`] when `data` holds the filtered (XORed) bytes: the
/// context byte must be the *original* preceding byte, which on decode we
/// only recover one step at a time, so this walks forward reconstructing
/// `prev` from already-decoded output rather than from the filtered input.
pub fn unapply(predictor: &LzpPredictor, filtered: &[u8], prev_byte_seed: u8, out: &mut [u8]) {
    assert_eq!(filtered.len(), out.len());
    let mut prev = prev_byte_seed;
    for (offset, (&byte, o)) in filtered.iter().zip(out.iter_mut()).enumerate() {
        let predicted = predictor.predict(offset, prev);
        let original = byte ^ predicted;
        *o = original;
        prev = original;
    }
}
