//! Dictionary training and the frozen, CRC-protected serialized form
//! (spec.md §4.10). A dictionary is built once offline from a training
//! corpus, shipped with the binary, and loaded read-only into every
//! [`crate::context::Context`] that needs it.

use netc_core::crc::Crc32;
use netc_core::error::{NetcError, Result};
use netc_core::ctx_bucket;
use rayon::prelude::*;

use crate::freq::FreqTable;
use crate::lzp::LzpPredictor;
use crate::tans::TansTable;

/// Frequency tables are normalised to this table log for dictionary training
/// (spec.md §4.10 step 2: "Normalise each raw row to T = 2^12").
pub const DICT_TABLE_LOG: u8 = 12;

const MAGIC: u32 = u32::from_le_bytes(*b"NETC");
const VERSION: u8 = 3;
const CTX_COUNT: usize = 16;
const BIGRAM_CLASSES: usize = 4;

const HEADER_SIZE: usize = 8;
const UNIGRAM_SIZE: usize = CTX_COUNT * 256 * 2;
const BIGRAM_SIZE: usize = CTX_COUNT * BIGRAM_CLASSES * 256 * 2;
const LZP_SIZE: usize = CTX_COUNT * 256;
const CRC_SIZE: usize = 4;

/// Total blob size with no LZP section.
pub const BLOB_SIZE_NO_LZP: usize = HEADER_SIZE + UNIGRAM_SIZE + BIGRAM_SIZE + CRC_SIZE;
/// Total blob size with an LZP section.
pub const BLOB_SIZE_WITH_LZP: usize = BLOB_SIZE_NO_LZP + LZP_SIZE;

/// Raw training accumulators for one in-progress dictionary.
pub struct Trainer {
    raw_uni: Box<[[u64; 256]; CTX_COUNT]>,
    raw_bi: Box<[[[u64; 256]; BIGRAM_CLASSES]; CTX_COUNT]>,
    lzp_counts: Option<Box<[[[u32; 256]; 256]; CTX_COUNT]>>,
}

impl Trainer {
    /// Start a new trainer. `with_lzp` also accumulates the
    /// `(bucket, prev_byte) -> byte` histograms an LZP predictor needs.
    pub fn new(with_lzp: bool) -> Self {
        Self {
            raw_uni: Box::new([[0u64; 256]; CTX_COUNT]),
            raw_bi: Box::new([[[0u64; 256]; BIGRAM_CLASSES]; CTX_COUNT]),
            lzp_counts: with_lzp.then(|| Box::new([[[0u32; 256]; 256]; CTX_COUNT])),
        }
    }

    /// Feed one training packet's raw bytes into the accumulators
    /// (spec.md §4.10 step 1).
    pub fn observe(&mut self, packet: &[u8]) {
        let mut prev = 0u8;
        for (offset, &byte) in packet.iter().enumerate() {
            let bucket = ctx_bucket(offset);
            self.raw_uni[bucket][byte as usize] += 1;
            let class = crate::config::bigram_class(prev);
            self.raw_bi[bucket][class as usize][byte as usize] += 1;
            if let Some(counts) = &mut self.lzp_counts {
                counts[bucket][prev as usize][byte as usize] += 1;
            }
            prev = byte;
        }
    }

    /// Normalise, build tANS tables, and (optionally) derive the LZP
    /// predictor, producing a frozen [`Dictionary`] (spec.md §4.10 steps 2-3).
    pub fn finish(&self, model_id: u8) -> Result<Dictionary> {
        if model_id == 0 {
            return Err(NetcError::corrupt(0, "model_id 0 is reserved for \"no dictionary\""));
        }

        // Each bucket's table is built from an independent histogram, so
        // the CTX_COUNT-way fan-out parallelises the same way
        // `oxiarc_zstd`'s block encoder farms independent blocks out to a
        // rayon pool: no shared mutable state, no ordering requirement
        // beyond "bucket b's result lands at index b" (which `collect`
        // into a `Vec` preserves regardless of completion order).
        let unigram: Vec<TansTable> = (0..CTX_COUNT)
            .into_par_iter()
            .map(|b| TansTable::build(&FreqTable::normalize(&self.raw_uni[b], DICT_TABLE_LOG)))
            .collect();
        let unigram: [TansTable; CTX_COUNT] = unigram
            .try_into()
            .unwrap_or_else(|_| unreachable!("CTX_COUNT entries collected"));

        let bigram: Vec<[TansTable; BIGRAM_CLASSES]> = (0..CTX_COUNT)
            .into_par_iter()
            .map(|b| {
                let classes: Vec<TansTable> = (0..BIGRAM_CLASSES)
                    .map(|c| TansTable::build(&FreqTable::normalize(&self.raw_bi[b][c], DICT_TABLE_LOG)))
                    .collect();
                classes.try_into().unwrap_or_else(|_| unreachable!())
            })
            .collect();
        let bigram: [[TansTable; BIGRAM_CLASSES]; CTX_COUNT] =
            bigram.try_into().unwrap_or_else(|_| unreachable!());

        let lzp = self.lzp_counts.as_ref().map(|c| LzpPredictor::from_counts(c));

        Ok(Dictionary {
            model_id,
            unigram,
            bigram,
            lzp,
        })
    }
}

/// A frozen, immutable compression model for NETC_CTX_COUNT=16 position
/// buckets. Safe to share read-only across contexts (wrap in `Arc`).
pub struct Dictionary {
    model_id: u8,
    unigram: [TansTable; CTX_COUNT],
    bigram: [[TansTable; BIGRAM_CLASSES]; CTX_COUNT],
    lzp: Option<LzpPredictor>,
}

impl Dictionary {
    /// Train a dictionary from a corpus of packets in one call.
    pub fn train(packets: &[&[u8]], model_id: u8, with_lzp: bool) -> Result<Self> {
        let mut trainer = Trainer::new(with_lzp);
        for packet in packets {
            trainer.observe(packet);
        }
        trainer.finish(model_id)
    }

    /// The model identifier this dictionary serialises/validates as.
    pub fn model_id(&self) -> u8 {
        self.model_id
    }

    /// Per-bucket unigram tANS table.
    pub fn unigram_table(&self, bucket: usize) -> &TansTable {
        &self.unigram[bucket]
    }

    /// All 16 unigram tables, for [`crate::entropy::BucketTables`].
    pub fn unigram_tables(&self) -> &[TansTable; CTX_COUNT] {
        &self.unigram
    }

    /// Per-`(bucket, bigram class)` tANS table.
    pub fn bigram_table(&self, bucket: usize, class: u8) -> &TansTable {
        &self.bigram[bucket][class as usize]
    }

    /// All bigram tables, for [`crate::entropy::BucketBigramTables`].
    pub fn bigram_tables(&self) -> &[[TansTable; BIGRAM_CLASSES]; CTX_COUNT] {
        &self.bigram
    }

    /// The LZP predictor, if this dictionary was trained with one.
    pub fn lzp(&self) -> Option<&LzpPredictor> {
        self.lzp.as_ref()
    }

    /// Serialise to the v3 blob layout (spec.md §4.10): magic, version,
    /// model_id, ctx_count, pad, unigram frequencies, bigram frequencies,
    /// optional LZP section, trailing CRC-32 over everything before it.
    pub fn save(&self) -> Vec<u8> {
        let has_lzp = self.lzp.is_some();
        let total = if has_lzp { BLOB_SIZE_WITH_LZP } else { BLOB_SIZE_NO_LZP };
        let mut buf = Vec::with_capacity(total);

        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.push(VERSION);
        buf.push(self.model_id);
        buf.push(CTX_COUNT as u8);
        buf.push(0); // pad

        for bucket in &self.unigram {
            for symbol in 0..256 {
                buf.extend_from_slice(&bucket_freq(bucket, symbol as u8).to_le_bytes());
            }
        }
        for bucket in &self.bigram {
            for class_table in bucket {
                for symbol in 0..256 {
                    buf.extend_from_slice(&bucket_freq(class_table, symbol as u8).to_le_bytes());
                }
            }
        }
        if let Some(lzp) = &self.lzp {
            for bucket in lzp.as_table() {
                buf.extend_from_slice(bucket);
            }
        }

        let crc = Crc32::compute(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        debug_assert_eq!(buf.len(), total);
        buf
    }

    /// Load and validate a serialised dictionary (spec.md §4.10 "Loading").
    /// Rejects on short input, magic/version mismatch, or CRC mismatch.
    pub fn load(data: &[u8]) -> Result<Self> {
        if data.len() != BLOB_SIZE_NO_LZP && data.len() != BLOB_SIZE_WITH_LZP {
            return Err(NetcError::corrupt(0, "dictionary blob has unexpected size"));
        }
        let has_lzp = data.len() == BLOB_SIZE_WITH_LZP;

        let magic = u32::from_le_bytes(data[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(NetcError::invalid_magic(MAGIC, magic));
        }
        let version = data[4];
        if version != VERSION {
            return Err(NetcError::format_version_mismatch(VERSION, version));
        }
        let model_id = data[5];
        let ctx_count = data[6];
        if ctx_count as usize != CTX_COUNT {
            return Err(NetcError::corrupt(6, "unexpected ctx_count"));
        }

        let crc_offset = data.len() - CRC_SIZE;
        let stored_crc = u32::from_le_bytes(data[crc_offset..].try_into().unwrap());
        let computed_crc = Crc32::compute(&data[..crc_offset]);
        if stored_crc != computed_crc {
            return Err(NetcError::crc_mismatch(stored_crc, computed_crc));
        }

        let mut cursor = HEADER_SIZE;
        let mut unigram_freqs = [[0u16; 256]; CTX_COUNT];
        for bucket in unigram_freqs.iter_mut() {
            for symbol in bucket.iter_mut() {
                *symbol = u16::from_le_bytes(data[cursor..cursor + 2].try_into().unwrap());
                cursor += 2;
            }
        }
        let unigram: Vec<TansTable> = unigram_freqs
            .iter()
            .map(|f| TansTable::build(&FreqTable::from_normalized(*f, DICT_TABLE_LOG)))
            .collect();
        let unigram: [TansTable; CTX_COUNT] = unigram.try_into().unwrap_or_else(|_| unreachable!());

        let mut bigram: Vec<[TansTable; BIGRAM_CLASSES]> = Vec::with_capacity(CTX_COUNT);
        for _ in 0..CTX_COUNT {
            let mut classes = Vec::with_capacity(BIGRAM_CLASSES);
            for _ in 0..BIGRAM_CLASSES {
                let mut freq = [0u16; 256];
                for symbol in freq.iter_mut() {
                    *symbol = u16::from_le_bytes(data[cursor..cursor + 2].try_into().unwrap());
                    cursor += 2;
                }
                classes.push(TansTable::build(&FreqTable::from_normalized(freq, DICT_TABLE_LOG)));
            }
            bigram.push(classes.try_into().unwrap_or_else(|_| unreachable!()));
        }
        let bigram: [[TansTable; BIGRAM_CLASSES]; CTX_COUNT] =
            bigram.try_into().unwrap_or_else(|_| unreachable!());

        let lzp = if has_lzp {
            let mut table = [[0u8; 256]; CTX_COUNT];
            for bucket in table.iter_mut() {
                bucket.copy_from_slice(&data[cursor..cursor + 256]);
                cursor += 256;
            }
            Some(LzpPredictor::from_table(table))
        } else {
            None
        };

        Ok(Self {
            model_id,
            unigram,
            bigram,
            lzp,
        })
    }
}

fn bucket_freq(table: &TansTable, symbol: u8) -> u16 {
    // TansTable does not retain the originating FreqTable, but its table
    // size and spread fully determine each symbol's slot count; recovering
    // the frequency from the decode table (count of states mapping to
    // `symbol`) keeps `save` independent of holding the FreqTable too.
    table.symbol_frequency(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packets() -> Vec<Vec<u8>> {
        vec![
            b"the quick brown fox".to_vec(),
            b"the lazy dog sleeps".to_vec(),
            b"the brown fox jumps".to_vec(),
        ]
    }

    #[test]
    fn train_then_save_then_load_round_trips() {
        let packets = sample_packets();
        let refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
        let dict = Dictionary::train(&refs, 7, false).unwrap();
        let blob = dict.save();
        assert_eq!(blob.len(), BLOB_SIZE_NO_LZP);

        let loaded = Dictionary::load(&blob).unwrap();
        assert_eq!(loaded.model_id(), 7);
        for bucket in 0..16 {
            assert_eq!(
                loaded.unigram_table(bucket).table_size(),
                dict.unigram_table(bucket).table_size()
            );
        }
    }

    #[test]
    fn with_lzp_round_trips_and_has_larger_blob() {
        let packets = sample_packets();
        let refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
        let dict = Dictionary::train(&refs, 3, true).unwrap();
        let blob = dict.save();
        assert_eq!(blob.len(), BLOB_SIZE_WITH_LZP);

        let loaded = Dictionary::load(&blob).unwrap();
        assert!(loaded.lzp().is_some());
    }

    #[test]
    fn model_id_zero_is_rejected() {
        let packets = sample_packets();
        let refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
        assert!(Dictionary::train(&refs, 0, false).is_err());
    }

    #[test]
    fn load_rejects_corrupted_crc() {
        let packets = sample_packets();
        let refs: Vec<&[u8]> = packets.iter().map(|p| p.as_slice()).collect();
        let dict = Dictionary::train(&refs, 1, false).unwrap();
        let mut blob = dict.save();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(Dictionary::load(&blob).is_err());
    }

    #[test]
    fn load_rejects_bad_magic() {
        let mut blob = vec![0u8; BLOB_SIZE_NO_LZP];
        blob[0..4].copy_from_slice(b"XXXX");
        assert!(Dictionary::load(&blob).is_err());
    }

    #[test]
    fn load_rejects_wrong_size() {
        let blob = vec![0u8; 100];
        assert!(Dictionary::load(&blob).is_err());
    }
}
