//! Error types shared by every netc crate.
//!
//! The variants mirror the error taxonomy of the wire protocol: callers
//! match on these to decide whether a failure is recoverable (a trial
//! inside the compression pipeline silently falls through to the next
//! strategy) or terminal (decompression never retries internally).

use thiserror::Error;

/// The error type returned by all fallible netc operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetcError {
    /// Allocation failure (only possible on training/dictionary-load paths).
    #[error("allocation failure: {context}")]
    NoMem {
        /// What was being allocated.
        context: &'static str,
    },

    /// Source packet exceeds `NETC_MAX_PACKET_SIZE` (65535 bytes).
    #[error("packet of {size} bytes exceeds maximum of {max}")]
    TooBig {
        /// The offending size.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// Malformed, truncated, or out-of-range encoded data.
    #[error("corrupt packet at offset {offset}: {message}")]
    Corrupt {
        /// Byte offset (within the packet payload) where corruption was detected.
        offset: usize,
        /// Human-readable detail.
        message: &'static str,
    },

    /// Dictionary blob failed a structural or integrity check (bad magic,
    /// bad format version, bad CRC, bad frequencies, ...).
    #[error("invalid dictionary: {message}")]
    DictInvalid {
        /// Human-readable detail, including the offending values.
        message: String,
    },

    /// Destination buffer is smaller than the operation requires.
    #[error("destination buffer too small: need {needed} bytes, have {available}")]
    BufSmall {
        /// Bytes needed to complete the operation.
        needed: usize,
        /// Bytes actually available in the caller's buffer.
        available: usize,
    },

    /// A context was required but none was supplied (stateful call on a null context).
    #[error("context is required for this operation")]
    CtxNull,

    /// The encoded algorithm identifier names a variant this build does not implement.
    #[error("unsupported algorithm variant: {variant:#x}")]
    Unsupported {
        /// The raw algorithm/variant byte that was rejected.
        variant: u8,
    },

    /// Dictionary `model_id` or blob format version does not match what the peer expects.
    #[error("version mismatch: expected {expected}, found {found}")]
    Version {
        /// Expected model_id or format version.
        expected: u8,
        /// model_id or format version actually present.
        found: u8,
    },

    /// A null pointer or zero-valued argument was passed where disallowed.
    #[error("invalid argument: {message}")]
    InvalidArg {
        /// Human-readable detail.
        message: &'static str,
    },
}

/// Result type alias used throughout netc.
pub type Result<T> = std::result::Result<T, NetcError>;

impl NetcError {
    /// Return a short, stable, human-readable description of this error.
    ///
    /// Mirrors the `strerror(err) -> message` entry in the public API surface;
    /// unlike [`std::fmt::Display`] (which includes the dynamic fields), this
    /// returns a fixed string per error *kind*, suitable for metrics labels.
    pub fn strerror(&self) -> &'static str {
        match self {
            NetcError::NoMem { .. } => "allocation failure",
            NetcError::TooBig { .. } => "packet too big",
            NetcError::Corrupt { .. } => "corrupt packet",
            NetcError::DictInvalid { .. } => "invalid dictionary",
            NetcError::BufSmall { .. } => "destination buffer too small",
            NetcError::CtxNull => "missing context",
            NetcError::Unsupported { .. } => "unsupported algorithm variant",
            NetcError::Version { .. } => "model or version mismatch",
            NetcError::InvalidArg { .. } => "invalid argument",
        }
    }

    /// Construct a [`NetcError::Corrupt`] with the given offset and message.
    pub fn corrupt(offset: usize, message: &'static str) -> Self {
        Self::Corrupt { offset, message }
    }

    /// Construct a [`NetcError::TooBig`] for `size` against the 65535-byte cap.
    pub fn too_big(size: usize) -> Self {
        Self::TooBig {
            size,
            max: crate::NETC_MAX_PACKET_SIZE,
        }
    }

    /// Construct a [`NetcError::BufSmall`].
    pub fn buf_small(needed: usize, available: usize) -> Self {
        Self::BufSmall { needed, available }
    }

    /// Construct a [`NetcError::DictInvalid`] for a magic-number mismatch.
    pub fn invalid_magic(expected: u32, found: u32) -> Self {
        Self::DictInvalid {
            message: format!("bad magic: expected {expected:#010x}, found {found:#010x}"),
        }
    }

    /// Construct a [`NetcError::DictInvalid`] for a blob format version mismatch.
    /// (Distinct from [`NetcError::Version`], which is the *model_id* check a
    /// decompressor runs against the dictionary it was handed.)
    pub fn format_version_mismatch(expected: u8, found: u8) -> Self {
        Self::DictInvalid {
            message: format!("unsupported dictionary format version: expected {expected}, found {found}"),
        }
    }

    /// Construct a [`NetcError::DictInvalid`] for a CRC-32 mismatch.
    pub fn crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::DictInvalid {
            message: format!("CRC mismatch: expected {expected:#010x}, computed {computed:#010x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strerror_is_stable_across_field_values() {
        let a = NetcError::Corrupt {
            offset: 1,
            message: "a",
        };
        let b = NetcError::Corrupt {
            offset: 2,
            message: "b",
        };
        assert_eq!(a.strerror(), b.strerror());
    }

    #[test]
    fn display_includes_dynamic_fields() {
        let err = NetcError::Version {
            expected: 7,
            found: 9,
        };
        let msg = err.to_string();
        assert!(msg.contains('7') && msg.contains('9'));
    }

    #[test]
    fn too_big_uses_max_packet_constant() {
        let err = NetcError::too_big(100_000);
        match err {
            NetcError::TooBig { size, max } => {
                assert_eq!(size, 100_000);
                assert_eq!(max, crate::NETC_MAX_PACKET_SIZE);
            }
            _ => panic!("wrong variant"),
        }
    }
}
