//! Wire format errors

use crate::tags::describe;
use thiserror::Error;

fn tag_label(tag: &u32) -> String {
    describe(*tag)
}

/// Errors raised while decoding SPC and CKC structures
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("buffer too short: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    #[error("reserved field is {0:#010x}, expected zero")]
    NonZeroReserved(u32),

    #[error("declared payload length {declared} exceeds the {available} bytes available")]
    PayloadOutOfBounds { declared: usize, available: usize },

    #[error("payload length {0} is not a multiple of 16")]
    UnalignedPayload(usize),

    #[error("TLV {}: value length {value_len} exceeds block length {block_len}", tag_label(.tag))]
    ValueExceedsBlock {
        tag: u32,
        value_len: usize,
        block_len: usize,
    },

    #[error("TLV {}: block length {block_len} is not a multiple of 16", tag_label(.tag))]
    UnalignedBlock { tag: u32, block_len: usize },

    #[error("TLV {}: block length {block_len} overruns the {remaining} remaining bytes", tag_label(.tag))]
    BlockOutOfBounds {
        tag: u32,
        block_len: usize,
        remaining: usize,
    },

    #[error("duplicate TLV {}", tag_label(.0))]
    DuplicateTag(u32),

    #[error("missing required TLV {}", tag_label(.0))]
    MissingTag(u32),

    #[error("TLV {}: expected {expected} bytes, got {got}", tag_label(.tag))]
    InvalidValueLength {
        tag: u32,
        expected: usize,
        got: usize,
    },

    #[error("TLV {}: malformed value", tag_label(.0))]
    InvalidValue(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the failure is a container version mismatch
    pub fn is_version_error(&self) -> bool {
        matches!(self, ProtocolError::UnsupportedVersion(_))
    }
}
