//! FairPlay Streaming Protocol Types
//!
//! This crate contains the wire formats exchanged between a FairPlay device
//! and the key security module:
//! - SPC and CKC outer container framing
//! - TLV record parsing and emission with block alignment rules
//! - The tag registry and typed values (durations, key types, HDCP levels)
//!
//! This crate contains NO cryptographic operations and NO I/O.
//! It is purely focused on data structures and serialization.

pub mod binary;
pub mod container;
pub mod error;
pub mod tags;
pub mod tlv;
pub mod values;

// Re-export commonly used types
pub use binary::{BinaryRead, BinaryWrite};
pub use container::{
    CkcContainer, SpcContainer, SpcHeader, CERT_HASH_LEN, CKC_HEADER_LEN, CONTAINER_VERSION,
    IV_LEN, SPC_HEADER_LEN, WRAPPED_KEY_LEN,
};
pub use error::ProtocolError;
pub use tlv::{emit_tlvs, pad_to_block, parse_tlvs, TlvRecord, TlvSet, PADDING_TAG, TLV_HEADER_LEN};
pub use values::{
    decode_u32_list, encode_u32_list, ContentKeyDuration, HdcpType, KeyType,
    CONTENT_KEY_DURATION_LEN,
};
