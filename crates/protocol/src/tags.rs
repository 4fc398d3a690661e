//! FairPlay TLV tag registry
//!
//! Tags are the upper 32 bits of the 64-bit identifiers used by the FairPlay
//! Streaming server SDK.

/// Wrapped SK, HU and R1 plus integrity tag and anti-replay seed (SPC)
pub const SESSION_KEY_R1: u32 = 0x3d1a_10b8;
/// Anti-replay nonce (SPC, echoed in CKC)
pub const ANTI_REPLAY: u32 = 0x89c9_0f12;
/// Device random used to derive DASk (SPC)
pub const R2: u32 = 0x71b5_595a;
/// Asset identifier (SPC)
pub const ASSET_ID: u32 = 0x1bf7_f53f;
/// Transaction identifier (SPC)
pub const TRANSACTION_ID: u32 = 0x47aa_7ad3;
/// Protocol versions the device supports (SPC, list)
pub const PROTOCOL_VERSIONS_SUPPORTED: u32 = 0x67b8_fb79;
/// Protocol version the device used to build the SPC (SPC)
pub const PROTOCOL_VERSION_USED: u32 = 0x5d81_bcbc;
/// Tags the device asks to have returned (SPC, list)
pub const RETURN_TLVS: u32 = 0x19f9_d4e5;
/// Streaming indicator (SPC, returnable)
pub const STREAMING_INDICATOR: u32 = 0xabb0_256a;
/// Media playback state (SPC, returnable)
pub const MEDIA_PLAYBACK_STATE: u32 = 0xeb8e_fdf2;

/// Encrypted content key with its IV (CKC)
pub const CK: u32 = 0x58b3_8165;
/// R1 echoed back to the device (CKC)
pub const R1: u32 = 0xea74_c464;
/// Lease, rental and playback durations plus key type (CKC)
pub const CONTENT_KEY_DURATION: u32 = 0x47ac_f6a4;
/// Required HDCP level (CKC)
pub const HDCP_ENFORCEMENT: u32 = 0x2e52_f153;

/// Tags whose repeated occurrences form a list instead of a conflict
pub fn is_list_tag(tag: u32) -> bool {
    matches!(tag, RETURN_TLVS | PROTOCOL_VERSIONS_SUPPORTED)
}

/// Human readable name of a known tag
pub fn tag_name(tag: u32) -> Option<&'static str> {
    let name = match tag {
        SESSION_KEY_R1 => "SessionKey_R1",
        ANTI_REPLAY => "AntiReplay",
        R2 => "R2",
        ASSET_ID => "AssetID",
        TRANSACTION_ID => "TransactionID",
        PROTOCOL_VERSIONS_SUPPORTED => "ProtocolVersionsSupported",
        PROTOCOL_VERSION_USED => "ProtocolVersionUsed",
        RETURN_TLVS => "ReturnTLVs",
        STREAMING_INDICATOR => "StreamingIndicator",
        MEDIA_PLAYBACK_STATE => "MediaPlaybackState",
        CK => "CK",
        R1 => "R1",
        CONTENT_KEY_DURATION => "ContentKeyDuration",
        HDCP_ENFORCEMENT => "HdcpEnforcement",
        _ => return None,
    };
    Some(name)
}

/// Format a tag for logs and error messages
pub fn describe(tag: u32) -> String {
    match tag_name(tag) {
        Some(name) => format!("{name} ({tag:#010x})"),
        None => format!("{tag:#010x}"),
    }
}

/// Parse a tag written as `0x`-prefixed hex or plain decimal
pub fn parse_tag(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => s.parse().ok(),
    }
}
