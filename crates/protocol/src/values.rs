//! Typed TLV values: durations, key types, HDCP levels, u32 lists

use crate::error::ProtocolError;
use crate::tags::CONTENT_KEY_DURATION;
use serde::{Deserialize, Serialize};

/// Encoded size of a ContentKeyDuration value
pub const CONTENT_KEY_DURATION_LEN: usize = 20;

/// Lifetime class of a content key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyType {
    /// Neither lease nor rental: persistent until the device is wiped
    #[default]
    Unspecified,
    Lease,
    Rental,
    LeaseAndRental,
    Persistence,
    PersistenceAndDuration,
}

impl KeyType {
    pub fn value(&self) -> u32 {
        match self {
            KeyType::Unspecified => 0x0000_0000,
            KeyType::Lease => 0x1a4b_de7e,
            KeyType::Rental => 0x3dfe_45a0,
            KeyType::LeaseAndRental => 0x27b5_9bde,
            KeyType::Persistence => 0x3df2_d9fb,
            KeyType::PersistenceAndDuration => 0x18f0_6048,
        }
    }

    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0x0000_0000 => Some(KeyType::Unspecified),
            0x1a4b_de7e => Some(KeyType::Lease),
            0x3dfe_45a0 => Some(KeyType::Rental),
            0x27b5_9bde => Some(KeyType::LeaseAndRental),
            0x3df2_d9fb => Some(KeyType::Persistence),
            0x18f0_6048 => Some(KeyType::PersistenceAndDuration),
            _ => None,
        }
    }
}

/// HDCP level the device must enforce on output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HdcpType {
    NoneRequired,
    Type0,
    Type1,
}

impl HdcpType {
    pub fn value(&self) -> u64 {
        match self {
            HdcpType::NoneRequired => 0xef72_894c_a789_5b78,
            HdcpType::Type0 => 0x4079_1ac7_8bd5_c571,
            HdcpType::Type1 => 0x285a_0863_bba8_e1d3,
        }
    }

    pub fn from_value(value: u64) -> Option<Self> {
        match value {
            0xef72_894c_a789_5b78 => Some(HdcpType::NoneRequired),
            0x4079_1ac7_8bd5_c571 => Some(HdcpType::Type0),
            0x285a_0863_bba8_e1d3 => Some(HdcpType::Type1),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        self.value().to_be_bytes()
    }
}

/// Key lifetime carried in the CKC
///
/// Durations are in seconds; zero means not limited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentKeyDuration {
    pub lease_duration: u32,
    pub rental_duration: u32,
    pub playback_duration: u32,
    pub key_type: KeyType,
}

impl ContentKeyDuration {
    pub fn to_bytes(&self) -> [u8; CONTENT_KEY_DURATION_LEN] {
        let mut out = [0u8; CONTENT_KEY_DURATION_LEN];
        out[0..4].copy_from_slice(&self.lease_duration.to_be_bytes());
        out[4..8].copy_from_slice(&self.rental_duration.to_be_bytes());
        out[8..12].copy_from_slice(&self.playback_duration.to_be_bytes());
        out[12..16].copy_from_slice(&self.key_type.value().to_be_bytes());
        // 16..20 reserved
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != CONTENT_KEY_DURATION_LEN {
            return Err(ProtocolError::InvalidValueLength {
                tag: CONTENT_KEY_DURATION,
                expected: CONTENT_KEY_DURATION_LEN,
                got: bytes.len(),
            });
        }
        let words = decode_u32_list(CONTENT_KEY_DURATION, bytes)?;
        let key_type =
            KeyType::from_value(words[3]).ok_or(ProtocolError::InvalidValue(CONTENT_KEY_DURATION))?;
        Ok(Self {
            lease_duration: words[0],
            rental_duration: words[1],
            playback_duration: words[2],
            key_type,
        })
    }
}

/// Decode a value made of big-endian u32 words
pub fn decode_u32_list(tag: u32, bytes: &[u8]) -> Result<Vec<u32>, ProtocolError> {
    if bytes.len() % 4 != 0 {
        return Err(ProtocolError::InvalidValue(tag));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Encode u32 words big-endian
pub fn encode_u32_list(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::RETURN_TLVS;

    #[test]
    fn test_key_type_values() {
        for key_type in [
            KeyType::Unspecified,
            KeyType::Lease,
            KeyType::Rental,
            KeyType::LeaseAndRental,
            KeyType::Persistence,
            KeyType::PersistenceAndDuration,
        ] {
            assert_eq!(KeyType::from_value(key_type.value()), Some(key_type));
        }
        assert_eq!(KeyType::from_value(7), None);
    }

    #[test]
    fn test_key_type_serde() {
        let parsed: KeyType = serde_json::from_str("\"lease-and-rental\"").unwrap();
        assert_eq!(parsed, KeyType::LeaseAndRental);
        let hdcp: HdcpType = serde_json::from_str("\"type0\"").unwrap();
        assert_eq!(hdcp, HdcpType::Type0);
    }

    #[test]
    fn test_duration_layout() {
        let duration = ContentKeyDuration {
            lease_duration: 3600,
            rental_duration: 86400,
            playback_duration: 7200,
            key_type: KeyType::Rental,
        };
        let bytes = duration.to_bytes();
        assert_eq!(&bytes[0..4], &3600u32.to_be_bytes());
        assert_eq!(&bytes[4..8], &86400u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &7200u32.to_be_bytes());
        assert_eq!(&bytes[12..16], &0x3dfe_45a0u32.to_be_bytes());
        assert_eq!(&bytes[16..20], &[0u8; 4]);
        assert_eq!(ContentKeyDuration::from_bytes(&bytes).unwrap(), duration);
    }

    #[test]
    fn test_duration_default_is_persistent() {
        let bytes = ContentKeyDuration::default().to_bytes();
        assert_eq!(bytes, [0u8; 20]);
    }

    #[test]
    fn test_duration_wrong_size() {
        assert!(ContentKeyDuration::from_bytes(&[0u8; 16]).is_err());
    }

    #[test]
    fn test_u32_list() {
        let bytes = encode_u32_list(&[1, 0x2e52_f153]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(decode_u32_list(RETURN_TLVS, &bytes).unwrap(), vec![1, 0x2e52_f153]);
        assert!(decode_u32_list(RETURN_TLVS, &[0u8; 5]).is_err());
    }
}
