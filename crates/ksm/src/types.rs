//! Request, policy and content key types for license issuance

use fps_crypto::{Aes128Key, Iv128};
use fps_protocol::{ContentKeyDuration, HdcpType, KeyType};
use std::collections::{BTreeMap, BTreeSet};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Content key and the IV its media segments were encrypted with
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey {
    pub key: Aes128Key,
    pub iv: Iv128,
}

impl ContentKey {
    pub fn new(key: Aes128Key, iv: Iv128) -> Self {
        Self { key, iv }
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Entitlement inputs applied to every CKC
///
/// The policy is configuration, not a decision engine: it states the
/// durations, key type and output protection to hand the device, and which
/// `ReturnTLVs` requests may be answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicensePolicy {
    pub lease_duration: u32,
    pub rental_duration: u32,
    pub playback_duration: u32,
    pub key_type: KeyType,
    pub hdcp: Option<HdcpType>,
    /// Values to return for requested tags
    pub return_values: BTreeMap<u32, Vec<u8>>,
    /// Requested tags that may be echoed from the SPC
    pub echo_tags: BTreeSet<u32>,
}

impl LicensePolicy {
    pub fn with_hdcp(mut self, hdcp: HdcpType) -> Self {
        self.hdcp = Some(hdcp);
        self
    }

    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn with_return_value(mut self, tag: u32, value: impl Into<Vec<u8>>) -> Self {
        self.return_values.insert(tag, value.into());
        self
    }

    pub fn with_echo_tag(mut self, tag: u32) -> Self {
        self.echo_tags.insert(tag);
        self
    }

    pub fn content_key_duration(&self) -> ContentKeyDuration {
        ContentKeyDuration {
            lease_duration: self.lease_duration,
            rental_duration: self.rental_duration,
            playback_duration: self.playback_duration,
            key_type: self.key_type,
        }
    }
}

/// A single SPC submitted for licensing
#[derive(Debug, Clone, Copy)]
pub struct LicenseRequest<'a> {
    /// Raw SPC bytes
    pub spc: &'a [u8],
    /// Asset id supplied next to the SPC, used when the SPC has none
    pub asset_id: Option<&'a [u8]>,
    /// Opaque id tying log lines to the client-visible error
    pub correlation_id: &'a str,
}

impl<'a> LicenseRequest<'a> {
    pub fn new(spc: &'a [u8], correlation_id: &'a str) -> Self {
        Self {
            spc,
            asset_id: None,
            correlation_id,
        }
    }

    pub fn with_asset_id(mut self, asset_id: Option<&'a [u8]>) -> Self {
        self.asset_id = asset_id;
        self
    }
}
