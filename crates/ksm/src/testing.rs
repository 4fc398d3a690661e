//! Device-side helpers for tests and benchmarks
//!
//! `SpcBuilder` plays the role of a FairPlay client: it seals
//! SessionKey_R1, encrypts the TLV payload and wraps the session key under
//! the server certificate. The resulting `DeviceSpc` remembers R1 so it can
//! open the CKC the server returns.

use crate::error::{KsmError, ProviderError};
use crate::keys::{certificate_der_from_pem, ServerKeys};
use crate::provider::ContentKeyProvider;
use crate::session::{self, ANTI_REPLAY_LEN, HU_LEN, R1_LEN, SK_LEN};
use crate::types::ContentKey;
use fps_crypto::{
    aes128_cbc_decrypt, aes128_cbc_encrypt, derive_dask, fill_random, generate_iv, generate_key,
    rsa_oaep_sha1_encrypt, sha1, Aes128Key, Iv128, R2_LEN,
};
use fps_protocol::tags;
use fps_protocol::{
    emit_tlvs, encode_u32_list, pad_to_block, parse_tlvs, BinaryWrite, CkcContainer, SpcHeader,
    TlvRecord, TlvSet, CERT_HASH_LEN, WRAPPED_KEY_LEN,
};
use zeroize::Zeroizing;

/// Certificate of the test deployment
pub const SERVER_CERT_PEM: &str = include_str!("../testdata/server_cert.pem");
/// PKCS#8 private key of the test deployment
pub const SERVER_KEY_PEM: &str = include_str!("../testdata/server_key.pem");
/// Certificate of an unrelated deployment
pub const OTHER_CERT_PEM: &str = include_str!("../testdata/other_cert.pem");
/// ASk of the test deployment, hex
pub const TEST_ASK_HEX: &str = "d87ce7a26081de2e8eb8acef3a6dc179";

/// ASk of the test deployment
pub fn test_ask() -> Aes128Key {
    let mut ask = Aes128Key::default();
    hex::decode_to_slice(TEST_ASK_HEX, ask.as_mut_slice()).expect("valid test ASk");
    ask
}

/// Key set of the test deployment
pub fn test_server_keys() -> ServerKeys {
    ServerKeys::from_pem(SERVER_CERT_PEM, SERVER_KEY_PEM, test_ask()).expect("valid test keys")
}

/// SHA-1 of the unrelated deployment certificate
pub fn other_certificate_hash() -> [u8; CERT_HASH_LEN] {
    sha1(&certificate_der_from_pem(OTHER_CERT_PEM).expect("valid other certificate"))
}

fn random<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    fill_random(&mut buf).expect("OS random generator");
    buf
}

/// Builder for device SPCs
#[derive(Clone)]
pub struct SpcBuilder {
    asset_id: Option<Vec<u8>>,
    r1: [u8; R1_LEN],
    r2: Option<[u8; R2_LEN]>,
    anti_replay: [u8; ANTI_REPLAY_LEN],
    anti_replay_tlv: Option<[u8; ANTI_REPLAY_LEN]>,
    transaction_id: [u8; 8],
    protocol_version_used: Option<u32>,
    return_tags: Vec<u32>,
    extra: Vec<TlvRecord>,
    cert_hash: Option<[u8; CERT_HASH_LEN]>,
    device_ask: Option<Aes128Key>,
    empty_payload: bool,
}

impl Default for SpcBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SpcBuilder {
    /// Random R1, R2 and anti-replay; AssetID `track-01`
    pub fn new() -> Self {
        let anti_replay = random();
        Self {
            asset_id: Some(b"track-01".to_vec()),
            r1: random(),
            r2: Some(random()),
            anti_replay,
            anti_replay_tlv: Some(anti_replay),
            transaction_id: random(),
            protocol_version_used: None,
            return_tags: Vec::new(),
            extra: Vec::new(),
            cert_hash: None,
            device_ask: None,
            empty_payload: false,
        }
    }

    pub fn asset_id(mut self, asset_id: impl Into<Vec<u8>>) -> Self {
        self.asset_id = Some(asset_id.into());
        self
    }

    pub fn without_asset_id(mut self) -> Self {
        self.asset_id = None;
        self
    }

    pub fn without_r2(mut self) -> Self {
        self.r2 = None;
        self
    }

    pub fn r1(mut self, r1: [u8; R1_LEN]) -> Self {
        self.r1 = r1;
        self
    }

    /// Value of the standalone AntiReplay TLV; `None` omits it
    pub fn anti_replay_tlv(mut self, value: Option<[u8; ANTI_REPLAY_LEN]>) -> Self {
        self.anti_replay_tlv = value;
        self
    }

    pub fn protocol_version_used(mut self, version: u32) -> Self {
        self.protocol_version_used = Some(version);
        self
    }

    pub fn return_tags(mut self, tags: &[u32]) -> Self {
        self.return_tags = tags.to_vec();
        self
    }

    pub fn extra_tlv(mut self, record: TlvRecord) -> Self {
        self.extra.push(record);
        self
    }

    /// Certificate hash to put in the header instead of the server's
    pub fn cert_hash(mut self, hash: [u8; CERT_HASH_LEN]) -> Self {
        self.cert_hash = Some(hash);
        self
    }

    /// ASk the device side derives DASk from
    pub fn device_ask(mut self, ask: Aes128Key) -> Self {
        self.device_ask = Some(ask);
        self
    }

    /// Produce an SPC whose payload length is zero
    pub fn empty_payload(mut self) -> Self {
        self.empty_payload = true;
        self
    }

    /// Records in payload order; SessionKey_R1 leads
    fn records(
        &self,
        aes_key: &Aes128Key,
        iv: &Iv128,
        ask: &Aes128Key,
    ) -> Result<Vec<TlvRecord>, KsmError> {
        let mut records = Vec::new();
        let r2 = self.r2.unwrap_or_else(random);
        let dask = derive_dask(ask, &r2);
        let sealed = session::seal(
            &random::<SK_LEN>(),
            &random::<HU_LEN>(),
            &self.r1,
            &self.anti_replay,
            aes_key,
            iv,
            &dask,
        )?;
        records.push(TlvRecord::new(tags::SESSION_KEY_R1, sealed));
        if self.r2.is_some() {
            records.push(TlvRecord::new(tags::R2, r2.to_vec()));
        }
        if let Some(asset_id) = &self.asset_id {
            records.push(TlvRecord::new(tags::ASSET_ID, asset_id.clone()));
        }
        if let Some(anti_replay) = self.anti_replay_tlv {
            records.push(TlvRecord::new(tags::ANTI_REPLAY, anti_replay.to_vec()));
        }
        records.push(TlvRecord::new(tags::TRANSACTION_ID, self.transaction_id.to_vec()));
        if let Some(version) = self.protocol_version_used {
            records.push(TlvRecord::new(
                tags::PROTOCOL_VERSION_USED,
                version.to_be_bytes().to_vec(),
            ));
        }
        if !self.return_tags.is_empty() {
            records.push(TlvRecord::new(
                tags::RETURN_TLVS,
                encode_u32_list(&self.return_tags),
            ));
        }
        records.extend(self.extra.iter().cloned());
        Ok(records)
    }

    /// Seal the SPC for `keys`
    pub fn build(&self, keys: &ServerKeys) -> Result<DeviceSpc, KsmError> {
        let aes_key = generate_key()?;
        let iv = generate_iv()?;
        let ask = self.device_ask.as_ref().unwrap_or(keys.ask());

        let mut payload = if self.empty_payload {
            Zeroizing::new(Vec::new())
        } else {
            emit_tlvs(&self.records(&aes_key, &iv, ask)?)
        };
        pad_to_block(&mut payload, |tail| {
            tail.fill(0);
            Ok::<_, KsmError>(())
        })?;
        let ciphertext = aes128_cbc_encrypt(&aes_key, &iv, &payload)?;

        let wrapped = rsa_oaep_sha1_encrypt(keys.public_key(), &aes_key)?;
        let wrapped_key: [u8; WRAPPED_KEY_LEN] = wrapped
            .try_into()
            .map_err(|_| KsmError::Internal("unexpected RSA ciphertext size".into()))?;
        let header = SpcHeader::new(
            *iv.as_bytes(),
            wrapped_key,
            self.cert_hash.unwrap_or(*keys.certificate_hash()),
            ciphertext.len() as u32,
        );

        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(&ciphertext);

        let offset = session::r1_key_offset_in_r1();
        let r1_key = Aes128Key::from_slice(&self.r1[offset..offset + 16])
            .map_err(|e| KsmError::Internal(e.to_string()))?;

        Ok(DeviceSpc {
            bytes,
            r1: self.r1,
            r1_key,
            anti_replay: self.anti_replay,
        })
    }
}

/// A sealed SPC together with the secrets its device kept
pub struct DeviceSpc {
    pub bytes: Vec<u8>,
    pub r1: [u8; R1_LEN],
    pub r1_key: Aes128Key,
    pub anti_replay: [u8; ANTI_REPLAY_LEN],
}

impl DeviceSpc {
    /// Decrypt a CKC issued for this SPC and parse its records
    pub fn open_ckc(&self, ckc: &[u8]) -> Result<TlvSet, KsmError> {
        let container = CkcContainer::parse(ckc)?;
        let iv = Iv128::from(container.iv);
        let plaintext = aes128_cbc_decrypt(&self.r1_key, &iv, &container.payload)?;
        Ok(parse_tlvs(&plaintext)?)
    }

    /// Recover the content key from a CK value (`IV | encrypted key`)
    pub fn decrypt_ck(&self, ck: &[u8]) -> Result<Aes128Key, KsmError> {
        if ck.len() != 32 {
            return Err(KsmError::MalformedSpc(format!("CK is {} bytes", ck.len())));
        }
        let iv = Iv128::from_slice(&ck[..16]).map_err(|e| KsmError::Internal(e.to_string()))?;
        let key = aes128_cbc_decrypt(&self.r1_key, &iv, &ck[16..])?;
        Aes128Key::from_slice(&key).map_err(|e| KsmError::Internal(e.to_string()))
    }
}

/// One content key for every asset, optionally restricted to a set of ids
pub struct FixedContentKey {
    pub key: ContentKey,
    assets: Option<Vec<Vec<u8>>>,
}

impl FixedContentKey {
    pub fn new(key: Aes128Key, iv: Iv128) -> Self {
        Self {
            key: ContentKey::new(key, iv),
            assets: None,
        }
    }

    /// Key `00 01 .. 0f` with IV `10 11 .. 1f`
    pub fn sequential() -> Self {
        let mut key = [0u8; 16];
        let mut iv = [0u8; 16];
        for i in 0..16u8 {
            key[i as usize] = i;
            iv[i as usize] = 0x10 + i;
        }
        Self::new(Aes128Key::from(key), Iv128::from(iv))
    }

    /// Serve only `asset_id` (may be called repeatedly)
    pub fn only_for(mut self, asset_id: impl Into<Vec<u8>>) -> Self {
        self.assets
            .get_or_insert_with(Vec::new)
            .push(asset_id.into());
        self
    }
}

impl ContentKeyProvider for FixedContentKey {
    fn content_key(&self, asset_id: &[u8]) -> Result<ContentKey, ProviderError> {
        match &self.assets {
            Some(allowed) if !allowed.iter().any(|a| a == asset_id) => Err(ProviderError::NotFound),
            _ => Ok(self.key.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spc_shape() {
        let keys = test_server_keys();
        let device = SpcBuilder::new().build(&keys).unwrap();
        assert!(device.bytes.len() > 176);
        assert_eq!((device.bytes.len() - 176) % 16, 0);
        assert_eq!(&device.bytes[152..172], keys.certificate_hash());
    }

    #[test]
    fn test_other_certificate_hash_differs() {
        let keys = test_server_keys();
        assert_ne!(&other_certificate_hash(), keys.certificate_hash());
    }

    #[test]
    fn test_fixed_provider_allowlist() {
        let provider = FixedContentKey::sequential().only_for("a");
        assert!(provider.content_key(b"a").is_ok());
        assert!(matches!(
            provider.content_key(b"b"),
            Err(ProviderError::NotFound)
        ));
    }
}
