//! SessionKey_R1 handling
//!
//! ```text
//! wrapped block (80) | integrity tag (16) | anti-replay seed (16)
//! wrapped block = AES-CBC([AES key], SPC IV, SK (16) | HU (20) | R1 (44))
//! integrity tag = HMAC-SHA1(DASk, wrapped block)[0..16]
//! ```
//!
//! The tag is checked before anything is decrypted.

use crate::error::KsmError;
use fps_crypto::{aes128_cbc_decrypt, verify_truncated_hmac_sha1, Aes128Key, Iv128};
use zeroize::Zeroizing;

pub const SESSION_KEY_R1_LEN: usize = 112;
pub const WRAPPED_BLOCK_LEN: usize = 80;
pub const INTEGRITY_TAG_LEN: usize = 16;
pub const ANTI_REPLAY_LEN: usize = 16;
pub const SK_LEN: usize = 16;
pub const HU_LEN: usize = 20;
pub const R1_LEN: usize = 44;

const R1_OFFSET: usize = SK_LEN + HU_LEN;
// First 16-byte boundary inside R1
const R1_KEY_OFFSET: usize = 48;

/// Authenticated and decrypted SessionKey_R1
pub struct SessionKeyR1 {
    /// Hashed device identifier
    pub hu: [u8; HU_LEN],
    pub r1: Zeroizing<[u8; R1_LEN]>,
    /// CKC payload key
    pub r1_key: Aes128Key,
    pub anti_replay: [u8; ANTI_REPLAY_LEN],
}

impl SessionKeyR1 {
    /// Verify and open a SessionKey_R1 value
    pub fn open(
        value: &[u8],
        aes_key: &Aes128Key,
        spc_iv: &Iv128,
        dask: &Aes128Key,
    ) -> Result<Self, KsmError> {
        if value.len() != SESSION_KEY_R1_LEN {
            return Err(KsmError::MalformedSpc(format!(
                "SessionKey_R1 is {} bytes, expected {SESSION_KEY_R1_LEN}",
                value.len()
            )));
        }
        let (wrapped, rest) = value.split_at(WRAPPED_BLOCK_LEN);
        let (tag, seed) = rest.split_at(INTEGRITY_TAG_LEN);

        verify_truncated_hmac_sha1(dask.as_slice(), wrapped, tag)?;

        let plaintext = aes128_cbc_decrypt(aes_key, spc_iv, wrapped)?;

        let mut hu = [0u8; HU_LEN];
        hu.copy_from_slice(&plaintext[SK_LEN..R1_OFFSET]);
        let mut r1 = Zeroizing::new([0u8; R1_LEN]);
        r1.copy_from_slice(&plaintext[R1_OFFSET..R1_OFFSET + R1_LEN]);
        let mut r1_key = Aes128Key::default();
        r1_key
            .as_mut_slice()
            .copy_from_slice(&plaintext[R1_KEY_OFFSET..R1_KEY_OFFSET + 16]);
        let mut anti_replay = [0u8; ANTI_REPLAY_LEN];
        anti_replay.copy_from_slice(seed);

        Ok(Self {
            hu,
            r1,
            r1_key,
            anti_replay,
        })
    }
}

/// Offset of the CKC payload key inside R1
pub const fn r1_key_offset_in_r1() -> usize {
    R1_KEY_OFFSET - R1_OFFSET
}

/// Build a SessionKey_R1 value the way a device does
#[cfg(any(test, feature = "test-utils"))]
pub fn seal(
    sk: &[u8; SK_LEN],
    hu: &[u8; HU_LEN],
    r1: &[u8; R1_LEN],
    anti_replay: &[u8; ANTI_REPLAY_LEN],
    aes_key: &Aes128Key,
    spc_iv: &Iv128,
    dask: &Aes128Key,
) -> Result<Vec<u8>, KsmError> {
    let mut inner = Zeroizing::new(Vec::with_capacity(WRAPPED_BLOCK_LEN));
    inner.extend_from_slice(sk);
    inner.extend_from_slice(hu);
    inner.extend_from_slice(r1);
    let wrapped = fps_crypto::aes128_cbc_encrypt(aes_key, spc_iv, &inner)?;
    let tag = fps_crypto::hmac_sha1(dask.as_slice(), &wrapped)?;

    let mut value = wrapped;
    value.extend_from_slice(&tag[..INTEGRITY_TAG_LEN]);
    value.extend_from_slice(anti_replay);
    Ok(value)
}
