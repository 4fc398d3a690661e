//! HMAC-SHA1 and SHA-1 with constant-time verification
//!
//! FairPlay authenticates the SessionKey_R1 block with a truncated
//! HMAC-SHA1 keyed by DASk. Verification must not leak how many tag bytes
//! matched, so comparisons go through `subtle::ConstantTimeEq`.

use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// SHA-1 digest size in bytes
pub const SHA1_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum HmacError {
    #[error("HMAC initialization failed")]
    InitFailed,

    #[error("HMAC verification failed")]
    VerificationFailed,
}

/// SHA-1 digest of `data`
pub fn sha1(data: &[u8]) -> [u8; SHA1_LEN] {
    Sha1::digest(data).into()
}

/// Calculate HMAC-SHA1 over data
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> Result<[u8; SHA1_LEN], HmacError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|_| HmacError::InitFailed)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Verify a (possibly truncated) HMAC-SHA1 tag in constant time
///
/// The first `expected.len()` bytes of HMAC-SHA1(key, data) are compared
/// against `expected`. Tags longer than the digest or empty are rejected.
pub fn verify_truncated_hmac_sha1(
    key: &[u8],
    data: &[u8],
    expected: &[u8],
) -> Result<(), HmacError> {
    if expected.is_empty() || expected.len() > SHA1_LEN {
        return Err(HmacError::VerificationFailed);
    }
    let calculated = hmac_sha1(key, data)?;

    if calculated[..expected.len()].ct_eq(expected).into() {
        Ok(())
    } else {
        Err(HmacError::VerificationFailed)
    }
}

/// Compare two byte strings in constant time
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
