//! Cryptographic helper functions
//!
//! Random generation for keys, IVs and CKC padding.

use crate::types::{Aes128Key, Iv128, KeyError};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Input length {0} is not a multiple of the AES block size")]
    UnalignedInput(usize),

    #[error("RSA-OAEP decryption failed")]
    RsaDecrypt,

    #[error("RSA-OAEP encryption failed")]
    RsaEncrypt,

    #[error("Unwrapped key has length {0}, expected 16")]
    UnexpectedKeySize(usize),

    #[error("AES key unwrap integrity check failed")]
    KeyUnwrap,

    #[error("AES key wrap failed")]
    KeyWrap,

    #[error("Random number generator failure")]
    RandomFailure,

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Fill a buffer from the operating system CSPRNG
pub fn fill_random(buf: &mut [u8]) -> Result<(), CryptoError> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|_| CryptoError::RandomFailure)
}

/// Generate a random 128-bit IV
pub fn generate_iv() -> Result<Iv128, CryptoError> {
    let mut iv = Iv128::default();
    fill_random(iv.as_mut_slice())?;
    Ok(iv)
}

/// Generate a random AES-128 key
pub fn generate_key() -> Result<Aes128Key, CryptoError> {
    let mut key = Aes128Key::default();
    fill_random(key.as_mut_slice())?;
    Ok(key)
}
