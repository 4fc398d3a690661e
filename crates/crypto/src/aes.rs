//! AES-128 block cipher modes
//!
//! FairPlay uses AES-128 in three shapes: CBC without padding for the SPC
//! and CKC payloads, a single ECB block for key derivation, and the RFC 3394
//! key wrap for stored content keys. Inputs are never padded implicitly; a
//! caller handing in a buffer that is not block aligned gets an error.

use crate::helpers::CryptoError;
use crate::types::{Aes128Key, Iv128, AES_BLOCK_SIZE};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{
    block_padding::NoPadding, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit,
    KeyIvInit,
};
use aes::Aes128;
use aes_kw::Kek;
use zeroize::Zeroizing;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// RFC 3394 output for a 16-byte key
pub const WRAPPED_KEY_LEN: usize = AES_BLOCK_SIZE + 8;

fn ensure_aligned(len: usize) -> Result<(), CryptoError> {
    if len % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::UnalignedInput(len));
    }
    Ok(())
}

/// AES-128-CBC encrypt a block-aligned buffer
pub fn aes128_cbc_encrypt(
    key: &Aes128Key,
    iv: &Iv128,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    ensure_aligned(plaintext.len())?;
    let cipher = Aes128CbcEnc::new(
        GenericArray::from_slice(key.as_slice()),
        GenericArray::from_slice(iv.as_slice()),
    );
    Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext))
}

/// AES-128-CBC decrypt a block-aligned buffer
///
/// The plaintext is returned in a zeroizing buffer since it usually carries
/// key material.
pub fn aes128_cbc_decrypt(
    key: &Aes128Key,
    iv: &Iv128,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    ensure_aligned(ciphertext.len())?;
    let cipher = Aes128CbcDec::new(
        GenericArray::from_slice(key.as_slice()),
        GenericArray::from_slice(iv.as_slice()),
    );
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::UnalignedInput(ciphertext.len()))
}

/// AES-128-ECB encrypt a single block
pub fn aes128_ecb_encrypt(key: &Aes128Key, block: &[u8; AES_BLOCK_SIZE]) -> [u8; AES_BLOCK_SIZE] {
    let cipher = Aes128::new(GenericArray::from_slice(key.as_slice()));
    let mut out = *block;
    cipher.encrypt_block(GenericArray::from_mut_slice(&mut out));
    out
}

/// Wrap a 16-byte key under a KEK (RFC 3394)
pub fn aes_key_wrap(kek: &Aes128Key, key: &Aes128Key) -> Result<[u8; WRAPPED_KEY_LEN], CryptoError> {
    let kek = Kek::<Aes128>::from(*kek.as_bytes());
    let mut out = [0u8; WRAPPED_KEY_LEN];
    kek.wrap(key.as_slice(), &mut out)
        .map_err(|_| CryptoError::KeyWrap)?;
    Ok(out)
}

/// Unwrap a 24-byte RFC 3394 blob into a 16-byte key
///
/// Fails with `KeyUnwrap` when the integrity check value does not match,
/// which is what a wrong KEK or a corrupted blob produces.
pub fn aes_key_unwrap(kek: &Aes128Key, wrapped: &[u8]) -> Result<Aes128Key, CryptoError> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::UnexpectedKeySize(wrapped.len()));
    }
    let kek = Kek::<Aes128>::from(*kek.as_bytes());
    let mut key = Aes128Key::default();
    kek.unwrap(wrapped, key.as_mut_slice())
        .map_err(|_| CryptoError::KeyUnwrap)?;
    Ok(key)
}
