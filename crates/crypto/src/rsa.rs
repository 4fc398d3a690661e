//! RSA-OAEP-SHA1 session key transport
//!
//! The device wraps the 16-byte SPC session key (`[AES key]`) under the
//! public key of the deployment certificate. Only SHA-1 OAEP is used by
//! FairPlay.

use crate::helpers::CryptoError;
use crate::types::{Aes128Key, AES_BLOCK_SIZE};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use zeroize::Zeroizing;

/// Decrypt an RSA-OAEP-SHA1 ciphertext that must carry a 16-byte AES key
///
/// Any padding error or plaintext of the wrong size is a `CryptoFailure` at
/// the engine boundary; the reason is kept coarse on purpose so it cannot be
/// used as a padding oracle.
pub fn rsa_oaep_sha1_decrypt(
    private_key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<Aes128Key, CryptoError> {
    let plaintext = Zeroizing::new(
        private_key
            .decrypt(Oaep::new::<Sha1>(), ciphertext)
            .map_err(|_| CryptoError::RsaDecrypt)?,
    );
    if plaintext.len() != AES_BLOCK_SIZE {
        return Err(CryptoError::UnexpectedKeySize(plaintext.len()));
    }
    Ok(Aes128Key::from_slice(&plaintext)?)
}

/// Encrypt a 16-byte AES key with RSA-OAEP-SHA1
///
/// This is the device side of the exchange.
pub fn rsa_oaep_sha1_encrypt(
    public_key: &RsaPublicKey,
    key: &Aes128Key,
) -> Result<Vec<u8>, CryptoError> {
    public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), key.as_slice())
        .map_err(|_| CryptoError::RsaEncrypt)
}

/// Ciphertext size in bytes produced by `public_key`
pub fn rsa_ciphertext_len(public_key: &RsaPublicKey) -> usize {
    public_key.size()
}
