//! SPC unwrap
//!
//! Recovers the session key with the server's RSA key and decrypts the SPC
//! payload into its TLV records.

use crate::error::KsmError;
use crate::keys::ServerKeys;
use fps_crypto::{aes128_cbc_decrypt, constant_time_eq, rsa_oaep_sha1_decrypt, Aes128Key, Iv128};
use fps_protocol::{parse_tlvs, SpcContainer, TlvSet};
use tracing::debug;

/// SPC after the RSA and AES layers have been removed
pub struct DecryptedSpc {
    /// Session key (`[AES key]`)
    pub aes_key: Aes128Key,
    pub iv: Iv128,
    pub tlvs: TlvSet,
}

/// Full unwrap flow for an SPC
///
/// Framing is validated first, then the certificate hash, then the RSA
/// layer. The payload is only decrypted once the session key is known.
pub fn decrypt_spc(spc: &[u8], keys: &ServerKeys) -> Result<DecryptedSpc, KsmError> {
    let container = SpcContainer::parse(spc)?;
    let trailing = container.trailing_len(spc.len());
    if trailing > 0 {
        debug!(trailing, "ignoring bytes after SPC payload");
    }

    if !constant_time_eq(&container.header.cert_hash, keys.certificate_hash()) {
        return Err(KsmError::UnknownCertificate);
    }

    let aes_key = rsa_oaep_sha1_decrypt(keys.private_key(), &container.header.wrapped_key)
        .map_err(|_| KsmError::CryptoFailure)?;
    let iv = Iv128::from(container.header.iv);

    let payload = aes128_cbc_decrypt(&aes_key, &iv, container.payload)?;
    let tlvs = parse_tlvs(&payload)?;
    debug!(
        payload_len = payload.len(),
        records = tlvs.len(),
        "SPC payload decrypted"
    );

    Ok(DecryptedSpc { aes_key, iv, tlvs })
}
