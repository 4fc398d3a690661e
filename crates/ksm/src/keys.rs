//! Deployment key material
//!
//! The FairPlay deployment package gives a server an RSA-1024 key pair, the
//! certificate devices encrypt against, and the 16-byte Application Secret
//! Key. All of it is loaded once, validated, and shared read-only.

use crate::error::KsmError;
use fps_crypto::{sha1, Aes128Key, SHA1_LEN};
use fps_protocol::WRAPPED_KEY_LEN;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const PRIVATE_KEY_TAG: &str = "PRIVATE KEY";

/// Immutable key set handed to the engine at construction
pub struct ServerKeys {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    certificate_der: Vec<u8>,
    certificate_hash: [u8; SHA1_LEN],
    ask: Aes128Key,
}

impl ServerKeys {
    /// Build from decoded parts
    ///
    /// The certificate must carry the public half of `private_key`, and the
    /// key must be RSA-1024 so that wrapped session keys fit the SPC field.
    pub fn new(
        private_key: RsaPrivateKey,
        certificate_der: Vec<u8>,
        ask: Aes128Key,
    ) -> Result<Self, KsmError> {
        if private_key.size() != WRAPPED_KEY_LEN {
            return Err(KsmError::InvalidKeyMaterial(format!(
                "RSA modulus is {} bits, expected {}",
                private_key.size() * 8,
                WRAPPED_KEY_LEN * 8
            )));
        }

        let public_key = RsaPublicKey::from(&private_key);
        let certificate_key = certificate_public_key(&certificate_der)?;
        if certificate_key != public_key {
            return Err(KsmError::InvalidKeyMaterial(
                "certificate does not match the private key".into(),
            ));
        }

        let certificate_hash = sha1(&certificate_der);
        Ok(Self {
            private_key,
            public_key,
            certificate_der,
            certificate_hash,
            ask,
        })
    }

    /// Build from PEM text: a `CERTIFICATE` block and a PKCS#8 `PRIVATE KEY`
    pub fn from_pem(
        certificate_pem: &str,
        private_key_pem: &str,
        ask: Aes128Key,
    ) -> Result<Self, KsmError> {
        let certificate_der = decode_pem(certificate_pem, CERTIFICATE_TAG)?;
        let private_der = zeroize::Zeroizing::new(decode_pem(private_key_pem, PRIVATE_KEY_TAG)?);
        let private_key = RsaPrivateKey::from_pkcs8_der(&private_der)
            .map_err(|e| KsmError::InvalidKeyMaterial(format!("private key: {e}")))?;

        Self::new(private_key, certificate_der, ask)
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// SHA-1 of the certificate DER, as carried in every SPC
    pub fn certificate_hash(&self) -> &[u8; SHA1_LEN] {
        &self.certificate_hash
    }

    /// Application Secret Key
    pub fn ask(&self) -> &Aes128Key {
        &self.ask
    }
}

impl std::fmt::Debug for ServerKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerKeys")
            .field("certificate_hash", &hex::encode(self.certificate_hash))
            .finish_non_exhaustive()
    }
}

fn decode_pem(text: &str, expected_tag: &str) -> Result<Vec<u8>, KsmError> {
    let block = pem::parse(text)
        .map_err(|e| KsmError::InvalidKeyMaterial(format!("{expected_tag} PEM: {e}")))?;
    if block.tag() != expected_tag {
        return Err(KsmError::InvalidKeyMaterial(format!(
            "expected PEM block {expected_tag}, found {}",
            block.tag()
        )));
    }
    Ok(block.into_contents())
}

fn certificate_public_key(der: &[u8]) -> Result<RsaPublicKey, KsmError> {
    let (_, certificate) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| KsmError::InvalidKeyMaterial(format!("certificate: {e}")))?;
    RsaPublicKey::from_public_key_der(certificate.public_key().raw)
        .map_err(|e| KsmError::InvalidKeyMaterial(format!("certificate public key: {e}")))
}

/// Decode the DER body of a PEM `CERTIFICATE` block
pub fn certificate_der_from_pem(text: &str) -> Result<Vec<u8>, KsmError> {
    decode_pem(text, CERTIFICATE_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT_PEM: &str = include_str!("../testdata/server_cert.pem");
    const KEY_PEM: &str = include_str!("../testdata/server_key.pem");
    const OTHER_CERT_PEM: &str = include_str!("../testdata/other_cert.pem");

    fn ask() -> Aes128Key {
        Aes128Key::from([0x5a; 16])
    }

    #[test]
    fn test_from_pem() {
        let keys = ServerKeys::from_pem(CERT_PEM, KEY_PEM, ask()).unwrap();
        let der = certificate_der_from_pem(CERT_PEM).unwrap();
        assert_eq!(keys.certificate_der(), der.as_slice());
        assert_eq!(keys.certificate_hash(), &sha1(&der));
        assert_eq!(keys.public_key().size(), 128);
    }

    #[test]
    fn test_mismatched_certificate() {
        let result = ServerKeys::from_pem(OTHER_CERT_PEM, KEY_PEM, ask());
        assert!(matches!(result, Err(KsmError::InvalidKeyMaterial(msg)) if msg.contains("does not match")));
    }

    #[test]
    fn test_swapped_pem_blocks() {
        let result = ServerKeys::from_pem(KEY_PEM, CERT_PEM, ask());
        assert!(matches!(result, Err(KsmError::InvalidKeyMaterial(msg)) if msg.contains("expected PEM block")));
    }

    #[test]
    fn test_garbage_pem() {
        assert!(ServerKeys::from_pem("not a pem", KEY_PEM, ask()).is_err());
    }

    #[test]
    fn test_wrong_key_size() {
        use rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut OsRng, 512).unwrap();
        let der = certificate_der_from_pem(CERT_PEM).unwrap();
        let result = ServerKeys::new(private_key, der, ask());
        assert!(matches!(result, Err(KsmError::InvalidKeyMaterial(msg)) if msg.contains("512 bits")));
    }

    #[test]
    fn test_debug_hides_keys() {
        let keys = ServerKeys::from_pem(CERT_PEM, KEY_PEM, ask()).unwrap();
        let debug = format!("{:?}", keys);
        assert!(debug.starts_with("ServerKeys { certificate_hash:"));
    }
}
