//! Zeroizing cryptographic key types
//!
//! Every secret that passes through the SPC to CKC pipeline is held in one of
//! these wrappers so that the memory is cleared on drop, on success and error
//! paths alike.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES block and key size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// AES-128 key (16 bytes) that zeroizes on drop
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Aes128Key(pub(crate) [u8; AES_BLOCK_SIZE]);

impl Aes128Key {
    /// Create a new AES-128 key from a 16-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != AES_BLOCK_SIZE {
            return Err(KeyError::InvalidLength {
                expected: AES_BLOCK_SIZE,
                got: bytes.len(),
            });
        }
        let mut key = [0u8; AES_BLOCK_SIZE];
        key.copy_from_slice(bytes);
        Ok(Aes128Key(key))
    }

    /// Get a reference to the key bytes
    pub fn as_bytes(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.0
    }

    /// Get a reference to the key bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Get a mutable reference to the key bytes
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<[u8; AES_BLOCK_SIZE]> for Aes128Key {
    fn from(bytes: [u8; AES_BLOCK_SIZE]) -> Self {
        Aes128Key(bytes)
    }
}

impl std::fmt::Debug for Aes128Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Aes128Key(..)")
    }
}

/// 128-bit CBC initialization vector that zeroizes on drop
///
/// IVs are not secret on the wire, but a content key IV travels next to the
/// content key and is cleared with it.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Iv128(pub(crate) [u8; AES_BLOCK_SIZE]);

impl Iv128 {
    /// Create a new IV from a 16-byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != AES_BLOCK_SIZE {
            return Err(KeyError::InvalidLength {
                expected: AES_BLOCK_SIZE,
                got: bytes.len(),
            });
        }
        let mut iv = [0u8; AES_BLOCK_SIZE];
        iv.copy_from_slice(bytes);
        Ok(Iv128(iv))
    }

    pub fn as_bytes(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<[u8; AES_BLOCK_SIZE]> for Iv128 {
    fn from(bytes: [u8; AES_BLOCK_SIZE]) -> Self {
        Iv128(bytes)
    }
}

impl std::fmt::Debug for Iv128 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Iv128(..)")
    }
}

/// Key-related errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
}
