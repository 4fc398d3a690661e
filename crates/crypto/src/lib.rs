//! FairPlay Streaming cryptographic operations
//!
//! This crate provides the primitives the key security module is built from:
//! - Zeroizing key and IV types that clear memory on drop
//! - RSA-OAEP-SHA1 unwrap of the SPC session key
//! - AES-128 in CBC (no padding), single-block ECB and RFC 3394 key wrap
//! - HMAC-SHA1 / SHA-1 with constant-time verification
//! - DASk derivation from the Application Secret Key and R2
//!
//! # Example
//!
//! ```
//! use fps_crypto::{aes128_cbc_decrypt, aes128_cbc_encrypt, generate_iv, generate_key};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key = generate_key()?;
//! let iv = generate_iv()?;
//!
//! let ciphertext = aes128_cbc_encrypt(&key, &iv, &[0u8; 32])?;
//! let plaintext = aes128_cbc_decrypt(&key, &iv, &ciphertext)?;
//! assert_eq!(&plaintext[..], &[0u8; 32]);
//! # Ok(())
//! # }
//! ```

pub mod aes;
pub mod helpers;
pub mod hmac;
pub mod kdf;
pub mod rsa;
pub mod types;

// Re-export commonly used types
pub use self::aes::{
    aes128_cbc_decrypt, aes128_cbc_encrypt, aes128_ecb_encrypt, aes_key_unwrap, aes_key_wrap,
    WRAPPED_KEY_LEN,
};
pub use self::helpers::{fill_random, generate_iv, generate_key, CryptoError};
pub use self::hmac::{
    constant_time_eq, hmac_sha1, sha1, verify_truncated_hmac_sha1, HmacError, SHA1_LEN,
};
pub use self::kdf::{derive_dask, R2_LEN};
pub use self::rsa::{rsa_ciphertext_len, rsa_oaep_sha1_decrypt, rsa_oaep_sha1_encrypt};
pub use self::types::{Aes128Key, Iv128, KeyError, AES_BLOCK_SIZE};
