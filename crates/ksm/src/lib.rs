//! FairPlay Streaming key security module
//!
//! Turns a Server Playback Context (SPC) into a Content Key Context (CKC):
//!
//! 1. `unwrap` strips the RSA-OAEP and AES-CBC layers of the SPC
//! 2. `session` authenticates SessionKey_R1 with DASk and recovers R1
//! 3. `provider` supplies the content key for the asset
//! 4. `ckc` assembles and encrypts the CKC payload under the R1 key
//!
//! `Ksm` runs the pipeline and maps every failure to an `ErrorKind`.
//!
//! # Example
//!
//! ```no_run
//! use fps_ksm::{Ksm, RandomContentKeys, ServerKeys};
//! use fps_crypto::Aes128Key;
//! use std::sync::Arc;
//!
//! # fn example(cert_pem: &str, key_pem: &str, spc: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let keys = ServerKeys::from_pem(cert_pem, key_pem, Aes128Key::from([0u8; 16]))?;
//! let ksm = Ksm::new(Arc::new(keys), Arc::new(RandomContentKeys));
//! let ckc = ksm.process(spc)?;
//! # Ok(())
//! # }
//! ```

pub mod ckc;
pub mod engine;
pub mod error;
pub mod keys;
pub mod provider;
pub mod session;
pub mod types;
pub mod unwrap;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use engine::{new_correlation_id, Ksm};
pub use error::{ErrorKind, KsmError, ProviderError};
pub use keys::{certificate_der_from_pem, ServerKeys};
pub use provider::{ContentKeyProvider, RandomContentKeys, StaticContentKeys};
pub use types::{ContentKey, LicensePolicy, LicenseRequest};
