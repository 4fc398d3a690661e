//! Content key lookup
//!
//! The engine asks a `ContentKeyProvider` for the key of the asset named in
//! the SPC. Lookups are synchronous; the HTTP layer runs the engine on a
//! blocking worker, so an implementation may wait on a remote store.

use crate::error::ProviderError;
use crate::types::ContentKey;
use fps_crypto::{
    aes_key_unwrap, aes_key_wrap, generate_iv, generate_key, Aes128Key, Iv128, WRAPPED_KEY_LEN,
};
use std::collections::HashMap;

/// Source of per-asset content keys
pub trait ContentKeyProvider: Send + Sync {
    /// Key and IV for `asset_id`
    fn content_key(&self, asset_id: &[u8]) -> Result<ContentKey, ProviderError>;
}

/// Fresh random key for every request
///
/// Devices can never decrypt real media with these keys. Test use only.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomContentKeys;

impl ContentKeyProvider for RandomContentKeys {
    fn content_key(&self, _asset_id: &[u8]) -> Result<ContentKey, ProviderError> {
        let key = generate_key().map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let iv = generate_iv().map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(ContentKey::new(key, iv))
    }
}

struct WrappedEntry {
    wrapped: [u8; WRAPPED_KEY_LEN],
    iv: Iv128,
}

/// Content keys kept RFC 3394 wrapped under a key-encryption key
///
/// Keys are unwrapped per lookup, so plaintext content keys only exist for
/// the lifetime of a request.
pub struct StaticContentKeys {
    kek: Aes128Key,
    assets: HashMap<Vec<u8>, WrappedEntry>,
}

impl StaticContentKeys {
    pub fn new(kek: Aes128Key) -> Self {
        Self {
            kek,
            assets: HashMap::new(),
        }
    }

    /// Register an already wrapped key
    ///
    /// The blob is test-unwrapped so a wrong KEK or a corrupted entry fails
    /// at load time rather than on the first playback.
    pub fn insert_wrapped(
        &mut self,
        asset_id: impl Into<Vec<u8>>,
        wrapped: &[u8],
        iv: Iv128,
    ) -> Result<(), ProviderError> {
        aes_key_unwrap(&self.kek, wrapped)
            .map_err(|e| ProviderError::Unavailable(format!("stored key rejected: {e}")))?;
        let mut entry = WrappedEntry {
            wrapped: [0u8; WRAPPED_KEY_LEN],
            iv,
        };
        entry.wrapped.copy_from_slice(wrapped);
        self.assets.insert(asset_id.into(), entry);
        Ok(())
    }

    /// Wrap and register a plaintext key
    pub fn insert_key(
        &mut self,
        asset_id: impl Into<Vec<u8>>,
        key: &Aes128Key,
        iv: Iv128,
    ) -> Result<(), ProviderError> {
        let wrapped = aes_key_wrap(&self.kek, key)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        self.insert_wrapped(asset_id, &wrapped, iv)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl ContentKeyProvider for StaticContentKeys {
    fn content_key(&self, asset_id: &[u8]) -> Result<ContentKey, ProviderError> {
        let entry = self.assets.get(asset_id).ok_or(ProviderError::NotFound)?;
        let key = aes_key_unwrap(&self.kek, &entry.wrapped)
            .map_err(|e| ProviderError::Unavailable(format!("stored key rejected: {e}")))?;
        Ok(ContentKey::new(key, entry.iv.clone()))
    }
}

impl std::fmt::Debug for StaticContentKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticContentKeys")
            .field("assets", &self.assets.len())
            .finish_non_exhaustive()
    }
}
