//! KSM error types

use fps_crypto::{CryptoError, HmacError};
use fps_protocol::ProtocolError;
use std::fmt;
use thiserror::Error;

/// Failure classes surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedEnvelope,
    MalformedSpc,
    UnknownCertificate,
    CryptoFailure,
    IntegrityFailure,
    AssetNotFound,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedEnvelope => "MalformedEnvelope",
            ErrorKind::MalformedSpc => "MalformedSPC",
            ErrorKind::UnknownCertificate => "UnknownCertificate",
            ErrorKind::CryptoFailure => "CryptoFailure",
            ErrorKind::IntegrityFailure => "IntegrityFailure",
            ErrorKind::AssetNotFound => "AssetNotFound",
            ErrorKind::InternalError => "InternalError",
        }
    }

    /// HTTP status code for this kind
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::MalformedEnvelope => 400,
            ErrorKind::MalformedSpc
            | ErrorKind::UnknownCertificate
            | ErrorKind::CryptoFailure
            | ErrorKind::IntegrityFailure => 422,
            ErrorKind::AssetNotFound => 404,
            ErrorKind::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while turning an SPC into a CKC
///
/// Messages never carry key bytes or intermediate values.
#[derive(Debug, Error)]
pub enum KsmError {
    /// SPC framing or TLV structure is invalid
    #[error("malformed SPC: {0}")]
    Protocol(#[from] ProtocolError),

    /// SPC content violates a semantic rule
    #[error("malformed SPC: {0}")]
    MalformedSpc(String),

    /// Certificate hash does not name this server's certificate
    #[error("SPC was not built for this server certificate")]
    UnknownCertificate,

    /// Session key could not be recovered
    #[error("session key unwrap failed")]
    CryptoFailure,

    /// SessionKey_R1 authentication or anti-replay check failed
    #[error("integrity check failed: {0}")]
    IntegrityFailure(&'static str),

    /// Content key provider has no key for the asset
    #[error("no content key for the requested asset")]
    AssetNotFound,

    /// Server key material rejected at construction
    #[error("invalid server key material: {0}")]
    InvalidKeyMaterial(String),

    /// Random generator, provider or worker failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl KsmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KsmError::Protocol(_) | KsmError::MalformedSpc(_) => ErrorKind::MalformedSpc,
            KsmError::UnknownCertificate => ErrorKind::UnknownCertificate,
            KsmError::CryptoFailure => ErrorKind::CryptoFailure,
            KsmError::IntegrityFailure(_) => ErrorKind::IntegrityFailure,
            KsmError::AssetNotFound => ErrorKind::AssetNotFound,
            KsmError::InvalidKeyMaterial(_) | KsmError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Whether the client sent something this server cannot accept
    pub fn is_client_error(&self) -> bool {
        self.kind().http_status() < 500
    }
}

impl From<CryptoError> for KsmError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::RandomFailure => KsmError::Internal("random generator failure".into()),
            CryptoError::UnalignedInput(len) => {
                KsmError::MalformedSpc(format!("encrypted block of {len} bytes is not aligned"))
            }
            CryptoError::RsaEncrypt | CryptoError::KeyWrap => {
                KsmError::Internal("key encryption failed".into())
            }
            CryptoError::RsaDecrypt
            | CryptoError::UnexpectedKeySize(_)
            | CryptoError::KeyUnwrap
            | CryptoError::Key(_) => KsmError::CryptoFailure,
        }
    }
}

impl From<HmacError> for KsmError {
    fn from(_: HmacError) -> Self {
        KsmError::IntegrityFailure("SessionKey_R1 tag mismatch")
    }
}

/// Errors reported by a content key provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("asset not found")]
    NotFound,

    #[error("content key store unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for KsmError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotFound => KsmError::AssetNotFound,
            ProviderError::Unavailable(reason) => KsmError::Internal(reason),
        }
    }
}
