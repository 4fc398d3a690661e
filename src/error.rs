//! Error types of the HTTP service
//!
//! `LicenseError` is what a `/fps/license` request can fail with; it maps
//! onto the client-facing `ErrorKind` taxonomy of the engine. `ConfigError`
//! covers startup and aborts the process.

use crate::envelope::EnvelopeError;
use fps_ksm::{ErrorKind, KsmError};
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single license request
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Request body or base64 could not be decoded
    #[error("malformed request: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Engine rejected the SPC
    #[error(transparent)]
    Ksm(#[from] KsmError),

    /// Worker failed before producing a result
    #[error("internal error: {0}")]
    Internal(String),
}

impl LicenseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Envelope(_) => ErrorKind::MalformedEnvelope,
            Self::Ksm(e) => e.kind(),
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// HTTP status code for the response
    pub fn status(&self) -> u16 {
        self.kind().http_status()
    }

    /// Message safe to return to the client
    ///
    /// Internal failures are reported generically; the detail stays in the
    /// server log.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::InternalError => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Configuration could not be loaded or validated
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file given (--config-file, CONFIG_FILE or {fallback})")]
    NoConfigFile { fallback: &'static str },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("ASk must be exactly 32 lowercase hex characters")]
    InvalidAsk,

    #[error("invalid {field}: {reason}")]
    InvalidHex { field: String, reason: String },

    #[error("invalid tag {0:?}: expected 0x-prefixed hex or decimal u32")]
    InvalidTag(String),

    #[error("invalid listen address {0:?}")]
    InvalidListen(String),

    #[error("duplicate content key for asset {0:?}")]
    DuplicateAsset(String),

    #[error("server keys: {0}")]
    Keys(#[from] KsmError),
}

impl ConfigError {
    pub(crate) fn hex(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidHex {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_error_kinds() {
        let err = LicenseError::from(EnvelopeError::MissingSpc);
        assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
        assert_eq!(err.status(), 400);

        let err = LicenseError::from(KsmError::AssetNotFound);
        assert_eq!(err.kind(), ErrorKind::AssetNotFound);
        assert_eq!(err.status(), 404);

        let err = LicenseError::from(KsmError::UnknownCertificate);
        assert_eq!(err.status(), 422);
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = LicenseError::Internal("worker panicked at src/x.rs:10".into());
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_message(), "internal server error");

        let err = LicenseError::from(KsmError::Internal("random generator failure".into()));
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn test_client_message_is_kept() {
        let err = LicenseError::from(KsmError::UnknownCertificate);
        assert!(err.public_message().contains("certificate"));
    }
}
