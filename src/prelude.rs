//! FairPlay KSM Prelude
//!
//! Commonly used types for embedding the license service.
//!
//! # Example
//!
//! ```no_run
//! use fairplay_ksm::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(std::path::Path::new("/etc/fps/config.yaml"))?;
//! let state = AppState::new(config.build_engine()?);
//! let listener = tokio::net::TcpListener::bind(config.listen_addr(None)?).await?;
//! serve(listener, state, shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

pub use crate::config::Config;
pub use crate::envelope::{Base64Variant, BodyFormat, LicenseEnvelope, LicenseResponse};
pub use crate::error::{ConfigError, LicenseError};
pub use crate::server::{router, serve, shutdown_signal, AppState};
pub use fps_ksm::{
    ContentKey, ContentKeyProvider, ErrorKind, Ksm, KsmError, LicensePolicy, LicenseRequest,
    RandomContentKeys, ServerKeys, StaticContentKeys,
};
