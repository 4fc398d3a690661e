//! FairPlay Streaming license service
//!
//! Wraps the `fps-ksm` engine in an HTTP endpoint: YAML configuration,
//! base64 request and response envelopes, and an axum server.

pub mod config;
pub mod envelope;
pub mod error;
pub mod prelude;
pub mod server;

pub use config::Config;
pub use envelope::{Base64Variant, LicenseEnvelope};
pub use error::{ConfigError, LicenseError};
pub use server::{router, serve, AppState};
