//! Inbound SPC unwrap operations

pub mod spc;

pub use spc::{decrypt_spc, DecryptedSpc};
