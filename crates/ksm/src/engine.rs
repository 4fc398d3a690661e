//! SPC to CKC pipeline
//!
//! `Ksm` owns the deployment keys, the content key provider and the license
//! policy. It holds no per-request state and can be shared across threads
//! behind an `Arc`.

use crate::ckc::build_ckc;
use crate::error::KsmError;
use crate::keys::ServerKeys;
use crate::provider::ContentKeyProvider;
use crate::types::{LicensePolicy, LicenseRequest};
use crate::unwrap::decrypt_spc;
use std::sync::Arc;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// Key security module engine
pub struct Ksm {
    keys: Arc<ServerKeys>,
    provider: Arc<dyn ContentKeyProvider>,
    policy: LicensePolicy,
}

impl Ksm {
    pub fn new(keys: Arc<ServerKeys>, provider: Arc<dyn ContentKeyProvider>) -> Self {
        Self {
            keys,
            provider,
            policy: LicensePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: LicensePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn keys(&self) -> &ServerKeys {
        &self.keys
    }

    pub fn policy(&self) -> &LicensePolicy {
        &self.policy
    }

    /// Turn an SPC into a CKC
    pub fn process(&self, spc: &[u8]) -> Result<Vec<u8>, KsmError> {
        let correlation_id = new_correlation_id();
        self.process_request(&LicenseRequest::new(spc, &correlation_id))
    }

    /// Turn an SPC into a CKC, logging under the request's correlation id
    ///
    /// Every failure is logged here with its kind. Intermediate keys live in
    /// zeroizing containers owned by this call and are cleared before it
    /// returns on either path.
    pub fn process_request(&self, request: &LicenseRequest<'_>) -> Result<Vec<u8>, KsmError> {
        let span = info_span!("license", correlation_id = %request.correlation_id);
        let _enter = span.enter();

        match self.run(request) {
            Ok(ckc) => {
                info!(spc_len = request.spc.len(), ckc_len = ckc.len(), "CKC issued");
                Ok(ckc)
            }
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "SPC rejected");
                Err(e)
            }
        }
    }

    fn run(&self, request: &LicenseRequest<'_>) -> Result<Vec<u8>, KsmError> {
        let spc = decrypt_spc(request.spc, &self.keys)?;
        build_ckc(
            &spc,
            &self.keys,
            self.provider.as_ref(),
            &self.policy,
            request.asset_id,
        )
    }
}

impl std::fmt::Debug for Ksm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ksm")
            .field("keys", &self.keys)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Short opaque id for correlating a client error with server logs
pub fn new_correlation_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}
