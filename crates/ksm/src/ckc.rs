//! CKC construction
//!
//! Authenticates SessionKey_R1 with DASk, fetches the content key, and
//! assembles the CKC payload encrypted under the R1 key:
//!
//! ```text
//! CK | R1 | ContentKeyDuration | AntiReplay | [HdcpEnforcement] | [returned TLVs]
//! ```

use crate::error::KsmError;
use crate::keys::ServerKeys;
use crate::provider::ContentKeyProvider;
use crate::session::{SessionKeyR1, SESSION_KEY_R1_LEN};
use crate::types::LicensePolicy;
use crate::unwrap::DecryptedSpc;
use fps_crypto::{
    aes128_cbc_encrypt, constant_time_eq, derive_dask, fill_random, generate_iv, R2_LEN,
};
use fps_protocol::tags::{self, describe};
use fps_protocol::{
    decode_u32_list, emit_tlvs, pad_to_block, BinaryWrite, CkcContainer, TlvRecord, TlvSet,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Protocol versions this server speaks
pub const SUPPORTED_PROTOCOL_VERSIONS: &[u32] = &[1];

/// Upper bound on the AssetID value
pub const MAX_ASSET_ID_LEN: usize = 256;

const TRANSACTION_ID_LEN: usize = 8;

/// Build the CKC for a decrypted SPC
pub fn build_ckc(
    spc: &DecryptedSpc,
    keys: &ServerKeys,
    provider: &dyn ContentKeyProvider,
    policy: &LicensePolicy,
    asset_hint: Option<&[u8]>,
) -> Result<Vec<u8>, KsmError> {
    let tlvs = &spc.tlvs;

    let r2 = tlvs.require_len(tags::R2, R2_LEN)?;
    let session_value = tlvs.require_len(tags::SESSION_KEY_R1, SESSION_KEY_R1_LEN)?;
    let dask = derive_dask(keys.ask(), r2);
    let session = SessionKeyR1::open(session_value, &spc.aes_key, &spc.iv, &dask)?;

    if let Some(anti_replay) = tlvs.get(tags::ANTI_REPLAY) {
        if !constant_time_eq(anti_replay, &session.anti_replay) {
            return Err(KsmError::IntegrityFailure("anti-replay value mismatch"));
        }
    }

    check_protocol_version(tlvs)?;
    if let Some(transaction_id) = tlvs.get(tags::TRANSACTION_ID) {
        if transaction_id.len() != TRANSACTION_ID_LEN {
            return Err(KsmError::MalformedSpc(format!(
                "TransactionID is {} bytes, expected {TRANSACTION_ID_LEN}",
                transaction_id.len()
            )));
        }
        debug!(transaction_id = %hex::encode(transaction_id), "SPC transaction");
    }

    let asset_id = resolve_asset_id(tlvs, asset_hint)?;
    let content_key = provider.content_key(asset_id)?;

    let mut ck = content_key.iv.as_slice().to_vec();
    ck.extend(aes128_cbc_encrypt(
        &session.r1_key,
        &content_key.iv,
        content_key.key.as_slice(),
    )?);

    let mut records = vec![
        TlvRecord::new(tags::CK, ck),
        TlvRecord::new(tags::R1, session.r1.to_vec()),
        TlvRecord::new(
            tags::CONTENT_KEY_DURATION,
            policy.content_key_duration().to_bytes().to_vec(),
        ),
        TlvRecord::new(tags::ANTI_REPLAY, session.anti_replay.to_vec()),
    ];
    if let Some(hdcp) = policy.hdcp {
        records.push(TlvRecord::new(tags::HDCP_ENFORCEMENT, hdcp.to_bytes().to_vec()));
    }
    let emitted: BTreeSet<u32> = records.iter().map(|r| r.tag).collect();
    records.extend(return_records(tlvs, policy, &emitted)?);

    let mut plaintext = emit_tlvs(&records);
    pad_to_block(&mut plaintext, fill_random)?;

    let ckc_iv = generate_iv()?;
    let ciphertext = aes128_cbc_encrypt(&session.r1_key, &ckc_iv, &plaintext)?;
    debug!(records = records.len(), payload_len = ciphertext.len(), "CKC assembled");

    Ok(CkcContainer::new(*ckc_iv.as_bytes(), ciphertext).to_bytes())
}

fn check_protocol_version(tlvs: &TlvSet) -> Result<(), KsmError> {
    let Some(used) = tlvs.get(tags::PROTOCOL_VERSION_USED) else {
        return Ok(());
    };
    let used = match decode_u32_list(tags::PROTOCOL_VERSION_USED, used)?.as_slice() {
        [version] => *version,
        _ => {
            return Err(KsmError::MalformedSpc(
                "ProtocolVersionUsed must hold one version".into(),
            ))
        }
    };
    if !SUPPORTED_PROTOCOL_VERSIONS.contains(&used) {
        return Err(KsmError::MalformedSpc(format!(
            "protocol version {used} is not supported"
        )));
    }

    let mut advertised = Vec::new();
    for value in tlvs.get_all(tags::PROTOCOL_VERSIONS_SUPPORTED) {
        advertised.extend(decode_u32_list(tags::PROTOCOL_VERSIONS_SUPPORTED, value)?);
    }
    if !advertised.is_empty() && !advertised.contains(&used) {
        return Err(KsmError::MalformedSpc(format!(
            "protocol version {used} is not among the versions the device supports"
        )));
    }
    Ok(())
}

/// AssetID from the SPC, falling back to the request hint
fn resolve_asset_id<'a>(tlvs: &'a TlvSet, hint: Option<&'a [u8]>) -> Result<&'a [u8], KsmError> {
    let asset_id = match (tlvs.get(tags::ASSET_ID), hint) {
        (Some(from_spc), Some(hint)) => {
            if from_spc != hint {
                warn!("request assetID differs from the SPC AssetID; using the SPC value");
            }
            from_spc
        }
        (Some(from_spc), None) => from_spc,
        (None, Some(hint)) => hint,
        (None, None) => return Err(KsmError::MalformedSpc("no AssetID in SPC or request".into())),
    };
    if asset_id.is_empty() || asset_id.len() > MAX_ASSET_ID_LEN {
        return Err(KsmError::MalformedSpc(format!(
            "AssetID must be 1 to {MAX_ASSET_ID_LEN} bytes, got {}",
            asset_id.len()
        )));
    }
    Ok(asset_id)
}

/// Records answering the device's ReturnTLVs request
///
/// Fails closed: a requested tag without a policy value or an allowed echo
/// rejects the SPC.
fn return_records(
    tlvs: &TlvSet,
    policy: &LicensePolicy,
    emitted: &BTreeSet<u32>,
) -> Result<Vec<TlvRecord>, KsmError> {
    let mut requested = Vec::new();
    for value in tlvs.get_all(tags::RETURN_TLVS) {
        for tag in decode_u32_list(tags::RETURN_TLVS, value)? {
            if !requested.contains(&tag) {
                requested.push(tag);
            }
        }
    }

    let mut records = Vec::new();
    for tag in requested {
        if emitted.contains(&tag) {
            continue;
        }
        if let Some(value) = policy.return_values.get(&tag) {
            records.push(TlvRecord::new(tag, value.clone()));
        } else if let Some(value) = tlvs.get(tag).filter(|_| policy.echo_tags.contains(&tag)) {
            records.push(TlvRecord::new(tag, value));
        } else {
            return Err(KsmError::MalformedSpc(format!(
                "return of TLV {} is not permitted",
                describe(tag)
            )));
        }
    }
    Ok(records)
}
