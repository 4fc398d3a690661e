//! License request and response envelopes
//!
//! Clients post the SPC as base64 inside either a JSON object
//! (`{"spc": "...", "assetID": "..."}`) or a form body
//! (`spc=...&assetID=...`). Players disagree about the base64 alphabet, so
//! the variant is detected per request and the CKC is returned in the same
//! variant.
//!
//! Variant detection, first match wins:
//!
//! | Rule | Variant |
//! |---|---|
//! | `Content-Transfer-Encoding: base64url` | URL-safe |
//! | `Content-Transfer-Encoding: base64` | standard |
//! | text contains `-` or `_` | URL-safe |
//! | text contains `+` or `/` | standard |
//! | text contains a space | standard, spaces read as `+` |
//! | otherwise | standard |

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

const JSON_MEDIA_TYPE: &str = "application/json";
const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

const DECODE_CONFIG: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_DECODE: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, DECODE_CONFIG);
const URL_SAFE_DECODE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, DECODE_CONFIG);

/// Errors decoding a license request body
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("spc is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("spc is missing or empty")]
    MissingSpc,
}

/// Base64 alphabet used by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base64Variant {
    Standard,
    UrlSafe,
}

impl Base64Variant {
    /// Apply the detection table to `text`, preferring the transfer encoding hint
    pub fn detect(text: &str, transfer_encoding: Option<&str>) -> Self {
        match transfer_encoding.map(|h| h.trim().to_ascii_lowercase()).as_deref() {
            Some("base64url") => return Self::UrlSafe,
            Some("base64") => return Self::Standard,
            _ => {}
        }
        if text.contains(['-', '_']) {
            Self::UrlSafe
        } else {
            Self::Standard
        }
    }

    pub fn decode(self, text: &str) -> Result<Vec<u8>, EnvelopeError> {
        let cleaned: String = text
            .chars()
            .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
            .collect();
        let bytes = match self {
            Self::UrlSafe => URL_SAFE_DECODE.decode(cleaned)?,
            Self::Standard => STANDARD_DECODE.decode(cleaned.replace(' ', "+"))?,
        };
        Ok(bytes)
    }

    /// Encode with padding
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::UrlSafe => base64::engine::general_purpose::URL_SAFE.encode(bytes),
            Self::Standard => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Body encoding of a request or response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Form,
}

impl BodyFormat {
    /// How to parse a request body
    ///
    /// Declared JSON and form bodies are taken at their word; anything else
    /// is sniffed for a leading `{`.
    pub fn for_request(content_type: Option<&str>, body: &[u8]) -> Self {
        match content_type.map(media_type).as_deref() {
            Some(JSON_MEDIA_TYPE) => Self::Json,
            Some(FORM_MEDIA_TYPE) => Self::Form,
            _ if body.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') => Self::Json,
            _ => Self::Form,
        }
    }

    /// How to format the response to a request with this `Content-Type`
    pub fn for_response(content_type: Option<&str>) -> Self {
        match content_type.map(media_type).as_deref() {
            Some(JSON_MEDIA_TYPE) => Self::Json,
            _ => Self::Form,
        }
    }
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Deserialize)]
struct RequestBody {
    #[serde(default)]
    spc: Option<String>,
    #[serde(rename = "assetID", default)]
    asset_id: Option<String>,
}

/// A decoded license request
#[derive(Debug)]
pub struct LicenseEnvelope {
    pub spc: Vec<u8>,
    /// AssetID supplied next to the SPC, if non-empty
    pub asset_id: Option<Vec<u8>>,
    pub variant: Base64Variant,
    pub response_format: BodyFormat,
}

impl LicenseEnvelope {
    /// Decode a request body
    ///
    /// `content_type` and `transfer_encoding` are the raw header values.
    pub fn parse(
        content_type: Option<&str>,
        transfer_encoding: Option<&str>,
        body: &[u8],
    ) -> Result<Self, EnvelopeError> {
        let fields: RequestBody = match BodyFormat::for_request(content_type, body) {
            BodyFormat::Json => serde_json::from_slice(body)?,
            BodyFormat::Form => serde_urlencoded::from_bytes(body)?,
        };

        let text = fields
            .spc
            .filter(|s| !s.trim().is_empty())
            .ok_or(EnvelopeError::MissingSpc)?;
        let variant = Base64Variant::detect(&text, transfer_encoding);
        let spc = variant.decode(&text)?;

        Ok(Self {
            spc,
            asset_id: fields
                .asset_id
                .filter(|a| !a.is_empty())
                .map(String::into_bytes),
            variant,
            response_format: BodyFormat::for_response(content_type),
        })
    }

    /// Encode a CKC as the response to this request
    pub fn respond(&self, ckc: &[u8]) -> LicenseResponse {
        let encoded = self.variant.encode(ckc);
        match self.response_format {
            BodyFormat::Json => LicenseResponse {
                content_type: JSON_MEDIA_TYPE,
                body: serde_json::json!({ "ckc": encoded }).to_string(),
            },
            BodyFormat::Form => LicenseResponse {
                content_type: FORM_MEDIA_TYPE,
                body: format!("<ckc>{encoded}</ckc>"),
            },
        }
    }
}

/// Successful response body and its content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseResponse {
    pub content_type: &'static str,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0xfb 0xff 0xfe encodes to "+//+" standard and "-__-" URL-safe
    const SAMPLE: [u8; 3] = [0xfb, 0xff, 0xfe];

    #[test]
    fn test_detection_table() {
        assert_eq!(Base64Variant::detect("ab-c", None), Base64Variant::UrlSafe);
        assert_eq!(Base64Variant::detect("ab_c", None), Base64Variant::UrlSafe);
        assert_eq!(Base64Variant::detect("ab+c", None), Base64Variant::Standard);
        assert_eq!(Base64Variant::detect("ab/c", None), Base64Variant::Standard);
        assert_eq!(Base64Variant::detect("ab c", None), Base64Variant::Standard);
        assert_eq!(Base64Variant::detect("abcd", None), Base64Variant::Standard);
    }

    #[test]
    fn test_transfer_encoding_hint_wins() {
        assert_eq!(
            Base64Variant::detect("abcd", Some("base64url")),
            Base64Variant::UrlSafe
        );
        assert_eq!(
            Base64Variant::detect("ab_c", Some("Base64")),
            Base64Variant::Standard
        );
        assert_eq!(
            Base64Variant::detect("ab_c", Some("gzip")),
            Base64Variant::UrlSafe
        );
    }

    #[test]
    fn test_decode_variants() {
        assert_eq!(Base64Variant::Standard.decode("+//+").unwrap(), SAMPLE);
        assert_eq!(Base64Variant::UrlSafe.decode("-__-").unwrap(), SAMPLE);
        // form decoding turns '+' into ' '
        assert_eq!(Base64Variant::Standard.decode(" // ").unwrap(), SAMPLE);
    }

    #[test]
    fn test_padding_is_optional() {
        assert_eq!(Base64Variant::Standard.decode("AAE=").unwrap(), [0, 1]);
        assert_eq!(Base64Variant::Standard.decode("AAE").unwrap(), [0, 1]);
        assert_eq!(Base64Variant::UrlSafe.decode("AAE").unwrap(), [0, 1]);
    }

    #[test]
    fn test_encode_keeps_variant_and_padding() {
        assert_eq!(Base64Variant::Standard.encode(&SAMPLE), "+//+");
        assert_eq!(Base64Variant::UrlSafe.encode(&SAMPLE), "-__-");
        assert_eq!(Base64Variant::UrlSafe.encode(&[0, 1]), "AAE=");
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            Base64Variant::Standard.decode("a*b="),
            Err(EnvelopeError::Base64(_))
        ));
    }

    #[test]
    fn test_parse_json() {
        let env = LicenseEnvelope::parse(
            Some("application/json"),
            None,
            br#"{"spc": "-__-", "assetID": "track-01"}"#,
        )
        .unwrap();
        assert_eq!(env.spc, SAMPLE);
        assert_eq!(env.asset_id.as_deref(), Some(&b"track-01"[..]));
        assert_eq!(env.variant, Base64Variant::UrlSafe);
        assert_eq!(env.response_format, BodyFormat::Json);
    }

    #[test]
    fn test_parse_form() {
        let env = LicenseEnvelope::parse(
            Some("application/x-www-form-urlencoded"),
            None,
            b"spc=%2B%2F%2F%2B&assetID=",
        )
        .unwrap();
        assert_eq!(env.spc, SAMPLE);
        assert_eq!(env.asset_id, None);
        assert_eq!(env.response_format, BodyFormat::Form);
    }

    #[test]
    fn test_parse_form_with_literal_plus() {
        // an unescaped '+' arrives as a space
        let env = LicenseEnvelope::parse(None, None, b"spc=+//+").unwrap();
        assert_eq!(env.spc, SAMPLE);
        assert_eq!(env.variant, Base64Variant::Standard);
    }

    #[test]
    fn test_sniff_json_without_content_type() {
        let env = LicenseEnvelope::parse(None, None, br#" {"spc":"AAE="}"#).unwrap();
        assert_eq!(env.spc, [0, 1]);
        assert_eq!(env.response_format, BodyFormat::Form);
    }

    #[test]
    fn test_content_type_parameters() {
        let env = LicenseEnvelope::parse(
            Some("Application/JSON; charset=utf-8"),
            None,
            br#"{"spc":"AAE="}"#,
        )
        .unwrap();
        assert_eq!(env.response_format, BodyFormat::Json);
    }

    #[test]
    fn test_missing_spc() {
        for body in [&br#"{"assetID":"a"}"#[..], &br#"{"spc":""}"#[..]] {
            let err = LicenseEnvelope::parse(Some("application/json"), None, body).unwrap_err();
            assert!(matches!(err, EnvelopeError::MissingSpc));
        }
        let err = LicenseEnvelope::parse(None, None, b"assetID=a").unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingSpc));
    }

    #[test]
    fn test_invalid_json() {
        let err = LicenseEnvelope::parse(Some("application/json"), None, b"{spc").unwrap_err();
        assert!(matches!(err, EnvelopeError::Json(_)));
    }

    #[test]
    fn test_respond_json() {
        let env = LicenseEnvelope::parse(Some("application/json"), None, br#"{"spc":"-__-"}"#)
            .unwrap();
        let response = env.respond(&SAMPLE);
        assert_eq!(response.content_type, "application/json");
        let value: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(value["ckc"], "-__-");
    }

    #[test]
    fn test_respond_form() {
        let env = LicenseEnvelope::parse(None, None, b"spc=AAE%3D").unwrap();
        let response = env.respond(&SAMPLE);
        assert_eq!(response.content_type, "application/x-www-form-urlencoded");
        assert_eq!(response.body, "<ckc>+//+</ckc>");
    }
}
