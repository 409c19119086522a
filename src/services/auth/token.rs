//! Compact token (`header.payload.signature`) payload decoding.
//!
//! Only the payload segment is read. Nothing here checks the signature; callers
//! must run a `TokenVerifier` first if they intend to trust the claims.
use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Decoded claim set. The shape differs per provider and token type, so it stays generic.
pub type ClaimPayload = Map<String, Value>;

// Providers emit unpadded base64url, but padded input is accepted as well.
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token: expected 2 or 3 '.'-separated segments, got {segments}")]
    MalformedToken { segments: usize },

    #[error("token payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("token payload could not be parsed: {0}")]
    Parse(#[from] PayloadParseError),
}

#[derive(Debug, Error)]
pub enum PayloadParseError {
    #[error("not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Decode the payload segment of a compact token into a claim map.
pub fn decode_payload(token: &str) -> Result<ClaimPayload, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    // header.payload (unsigned) or header.payload.signature. JWE (5 segments) is not supported.
    if !(2..=3).contains(&segments.len()) {
        return Err(TokenError::MalformedToken {
            segments: segments.len(),
        });
    }

    let bytes = decode_segment(segments[1])?;
    let text = std::str::from_utf8(&bytes).map_err(PayloadParseError::from)?;

    match serde_json::from_str::<Value>(text).map_err(PayloadParseError::from)? {
        Value::Object(claims) => Ok(claims),
        other => Err(PayloadParseError::NotAnObject(value_kind(&other)).into()),
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    // Report the base64url error: that is the alphabet the token format mandates.
    URL_SAFE_LENIENT
        .decode(segment)
        .or_else(|err| STANDARD_LENIENT.decode(segment).map_err(|_| err))
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::unsigned_token;
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_payload_segment_as_claims() {
        let claims = json!({
            "sub": "f3c1",
            "resource_access": { "app-demo": { "roles": ["user", "admin"] } }
        });

        let decoded = decode_payload(&unsigned_token(&claims)).unwrap();

        assert_eq!(decoded["sub"], "f3c1");
        assert_eq!(decoded["resource_access"]["app-demo"]["roles"][1], "admin");
    }

    #[test]
    fn re_encoding_decoded_claims_is_content_equivalent() {
        let claims = json!({
            "exp": 1_700_000_000,
            "nested": { "list": [1, "two", null, { "k": true }] },
            "azp": "app-demo"
        });

        let decoded = decode_payload(&unsigned_token(&claims)).unwrap();
        let again = decode_payload(&unsigned_token(&Value::Object(decoded.clone()))).unwrap();

        assert_eq!(Value::Object(decoded.clone()), claims);
        assert_eq!(decoded, again);
    }

    #[test]
    fn token_without_dots_is_malformed() {
        let err = decode_payload("abc").unwrap_err();
        assert!(matches!(err, TokenError::MalformedToken { segments: 1 }));
    }

    #[test]
    fn empty_token_is_malformed() {
        let err = decode_payload("").unwrap_err();
        assert!(matches!(err, TokenError::MalformedToken { segments: 1 }));
    }

    #[test]
    fn encrypted_token_shape_is_malformed() {
        let err = decode_payload("a.b.c.d.e").unwrap_err();
        assert!(matches!(err, TokenError::MalformedToken { segments: 5 }));
    }

    #[test]
    fn two_segment_token_is_accepted() {
        // {"sub":"x"}
        let decoded = decode_payload("eyJhbGciOiJub25lIn0.eyJzdWIiOiJ4In0").unwrap();
        assert_eq!(decoded["sub"], "x");
    }

    #[test]
    fn invalid_base64_payload_is_a_decode_error() {
        let err = decode_payload("header.####.sig").unwrap_err();
        assert!(matches!(err, TokenError::Decode(_)));
    }

    #[test]
    fn padded_and_standard_alphabet_payloads_are_tolerated() {
        // {"sub": "??>"} in the standard alphabet, with padding
        let decoded = decode_payload("h.eyJzdWIiOiAiPz8+In0=.s").unwrap();
        assert_eq!(decoded["sub"], "??>");

        // same claims, base64url with padding
        let decoded = decode_payload("h.eyJzdWIiOiAiPz8-In0=.s").unwrap();
        assert_eq!(decoded["sub"], "??>");
    }

    #[test]
    fn non_json_payload_is_a_parse_error() {
        // "not json"
        let err = decode_payload("h.bm90IGpzb24.s").unwrap_err();
        assert!(matches!(err, TokenError::Parse(PayloadParseError::Json(_))));
    }

    #[test]
    fn non_utf8_payload_is_a_parse_error() {
        // 0xff 0xfe
        let err = decode_payload("h.__4.s").unwrap_err();
        assert!(matches!(err, TokenError::Parse(PayloadParseError::Utf8(_))));
    }

    #[test]
    fn empty_payload_segment_is_a_parse_error() {
        let err = decode_payload("h..s").unwrap_err();
        assert!(matches!(err, TokenError::Parse(PayloadParseError::Json(_))));
    }

    #[test]
    fn json_array_payload_is_rejected() {
        // ["admin"]
        let err = decode_payload("h.WyJhZG1pbiJd.s").unwrap_err();
        assert!(matches!(
            err,
            TokenError::Parse(PayloadParseError::NotAnObject("array"))
        ));
    }
}
