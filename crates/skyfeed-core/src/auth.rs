//! Bearer token decoding.
//!
//! Extracts the `iss` claim from an `Authorization: Bearer <jwt>` header.
//!
//! **The token signature is not verified.** The issuer DID returned here is
//! whatever the caller claims, and must not be used for anything that needs
//! real authentication.

use crate::error::AuthError;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::Value;

/// Scheme prefix of a bearer `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Returns the raw token of a bearer `Authorization` header.
///
/// `Ok(None)` means there is no credential (absent or blank header).
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAuthMethod`] if the header does not use
/// the `Bearer` scheme.
pub fn bearer_token(header: Option<&str>) -> Result<Option<&str>, AuthError> {
    let Some(header) = header.filter(|h| !h.trim().is_empty()) else {
        return Ok(None);
    };

    header
        .strip_prefix(BEARER_PREFIX)
        .map(Some)
        .ok_or(AuthError::UnsupportedAuthMethod)
}

/// Decodes the issuer DID claimed by a bearer `Authorization` header.
///
/// # Example
///
/// ```
/// use skyfeed_core::auth::decode_issuer;
///
/// let header = "Bearer eyJhbGciOiJub25lIn0.eyJpc3MiOiJkaWQ6cGxjOmFsaWNlIn0.c2ln";
/// assert_eq!(decode_issuer(Some(header)), Ok(Some("did:plc:alice".to_string())));
/// assert_eq!(decode_issuer(None), Ok(None));
/// ```
///
/// # Errors
///
/// - [`AuthError::UnsupportedAuthMethod`] for non-bearer schemes
/// - [`AuthError::BadJwt`] if the token is not three dot-separated segments,
///   the payload is not base64 encoded JSON, or `iss` is not a string
pub fn decode_issuer(header: Option<&str>) -> Result<Option<String>, AuthError> {
    let Some(token) = bearer_token(header)? else {
        return Ok(None);
    };

    // Trailing empty segments do not count.
    let segments: Vec<&str> = token.trim_end_matches('.').split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(AuthError::BadJwt);
    };

    let bytes = decode_segment(payload).ok_or(AuthError::BadJwt)?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| AuthError::BadJwt)?;

    let Value::Object(claims) = claims else {
        return Err(AuthError::BadJwt);
    };

    match claims.get("iss") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(iss)) => Ok(Some(iss.clone())),
        Some(_) => Err(AuthError::BadJwt),
    }
}

// Tokens in the wild use both alphabets, with or without padding.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let unpadded = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(unpadded)
        .or_else(|_| STANDARD_NO_PAD.decode(unpadded))
        .ok()
}
