//! Request context types.
//!
//! A [`RequestContext`] wraps one inbound HTTP request and is handed to
//! context-aware feed algorithms and interaction handlers. Its caller
//! identity is decoded lazily, at most once per request.

use crate::auth;
use crate::error::AuthError;
use http::header::AUTHORIZATION;
use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps request IDs sortable in logs.
///
/// # Example
///
/// ```
/// use skyfeed_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request view of an inbound HTTP request.
///
/// The context exposes the request method, URI and headers, plus the
/// caller identity derived from the `Authorization` header. The identity is
/// decoded on first access and the outcome (including a failure) is reused
/// for the rest of the request.
///
/// # Example
///
/// ```
/// use http::{HeaderMap, Method, Uri};
/// use skyfeed_core::RequestContext;
///
/// let ctx = RequestContext::new(
///     Method::GET,
///     Uri::from_static("/xrpc/app.bsky.feed.getFeedSkeleton"),
///     HeaderMap::new(),
/// );
/// assert_eq!(ctx.issuer_did(), Ok(None));
/// ```
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    issuer: OnceLock<Result<Option<String>, AuthError>>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context for a request with a fresh request ID.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            uri,
            headers,
            issuer: OnceLock::new(),
            started_at: Instant::now(),
        }
    }

    /// Creates an anonymous `GET /` context, for tests and examples.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(Method::GET, Uri::from_static("/"), HeaderMap::new())
    }

    /// Replaces the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns `true` if the request carries an `Authorization` header.
    #[must_use]
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Returns the DID of the caller, as claimed by the bearer token.
    ///
    /// The token signature is **not** verified. `Ok(None)` means the request
    /// is anonymous (no header, or a token without an `iss` claim).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnsupportedAuthMethod`] for non-bearer schemes
    /// and [`AuthError::BadJwt`] for undecodable tokens.
    pub fn issuer_did(&self) -> Result<Option<&str>, AuthError> {
        match self.issuer.get_or_init(|| self.decode_issuer()) {
            Ok(did) => Ok(did.as_deref()),
            Err(error) => Err(*error),
        }
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn decode_issuer(&self) -> Result<Option<String>, AuthError> {
        match self.headers.get(AUTHORIZATION) {
            None => Ok(None),
            Some(value) => {
                let header = value
                    .to_str()
                    .map_err(|_| AuthError::UnsupportedAuthMethod)?;
                auth::decode_issuer(Some(header))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    // {"alg":"none"}.{"iss":"did:plc:alice"}.sig
    const ALICE_TOKEN: &str = "Bearer eyJhbGciOiJub25lIn0.eyJpc3MiOiJkaWQ6cGxjOmFsaWNlIn0.c2ln";

    fn context_with_auth(value: &'static str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        RequestContext::new(Method::GET, Uri::from_static("/"), headers)
    }

    #[test]
    fn test_request_id_unique() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_request_id_display() {
        let uuid = Uuid::now_v7();
        let id = RequestId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn test_anonymous_without_header() {
        let ctx = RequestContext::mock();
        assert!(!ctx.has_authorization());
        assert_eq!(ctx.issuer_did(), Ok(None));
    }

    #[test]
    fn test_issuer_from_bearer_token() {
        let ctx = context_with_auth(ALICE_TOKEN);
        assert!(ctx.has_authorization());
        assert_eq!(ctx.issuer_did(), Ok(Some("did:plc:alice")));
    }

    #[test]
    fn test_issuer_decoded_once() {
        let ctx = context_with_auth(ALICE_TOKEN);
        let first = ctx.issuer_did().unwrap().unwrap();
        let second = ctx.issuer_did().unwrap().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_failure_is_memoized() {
        let ctx = context_with_auth("Basic dXNlcjpwYXNz");
        assert_eq!(ctx.issuer_did(), Err(AuthError::UnsupportedAuthMethod));
        assert_eq!(ctx.issuer_did(), Err(AuthError::UnsupportedAuthMethod));
    }

    #[test]
    fn test_non_ascii_header_is_unsupported() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );
        let ctx = RequestContext::new(Method::GET, Uri::from_static("/"), headers);
        assert_eq!(ctx.issuer_did(), Err(AuthError::UnsupportedAuthMethod));
    }

    #[test]
    fn test_with_request_id() {
        let id = RequestId::new();
        let ctx = RequestContext::mock().with_request_id(id);
        assert_eq!(ctx.request_id(), id);
        assert_eq!(ctx.method(), Method::GET);
        assert_eq!(ctx.uri().path(), "/");
    }
}
