//! Test request building.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;

use crate::error::TestError;

/// A test request that can be sent to a [`TestClient`](crate::TestClient).
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(path: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, path)
    }

    /// Creates a new POST request.
    pub fn post(path: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, path)
    }
}

/// Builder for constructing test requests.
///
/// Invalid headers are remembered and reported by [`build`](Self::build),
/// so calls can be chained without intermediate results.
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, path: impl AsRef<str>) -> Self {
        Self {
            method,
            path: path.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Sets a header on the request, replacing any previous value.
    ///
    /// # Example
    ///
    /// ```
    /// use skyfeed_test::TestRequest;
    ///
    /// let request = TestRequest::get("/.well-known/did.json")
    ///     .header("X-Trace", "abc")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(request.headers["x-trace"], "abc");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.fail(TestError::InvalidHeader(e.to_string())),
            (_, Err(e)) => self.fail(TestError::InvalidHeader(e.to_string())),
        }
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.header(
            header::AUTHORIZATION.as_str(),
            format!("Bearer {}", token.as_ref()),
        )
    }

    /// Sets a bearer token whose payload carries `iss` as the issuer.
    ///
    /// The token is not signed; see [`unsigned_jwt`].
    pub fn issuer(self, issuer_did: impl AsRef<str>) -> Self {
        let token = unsigned_jwt(issuer_did.as_ref());
        self.bearer_token(token)
    }

    /// Appends a query parameter. Names and values are percent-encoded.
    pub fn query(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.query
            .push((name.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(TestError::Json(e)),
        }
        self.content_type("application/json")
    }

    /// Builds the test request.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let uri = if self.query.is_empty() {
            self.path
        } else {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            let separator = if self.path.contains('?') { '&' } else { '?' };
            format!("{}{separator}{}", self.path, query.join("&"))
        };

        let uri: Uri = uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI: {e}")))?;

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }

    fn fail(&mut self, error: TestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// Builds an unsigned JWT whose payload is `{"iss": <issuer_did>}`.
///
/// Feed generators decode the issuer without verifying the signature, so
/// this is enough to exercise authenticated feeds in tests.
#[must_use]
pub fn unsigned_jwt(issuer_did: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256K","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "iss": issuer_did }).to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
