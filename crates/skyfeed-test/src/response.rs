//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// A buffered response with helper methods for assertions.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an HTTP response.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: BodyExt,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Creates a test response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    ///
    /// ```ignore
    /// let skeleton: SkeletonResponse = response.json()?;
    /// assert_eq!(skeleton.cursor.as_deref(), Some("c1"));
    /// ```
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        serde_json::from_slice(&self.body).map_err(TestError::Json)
    }

    /// Deserializes the body as a JSON Value.
    pub fn json_value(&self) -> Result<serde_json::Value, TestError> {
        self.json()
    }

    /// Returns the `error` field of an XRPC error body, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<String> {
        let value = self.json_value().ok()?;
        value.get("error")?.as_str().map(ToString::to_string)
    }

    // Assertion methods

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {} with body {}",
            expected,
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that the response is successful (2xx).
    ///
    /// # Panics
    ///
    /// Panics if the status is not 2xx.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.is_success(),
            "Expected success status, got {} with body {}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts the status and the `error` code of an XRPC error body.
    ///
    /// # Panics
    ///
    /// Panics if either doesn't match.
    pub fn assert_error(&self, status: StatusCode, code: &str) -> &Self {
        self.assert_status(status);
        let actual = self.error_code();
        assert_eq!(
            actual.as_deref(),
            Some(code),
            "Error code mismatch in body {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(
            actual, expected,
            "Header '{}': expected '{}', got '{}'",
            name, expected, actual
        );
        self
    }

    /// Asserts that the body is JSON with the XRPC content type.
    ///
    /// # Panics
    ///
    /// Panics if Content-Type is not JSON.
    pub fn assert_json_content_type(&self) -> &Self {
        let actual = self
            .content_type()
            .unwrap_or_else(|| panic!("Content-Type header not found"));
        assert!(
            actual.starts_with("application/json"),
            "Content-Type: expected JSON, got '{actual}'"
        );
        self
    }

    /// Asserts that the body contains the expected substring.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't contain the substring.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            body.contains(expected),
            "Body should contain '{expected}', got: {body}"
        );
        self
    }

    /// Asserts that the JSON body matches the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the JSON doesn't match.
    pub fn assert_json_eq(&self, expected: &serde_json::Value) -> &Self {
        let actual = self.parsed();
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts that a JSON field exists and equals the expected value.
    ///
    /// Paths are dot-separated; numeric segments index arrays, as in
    /// `feed.0.post`.
    ///
    /// # Panics
    ///
    /// Panics if the field doesn't exist or doesn't match.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &serde_json::Value) -> &Self {
        let path = path.as_ref();
        let json = self.parsed();
        let actual = json_path(&json, path)
            .unwrap_or_else(|| panic!("JSON path '{path}' not found in: {json}"));
        assert_eq!(
            actual, expected,
            "JSON field '{}': expected {}, got {}",
            path, expected, actual
        );
        self
    }

    /// Asserts that a JSON field is absent.
    ///
    /// # Panics
    ///
    /// Panics if the field exists.
    pub fn assert_json_missing(&self, path: impl AsRef<str>) -> &Self {
        let path = path.as_ref();
        let json = self.parsed();
        assert!(
            json_path(&json, path).is_none(),
            "JSON path '{path}' should be absent in: {json}"
        );
        self
    }

    fn parsed(&self) -> serde_json::Value {
        match self.json_value() {
            Ok(value) => value,
            Err(e) => panic!(
                "Body should be valid JSON ({e}): {}",
                String::from_utf8_lossy(&self.body)
            ),
        }
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match segment.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_response(status: StatusCode, body: &serde_json::Value) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        TestResponse::new(status, headers, Bytes::from(body.to_string()))
    }

    #[test]
    fn test_status_helpers() {
        let response = json_response(StatusCode::OK, &json!({"feed": []}));
        assert_eq!(response.status_code(), 200);
        assert!(response.is_success());
        response.assert_success().assert_json_content_type();
    }

    #[test]
    fn test_error_code() {
        let response = json_response(
            StatusCode::BAD_REQUEST,
            &json!({"error": "UnsupportedAlgorithm", "message": "Unsupported algorithm"}),
        );

        assert_eq!(response.error_code().as_deref(), Some("UnsupportedAlgorithm"));
        response.assert_error(StatusCode::BAD_REQUEST, "UnsupportedAlgorithm");
    }

    #[test]
    fn test_json_path() {
        let response = json_response(
            StatusCode::OK,
            &json!({"feed": [{"post": "at://did:plc:a/app.bsky.feed.post/b"}]}),
        );

        response
            .assert_json_field("feed.0.post", &json!("at://did:plc:a/app.bsky.feed.post/b"))
            .assert_json_missing("feed.0.reason")
            .assert_json_missing("cursor");
    }

    #[test]
    #[should_panic(expected = "Expected status")]
    fn test_assert_status_panics() {
        let response = json_response(StatusCode::NOT_FOUND, &json!({"error": "NotFound"}));
        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_from_http() {
        let response = http::Response::builder()
            .status(StatusCode::CREATED)
            .header("x-test", "1")
            .body(http_body_util::Full::new(Bytes::from_static(b"{}")))
            .unwrap();

        let response = TestResponse::from_http(response).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.header_str("x-test"), Some("1"));
        assert_eq!(response.text().unwrap(), "{}");
    }
}
