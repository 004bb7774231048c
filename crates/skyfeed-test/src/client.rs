//! Test client for in-memory feed generator requests.

use std::sync::Arc;

use http::Method;
use serde::Serialize;
use skyfeed_server::{Endpoint, Server};

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// A test client that sends requests straight into a [`Server`].
///
/// Requests go through the same routing, timeout and error mapping as
/// requests served over TCP, without binding a port.
///
/// # Example
///
/// ```
/// use skyfeed_core::{FeedArgs, FeedHandle, FeedPage};
/// use skyfeed_server::{FeedSettings, Server};
/// use skyfeed_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let server = Server::builder()
///     .settings(FeedSettings::new("did:plc:pub", "feeds.example.com"))
///     .feed("hot", FeedHandle::from_fn(|_args: &FeedArgs| {
///         Ok(FeedPage::new().post("at://did:plc:abc/app.bsky.feed.post/xyz").into())
///     }))
///     .build()
///     .unwrap();
///
/// let client = TestClient::new(server);
/// let response = client.feed_skeleton("hot").send().await;
///
/// assert_eq!(response.status_code(), 200);
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    server: Arc<Server>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a test client for a built server.
    pub fn new(server: Server) -> Self {
        Self {
            server: Arc::new(server),
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the server under test.
    #[must_use]
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Starts a GET request.
    pub fn get(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, path)
    }

    /// Starts a POST request.
    pub fn post(&self, path: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, path)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, path: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, path);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    /// Starts a `getFeedSkeleton` request for a registered feed key.
    ///
    /// The `feed` parameter is the canonical feed URI for `key` under the
    /// server's publisher DID.
    pub fn feed_skeleton(&self, key: &str) -> TestClientRequest<'_> {
        let uri = self.feed_uri(key);
        self.get(Endpoint::GetFeedSkeleton.path()).query("feed", uri)
    }

    /// Returns the canonical feed URI for `key` on this server.
    #[must_use]
    pub fn feed_uri(&self, key: &str) -> String {
        self.server.service().resolver().feed_uri(key)
    }

    /// Starts a `describeFeedGenerator` request.
    pub fn describe_feed_generator(&self) -> TestClientRequest<'_> {
        self.get(Endpoint::DescribeFeedGenerator.path())
    }

    /// Starts a DID document request.
    pub fn did_document(&self) -> TestClientRequest<'_> {
        self.get(Endpoint::DidDocument.path())
    }

    /// Starts a `sendInteractions` request with a JSON body.
    pub fn send_interactions<T: Serialize>(&self, body: &T) -> TestClientRequest<'_> {
        self.post(Endpoint::SendInteractions.path()).json(body)
    }

    /// Sends a built request.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let response = self
            .server
            .dispatch(request.method, request.uri, request.headers, request.body)
            .await;
        TestResponse::from_http(response).await
    }
}

/// A request being built by a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Authenticates as `issuer_did` with an unsigned token.
    pub fn issuer(mut self, issuer_did: impl AsRef<str>) -> Self {
        self.builder = self.builder.issuer(issuer_did);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.query(name, value);
        self
    }

    /// Sets the cursor parameter.
    pub fn cursor(self, cursor: impl AsRef<str>) -> Self {
        self.query("cursor", cursor)
    }

    /// Sets the limit parameter.
    pub fn limit(self, limit: impl ToString) -> Self {
        self.query("limit", limit.to_string())
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets the request body as JSON.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built or the body could not be
    /// read. Use [`try_send`](Self::try_send) to handle these cases.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request and returns a Result.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::json;
    use skyfeed_core::{FeedArgs, FeedHandle, FeedPage, RequestContext};
    use skyfeed_server::FeedSettings;

    fn client() -> TestClient {
        let server = Server::builder()
            .settings(FeedSettings::new("did:plc:pub", "feeds.example.com"))
            .feed(
                "echo",
                FeedHandle::from_context_fn(|args: &FeedArgs, ctx: &RequestContext| {
                    let mut page = FeedPage::new().post("at://did:plc:abc/app.bsky.feed.post/xyz");
                    if let Some(cursor) = &args.cursor {
                        page = page.cursor(cursor.clone());
                    }
                    if let Some(did) = ctx.issuer_did()? {
                        page = page.req_id(did);
                    }
                    Ok(page.into())
                }),
            )
            .build()
            .unwrap();
        TestClient::new(server)
    }

    #[tokio::test]
    async fn test_feed_skeleton() {
        let response = client().feed_skeleton("echo").cursor("c1").send().await;

        response
            .assert_status(StatusCode::OK)
            .assert_json_content_type()
            .assert_json_field("cursor", &json!("c1"))
            .assert_json_missing("reqId");
    }

    #[tokio::test]
    async fn test_issuer_reaches_context() {
        let response = client()
            .feed_skeleton("echo")
            .issuer("did:example:alice")
            .send()
            .await;

        response.assert_json_field("reqId", &json!("did:example:alice"));
    }

    #[tokio::test]
    async fn test_default_headers() {
        let client = client().with_default_header("Authorization", "Basic abc");
        let response = client.feed_skeleton("echo").send().await;

        response.assert_error(StatusCode::UNAUTHORIZED, "AuthenticationRequired");
    }

    #[tokio::test]
    async fn test_documents() {
        let client = client();

        client
            .did_document()
            .send()
            .await
            .assert_json_field("id", &json!("did:web:feeds.example.com"));
        client
            .describe_feed_generator()
            .send()
            .await
            .assert_json_field(
                "feeds.0.uri",
                &json!("at://did:plc:pub/app.bsky.feed.generator/echo"),
            );
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let result = client().get("/").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        client()
            .post("/xrpc/app.bsky.feed.getPosts")
            .send()
            .await
            .assert_error(StatusCode::NOT_FOUND, "NotFound");
    }
}
