//! # Skyfeed Test
//!
//! In-memory testing for skyfeed feed generators. Requests are handed
//! directly to [`Server::dispatch`](skyfeed_server::Server::dispatch), so a
//! test sees exactly what a client would, without binding a port.
//!
//! - [`TestClient`] - wraps a built server, with shortcuts for each endpoint
//! - [`TestRequestBuilder`] - query, header and body building
//! - [`TestResponse`] - buffered response with assertion helpers
//! - [`unsigned_jwt`] - bearer tokens carrying only an issuer DID
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use serde_json::json;
//! use skyfeed_core::{FeedArgs, FeedHandle, FeedPage};
//! use skyfeed_server::{FeedSettings, Server};
//! use skyfeed_test::TestClient;
//!
//! # tokio_test::block_on(async {
//! let server = Server::builder()
//!     .settings(FeedSettings::new("did:plc:pub", "feeds.example.com"))
//!     .feed("hot", FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())))
//!     .build()
//!     .unwrap();
//! let client = TestClient::new(server);
//!
//! client
//!     .feed_skeleton("hot")
//!     .send()
//!     .await
//!     .assert_status(StatusCode::OK)
//!     .assert_json_eq(&json!({"feed": []}));
//!
//! client
//!     .feed_skeleton("cold")
//!     .send()
//!     .await
//!     .assert_error(StatusCode::BAD_REQUEST, "UnsupportedAlgorithm");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/skyfeed-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{unsigned_jwt, TestRequest, TestRequestBuilder};
pub use response::TestResponse;
