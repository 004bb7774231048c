//! Request routing.
//!
//! A feed generator serves a fixed set of endpoints, so routing is an exact
//! match of the request path followed by a method check. A known path with
//! the wrong method is reported separately from an unknown path, which lets
//! the server answer `405` instead of `404`.
//!
//! # Example
//!
//! ```rust
//! use skyfeed_server::{Endpoint, RouteMatch, Router};
//! use http::Method;
//!
//! let router = Router::new();
//!
//! assert_eq!(
//!     router.match_route(&Method::GET, "/xrpc/app.bsky.feed.getFeedSkeleton"),
//!     RouteMatch::Found(Endpoint::GetFeedSkeleton)
//! );
//! assert_eq!(
//!     router.match_route(&Method::POST, "/.well-known/did.json"),
//!     RouteMatch::MethodNotAllowed
//! );
//! ```

use std::fmt;

use http::Method;

/// The endpoints served by a feed generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /xrpc/app.bsky.feed.getFeedSkeleton`
    GetFeedSkeleton,
    /// `GET /xrpc/app.bsky.feed.describeFeedGenerator`
    DescribeFeedGenerator,
    /// `GET /.well-known/did.json`
    DidDocument,
    /// `POST /xrpc/app.bsky.feed.sendInteractions`
    SendInteractions,
}

impl Endpoint {
    /// All endpoints, in routing order.
    pub const ALL: [Self; 4] = [
        Self::GetFeedSkeleton,
        Self::DescribeFeedGenerator,
        Self::DidDocument,
        Self::SendInteractions,
    ];

    /// Returns the request path of this endpoint.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::GetFeedSkeleton => "/xrpc/app.bsky.feed.getFeedSkeleton",
            Self::DescribeFeedGenerator => "/xrpc/app.bsky.feed.describeFeedGenerator",
            Self::DidDocument => "/.well-known/did.json",
            Self::SendInteractions => "/xrpc/app.bsky.feed.sendInteractions",
        }
    }

    /// Returns the HTTP method this endpoint accepts.
    #[must_use]
    pub fn method(self) -> Method {
        match self {
            Self::SendInteractions => Method::POST,
            Self::GetFeedSkeleton | Self::DescribeFeedGenerator | Self::DidDocument => Method::GET,
        }
    }

    /// Returns the short name used in logs and metric labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetFeedSkeleton => "getFeedSkeleton",
            Self::DescribeFeedGenerator => "describeFeedGenerator",
            Self::DidDocument => "didDocument",
            Self::SendInteractions => "sendInteractions",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of matching a request against the [`Router`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch {
    /// The request targets this endpoint.
    Found(Endpoint),
    /// The path is known but does not accept the request method.
    MethodNotAllowed,
    /// No endpoint has this path.
    NotFound,
}

/// Maps method and path to an [`Endpoint`].
#[derive(Debug, Clone)]
pub struct Router {
    endpoints: Vec<Endpoint>,
}

impl Router {
    /// Creates a router serving every [`Endpoint`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: Endpoint::ALL.to_vec(),
        }
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Matches a request.
    ///
    /// `HEAD` is served wherever `GET` is.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> RouteMatch {
        let Some(endpoint) = self.endpoints.iter().copied().find(|e| e.path() == path) else {
            return RouteMatch::NotFound;
        };

        let expected = endpoint.method();
        if *method == expected || (*method == Method::HEAD && expected == Method::GET) {
            RouteMatch::Found(endpoint)
        } else {
            RouteMatch::MethodNotAllowed
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
