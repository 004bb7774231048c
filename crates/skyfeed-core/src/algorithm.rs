//! Feed algorithm traits.
//!
//! A feed algorithm turns a [`FeedArgs`] into a [`FeedOutput`]: a list of
//! post URIs, an optional cursor and an optional request ID. Algorithms come
//! in three calling conventions:
//!
//! - [`FeedAlgorithm`] takes the arguments only.
//! - [`ContextFeedAlgorithm`] also receives the [`RequestContext`], from
//!   which it may read the caller DID.
//! - [`LegacyFeedAlgorithm`] receives the caller DID, decoded up front.
//!   Served only when unsafe auth mode is enabled.
//!
//! Closures can be used for all three through [`FeedHandle::from_fn`],
//! [`FeedHandle::from_context_fn`] and [`FeedHandle::from_legacy_fn`].
//!
//! # Example
//!
//! ```
//! use skyfeed_core::{FeedArgs, FeedHandle, FeedPage};
//!
//! let handle = FeedHandle::from_fn(|args: &FeedArgs| {
//!     let mut page = FeedPage::new().post("at://did:plc:alice/app.bsky.feed.post/3kabc");
//!     if let Some(cursor) = &args.cursor {
//!         page = page.cursor(cursor.clone());
//!     }
//!     Ok(page.into())
//! });
//! ```

use crate::context::RequestContext;
use crate::error::FeedResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Arguments of a `getFeedSkeleton` request, as passed to algorithms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedArgs {
    /// The requested feed URI.
    pub feed: String,
    /// Opaque pagination cursor from a previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Maximum number of posts requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl FeedArgs {
    /// Creates arguments for the given feed URI.
    #[must_use]
    pub fn new(feed: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            cursor: None,
            limit: None,
        }
    }

    /// Sets the pagination cursor.
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Sets the page size limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Unvalidated value returned by a feed algorithm.
///
/// Algorithms may build it from raw JSON or from a typed [`FeedPage`]. The
/// output generator checks its shape before anything reaches the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOutput(Value);

impl FeedOutput {
    /// Wraps a raw JSON value.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Returns the raw JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the output and returns the raw JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for FeedOutput {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Why a post appears in a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostReason {
    /// The post was reposted; holds the URI of the repost record.
    Repost(String),
    /// The post is pinned to the top of the feed.
    Pin,
}

/// One post of a [`FeedPage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEntry {
    uri: String,
    reason: Option<PostReason>,
    context: Option<String>,
}

impl PostEntry {
    /// Creates an entry for the given post URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            reason: None,
            context: None,
        }
    }

    /// Sets the reason the post is included.
    #[must_use]
    pub fn with_reason(mut self, reason: PostReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Sets the opaque feed context echoed back in interactions.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn into_value(self) -> Value {
        if self.reason.is_none() && self.context.is_none() {
            return Value::String(self.uri);
        }

        let mut object = Map::new();
        object.insert("post".to_string(), Value::String(self.uri));
        match self.reason {
            Some(PostReason::Repost(repost)) => {
                object.insert("reason".to_string(), json!({ "repost": repost }));
            }
            Some(PostReason::Pin) => {
                object.insert("reason".to_string(), json!({ "pin": true }));
            }
            None => {}
        }
        if let Some(context) = self.context {
            object.insert("context".to_string(), Value::String(context));
        }
        Value::Object(object)
    }
}

/// Typed builder for a page of feed output.
///
/// # Example
///
/// ```
/// use skyfeed_core::{FeedOutput, FeedPage};
///
/// let output: FeedOutput = FeedPage::new()
///     .post("at://did:plc:alice/app.bsky.feed.post/3kabc")
///     .pinned("at://did:plc:alice/app.bsky.feed.post/3kpin")
///     .cursor("1700000000::3kabc")
///     .into();
/// assert!(output.as_value()["posts"].is_array());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    posts: Vec<PostEntry>,
    cursor: Option<String>,
    req_id: Option<String>,
}

impl FeedPage {
    /// Creates an empty page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plain post.
    #[must_use]
    pub fn post(self, uri: impl Into<String>) -> Self {
        self.entry(PostEntry::new(uri))
    }

    /// Appends a reposted post.
    #[must_use]
    pub fn repost(self, uri: impl Into<String>, repost_uri: impl Into<String>) -> Self {
        self.entry(PostEntry::new(uri).with_reason(PostReason::Repost(repost_uri.into())))
    }

    /// Appends a pinned post.
    #[must_use]
    pub fn pinned(self, uri: impl Into<String>) -> Self {
        self.entry(PostEntry::new(uri).with_reason(PostReason::Pin))
    }

    /// Appends an arbitrary entry.
    #[must_use]
    pub fn entry(mut self, entry: PostEntry) -> Self {
        self.posts.push(entry);
        self
    }

    /// Sets the cursor for the next page.
    #[must_use]
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Sets the request ID echoed back by clients in interactions.
    #[must_use]
    pub fn req_id(mut self, req_id: impl Into<String>) -> Self {
        self.req_id = Some(req_id.into());
        self
    }

    /// Returns the number of posts on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Returns `true` if the page has no posts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl From<FeedPage> for FeedOutput {
    fn from(page: FeedPage) -> Self {
        let posts: Vec<Value> = page.posts.into_iter().map(PostEntry::into_value).collect();

        let mut object = Map::new();
        object.insert("posts".to_string(), Value::Array(posts));
        if let Some(cursor) = page.cursor {
            object.insert("cursor".to_string(), Value::String(cursor));
        }
        if let Some(req_id) = page.req_id {
            object.insert("reqId".to_string(), Value::String(req_id));
        }
        Self(Value::Object(object))
    }
}

/// A feed algorithm that only needs the request arguments.
pub trait FeedAlgorithm: Send + Sync + 'static {
    /// Produces one page of the feed.
    fn get_posts(&self, args: &FeedArgs) -> FeedResult<FeedOutput>;
}

/// A feed algorithm that receives the request context.
///
/// This is the recommended convention for personalized feeds: the caller
/// DID is only decoded if the algorithm asks for it.
pub trait ContextFeedAlgorithm: Send + Sync + 'static {
    /// Produces one page of the feed.
    fn get_posts(&self, args: &FeedArgs, ctx: &RequestContext) -> FeedResult<FeedOutput>;
}

/// A feed algorithm that receives the caller DID directly.
///
/// The DID comes from an unverified token. Feeds of this kind are only
/// served when unsafe auth mode is enabled.
pub trait LegacyFeedAlgorithm: Send + Sync + 'static {
    /// Produces one page of the feed.
    fn get_posts(&self, args: &FeedArgs, issuer_did: Option<&str>) -> FeedResult<FeedOutput>;
}

struct FnFeed<F>(F);

impl<F> FeedAlgorithm for FnFeed<F>
where
    F: Fn(&FeedArgs) -> FeedResult<FeedOutput> + Send + Sync + 'static,
{
    fn get_posts(&self, args: &FeedArgs) -> FeedResult<FeedOutput> {
        (self.0)(args)
    }
}

struct FnContextFeed<F>(F);

impl<F> ContextFeedAlgorithm for FnContextFeed<F>
where
    F: Fn(&FeedArgs, &RequestContext) -> FeedResult<FeedOutput> + Send + Sync + 'static,
{
    fn get_posts(&self, args: &FeedArgs, ctx: &RequestContext) -> FeedResult<FeedOutput> {
        (self.0)(args, ctx)
    }
}

struct FnLegacyFeed<F>(F);

impl<F> LegacyFeedAlgorithm for FnLegacyFeed<F>
where
    F: Fn(&FeedArgs, Option<&str>) -> FeedResult<FeedOutput> + Send + Sync + 'static,
{
    fn get_posts(&self, args: &FeedArgs, issuer_did: Option<&str>) -> FeedResult<FeedOutput> {
        (self.0)(args, issuer_did)
    }
}

/// The calling convention of a registered feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    /// `get_posts(args)`.
    NoIdentity,
    /// `get_posts(args, ctx)`.
    ContextAware,
    /// `get_posts(args, issuer_did)`.
    LegacyIdentity,
}

impl CallingConvention {
    /// Returns a short name for logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoIdentity => "no-identity",
            Self::ContextAware => "context-aware",
            Self::LegacyIdentity => "legacy-identity",
        }
    }
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered feed algorithm, tagged with its calling convention.
#[derive(Clone)]
pub enum FeedHandle {
    /// See [`FeedAlgorithm`].
    NoIdentity(Arc<dyn FeedAlgorithm>),
    /// See [`ContextFeedAlgorithm`].
    ContextAware(Arc<dyn ContextFeedAlgorithm>),
    /// See [`LegacyFeedAlgorithm`].
    LegacyIdentity(Arc<dyn LegacyFeedAlgorithm>),
}

impl FeedHandle {
    /// Wraps a [`FeedAlgorithm`].
    pub fn no_identity(algorithm: impl FeedAlgorithm) -> Self {
        Self::NoIdentity(Arc::new(algorithm))
    }

    /// Wraps a [`ContextFeedAlgorithm`].
    pub fn context_aware(algorithm: impl ContextFeedAlgorithm) -> Self {
        Self::ContextAware(Arc::new(algorithm))
    }

    /// Wraps a [`LegacyFeedAlgorithm`].
    pub fn legacy_identity(algorithm: impl LegacyFeedAlgorithm) -> Self {
        Self::LegacyIdentity(Arc::new(algorithm))
    }

    /// Creates a no-identity feed from a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&FeedArgs) -> FeedResult<FeedOutput> + Send + Sync + 'static,
    {
        Self::no_identity(FnFeed(f))
    }

    /// Creates a context-aware feed from a closure.
    pub fn from_context_fn<F>(f: F) -> Self
    where
        F: Fn(&FeedArgs, &RequestContext) -> FeedResult<FeedOutput> + Send + Sync + 'static,
    {
        Self::context_aware(FnContextFeed(f))
    }

    /// Creates a legacy-identity feed from a closure.
    pub fn from_legacy_fn<F>(f: F) -> Self
    where
        F: Fn(&FeedArgs, Option<&str>) -> FeedResult<FeedOutput> + Send + Sync + 'static,
    {
        Self::legacy_identity(FnLegacyFeed(f))
    }

    /// Returns the calling convention of this feed.
    #[must_use]
    pub const fn convention(&self) -> CallingConvention {
        match self {
            Self::NoIdentity(_) => CallingConvention::NoIdentity,
            Self::ContextAware(_) => CallingConvention::ContextAware,
            Self::LegacyIdentity(_) => CallingConvention::LegacyIdentity,
        }
    }

    /// Returns `true` if both handles wrap the same algorithm instance.
    #[must_use]
    pub fn same_algorithm(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NoIdentity(a), Self::NoIdentity(b)) => Arc::ptr_eq(a, b),
            (Self::ContextAware(a), Self::ContextAware(b)) => Arc::ptr_eq(a, b),
            (Self::LegacyIdentity(a), Self::LegacyIdentity(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FeedHandle")
            .field(&self.convention())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = "at://did:plc:alice/app.bsky.feed.post/3kabc";

    #[test]
    fn test_feed_args_builder() {
        let args = FeedArgs::new("at://did:plc:pub/app.bsky.feed.generator/hot")
            .with_cursor("c1")
            .with_limit(10);
        assert_eq!(args.cursor.as_deref(), Some("c1"));
        assert_eq!(args.limit, Some(10));
    }

    #[test]
    fn test_feed_page_plain_posts() {
        let output: FeedOutput = FeedPage::new().post(POST).into();
        assert_eq!(output.into_value(), json!({ "posts": [POST] }));
    }

    #[test]
    fn test_feed_page_structured_posts() {
        let page = FeedPage::new()
            .repost(POST, "at://did:plc:bob/app.bsky.feed.repost/3krep")
            .pinned(POST)
            .entry(PostEntry::new(POST).with_context("ctx-1"))
            .cursor("next")
            .req_id("r-1");
        assert_eq!(page.len(), 3);

        let output: FeedOutput = page.into();
        assert_eq!(
            output.into_value(),
            json!({
                "posts": [
                    { "post": POST, "reason": { "repost": "at://did:plc:bob/app.bsky.feed.repost/3krep" } },
                    { "post": POST, "reason": { "pin": true } },
                    { "post": POST, "context": "ctx-1" },
                ],
                "cursor": "next",
                "reqId": "r-1",
            })
        );
    }

    #[test]
    fn test_handle_conventions() {
        let plain = FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into()));
        let ctx_aware =
            FeedHandle::from_context_fn(|_args: &FeedArgs, _ctx: &RequestContext| {
                Ok(FeedPage::new().into())
            });
        let legacy = FeedHandle::from_legacy_fn(|_args: &FeedArgs, _did: Option<&str>| {
            Ok(FeedPage::new().into())
        });

        assert_eq!(plain.convention(), CallingConvention::NoIdentity);
        assert_eq!(ctx_aware.convention(), CallingConvention::ContextAware);
        assert_eq!(legacy.convention(), CallingConvention::LegacyIdentity);
    }

    #[test]
    fn test_closure_receives_args() {
        let handle = FeedHandle::from_fn(|args: &FeedArgs| {
            let limit = args.limit.unwrap_or(0) as usize;
            let mut page = FeedPage::new();
            for _ in 0..limit {
                page = page.post(POST);
            }
            Ok(page.into())
        });

        let FeedHandle::NoIdentity(algorithm) = handle else {
            panic!("expected a no-identity handle");
        };
        let output = algorithm
            .get_posts(&FeedArgs::new("feed").with_limit(2))
            .unwrap();
        assert_eq!(output.as_value()["posts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_same_algorithm() {
        let a = FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into()));
        let b = a.clone();
        let c = FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into()));
        assert!(a.same_algorithm(&b));
        assert!(!a.same_algorithm(&c));
    }

    #[test]
    fn test_struct_algorithm() {
        struct Static;

        impl FeedAlgorithm for Static {
            fn get_posts(&self, _args: &FeedArgs) -> FeedResult<FeedOutput> {
                Ok(json!({ "posts": [] }).into())
            }
        }

        let handle = FeedHandle::no_identity(Static);
        assert_eq!(format!("{handle:?}"), "FeedHandle(NoIdentity)");
    }
}
