//! Skeleton output validation.
//!
//! Feed algorithms return loosely shaped JSON ([`FeedOutput`]). The
//! [`OutputGenerator`] checks that value and converts it to the
//! `getFeedSkeleton` response body, [`SkeletonResponse`].
//!
//! Accepted algorithm output:
//!
//! ```json
//! {
//!   "posts": [
//!     "at://did:plc:abc/app.bsky.feed.post/3kx",
//!     { "post": "at://did:plc:abc/app.bsky.feed.post/3ky",
//!       "reason": { "repost": "at://did:plc:def/app.bsky.feed.repost/3kz" },
//!       "context": "opaque" }
//!   ],
//!   "cursor": "next-page",
//!   "reqId": "r-123"
//! }
//! ```
//!
//! A reason is either `{"repost": <uri>}` or `{"pin": true}`. `req_id` is
//! accepted as an alias of `reqId`. Anything else is an
//! [`FeedError::InvalidResponse`].

use crate::algorithm::FeedOutput;
use crate::error::{FeedError, FeedResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// `$type` of a repost reason on the wire.
pub const REASON_REPOST_TYPE: &str = "app.bsky.feed.defs#skeletonReasonRepost";

/// `$type` of a pin reason on the wire.
pub const REASON_PIN_TYPE: &str = "app.bsky.feed.defs#skeletonReasonPin";

const POST_URI_PATTERN: &str = r"^at://did:plc:[a-z0-9]+/app\.bsky\.feed\.post/[a-z0-9]+$";

fn post_uri_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(POST_URI_PATTERN).expect("post URI pattern is valid"))
}

/// Returns `true` if `uri` is an acceptable post URI.
#[must_use]
pub fn is_post_uri(uri: &str) -> bool {
    post_uri_regex().is_match(uri)
}

/// Body of a successful `getFeedSkeleton` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonResponse {
    /// The posts of this page.
    pub feed: Vec<SkeletonPost>,
    /// Cursor for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Request ID echoed back by clients in interactions.
    #[serde(default, rename = "reqId", skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
}

/// One post of a [`SkeletonResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkeletonPost {
    /// The post URI.
    pub post: String,
    /// Why the post is included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkeletonReason>,
    /// Opaque context echoed back by clients in interactions.
    #[serde(default, rename = "feedContext", skip_serializing_if = "Option::is_none")]
    pub feed_context: Option<String>,
}

/// Wire form of a post reason, tagged by `$type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum SkeletonReason {
    /// The post was reposted by the referenced repost record.
    #[serde(rename = "app.bsky.feed.defs#skeletonReasonRepost")]
    Repost {
        /// URI of the repost record.
        repost: String,
    },
    /// The post is pinned.
    #[serde(rename = "app.bsky.feed.defs#skeletonReasonPin")]
    Pin,
}

/// Validates algorithm output and builds skeleton responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputGenerator;

impl OutputGenerator {
    /// Creates an output generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Converts algorithm output into a skeleton response.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidResponse`] describing the first problem
    /// found in `output`.
    pub fn generate(&self, output: &FeedOutput) -> FeedResult<SkeletonResponse> {
        let Value::Object(response) = output.as_value() else {
            return Err(FeedError::invalid_response(
                "feed output should be an object",
            ));
        };

        let posts = match response.get("posts") {
            None => return Err(FeedError::invalid_response("posts key is missing")),
            Some(Value::Array(posts)) => posts,
            Some(_) => return Err(FeedError::invalid_response("posts should be an array")),
        };

        let feed = posts
            .iter()
            .map(Self::skeleton_post)
            .collect::<FeedResult<Vec<_>>>()?;

        let cursor = optional_string(response.get("cursor"), "cursor")?;
        let req_id = match response.get("reqId") {
            Some(value) if !value.is_null() => optional_string(Some(value), "reqId")?,
            _ => optional_string(response.get("req_id"), "req_id")?,
        };

        Ok(SkeletonResponse {
            feed,
            cursor,
            req_id,
        })
    }

    fn skeleton_post(value: &Value) -> FeedResult<SkeletonPost> {
        match value {
            Value::String(uri) => Ok(SkeletonPost {
                post: validate_post_uri(uri)?,
                reason: None,
                feed_context: None,
            }),
            Value::Object(object) => Self::structured_post(object),
            other => Err(FeedError::invalid_response(format!(
                "Invalid post entry, expected a string or an object: {other}"
            ))),
        }
    }

    fn structured_post(object: &Map<String, Value>) -> FeedResult<SkeletonPost> {
        let post = match object.get("post") {
            Some(Value::String(uri)) => validate_post_uri(uri)?,
            None | Some(Value::Null) => {
                return Err(FeedError::invalid_response(
                    "Post object is missing a post key",
                ));
            }
            Some(other) => {
                return Err(FeedError::invalid_response(format!(
                    "Invalid post URI: {other}"
                )));
            }
        };

        let reason = match object.get("reason") {
            None | Some(Value::Null) => None,
            Some(Value::Object(reason)) => Some(skeleton_reason(reason)?),
            Some(other) => {
                return Err(FeedError::invalid_response(format!(
                    "Invalid post reason: {other}"
                )));
            }
        };

        let feed_context = optional_string(object.get("context"), "context")?;

        Ok(SkeletonPost {
            post,
            reason,
            feed_context,
        })
    }
}

fn validate_post_uri(uri: &str) -> FeedResult<String> {
    if is_post_uri(uri) {
        Ok(uri.to_string())
    } else {
        Err(FeedError::invalid_response(format!(
            "Invalid post URI: {uri:?}"
        )))
    }
}

fn skeleton_reason(reason: &Map<String, Value>) -> FeedResult<SkeletonReason> {
    match reason.get("repost") {
        Some(Value::String(repost)) => {
            return Ok(SkeletonReason::Repost {
                repost: repost.clone(),
            });
        }
        None | Some(Value::Null | Value::Bool(false)) => {}
        Some(other) => {
            return Err(FeedError::invalid_response(format!(
                "Invalid repost URI: {other}"
            )));
        }
    }

    match reason.get("pin") {
        None | Some(Value::Null | Value::Bool(false)) => Err(FeedError::invalid_response(
            format!("Invalid post reason: {}", Value::Object(reason.clone())),
        )),
        Some(_) => Ok(SkeletonReason::Pin),
    }
}

fn optional_string(value: Option<&Value>, field: &str) -> FeedResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(FeedError::invalid_response(format!(
            "{field} should be a string or null"
        ))),
    }
}
