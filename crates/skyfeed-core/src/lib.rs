//! # Skyfeed Core
//!
//! Core types for building Bluesky feed generators.
//!
//! This crate holds everything a feed generator needs that is independent
//! of HTTP serving:
//!
//! - [`FeedRegistry`] - Feed keys mapped to algorithms, in registration order
//! - [`FeedHandle`] - A registered algorithm and its calling convention
//! - [`RequestContext`] - Per-request view with lazily decoded caller DID
//! - [`FeedUriResolver`] - Feed URI validation and lookup
//! - [`FeedInvoker`] - Calls algorithms according to the unsafe auth mode
//! - [`OutputGenerator`] - Validates algorithm output into a skeleton
//! - [`InteractionDispatcher`] - Parses and routes `sendInteractions` bodies
//! - [`FeedError`] - The error taxonomy and its wire mapping

#![doc(html_root_url = "https://docs.rs/skyfeed-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod algorithm;
pub mod auth;
mod context;
mod error;
mod interaction;
mod invoker;
pub mod output;
mod registry;
pub mod resolver;

pub use algorithm::{
    CallingConvention, ContextFeedAlgorithm, FeedAlgorithm, FeedArgs, FeedHandle, FeedOutput,
    FeedPage, LegacyFeedAlgorithm, PostEntry, PostReason,
};
pub use context::{RequestContext, RequestId};
pub use error::{
    AuthError, ErrorEnvelope, ErrorKind, FeedError, FeedResult, INTERNAL_SERVER_ERROR_CODE,
};
pub use interaction::{
    parse_interactions, Interaction, InteractionDispatcher, InteractionEvent, InteractionHandler,
    REQUEST_LESS_EVENT, REQUEST_MORE_EVENT,
};
pub use invoker::FeedInvoker;
pub use output::{OutputGenerator, SkeletonPost, SkeletonReason, SkeletonResponse};
pub use registry::{validate_feed_key, FeedRegistry, MAX_FEED_KEY_LEN};
pub use resolver::{FeedUriResolver, FEED_GENERATOR_COLLECTION};
