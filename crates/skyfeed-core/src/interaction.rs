//! Feed interactions.
//!
//! Clients report how users engage with feed items through
//! `app.bsky.feed.sendInteractions`. The request body holds a list of
//! [`Interaction`]s, which are parsed here and handed to the installed
//! [`InteractionHandler`].

use crate::context::RequestContext;
use crate::error::{FeedError, FeedResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;

/// Event name of a "show more like this" interaction.
pub const REQUEST_MORE_EVENT: &str = "app.bsky.feed.defs#requestMore";

/// Event name of a "show less like this" interaction.
pub const REQUEST_LESS_EVENT: &str = "app.bsky.feed.defs#requestLess";

/// The kind of an interaction.
///
/// Event names other than the two feedback events are kept verbatim. A
/// missing or non-string event is represented as `Unknown("")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum InteractionEvent {
    /// The user asked for more posts like this one.
    RequestMore,
    /// The user asked for fewer posts like this one.
    RequestLess,
    /// Any other event, with its raw name.
    Unknown(String),
}

impl Default for InteractionEvent {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl InteractionEvent {
    /// Parses an event name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            REQUEST_MORE_EVENT => Self::RequestMore,
            REQUEST_LESS_EVENT => Self::RequestLess,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the raw event name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::RequestMore => REQUEST_MORE_EVENT,
            Self::RequestLess => REQUEST_LESS_EVENT,
            Self::Unknown(name) => name,
        }
    }
}

impl From<String> for InteractionEvent {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl<'de> Deserialize<'de> for InteractionEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(name) => Ok(Self::parse(&name)),
            _ => Ok(Self::default()),
        }
    }
}

impl From<InteractionEvent> for String {
    fn from(event: InteractionEvent) -> Self {
        event.as_str().to_string()
    }
}

impl fmt::Display for InteractionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user interaction with a feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// URI of the item the user interacted with.
    #[serde(rename = "item")]
    pub item_uri: String,
    /// What the user did.
    #[serde(default)]
    pub event: InteractionEvent,
    /// The `feedContext` sent with the item in the skeleton.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_context: Option<String>,
    /// The `reqId` sent with the skeleton page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
}

#[derive(Deserialize)]
struct InteractionsBody {
    interactions: Vec<Interaction>,
}

/// Parses a `sendInteractions` request body.
///
/// # Errors
///
/// Returns [`FeedError::InvalidRequest`] if the body is not JSON, has no
/// `interactions` array, or an item lacks a string `item` field.
pub fn parse_interactions(body: &[u8]) -> FeedResult<Vec<Interaction>> {
    serde_json::from_slice::<InteractionsBody>(body)
        .map(|body| body.interactions)
        .map_err(|e| FeedError::invalid_request(format!("Invalid interactions body: {e}")))
}

/// Receives the interactions of one `sendInteractions` request.
pub trait InteractionHandler: Send + Sync + 'static {
    /// Handles a batch of interactions.
    fn handle(&self, interactions: &[Interaction], ctx: &RequestContext) -> FeedResult<()>;
}

struct FnInteractionHandler<F>(F);

impl<F> InteractionHandler for FnInteractionHandler<F>
where
    F: Fn(&[Interaction], &RequestContext) -> FeedResult<()> + Send + Sync + 'static,
{
    fn handle(&self, interactions: &[Interaction], ctx: &RequestContext) -> FeedResult<()> {
        (self.0)(interactions, ctx)
    }
}

/// Routes parsed interactions to the installed handler, if any.
///
/// # Example
///
/// ```
/// use skyfeed_core::{Interaction, InteractionDispatcher, RequestContext};
///
/// let dispatcher = InteractionDispatcher::from_fn(
///     |interactions: &[Interaction], _ctx: &RequestContext| {
///         println!("received {} interactions", interactions.len());
///         Ok(())
///     },
/// );
///
/// let body = br#"{"interactions":[
///     {"item":"at://did:plc:a/app.bsky.feed.post/1","event":"app.bsky.feed.defs#requestMore"}
/// ]}"#;
/// assert!(dispatcher.handle_body(body, &RequestContext::mock()).is_ok());
/// ```
#[derive(Clone, Default)]
pub struct InteractionDispatcher {
    handler: Option<Arc<dyn InteractionHandler>>,
}

impl InteractionDispatcher {
    /// Creates a dispatcher without a handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dispatcher with the given handler.
    pub fn with_handler(handler: impl InteractionHandler) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
        }
    }

    /// Creates a dispatcher from a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Interaction], &RequestContext) -> FeedResult<()> + Send + Sync + 'static,
    {
        Self::with_handler(FnInteractionHandler(f))
    }

    /// Returns `true` if a handler is installed.
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Passes a batch of interactions to the handler.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MethodNotImplemented`] if no handler is
    /// installed, or the error returned by the handler.
    pub fn dispatch(&self, interactions: &[Interaction], ctx: &RequestContext) -> FeedResult<()> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(FeedError::method_not_implemented)?;

        tracing::debug!(
            request_id = %ctx.request_id(),
            count = interactions.len(),
            "Dispatching interactions"
        );
        handler.handle(interactions, ctx)
    }

    /// Parses a request body and dispatches it.
    ///
    /// The handler check comes first, so a generator without a handler
    /// answers `MethodNotImplemented` whatever the body.
    pub fn handle_body(&self, body: &[u8], ctx: &RequestContext) -> FeedResult<()> {
        if !self.has_handler() {
            return Err(FeedError::method_not_implemented());
        }
        let interactions = parse_interactions(body)?;
        self.dispatch(&interactions, ctx)
    }
}

impl fmt::Debug for InteractionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionDispatcher")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}
