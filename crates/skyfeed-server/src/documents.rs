//! Static documents served by a feed generator.
//!
//! Both documents are computed once when the server is built, from the
//! [`FeedSettings`] and the registered feed URIs.

use serde::{Deserialize, Serialize};

use crate::config::FeedSettings;

/// DID document context.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Fragment ID of the feed generator service entry.
pub const FEED_GENERATOR_SERVICE_ID: &str = "#bsky_fg";

/// Service type of the feed generator service entry.
pub const FEED_GENERATOR_SERVICE_TYPE: &str = "BskyFeedGenerator";

/// Body of `app.bsky.feed.describeFeedGenerator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedGeneratorDescription {
    /// The service DID.
    pub did: String,
    /// The served feeds, in registration order.
    pub feeds: Vec<DescribedFeed>,
}

/// One feed of a [`FeedGeneratorDescription`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedFeed {
    /// Canonical feed URI.
    pub uri: String,
}

impl FeedGeneratorDescription {
    /// Describes the feeds at `feed_uris`.
    #[must_use]
    pub fn new(settings: &FeedSettings, feed_uris: Vec<String>) -> Self {
        Self {
            did: settings.service_did(),
            feeds: feed_uris
                .into_iter()
                .map(|uri| DescribedFeed { uri })
                .collect(),
        }
    }
}

/// The `did:web` document served at `/.well-known/did.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// The service DID.
    pub id: String,
    /// Service entries.
    pub service: Vec<DidService>,
}

/// A service entry of a [`DidDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidService {
    /// Service ID, relative to the document.
    pub id: String,
    /// Service type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Public URL of the service.
    pub service_endpoint: String,
}

impl DidDocument {
    /// Builds the document for a feed generator.
    #[must_use]
    pub fn new(settings: &FeedSettings) -> Self {
        Self {
            context: vec![DID_CONTEXT.to_string()],
            id: settings.service_did(),
            service: vec![DidService {
                id: FEED_GENERATOR_SERVICE_ID.to_string(),
                kind: FEED_GENERATOR_SERVICE_TYPE.to_string(),
                service_endpoint: settings.service_endpoint(),
            }],
        }
    }
}
