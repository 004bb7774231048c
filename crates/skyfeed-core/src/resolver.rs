//! Feed URI resolution.
//!
//! A feed is addressed by an AT URI of the form
//! `at://<publisher DID>/app.bsky.feed.generator/<key>`. The resolver checks
//! the URI shape, extracts the key, and only accepts URIs that exactly match
//! the canonical URI of a registered feed.

use crate::algorithm::FeedHandle;
use crate::error::{FeedError, FeedResult};
use crate::registry::FeedRegistry;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Collection NSID of feed generator records.
pub const FEED_GENERATOR_COLLECTION: &str = "app.bsky.feed.generator";

const FEED_URI_PATTERN: &str = r"^at://[A-Za-z0-9_\-.:]+/[A-Za-z0-9_.]+/[A-Za-z0-9_.\-]+$";

fn feed_uri_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(FEED_URI_PATTERN).expect("feed URI pattern is valid"))
}

/// Returns `true` if `uri` has the shape of a feed AT URI.
#[must_use]
pub fn is_feed_uri(uri: &str) -> bool {
    feed_uri_regex().is_match(uri)
}

/// Builds the canonical URI of the feed `key` published by `publisher_did`.
///
/// # Example
///
/// ```
/// use skyfeed_core::resolver::feed_uri;
///
/// assert_eq!(
///     feed_uri("did:plc:pub", "hot"),
///     "at://did:plc:pub/app.bsky.feed.generator/hot"
/// );
/// ```
#[must_use]
pub fn feed_uri(publisher_did: &str, key: &str) -> String {
    format!("at://{publisher_did}/{FEED_GENERATOR_COLLECTION}/{key}")
}

/// Resolves requested feed URIs to registered feeds.
#[derive(Debug, Clone)]
pub struct FeedUriResolver {
    publisher_did: String,
    registry: Arc<FeedRegistry>,
}

impl FeedUriResolver {
    /// Creates a resolver for feeds published by `publisher_did`.
    #[must_use]
    pub fn new(publisher_did: impl Into<String>, registry: Arc<FeedRegistry>) -> Self {
        Self {
            publisher_did: publisher_did.into(),
            registry,
        }
    }

    /// Returns the publisher DID.
    #[must_use]
    pub fn publisher_did(&self) -> &str {
        &self.publisher_did
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    /// Returns the canonical URI of the feed `key`.
    #[must_use]
    pub fn feed_uri(&self, key: &str) -> String {
        feed_uri(&self.publisher_did, key)
    }

    /// Returns the canonical URIs of all registered feeds, in registration
    /// order.
    #[must_use]
    pub fn feed_uris(&self) -> Vec<String> {
        self.registry.keys().map(|key| self.feed_uri(key)).collect()
    }

    /// Resolves a requested feed URI to its registered feed.
    ///
    /// # Errors
    ///
    /// - [`FeedError::InvalidRequest`] if `feed` is empty or is not a feed
    ///   AT URI
    /// - [`FeedError::UnsupportedAlgorithm`] if no registered feed has this
    ///   exact canonical URI
    pub fn resolve(&self, feed: &str) -> FeedResult<&FeedHandle> {
        if feed.is_empty() {
            return Err(FeedError::invalid_request(
                "Error: Params must have the property \"feed\"",
            ));
        }
        if !is_feed_uri(feed) {
            return Err(FeedError::invalid_request(
                "Error: feed must be a valid at-uri",
            ));
        }

        let key = feed.rsplit('/').next().unwrap_or_default();
        match self.registry.lookup(key) {
            Some(handle) if self.feed_uri(key) == feed => Ok(handle),
            _ => {
                tracing::debug!(feed = %feed, "Feed is not served by this generator");
                Err(FeedError::unsupported_algorithm())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{FeedArgs, FeedPage};
    use crate::error::ErrorKind;

    const PUBLISHER: &str = "did:plc:pub";

    fn resolver() -> FeedUriResolver {
        let registry = FeedRegistry::new()
            .with_feed(
                "hot",
                FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())),
            )
            .unwrap()
            .with_feed(
                "new",
                FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())),
            )
            .unwrap();
        FeedUriResolver::new(PUBLISHER, Arc::new(registry))
    }

    fn kind_of(result: FeedResult<&FeedHandle>) -> ErrorKind {
        result.unwrap_err().kind()
    }

    #[test]
    fn test_resolves_canonical_uri() {
        let resolver = resolver();
        let handle = resolver.resolve("at://did:plc:pub/app.bsky.feed.generator/hot");
        assert!(handle.is_ok());
    }

    #[test]
    fn test_empty_feed_param() {
        let error = resolver().resolve("").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidRequest);
        assert_eq!(error.message(), "Error: Params must have the property \"feed\"");
    }

    #[test]
    fn test_malformed_uris() {
        let resolver = resolver();
        for uri in [
            "hot",
            "https://did:plc:pub/app.bsky.feed.generator/hot",
            "at://did:plc:pub/app.bsky.feed.generator",
            "at://did:plc:pub/app.bsky.feed.generator/hot/extra",
            "at://did:plc:pub/app.bsky.feed.generator/hot?x=1",
            "at:///app.bsky.feed.generator/hot",
        ] {
            let error = resolver.resolve(uri).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidRequest, "uri: {uri}");
            assert_eq!(error.message(), "Error: feed must be a valid at-uri");
        }
    }

    #[test]
    fn test_unknown_key() {
        let kind = kind_of(resolver().resolve("at://did:plc:pub/app.bsky.feed.generator/cold"));
        assert_eq!(kind, ErrorKind::UnsupportedAlgorithm);
    }

    #[test]
    fn test_foreign_publisher() {
        let kind = kind_of(resolver().resolve("at://did:plc:other/app.bsky.feed.generator/hot"));
        assert_eq!(kind, ErrorKind::UnsupportedAlgorithm);
    }

    #[test]
    fn test_wrong_collection() {
        let kind = kind_of(resolver().resolve("at://did:plc:pub/app.bsky.feed.post/hot"));
        assert_eq!(kind, ErrorKind::UnsupportedAlgorithm);
    }

    #[test]
    fn test_feed_uris_in_registration_order() {
        assert_eq!(
            resolver().feed_uris(),
            [
                "at://did:plc:pub/app.bsky.feed.generator/hot",
                "at://did:plc:pub/app.bsky.feed.generator/new",
            ]
        );
    }

    #[test]
    fn test_did_web_publisher() {
        let registry = FeedRegistry::new()
            .with_feed(
                "hot",
                FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())),
            )
            .unwrap();
        let resolver = FeedUriResolver::new("did:web:feeds.example.com", Arc::new(registry));
        assert!(resolver
            .resolve("at://did:web:feeds.example.com/app.bsky.feed.generator/hot")
            .is_ok());
    }

    proptest::proptest! {
        #[test]
        fn prop_registered_keys_resolve(key in "[a-z0-9][a-z0-9.-]{0,14}") {
            let registry = FeedRegistry::new()
                .with_feed(
                    key.clone(),
                    FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())),
                )
                .unwrap();
            let registered = registry.lookup(&key).unwrap().clone();
            let resolver = FeedUriResolver::new(PUBLISHER, Arc::new(registry));
            let uri = resolver.feed_uri(&key);

            let first = resolver.resolve(&uri).unwrap();
            let second = resolver.resolve(&uri).unwrap();
            proptest::prop_assert!(first.same_algorithm(&registered));
            proptest::prop_assert!(first.same_algorithm(second));

            let longer_key = format!("{uri}x");
            proptest::prop_assert_eq!(
                kind_of(resolver.resolve(&longer_key)),
                ErrorKind::UnsupportedAlgorithm
            );
            let other_authority = uri.replacen("did:plc:pub", "did:plc:puc", 1);
            proptest::prop_assert_eq!(
                kind_of(resolver.resolve(&other_authority)),
                ErrorKind::UnsupportedAlgorithm
            );
        }
    }
}
