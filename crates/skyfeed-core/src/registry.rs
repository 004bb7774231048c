//! Feed registry.
//!
//! Maps short feed keys (the last segment of a feed URI, also called the
//! record key) to registered [`FeedHandle`]s. Keys keep their registration
//! order, which is the order `describeFeedGenerator` lists feeds in.

use crate::algorithm::{CallingConvention, FeedHandle};
use crate::error::{FeedError, FeedResult};
use indexmap::IndexMap;
use std::fmt;

/// Maximum feed key length, in characters.
pub const MAX_FEED_KEY_LEN: usize = 15;

/// Checks that `key` is usable as a feed record key.
///
/// # Errors
///
/// Returns [`FeedError::InvalidKey`] if the key is empty, longer than
/// [`MAX_FEED_KEY_LEN`] characters, or contains `/`.
pub fn validate_feed_key(key: &str) -> FeedResult<()> {
    if key.is_empty() {
        return Err(FeedError::invalid_key(key, "key must not be empty"));
    }
    if key.chars().count() > MAX_FEED_KEY_LEN {
        return Err(FeedError::invalid_key(
            key,
            "key must be at most 15 characters long",
        ));
    }
    if key.contains('/') {
        return Err(FeedError::invalid_key(key, "key must not contain '/'"));
    }
    Ok(())
}

/// Registry of the feeds served by one generator.
///
/// The registry is built once at startup and shared read-only afterwards.
///
/// # Example
///
/// ```
/// use skyfeed_core::{FeedArgs, FeedHandle, FeedPage, FeedRegistry};
///
/// let mut registry = FeedRegistry::new();
/// registry
///     .register("hot", FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())))
///     .unwrap();
///
/// assert!(registry.lookup("hot").is_some());
/// assert_eq!(registry.keys().collect::<Vec<_>>(), ["hot"]);
/// ```
#[derive(Clone, Default)]
pub struct FeedRegistry {
    feeds: IndexMap<String, FeedHandle>,
}

impl FeedRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a feed under `key`.
    ///
    /// Registering an existing key replaces its algorithm in place; the key
    /// keeps its original position.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidKey`] if the key fails
    /// [`validate_feed_key`].
    pub fn register(&mut self, key: impl Into<String>, handle: FeedHandle) -> FeedResult<()> {
        let key = key.into();
        validate_feed_key(&key)?;

        tracing::debug!(
            feed = %key,
            convention = %handle.convention(),
            "Registered feed"
        );
        self.feeds.insert(key, handle);
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_feed(mut self, key: impl Into<String>, handle: FeedHandle) -> FeedResult<Self> {
        self.register(key, handle)?;
        Ok(self)
    }

    /// Returns the feed registered under `key`.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&FeedHandle> {
        self.feeds.get(key)
    }

    /// Returns `true` if a feed is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.feeds.contains_key(key)
    }

    /// Returns the registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.feeds.keys().map(String::as_str)
    }

    /// Returns the number of registered feeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    /// Returns `true` if no feeds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}

impl fmt::Debug for FeedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conventions: IndexMap<&str, CallingConvention> = self
            .feeds
            .iter()
            .map(|(key, handle)| (key.as_str(), handle.convention()))
            .collect();
        f.debug_struct("FeedRegistry")
            .field("feeds", &conventions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{FeedArgs, FeedPage};
    use crate::error::ErrorKind;

    fn empty_feed() -> FeedHandle {
        FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into()))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = FeedRegistry::new();
        let handle = empty_feed();
        registry.register("hot", handle.clone()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("hot"));
        assert!(registry.lookup("hot").unwrap().same_algorithm(&handle));
        assert!(registry.lookup("cold").is_none());
    }

    #[test]
    fn test_keys_keep_registration_order() {
        let registry = FeedRegistry::new()
            .with_feed("zeta", empty_feed())
            .unwrap()
            .with_feed("alpha", empty_feed())
            .unwrap()
            .with_feed("mid", empty_feed())
            .unwrap();

        assert_eq!(registry.keys().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_reregister_replaces_in_place() {
        let first = empty_feed();
        let second = empty_feed();
        let mut registry = FeedRegistry::new();
        registry.register("a", first).unwrap();
        registry.register("b", empty_feed()).unwrap();
        registry.register("a", second.clone()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert!(registry.lookup("a").unwrap().same_algorithm(&second));
    }

    #[test]
    fn test_register_same_handle_is_idempotent() {
        let handle = empty_feed();
        let mut registry = FeedRegistry::new();
        registry.register("a", handle.clone()).unwrap();
        registry.register("a", handle.clone()).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("a").unwrap().same_algorithm(&handle));
    }

    #[test]
    fn test_key_length_limit() {
        let mut registry = FeedRegistry::new();
        assert!(registry.register("exactly15chars_", empty_feed()).is_ok());

        let error = registry
            .register("sixteen_chars___", empty_feed())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidKey);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_key_length_counts_characters() {
        assert!(validate_feed_key("ąąąąąąąąąąąąąąą").is_ok());
        assert!(validate_feed_key("ąąąąąąąąąąąąąąąą").is_err());
    }

    #[test]
    fn test_invalid_keys() {
        assert!(validate_feed_key("").is_err());
        assert!(validate_feed_key("a/b").is_err());
        assert!(validate_feed_key("whats-hot").is_ok());
    }

    #[test]
    fn test_debug_lists_conventions() {
        let registry = FeedRegistry::new().with_feed("hot", empty_feed()).unwrap();
        let debug = format!("{registry:?}");
        assert!(debug.contains("hot"));
        assert!(debug.contains("NoIdentity"));
    }

    proptest::proptest! {
        #[test]
        fn prop_keys_with_slash_are_rejected(prefix in "[a-z]{0,7}", suffix in "[a-z]{0,7}") {
            let key = format!("{prefix}/{suffix}");
            let error = FeedRegistry::new().register(key, empty_feed()).unwrap_err();
            proptest::prop_assert_eq!(error.kind(), ErrorKind::InvalidKey);
        }

        #[test]
        fn prop_long_keys_are_rejected(key in "[a-z0-9-]{16,40}") {
            let mut registry = FeedRegistry::new();
            proptest::prop_assert!(registry.register(key, empty_feed()).is_err());
            proptest::prop_assert!(registry.is_empty());
        }

        #[test]
        fn prop_short_keys_are_accepted(key in "[a-z0-9.-]{1,15}") {
            let registry = FeedRegistry::new().with_feed(key.clone(), empty_feed()).unwrap();
            proptest::prop_assert!(registry.contains(&key));
        }
    }
}
