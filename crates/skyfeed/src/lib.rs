//! # Skyfeed
//!
//! **Bluesky feed generator server**
//!
//! Skyfeed serves the feed generator side of the AT Protocol:
//!
//! - `getFeedSkeleton` dispatched to pluggable feed algorithms
//! - `describeFeedGenerator` and the `did:web` document
//! - optional `sendInteractions` handling
//! - strict validation of algorithm output into the skeleton wire shape
//! - one error vocabulary mapped to XRPC error bodies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skyfeed::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("SKYFEED").load()?;
//!
//!     let server = Server::from_config(&config)
//!         .feed("hot", FeedHandle::from_fn(|args: &FeedArgs| {
//!             let page = FeedPage::new().post("at://did:plc:abc/app.bsky.feed.post/xyz");
//!             Ok(match &args.cursor {
//!                 Some(cursor) => page.cursor(cursor.clone()),
//!                 None => page,
//!             }
//!             .into())
//!         }))
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request Flow
//!
//! ```text
//! Request → Router → FeedUriResolver → RequestContext → FeedInvoker
//!                                                           ↓
//! Response ← error mapping ← OutputGenerator ←──────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/skyfeed/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use skyfeed_core as core;

// Re-export server types
pub use skyfeed_server as server;

// Re-export configuration
pub use skyfeed_config as config;

// Re-export logging and metrics
pub use skyfeed_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use skyfeed::prelude::*;
///
/// let mut registry = FeedRegistry::new();
/// registry
///     .register("hot", FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())))
///     .unwrap();
/// assert!(registry.contains("hot"));
/// ```
pub mod prelude {
    pub use skyfeed_core::{
        ContextFeedAlgorithm, FeedAlgorithm, FeedArgs, FeedError, FeedHandle, FeedOutput,
        FeedPage, FeedRegistry, FeedResult, Interaction, InteractionEvent, InteractionHandler,
        LegacyFeedAlgorithm, PostEntry, PostReason, RequestContext,
    };

    pub use skyfeed_server::{FeedSettings, Server, ShutdownSignal};

    pub use skyfeed_config::{ConfigLoader, SkyfeedConfig};

    pub use skyfeed_telemetry::{init_telemetry, TelemetryConfig};
}
