//! # Skyfeed Server
//!
//! HTTP server for Bluesky feed generators.
//!
//! - HTTP/1.1 via Hyper, one Tokio task per connection
//! - The four feed generator endpoints:
//!   `getFeedSkeleton`, `describeFeedGenerator`, `sendInteractions` and
//!   `/.well-known/did.json`
//! - Feed algorithms run on the blocking pool under a request timeout
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! ## Example
//!
//! ```rust,ignore
//! use skyfeed_config::ConfigLoader;
//! use skyfeed_core::{FeedArgs, FeedHandle, FeedPage};
//! use skyfeed_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("skyfeed.toml")?
//!         .with_env_prefix("SKYFEED")
//!         .load()?;
//!
//!     Server::from_config(&config)
//!         .feed("hot", FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())))
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/skyfeed-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
pub mod config;
pub mod documents;
mod error;
pub mod response;
pub mod router;
mod server;
mod service;
pub mod shutdown;

pub use builder::FeedGeneratorBuilder;
pub use config::{FeedSettings, ServerConfig, ServerConfigBuilder};
pub use documents::{DidDocument, FeedGeneratorDescription};
pub use error::ServerError;
pub use response::{HttpResponse, ResponseBody, JSON_CONTENT_TYPE};
pub use router::{Endpoint, RouteMatch, Router};
pub use server::Server;
pub use service::FeedService;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
