//! HTTP server implementation.
//!
//! Built on Hyper and Tokio. The server consists of:
//!
//! - a TCP listener bound to the configured address
//! - one task per connection, serving HTTP/1.1
//! - routing via the [`Router`](crate::Router) to the [`FeedService`]
//! - graceful shutdown bounded by the shutdown timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use skyfeed_core::{FeedArgs, FeedHandle, FeedPage};
//! use skyfeed_server::{FeedSettings, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .http_addr("0.0.0.0:3000")
//!         .settings(FeedSettings::new("did:plc:abc123", "feeds.example.com"))
//!         .feed("hot", FeedHandle::from_fn(|_args: &FeedArgs| Ok(FeedPage::new().into())))
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use skyfeed_config::SkyfeedConfig;
use skyfeed_core::RequestContext;
use skyfeed_telemetry::InFlightGuard;

use crate::builder::FeedGeneratorBuilder;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::response::{error_response, HttpResponse};
use crate::router::{RouteMatch, Router};
use crate::service::FeedService;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// A feed generator HTTP server.
///
/// Use [`Server::builder()`] or [`Server::from_config()`] to assemble one.
#[derive(Debug)]
pub struct Server {
    /// Listener configuration
    config: ServerConfig,

    /// Request router
    router: Router,

    /// Endpoint pipeline
    service: FeedService,
}

impl Server {
    /// Creates a server from its parts.
    #[must_use]
    pub fn new(config: ServerConfig, service: FeedService) -> Self {
        Self {
            config,
            router: Router::new(),
            service,
        }
    }

    /// Creates a new feed generator builder.
    #[must_use]
    pub fn builder() -> FeedGeneratorBuilder {
        FeedGeneratorBuilder::new()
    }

    /// Creates a builder pre-filled from a loaded configuration.
    ///
    /// Register feeds on the returned builder, then call
    /// [`build`](FeedGeneratorBuilder::build).
    #[must_use]
    pub fn from_config(config: &SkyfeedConfig) -> FeedGeneratorBuilder {
        FeedGeneratorBuilder::from_config(config)
    }

    /// Returns a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns a reference to the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns the endpoint pipeline.
    #[must_use]
    pub fn service(&self) -> &FeedService {
        &self.service
    }

    /// Runs the server until SIGTERM or SIGINT is received.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the configured address.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs the server with a custom shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the configured address.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(|e| {
            ServerError::BindError(format!("Invalid address '{}': {}", self.config.http_addr(), e))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {addr}: {e}")))?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            service_did = %self.service.settings().service_did(),
            feeds = self.service.resolver().registry().len(),
            "Feed generator listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                let result = server
                                    .handle_connection(stream, remote_addr, shutdown)
                                    .await;
                                if let Err(e) = result {
                                    tracing::debug!(
                                        remote_addr = %remote_addr,
                                        error = %e,
                                        "Connection error"
                                    );
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            connections = tracker.active_connections(),
            "Waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("All connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "Shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Handles a single HTTP request end to end.
    ///
    /// Routing, the request timeout, logging and metrics all happen here,
    /// so in-memory callers such as test clients see exactly what a network
    /// client would. Bodies larger than the configured maximum are
    /// answered with `413 PayloadTooLarge`.
    pub async fn dispatch(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> HttpResponse {
        let _in_flight = InFlightGuard::new();
        let path = uri.path().to_string();

        if body.len() > self.config.max_body_size() {
            tracing::debug!(
                path = %path,
                size = body.len(),
                limit = self.config.max_body_size(),
                "Request body too large"
            );
            return self.payload_too_large();
        }

        let endpoint = match self.router.match_route(&method, &path) {
            RouteMatch::Found(endpoint) => endpoint,
            RouteMatch::MethodNotAllowed => {
                tracing::debug!(method = %method, path = %path, "Method not allowed");
                return error_response(
                    StatusCode::METHOD_NOT_ALLOWED,
                    "MethodNotAllowed",
                    "Method Not Allowed",
                );
            }
            RouteMatch::NotFound => {
                tracing::debug!(method = %method, path = %path, "No route");
                return error_response(StatusCode::NOT_FOUND, "NotFound", "Not Found");
            }
        };

        let ctx = RequestContext::new(method, uri, headers);
        let request_id = ctx.request_id();
        let started = std::time::Instant::now();

        let response = match tokio::time::timeout(
            self.config.request_timeout(),
            self.service.handle(endpoint, ctx, body),
        )
        .await
        {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(
                    request_id = %request_id,
                    endpoint = %endpoint,
                    timeout = ?self.config.request_timeout(),
                    "Request timed out"
                );
                skyfeed_telemetry::record_feed_error("RequestTimeout");
                error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "RequestTimeout",
                    "Request timed out",
                )
            }
        };

        let elapsed = started.elapsed();
        let status = response.status().as_u16();
        tracing::info!(
            request_id = %request_id,
            endpoint = %endpoint,
            http.status_code = status,
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Request completed"
        );
        skyfeed_telemetry::record_request(endpoint.name(), status, elapsed);

        response
    }

    /// Handles a single connection.
    async fn handle_connection(
        self: &Arc<Self>,
        stream: tokio::net::TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote_addr = %remote_addr, "Closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Reads the request body up to the size limit, then dispatches.
    async fn handle_request<B>(&self, req: Request<B>) -> Result<HttpResponse, Infallible>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let body = Limited::new(body, self.config.max_body_size());

        let body = match tokio::time::timeout(self.config.request_timeout(), body.collect()).await {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::debug!(
                    path = %parts.uri.path(),
                    limit = self.config.max_body_size(),
                    "Request body too large"
                );
                return Ok(self.payload_too_large());
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Failed to read request body");
                return Ok(error_response(
                    StatusCode::BAD_REQUEST,
                    "InvalidRequest",
                    &format!("Failed to read request body: {e}"),
                ));
            }
            Err(_) => {
                return Ok(error_response(
                    StatusCode::REQUEST_TIMEOUT,
                    "RequestTimeout",
                    "Request body was not received in time",
                ));
            }
        };

        Ok(self.dispatch(parts.method, parts.uri, parts.headers, body).await)
    }

    fn payload_too_large(&self) -> HttpResponse {
        error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PayloadTooLarge",
            &format!("Request body exceeds {} bytes", self.config.max_body_size()),
        )
    }
}
