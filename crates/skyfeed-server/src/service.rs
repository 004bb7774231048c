//! The feed generator request pipeline.
//!
//! [`FeedService`] owns everything a request needs: the URI resolver over
//! the frozen registry, the invoker for the configured auth mode, the output
//! generator and the interaction dispatcher. Endpoint handlers return
//! [`FeedResult`]s, and [`FeedService::handle`] is the one place where a
//! [`FeedError`] becomes a response.
//!
//! Feed algorithms and interaction handlers are synchronous and may block,
//! so they run on Tokio's blocking pool. A panic there is reported as an
//! unexpected error.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use serde::Deserialize;

use skyfeed_core::{
    parse_interactions, FeedArgs, FeedError, FeedInvoker, FeedRegistry, FeedResult,
    FeedUriResolver, InteractionDispatcher, OutputGenerator, RequestContext, SkeletonResponse,
};

use crate::config::FeedSettings;
use crate::documents::{DidDocument, FeedGeneratorDescription};
use crate::response::{json_response, HttpResponse};
use crate::router::Endpoint;

/// Raw query parameters of `getFeedSkeleton`.
#[derive(Debug, Default, Deserialize)]
struct SkeletonQuery {
    #[serde(default)]
    feed: Option<String>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    limit: Option<String>,
}

impl SkeletonQuery {
    fn parse(query: Option<&str>) -> FeedResult<Self> {
        serde_urlencoded::from_str(query.unwrap_or_default())
            .map_err(|e| FeedError::invalid_request(format!("Error: invalid query string: {e}")))
    }

    fn limit(&self) -> FeedResult<Option<u32>> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(limit) => limit.parse().map(Some).map_err(|_| {
                FeedError::invalid_request("Error: limit must be a non-negative integer")
            }),
        }
    }
}

/// Serves the feed generator endpoints.
#[derive(Debug)]
pub struct FeedService {
    settings: FeedSettings,
    resolver: FeedUriResolver,
    invoker: FeedInvoker,
    output: OutputGenerator,
    interactions: InteractionDispatcher,
    description: FeedGeneratorDescription,
    did_document: DidDocument,
}

impl FeedService {
    /// Creates the service. The registry is frozen from here on.
    #[must_use]
    pub fn new(
        settings: FeedSettings,
        registry: FeedRegistry,
        interactions: InteractionDispatcher,
    ) -> Self {
        let resolver = FeedUriResolver::new(settings.publisher_did(), Arc::new(registry));
        let description = FeedGeneratorDescription::new(&settings, resolver.feed_uris());
        let did_document = DidDocument::new(&settings);

        Self {
            invoker: FeedInvoker::new(settings.unsafe_auth_enabled()),
            output: OutputGenerator::new(),
            settings,
            resolver,
            interactions,
            description,
            did_document,
        }
    }

    /// Returns the feed settings.
    #[must_use]
    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Returns the URI resolver.
    #[must_use]
    pub fn resolver(&self) -> &FeedUriResolver {
        &self.resolver
    }

    /// Returns the `describeFeedGenerator` document.
    #[must_use]
    pub fn description(&self) -> &FeedGeneratorDescription {
        &self.description
    }

    /// Returns the DID document.
    #[must_use]
    pub fn did_document(&self) -> &DidDocument {
        &self.did_document
    }

    /// Handles a routed request and maps any error to its response.
    pub async fn handle(
        &self,
        endpoint: Endpoint,
        ctx: RequestContext,
        body: Bytes,
    ) -> HttpResponse {
        let request_id = ctx.request_id();

        let result = match endpoint {
            Endpoint::GetFeedSkeleton => self
                .get_feed_skeleton(ctx)
                .await
                .map(|skeleton| json_response(StatusCode::OK, &skeleton)),
            Endpoint::DescribeFeedGenerator => {
                Ok(json_response(StatusCode::OK, &self.description))
            }
            Endpoint::DidDocument => Ok(json_response(StatusCode::OK, &self.did_document)),
            Endpoint::SendInteractions => self
                .send_interactions(ctx, body)
                .await
                .map(|()| json_response(StatusCode::OK, &serde_json::json!({}))),
        };

        result.unwrap_or_else(|error| {
            self.error_response(endpoint, &error, &request_id.to_string())
        })
    }

    /// Runs `getFeedSkeleton`: resolve, invoke, validate.
    ///
    /// # Errors
    ///
    /// Returns the first [`FeedError`] raised along the pipeline.
    pub async fn get_feed_skeleton(&self, ctx: RequestContext) -> FeedResult<SkeletonResponse> {
        let query = SkeletonQuery::parse(ctx.uri().query())?;
        let feed = query.feed.clone().unwrap_or_default();
        let handle = self.resolver.resolve(&feed)?.clone();

        let mut args = FeedArgs::new(feed);
        args.cursor = query.cursor.clone();
        args.limit = query.limit()?;

        tracing::debug!(
            request_id = %ctx.request_id(),
            feed = %args.feed,
            convention = %handle.convention(),
            "Serving feed skeleton"
        );

        let invoker = self.invoker;
        let output = run_blocking(move || invoker.invoke(&handle, &args, &ctx)).await?;
        self.output.generate(&output)
    }

    /// Runs `sendInteractions`: parse the body and pass it to the handler.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MethodNotImplemented`] without a handler, an
    /// invalid request error for a malformed body, or the handler's error.
    pub async fn send_interactions(&self, ctx: RequestContext, body: Bytes) -> FeedResult<()> {
        if !self.interactions.has_handler() {
            return Err(FeedError::method_not_implemented());
        }

        let interactions = parse_interactions(&body)?;
        for interaction in &interactions {
            skyfeed_telemetry::record_interaction(interaction.event.as_str());
        }

        let dispatcher = self.interactions.clone();
        run_blocking(move || dispatcher.dispatch(&interactions, &ctx)).await
    }

    fn error_response(
        &self,
        endpoint: Endpoint,
        error: &FeedError,
        request_id: &str,
    ) -> HttpResponse {
        let status = error.status_code();
        let code = error.error_code();

        if error.kind().is_internal() {
            tracing::error!(
                request_id = %request_id,
                endpoint = %endpoint,
                error_code = %code,
                error = %error,
                "Request failed"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                endpoint = %endpoint,
                error_code = %code,
                error = %error,
                "Request rejected"
            );
        }

        skyfeed_telemetry::record_feed_error(code);
        json_response(status, &error.to_envelope(self.settings.expose_error_details()))
    }
}

/// Runs user code on the blocking pool.
async fn run_blocking<T, F>(f: F) -> FeedResult<T>
where
    F: FnOnce() -> FeedResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(FeedError::unexpected_msg(format!(
            "feed code panicked: {}",
            panic_message(e.into_panic().as_ref())
        ))),
        Err(e) => Err(FeedError::unexpected_msg(format!("feed task failed: {e}"))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
