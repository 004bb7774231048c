//! Feed invocation.
//!
//! The [`FeedInvoker`] calls a resolved feed with the inputs its calling
//! convention asks for. Which conventions are accepted depends on the
//! unsafe auth mode:
//!
//! | Convention | Unsafe auth off | Unsafe auth on |
//! |---|---|---|
//! | no-identity | `get_posts(args)` | rejected |
//! | context-aware | `get_posts(args, ctx)` | rejected |
//! | legacy-identity | rejected | `get_posts(args, did)` |
//!
//! Rejections are [`FeedError::InvalidFeedAlgorithm`] errors, i.e. a server
//! misconfiguration rather than a client mistake.

use crate::algorithm::{CallingConvention, FeedArgs, FeedHandle, FeedOutput};
use crate::context::RequestContext;
use crate::error::{FeedError, FeedResult};

/// Calls feed algorithms according to the unsafe auth mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedInvoker {
    unsafe_auth: bool,
}

impl FeedInvoker {
    /// Creates an invoker.
    #[must_use]
    pub const fn new(enable_unsafe_auth: bool) -> Self {
        Self {
            unsafe_auth: enable_unsafe_auth,
        }
    }

    /// Returns `true` if unsafe auth mode is enabled.
    #[must_use]
    pub const fn unsafe_auth_enabled(&self) -> bool {
        self.unsafe_auth
    }

    /// Returns `true` if feeds of this convention can be invoked.
    #[must_use]
    pub const fn accepts(&self, convention: CallingConvention) -> bool {
        match convention {
            CallingConvention::LegacyIdentity => self.unsafe_auth,
            CallingConvention::NoIdentity | CallingConvention::ContextAware => !self.unsafe_auth,
        }
    }

    /// Invokes `handle` and returns its raw output.
    ///
    /// In unsafe auth mode the caller DID is decoded before the algorithm
    /// runs, so authentication errors surface even if the algorithm would
    /// not have used the DID.
    ///
    /// # Errors
    ///
    /// - [`FeedError::InvalidFeedAlgorithm`] if the convention is not
    ///   accepted in the current mode
    /// - [`FeedError::Auth`] if the caller DID cannot be decoded
    /// - any error returned by the algorithm itself
    pub fn invoke(
        &self,
        handle: &FeedHandle,
        args: &FeedArgs,
        ctx: &RequestContext,
    ) -> FeedResult<FeedOutput> {
        if !self.accepts(handle.convention()) {
            return Err(self.rejection(handle.convention()));
        }

        tracing::trace!(
            request_id = %ctx.request_id(),
            convention = %handle.convention(),
            "Invoking feed algorithm"
        );

        match handle {
            FeedHandle::NoIdentity(algorithm) => algorithm.get_posts(args),
            FeedHandle::ContextAware(algorithm) => algorithm.get_posts(args, ctx),
            FeedHandle::LegacyIdentity(algorithm) => {
                let issuer_did = ctx.issuer_did()?;
                algorithm.get_posts(args, issuer_did)
            }
        }
    }

    fn rejection(&self, convention: CallingConvention) -> FeedError {
        let message = if self.unsafe_auth {
            format!(
                "feed uses the {convention} convention, but unsafe auth mode only serves {} feeds",
                CallingConvention::LegacyIdentity
            )
        } else {
            format!(
                "feed uses the {convention} convention, which requires enable_unsafe_auth"
            )
        };
        FeedError::invalid_feed_algorithm(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, ErrorKind};
    use http::header::AUTHORIZATION;
    use http::{HeaderMap, HeaderValue, Method, Uri};
    use serde_json::json;

    fn echo_handles() -> [FeedHandle; 3] {
        [
            FeedHandle::from_fn(|_args: &FeedArgs| {
                Ok(json!({ "posts": [], "cursor": "plain" }).into())
            }),
            FeedHandle::from_context_fn(|_args: &FeedArgs, ctx: &RequestContext| {
                let did = ctx.issuer_did()?.unwrap_or("anonymous").to_string();
                Ok(json!({ "posts": [], "cursor": did }).into())
            }),
            FeedHandle::from_legacy_fn(|_args: &FeedArgs, did: Option<&str>| {
                Ok(json!({ "posts": [], "cursor": did.unwrap_or("anonymous") }).into())
            }),
        ]
    }

    fn context(auth: Option<&'static str>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if let Some(auth) = auth {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(auth));
        }
        RequestContext::new(Method::GET, Uri::from_static("/"), headers)
    }

    fn cursor_of(output: FeedResult<FeedOutput>) -> String {
        output.unwrap().as_value()["cursor"]
            .as_str()
            .unwrap()
            .to_string()
    }

    const ALICE: &str = "Bearer eyJhbGciOiJub25lIn0.eyJpc3MiOiJkaWQ6cGxjOmFsaWNlIn0.c2ln";

    #[test]
    fn test_default_mode() {
        let invoker = FeedInvoker::default();
        let [plain, ctx_aware, legacy] = echo_handles();
        let args = FeedArgs::new("feed");
        let ctx = context(Some(ALICE));

        assert_eq!(cursor_of(invoker.invoke(&plain, &args, &ctx)), "plain");
        assert_eq!(cursor_of(invoker.invoke(&ctx_aware, &args, &ctx)), "did:plc:alice");

        let error = invoker.invoke(&legacy, &args, &ctx).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidFeedAlgorithm);
    }

    #[test]
    fn test_unsafe_mode() {
        let invoker = FeedInvoker::new(true);
        let [plain, ctx_aware, legacy] = echo_handles();
        let args = FeedArgs::new("feed");
        let ctx = context(Some(ALICE));

        assert_eq!(cursor_of(invoker.invoke(&legacy, &args, &ctx)), "did:plc:alice");

        for handle in [plain, ctx_aware] {
            let error = invoker.invoke(&handle, &args, &ctx).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidFeedAlgorithm);
        }
    }

    #[test]
    fn test_unsafe_mode_anonymous() {
        let invoker = FeedInvoker::new(true);
        let [_, _, legacy] = echo_handles();
        let output = invoker.invoke(&legacy, &FeedArgs::new("feed"), &context(None));
        assert_eq!(cursor_of(output), "anonymous");
    }

    #[test]
    fn test_unsafe_mode_decodes_eagerly() {
        let invoker = FeedInvoker::new(true);
        let ignores_did =
            FeedHandle::from_legacy_fn(|_args: &FeedArgs, _did: Option<&str>| {
                Ok(json!({ "posts": [] }).into())
            });
        let error = invoker
            .invoke(&ignores_did, &FeedArgs::new("feed"), &context(Some("Bearer garbage")))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::BadJwt);
    }

    #[test]
    fn test_context_aware_decodes_lazily() {
        let invoker = FeedInvoker::default();
        let ignores_ctx =
            FeedHandle::from_context_fn(|_args: &FeedArgs, _ctx: &RequestContext| {
                Ok(json!({ "posts": [] }).into())
            });
        let result = invoker.invoke(
            &ignores_ctx,
            &FeedArgs::new("feed"),
            &context(Some("Basic dXNlcjpwYXNz")),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_context_aware_auth_error_propagates() {
        let invoker = FeedInvoker::default();
        let [_, ctx_aware, _] = echo_handles();
        let error = invoker
            .invoke(&ctx_aware, &FeedArgs::new("feed"), &context(Some("Basic dXNlcjpwYXNz")))
            .unwrap_err();
        assert!(matches!(error, FeedError::Auth(AuthError::UnsupportedAuthMethod)));
    }

    #[test]
    fn test_accepts() {
        let safe = FeedInvoker::new(false);
        let unsafe_mode = FeedInvoker::new(true);
        assert!(safe.accepts(CallingConvention::ContextAware));
        assert!(!safe.accepts(CallingConvention::LegacyIdentity));
        assert!(unsafe_mode.accepts(CallingConvention::LegacyIdentity));
        assert!(!unsafe_mode.accepts(CallingConvention::NoIdentity));
        assert!(unsafe_mode.unsafe_auth_enabled());
    }
}
