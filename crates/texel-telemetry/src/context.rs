//! Request identity carried through spans and task-local storage.
//!
//! The HTTP layer opens a [`RequestContext`] scope per request; code further
//! down (error responses, conversion jobs) reads it back with
//! [`RequestContext::current`].

use std::future::Future;
use std::sync::Arc;

use tracing::Span;

use crate::init::build_sha;

tokio::task_local! {
    static ACTIVE: RequestContext;
}

/// Identifiers of the HTTP request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

impl RequestContext {
    /// Context for a request with `request_id` that matched `route`.
    #[must_use]
    pub fn new(request_id: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            route: Arc::from(route.into()),
        }
    }

    /// Value of the `x-request-id` header.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Matched route template, e.g. `/encode/`.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Context of the enclosing [`RequestContext::scope`], if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        ACTIVE.try_with(Clone::clone).ok()
    }

    /// Write `request_id` and `route` into `span`. Fields the span did not
    /// declare are ignored.
    pub fn record_on(&self, span: &Span) {
        span.record("request_id", self.request_id());
        span.record("route", self.route());
    }

    /// Run `fut` with this context visible through [`RequestContext::current`].
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        ACTIVE.scope(self, fut).await
    }
}

/// Process-level `app` span tagged with `service` and the build identifier.
///
/// Instrument the top-level future with it so every request span nests under it.
#[must_use]
pub fn app_span(service: &str) -> Span {
    tracing::info_span!("app", service, build_sha = build_sha())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scope_exposes_context_only_inside() {
        let ctx = RequestContext::new("req-42", "/decode/");
        let seen = ctx
            .clone()
            .scope(async { RequestContext::current() })
            .await;
        assert_eq!(seen, Some(ctx));
        assert!(RequestContext::current().is_none());
    }

    #[test]
    fn record_on_tolerates_undeclared_fields() {
        let ctx = RequestContext::new("req-1", "/encode/");
        let declared = tracing::info_span!(
            "request",
            request_id = tracing::field::Empty,
            route = tracing::field::Empty
        );
        ctx.record_on(&declared);
        ctx.record_on(&tracing::info_span!("bare"));
        assert_eq!(ctx.request_id(), "req-1");
        assert_eq!(ctx.route(), "/encode/");
    }

    #[test]
    fn app_span_is_named_app() {
        let span = app_span("texel-test");
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "app");
        }
    }
}
