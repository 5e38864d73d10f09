//! Tower middleware for HTTP services: request identifiers and the
//! `http.request` span.

use std::time::Duration;

use http::{HeaderName, Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer};
use tracing::{Span, debug};

use crate::init::build_sha;

/// Header carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Layers assigning and echoing [`REQUEST_ID_HEADER`].
///
/// The first layer must wrap the second: an identifier generated for a
/// request without one is then echoed on the response as well.
#[must_use]
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);
    (
        SetRequestIdLayer::new(header.clone(), MakeRequestUuid),
        PropagateRequestIdLayer::new(header),
    )
}

/// Trace layer produced by [`http_trace_layer`].
pub type HttpTraceLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan, DefaultOnRequest, RecordOutcome>;

/// Trace layer opening one `http.request` span per request.
#[must_use]
pub fn http_trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(RecordOutcome)
}

/// Opens the `http.request` span. `route` is left empty for the metrics
/// layer to fill in once routing has matched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        tracing::info_span!(
            "http.request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id,
            route = tracing::field::Empty,
            build_sha = build_sha(),
            status_code = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}

/// Records status and latency on the request span.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordOutcome;

impl<B> OnResponse<B> for RecordOutcome {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        span.record("status_code", response.status().as_u16());
        span.record("latency_ms", latency_ms);
        debug!(parent: span, status = response.status().as_u16(), latency_ms, "response sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::{ServiceBuilder, ServiceExt};

    const SEEN: &str = "x-seen-request-id";

    async fn echo(request: Request<String>) -> Result<Response<String>, Infallible> {
        let mut response = Response::new(String::new());
        if let Some(id) = request.headers().get(REQUEST_ID_HEADER) {
            response.headers_mut().insert(SEEN, id.clone());
        }
        Ok(response)
    }

    #[tokio::test]
    async fn missing_request_id_is_generated_and_echoed() -> Result<(), Infallible> {
        let (set, propagate) = request_id_layers();
        let service = ServiceBuilder::new()
            .layer(set)
            .layer(propagate)
            .layer(http_trace_layer())
            .service_fn(echo);

        let response = service.oneshot(Request::new(String::new())).await?;
        let echoed = response.headers().get(REQUEST_ID_HEADER);
        assert!(echoed.is_some());
        assert_eq!(echoed, response.headers().get(SEEN));
        Ok(())
    }

    #[tokio::test]
    async fn incoming_request_id_is_kept() -> Result<(), Infallible> {
        let (set, propagate) = request_id_layers();
        let service = ServiceBuilder::new()
            .layer(set)
            .layer(propagate)
            .service_fn(echo);

        let mut request = Request::new(String::new());
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER, http::HeaderValue::from_static("req-7"));
        let response = service.oneshot(request).await?;
        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok()),
            Some("req-7")
        );
        Ok(())
    }
}
