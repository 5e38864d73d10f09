//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::header::CONTENT_DISPOSITION,
    routing::{get, post},
};
use texel_convert::ConversionService;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::convert::{decode, encode};
use crate::http::health::{health, liveness, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the Texel API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router around `service`, accepting request bodies up to `body_limit` bytes.
    #[must_use]
    pub fn new(service: ConversionService, body_limit: usize) -> Self {
        let state = Arc::new(ApiState::new(service));
        let telemetry = state.telemetry.clone();

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([CONTENT_DISPOSITION]);
        let (set_request_id, propagate_request_id) = texel_telemetry::request_id_layers();
        let layered = ServiceBuilder::new()
            .layer(set_request_id)
            .layer(propagate_request_id)
            .layer(texel_telemetry::http_trace_layer())
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::public_routes()
            .merge(Self::conversion_routes())
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/", get(liveness))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn conversion_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/encode/", post(encode))
            .route("/decode/", post(decode))
    }

    /// Consume the server and return its router, e.g. to drive it in-process.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API on the supplied address until the process stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve the API until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve_with_shutdown<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "starting api listener");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
