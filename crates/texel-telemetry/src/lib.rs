#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the Texel workspace.
//!
//! Layout: `init.rs` (subscriber install), `context.rs` (request identity),
//! `layers.rs` (request-id and trace middleware), `metrics.rs` (Prometheus
//! registry), `error.rs` (telemetry error type).

pub mod context;
pub mod error;
pub mod init;
pub mod layers;
pub mod metrics;

pub use context::{RequestContext, app_span};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{
    HttpTraceLayer, REQUEST_ID_HEADER, RecordOutcome, RequestSpan, http_trace_layer,
    request_id_layers,
};
pub use metrics::{Metrics, MetricsSnapshot};
