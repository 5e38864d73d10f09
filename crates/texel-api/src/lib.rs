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

//! HTTP surface for the Texel conversion service.
//!
//! Layout: `http/router.rs` (server + layers), `http/convert.rs` (encode/decode
//! handlers), `http/stream.rs` (attachment responses), `http/health.rs`
//! (liveness, health, metrics), `http/errors.rs` (problem responses),
//! `models.rs` (wire types), `error.rs` (server errors).

pub mod error;
pub(crate) mod http;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
