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

//! Converter invocation and per-request conversion jobs.
//!
//! Layout: `converter.rs` (operation + converter trait), `command.rs`
//! (command-line converter), `adapter.rs` (converter calls inside the
//! working-directory critical section), `job.rs` (job/result/settings
//! types), `service.rs` (job orchestration), `error.rs` (error taxonomy).

pub mod adapter;
pub mod command;
pub mod converter;
pub mod error;
pub mod job;
pub mod service;

pub use adapter::ConverterAdapter;
pub use command::CommandConverter;
pub use converter::{Converter, Operation};
pub use error::{ConvertError, ConvertResult, FailureClass};
pub use job::{ConversionSettings, ConvertedFile, RequestJob};
pub use service::ConversionService;
