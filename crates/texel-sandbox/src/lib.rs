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

//! Request-scoped execution sandbox for working-directory bound converters.
//!
//! Layout: `staging.rs` (per-request staging directories), `workdir.rs`
//! (process-wide working-directory critical section), `locate.rs` (output
//! discovery), `error.rs` (sandbox error type).

pub mod error;
pub mod locate;
pub mod staging;
pub mod workdir;

pub use error::{SandboxError, SandboxResult};
pub use locate::{locate_output, resolve_reported_output};
pub use staging::{MAX_FILE_NAME_BYTES, STAGING_DIR_PREFIX, StagingArea, validate_file_name};
pub use workdir::{SectionOutcome, SectionStats, WorkingDirectory};
