//! Errors for staging, the working-directory section and output lookup.
//!
//! Display strings are fixed; paths, fields and offending values travel in
//! variant fields so callers can log or match on them.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors produced while staging, converting, or locating files.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Upload metadata was malformed or unsafe.
    #[error("invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// IO failures while staging, reading, or cleaning up.
    #[error("staging io failure")]
    StagingIo {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory listing failures.
    #[error("staging directory listing failed")]
    Walkdir {
        /// Operation that triggered the listing failure.
        operation: &'static str,
        /// Directory being listed.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The converter ran but left no artifact following the naming convention.
    #[error("converter output not found")]
    OutputNotFound {
        /// Marker or file name that was searched for.
        marker: String,
        /// Staging directory that was searched.
        directory: PathBuf,
    },
    /// The process working directory could not be read or restored.
    #[error("process working directory corrupted")]
    EnvironmentCorruption {
        /// Operation that observed the corruption.
        operation: &'static str,
        /// Directory that could not be restored, when known.
        path: Option<PathBuf>,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A previous corruption disabled the critical section for this process.
    #[error("working-directory critical section unavailable")]
    SectionPoisoned,
    /// Waiting for the critical section exceeded the configured bound.
    #[error("timed out waiting for the working-directory critical section")]
    SectionTimeout {
        /// Time spent waiting before giving up.
        waited: Duration,
    },
    /// The action run inside the critical section panicked.
    #[error("critical section action panicked")]
    ActionPanicked,
    /// A blocking sandbox task failed to complete.
    #[error("sandbox task failed")]
    TaskJoin {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl SandboxError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StagingIo {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidInput {
            field,
            reason,
            value: Some(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    #[test]
    fn sandbox_error_helpers_build_variants() -> Result<(), Box<dyn Error>> {
        let io_err = SandboxError::io("staging.write", "path", io::Error::other("io"));
        assert!(matches!(io_err, SandboxError::StagingIo { .. }));
        assert!(io_err.source().is_some());
        assert_eq!(io_err.to_string(), "staging io failure");

        let temp = TempDir::new()?;
        let missing = temp.path().join("missing");
        let walkdir_error = WalkDir::new(&missing)
            .into_iter()
            .next()
            .and_then(Result::err)
            .ok_or_else(|| io::Error::other("expected walkdir error"))?;
        let walk_err = SandboxError::walkdir("locate.read_dir", &missing, walkdir_error);
        assert!(matches!(walk_err, SandboxError::Walkdir { .. }));
        assert!(walk_err.source().is_some());

        let invalid = SandboxError::invalid("file_name", "empty", "");
        assert!(matches!(
            invalid,
            SandboxError::InvalidInput {
                field: "file_name",
                reason: "empty",
                ..
            }
        ));
        assert!(invalid.source().is_none());
        Ok(())
    }
}
