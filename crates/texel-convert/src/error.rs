//! # Design
//!
//! - One error type for the job pipeline, keeping sandbox failures as sources.
//! - `FailureClass` collapses every failure into the caller-relevant taxonomy
//!   used for logs, metrics and status mapping.

use texel_sandbox::SandboxError;
use thiserror::Error;

use crate::converter::Operation;

/// Result type for conversion jobs.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors raised while running a conversion job.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Staging, critical-section or output discovery failure.
    #[error("conversion sandbox failure")]
    Sandbox {
        /// Pipeline step that failed.
        operation: &'static str,
        /// Underlying sandbox error.
        source: SandboxError,
    },
    /// The converter rejected or failed on the input.
    #[error("converter failed")]
    Conversion {
        /// Operation the converter was asked to perform.
        operation: Operation,
        /// Message reported by the converter.
        message: String,
    },
    /// The job task stopped before producing a result.
    #[error("conversion task failed")]
    TaskJoin {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

/// Caller-relevant classification of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Malformed or unsafe upload metadata.
    InvalidInput,
    /// The converter failed on the input.
    Conversion,
    /// The converter produced no artifact following the naming convention.
    OutputNotFound,
    /// The process working directory can no longer be trusted.
    EnvironmentCorruption,
    /// Disk failure while staging, reading or cleaning up.
    StagingIo,
    /// The critical section stayed occupied past the wait limit.
    Busy,
    /// Anything else.
    Internal,
}

impl FailureClass {
    /// Metrics/log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Conversion => "conversion",
            Self::OutputNotFound => "output_not_found",
            Self::EnvironmentCorruption => "environment_corruption",
            Self::StagingIo => "staging_io",
            Self::Busy => "busy",
            Self::Internal => "internal",
        }
    }
}

impl ConvertError {
    pub(crate) const fn sandbox(operation: &'static str, source: SandboxError) -> Self {
        Self::Sandbox { operation, source }
    }

    pub(crate) fn conversion(operation: Operation, err: &anyhow::Error) -> Self {
        Self::Conversion {
            operation,
            message: format!("{err:#}"),
        }
    }

    /// Classify this failure.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Sandbox { source, .. } => match source {
                SandboxError::InvalidInput { .. } => FailureClass::InvalidInput,
                SandboxError::StagingIo { .. } | SandboxError::Walkdir { .. } => {
                    FailureClass::StagingIo
                }
                SandboxError::OutputNotFound { .. } => FailureClass::OutputNotFound,
                SandboxError::EnvironmentCorruption { .. } | SandboxError::SectionPoisoned => {
                    FailureClass::EnvironmentCorruption
                }
                SandboxError::SectionTimeout { .. } => FailureClass::Busy,
                SandboxError::ActionPanicked => FailureClass::Conversion,
                SandboxError::TaskJoin { .. } => FailureClass::Internal,
            },
            Self::Conversion { .. } => FailureClass::Conversion,
            Self::TaskJoin { .. } => FailureClass::Internal,
        }
    }

    /// Human-readable reason suitable for a caller-facing detail string.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Conversion { message, .. } => message.clone(),
            Self::Sandbox {
                source:
                    SandboxError::InvalidInput {
                        field,
                        reason,
                        value,
                    },
                ..
            } => value.as_ref().map_or_else(
                || format!("invalid {field} ({reason})"),
                |value| format!("invalid {field} {value:?} ({reason})"),
            ),
            Self::Sandbox {
                source: SandboxError::OutputNotFound { marker, .. },
                ..
            } => format!("converter output not found (expected a file matching {marker:?})"),
            Self::Sandbox { source, .. } => source.to_string(),
            Self::TaskJoin { .. } => self.to_string(),
        }
    }
}
