//! Job input, job output and service settings.

use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

use crate::converter::Operation;

/// One conversion request as received from the caller.
#[derive(Debug, Clone)]
pub struct RequestJob {
    /// Identifier shared by logs and the staging directory name.
    pub job_id: Uuid,
    /// Caller-supplied, untrusted upload name.
    pub file_name: String,
    /// Requested direction.
    pub operation: Operation,
    /// Uploaded bytes.
    pub payload: Vec<u8>,
}

impl RequestJob {
    /// Build a job with a fresh identifier.
    #[must_use]
    pub fn new(operation: Operation, file_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            file_name: file_name.into(),
            operation,
            payload,
        }
    }
}

/// Converter output read back into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    /// Suggested download name.
    pub file_name: String,
    /// Content type fixed by the operation.
    pub content_type: &'static str,
    /// Output bytes.
    pub contents: Vec<u8>,
}

/// Settings shared by every job.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    /// Directory under which per-job staging directories are created.
    pub staging_root: PathBuf,
    /// Substring the converter embeds in decode output names.
    pub recovery_marker: String,
    /// Longest a job waits for the working-directory critical section.
    pub section_timeout: Duration,
}
