//! Converter calls inside the working-directory critical section.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use texel_sandbox::{StagingArea, WorkingDirectory};
use texel_telemetry::Metrics;
use tracing::debug;

use crate::converter::{Converter, Operation};
use crate::error::{ConvertError, ConvertResult};

/// Invokes the converter with the working directory set to a staging area.
///
/// Every call is serialized through the process-wide [`WorkingDirectory`]
/// section. Converter failures are not retried.
#[derive(Clone)]
pub struct ConverterAdapter {
    converter: Arc<dyn Converter>,
    section: WorkingDirectory,
    wait_limit: Duration,
    metrics: Metrics,
}

impl ConverterAdapter {
    /// Wrap `converter`, waiting at most `wait_limit` for the critical section.
    #[must_use]
    pub fn new(converter: Arc<dyn Converter>, wait_limit: Duration, metrics: Metrics) -> Self {
        Self {
            converter,
            section: WorkingDirectory::process(),
            wait_limit,
            metrics,
        }
    }

    /// Critical section used by this adapter.
    #[must_use]
    pub const fn section(&self) -> &WorkingDirectory {
        &self.section
    }

    /// Run the forward conversion on the staged upload.
    ///
    /// Returns the output path as reported by the converter, relative to the
    /// staging directory or absolute.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Conversion`] when the converter fails and
    /// [`ConvertError::Sandbox`] when the critical section cannot be used.
    pub async fn encode(&self, staging: &StagingArea) -> ConvertResult<PathBuf> {
        let converter = Arc::clone(&self.converter);
        self.invoke(staging, Operation::Encode, move |input| {
            converter.convert_forward(input)
        })
        .await
    }

    /// Run the backward conversion on the staged upload.
    ///
    /// # Errors
    ///
    /// Same as [`ConverterAdapter::encode`].
    pub async fn decode(&self, staging: &StagingArea) -> ConvertResult<()> {
        let converter = Arc::clone(&self.converter);
        self.invoke(staging, Operation::Decode, move |input| {
            converter.convert_backward(input)
        })
        .await
    }

    async fn invoke<T, F>(
        &self,
        staging: &StagingArea,
        operation: Operation,
        call: F,
    ) -> ConvertResult<T>
    where
        F: FnOnce(&Path) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let input = PathBuf::from(staging.file_name());
        let metrics = self.metrics.clone();
        let outcome = self
            .section
            .run_exclusively(staging.directory(), self.wait_limit, move || {
                let _occupied = Occupied::mark(&metrics);
                call(&input)
            })
            .await
            .map_err(|source| ConvertError::sandbox("convert.critical_section", source))?;

        self.metrics.observe_critical_section_wait(outcome.waited);
        debug!(
            job_id = %staging.job_id(),
            operation = operation.as_str(),
            waited_ms = outcome.waited.as_millis(),
            "converter returned"
        );
        outcome
            .value
            .map_err(|err| ConvertError::conversion(operation, &err))
    }
}

/// Holds the occupancy gauge at 1 until dropped, including on unwind.
struct Occupied<'a>(&'a Metrics);

impl<'a> Occupied<'a> {
    fn mark(metrics: &'a Metrics) -> Self {
        metrics.set_critical_section_occupied(true);
        Self(metrics)
    }
}

impl Drop for Occupied<'_> {
    fn drop(&mut self) {
        self.0.set_critical_section_occupied(false);
    }
}
