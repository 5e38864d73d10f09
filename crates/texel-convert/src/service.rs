//! Conversion job orchestration.
//!
//! # Design
//! - Each job runs on its own task so a dropped caller never interrupts a
//!   conversion halfway; the staging directory is released by that task.
//! - Pipeline: stage → convert (critical section) → locate/resolve → read → release.
//! - A cleanup failure never replaces the job's own error.

use std::path::PathBuf;
use std::sync::Arc;

use texel_sandbox::{SandboxResult, StagingArea, locate_output, resolve_reported_output};
use tokio::task::JoinError;
use texel_telemetry::{Metrics, RequestContext};
use tracing::{Instrument, error, info, info_span, warn};

use crate::adapter::ConverterAdapter;
use crate::converter::{Converter, Operation};
use crate::error::{ConvertError, ConvertResult, FailureClass};
use crate::job::{ConversionSettings, ConvertedFile, RequestJob};

/// Runs conversion jobs end to end.
#[derive(Clone)]
pub struct ConversionService {
    adapter: ConverterAdapter,
    settings: Arc<ConversionSettings>,
    metrics: Metrics,
}

impl ConversionService {
    /// Assemble a service around `converter`.
    #[must_use]
    pub fn new(
        converter: Arc<dyn Converter>,
        settings: ConversionSettings,
        metrics: Metrics,
    ) -> Self {
        let adapter = ConverterAdapter::new(converter, settings.section_timeout, metrics.clone());
        Self {
            adapter,
            settings: Arc::new(settings),
            metrics,
        }
    }

    /// `false` once the working-directory critical section has been poisoned.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.adapter.section().is_healthy()
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// Metrics registry the service reports into.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run `job` to completion and return the converter's output.
    ///
    /// The job keeps running and cleans up even if the returned future is dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`ConvertError`] describing the first failure; see
    /// [`ConvertError::class`] for the taxonomy.
    pub async fn run(&self, job: RequestJob) -> ConvertResult<ConvertedFile> {
        let service = self.clone();
        let context = RequestContext::current();
        let span = info_span!(
            "conversion.job",
            job_id = %job.job_id,
            operation = job.operation.as_str(),
            request_id = context.as_ref().map_or("", RequestContext::request_id),
        );
        let pending = async move { service.execute(job).await }.instrument(span);
        let handle = match context {
            Some(context) => tokio::spawn(context.scope(pending)),
            None => tokio::spawn(pending),
        };
        handle
            .await
            .map_err(|source| ConvertError::TaskJoin { source })?
    }

    async fn execute(&self, job: RequestJob) -> ConvertResult<ConvertedFile> {
        let operation = job.operation;
        info!(file_name = %job.file_name, bytes = job.payload.len(), "conversion job started");

        let result = self.stage_and_convert(job).await;
        let outcome = match &result {
            Ok(file) => {
                info!(output = %file.file_name, bytes = file.contents.len(), "conversion job finished");
                "success"
            }
            Err(err) => {
                let class = err.class();
                if class == FailureClass::EnvironmentCorruption {
                    error!(error = %err, reason = %err.reason(), "conversion job failed");
                } else {
                    warn!(
                        error = %err,
                        reason = %err.reason(),
                        class = class.as_str(),
                        "conversion job failed"
                    );
                }
                class.as_str()
            }
        };
        self.metrics.inc_conversion(operation.as_str(), outcome);
        result
    }

    async fn stage_and_convert(&self, job: RequestJob) -> ConvertResult<ConvertedFile> {
        let RequestJob {
            job_id,
            file_name,
            operation,
            payload,
        } = job;
        let root = self.settings.staging_root.clone();
        let staging = tokio::task::spawn_blocking(move || {
            StagingArea::acquire_for(&root, job_id, &file_name, &payload)
        })
        .await
        .map_err(|source| ConvertError::TaskJoin { source })?
        .map_err(|source| ConvertError::sandbox("stage", source))?;

        let result = self.convert(&staging, operation).await;
        let cleanup = tokio::task::spawn_blocking(move || staging.release()).await;

        settle(result, cleanup, &self.metrics)
    }

    async fn convert(
        &self,
        staging: &StagingArea,
        operation: Operation,
    ) -> ConvertResult<ConvertedFile> {
        let output = match operation {
            Operation::Encode => {
                let reported = self.adapter.encode(staging).await?;
                resolve_reported_output(staging.directory(), &reported)
                    .map_err(|source| ConvertError::sandbox("resolve_output", source))?
            }
            Operation::Decode => {
                self.adapter.decode(staging).await?;
                self.locate_decoded(staging)?
            }
        };

        let contents = staging
            .read_output(&output)
            .map_err(|source| ConvertError::sandbox("read_output", source))?;
        let file_name = output
            .file_name()
            .and_then(|name| name.to_str())
            .map_or_else(|| default_name(operation).to_string(), str::to_string);
        Ok(ConvertedFile {
            file_name,
            content_type: operation.content_type(),
            contents,
        })
    }

    fn locate_decoded(&self, staging: &StagingArea) -> ConvertResult<PathBuf> {
        locate_output(
            staging.directory(),
            &self.settings.recovery_marker,
            Some(staging.file_name()),
        )
        .map_err(|source| ConvertError::sandbox("locate_output", source))
    }
}

/// Merge a job's outcome with its cleanup outcome.
///
/// A job error always wins over a cleanup error; any cleanup failure is
/// counted in `staging_cleanup_failures_total`.
fn settle(
    result: ConvertResult<ConvertedFile>,
    cleanup: Result<SandboxResult<()>, JoinError>,
    metrics: &Metrics,
) -> ConvertResult<ConvertedFile> {
    let cleanup = match cleanup {
        Ok(Ok(())) => return result,
        Ok(Err(source)) => ConvertError::sandbox("release", source),
        Err(source) => ConvertError::TaskJoin { source },
    };
    metrics.inc_staging_cleanup_failure();
    match result {
        Ok(_) => Err(cleanup),
        Err(err) => {
            warn!(
                error = %cleanup,
                reason = %cleanup.reason(),
                "staging cleanup failed after job failure"
            );
            Err(err)
        }
    }
}

const fn default_name(operation: Operation) -> &'static str {
    match operation {
        Operation::Encode => "encoded.gif",
        Operation::Decode => "decoded.bin",
    }
}
