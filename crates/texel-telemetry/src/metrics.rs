//! Prometheus collectors for the conversion service.
//!
//! Each [`Metrics`] owns a private registry, so tests can build as many as
//! they like without colliding on collector names.

use std::sync::Arc;
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Cheaply cloneable handle to the service's collectors.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    conversions_total: IntCounterVec,
    critical_section_wait_ms: IntGauge,
    critical_section_occupied: IntGauge,
    staging_cleanup_failures_total: IntCounter,
}

/// Point-in-time copy of the critical-section gauges and cleanup counter.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Latest time (ms) a job waited to enter the working-directory critical section.
    pub critical_section_wait_ms: i64,
    /// `1` while a job holds the working-directory critical section.
    pub critical_section_occupied: i64,
    /// Total staging directories that could not be removed.
    pub staging_cleanup_failures_total: u64,
}

impl Metrics {
    /// Build and register every collector.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = registered(
            &registry,
            "http_requests_total",
            IntCounterVec::new(
                Opts::new("http_requests_total", "HTTP requests by matched route and status"),
                &["route", "code"],
            ),
        )?;
        let conversions_total = registered(
            &registry,
            "conversions_total",
            IntCounterVec::new(
                Opts::new(
                    "conversions_total",
                    "Conversion jobs by operation and outcome",
                ),
                &["operation", "outcome"],
            ),
        )?;
        let critical_section_wait_ms = registered(
            &registry,
            "critical_section_wait_ms",
            IntGauge::with_opts(Opts::new(
                "critical_section_wait_ms",
                "Time the latest job waited for the working-directory critical section (ms)",
            )),
        )?;
        let critical_section_occupied = registered(
            &registry,
            "critical_section_occupied",
            IntGauge::with_opts(Opts::new(
                "critical_section_occupied",
                "1 while a job holds the working-directory critical section",
            )),
        )?;
        let staging_cleanup_failures_total = registered(
            &registry,
            "staging_cleanup_failures_total",
            IntCounter::with_opts(Opts::new(
                "staging_cleanup_failures_total",
                "Staging directories that could not be removed",
            )),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                conversions_total,
                critical_section_wait_ms,
                critical_section_occupied,
                staging_cleanup_failures_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the conversion counter for an operation and its outcome label.
    pub fn inc_conversion(&self, operation: &str, outcome: &str) {
        self.inner
            .conversions_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Read the conversion counter for an operation/outcome pair.
    #[must_use]
    pub fn conversions(&self, operation: &str, outcome: &str) -> u64 {
        self.inner
            .conversions_total
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Record how long a job waited to enter the critical section.
    pub fn observe_critical_section_wait(&self, duration: Duration) {
        self.inner
            .critical_section_wait_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Flag whether the critical section is currently held.
    pub fn set_critical_section_occupied(&self, occupied: bool) {
        self.inner
            .critical_section_occupied
            .set(i64::from(occupied));
    }

    /// Increment the staging cleanup failure counter.
    pub fn inc_staging_cleanup_failure(&self) {
        self.inner.staging_cleanup_failures_total.inc();
    }

    /// Prometheus text exposition of the registry, as served on `/metrics`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::RenderUtf8 { source })
    }

    /// Current gauge and counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            critical_section_wait_ms: self.inner.critical_section_wait_ms.get(),
            critical_section_occupied: self.inner.critical_section_occupied.get(),
            staging_cleanup_failures_total: self.inner.staging_cleanup_failures_total.get(),
        }
    }

    /// Convert a duration to milliseconds saturating at `i64::MAX`.
    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Register a freshly built collector, returning a handle to it.
fn registered<C>(
    registry: &Registry,
    name: &'static str,
    built: std::result::Result<C, prometheus::Error>,
) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    let collector = built.map_err(|source| TelemetryError::Metric { name, source })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Metric { name, source })?;
    Ok(collector)
}
