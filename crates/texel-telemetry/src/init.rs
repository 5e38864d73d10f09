//! Subscriber installation for Texel processes.
//!
//! One `fmt` layer (JSON or pretty) sits on the registry under an
//! [`EnvFilter`] driven by `RUST_LOG`.

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{Result, TelemetryError};

/// Filter directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build identifier baked in at compile time through `TEXEL_BUILD_SHA`.
#[must_use]
pub const fn build_sha() -> &'static str {
    match option_env!("TEXEL_BUILD_SHA") {
        Some(sha) => sha,
        None => "dev",
    }
}

/// How the process should log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output encoding.
    pub format: LogFormat,
    /// Directive applied when `RUST_LOG` does not provide one.
    pub default_directive: &'static str,
}

impl LoggingConfig {
    /// Log in `format` with the default `info` directive.
    #[must_use]
    pub const fn with_format(format: LogFormat) -> Self {
        Self {
            format,
            default_directive: DEFAULT_LOG_LEVEL,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::with_format(LogFormat::infer())
    }
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, span fields included.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Parse `json` or `pretty` (case-insensitive); anything else infers.
    #[must_use]
    pub fn parse_or_infer(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("json") => Self::Json,
            Some("pretty") => Self::Pretty,
            _ => Self::infer(),
        }
    }

    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self {
            Self::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(false)
                .boxed(),
            Self::Pretty => fmt::layer().with_target(false).boxed(),
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::Subscriber`] when a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive));
    tracing_subscriber::registry()
        .with(config.format.layer())
        .with(filter)
        .try_init()
        .map_err(|source| TelemetryError::Subscriber { source })
}
