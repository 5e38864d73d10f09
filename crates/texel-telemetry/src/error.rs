//! Telemetry error type.

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures raised while installing logging or operating the metrics registry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber")]
    Subscriber {
        /// Underlying subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A collector could not be built or registered.
    #[error("failed to set up metric")]
    Metric {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: prometheus::Error,
    },
    /// The registry could not be encoded in text format.
    #[error("failed to render metrics")]
    Render {
        /// Underlying Prometheus error.
        #[source]
        source: prometheus::Error,
    },
    /// The encoder produced invalid UTF-8.
    #[error("rendered metrics were not valid utf-8")]
    RenderUtf8 {
        /// Underlying conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_constant_and_sources_kept() {
        let metric = TelemetryError::Metric {
            name: "conversions_total",
            source: prometheus::Error::AlreadyReg,
        };
        assert_eq!(metric.to_string(), "failed to set up metric");
        assert!(metric.source().is_some());

        let Err(utf8) = String::from_utf8(vec![0xff]) else {
            panic!("expected invalid utf-8");
        };
        let utf8 = TelemetryError::RenderUtf8 { source: utf8 };
        assert_eq!(utf8.to_string(), "rendered metrics were not valid utf-8");
        assert!(utf8.source().is_some());
    }
}
