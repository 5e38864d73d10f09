//! Shared handler state.

use texel_convert::ConversionService;
use texel_telemetry::Metrics;

/// State handed to every handler.
pub(crate) struct ApiState {
    pub(crate) service: ConversionService,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) fn new(service: ConversionService) -> Self {
        let telemetry = service.metrics().clone();
        Self { service, telemetry }
    }
}
