//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use texel_convert::{ConvertError, FailureClass, Operation};
use texel_telemetry::RequestContext;
use tracing::debug;

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_CONVERSION_FAILED, PROBLEM_INTERNAL, PROBLEM_PAYLOAD_TOO_LARGE,
    PROBLEM_SERVICE_UNAVAILABLE,
};
use crate::models::ProblemDetails;

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            PROBLEM_PAYLOAD_TOO_LARGE,
            "payload too large",
        )
        .with_detail(detail)
    }

    pub(crate) fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_SERVICE_UNAVAILABLE,
            "service unavailable",
        )
        .with_detail(detail)
    }

    pub(crate) fn conversion_failed(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_CONVERSION_FAILED,
            "conversion failed",
        )
        .with_detail(detail)
    }

    /// Translate a failed job into the single caller-facing failure response.
    pub(crate) fn from_job(operation: Operation, err: &ConvertError) -> Self {
        let detail = format!("{} failed: {}", operation.gerund(), err.reason());
        match err.class() {
            FailureClass::InvalidInput => Self::bad_request(detail),
            FailureClass::Busy | FailureClass::EnvironmentCorruption => {
                Self::service_unavailable(detail)
            }
            FailureClass::Conversion | FailureClass::OutputNotFound => {
                Self::conversion_failed(detail)
            }
            FailureClass::StagingIo | FailureClass::Internal => Self::internal(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let context = RequestContext::current();
        debug!(
            status = self.status.as_u16(),
            kind = self.kind,
            request_id = context.as_ref().map_or("", RequestContext::request_id),
            route = context.as_ref().map_or("", RequestContext::route),
            "responding with problem document"
        );
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use texel_sandbox::SandboxError;

    fn sandbox(source: SandboxError) -> ConvertError {
        ConvertError::Sandbox {
            operation: "test",
            source,
        }
    }

    #[test]
    fn conversion_failures_map_to_500_with_operation_detail() {
        let err = ApiError::from_job(
            Operation::Decode,
            &ConvertError::Conversion {
                operation: Operation::Decode,
                message: "bad header".to_string(),
            },
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind, PROBLEM_CONVERSION_FAILED);
        assert_eq!(err.detail.as_deref(), Some("Decoding failed: bad header"));
    }

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let invalid = ApiError::from_job(
            Operation::Encode,
            &sandbox(SandboxError::InvalidInput {
                field: "file_name",
                reason: "empty",
                value: None,
            }),
        );
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            invalid.detail.as_deref(),
            Some("Encoding failed: invalid file_name (empty)")
        );

        let busy = ApiError::from_job(
            Operation::Encode,
            &sandbox(SandboxError::SectionTimeout {
                waited: Duration::from_secs(1),
            }),
        );
        assert_eq!(busy.status, StatusCode::SERVICE_UNAVAILABLE);

        let poisoned = ApiError::from_job(Operation::Decode, &sandbox(SandboxError::SectionPoisoned));
        assert_eq!(poisoned.status, StatusCode::SERVICE_UNAVAILABLE);

        let missing = ApiError::from_job(
            Operation::Decode,
            &sandbox(SandboxError::OutputNotFound {
                marker: "-recovered".into(),
                directory: "/tmp".into(),
            }),
        );
        assert_eq!(missing.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.kind, PROBLEM_CONVERSION_FAILED);
    }

    #[test]
    fn constructors_set_status_and_kind() {
        assert_eq!(ApiError::bad_request("x").status, StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::payload_too_large("x").status,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::service_unavailable("x").kind,
            PROBLEM_SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::internal("x").kind, PROBLEM_INTERNAL);
    }
}
