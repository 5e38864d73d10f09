//! Shared HTTP constants (headers, problem URIs, upload field).

pub(crate) const UPLOAD_FIELD: &str = "file";
pub(crate) const LIVENESS_MESSAGE: &str = "Texel API is running";

pub(crate) const PROBLEM_INTERNAL: &str = "https://texel.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://texel.dev/problems/bad-request";
pub(crate) const PROBLEM_PAYLOAD_TOO_LARGE: &str = "https://texel.dev/problems/payload-too-large";
pub(crate) const PROBLEM_CONVERSION_FAILED: &str = "https://texel.dev/problems/conversion-failed";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://texel.dev/problems/service-unavailable";
