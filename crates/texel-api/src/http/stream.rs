//! Attachment responses for converter output.

use axum::{
    body::Body,
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use texel_convert::ConvertedFile;
use tracing::error;

use crate::http::errors::ApiError;

/// Emit `file` as a single in-memory body with download headers.
pub(crate) fn attachment(file: ConvertedFile) -> Result<Response, ApiError> {
    let length = file.contents.len();
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, file.content_type)
        .header(CONTENT_DISPOSITION, content_disposition(&file.file_name))
        .header(CONTENT_LENGTH, length)
        .body(Body::from(file.contents))
        .map_err(|err| {
            error!(error = %err, "failed to build attachment response");
            ApiError::internal("failed to build attachment response")
        })
}

/// `attachment; filename="<name>"` with quotes and backslashes escaped and
/// control characters replaced by `_`.
pub(crate) fn content_disposition(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    for ch in name.chars() {
        match ch {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(ch);
            }
            ch if ch.is_control() => quoted.push('_'),
            ch => quoted.push(ch),
        }
    }
    format!("attachment; filename=\"{quoted}\"")
}
