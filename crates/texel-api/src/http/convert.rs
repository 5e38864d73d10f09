//! Encode/decode upload handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Response,
};
use texel_convert::{Operation, RequestJob};
use tracing::info;

use crate::http::constants::UPLOAD_FIELD;
use crate::http::errors::ApiError;
use crate::http::stream::attachment;
use crate::state::ApiState;

pub(crate) async fn encode(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    convert(&state, multipart, Operation::Encode).await
}

pub(crate) async fn decode(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    convert(&state, multipart, Operation::Decode).await
}

async fn convert(
    state: &ApiState,
    multipart: Result<Multipart, MultipartRejection>,
    operation: Operation,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        ApiError::bad_request(format!("expected a multipart upload: {}", rejection.body_text()))
    })?;
    let upload = read_upload(&mut multipart).await?;
    let job = RequestJob::new(operation, upload.file_name, upload.bytes);
    info!(
        job_id = %job.job_id,
        operation = operation.as_str(),
        file_name = %job.file_name,
        "accepted upload"
    );

    let file = state
        .service
        .run(job)
        .await
        .map_err(|err| ApiError::from_job(operation, &err))?;
    attachment(file)
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Take the `file` field, or the first field carrying a file name when no
/// field is called `file`.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    let mut fallback = None;
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let named = field.name() == Some(UPLOAD_FIELD);
        let Some(file_name) = field.file_name().map(str::to_string) else {
            if named {
                return Err(ApiError::bad_request("upload field has no file name"));
            }
            continue;
        };
        if !named && fallback.is_some() {
            continue;
        }
        let bytes = field.bytes().await.map_err(upload_error)?.to_vec();
        let upload = Upload { file_name, bytes };
        if named {
            return Ok(upload);
        }
        fallback = Some(upload);
    }
    fallback.ok_or_else(|| ApiError::bad_request("missing file field"))
}

fn upload_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::bad_request(format!("unreadable multipart body: {}", err.body_text()))
    }
}
