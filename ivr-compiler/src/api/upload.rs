//! POST /upload

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::Upload;
use crate::AppState;

/// Largest accepted menu description
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub total: usize,
}

/// Accept a menu file and start compiling it
///
/// Multipart fields: `file` (required) and `format` (optional hint that
/// overrides the file name extension). Returns 202 with the build id; the
/// audio is produced in the background.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let mut upload: Option<Upload> = None;
    let mut format_hint: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file field: {}", e)))?;

                let mut parsed = Upload::new(bytes.to_vec());
                parsed.file_name = file_name;
                upload = Some(parsed);
            }
            Some("format") => {
                let hint = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read format field: {}", e)))?;
                format_hint = Some(hint);
            }
            _ => {}
        }
    }

    let mut upload = upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    upload.format_hint = format_hint;

    let handle = state.runner.submit(upload).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            id: handle.build_id,
            total: handle.total,
        }),
    ))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
