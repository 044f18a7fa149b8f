// handlers/protected/documents/download.rs - GET /api/documents/:id/download

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::DocumentService;
use crate::state::AppState;

const DOWNLOAD_FAILED: &str = "Failed to download document: ";

/// Stream the stored blob back as an attachment under its original file name
pub async fn document_download_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(document_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (document, bytes) = DocumentService::new(&state, &user)
        .download(document_id)
        .await
        .map_err(|e| ApiError::from(e).into_alert(DOWNLOAD_FAILED))?;

    let content_type = HeaderValue::from_str(&document.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&document.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    tracing::info!(owner_id = %user.user_id, document_id = %document.id, "document downloaded");
    Ok((
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    )
        .into_response())
}

fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}
