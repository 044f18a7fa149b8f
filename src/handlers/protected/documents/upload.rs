// handlers/protected/documents/upload.rs - POST /api/documents (multipart)

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Extension,
};
use uuid::Uuid;

use crate::api::format::DocumentView;
use crate::config::UploadConfig;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Notice};
use crate::models::DocumentType;
use crate::services::{DocumentService, UploadRequest};
use crate::state::AppState;
use crate::upload::{self, UploadError};

struct ReceivedFile {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// POST /api/documents - Upload one document
///
/// Multipart fields:
/// - `file` (required): the document; at most 10 MB, pdf/png/jpg/jpeg
/// - `document_type` (optional, default `identity`)
/// - `property_id` (optional, default: the dashboard's selected property)
///
/// Size and type are checked before anything is sent to the backend.
pub async fn documents_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<DocumentView> {
    let mut file: Option<ReceivedFile> = None;
    let mut document_type = DocumentType::default();
    let mut property_id: Option<Uuid> = None;

    let mut received: u64 = 0;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| body_error(e, received, &state.config.upload))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);

                // Keep draining past the limit so the client sees the error, not a reset
                let mut bytes = Vec::new();
                received = 0;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| body_error(e, received, &state.config.upload))?
                {
                    received += chunk.len() as u64;
                    if upload::check_size(received, &state.config.upload).is_ok() {
                        bytes.extend_from_slice(&chunk);
                    }
                }
                upload::check_size(received, &state.config.upload)?;

                file = Some(ReceivedFile { file_name, content_type, bytes });
            }
            Some("document_type") => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    document_type = value
                        .trim()
                        .parse()
                        .map_err(|e: String| ApiError::field_error("document_type", e))?;
                }
            }
            Some("property_id") => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    property_id = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| ApiError::field_error("property_id", format!("Invalid property id: {}", value)))?,
                    );
                }
            }
            _ => {
                tracing::debug!("ignoring multipart field {:?}", name);
            }
        }
    }

    let file = file.ok_or(UploadError::MissingFile)?;
    let property_id = property_id.or_else(|| state.dashboards.selected_property(user.user_id));

    let document = DocumentService::new(&state, &user)
        .upload(UploadRequest {
            file_name: file.file_name,
            bytes: file.bytes,
            declared_type: file.content_type,
            document_type,
            property_id,
        })
        .await?;

    let notice = Notice::new("Document uploaded successfully!", state.config.notices.document_uploaded_ms);
    Ok(ApiResponse::created(DocumentView::from(document)).with_notice(notice))
}

/// A body cut off by the request size limit is reported as an oversized file
fn body_error(err: MultipartError, received: u64, config: &UploadConfig) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let size = received.max(config.max_file_size_bytes.saturating_add(1));
        return UploadError::TooLarge { size, limit: config.max_file_size_bytes }.into();
    }
    err.into()
}
