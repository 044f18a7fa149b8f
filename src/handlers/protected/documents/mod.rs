// handlers/protected/documents/mod.rs - Document upload and list
pub mod download;
pub mod upload;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::format::{documents_heading, documents_title, DocumentView, NO_DOCUMENTS};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::DocumentService;
use crate::state::AppState;

pub use download::document_download_get;
pub use upload::documents_post;

const DELETE_FAILED: &str = "Failed to delete document: ";

#[derive(Debug, Default, Deserialize)]
pub struct DocumentListQuery {
    pub property_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct DocumentListView {
    pub title: &'static str,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
    pub property_id: Option<Uuid>,
    pub documents: Vec<DocumentView>,
}

#[derive(Debug, Serialize)]
pub struct DeletedView {
    pub id: Uuid,
    pub file_name: String,
}

/// GET /api/documents[?property_id=] - The owner's documents, newest first
///
/// Without `property_id` the dashboard's current selection applies; with no
/// selection every document of the owner is listed.
pub async fn documents_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<DocumentListQuery>, QueryRejection>,
) -> ApiResult<DocumentListView> {
    let Query(query) = query?;
    let property_id = query
        .property_id
        .or_else(|| state.dashboards.selected_property(user.user_id));

    let documents = DocumentService::new(&state, &user).list(property_id).await?;

    Ok(ApiResponse::success(DocumentListView {
        title: documents_title(property_id.is_some()),
        heading: documents_heading(documents.len()),
        empty_message: documents.is_empty().then_some(NO_DOCUMENTS),
        property_id,
        documents: documents.into_iter().map(DocumentView::from).collect(),
    }))
}

/// DELETE /api/documents/:id?confirm=true - Remove the blob, then the row
pub async fn document_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(document_id): Path<Uuid>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> ApiResult<DeletedView> {
    let Query(query) = query.map_err(|e| ApiError::from(e).into_alert(DELETE_FAILED))?;
    if !query.confirm {
        return Err(ApiError::bad_request("Deletion must be confirmed with confirm=true").into_alert(DELETE_FAILED));
    }

    let document = DocumentService::new(&state, &user)
        .delete(document_id)
        .await
        .map_err(|e| ApiError::from(e).into_alert(DELETE_FAILED))?;

    Ok(ApiResponse::success(DeletedView {
        id: document.id,
        file_name: document.file_name,
    }))
}
