use serde_json::json;
use uuid::Uuid;

use crate::backend::{BackendError, Repository, RepositoryError, SharedBackend};
use crate::config::UploadConfig;
use crate::error::ApiError;
use crate::events::{Event, EventBus};
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{Document, DocumentType, NewDocument, Table};
use crate::state::AppState;
use crate::upload::{self, UploadError};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("Document not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Storage(#[from] BackendError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Upload(e) => e.into(),
            DocumentError::NotFound(id) => ApiError::not_found(format!("Document not found: {}", id)),
            DocumentError::Storage(e) => e.into(),
            DocumentError::Repository(e) => e.into(),
        }
    }
}

/// A file received from the client, not yet validated
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub declared_type: Option<String>,
    pub document_type: DocumentType,
    pub property_id: Option<Uuid>,
}

pub struct DocumentService {
    backend: SharedBackend,
    documents: Repository<Document>,
    owner_id: Uuid,
    access_token: String,
    upload_config: UploadConfig,
    events: EventBus,
}

impl DocumentService {
    pub fn new(state: &AppState, user: &AuthUser) -> Self {
        Self {
            backend: state.backend.clone(),
            documents: state.repository(Table::Documents, user),
            owner_id: user.user_id,
            access_token: user.access_token.clone(),
            upload_config: state.config.upload.clone(),
            events: state.events.clone(),
        }
    }

    /// The owner's documents, newest first, narrowed to one property when given
    pub async fn list(&self, property_id: Option<Uuid>) -> Result<Vec<Document>, DocumentError> {
        let mut conditions = json!({ "owner_id": self.owner_id });
        if let Some(property_id) = property_id {
            conditions["property_id"] = json!(property_id);
        }
        let filter = FilterData {
            where_clause: Some(conditions),
            order: Some(json!("uploaded_at desc")),
            ..Default::default()
        };
        Ok(self.documents.select_all(filter).await?)
    }

    /// Other owners' rows are hidden by the access policy and read as missing
    pub async fn find(&self, document_id: Uuid) -> Result<Document, DocumentError> {
        match self.documents.select_id(document_id).await {
            Err(RepositoryError::NotFound) => Err(DocumentError::NotFound(document_id)),
            other => Ok(other?),
        }
    }

    /// Store the blob, then write the metadata row that points at it.
    ///
    /// The two writes are independent. A failed blob upload leaves nothing
    /// behind; a failed row insert leaves an orphaned blob for
    /// reconciliation to collect.
    pub async fn upload(&self, request: UploadRequest) -> Result<Document, DocumentError> {
        let file = upload::validate(
            &request.file_name,
            request.bytes.len() as u64,
            request.declared_type.as_deref(),
            &self.upload_config,
        )?;
        let path = upload::storage_path(self.owner_id, &file.extension);

        self.backend
            .upload(&self.access_token, &path, request.bytes, &file.mime_type)
            .await
            .map_err(|e| {
                tracing::error!(owner_id = %self.owner_id, "blob upload failed: {}", e);
                e
            })?;

        let new_document = NewDocument {
            owner_id: self.owner_id,
            property_id: request.property_id,
            document_type: request.document_type,
            file_name: file.file_name,
            file_path: path.clone(),
            file_size: file.size,
            mime_type: file.mime_type,
        };
        let document = match self.documents.insert(&new_document).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(owner_id = %self.owner_id, path = %path, "metadata insert failed, blob orphaned: {}", e);
                return Err(e.into());
            }
        };

        tracing::info!(owner_id = %self.owner_id, document_id = %document.id, size = document.file_size, "document uploaded");
        self.events.emit(Event::DocumentUploaded {
            owner_id: self.owner_id,
            document_id: document.id,
            property_id: document.property_id,
        });
        Ok(document)
    }

    pub async fn download(&self, document_id: Uuid) -> Result<(Document, Vec<u8>), DocumentError> {
        let document = self.find(document_id).await?;
        let bytes = self.backend.download(&self.access_token, &document.file_path).await?;
        Ok((document, bytes))
    }

    /// Remove the blob, then the row. A failed blob removal leaves the row untouched;
    /// a failed row delete leaves it pointing at a missing blob.
    pub async fn delete(&self, document_id: Uuid) -> Result<Document, DocumentError> {
        let document = self.find(document_id).await?;

        self.backend
            .remove(&self.access_token, std::slice::from_ref(&document.file_path))
            .await?;

        if let Err(e) = self.documents.delete(document.id).await {
            tracing::warn!(owner_id = %self.owner_id, document_id = %document.id, "row delete failed after blob removal, row dangling: {}", e);
            return Err(e.into());
        }

        tracing::info!(owner_id = %self.owner_id, document_id = %document.id, "document deleted");
        self.events.emit(Event::DocumentDeleted {
            owner_id: self.owner_id,
            document_id: document.id,
        });
        Ok(document)
    }
}
