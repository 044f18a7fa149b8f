//! Client surface of the managed backend: authentication, relational tables
//! and object storage. Everything durable lives behind these traits.

pub mod memory;
pub mod repository;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppConfig, BackendKind};
use crate::filter::Filter;
use crate::models::Table;

pub use memory::MemoryBackend;
pub use repository::{Repository, RepositoryError};
pub use supabase::SupabaseClient;

/// Failure reported by the backend. The message is taken verbatim from its error payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Profile fields passed along with sign-up; the backend turns them into a `house_owners` row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFields {
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    SignedIn(Session),
    /// Account created but the backend requires email confirmation before issuing a session
    ConfirmationPending(User),
}

/// An object in the documents bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    /// Full path inside the bucket, e.g. `{owner_id}/1718000000000.pdf`
    pub path: String,
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError>;

    async fn sign_up(
        &self,
        credentials: &Credentials,
        profile: &ProfileFields,
    ) -> Result<SignUpOutcome, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}

#[async_trait]
pub trait TableApi: Send + Sync {
    /// Scoped read; the backend's access policy restricts rows to the token's user
    async fn select(&self, access_token: &str, table: Table, filter: &Filter) -> Result<Vec<Value>, BackendError>;

    /// Single-row insert returning the stored row
    async fn insert(&self, access_token: &str, table: Table, row: Value) -> Result<Value, BackendError>;

    /// Single-row delete by identifier
    async fn delete(&self, access_token: &str, table: Table, id: Uuid) -> Result<(), BackendError>;
}

#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn upload(
        &self,
        access_token: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError>;

    async fn download(&self, access_token: &str, path: &str) -> Result<Vec<u8>, BackendError>;

    async fn remove(&self, access_token: &str, paths: &[String]) -> Result<(), BackendError>;

    /// Objects whose path starts with `prefix` (a `{owner_id}/` folder)
    async fn list(&self, access_token: &str, prefix: &str) -> Result<Vec<StoredObject>, BackendError>;
}

pub trait Backend: AuthApi + TableApi + StorageApi {}

impl<T: AuthApi + TableApi + StorageApi> Backend for T {}

pub type SharedBackend = Arc<dyn Backend>;

/// Build the configured backend client
pub fn from_config(config: &AppConfig) -> Result<SharedBackend, BackendError> {
    match config.backend.kind {
        BackendKind::Supabase => {
            let client = SupabaseClient::from_config(&config.backend)?;
            tracing::info!("Using Supabase backend at {}", client.base_url());
            Ok(Arc::new(client))
        }
        BackendKind::Memory => {
            tracing::warn!("Using in-memory backend; nothing will be persisted");
            Ok(Arc::new(MemoryBackend::new(
                config.backend.jwt_secret.clone(),
                config.security.jwt_expiry_hours,
            )))
        }
    }
}
