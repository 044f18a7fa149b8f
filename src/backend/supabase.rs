use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{
    AuthApi, BackendError, Credentials, ProfileFields, Session, SignUpOutcome, StorageApi,
    StoredObject, TableApi, User,
};
use crate::config::BackendConfig;
use crate::filter::Filter;
use crate::models::Table;

/// REST client for a Supabase project (GoTrue auth, PostgREST tables, Storage)
pub struct SupabaseClient {
    http: Client,
    base_url: url::Url,
    anon_key: String,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct AuthUserPayload {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUserPayload,
}

/// Objects requested per Storage list call
const LIST_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    metadata: Option<Value>,
}

impl From<AuthUserPayload> for User {
    fn from(payload: AuthUserPayload) -> Self {
        Self { id: payload.id, email: payload.email }
    }
}

impl TokenPayload {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(self.expires_in.unwrap_or(3600)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

impl SupabaseClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| BackendError::new("SUPABASE_URL is not configured"))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or_else(|| BackendError::new("SUPABASE_ANON_KEY is not configured"))?;
        let base_url = url::Url::parse(url).map_err(|e| BackendError::new(format!("Invalid SUPABASE_URL: {}", e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::new(e.to_string()))?;

        Ok(Self { http, base_url, anon_key, bucket: config.bucket.clone() })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::new(format!("Invalid backend path '{}': {}", path, e)))
    }

    /// Attach the project key and the caller's token (anon key when signed out)
    fn authorized(&self, builder: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token.unwrap_or(&self.anon_key))
    }

    fn object_url(&self, path: &str) -> Result<url::Url, BackendError> {
        self.endpoint(&format!("storage/v1/object/{}/{}", self.bucket, path.trim_start_matches('/')))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, BackendError> {
        let response = builder.send().await.map_err(|e| BackendError::new(e.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Pull the human-readable message out of a GoTrue/PostgREST/Storage error body
async fn error_from_response(response: Response) -> BackendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            } else {
                body
            }
        });
    tracing::debug!("backend responded {}: {}", status, message);
    BackendError::new(message)
}

#[async_trait]
impl AuthApi for SupabaseClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        let url = self.endpoint("auth/v1/token?grant_type=password")?;
        let response = self
            .send(self.authorized(self.http.post(url), None).json(credentials))
            .await?;
        let payload: TokenPayload = response.json().await.map_err(|e| BackendError::new(e.to_string()))?;
        Ok(payload.into_session())
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        profile: &ProfileFields,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
            "data": { "full_name": profile.full_name, "phone": profile.phone },
        });
        let response = self.send(self.authorized(self.http.post(url), None).json(&body)).await?;
        let payload: Value = response.json().await.map_err(|e| BackendError::new(e.to_string()))?;

        // With email confirmation enabled the backend returns the bare user object
        if payload.get("access_token").is_some() {
            let token: TokenPayload =
                serde_json::from_value(payload).map_err(|e| BackendError::new(e.to_string()))?;
            Ok(SignUpOutcome::SignedIn(token.into_session()))
        } else {
            let user_value = payload.get("user").cloned().unwrap_or(payload);
            let user: AuthUserPayload =
                serde_json::from_value(user_value).map_err(|e| BackendError::new(e.to_string()))?;
            Ok(SignUpOutcome::ConfirmationPending(user.into()))
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        self.send(self.authorized(self.http.post(url), Some(access_token))).await?;
        Ok(())
    }
}

#[async_trait]
impl TableApi for SupabaseClient {
    async fn select(&self, access_token: &str, table: Table, filter: &Filter) -> Result<Vec<Value>, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        let builder = self.http.get(url).query(&filter.to_query_pairs());
        let response = self.send(self.authorized(builder, Some(access_token))).await?;
        response.json().await.map_err(|e| BackendError::new(e.to_string()))
    }

    async fn insert(&self, access_token: &str, table: Table, row: Value) -> Result<Value, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        let builder = self
            .http
            .post(url)
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.send(self.authorized(builder, Some(access_token))).await?;
        let mut rows: Vec<Value> = response.json().await.map_err(|e| BackendError::new(e.to_string()))?;
        rows.pop()
            .ok_or_else(|| BackendError::new(format!("Insert into {} returned no row", table)))
    }

    async fn delete(&self, access_token: &str, table: Table, id: Uuid) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        let builder = self.http.delete(url).query(&[("id", format!("eq.{}", id))]);
        self.send(self.authorized(builder, Some(access_token))).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageApi for SupabaseClient {
    async fn upload(
        &self,
        access_token: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let url = self.object_url(path)?;
        let builder = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes);
        self.send(self.authorized(builder, Some(access_token))).await?;
        Ok(())
    }

    async fn download(&self, access_token: &str, path: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.object_url(path)?;
        let response = self.send(self.authorized(self.http.get(url), Some(access_token))).await?;
        let bytes = response.bytes().await.map_err(|e| BackendError::new(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn remove(&self, access_token: &str, paths: &[String]) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/{}", self.bucket))?;
        let builder = self.http.delete(url).json(&json!({ "prefixes": paths }));
        self.send(self.authorized(builder, Some(access_token))).await?;
        Ok(())
    }

    async fn list(&self, access_token: &str, prefix: &str) -> Result<Vec<StoredObject>, BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/list/{}", self.bucket))?;
        let folder = prefix.trim_end_matches('/');

        // Storage answers one page at a time; a short page is the last one
        let mut objects = Vec::new();
        let mut offset = 0;
        loop {
            let body = json!({
                "prefix": folder,
                "limit": LIST_PAGE_SIZE,
                "offset": offset,
                "sortBy": { "column": "name", "order": "asc" },
            });
            let builder = self.http.post(url.clone()).json(&body);
            let response = self.send(self.authorized(builder, Some(access_token))).await?;
            let listed: Vec<ListedObject> = response.json().await.map_err(|e| BackendError::new(e.to_string()))?;
            let page_len = listed.len();

            objects.extend(
                listed
                    .into_iter()
                    // Sub-folders are listed without an id
                    .filter(|o| o.id.is_some())
                    .map(|o| StoredObject {
                        path: format!("{}/{}", folder, o.name),
                        size: o
                            .metadata
                            .as_ref()
                            .and_then(|m| m.get("size"))
                            .and_then(Value::as_u64),
                        created_at: o.created_at,
                    }),
            );

            if page_len < LIST_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        tracing::debug!(prefix = folder, count = objects.len(), "listed stored objects");
        Ok(objects)
    }
}
