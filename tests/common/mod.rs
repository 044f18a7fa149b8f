#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use propvault::backend::MemoryBackend;
use propvault::config::AppConfig;
use propvault::AppState;

pub const PASSWORD: &str = "correct-horse";

/// One router on its own port, backed by an inspectable in-memory backend
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub backend: Arc<MemoryBackend>,
    pub client: reqwest::Client,
}

/// A signed-up account and its bearer token
#[derive(Debug, Clone)]
pub struct Owner {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(AppConfig::for_tests()).await
    }

    pub async fn spawn_with(mut config: AppConfig) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        config.api.port = port;
        config.api.enable_request_logging = false;

        let backend = Arc::new(MemoryBackend::new(
            config.backend.jwt_secret.clone(),
            config.security.jwt_expiry_hours,
        ));
        let state = AppState::new(config, backend.clone());
        let app = propvault::app(state);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self { port, base_url, backend, client: reqwest::Client::new() };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn sign_up(&self, email: &str, full_name: &str) -> Result<Owner> {
        let (status, body) = self
            .post_public("/auth/sign-up", json!({ "email": email, "password": PASSWORD, "full_name": full_name }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "sign-up failed: {} {}", status, body);

        Ok(Owner {
            user_id: serde_json::from_value(body["data"]["user"]["id"].clone())?,
            email: email.to_string(),
            token: body["data"]["session"]["access_token"]
                .as_str()
                .context("sign-up returned no session")?
                .to_string(),
        })
    }

    /// A second session for an existing account
    pub async fn sign_in(&self, owner: &Owner) -> Result<Owner> {
        let (status, body) = self
            .post_public("/auth/sign-in", json!({ "email": owner.email, "password": PASSWORD }))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "sign-in failed: {} {}", status, body);

        Ok(Owner {
            token: body["data"]["access_token"]
                .as_str()
                .context("sign-in returned no token")?
                .to_string(),
            ..owner.clone()
        })
    }

    pub async fn post_public(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let resp = self.client.post(self.url(path)).json(&body).send().await?;
        read(resp).await
    }

    pub async fn get(&self, owner: &Owner, path: &str) -> Result<(StatusCode, Value)> {
        let resp = self.client.get(self.url(path)).bearer_auth(&owner.token).send().await?;
        read(resp).await
    }

    pub async fn post(&self, owner: &Owner, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(&owner.token)
            .json(&body)
            .send()
            .await?;
        read(resp).await
    }

    pub async fn delete(&self, owner: &Owner, path: &str) -> Result<(StatusCode, Value)> {
        let resp = self.client.delete(self.url(path)).bearer_auth(&owner.token).send().await?;
        read(resp).await
    }

    pub async fn add_property(&self, owner: &Owner, name: &str) -> Result<Value> {
        let (status, body) = self
            .post(owner, "/api/properties", json!({ "property_name": name, "address": "1 Ocean Dr" }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "property creation failed: {} {}", status, body);
        Ok(body["data"].clone())
    }

    pub async fn upload(
        &self,
        owner: &Owner,
        file_name: &str,
        bytes: Vec<u8>,
        document_type: Option<&str>,
        property_id: Option<Uuid>,
    ) -> Result<(StatusCode, Value)> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = Form::new().part("file", part);
        if let Some(document_type) = document_type {
            form = form.text("document_type", document_type.to_string());
        }
        if let Some(property_id) = property_id {
            form = form.text("property_id", property_id.to_string());
        }

        let resp = self
            .client
            .post(self.url("/api/documents"))
            .bearer_auth(&owner.token)
            .multipart(form)
            .send()
            .await?;
        read(resp).await
    }
}

async fn read(resp: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = resp.status();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}

/// Poll until `check` holds; dashboard revisions are applied by a background listener
pub async fn eventually<F, Fut>(mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check().await? {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    anyhow::bail!("condition not met within 2s")
}
