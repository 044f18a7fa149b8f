use reqwest::{multipart, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;

use crate::cli::config::{self, SessionConfig};

/// Thin reqwest wrapper over the PropVault HTTP API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Successful envelope contents
#[derive(Debug)]
pub struct ApiReply {
    pub data: Value,
    pub notice: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Client for the configured server without credentials
    pub fn anonymous() -> anyhow::Result<Self> {
        let server = config::load_server_config()?;
        Ok(Self::new(&server.url, None))
    }

    /// Client for the configured server carrying the stored session token
    pub fn authenticated() -> anyhow::Result<Self> {
        let server = config::load_server_config()?;
        let session = require_session()?;
        Ok(Self::new(&server.url, Some(session.access_token)))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<ApiReply> {
        read_envelope(self.request(Method::GET, path).send().await?).await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> anyhow::Result<ApiReply> {
        read_envelope(self.request(Method::POST, path).json(body).send().await?).await
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<ApiReply> {
        read_envelope(self.request(Method::DELETE, path).send().await?).await
    }

    pub async fn upload(&self, form: multipart::Form) -> anyhow::Result<ApiReply> {
        read_envelope(self.request(Method::POST, "/api/documents").multipart(form).send().await?).await
    }

    /// Raw bytes plus the server's suggested file name
    pub async fn download(&self, path: &str) -> anyhow::Result<(Vec<u8>, Option<String>)> {
        let response = self.request(Method::GET, path).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(anyhow::anyhow!(error_message(&body, status)));
        }

        let file_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), file_name))
    }
}

pub fn require_session() -> anyhow::Result<SessionConfig> {
    match config::load_session()? {
        Some(session) if !session.is_expired() => Ok(session),
        Some(_) => Err(anyhow::anyhow!("Session expired. Run `propvault auth sign-in` again")),
        None => Err(anyhow::anyhow!("Not signed in. Run `propvault auth sign-in` first")),
    }
}

async fn read_envelope(response: Response) -> anyhow::Result<ApiReply> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if !status.is_success() || body["success"] != Value::Bool(true) {
        return Err(anyhow::anyhow!(error_message(&body, status)));
    }

    Ok(ApiReply {
        notice: body["notice"]["message"].as_str().map(str::to_string),
        data: body["data"].clone(),
    })
}

fn error_message(body: &Value, status: reqwest::StatusCode) -> String {
    let mut message = body["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status));

    if let Some(fields) = body["field_errors"].as_object() {
        let mut details: Vec<String> = fields
            .iter()
            .map(|(field, error)| format!("{}: {}", field, error.as_str().unwrap_or_default()))
            .collect();
        details.sort();
        message = format!("{} ({})", message, details.join(", "));
    }
    message
}

fn disposition_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
}
