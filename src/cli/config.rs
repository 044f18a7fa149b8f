use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub last_ping: Option<DateTime<Utc>>,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

/// The signed-in account, as returned by `/auth/sign-in`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub access_token: String,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            last_ping: None,
            status: ServerStatus::Unknown,
        }
    }
}

impl ServerConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }
}

impl SessionConfig {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("PROPVAULT_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("propvault").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

pub fn load_server_config_from(dir: &Path) -> anyhow::Result<ServerConfig> {
    Ok(load_json(&dir.join("server.json"))?.unwrap_or_default())
}

pub fn save_server_config_to(dir: &Path, config: &ServerConfig) -> anyhow::Result<()> {
    save_json(&dir.join("server.json"), config)
}

pub fn load_session_from(dir: &Path) -> anyhow::Result<Option<SessionConfig>> {
    load_json(&dir.join("session.json"))
}

pub fn save_session_to(dir: &Path, session: &SessionConfig) -> anyhow::Result<()> {
    save_json(&dir.join("session.json"), session)
}

pub fn clear_session_in(dir: &Path) -> anyhow::Result<()> {
    let session_file = dir.join("session.json");
    if session_file.exists() {
        fs::remove_file(session_file)?;
    }
    Ok(())
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    load_server_config_from(&get_config_dir()?)
}

pub fn save_server_config(config: &ServerConfig) -> anyhow::Result<()> {
    save_server_config_to(&get_config_dir()?, config)
}

pub fn load_session() -> anyhow::Result<Option<SessionConfig>> {
    load_session_from(&get_config_dir()?)
}

pub fn save_session(session: &SessionConfig) -> anyhow::Result<()> {
    save_session_to(&get_config_dir()?, session)
}

pub fn clear_session() -> anyhow::Result<()> {
    clear_session_in(&get_config_dir()?)
}

pub async fn ping_server(server: &ServerConfig) -> ServerStatus {
    let client = reqwest::Client::new();
    let url = format!("{}/health", server.url);

    match client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await {
        Ok(response) if response.status().is_success() => ServerStatus::Up,
        _ => ServerStatus::Down,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let server = load_server_config_from(dir.path()).unwrap();
        assert_eq!(server.url, DEFAULT_SERVER_URL);
        assert_eq!(server.status, ServerStatus::Unknown);
        assert!(load_session_from(dir.path()).unwrap().is_none());
    }

    #[test]
    fn session_survives_save_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionConfig {
            access_token: "token".into(),
            user_id: Uuid::new_v4(),
            email: Some("owner@example.com".into()),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        };

        save_session_to(dir.path(), &session).unwrap();
        let loaded = load_session_from(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.user_id, session.user_id);
        assert!(!loaded.is_expired());

        clear_session_in(dir.path()).unwrap();
        assert!(load_session_from(dir.path()).unwrap().is_none());
        clear_session_in(dir.path()).unwrap();
    }

    #[test]
    fn server_url_drops_trailing_slash() {
        assert_eq!(ServerConfig::new("http://example.test:8080/").url, "http://example.test:8080");
    }
}
