use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub upload: UploadConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub maintenance: MaintenanceConfig,
    pub notices: NoticeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Supabase,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// HS256 secret the backend signs access tokens with. Empty disables signature checks.
    pub jwt_secret: String,
    pub bucket: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub require_https: bool,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub reconcile_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeConfig {
    pub property_added_ms: u64,
    pub document_uploaded_ms: u64,
}

const TEN_MB: u64 = 10 * 1024 * 1024;

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Backend overrides
        if let Ok(v) = env::var("BACKEND_KIND") {
            self.backend.kind = match v.to_ascii_lowercase().as_str() {
                "memory" => BackendKind::Memory,
                "supabase" => BackendKind::Supabase,
                _ => self.backend.kind,
            };
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.backend.url = Some(v.trim_end_matches('/').to_string());
        }
        if let Ok(v) = env::var("SUPABASE_ANON_KEY") {
            self.backend.anon_key = Some(v);
        }
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.backend.jwt_secret = v;
        }
        if let Ok(v) = env::var("STORAGE_BUCKET") {
            self.backend.bucket = v;
        }
        if let Ok(v) = env::var("BACKEND_REQUEST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = v.parse().unwrap_or(self.backend.request_timeout_secs);
        }

        // Upload overrides
        if let Ok(v) = env::var("UPLOAD_MAX_FILE_SIZE_BYTES") {
            self.upload.max_file_size_bytes = v.parse().unwrap_or(self.upload.max_file_size_bytes);
        }
        if let Ok(v) = env::var("UPLOAD_ALLOWED_EXTENSIONS") {
            self.upload.allowed_extensions = v
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // API overrides
        if let Some(port) = env::var("PROPVAULT_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_HTTPS") {
            self.security.require_https = v.parse().unwrap_or(self.security.require_https);
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Maintenance overrides
        if let Ok(v) = env::var("RECONCILE_GRACE_SECS") {
            self.maintenance.reconcile_grace_secs = v.parse().unwrap_or(self.maintenance.reconcile_grace_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            backend: BackendConfig {
                kind: BackendKind::Memory,
                url: None,
                anon_key: None,
                jwt_secret: "development-secret".to_string(),
                bucket: "documents".to_string(),
                request_timeout_secs: 30,
            },
            upload: UploadConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 12 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                require_https: false,
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            maintenance: MaintenanceConfig { reconcile_grace_secs: 60 },
            notices: NoticeConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            backend: BackendConfig {
                kind: BackendKind::Supabase,
                url: None,
                anon_key: None,
                jwt_secret: String::new(),
                bucket: "documents".to_string(),
                request_timeout_secs: 15,
            },
            upload: UploadConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 12 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                require_https: true,
                jwt_expiry_hours: 24,
            },
            maintenance: MaintenanceConfig { reconcile_grace_secs: 15 * 60 },
            notices: NoticeConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            backend: BackendConfig {
                kind: BackendKind::Supabase,
                url: None,
                anon_key: None,
                jwt_secret: String::new(),
                bucket: "documents".to_string(),
                request_timeout_secs: 10,
            },
            upload: UploadConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 11 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                require_https: true,
                jwt_expiry_hours: 4,
            },
            maintenance: MaintenanceConfig { reconcile_grace_secs: 15 * 60 },
            notices: NoticeConfig::default(),
        }
    }

    /// Development preset without env overrides, for tests and local tooling
    pub fn for_tests() -> Self {
        Self::development()
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: TEN_MB,
            allowed_extensions: ["pdf", "png", "jpg", "jpeg"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            property_added_ms: 2000,
            document_uploaded_ms: 3000,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.backend.kind, BackendKind::Memory);
        assert_eq!(config.upload.max_file_size_bytes, 10 * 1024 * 1024);
        assert!(!config.security.require_https);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.backend.kind, BackendKind::Supabase);
        assert!(config.backend.jwt_secret.is_empty());
        assert_eq!(config.maintenance.reconcile_grace_secs, 900);
    }

    #[test]
    fn request_ceiling_leaves_room_for_oversized_file_rejection() {
        for config in [AppConfig::development(), AppConfig::staging(), AppConfig::production()] {
            assert!(config.api.max_request_size_bytes as u64 > config.upload.max_file_size_bytes);
        }
    }

    #[test]
    fn upload_defaults_match_picker_filter() {
        let upload = UploadConfig::default();
        assert_eq!(upload.allowed_extensions, vec!["pdf", "png", "jpg", "jpeg"]);
        assert_eq!(NoticeConfig::default().property_added_ms, 2000);
        assert_eq!(NoticeConfig::default().document_uploaded_ms, 3000);
    }
}
