use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::auth::AuthContext;
use crate::backend::{self, BackendError, Repository, SharedBackend};
use crate::config::AppConfig;
use crate::dashboard::DashboardRegistry;
use crate::events::EventBus;
use crate::middleware::AuthUser;
use crate::models::Table;

/// Everything a handler needs, injected through axum `State`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: SharedBackend,
    pub auth: AuthContext,
    pub events: EventBus,
    pub dashboards: DashboardRegistry,
}

impl AppState {
    pub fn new(config: AppConfig, backend: SharedBackend) -> Self {
        let events = EventBus::default();
        let auth = AuthContext::new(config.backend.jwt_secret.clone(), events.clone());
        Self {
            config: Arc::new(config),
            backend,
            auth,
            events,
            dashboards: DashboardRegistry::new(),
        }
    }

    pub fn from_config(config: AppConfig) -> Result<Self, BackendError> {
        let backend = backend::from_config(&config)?;
        Ok(Self::new(config, backend))
    }

    /// Table access on behalf of the signed-in user
    pub fn repository<T: DeserializeOwned + Send>(&self, table: Table, user: &AuthUser) -> Repository<T> {
        Repository::new(table, self.backend.clone(), user.access_token.clone())
    }
}
