use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::{validate_jwt, AuthError};
use crate::backend::Session;
use crate::events::{Event, EventBus};

/// Sessions known to this process, keyed by access token.
///
/// Established by sign-in/sign-up, dropped by sign-out. Every protected
/// request resolves its bearer token here before touching the backend.
#[derive(Clone)]
pub struct AuthContext {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    jwt_secret: String,
    events: EventBus,
}

impl AuthContext {
    pub fn new(jwt_secret: impl Into<String>, events: EventBus) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            jwt_secret: jwt_secret.into(),
            events,
        }
    }

    pub fn begin(&self, session: Session) {
        let owner_id = session.user.id;
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, s| !s.is_expired());
            sessions.insert(session.access_token.clone(), session);
        }
        tracing::info!(%owner_id, "session started");
        self.events.emit(Event::SignedIn { owner_id });
    }

    pub fn resolve(&self, access_token: &str) -> Result<Session, AuthError> {
        let session = self
            .sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(access_token).cloned())
            .ok_or(AuthError::UnknownSession)?;

        if session.is_expired() {
            self.forget(access_token);
            return Err(AuthError::SessionExpired);
        }

        if !self.jwt_secret.is_empty() {
            let claims = validate_jwt(access_token, &self.jwt_secret)?;
            if claims.sub != session.user.id {
                return Err(AuthError::SubjectMismatch);
            }
        }

        Ok(session)
    }

    /// Drop the session and announce it. Returns the owner if the token was known.
    pub fn end(&self, access_token: &str) -> Option<Uuid> {
        let session = self.forget(access_token)?;
        let owner_id = session.user.id;
        let last_session = !self.has_session(owner_id);
        tracing::info!(%owner_id, last_session, "session ended");
        self.events.emit(Event::SignedOut { owner_id, last_session });
        Some(owner_id)
    }

    /// Whether the owner still holds an unexpired session
    pub fn has_session(&self, owner_id: Uuid) -> bool {
        self.sessions
            .read()
            .map(|sessions| sessions.values().any(|s| s.user.id == owner_id && !s.is_expired()))
            .unwrap_or(false)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    fn forget(&self, access_token: &str) -> Option<Session> {
        self.sessions.write().ok()?.remove(access_token)
    }
}
