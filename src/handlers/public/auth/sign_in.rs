// handlers/public/auth/sign_in.rs - POST /auth/sign-in handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;

use super::utils::{require_fields, SessionInfo};
use crate::backend::Credentials;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /auth/sign-in - Exchange email and password for a session
///
/// Expected Input:
/// ```json
/// { "email": "owner@example.com", "password": "secret" }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "access_token": "eyJhbGciOiJIUzI1NiI...",
///     "refresh_token": "…",
///     "expires_at": "2025-01-01T01:00:00Z",
///     "user": { "id": "user_uuid", "email": "owner@example.com" }
///   }
/// }
/// ```
///
/// Backend failures (e.g. "Invalid login credentials") come back verbatim as an inline error.
pub async fn sign_in_post(
    State(state): State<AppState>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> ApiResult<SessionInfo> {
    let Json(payload) = payload?;
    require_fields(&[("email", payload.email.as_str()), ("password", payload.password.as_str())])?;

    let credentials = Credentials {
        email: payload.email.trim().to_string(),
        password: payload.password,
    };
    let session = state.backend.sign_in(&credentials).await.map_err(|e| {
        tracing::info!("sign-in rejected for {}: {}", credentials.email, e);
        e
    })?;

    let info = SessionInfo::from(&session);
    state.auth.begin(session);
    Ok(ApiResponse::success(info))
}
