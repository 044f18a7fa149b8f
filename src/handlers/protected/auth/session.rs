use axum::{extract::State, Extension};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignOutView {
    pub signed_out: bool,
    /// False when the backend call failed; the local session is gone either way
    pub backend_signed_out: bool,
}

/// GET /api/auth/session - Who the bearer token belongs to
pub async fn session_get(Extension(user): Extension<AuthUser>) -> ApiResult<SessionView> {
    Ok(ApiResponse::success(SessionView {
        user_id: user.user_id,
        email: user.email,
    }))
}

/// POST /api/auth/sign-out - Terminate the session
///
/// The backend call comes first; the local session is dropped regardless of
/// its outcome, which emits `signed_out` to every listener for this owner.
pub async fn sign_out_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<SignOutView> {
    let backend_signed_out = match state.backend.sign_out(&user.access_token).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(owner_id = %user.user_id, "backend sign-out failed: {}", e);
            false
        }
    };
    state.auth.end(&user.access_token);

    Ok(ApiResponse::success(SignOutView {
        signed_out: true,
        backend_signed_out,
    }))
}
