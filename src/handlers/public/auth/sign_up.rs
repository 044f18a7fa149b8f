// handlers/public/auth/sign_up.rs - POST /auth/sign-up handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use super::utils::{require_fields, SessionInfo};
use crate::backend::{Credentials, ProfileFields, SignUpOutcome, User};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user: User,
    /// Absent while the backend waits for email confirmation
    pub session: Option<SessionInfo>,
    pub confirmation_required: bool,
}

/// POST /auth/sign-up - Create an account (and, by backend convention, its owner profile)
///
/// Expected Input:
/// ```json
/// {
///   "email": "owner@example.com",
///   "password": "secret",
///   "full_name": "Jane Owner",
///   "phone": "+1 555 0100"      // optional
/// }
/// ```
pub async fn sign_up_post(
    State(state): State<AppState>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> ApiResult<SignUpResponse> {
    let Json(payload) = payload?;
    require_fields(&[
        ("email", payload.email.as_str()),
        ("password", payload.password.as_str()),
        ("full_name", payload.full_name.as_str()),
    ])?;

    let credentials = Credentials {
        email: payload.email.trim().to_string(),
        password: payload.password,
    };
    let profile = ProfileFields {
        full_name: payload.full_name.trim().to_string(),
        phone: payload.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
    };

    let response = match state.backend.sign_up(&credentials, &profile).await? {
        SignUpOutcome::SignedIn(session) => {
            let response = SignUpResponse {
                user: session.user.clone(),
                session: Some(SessionInfo::from(&session)),
                confirmation_required: false,
            };
            state.auth.begin(session);
            response
        }
        SignUpOutcome::ConfirmationPending(user) => {
            tracing::info!(user_id = %user.id, "sign-up awaiting email confirmation");
            SignUpResponse {
                user,
                session: None,
                confirmation_required: true,
            }
        }
    };

    Ok(ApiResponse::created(response))
}
