use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::{Session, User};
use crate::error::ApiError;

/// Session details returned to the client after sign-in or sign-up
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            user: session.user.clone(),
        }
    }
}

/// Collects empty-field errors; strength and format checks are the backend's job
pub fn require_fields(fields: &[(&str, &str)]) -> Result<(), ApiError> {
    let field_errors: HashMap<String, String> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| (name.to_string(), "This field is required".to_string()))
        .collect();

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error("Missing required fields", Some(field_errors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_each_blank_field() {
        let err = require_fields(&[("email", ""), ("password", " "), ("full_name", "Ann")]).unwrap_err();
        let body = err.to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["email"].is_string());
        assert!(body["field_errors"]["password"].is_string());
        assert!(body["field_errors"]["full_name"].is_null());
    }
}
