// handlers/protected/dashboard/mod.rs - Dashboard composition

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::api::format::{documents_title, OwnerView};
use crate::dashboard::DashboardState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::OwnerService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardView {
    /// Absent until the backend has created the profile row
    pub owner: Option<OwnerView>,
    pub email: Option<String>,
    pub documents_title: &'static str,
    #[serde(flatten)]
    pub state: DashboardState,
}

/// GET /api/dashboard - Owner profile with verification badge, selection, panel state and revisions
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "owner": { "full_name": "Jane Owner", "verification_status": "pending",
///                "badge": { "status": "pending", "label": "Pending", "color": "yellow" }, … },
///     "documents_title": "All Documents",
///     "selected_property_id": null,
///     "property_form_open": false,
///     "revisions": { "properties": 0, "documents": 0 }
///   }
/// }
/// ```
pub async fn dashboard_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<DashboardView> {
    let owner = OwnerService::new(&state, &user).profile().await?;
    let dashboard = state.dashboards.get(user.user_id);

    Ok(ApiResponse::success(DashboardView {
        owner: owner.map(OwnerView::from),
        email: user.email,
        documents_title: documents_title(dashboard.selected_property_id.is_some()),
        state: dashboard,
    }))
}

/// POST /api/dashboard/property-form/toggle - Open or collapse the property creation panel
pub async fn property_form_toggle_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<DashboardState> {
    Ok(ApiResponse::success(state.dashboards.toggle_property_form(user.user_id)))
}
