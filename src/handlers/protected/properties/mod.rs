// handlers/protected/properties/mod.rs - Property form and list
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::format::{properties_heading, PropertyView, NO_PROPERTIES};
use crate::dashboard::DashboardState;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Notice};
use crate::services::{PropertyInput, PropertyService};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PropertyListView {
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
    pub selected_property_id: Option<Uuid>,
    pub properties: Vec<PropertyView>,
}

/// GET /api/properties - The owner's properties, newest first
pub async fn properties_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<PropertyListView> {
    let properties = PropertyService::new(&state, &user).list().await?;
    let heading = properties_heading(properties.len());

    Ok(ApiResponse::success(PropertyListView {
        heading,
        empty_message: properties.is_empty().then_some(NO_PROPERTIES),
        selected_property_id: state.dashboards.selected_property(user.user_id),
        properties: properties.into_iter().map(PropertyView::from).collect(),
    }))
}

/// POST /api/properties - Property form submission
///
/// Expected Input:
/// ```json
/// { "property_name": "Sunset Villa", "address": "1 Ocean Dr", "property_type": "house" }
/// ```
/// `property_type` defaults to `house`. On success the response carries a
/// notice that also closes the creation panel.
pub async fn properties_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<PropertyInput>, JsonRejection>,
) -> ApiResult<PropertyView> {
    let Json(input) = payload?;
    let property = PropertyService::new(&state, &user).create(input).await?;

    let notice = Notice::new("Property added successfully!", state.config.notices.property_added_ms).closing_form();
    Ok(ApiResponse::created(PropertyView::from(property)).with_notice(notice))
}

/// POST /api/properties/:id/select - Select a property card; narrows the document list
pub async fn property_select_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(property_id): Path<Uuid>,
) -> ApiResult<DashboardState> {
    // Only visible properties can be selected
    PropertyService::new(&state, &user).find(property_id).await?;

    let dashboard = state.dashboards.select_property(user.user_id, property_id);
    tracing::debug!(owner_id = %user.user_id, %property_id, "property selected");
    Ok(ApiResponse::success(dashboard))
}
