// handlers/protected/maintenance.rs - POST /api/maintenance/reconcile

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension,
};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{ReconcileReport, Reconciler};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileQuery {
    #[serde(default)]
    pub dry_run: bool,
}

/// Remove the caller's orphaned blobs and dangling document rows.
/// With `?dry_run=true` only reports what would be removed.
pub async fn reconcile_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ReconcileQuery>, QueryRejection>,
) -> ApiResult<ReconcileReport> {
    let Query(query) = query?;
    let report = Reconciler::new(&state, &user).run(query.dry_run).await?;
    Ok(ApiResponse::success(report))
}
