use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Full router. Must be called inside a tokio runtime: it starts the dashboard listener.
pub fn app(state: AppState) -> Router {
    state.dashboards.spawn_listener(&state.events);

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes));

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state));
    }
    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/sign-in", post(auth::sign_in_post))
        .route("/auth/sign-up", post(auth::sign_up_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{auth, dashboard, documents, events, maintenance, properties};

    Router::new()
        // Session
        .route("/api/auth/session", get(auth::session_get))
        .route("/api/auth/sign-out", post(auth::sign_out_post))
        // Properties
        .route(
            "/api/properties",
            get(properties::properties_get).post(properties::properties_post),
        )
        .route("/api/properties/:id/select", post(properties::property_select_post))
        // Documents
        .route(
            "/api/documents",
            get(documents::documents_get).post(documents::documents_post),
        )
        .route("/api/documents/:id", axum::routing::delete(documents::document_delete))
        .route("/api/documents/:id/download", get(documents::document_download_get))
        // Dashboard
        .route("/api/dashboard", get(dashboard::dashboard_get))
        .route(
            "/api/dashboard/property-form/toggle",
            post(dashboard::property_form_toggle_post),
        )
        .route("/api/events", get(events::events_get))
        // Maintenance
        .route("/api/maintenance/reconcile", post(maintenance::reconcile_post))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "PropVault API",
            "version": version,
            "description": "Property and document vault for house owners",
            "endpoints": {
                "home": "/ (public)",
                "public_auth": "/auth/sign-in, /auth/sign-up (public - session acquisition)",
                "auth": "/api/auth/session, /api/auth/sign-out (protected)",
                "properties": "/api/properties[/:id/select] (protected)",
                "documents": "/api/documents[/:id[/download]] (protected)",
                "dashboard": "/api/dashboard, /api/dashboard/property-form/toggle (protected)",
                "events": "/api/events (protected, server-sent events)",
                "maintenance": "/api/maintenance/reconcile (protected)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "backend": format!("{:?}", state.config.backend.kind).to_lowercase(),
            "active_sessions": state.auth.active_sessions(),
        }
    }))
}
