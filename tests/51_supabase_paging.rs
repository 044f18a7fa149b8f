//! Reconciliation against a REST backend that pages like Supabase:
//! Storage lists at most `limit` objects and PostgREST caps every select at 1000 rows.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use propvault::backend::SupabaseClient;
use propvault::config::{AppConfig, BackendKind};
use propvault::middleware::AuthUser;
use propvault::services::Reconciler;
use propvault::AppState;

const MAX_ROWS: usize = 1000;
const DOCUMENTS: usize = 1001;

struct Fixture {
    objects: Vec<Value>,
    rows: Vec<Value>,
}

fn fixture(owner_id: Uuid) -> Fixture {
    let mut objects = Vec::new();
    let mut rows = Vec::new();
    for i in 0..DOCUMENTS {
        let name = format!("{:013}.pdf", 1_700_000_000_000u64 + i as u64);
        objects.push(json!({
            "name": name,
            "id": Uuid::new_v4(),
            "created_at": "2020-01-01T00:00:00Z",
            "metadata": { "size": 4 },
        }));
        rows.push(json!({
            "id": Uuid::new_v4(),
            "owner_id": owner_id,
            "property_id": null,
            "document_type": "other",
            "file_name": format!("scan-{}.pdf", i),
            "file_path": format!("{}/{}", owner_id, name),
            "file_size": 4,
            "mime_type": "application/pdf",
            "uploaded_at": "2020-01-01T00:00:00Z",
        }));
    }
    Fixture { objects, rows }
}

fn page(items: &[Value], offset: usize, limit: usize) -> Vec<Value> {
    items.iter().skip(offset).take(limit).cloned().collect()
}

async fn storage_list(State(fixture): State<Arc<Fixture>>, Json(body): Json<Value>) -> Json<Vec<Value>> {
    let offset = body["offset"].as_u64().unwrap_or(0) as usize;
    let limit = body["limit"].as_u64().unwrap_or(100) as usize;
    Json(page(&fixture.objects, offset, limit))
}

async fn documents_select(
    State(fixture): State<Arc<Fixture>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let limit = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(MAX_ROWS)
        .min(MAX_ROWS);
    Json(page(&fixture.rows, offset, limit))
}

async fn spawn_backend(owner_id: Uuid) -> Result<String> {
    let app = Router::new()
        .route("/storage/v1/object/list/documents", post(storage_list))
        .route("/rest/v1/documents", get(documents_select))
        .with_state(Arc::new(fixture(owner_id)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr().context("no local address")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

#[tokio::test]
async fn reconcile_reads_every_page() -> Result<()> {
    let owner_id = Uuid::new_v4();
    let base_url = spawn_backend(owner_id).await?;

    let mut config = AppConfig::for_tests();
    config.backend.kind = BackendKind::Supabase;
    config.backend.url = Some(base_url);
    config.backend.anon_key = Some("anon".to_string());
    config.backend.jwt_secret = String::new();
    let client = SupabaseClient::from_config(&config.backend)?;
    let state = AppState::new(config, Arc::new(client));

    let user = AuthUser {
        user_id: owner_id,
        email: None,
        access_token: "token".to_string(),
    };
    let report = Reconciler::new(&state, &user).run(true).await?;

    assert!(report.dangling_documents.is_empty(), "{:?}", report.dangling_documents);
    assert!(report.orphaned_blobs.is_empty(), "{:?}", report.orphaned_blobs);
    assert_eq!(report.skipped_recent, 0);
    Ok(())
}
