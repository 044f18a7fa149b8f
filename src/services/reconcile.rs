use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::document_service::DocumentError;
use crate::backend::{Repository, SharedBackend};
use crate::events::{Event, EventBus};
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{Document, Table};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub dry_run: bool,
    /// Stored objects no document row refers to
    pub orphaned_blobs: Vec<String>,
    /// Document rows whose blob is gone
    pub dangling_documents: Vec<Uuid>,
    /// Unreferenced objects left alone because they may belong to an upload in flight
    pub skipped_recent: usize,
}

/// Repairs what the non-atomic upload and delete sequences can leave behind, one owner at a time
pub struct Reconciler {
    backend: SharedBackend,
    documents: Repository<Document>,
    owner_id: Uuid,
    access_token: String,
    grace: Duration,
    events: EventBus,
}

impl Reconciler {
    pub fn new(state: &AppState, user: &AuthUser) -> Self {
        Self {
            backend: state.backend.clone(),
            documents: state.repository(Table::Documents, user),
            owner_id: user.user_id,
            access_token: user.access_token.clone(),
            grace: Duration::seconds(state.config.maintenance.reconcile_grace_secs as i64),
            events: state.events.clone(),
        }
    }

    pub async fn run(&self, dry_run: bool) -> Result<ReconcileReport, DocumentError> {
        let folder = format!("{}/", self.owner_id);
        let objects = self.backend.list(&self.access_token, &folder).await?;
        let documents = self
            .documents
            .select_all(FilterData {
                where_clause: Some(json!({ "owner_id": self.owner_id })),
                ..Default::default()
            })
            .await?;

        let referenced: HashSet<&str> = documents.iter().map(|d| d.file_path.as_str()).collect();
        let stored: HashSet<&str> = objects.iter().map(|o| o.path.as_str()).collect();
        let cutoff = Utc::now() - self.grace;

        let mut report = ReconcileReport { dry_run, ..Default::default() };
        for object in objects.iter().filter(|o| !referenced.contains(o.path.as_str())) {
            // Unknown age counts as recent
            match object.created_at {
                Some(created_at) if created_at <= cutoff => report.orphaned_blobs.push(object.path.clone()),
                _ => report.skipped_recent += 1,
            }
        }
        report.dangling_documents = documents
            .iter()
            .filter(|d| !stored.contains(d.file_path.as_str()))
            .map(|d| d.id)
            .collect();

        if !dry_run {
            self.repair(&report).await?;
        }

        tracing::info!(
            owner_id = %self.owner_id,
            dry_run,
            orphaned_blobs = report.orphaned_blobs.len(),
            dangling_documents = report.dangling_documents.len(),
            skipped_recent = report.skipped_recent,
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn repair(&self, report: &ReconcileReport) -> Result<(), DocumentError> {
        if !report.orphaned_blobs.is_empty() {
            self.backend.remove(&self.access_token, &report.orphaned_blobs).await?;
        }
        for document_id in &report.dangling_documents {
            self.documents.delete(*document_id).await?;
            self.events.emit(Event::DocumentDeleted {
                owner_id: self.owner_id,
                document_id: *document_id,
            });
        }
        Ok(())
    }
}
