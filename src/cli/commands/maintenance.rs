use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    #[command(about = "Remove orphaned files and records whose file is gone")]
    Reconcile {
        #[arg(long, help = "Report what would be removed without removing it")]
        dry_run: bool,
    },
}

pub async fn handle(cmd: MaintenanceCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        MaintenanceCommands::Reconcile { dry_run } => {
            let reply = ApiClient::authenticated()?
                .post(&format!("/api/maintenance/reconcile?dry_run={}", dry_run), &json!({}))
                .await?;

            let blobs = reply.data["orphaned_blobs"].as_array().map_or(0, Vec::len);
            let rows = reply.data["dangling_documents"].as_array().map_or(0, Vec::len);
            let verb = if dry_run { "Would remove" } else { "Removed" };
            output_success(
                &output_format,
                &format!("{} {} orphaned file(s) and {} dangling document(s)", verb, blobs, rows),
                Some(json!({ "report": reply.data })),
            )
        }
    }
}
