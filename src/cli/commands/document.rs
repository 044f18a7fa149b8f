use std::path::PathBuf;

use clap::Subcommand;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_collection, output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::config::UploadConfig;
use crate::models::DocumentType;
use crate::upload;

#[derive(Subcommand)]
pub enum DocumentCommands {
    #[command(about = "List documents, optionally for one property")]
    List {
        #[arg(long, help = "Only documents attached to this property")]
        property: Option<Uuid>,
    },

    #[command(about = "Upload a PDF, PNG or JPEG document (max 10MB)")]
    Upload {
        #[arg(help = "Path of the file to upload")]
        path: PathBuf,
        #[arg(
            long = "type",
            default_value = "identity",
            help = "identity, property_deed, tax_document, certificate or other"
        )]
        document_type: DocumentType,
        #[arg(long, help = "Attach to this property (defaults to the selected one)")]
        property: Option<Uuid>,
    },

    #[command(about = "Download a document")]
    Download {
        #[arg(help = "Document id")]
        id: Uuid,
        #[arg(long, short, help = "Destination path (defaults to the original file name)")]
        output: Option<PathBuf>,
    },

    #[command(about = "Delete a document and its stored file")]
    Delete {
        #[arg(help = "Document id")]
        id: Uuid,
        #[arg(long, help = "Confirm the deletion")]
        yes: bool,
    },
}

pub async fn handle(cmd: DocumentCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DocumentCommands::List { property } => {
            let path = match property {
                Some(id) => format!("/api/documents?property_id={}", id),
                None => "/api/documents".to_string(),
            };
            let reply = ApiClient::authenticated()?.get(&path).await?;
            let documents = reply.data["documents"].as_array().cloned().unwrap_or_default();
            if documents.is_empty() {
                let message = reply.data["empty_message"].as_str().unwrap_or("No documents uploaded yet");
                return output_empty_collection(&output_format, "documents", message);
            }

            let heading = format!("{}: {}", field(&reply.data, "title"), field(&reply.data, "heading"));
            output_collection(&output_format, "documents", &heading, &documents, render_document)
        }
        DocumentCommands::Upload { path, document_type, property } => {
            let form = upload_form(&path, document_type, property, &UploadConfig::default())?;
            let reply = ApiClient::authenticated()?.upload(form).await?;
            let message = reply.notice.unwrap_or_else(|| "Document uploaded".to_string());
            output_success(&output_format, &message, Some(json!({ "document": reply.data })))
        }
        DocumentCommands::Download { id, output } => {
            let client = ApiClient::authenticated()?;
            let (bytes, file_name) = client.download(&format!("/api/documents/{}/download", id)).await?;

            let destination = output
                .or_else(|| file_name.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(id.to_string()));
            std::fs::write(&destination, &bytes)?;
            output_success(
                &output_format,
                &format!("Saved {} ({})", destination.display(), crate::api::format::format_file_size(bytes.len() as u64)),
                Some(json!({ "path": destination, "size": bytes.len() })),
            )
        }
        DocumentCommands::Delete { id, yes } => {
            if !yes {
                return Err(anyhow::anyhow!(
                    "Are you sure you want to delete this document? Re-run with --yes to confirm"
                ));
            }
            let reply = ApiClient::authenticated()?
                .delete(&format!("/api/documents/{}?confirm=true", id))
                .await?;
            output_success(
                &output_format,
                &format!("Deleted {}", field(&reply.data, "file_name")),
                Some(json!({ "document": reply.data })),
            )
        }
    }
}

/// Validates the file locally before building the multipart body
fn upload_form(
    path: &std::path::Path,
    document_type: DocumentType,
    property: Option<Uuid>,
    config: &UploadConfig,
) -> anyhow::Result<Form> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", path.display()))?
        .to_string();
    let size = std::fs::metadata(path)?.len();
    let file = upload::validate(&file_name, size, None, config)?;

    let bytes = std::fs::read(path)?;
    let part = Part::bytes(bytes).file_name(file.file_name).mime_str(&file.mime_type)?;

    let mut form = Form::new().part("file", part).text("document_type", document_type.as_str());
    if let Some(property_id) = property {
        form = form.text("property_id", property_id.to_string());
    }
    Ok(form)
}

fn render_document(document: &Value) -> String {
    format!(
        "{}  {}  {}  {}  {}",
        field(document, "id"),
        field(document, "file_name"),
        field(document, "type_label"),
        field(document, "size_label"),
        field(document, "uploaded_at"),
    )
}
