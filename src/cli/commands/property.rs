use clap::Subcommand;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_collection, output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::models::PropertyType;

#[derive(Subcommand)]
pub enum PropertyCommands {
    #[command(about = "List your properties, newest first")]
    List,

    #[command(about = "Register a property")]
    Add {
        #[arg(help = "Property name")]
        name: String,
        #[arg(long, help = "Street address")]
        address: String,
        #[arg(long = "type", default_value = "house", help = "house, apartment, commercial, land or other")]
        property_type: PropertyType,
    },

    #[command(about = "Select a property so documents default to it")]
    Select {
        #[arg(help = "Property id")]
        id: Uuid,
    },
}

pub async fn handle(cmd: PropertyCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::authenticated()?;

    match cmd {
        PropertyCommands::List => {
            let reply = client.get("/api/properties").await?;
            let properties = reply.data["properties"].as_array().cloned().unwrap_or_default();
            if properties.is_empty() {
                let message = reply.data["empty_message"].as_str().unwrap_or("No properties yet");
                return output_empty_collection(&output_format, "properties", message);
            }

            let selected = reply.data["selected_property_id"].as_str().map(str::to_string);
            output_collection(
                &output_format,
                "properties",
                field(&reply.data, "heading"),
                &properties,
                |p| render_property(p, selected.as_deref()),
            )
        }
        PropertyCommands::Add { name, address, property_type } => {
            let reply = client
                .post(
                    "/api/properties",
                    &json!({ "property_name": name, "address": address, "property_type": property_type }),
                )
                .await?;
            let message = reply.notice.unwrap_or_else(|| "Property added".to_string());
            output_success(&output_format, &message, Some(json!({ "property": reply.data })))
        }
        PropertyCommands::Select { id } => {
            let reply = client.post(&format!("/api/properties/{}/select", id), &json!({})).await?;
            output_success(
                &output_format,
                &format!("Selected property {}", id),
                Some(json!({ "dashboard": reply.data })),
            )
        }
    }
}

fn render_property(property: &Value, selected: Option<&str>) -> String {
    let id = field(property, "id");
    let marker = if Some(id) == selected { "*" } else { " " };
    format!(
        "{} {}  {} ({})  {}",
        marker,
        id,
        field(property, "property_name"),
        field(property, "type_label"),
        field(property, "address"),
    )
}
