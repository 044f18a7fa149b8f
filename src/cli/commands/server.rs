use clap::Subcommand;
use serde_json::json;

use crate::cli::config::{self, ServerConfig, ServerStatus};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Point the CLI at a PropVault server")]
    Use {
        #[arg(help = "Server URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show the configured server")]
    Current,

    #[command(about = "Health check the configured server")]
    Ping,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Use { url } => {
            url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;
            let server = ServerConfig::new(&url);
            config::save_server_config(&server)?;
            // A token from another server is meaningless here
            config::clear_session()?;
            output_success(
                &output_format,
                &format!("Using server {}", server.url),
                Some(json!({ "server": server })),
            )
        }
        ServerCommands::Current => {
            let server = config::load_server_config()?;
            output_success(
                &output_format,
                &format!("Current server: {}", server.url),
                Some(json!({ "server": server })),
            )
        }
        ServerCommands::Ping => {
            let mut server = config::load_server_config()?;
            let status = config::ping_server(&server).await;
            server.update_ping(status);
            config::save_server_config(&server)?;

            if status != ServerStatus::Up {
                return Err(anyhow::anyhow!("Server {} is not responding", server.url));
            }
            output_success(
                &output_format,
                &format!("Server {} is up", server.url),
                Some(json!({ "server": server })),
            )
        }
    }
}
