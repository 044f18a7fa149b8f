pub mod client;
pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "propvault")]
#[command(about = "PropVault CLI - Manage properties and documents through the PropVault API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Target server selection and health")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },

    #[command(about = "Sign in, sign up and session status")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "List, add and select properties")]
    Property {
        #[command(subcommand)]
        cmd: commands::property::PropertyCommands,
    },

    #[command(about = "Upload, list, download and delete documents")]
    Document {
        #[command(subcommand)]
        cmd: commands::document::DocumentCommands,
    },

    #[command(about = "Storage and record maintenance")]
    Maintenance {
        #[command(subcommand)]
        cmd: commands::maintenance::MaintenanceCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Server { cmd } => commands::server::handle(cmd, output_format).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Property { cmd } => commands::property::handle(cmd, output_format).await,
        Commands::Document { cmd } => commands::document::handle(cmd, output_format).await,
        Commands::Maintenance { cmd } => commands::maintenance::handle(cmd, output_format).await,
    }
}
