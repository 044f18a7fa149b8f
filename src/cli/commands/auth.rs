use std::io::{self, BufRead, Write};

use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::{require_session, ApiClient};
use crate::cli::config::{self, SessionConfig};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in with email and password")]
    SignIn {
        #[arg(help = "Account email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Create an account and its owner profile")]
    SignUp {
        #[arg(help = "Account email")]
        email: String,
        #[arg(long, help = "Full name shown on the dashboard")]
        full_name: String,
        #[arg(long, help = "Contact phone number")]
        phone: Option<String>,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "End the current session")]
    SignOut,

    #[command(about = "Show current authentication status")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::SignIn { email, password } => {
            let password = password_or_prompt(password)?;
            let reply = ApiClient::anonymous()?
                .post("/auth/sign-in", &json!({ "email": email, "password": password }))
                .await?;

            let session = session_from(&reply.data)?;
            config::save_session(&session)?;
            output_success(
                &output_format,
                &format!("Signed in as {}", session.email.as_deref().unwrap_or(&email)),
                Some(json!({ "user_id": session.user_id, "expires_at": session.expires_at })),
            )
        }
        AuthCommands::SignUp { email, full_name, phone, password } => {
            let password = password_or_prompt(password)?;
            let reply = ApiClient::anonymous()?
                .post(
                    "/auth/sign-up",
                    &json!({ "email": email, "password": password, "full_name": full_name, "phone": phone }),
                )
                .await?;

            if reply.data["confirmation_required"] == Value::Bool(true) {
                return output_success(
                    &output_format,
                    "Account created. Check your email to confirm it, then sign in",
                    Some(json!({ "confirmation_required": true })),
                );
            }

            let session = session_from(&reply.data["session"])?;
            config::save_session(&session)?;
            output_success(
                &output_format,
                &format!("Account created and signed in as {}", email),
                Some(json!({ "user_id": session.user_id, "confirmation_required": false })),
            )
        }
        AuthCommands::SignOut => {
            let reply = ApiClient::authenticated()?.post("/api/auth/sign-out", &json!({})).await;
            // Local session is cleared even when the server call fails
            config::clear_session()?;
            if let Err(e) = reply {
                tracing::warn!("server sign-out failed: {}", e);
            }
            output_success(&output_format, "Signed out", None)
        }
        AuthCommands::Status => {
            let session = require_session()?;
            let reply = ApiClient::authenticated()?.get("/api/auth/session").await?;
            output_success(
                &output_format,
                &format!(
                    "Signed in as {} until {}",
                    session.email.as_deref().unwrap_or("(no email)"),
                    session.expires_at
                ),
                Some(json!({ "session": reply.data })),
            )
        }
    }
}

fn session_from(data: &Value) -> anyhow::Result<SessionConfig> {
    Ok(SessionConfig {
        access_token: data["access_token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Server response has no access token"))?
            .to_string(),
        user_id: serde_json::from_value(data["user"]["id"].clone())?,
        email: data["user"]["email"].as_str().map(str::to_string),
        expires_at: serde_json::from_value(data["expires_at"].clone())?,
    })
}

fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
