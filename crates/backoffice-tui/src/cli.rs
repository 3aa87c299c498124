//! One-shot request mode: `backoffice --get <path>`.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use backoffice_core::api::AdminApi;
use backoffice_core::auth::{SessionManager, TracingHooks};
use backoffice_core::Config;

/// Perform one authenticated GET and print the JSON body to stdout,
/// signing in first when no session is stored.
pub async fn run_get(config: &mut Config, path: &str) -> Result<()> {
    let session = SessionManager::initialize(
        config.session_settings()?,
        config.open_store()?,
        Arc::new(TracingHooks),
        Arc::new(TracingHooks),
    )?;

    if !session.is_authenticated() {
        let email = prompt_email(config.last_email.as_deref())?;
        let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
        let user = session.login(&email, &password).await?;
        info!(user = %user.display_name(), "Signed in");

        config.last_email = Some(email);
        if let Err(e) = config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    let api = AdminApi::new(session);
    let value = api.get(path).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => eprint!("Email [{}]: ", last),
        None => eprint!("Email: "),
    }
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input).context("Failed to read email")?;
    let input = input.trim();

    match (input.is_empty(), last_email) {
        (false, _) => Ok(input.to_string()),
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => anyhow::bail!("Email is required"),
    }
}
