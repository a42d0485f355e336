//! bind command - authenticate a principal through the full stack

use super::CommandContext;
use adlite_auth::{AuthProvider, BindHandler, BindRequest, BindResult, CleanupWorker};
use adlite_core::utils::entry_dn;
use adlite_store::DirectoryStore;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct BindOutput<'a> {
    dn: &'a str,
    method: String,
    result: &'static str,
    result_code: u32,
    message: Option<String>,
}

pub async fn execute(
    ctx: &CommandContext,
    dn: Option<String>,
    user: Option<String>,
    password: &str,
    method: Option<String>,
) -> Result<()> {
    let config = &ctx.config;
    let dn = match (dn, user) {
        (Some(dn), _) => dn,
        (None, Some(user)) => entry_dn(&user, ctx.base_dn()),
        (None, None) => anyhow::bail!("Either --dn or --user is required"),
    };

    let store: Arc<dyn DirectoryStore> = ctx.open_store().await?;
    let provider = AuthProvider::from_config(config, store)?;

    let worker = provider
        .ticket_authority()
        .map(|authority| CleanupWorker::new(authority, config.tickets.cleanup_interval()));
    if let Some(worker) = &worker {
        worker.start();
    }

    let method_name = method
        .clone()
        .unwrap_or_else(|| provider.default_method().to_string());
    let handler = BindHandler::new(Arc::new(provider), ctx.base_dn());
    let mut request = BindRequest::new(dn.as_str(), password);
    request.method = method;

    let result = handler.bind(&request).await;

    if let Some(worker) = &worker {
        worker.stop();
    }

    let message = match &result {
        BindResult::OperationsError(msg) => Some(msg.clone()),
        _ => None,
    };

    if ctx.is_json() {
        ctx.print_json(&BindOutput {
            dn: &dn,
            method: method_name,
            result: if result.is_success() { "success" } else { "failure" },
            result_code: result.result_code(),
            message,
        })
        .context("Failed to print bind result")?;
    } else if result.is_success() {
        println!("{} {} ({})", "bind ok:".green(), dn, method_name);
    } else {
        println!(
            "{} {} (result code {}{})",
            "bind failed:".red(),
            dn,
            result.result_code(),
            message.map(|m| format!(", {}", m)).unwrap_or_default()
        );
    }

    ensure_bound(&result)
}

/// Turn a failed bind into an error so the process exits non-zero
fn ensure_bound(result: &BindResult) -> Result<()> {
    if !result.is_success() {
        anyhow::bail!("bind failed with result code {}", result.result_code());
    }
    Ok(())
}
