//! add-user and set-password commands

use super::CommandContext;
use adlite_core::types::NewPrincipal;
use adlite_crypto::hash_password;
use adlite_store::DirectoryStore;
use anyhow::{Context, Result};
use colored::Colorize;

pub async fn add(
    ctx: &CommandContext,
    name: &str,
    password: &str,
    upn: Option<String>,
    disabled: bool,
) -> Result<()> {
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    let store = ctx.open_store().await?;

    let mut principal =
        NewPrincipal::new(name, ctx.base_dn()).with_password_hash(hash_password(password.as_bytes()));
    if let Some(upn) = upn {
        principal = principal.with_user_principal_name(upn);
    }
    if disabled {
        principal = principal.disabled();
    }

    let record = store
        .add_principal(&principal)
        .await
        .with_context(|| format!("Failed to add {}", name))?;

    if ctx.is_json() {
        ctx.print_json(&record)?;
    } else {
        ctx.info(&format!(
            "{}: {} ({})",
            "add_user".green(),
            record.distinguished_name,
            record.user_principal_name
        ));
    }
    Ok(())
}

pub async fn set_password(ctx: &CommandContext, name: &str, password: &str) -> Result<()> {
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    let store = ctx.open_store().await?;
    store
        .set_password_hash(name, &hash_password(password.as_bytes()))
        .await
        .with_context(|| format!("Failed to set password of {}", name))?;

    ctx.info(&format!("{}: {}", "set_password".green(), name));
    Ok(())
}
