//! Group commands

use super::CommandContext;
use adlite_auth::GroupService;
use adlite_core::types::NewGroup;
use adlite_store::DirectoryStore;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct MembershipResult<'a> {
    principal: &'a str,
    group: &'a str,
    member: bool,
}

async fn group_service(ctx: &CommandContext) -> Result<GroupService> {
    let store = ctx.open_store().await?;
    Ok(GroupService::new(store, ctx.config.ldap.timeout_duration()))
}

pub async fn add(ctx: &CommandContext, cn: &str, description: Option<String>) -> Result<()> {
    let store = ctx.open_store().await?;

    let mut group = NewGroup::new(cn, ctx.base_dn());
    if let Some(description) = description {
        group = group.with_description(description);
    }

    let record = store
        .add_group(&group)
        .await
        .with_context(|| format!("Failed to add group {}", cn))?;

    if ctx.is_json() {
        ctx.print_json(&record)?;
    } else {
        ctx.info(&format!("{}: {}", "add_group".green(), record.distinguished_name));
    }
    Ok(())
}

pub async fn add_member(ctx: &CommandContext, principal: &str, group: &str) -> Result<()> {
    group_service(ctx)
        .await?
        .add_user_to_group(principal, group)
        .await
        .with_context(|| format!("Failed to add {} to {}", principal, group))?;

    ctx.info(&format!("{}: {} -> {}", "add_member".green(), principal, group));
    Ok(())
}

pub async fn check_member(ctx: &CommandContext, principal: &str, group: &str) -> Result<()> {
    let member = group_service(ctx)
        .await?
        .is_user_member_of(principal, group)
        .await?;

    if ctx.is_json() {
        return ctx.print_json(&MembershipResult {
            principal,
            group,
            member,
        });
    }

    if member {
        println!("{} is a member of {}", principal, group.green());
    } else {
        println!("{} is {} a member of {}", principal, "not".red(), group);
    }
    Ok(())
}

pub async fn list(ctx: &CommandContext, principal: &str) -> Result<()> {
    let groups = group_service(ctx).await?.groups_of(principal).await?;

    if ctx.is_json() {
        return ctx.print_json(&groups);
    }

    if groups.is_empty() {
        ctx.info(&format!("{} belongs to no groups", principal));
    }
    for group in groups {
        println!("{}", group);
    }
    Ok(())
}
