//! seed command - demo principals and groups

use super::CommandContext;
use adlite_core::types::{NewGroup, NewPrincipal};
use adlite_core::utils::domain_from_base_dn;
use adlite_core::Error;
use adlite_crypto::hash_password;
use adlite_store::DirectoryStore;
use anyhow::Result;
use colored::Colorize;
use tracing::warn;

/// (sAMAccountName, UPN local part, password)
const USERS: &[(&str, &str, &str)] = &[
    ("jdoe", "john.doe", "password123"),
    ("asmith", "alice.smith", "password456"),
];

/// (cn, description)
const GROUPS: &[(&str, &str)] = &[
    ("Admins", "Administrators group"),
    ("Users", "Regular users group"),
];

/// (principal, group)
const MEMBERSHIPS: &[(&str, &str)] = &[("jdoe", "Admins"), ("asmith", "Users")];

/// Entries that already exist are left alone, so seeding twice is harmless.
pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let base_dn = ctx.base_dn();
    let domain = domain_from_base_dn(base_dn);

    for (name, upn, password) in USERS {
        let principal = NewPrincipal::new(*name, base_dn)
            .with_user_principal_name(format!("{}@{}", upn, domain))
            .with_password_hash(hash_password(password.as_bytes()));

        match store.add_principal(&principal).await {
            Ok(record) => ctx.info(&format!("{}: {}", "add_user".green(), record.distinguished_name)),
            Err(Error::PrincipalExists(_)) => warn!("Principal {} already exists, skipping", name),
            Err(e) => return Err(e.into()),
        }
    }

    for (cn, description) in GROUPS {
        match store
            .add_group(&NewGroup::new(*cn, base_dn).with_description(*description))
            .await
        {
            Ok(record) => ctx.info(&format!("{}: {}", "add_group".green(), record.distinguished_name)),
            Err(Error::GroupExists(_)) => warn!("Group {} already exists, skipping", cn),
            Err(e) => return Err(e.into()),
        }
    }

    for (principal, group) in MEMBERSHIPS {
        store.add_membership(principal, group).await?;
    }

    ctx.info("Directory seeded");
    Ok(())
}
