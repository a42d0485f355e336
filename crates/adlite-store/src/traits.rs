//! Directory store trait
//!
//! Defines the interface the authentication core consumes.
//! Implementations exist for SQLite and in-memory storage.

use adlite_core::types::{GroupRecord, NewGroup, NewPrincipal, PrincipalRecord};
use adlite_core::Result;
use async_trait::async_trait;

/// Directory store trait
///
/// Principal lookups accept either logon name: `sAMAccountName` or
/// `userPrincipalName`.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    // ============= Authentication Path =============

    /// Credential hash of an enabled principal, `None` if unknown or disabled
    async fn lookup_credential_hash(&self, name: &str) -> Result<Option<String>>;

    async fn is_member(&self, principal: &str, group: &str) -> Result<bool>;

    // ============= Administrative Path =============

    async fn add_principal(&self, principal: &NewPrincipal) -> Result<PrincipalRecord>;
    async fn get_principal(&self, name: &str) -> Result<Option<PrincipalRecord>>;
    async fn set_password_hash(&self, name: &str, password_hash: &str) -> Result<()>;

    async fn add_group(&self, group: &NewGroup) -> Result<GroupRecord>;
    async fn get_group(&self, cn: &str) -> Result<Option<GroupRecord>>;

    /// Add `principal` to `group`; adding an existing membership is a no-op
    async fn add_membership(&self, principal: &str, group: &str) -> Result<()>;

    /// Names of the groups `principal` belongs to, sorted
    async fn groups_of(&self, principal: &str) -> Result<Vec<String>>;
}
