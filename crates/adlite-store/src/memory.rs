//! In-memory directory store

use adlite_core::types::{GroupRecord, NewGroup, NewPrincipal, PrincipalRecord};
use adlite_core::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeSet;

use crate::traits::DirectoryStore;

#[derive(Default)]
struct Directory {
    principals: Vec<PrincipalRecord>,
    groups: Vec<GroupRecord>,
    /// (group id, principal id)
    memberships: BTreeSet<(i64, i64)>,
    next_id: i64,
}

impl Directory {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn principal(&self, name: &str) -> Option<&PrincipalRecord> {
        self.principals.iter().find(|p| p.answers_to(name))
    }

    fn group(&self, cn: &str) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.cn == cn)
    }
}

/// Directory held in process memory; contents are lost on drop.
#[derive(Default)]
pub struct MemoryDirectoryStore {
    directory: RwLock<Directory>,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    async fn lookup_credential_hash(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .directory
            .read()
            .principal(name)
            .filter(|p| !p.is_disabled())
            .map(|p| p.password_hash.clone()))
    }

    async fn is_member(&self, principal: &str, group: &str) -> Result<bool> {
        let dir = self.directory.read();
        Ok(match (dir.principal(principal), dir.group(group)) {
            (Some(p), Some(g)) => dir.memberships.contains(&(g.id, p.id)),
            _ => false,
        })
    }

    async fn add_principal(&self, principal: &NewPrincipal) -> Result<PrincipalRecord> {
        let mut dir = self.directory.write();

        let clash = dir.principals.iter().any(|p| {
            p.sam_account_name == principal.sam_account_name
                || p.user_principal_name == principal.user_principal_name
                || p.distinguished_name == principal.distinguished_name
        });
        if clash {
            return Err(Error::PrincipalExists(principal.sam_account_name.clone()));
        }

        let now = Utc::now();
        let record = PrincipalRecord {
            id: dir.allocate_id(),
            sam_account_name: principal.sam_account_name.clone(),
            user_principal_name: principal.user_principal_name.clone(),
            distinguished_name: principal.distinguished_name.clone(),
            password_hash: principal.password_hash.clone(),
            user_account_control: principal.user_account_control,
            when_created: now,
            pwd_last_set: (!principal.password_hash.is_empty()).then_some(now),
        };
        dir.principals.push(record.clone());

        Ok(record)
    }

    async fn get_principal(&self, name: &str) -> Result<Option<PrincipalRecord>> {
        Ok(self.directory.read().principal(name).cloned())
    }

    async fn set_password_hash(&self, name: &str, password_hash: &str) -> Result<()> {
        let mut dir = self.directory.write();
        let record = dir
            .principals
            .iter_mut()
            .find(|p| p.answers_to(name))
            .ok_or_else(|| Error::NoSuchPrincipal(name.to_string()))?;

        record.password_hash = password_hash.to_string();
        record.pwd_last_set = Some(Utc::now());
        Ok(())
    }

    async fn add_group(&self, group: &NewGroup) -> Result<GroupRecord> {
        let mut dir = self.directory.write();

        if dir
            .groups
            .iter()
            .any(|g| g.cn == group.cn || g.distinguished_name == group.distinguished_name)
        {
            return Err(Error::GroupExists(group.cn.clone()));
        }

        let record = GroupRecord {
            id: dir.allocate_id(),
            cn: group.cn.clone(),
            distinguished_name: group.distinguished_name.clone(),
            description: group.description.clone(),
        };
        dir.groups.push(record.clone());

        Ok(record)
    }

    async fn get_group(&self, cn: &str) -> Result<Option<GroupRecord>> {
        Ok(self.directory.read().group(cn).cloned())
    }

    async fn add_membership(&self, principal: &str, group: &str) -> Result<()> {
        let mut dir = self.directory.write();
        let user_id = dir
            .principal(principal)
            .map(|p| p.id)
            .ok_or_else(|| Error::NoSuchPrincipal(principal.to_string()))?;
        let group_id = dir
            .group(group)
            .map(|g| g.id)
            .ok_or_else(|| Error::NoSuchGroup(group.to_string()))?;

        dir.memberships.insert((group_id, user_id));
        Ok(())
    }

    async fn groups_of(&self, principal: &str) -> Result<Vec<String>> {
        let dir = self.directory.read();
        let Some(user_id) = dir.principal(principal).map(|p| p.id) else {
            return Ok(Vec::new());
        };

        let mut groups: Vec<String> = dir
            .groups
            .iter()
            .filter(|g| dir.memberships.contains(&(g.id, user_id)))
            .map(|g| g.cn.clone())
            .collect();
        groups.sort();
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_DN: &str = "dc=test,dc=com";

    #[tokio::test]
    async fn test_memberships() {
        let store = MemoryDirectoryStore::new();
        store
            .add_principal(&NewPrincipal::new("jdoe", BASE_DN).with_password_hash("h"))
            .await
            .unwrap();
        store.add_group(&NewGroup::new("Admins", BASE_DN)).await.unwrap();
        store.add_group(&NewGroup::new("Users", BASE_DN)).await.unwrap();

        store.add_membership("jdoe", "Users").await.unwrap();
        store.add_membership("jdoe@test.com", "Admins").await.unwrap();

        assert!(store.is_member("jdoe", "Admins").await.unwrap());
        assert!(!store.is_member("jdoe", "Nobody").await.unwrap());
        assert_eq!(store.groups_of("jdoe").await.unwrap(), vec!["Admins", "Users"]);
        assert!(store.groups_of("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let store = MemoryDirectoryStore::new();
        store.add_principal(&NewPrincipal::new("a", BASE_DN)).await.unwrap();
        store.add_group(&NewGroup::new("G", BASE_DN)).await.unwrap();

        assert!(matches!(
            store.add_principal(&NewPrincipal::new("a", BASE_DN)).await,
            Err(Error::PrincipalExists(_))
        ));
        assert!(matches!(
            store.add_group(&NewGroup::new("G", BASE_DN)).await,
            Err(Error::GroupExists(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_and_password_update() {
        let store = MemoryDirectoryStore::new();
        store
            .add_principal(&NewPrincipal::new("off", BASE_DN).with_password_hash("h").disabled())
            .await
            .unwrap();

        assert!(store.lookup_credential_hash("off").await.unwrap().is_none());

        store.set_password_hash("off", "h2").await.unwrap();
        assert_eq!(store.get_principal("off").await.unwrap().unwrap().password_hash, "h2");
    }
}
