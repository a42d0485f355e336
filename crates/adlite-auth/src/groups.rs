//! Group membership checks and administration

use adlite_core::{Error, Result};
use adlite_store::DirectoryStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Membership operations over a [`DirectoryStore`], bounded by the
/// directory timeout.
pub struct GroupService {
    store: Arc<dyn DirectoryStore>,
    timeout: Duration,
}

impl GroupService {
    pub fn new(store: Arc<dyn DirectoryStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_millis() as u64))?
    }

    pub async fn is_user_member_of(&self, principal: &str, group: &str) -> Result<bool> {
        let member = self.bounded(self.store.is_member(principal, group)).await?;
        debug!(principal = %principal, group = %group, member, "Membership check");
        Ok(member)
    }

    pub async fn add_user_to_group(&self, principal: &str, group: &str) -> Result<()> {
        self.bounded(self.store.add_membership(principal, group)).await?;
        info!("Added {} to group {}", principal, group);
        Ok(())
    }

    pub async fn groups_of(&self, principal: &str) -> Result<Vec<String>> {
        self.bounded(self.store.groups_of(principal)).await
    }

    /// Fails with `InvalidCredentials` unless `principal` belongs to `group`
    pub async fn require_member(&self, principal: &str, group: &str) -> Result<()> {
        if self.is_user_member_of(principal, group).await? {
            Ok(())
        } else {
            Err(Error::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adlite_core::types::{NewGroup, NewPrincipal};
    use adlite_store::MemoryDirectoryStore;

    const BASE_DN: &str = "dc=mycompany,dc=com";

    #[tokio::test]
    async fn test_membership() {
        let store = Arc::new(MemoryDirectoryStore::new());
        store.add_principal(&NewPrincipal::new("jdoe", BASE_DN)).await.unwrap();
        store.add_group(&NewGroup::new("Admins", BASE_DN)).await.unwrap();
        store.add_group(&NewGroup::new("Users", BASE_DN)).await.unwrap();

        let groups = GroupService::new(store, Duration::from_secs(5));
        groups.add_user_to_group("jdoe", "Admins").await.unwrap();
        // Adding twice is harmless
        groups.add_user_to_group("jdoe", "Admins").await.unwrap();

        assert!(groups.is_user_member_of("jdoe", "Admins").await.unwrap());
        assert!(!groups.is_user_member_of("jdoe", "Users").await.unwrap());
        assert_eq!(groups.groups_of("jdoe").await.unwrap(), vec!["Admins"]);

        assert!(groups.require_member("jdoe", "Admins").await.is_ok());
        assert!(matches!(
            groups.require_member("jdoe", "Users").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            groups.add_user_to_group("jdoe", "Nobody").await,
            Err(Error::NoSuchGroup(_))
        ));
    }
}
