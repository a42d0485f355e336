//! SQLite directory repository

use adlite_core::types::{account_control, GroupRecord, NewGroup, NewPrincipal, PrincipalRecord};
use adlite_core::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::traits::DirectoryStore;

type PrincipalRow = (i64, String, String, String, String, i64, String, Option<String>);

pub struct SqliteDirectoryStore {
    pool: SqlitePool,
}

impl SqliteDirectoryStore {
    /// Open the store and create the schema if missing.
    ///
    /// An in-memory URL (`sqlite::memory:`) lives per connection, so it must
    /// be opened with `max_connections = 1`.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sAMAccountName TEXT UNIQUE NOT NULL,
                userPrincipalName TEXT UNIQUE NOT NULL,
                distinguishedName TEXT UNIQUE NOT NULL,
                passwordHash TEXT NOT NULL,
                userAccountControl INTEGER NOT NULL DEFAULT 512,
                whenCreated TEXT NOT NULL,
                pwdLastSet TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cn TEXT UNIQUE NOT NULL,
                distinguishedName TEXT UNIQUE NOT NULL,
                description TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_memberships (
                groupId INTEGER NOT NULL REFERENCES groups(id),
                userId INTEGER NOT NULL REFERENCES users(id),
                PRIMARY KEY (groupId, userId)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        info!("Directory store initialized");
        Ok(())
    }

    async fn principal_id(&self, name: &str) -> Result<i64> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM users WHERE sAMAccountName = ? OR userPrincipalName = ? LIMIT 1",
        )
        .bind(name)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(|r| r.0)
            .ok_or_else(|| Error::NoSuchPrincipal(name.to_string()))
    }

    async fn group_id(&self, cn: &str) -> Result<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM groups WHERE cn = ?")
            .bind(cn)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.map(|r| r.0).ok_or_else(|| Error::NoSuchGroup(cn.to_string()))
    }
}

#[async_trait]
impl DirectoryStore for SqliteDirectoryStore {
    async fn lookup_credential_hash(&self, name: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT passwordHash FROM users
            WHERE (userPrincipalName = ? OR sAMAccountName = ?)
              AND (userAccountControl & ?) = 0
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(name)
        .bind(account_control::ACCOUNTDISABLE as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(|r| r.0))
    }

    async fn is_member(&self, principal: &str, group: &str) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM users u
            JOIN group_memberships gm ON u.id = gm.userId
            JOIN groups g ON gm.groupId = g.id
            WHERE (u.sAMAccountName = ? OR u.userPrincipalName = ?)
              AND g.cn = ?
            "#,
        )
        .bind(principal)
        .bind(principal)
        .bind(group)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(count > 0)
    }

    async fn add_principal(&self, principal: &NewPrincipal) -> Result<PrincipalRecord> {
        let now = Utc::now();
        let pwd_last_set = (!principal.password_hash.is_empty()).then_some(now);

        let result = sqlx::query(
            r#"
            INSERT INTO users (sAMAccountName, userPrincipalName, distinguishedName,
                               passwordHash, userAccountControl, whenCreated, pwdLastSet)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&principal.sam_account_name)
        .bind(&principal.user_principal_name)
        .bind(&principal.distinguished_name)
        .bind(&principal.password_hash)
        .bind(principal.user_account_control as i64)
        .bind(now.to_rfc3339())
        .bind(pwd_last_set.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                Error::PrincipalExists(principal.sam_account_name.clone())
            } else {
                store_error(e)
            }
        })?;

        debug!("Created principal: {}", principal.sam_account_name);

        Ok(PrincipalRecord {
            id: result.last_insert_rowid(),
            sam_account_name: principal.sam_account_name.clone(),
            user_principal_name: principal.user_principal_name.clone(),
            distinguished_name: principal.distinguished_name.clone(),
            password_hash: principal.password_hash.clone(),
            user_account_control: principal.user_account_control,
            when_created: now,
            pwd_last_set,
        })
    }

    async fn get_principal(&self, name: &str) -> Result<Option<PrincipalRecord>> {
        let row: Option<PrincipalRow> = sqlx::query_as(
            r#"
            SELECT id, sAMAccountName, userPrincipalName, distinguishedName,
                   passwordHash, userAccountControl, whenCreated, pwdLastSet
            FROM users WHERE sAMAccountName = ? OR userPrincipalName = ?
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(|r| {
            Ok(PrincipalRecord {
                id: r.0,
                sam_account_name: r.1,
                user_principal_name: r.2,
                distinguished_name: r.3,
                password_hash: r.4,
                user_account_control: r.5 as u32,
                when_created: parse_timestamp(&r.6)?,
                pwd_last_set: r.7.as_deref().map(parse_timestamp).transpose()?,
            })
        })
        .transpose()
    }

    async fn set_password_hash(&self, name: &str, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET passwordHash = ?, pwdLastSet = ?
            WHERE sAMAccountName = ? OR userPrincipalName = ?
            "#,
        )
        .bind(password_hash)
        .bind(Utc::now().to_rfc3339())
        .bind(name)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoSuchPrincipal(name.to_string()));
        }

        debug!("Updated password for principal: {}", name);
        Ok(())
    }

    async fn add_group(&self, group: &NewGroup) -> Result<GroupRecord> {
        let result = sqlx::query(
            "INSERT INTO groups (cn, distinguishedName, description) VALUES (?, ?, ?)",
        )
        .bind(&group.cn)
        .bind(&group.distinguished_name)
        .bind(&group.description)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                Error::GroupExists(group.cn.clone())
            } else {
                store_error(e)
            }
        })?;

        debug!("Created group: {}", group.cn);

        Ok(GroupRecord {
            id: result.last_insert_rowid(),
            cn: group.cn.clone(),
            distinguished_name: group.distinguished_name.clone(),
            description: group.description.clone(),
        })
    }

    async fn get_group(&self, cn: &str) -> Result<Option<GroupRecord>> {
        let row: Option<(i64, String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, cn, distinguishedName, description FROM groups WHERE cn = ?",
        )
        .bind(cn)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(|r| GroupRecord {
            id: r.0,
            cn: r.1,
            distinguished_name: r.2,
            description: r.3,
        }))
    }

    async fn add_membership(&self, principal: &str, group: &str) -> Result<()> {
        let user_id = self.principal_id(principal).await?;
        let group_id = self.group_id(group).await?;

        sqlx::query("INSERT OR IGNORE INTO group_memberships (groupId, userId) VALUES (?, ?)")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        debug!("Added {} to group {}", principal, group);
        Ok(())
    }

    async fn groups_of(&self, principal: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT g.cn FROM groups g
            JOIN group_memberships gm ON g.id = gm.groupId
            JOIN users u ON gm.userId = u.id
            WHERE u.sAMAccountName = ? OR u.userPrincipalName = ?
            ORDER BY g.cn
            "#,
        )
        .bind(principal)
        .bind(principal)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }
}

fn store_error(e: sqlx::Error) -> Error {
    Error::StoreUnavailable(e.to_string())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InternalError(format!("Corrupt timestamp {}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_DN: &str = "dc=test,dc=com";

    async fn open_store() -> SqliteDirectoryStore {
        SqliteDirectoryStore::new("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn test_credential_lookup_by_either_name() {
        let store = open_store().await;
        store
            .add_principal(
                &NewPrincipal::new("testuser", BASE_DN).with_password_hash("hmac-sha256$00$11"),
            )
            .await
            .unwrap();

        assert_eq!(
            store.lookup_credential_hash("testuser").await.unwrap().as_deref(),
            Some("hmac-sha256$00$11")
        );
        assert_eq!(
            store.lookup_credential_hash("testuser@test.com").await.unwrap().as_deref(),
            Some("hmac-sha256$00$11")
        );
        assert!(store.lookup_credential_hash("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disabled_account_has_no_credentials() {
        let store = open_store().await;
        store
            .add_principal(
                &NewPrincipal::new("gone", BASE_DN)
                    .with_password_hash("hmac-sha256$00$11")
                    .disabled(),
            )
            .await
            .unwrap();

        assert!(store.lookup_credential_hash("gone").await.unwrap().is_none());
        let record = store.get_principal("gone").await.unwrap().unwrap();
        assert!(record.is_disabled());
    }

    #[tokio::test]
    async fn test_duplicate_principal() {
        let store = open_store().await;
        let principal = NewPrincipal::new("dup", BASE_DN);
        store.add_principal(&principal).await.unwrap();

        let err = store.add_principal(&principal).await.unwrap_err();
        assert!(matches!(err, Error::PrincipalExists(name) if name == "dup"));
    }

    #[tokio::test]
    async fn test_group_membership() {
        let store = open_store().await;
        store
            .add_principal(&NewPrincipal::new("groupuser", BASE_DN))
            .await
            .unwrap();
        store
            .add_group(&NewGroup::new("TestGroup", BASE_DN).with_description("Test Group"))
            .await
            .unwrap();

        assert!(!store.is_member("groupuser", "TestGroup").await.unwrap());

        store.add_membership("groupuser", "TestGroup").await.unwrap();
        // Re-adding is a no-op
        store.add_membership("groupuser", "TestGroup").await.unwrap();

        assert!(store.is_member("groupuser", "TestGroup").await.unwrap());
        assert!(store.is_member("groupuser@test.com", "TestGroup").await.unwrap());
        assert_eq!(store.groups_of("groupuser").await.unwrap(), vec!["TestGroup"]);

        let err = store.add_membership("groupuser", "Missing").await.unwrap_err();
        assert!(matches!(err, Error::NoSuchGroup(_)));
        let err = store.add_membership("nobody", "TestGroup").await.unwrap_err();
        assert!(matches!(err, Error::NoSuchPrincipal(_)));
    }

    #[tokio::test]
    async fn test_set_password_hash() {
        let store = open_store().await;
        store
            .add_principal(&NewPrincipal::new("rotating", BASE_DN))
            .await
            .unwrap();
        assert!(store.get_principal("rotating").await.unwrap().unwrap().pwd_last_set.is_none());

        store.set_password_hash("rotating", "hmac-sha256$aa$bb").await.unwrap();

        let record = store.get_principal("rotating").await.unwrap().unwrap();
        assert_eq!(record.password_hash, "hmac-sha256$aa$bb");
        assert!(record.pwd_last_set.is_some());
        assert!(store.set_password_hash("nobody", "x").await.is_err());
    }
}
