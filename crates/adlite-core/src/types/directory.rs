//! Directory entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{domain_from_base_dn, entry_dn};

/// `userAccountControl` flag bits (subset used by the authentication core)
pub mod account_control {
    /// The account is disabled
    pub const ACCOUNTDISABLE: u32 = 0x0002;
    /// Default flag for a regular user account
    pub const NORMAL_ACCOUNT: u32 = 0x0200;
    /// Computer account of a domain member
    pub const WORKSTATION_TRUST_ACCOUNT: u32 = 0x1000;
}

/// Principal to be created through the administrative path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrincipal {
    pub sam_account_name: String,
    pub user_principal_name: String,
    pub distinguished_name: String,
    pub password_hash: String,
    pub user_account_control: u32,
}

impl NewPrincipal {
    /// Derive the UPN and DN for `sam_account_name` from the directory base DN
    pub fn new(sam_account_name: impl Into<String>, base_dn: &str) -> Self {
        let sam_account_name = sam_account_name.into();
        let domain = domain_from_base_dn(base_dn);
        let user_principal_name = if domain.is_empty() {
            sam_account_name.clone()
        } else {
            format!("{}@{}", sam_account_name, domain)
        };

        let user_account_control = if sam_account_name.ends_with(crate::MACHINE_ACCOUNT_SUFFIX) {
            account_control::WORKSTATION_TRUST_ACCOUNT
        } else {
            account_control::NORMAL_ACCOUNT
        };

        Self {
            distinguished_name: entry_dn(&sam_account_name, base_dn),
            sam_account_name,
            user_principal_name,
            password_hash: String::new(),
            user_account_control,
        }
    }

    pub fn with_user_principal_name(mut self, upn: impl Into<String>) -> Self {
        self.user_principal_name = upn.into();
        self
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = hash.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.user_account_control |= account_control::ACCOUNTDISABLE;
        self
    }
}

/// Stored principal (`users` row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: i64,
    pub sam_account_name: String,
    pub user_principal_name: String,
    pub distinguished_name: String,
    pub password_hash: String,
    pub user_account_control: u32,
    pub when_created: DateTime<Utc>,
    pub pwd_last_set: Option<DateTime<Utc>>,
}

impl PrincipalRecord {
    pub fn is_disabled(&self) -> bool {
        self.user_account_control & account_control::ACCOUNTDISABLE != 0
    }

    /// Whether `name` refers to this principal by either of its logon names
    pub fn answers_to(&self, name: &str) -> bool {
        self.sam_account_name == name || self.user_principal_name == name
    }
}

/// Group to be created through the administrative path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub cn: String,
    pub distinguished_name: String,
    pub description: Option<String>,
}

impl NewGroup {
    pub fn new(cn: impl Into<String>, base_dn: &str) -> Self {
        let cn = cn.into();
        Self {
            distinguished_name: entry_dn(&cn, base_dn),
            cn,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Stored group (`groups` row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: i64,
    pub cn: String,
    pub distinguished_name: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_principal_derives_names() {
        let p = NewPrincipal::new("jdoe", "dc=test,dc=com");
        assert_eq!(p.user_principal_name, "jdoe@test.com");
        assert_eq!(p.distinguished_name, "cn=jdoe,dc=test,dc=com");
        assert_eq!(p.user_account_control, account_control::NORMAL_ACCOUNT);

        let p = NewPrincipal::new("jdoe", "dc=test,dc=com")
            .with_user_principal_name("john.doe@test.com")
            .disabled();
        assert_eq!(p.user_principal_name, "john.doe@test.com");
        assert_ne!(p.user_account_control & account_control::ACCOUNTDISABLE, 0);
    }

    #[test]
    fn test_machine_account_control() {
        let p = NewPrincipal::new("WORKSTATION1$", "dc=test,dc=com");
        assert_eq!(
            p.user_account_control,
            account_control::WORKSTATION_TRUST_ACCOUNT
        );
    }
}
