//! Principal identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// An identity (user or service account) qualified by its realm
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub realm: String,
}

impl Principal {
    pub fn new(name: impl Into<String>, realm: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            realm: realm.into(),
        }
    }

    /// Parse `name@REALM`, falling back to `default_realm` for a bare name
    pub fn parse(s: &str, default_realm: &str) -> crate::Result<Self> {
        let s = s.trim();
        let (name, realm) = match s.rsplit_once('@') {
            Some((name, realm)) if !realm.is_empty() => (name, realm),
            Some(_) => return Err(crate::Error::InvalidArgument(format!("Empty realm in {}", s))),
            None => (s, default_realm),
        };

        if name.is_empty() {
            return Err(crate::Error::InvalidArgument("Empty principal name".into()));
        }
        if name.len() > crate::MAX_PRINCIPAL_LENGTH {
            return Err(crate::Error::InvalidArgument(format!(
                "Principal name longer than {} bytes",
                crate::MAX_PRINCIPAL_LENGTH
            )));
        }

        Ok(Self::new(name, realm.to_ascii_uppercase()))
    }

    /// Machine accounts carry a trailing `$` (`WORKSTATION1$`)
    pub fn is_machine_account(&self) -> bool {
        self.name.ends_with(crate::MACHINE_ACCOUNT_SUFFIX)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.realm)
    }
}
