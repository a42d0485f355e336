//! Long-term principal keys known to the KDC

use adlite_crypto::{hash_password, verify_password};
use std::collections::HashMap;

/// Credential hashes the KDC checks pre-authentication secrets against.
///
/// A KDC without a key table accepts any secret at pre-authentication and
/// relies on the proof round-trip alone.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    entries: HashMap<String, String>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal with a plaintext secret
    pub fn insert(&mut self, principal: impl Into<String>, secret: &[u8]) {
        self.entries.insert(principal.into(), hash_password(secret));
    }

    pub fn remove(&mut self, principal: &str) -> bool {
        self.entries.remove(principal).is_some()
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.entries.contains_key(principal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn verify(&self, principal: &str, secret: &[u8]) -> bool {
        self.entries
            .get(principal)
            .is_some_and(|hash| verify_password(secret, hash))
    }
}

impl<P: Into<String>, H: Into<String>> FromIterator<(P, H)> for KeyTable {
    fn from_iter<T: IntoIterator<Item = (P, H)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(principal, hash)| (principal.into(), hash.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let mut keytab = KeyTable::new();
        keytab.insert("svc_web", b"s3cret");

        assert!(keytab.verify("svc_web", b"s3cret"));
        assert!(!keytab.verify("svc_web", b"wrong"));
        assert!(!keytab.verify("alice", b"s3cret"));

        assert!(keytab.remove("svc_web"));
        assert!(keytab.is_empty());
    }

    #[test]
    fn test_from_hashes() {
        let keytab: KeyTable = [("alice", hash_password(b"pw"))].into_iter().collect();
        assert!(keytab.contains("alice"));
        assert!(keytab.verify("alice", b"pw"));
    }
}
