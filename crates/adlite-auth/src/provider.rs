//! Authentication method dispatch

use adlite_core::types::AuthMethod;
use adlite_core::{AdliteConfig, Error, Result};
use adlite_crypto::verify_password;
use adlite_store::DirectoryStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ticket::{SimulatedKdc, TicketAuthority};

/// Well-formed hash no secret matches; checked for unknown principals so
/// they cost the same as known ones.
const UNKNOWN_PRINCIPAL_HASH: &str = "hmac-sha256$00000000000000000000000000000000$\
    0000000000000000000000000000000000000000000000000000000000000000";

/// One way of checking a principal's secret
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn method(&self) -> AuthMethod;

    /// `Ok(false)` for a wrong secret or unknown principal; `Err` only when
    /// the check itself could not run.
    async fn authenticate(&self, principal: &str, secret: &[u8]) -> Result<bool>;
}

/// Checks secrets against credential hashes held by the directory store
#[derive(Clone)]
pub struct BasicAuthenticator {
    store: Arc<dyn DirectoryStore>,
    timeout: Duration,
}

impl BasicAuthenticator {
    pub fn new(store: Arc<dyn DirectoryStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    fn method(&self) -> AuthMethod {
        AuthMethod::Basic
    }

    async fn authenticate(&self, principal: &str, secret: &[u8]) -> Result<bool> {
        let lookup = tokio::time::timeout(self.timeout, self.store.lookup_credential_hash(principal))
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_millis() as u64))??;

        Ok(match lookup {
            Some(hash) => verify_password(secret, &hash),
            None => {
                verify_password(secret, UNKNOWN_PRINCIPAL_HASH);
                debug!(principal = %principal, "Unknown or disabled principal");
                false
            }
        })
    }
}

/// Runs the full ticket chain of a [`TicketAuthority`].
///
/// The directory credential is verified first; the chain only runs for a
/// principal whose secret matches its stored hash.
pub struct TicketAuthenticator {
    directory: BasicAuthenticator,
    authority: Arc<dyn TicketAuthority>,
}

impl TicketAuthenticator {
    pub fn new(directory: BasicAuthenticator, authority: Arc<dyn TicketAuthority>) -> Self {
        Self {
            directory,
            authority,
        }
    }
}

#[async_trait]
impl Authenticator for TicketAuthenticator {
    fn method(&self) -> AuthMethod {
        AuthMethod::Kerberos
    }

    async fn authenticate(&self, principal: &str, secret: &[u8]) -> Result<bool> {
        if !self.directory.authenticate(principal, secret).await? {
            return Ok(false);
        }
        Ok(self.authority.authenticate(principal, secret))
    }
}

/// Routes authentication requests to the configured method
pub struct AuthProvider {
    basic: BasicAuthenticator,
    ticket: Option<TicketAuthenticator>,
    ticket_authority: Option<Arc<dyn TicketAuthority>>,
    default_method: AuthMethod,
    unavailable: Option<String>,
}

impl AuthProvider {
    /// Provider with basic authentication only
    pub fn new(store: Arc<dyn DirectoryStore>, timeout: Duration) -> Self {
        Self {
            basic: BasicAuthenticator::new(store, timeout),
            ticket: None,
            ticket_authority: None,
            default_method: AuthMethod::Basic,
            unavailable: None,
        }
    }

    /// Build from configuration.
    ///
    /// A ticket authority that cannot be constructed leaves the provider
    /// with basic authentication and records why; it is only an error when
    /// the ticket method is the configured default.
    pub fn from_config(config: &AdliteConfig, store: Arc<dyn DirectoryStore>) -> Result<Self> {
        let mut provider = Self::new(store, config.ldap.timeout_duration());

        if config.auth.kerberos.enabled {
            match SimulatedKdc::from_config(&config.auth.kerberos, &config.tickets) {
                Ok(kdc) => provider = provider.with_ticket_authority(Arc::new(kdc)),
                Err(e) => {
                    warn!("Ticket authentication unavailable: {}", e);
                    provider.unavailable = Some(e.to_string());
                }
            }
        } else {
            provider.unavailable = Some("auth.kerberos.enabled is false".to_string());
        }

        provider.with_default_method(config.auth.default_method)
    }

    pub fn with_ticket_authority(mut self, authority: Arc<dyn TicketAuthority>) -> Self {
        self.ticket = Some(TicketAuthenticator::new(self.basic.clone(), authority.clone()));
        self.ticket_authority = Some(authority);
        self.unavailable = None;
        self
    }

    pub fn with_default_method(mut self, method: AuthMethod) -> Result<Self> {
        self.authenticator(method)?;
        self.default_method = method;
        Ok(self)
    }

    pub fn default_method(&self) -> AuthMethod {
        self.default_method
    }

    /// Methods this provider can serve
    pub fn methods(&self) -> Vec<AuthMethod> {
        AuthMethod::all()
            .iter()
            .copied()
            .filter(|m| self.authenticator(*m).is_ok())
            .collect()
    }

    /// Why the ticket method is missing, if it is
    pub fn unavailable(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    pub fn ticket_authority(&self) -> Option<Arc<dyn TicketAuthority>> {
        self.ticket_authority.clone()
    }

    pub fn authenticator(&self, method: AuthMethod) -> Result<&dyn Authenticator> {
        match method {
            AuthMethod::Basic => Ok(&self.basic),
            AuthMethod::Kerberos => self
                .ticket
                .as_ref()
                .map(|t| t as &dyn Authenticator)
                .ok_or_else(|| {
                    Error::UnsupportedAuthMethod(format!(
                        "{} ({})",
                        method,
                        self.unavailable.as_deref().unwrap_or("not configured")
                    ))
                }),
        }
    }

    /// Authenticate with the named method, or the default when `method` is
    /// `None`
    pub async fn authenticate(
        &self,
        principal: &str,
        secret: &[u8],
        method: Option<&str>,
    ) -> Result<bool> {
        let method = match method {
            Some(name) => name.parse()?,
            None => self.default_method,
        };
        self.authenticate_with(principal, secret, method).await
    }

    pub async fn authenticate_with(
        &self,
        principal: &str,
        secret: &[u8],
        method: AuthMethod,
    ) -> Result<bool> {
        let authenticator = self.authenticator(method)?;
        let ok = authenticator.authenticate(principal, secret).await?;

        debug!(principal = %principal, method = %method, ok, "Authentication attempt");
        Ok(ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adlite_core::types::{GroupRecord, NewGroup, NewPrincipal, PrincipalRecord};
    use adlite_crypto::hash_password;
    use adlite_store::MemoryDirectoryStore;

    const BASE_DN: &str = "dc=test,dc=com";

    async fn store_with(users: &[(&str, &str)]) -> Arc<dyn DirectoryStore> {
        let store = MemoryDirectoryStore::new();
        for (name, password) in users {
            store
                .add_principal(
                    &NewPrincipal::new(*name, BASE_DN).with_password_hash(hash_password(password.as_bytes())),
                )
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    /// Store whose lookups never finish in time
    struct StalledStore;

    #[async_trait]
    impl DirectoryStore for StalledStore {
        async fn lookup_credential_hash(&self, _name: &str) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
        async fn is_member(&self, _principal: &str, _group: &str) -> Result<bool> {
            Ok(false)
        }
        async fn add_principal(&self, _principal: &NewPrincipal) -> Result<PrincipalRecord> {
            Err(Error::StoreUnavailable("stalled".into()))
        }
        async fn get_principal(&self, _name: &str) -> Result<Option<PrincipalRecord>> {
            Ok(None)
        }
        async fn set_password_hash(&self, _name: &str, _hash: &str) -> Result<()> {
            Ok(())
        }
        async fn add_group(&self, _group: &NewGroup) -> Result<GroupRecord> {
            Err(Error::StoreUnavailable("stalled".into()))
        }
        async fn get_group(&self, _cn: &str) -> Result<Option<GroupRecord>> {
            Ok(None)
        }
        async fn add_membership(&self, _principal: &str, _group: &str) -> Result<()> {
            Ok(())
        }
        async fn groups_of(&self, _principal: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_basic_authentication() {
        let store = store_with(&[("jdoe", "password123")]).await;
        let provider = AuthProvider::new(store, Duration::from_secs(5));

        assert!(provider.authenticate("jdoe", b"password123", None).await.unwrap());
        assert!(!provider.authenticate("jdoe", b"wrong", None).await.unwrap());
        assert!(!provider.authenticate("ghost", b"password123", None).await.unwrap());
        assert!(provider
            .authenticate("jdoe@test.com", b"password123", Some("basic"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_basic_authentication_sqlite() {
        let store = adlite_store::SqliteDirectoryStore::new("sqlite::memory:", 1)
            .await
            .unwrap();
        store
            .add_principal(
                &NewPrincipal::new("asmith", BASE_DN)
                    .with_user_principal_name("alice.smith@test.com")
                    .with_password_hash(hash_password(b"password456")),
            )
            .await
            .unwrap();
        store
            .add_principal(
                &NewPrincipal::new("locked", BASE_DN)
                    .with_password_hash(hash_password(b"pw"))
                    .disabled(),
            )
            .await
            .unwrap();

        let provider = AuthProvider::new(Arc::new(store), Duration::from_secs(5));

        assert!(provider
            .authenticate("alice.smith@test.com", b"password456", None)
            .await
            .unwrap());
        assert!(!provider.authenticate("asmith", b"password123", None).await.unwrap());
        assert!(!provider.authenticate("locked", b"pw", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let store = store_with(&[("jdoe", "password123")]).await;
        let provider = AuthProvider::new(store, Duration::from_secs(5));

        let err = provider
            .authenticate("jdoe", b"password123", Some("ntlm"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAuthMethod(_)));

        // Ticket method is known but not registered on a basic-only provider
        let err = provider
            .authenticate("jdoe", b"password123", Some("kerberos"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAuthMethod(_)));
        assert_eq!(provider.methods(), vec![AuthMethod::Basic]);
    }

    #[tokio::test]
    async fn test_ticket_method() {
        let store = store_with(&[("bob", "secret")]).await;
        let provider = AuthProvider::new(store, Duration::from_secs(5))
            .with_ticket_authority(Arc::new(SimulatedKdc::new("TEST.COM", "kdc")))
            .with_default_method(AuthMethod::Kerberos)
            .unwrap();

        assert_eq!(provider.default_method(), AuthMethod::Kerberos);
        assert!(provider.authenticate("bob", b"secret", None).await.unwrap());
        assert!(provider.authenticate("bob", b"secret", Some("ticket")).await.unwrap());
        assert_eq!(provider.methods().len(), 2);
    }

    #[tokio::test]
    async fn test_ticket_method_checks_directory_secret() {
        let store = store_with(&[("bob", "secret")]).await;
        let kdc = Arc::new(SimulatedKdc::new("TEST.COM", "kdc"));
        let provider = AuthProvider::new(store, Duration::from_secs(5)).with_ticket_authority(kdc.clone());

        assert!(!provider.authenticate("bob", b"wrong", Some("kerberos")).await.unwrap());
        assert!(!provider.authenticate("nobody", b"secret", Some("kerberos")).await.unwrap());
        // Rejected secrets never reach the ticket chain
        assert_eq!(kdc.store().counts().tickets, 0);

        assert!(provider.authenticate("bob", b"secret", Some("kerberos")).await.unwrap());
        assert_eq!(kdc.store().counts().tickets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticket_method_store_timeout() {
        let provider = AuthProvider::new(Arc::new(StalledStore), Duration::from_millis(250))
            .with_ticket_authority(Arc::new(SimulatedKdc::new("TEST.COM", "kdc")));

        let err = provider
            .authenticate("jdoe", b"pw", Some("kerberos"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(250)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout() {
        let provider = AuthProvider::new(Arc::new(StalledStore), Duration::from_millis(250));

        let err = provider.authenticate("jdoe", b"pw", None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(250)));
        assert_eq!(err.code(), "TimeLimitExceeded");
    }

    #[tokio::test]
    async fn test_from_config() {
        let store = store_with(&[]).await;

        let mut config = AdliteConfig::default();
        let provider = AuthProvider::from_config(&config, store.clone()).unwrap();
        assert_eq!(provider.methods(), vec![AuthMethod::Basic, AuthMethod::Kerberos]);
        assert!(provider.unavailable().is_none());
        assert!(provider.ticket_authority().is_some());

        config.auth.kerberos.enabled = false;
        let provider = AuthProvider::from_config(&config, store.clone()).unwrap();
        assert!(provider.unavailable().is_some());

        config.auth.default_method = AuthMethod::Kerberos;
        assert!(matches!(
            AuthProvider::from_config(&config, store.clone()),
            Err(Error::UnsupportedAuthMethod(_))
        ));

        config.auth.kerberos.enabled = true;
        config.auth.kerberos.realm = String::new();
        assert!(AuthProvider::from_config(&config, store).is_err());
    }
}
